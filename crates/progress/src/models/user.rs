use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, ErrorKind};

/// Identity provider a user signed in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Kakao,
    Apple,
}
impl FromStr for Provider {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kakao" => Ok(Self::Kakao),
            "apple" => Ok(Self::Apple),
            _ => exn::bail!(ErrorKind::InvalidData("unknown identity provider")),
        }
    }
}
impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Kakao => f.write_str("kakao"),
            Self::Apple => f.write_str("apple"),
        }
    }
}

/// The result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub user_id: String,
    pub display_name: String,
    pub provider: Provider,
}

/// A stored user profile, under `users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub provider: Provider,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}
impl UserProfile {
    pub fn from_credential(credential: &Credential, now: OffsetDateTime) -> Self {
        Self {
            id: credential.user_id.clone(),
            display_name: credential.display_name.clone(),
            provider: credential.provider,
            created_at: now,
            updated_at: now,
        }
    }
}
