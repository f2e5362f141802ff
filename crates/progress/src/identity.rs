use async_trait::async_trait;

use crate::error::Result;
use crate::models::Credential;

/// Something that can sign a user in.
///
/// Sign-in either produces a complete [`Credential`] or fails; there are no
/// partial states. Browser-based OAuth flows live outside this crate and plug
/// in here.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self) -> Result<Credential>;
}

/// A provider that always signs in as the same, preconfigured user.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    credential: Credential,
}
impl StaticIdentity {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn sign_in(&self) -> Result<Credential> {
        tracing::debug!(user = %self.credential.user_id, provider = %self.credential.provider, "Signed in");
        Ok(self.credential.clone())
    }
}
