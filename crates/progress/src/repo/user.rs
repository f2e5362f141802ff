use amen_store::{CollectionPath, DocPath, StoreHandle, from_document, to_document};
use exn::ResultExt;
use std::sync::Arc;
use tracing::instrument;

use crate::clock::Clock;
use crate::error::{ErrorKind, Result};
use crate::models::{Credential, UserProfile};

const USERS: &str = "users";

/// User profiles, stored under `users/{id}`.
#[derive(Clone)]
pub struct UserRepository {
    store: StoreHandle,
    clock: Arc<dyn Clock>,
}
impl UserRepository {
    pub fn new(store: StoreHandle, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn profile_doc(id: &str) -> Result<DocPath> {
        CollectionPath::new(USERS)
            .and_then(|users| users.doc(id))
            .or_raise(|| ErrorKind::InvalidKey(id.to_string()))
    }

    pub async fn find(&self, id: &str) -> Result<Option<UserProfile>> {
        let path = Self::profile_doc(id)?;
        let document = self.store.get(&path).await.or_raise(|| ErrorKind::Store)?;
        document
            .map(|document| from_document(document).or_raise(|| ErrorKind::InvalidData("user profile")))
            .transpose()
    }

    /// Create the profile for a freshly signed-in user, or refresh the name
    /// and provider of an existing one while keeping its creation time.
    #[instrument(skip_all, fields(user = %credential.user_id))]
    pub async fn upsert(&self, credential: &Credential) -> Result<UserProfile> {
        let now = self.clock.now();
        let profile = match self.find(&credential.user_id).await? {
            Some(existing) => UserProfile {
                display_name: credential.display_name.clone(),
                provider: credential.provider,
                updated_at: now,
                ..existing
            },
            None => {
                tracing::info!("Creating user profile");
                UserProfile::from_credential(credential, now)
            },
        };
        let document = to_document(&profile).or_raise(|| ErrorKind::InvalidData("user profile"))?;
        let path = Self::profile_doc(&profile.id)?;
        self.store.set(&path, document).await.or_raise(|| ErrorKind::Store)?;
        Ok(profile)
    }
}
