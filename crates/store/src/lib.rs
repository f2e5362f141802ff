pub mod backend;
mod document;
pub mod error;
mod path;
mod query;
mod subscription;

pub use crate::backend::DocumentStore;
#[cfg(any(test, feature = "mock"))]
pub use crate::backend::MemoryStore;
pub use crate::backend::ReadOnlyStore;
#[cfg(feature = "sqlite")]
pub use crate::backend::SqliteStore;
pub use crate::document::{
    Document, DocumentSnapshot, FieldUpdates, apply_updates, from_document, get_field, set_field, to_document,
};
pub use crate::path::{CollectionPath, DocPath, validate_id};
pub use crate::query::{Filter, Query, Scope};
pub use crate::subscription::{Callback, Registration, Subscribers, Subscription};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn DocumentStore>;
