//! Document store trait and implementations.
//!
//! This module defines the `DocumentStore` trait, a unified interface over
//! hierarchical JSON document storage: point reads and writes, field-level
//! updates, atomic batches, equality queries over a collection or a
//! collection group, and live queries.

#[cfg(any(test, feature = "mock"))]
mod memory;
mod ro;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryStore;
pub use self::ro::ReadOnlyStore;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteStore;
use crate::document::{Document, DocumentSnapshot, FieldUpdates};
use crate::error::Result;
use crate::path::DocPath;
use crate::query::Query;
use crate::subscription::{Callback, Subscription};
use async_trait::async_trait;

/// Unified interface for document stores.
///
/// All operations are asynchronous; a remote implementation is expected to
/// perform network I/O. Paths are validated on construction
/// ([`DocPath::new`]) so implementations never see malformed keys.
///
/// # Examples
///
/// ```
/// use amen_store::{DocPath, DocumentStore, error::Result};
///
/// async fn has_profile(store: &dyn DocumentStore, user: &str) -> Result<bool> {
///     let path = DocPath::new(format!("users/{user}"))?;
///     Ok(store.get(&path).await?.is_some())
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the backend, for logging.
    fn name(&self) -> &str;

    /// Read one document; `None` if it does not exist.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>>;

    /// Create or fully replace a document.
    async fn set(&self, path: &DocPath, document: Document) -> Result<()>;

    /// Assign individual (dotted) fields of an existing document, leaving the
    /// rest untouched.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the document
    /// does not exist.
    async fn update(&self, path: &DocPath, fields: FieldUpdates) -> Result<()>;

    /// Create or replace several documents atomically: either every write
    /// lands or none does.
    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> Result<()>;

    /// All documents matching a query, ordered by path.
    async fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>>;

    /// Run a query now and again after every write, handing each result set
    /// to `callback` until the returned [`Subscription`] is dropped.
    async fn subscribe(&self, query: Query, callback: Callback) -> Result<Subscription>;
}
