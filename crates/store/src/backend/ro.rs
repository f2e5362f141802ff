//! Read-only document store.
//!
//! This module provides a store implementation that wraps other
//! implementations and prevents write operations from executing, but
//! indicating success on return.

use async_trait::async_trait;

use crate::document::{Document, DocumentSnapshot, FieldUpdates};
use crate::error::Result;
use crate::path::DocPath;
use crate::query::Query;
use crate::subscription::{Callback, Subscription};
use crate::{DocumentStore, StoreHandle};

/// Read-only document store.
///
/// Wraps another store and silently drops all write operations, logging an
/// [`info event`](tracing::Event). Live queries still see writes made by
/// others through the inner store.
#[derive(Clone)]
pub struct ReadOnlyStore {
    inner: StoreHandle,
}
impl ReadOnlyStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for ReadOnlyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &DocPath, _document: Document) -> Result<()> {
        tracing::info!(path = %path, "Skipping set during read-only mode");
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: FieldUpdates) -> Result<()> {
        tracing::info!(path = %path, fields = fields.len(), "Skipping update during read-only mode");
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> Result<()> {
        tracing::info!(documents = writes.len(), "Skipping batch write during read-only mode");
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>> {
        self.inner.query(query).await
    }

    async fn subscribe(&self, query: Query, callback: Callback) -> Result<Subscription> {
        self.inner.subscribe(query, callback).await
    }
}
