//! In-memory document store for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::DocumentStore;
use crate::document::{Document, DocumentSnapshot, FieldUpdates, apply_updates};
use crate::error::{ErrorKind, Result};
use crate::path::DocPath;
use crate::query::Query;
use crate::subscription::{Callback, Subscribers, Subscription};

/// In-memory document store for testing.
///
/// Documents are stored in a `BTreeMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. The store
/// can be switched offline to exercise failure paths, and counts the queries
/// it serves so tests can assert on remote traffic.
///
/// # Examples
///
/// ```
/// use amen_store::{DocPath, DocumentStore, MemoryStore};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::with_documents([("users/abc", json!({"displayName": "Abc"}))]);
/// let path = DocPath::new("users/abc").unwrap();
/// assert!(store.get(&path).await.unwrap().is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocPath, Document>>,
    subscribers: Subscribers,
    offline: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryStore {
    /// Create a store pre-populated with documents.
    ///
    /// Panics if any path is invalid or any body is not a JSON object. If test
    /// setup is wrong, then test should not pass.
    pub fn with_documents<'a>(documents: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, body) in documents {
            let Ok(validated) = DocPath::new(path) else {
                panic!("MemoryStore::with_documents: invalid path {path}");
            };
            let Value::Object(document) = body else {
                panic!("MemoryStore::with_documents: {path} is not an object");
            };
            map.insert(validated, document);
        }
        Self {
            documents: RwLock::new(map),
            ..Self::default()
        }
    }

    /// Simulate losing (or regaining) the connection: while offline every
    /// operation fails with [`Unavailable`](ErrorKind::Unavailable).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of [`query`](DocumentStore::query) calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of documents currently stored.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn check_online(&self) -> Result<()> {
        match self.offline.load(Ordering::SeqCst) {
            true => exn::bail!(ErrorKind::Unavailable),
            false => Ok(()),
        }
    }

    async fn matching(&self, query: &Query) -> Vec<DocumentSnapshot> {
        self.documents
            .read()
            .await
            .iter()
            .filter(|(path, document)| query.matches(path, document))
            .map(|(path, document)| DocumentSnapshot::new(path.clone(), document.clone()))
            .collect()
    }

    async fn notify(&self) {
        for registration in self.subscribers.active() {
            let results = self.matching(&registration.query).await;
            registration.deliver(&results);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        self.check_online()?;
        Ok(self.documents.read().await.get(path).cloned())
    }

    async fn set(&self, path: &DocPath, document: Document) -> Result<()> {
        self.check_online()?;
        self.documents.write().await.insert(path.clone(), document);
        self.notify().await;
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: FieldUpdates) -> Result<()> {
        self.check_online()?;
        {
            let mut guard = self.documents.write().await;
            let document = guard
                .get_mut(path)
                .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.to_string())))?;
            // Apply to a copy so a bad field path leaves the document intact.
            let mut updated = document.clone();
            apply_updates(&mut updated, &fields)?;
            *document = updated;
        }
        self.notify().await;
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> Result<()> {
        self.check_online()?;
        self.documents.write().await.extend(writes);
        self.notify().await;
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>> {
        self.check_online()?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.matching(query).await)
    }

    async fn subscribe(&self, query: Query, callback: Callback) -> Result<Subscription> {
        self.check_online()?;
        let (registration, subscription) = self.subscribers.register(query, callback);
        let initial = self.matching(&registration.query).await;
        registration.deliver(&initial);
        Ok(subscription)
    }
}
