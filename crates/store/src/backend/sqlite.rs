//! SQLite-backed document store.

use std::path::Path;

use async_trait::async_trait;
use exn::ResultExt;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{SqliteConnection, SqliteExecutor};
use time::UtcDateTime;
use tracing::instrument;

use crate::DocumentStore;
use crate::document::{Document, DocumentSnapshot, FieldUpdates, apply_updates};
use crate::error::{ErrorKind, Result};
use crate::path::DocPath;
use crate::query::{Query, Scope};
use crate::subscription::{Callback, Subscribers, Subscription};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// One user, a handful of concurrent cache refreshes.
const MAX_CONNECTIONS: u32 = 4;

/// Document store persisted to a local SQLite database.
///
/// Each document is one row keyed by its full path, with the body stored as
/// JSON text. Scope selection happens in SQL; equality filters are applied to
/// the decoded documents so dotted field paths behave exactly as they do for
/// every other backend.
pub struct SqliteStore {
    pool: SqlitePool,
    subscribers: Subscribers,
}

impl SqliteStore {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to EVERY connection the pool
            // opens, not only the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let store = Self {
            pool,
            subscribers: Subscribers::default(),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Open the database at the given path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not gated behind `#[cfg(test)]` so that other crates can use it in
    /// their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Parallel connections to `:memory:` would each see their own
        // database, so stick to one.
        Self::new(options, Some(1)).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Close the connection pool. The store should not be used afterwards.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }

    fn decode(data: &str) -> Result<Document> {
        serde_json::from_str(data).or_raise(|| ErrorKind::InvalidData("stored document is not a JSON object"))
    }

    async fn fetch<'e>(executor: impl SqliteExecutor<'e>, path: &DocPath) -> Result<Option<Document>> {
        let row: Option<(String,)> = sqlx::query_as(include_str!("../../queries/get_document.sql"))
            .bind(path.as_str())
            .fetch_optional(executor)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|(data,)| Self::decode(&data)).transpose()
    }

    async fn upsert<'e>(executor: impl SqliteExecutor<'e>, path: &DocPath, document: &Document) -> Result<()> {
        let parent = path.parent();
        let data = serde_json::to_string(document).or_raise(|| ErrorKind::InvalidData("unserializable document"))?;
        sqlx::query(include_str!("../../queries/upsert_document.sql"))
            .bind(path.as_str())
            .bind(parent.as_str())
            .bind(parent.collection_id())
            .bind(data)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(executor)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn select(&self, query: &Query) -> Result<Vec<DocumentSnapshot>> {
        let (sql, key) = match query.scope() {
            Scope::Collection(collection) => (include_str!("../../queries/query_collection.sql"), collection.as_str()),
            Scope::Group(id) => (include_str!("../../queries/query_group.sql"), id.as_str()),
        };
        let rows: Vec<(String, String)> = sqlx::query_as(sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut results = Vec::with_capacity(rows.len());
        for (path, data) in rows {
            let path = DocPath::new(&path)?;
            let document = Self::decode(&data)?;
            if query.matches(&path, &document) {
                results.push(DocumentSnapshot::new(path, document));
            }
        }
        Ok(results)
    }

    async fn notify(&self) {
        for registration in self.subscribers.active() {
            match self.select(&registration.query).await {
                Ok(results) => registration.deliver(&results),
                Err(err) => tracing::warn!(subscription = registration.id, error = ?err, "Failed to re-run live query"),
            }
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        Self::fetch(&self.pool, path).await
    }

    async fn set(&self, path: &DocPath, document: Document) -> Result<()> {
        Self::upsert(&self.pool, path, &document).await?;
        self.notify().await;
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: FieldUpdates) -> Result<()> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let Some(mut document) = Self::fetch(&mut *tx, path).await? else {
            exn::bail!(ErrorKind::NotFound(path.to_string()));
        };
        apply_updates(&mut document, &fields)?;
        Self::upsert(&mut *tx, path, &document).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        self.notify().await;
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> Result<()> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for (path, document) in &writes {
            Self::upsert(&mut *tx, path, document).await?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(documents = writes.len(), "Committed batch write");
        self.notify().await;
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>> {
        self.select(query).await
    }

    async fn subscribe(&self, query: Query, callback: Callback) -> Result<Subscription> {
        let (registration, subscription) = self.subscribers.register(query, callback);
        let initial = self.select(&registration.query).await?;
        registration.deliver(&initial);
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::CollectionPath;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn body(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    fn path(raw: &str) -> DocPath {
        DocPath::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.close().await;
    }

    #[tokio::test]
    async fn test_set_get_update() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let month = path("userPlans/u1/yearPlans/default/months/1");
        store.set(&month, body(json!({"completions": {"1": false}}))).await.unwrap();
        store
            .update(&month, vec![("completions.1".into(), json!(true)), ("completions.2".into(), json!(true))])
            .await
            .unwrap();
        let document = store.get(&month).await.unwrap().unwrap();
        assert_eq!(Value::Object(document), json!({"completions": {"1": true, "2": true}}));
        assert!(store.get(&path("users/nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let err = store.update(&path("users/a"), vec![("x".into(), json!(1))]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_and_queries() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let writes = ["u1", "u2"]
            .into_iter()
            .flat_map(|user| {
                (1..=3).map(move |month| {
                    (
                        path(&format!("userPlans/{user}/yearPlans/default/months/{month}")),
                        body(json!({"planId": "default", "month": month})),
                    )
                })
            })
            .collect();
        store.batch_write(writes).await.unwrap();

        let u1 = CollectionPath::new("userPlans/u1/yearPlans/default/months").unwrap();
        assert_eq!(store.query(&Query::collection(u1)).await.unwrap().len(), 3);
        let group = Query::group("months").where_eq("planId", "default").where_eq("month", 2);
        let results = store.query(&group).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|snapshot| snapshot.id() == "2"));
    }

    #[tokio::test]
    async fn test_subscription_follows_writes() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback: Callback = Arc::new(move |_: &[DocumentSnapshot]| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let subscription = store.subscribe(Query::group("users"), callback).await.unwrap();
        store.set(&path("users/a"), Document::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        subscription.unsubscribe();
        store.set(&path("users/b"), Document::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
