//! Per-user month records and cross-user statistics.
//!
//! Month records live at `userPlans/{userId}/yearPlans/{planId}/months/{year}-{month}`
//! (`2025-03`). The plan's schedule repeats every year, so each year a user
//! follows it gets its own twelve documents and earlier years are kept.

use std::sync::Arc;

use amen_store::{
    Callback, CollectionPath, DocPath, Document, DocumentSnapshot, Query, StoreHandle, Subscription, from_document,
    to_document,
};
use exn::{OptionExt, ResultExt};
use serde_json::{Value, json};
use time::Date;
use tracing::instrument;

use crate::clock::Clock;
use crate::error::{ErrorKind, Result};
use crate::models::{MonthRecord, PlanStats, ProgressField};

const USER_PLANS: &str = "userPlans";
const YEAR_PLANS: &str = "yearPlans";
const MONTHS: &str = "months";

/// Store access for [`MonthRecord`]s.
#[derive(Clone)]
pub struct MonthRepository {
    store: StoreHandle,
    clock: Arc<dyn Clock>,
}
impl MonthRepository {
    pub fn new(store: StoreHandle, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn months_collection(user_id: &str, plan_id: &str) -> Result<CollectionPath> {
        CollectionPath::new(USER_PLANS)
            .and_then(|c| c.doc(user_id))
            .and_then(|d| d.collection(YEAR_PLANS))
            .and_then(|c| c.doc(plan_id))
            .and_then(|d| d.collection(MONTHS))
            .or_raise(|| ErrorKind::InvalidKey(format!("{user_id}/{plan_id}")))
    }

    fn month_doc(user_id: &str, plan_id: &str, year: i32, month: u8) -> Result<DocPath> {
        Self::months_collection(user_id, plan_id)?
            .doc(format!("{year:04}-{month:02}"))
            .or_raise(|| ErrorKind::InvalidKey(format!("{user_id}/{plan_id}/{year}-{month}")))
    }

    fn decode(document: Document) -> Result<MonthRecord> {
        from_document(document).or_raise(|| ErrorKind::InvalidData("month record"))
    }

    fn encode(record: &MonthRecord) -> Result<Document> {
        to_document(record).or_raise(|| ErrorKind::InvalidData("month record"))
    }

    /// One month record, if it exists.
    pub async fn find_month(&self, user_id: &str, plan_id: &str, year: i32, month: u8) -> Result<Option<MonthRecord>> {
        let path = Self::month_doc(user_id, plan_id, year, month)?;
        let document = self.store.get(&path).await.or_raise(|| ErrorKind::Store)?;
        document.map(Self::decode).transpose()
    }

    /// Every month record of a user's plan for the given year, ordered by month.
    #[instrument(skip(self))]
    pub async fn find_all_months(&self, user_id: &str, plan_id: &str, year: i32) -> Result<Vec<MonthRecord>> {
        let query = Query::collection(Self::months_collection(user_id, plan_id)?).where_eq("year", year);
        let snapshots = self.store.query(&query).await.or_raise(|| ErrorKind::Store)?;
        let mut records = snapshots
            .into_iter()
            .map(|snapshot| Self::decode(snapshot.data))
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|record| record.month);
        tracing::debug!(records = records.len(), "Fetched month records");
        Ok(records)
    }

    /// Create (or reset) one month with no completions or likes.
    pub async fn create_month(&self, user_id: &str, plan_id: &str, year: i32, month: u8) -> Result<MonthRecord> {
        let record = MonthRecord::empty(user_id, plan_id, year, month, self.clock.now());
        let path = Self::month_doc(user_id, plan_id, year, month)?;
        self.store.set(&path, Self::encode(&record)?).await.or_raise(|| ErrorKind::Store)?;
        Ok(record)
    }

    /// Create all twelve empty months of a year in one atomic batch.
    #[instrument(skip(self))]
    pub async fn initialize_year(&self, user_id: &str, plan_id: &str, year: i32) -> Result<()> {
        let now = self.clock.now();
        let writes = (1..=12)
            .map(|month| -> Result<(DocPath, Document)> {
                let record = MonthRecord::empty(user_id, plan_id, year, month, now);
                Ok((Self::month_doc(user_id, plan_id, year, month)?, Self::encode(&record)?))
            })
            .collect::<Result<Vec<_>>>()?;
        self.store.batch_write(writes).await.or_raise(|| ErrorKind::Store)?;
        tracing::info!("Initialized month records for the year");
        Ok(())
    }

    /// Set one day's value in one month and return the month as stored afterwards.
    ///
    /// Only the addressed day and `updatedAt` are written; concurrent changes
    /// to other days are preserved. Fails if the month was never created.
    #[instrument(skip(self))]
    pub async fn update_field(
        &self,
        field: ProgressField,
        user_id: &str,
        plan_id: &str,
        date: Date,
        value: bool,
    ) -> Result<MonthRecord> {
        let (year, month, day) = (date.year(), u8::from(date.month()), date.day());
        let path = Self::month_doc(user_id, plan_id, year, month)?;
        let updates = vec![
            (format!("{}.{day}", field.map_name()), Value::Bool(value)),
            ("updatedAt".to_string(), json!(self.clock.now().unix_timestamp())),
        ];
        self.store.update(&path, updates).await.or_raise(|| ErrorKind::Store)?;
        let document = self.store.get(&path).await.or_raise(|| ErrorKind::Store)?;
        Self::decode(document.ok_or_raise(|| ErrorKind::Store)?)
    }

    pub async fn update_completion(&self, user_id: &str, plan_id: &str, date: Date, completed: bool) -> Result<MonthRecord> {
        self.update_field(ProgressField::Completion, user_id, plan_id, date, completed).await
    }

    pub async fn update_like(&self, user_id: &str, plan_id: &str, date: Date, liked: bool) -> Result<MonthRecord> {
        self.update_field(ProgressField::Like, user_id, plan_id, date, liked).await
    }

    /// The cross-user query behind [`listen_to_plan_stats`](Self::listen_to_plan_stats).
    pub fn plan_stats_query(plan_id: &str, date: Date) -> Query {
        Query::group(MONTHS)
            .where_eq("planId", plan_id)
            .where_eq("year", date.year())
            .where_eq("month", u8::from(date.month()))
    }

    /// Count, across all users, who completed and liked the plan's reading
    /// for `date`, calling `on_change` now and after every change.
    ///
    /// Delivery stops when the returned [`Subscription`] is dropped.
    #[instrument(skip(self, on_change))]
    pub async fn listen_to_plan_stats(
        &self,
        plan_id: &str,
        date: Date,
        on_change: impl Fn(PlanStats) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        let day = date.day().to_string();
        let callback: Callback = Arc::new(move |snapshots: &[DocumentSnapshot]| {
            on_change(PlanStats::tally(snapshots.iter().map(|snapshot| &snapshot.data), &day));
        });
        self.store
            .subscribe(Self::plan_stats_query(plan_id, date), callback)
            .await
            .or_raise(|| ErrorKind::Store)
    }
}
