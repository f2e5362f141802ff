//! Completion and like cache.
//!
//! [`CompletionCache`] sits between user actions and the [`MonthRepository`].
//! Each `(user, plan)` [`CacheKey`] moves through
//! `Unloaded -> Loading -> Loaded -> (Stale -> Loading -> Loaded)*`:
//!
//! - Reads are served from a fresh entry without touching the store.
//! - Refreshes carry a per-key sequence token; a response that is no longer
//!   the latest issued is discarded, whatever order responses arrive in.
//! - A fetch that returns fewer records than are cached for the same year
//!   never replaces them. Records of an earlier year do not count, so the
//!   cache moves on to a new year when the calendar does.
//! - Writes are applied optimistically and rolled back if the store rejects
//!   them (see [`PendingWrite`]).

mod periodic;
mod write;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use exn::ResultExt;
use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub use self::periodic::PeriodicRefresh;
pub use self::write::PendingWrite;
use crate::clock::Clock;
use crate::error::{ErrorKind, Result};
use crate::models::{MonthRecord, ProgressField};
use crate::repo::MonthRepository;
use crate::snapshot::{CacheSnapshot, SnapshotEntry};

/// Identifies one user's progress through one plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub user_id: String,
    pub plan_id: String,
}
impl CacheKey {
    pub fn new(user_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            plan_id: plan_id.into(),
        }
    }
}
impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}_{}", self.user_id, self.plan_id)
    }
}

/// Timing rules for the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Age after which an entry is stale and reads go back to the store.
    pub stale_after: Duration,
    /// Minimum age of an entry before a non-forced refresh fetches again.
    pub debounce: Duration,
    /// Period of [`CompletionCache::spawn_periodic_refresh`].
    pub refresh_interval: Duration,
}
impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(30 * 60),
            debounce: Duration::from_secs(5),
            refresh_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheState {
    Unloaded,
    Loading,
    Loaded,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshMode {
    /// Fetch regardless of how recently the entry was updated.
    Forced,
    /// Fetch unless the entry was updated within the debounce window.
    IfDue,
}

/// What a refresh did. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
    /// Within the debounce window; nothing fetched.
    Skipped,
    /// The fetched records replaced the entry.
    Applied,
    /// The year had no records; twelve empty months were created and cached.
    Initialized,
    /// The store returned fewer records than are cached; the cache was kept.
    KeptExisting,
    /// A newer refresh was issued while this one was in flight; its result
    /// was discarded.
    Superseded,
    /// Cancelled by the caller.
    Aborted,
}

/// The cached month records of one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub records: Vec<MonthRecord>,
    #[serde(with = "time::serde::timestamp")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<CacheKey, CacheEntry>,
    loading: HashSet<CacheKey>,
    latest: HashMap<CacheKey, u64>,
    errors: HashMap<CacheKey, ErrorKind>,
}
impl State {
    fn issue(&mut self, key: &CacheKey) -> u64 {
        let token = self.latest.entry(key.clone()).or_default();
        *token += 1;
        *token
    }

    fn is_latest(&self, key: &CacheKey, token: u64) -> bool {
        self.latest.get(key) == Some(&token)
    }

    /// How many cached records of `key` belong to `year`.
    fn cached_in(&self, key: &CacheKey, year: i32) -> usize {
        self.entries
            .get(key)
            .map_or(0, |entry| entry.records.iter().filter(|record| record.year == year).count())
    }

    fn record(&self, key: &CacheKey, date: Date) -> Option<&MonthRecord> {
        self.entries
            .get(key)?
            .records
            .iter()
            .find(|record| record.year == date.year() && record.month == u8::from(date.month()))
    }
}

/// Process-wide cache of month records, shared by cloning.
///
/// The state lock is never held across a store call.
#[derive(Clone)]
pub struct CompletionCache {
    repo: MonthRepository,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
    state: Arc<Mutex<State>>,
}
impl CompletionCache {
    pub fn new(repo: MonthRepository, clock: Arc<dyn Clock>, policy: CachePolicy) -> Self {
        Self {
            repo,
            clock,
            policy,
            state: Arc::default(),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn age(&self, entry: &CacheEntry) -> time::Duration {
        self.clock.now() - entry.last_updated
    }

    /// Recent enough, and about the current year.
    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let year = self.clock.today().year();
        self.age(entry) < self.policy.stale_after && entry.records.iter().any(|record| record.year == year)
    }

    pub async fn state(&self, key: &CacheKey) -> CacheState {
        let state = self.state.lock().await;
        if state.loading.contains(key) {
            return CacheState::Loading;
        }
        match state.entries.get(key) {
            None => CacheState::Unloaded,
            Some(entry) if self.is_fresh(entry) => CacheState::Loaded,
            Some(_) => CacheState::Stale,
        }
    }

    /// Cached records, fresh or not.
    pub async fn cached(&self, key: &CacheKey) -> Option<Vec<MonthRecord>> {
        let state = self.state.lock().await;
        state.entries.get(key).map(|entry| entry.records.clone())
    }

    pub async fn last_updated(&self, key: &CacheKey) -> Option<OffsetDateTime> {
        let state = self.state.lock().await;
        state.entries.get(key).map(|entry| entry.last_updated)
    }

    /// The error of the most recent refresh, if it failed.
    ///
    /// Cleared by the next refresh that succeeds. Cancelled and superseded
    /// refreshes never set it.
    pub async fn last_error(&self, key: &CacheKey) -> Option<ErrorKind> {
        let state = self.state.lock().await;
        state.errors.get(key).cloned()
    }

    /// All of this year's month records for `key`.
    ///
    /// A fresh entry is returned as is. Otherwise the store is consulted
    /// first and whatever the cache then holds is returned; if that refresh
    /// was cancelled or superseded this may be the previous (stale) data or
    /// nothing at all.
    #[instrument(skip(self, cancel), fields(%key))]
    pub async fn get_monthly_plans(&self, key: &CacheKey, cancel: &CancellationToken) -> Result<Vec<MonthRecord>> {
        {
            let state = self.state.lock().await;
            if let Some(entry) = state.entries.get(key)
                && self.is_fresh(entry)
            {
                tracing::trace!("Serving month records from cache");
                return Ok(entry.records.clone());
            }
        }
        let outcome = self.refresh(key, RefreshMode::Forced, cancel).await?;
        tracing::debug!(?outcome, "Refreshed month records");
        Ok(self.cached(key).await.unwrap_or_default())
    }

    /// Fetch this year's month records from the store into the cache.
    #[instrument(skip(self, cancel), fields(%key))]
    pub async fn refresh(&self, key: &CacheKey, mode: RefreshMode, cancel: &CancellationToken) -> Result<RefreshOutcome> {
        let token = {
            let mut state = self.state.lock().await;
            if mode == RefreshMode::IfDue
                && let Some(entry) = state.entries.get(key)
                && self.age(entry) < self.policy.debounce
            {
                tracing::trace!("Refreshed too recently; skipping");
                return Ok(RefreshOutcome::Skipped);
            }
            let token = state.issue(key);
            state.loading.insert(key.clone());
            token
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Ok(RefreshOutcome::Aborted),
            result = self.load(key, token) => result,
        };

        let mut state = self.state.lock().await;
        let latest = state.is_latest(key, token);
        if latest {
            state.loading.remove(key);
        }
        match result {
            Err(err) if !latest => {
                tracing::debug!(error = ?err, "Discarding failure of a superseded refresh");
                Ok(RefreshOutcome::Superseded)
            },
            Err(err) => {
                state.errors.insert(key.clone(), (*err).clone());
                Err(err)
            },
            Ok(RefreshOutcome::Aborted) => {
                tracing::debug!("Refresh cancelled");
                Ok(RefreshOutcome::Aborted)
            },
            Ok(outcome) => {
                if latest {
                    state.errors.remove(key);
                }
                Ok(outcome)
            },
        }
    }

    async fn load(&self, key: &CacheKey, token: u64) -> Result<RefreshOutcome> {
        let year = self.clock.today().year();
        let mut records = self.repo.find_all_months(&key.user_id, &key.plan_id, year).await?;

        let mut initialized = false;
        if records.is_empty() {
            let state = self.state.lock().await;
            let uninitialized = state.cached_in(key, year) == 0;
            if !state.is_latest(key, token) {
                return Ok(RefreshOutcome::Superseded);
            }
            drop(state);
            if uninitialized {
                tracing::info!(year, "No month records yet; initializing the year");
                self.repo.initialize_year(&key.user_id, &key.plan_id, year).await?;
                records = self.repo.find_all_months(&key.user_id, &key.plan_id, year).await?;
                if records.is_empty() {
                    exn::bail!(ErrorKind::InitializationFailed(key.to_string()));
                }
                initialized = true;
            }
        }

        let mut state = self.state.lock().await;
        if !state.is_latest(key, token) {
            tracing::debug!("Discarding superseded response");
            return Ok(RefreshOutcome::Superseded);
        }
        let cached = state.cached_in(key, year);
        if cached > 0 && records.len() < cached {
            tracing::warn!(
                cached,
                fetched = records.len(),
                "Store returned fewer month records than cached; keeping cached data"
            );
            return Ok(RefreshOutcome::KeptExisting);
        }
        let entry = CacheEntry {
            records,
            last_updated: self.clock.now(),
        };
        state.entries.insert(key.clone(), entry);
        Ok(match initialized {
            true => RefreshOutcome::Initialized,
            false => RefreshOutcome::Applied,
        })
    }

    /// Mark (or unmark) a day's reading as completed.
    pub async fn set_completion(&self, key: &CacheKey, date: Date, completed: bool) -> Result<()> {
        self.write(ProgressField::Completion, key, date, completed).await
    }

    /// Like (or unlike) a day's reading.
    pub async fn set_like(&self, key: &CacheKey, date: Date, liked: bool) -> Result<()> {
        self.write(ProgressField::Like, key, date, liked).await
    }

    /// Flip a day's completion, returning the new value.
    pub async fn toggle_completion(&self, key: &CacheKey, date: Date) -> Result<bool> {
        let completed = !self.get_completion(key, date).await;
        self.set_completion(key, date, completed).await?;
        Ok(completed)
    }

    /// Flip a day's like, returning the new value.
    pub async fn toggle_like(&self, key: &CacheKey, date: Date) -> Result<bool> {
        let liked = !self.get_like(key, date).await;
        self.set_like(key, date, liked).await?;
        Ok(liked)
    }

    #[instrument(skip(self), fields(%key, %date))]
    async fn write(&self, field: ProgressField, key: &CacheKey, date: Date, value: bool) -> Result<()> {
        if date.year() != self.clock.today().year() {
            exn::bail!(ErrorKind::OutsideCurrentYear(date.year()));
        }
        let pending = {
            let mut state = self.state.lock().await;
            PendingWrite::stage(&mut state.entries, key, field, date, value)
        };

        let result = self
            .repo
            .update_field(field, &key.user_id, &key.plan_id, date, value)
            .await
            .or_raise(|| ErrorKind::RemoteWrite);

        {
            let mut state = self.state.lock().await;
            match result {
                Ok(remote) => pending.commit(&mut state.entries, remote, self.clock.now()),
                Err(err) => {
                    pending.rollback(&mut state.entries);
                    tracing::warn!(error = ?err, "Write rejected by the store; rolled back");
                    return Err(err);
                },
            }
        }

        tracing::debug!("Write committed");
        if let Err(err) = self.refresh(key, RefreshMode::Forced, &CancellationToken::new()).await {
            tracing::warn!(error = ?err, "Refresh after write failed");
        }
        Ok(())
    }

    /// Whether the cached records mark `date` as completed.
    pub async fn get_completion(&self, key: &CacheKey, date: Date) -> bool {
        let state = self.state.lock().await;
        state.record(key, date).is_some_and(|record| record.is_completed(date.day()))
    }

    /// Whether the cached records mark `date` as liked.
    pub async fn get_like(&self, key: &CacheKey, date: Date) -> bool {
        let state = self.state.lock().await;
        state.record(key, date).is_some_and(|record| record.is_liked(date.day()))
    }

    /// Every cached completion value, by date.
    ///
    /// Days that do not exist in their month (or malformed day keys) are
    /// left out.
    pub async fn all_completions(&self, key: &CacheKey) -> BTreeMap<Date, bool> {
        let state = self.state.lock().await;
        let Some(entry) = state.entries.get(key) else {
            return BTreeMap::new();
        };
        entry
            .records
            .iter()
            .flat_map(|record| {
                record.completions.iter().filter_map(|(day, completed)| {
                    let month = Month::try_from(record.month).ok()?;
                    let date = Date::from_calendar_date(record.year, month, day.parse().ok()?).ok()?;
                    Some((date, *completed))
                })
            })
            .collect()
    }

    /// Refresh `key` every [`refresh_interval`](CachePolicy::refresh_interval)
    /// in the background until the returned handle is stopped or dropped.
    pub fn spawn_periodic_refresh(&self, key: CacheKey) -> PeriodicRefresh {
        PeriodicRefresh::spawn(self.clone(), key)
    }

    /// Copy every cache entry.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let state = self.state.lock().await;
        let mut entries: Vec<SnapshotEntry> = state
            .entries
            .iter()
            .map(|(key, entry)| SnapshotEntry {
                key: key.clone(),
                entry: entry.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        CacheSnapshot {
            taken_at: self.clock.now(),
            entries,
        }
    }

    /// Load entries from a snapshot, keeping any in-memory entry that is
    /// newer. Returns how many entries were taken from the snapshot.
    pub async fn restore(&self, snapshot: CacheSnapshot) -> usize {
        let mut state = self.state.lock().await;
        let mut restored = 0;
        for SnapshotEntry { key, entry } in snapshot.entries {
            let newer = state
                .entries
                .get(&key)
                .is_some_and(|existing| existing.last_updated >= entry.last_updated);
            if !newer {
                state.entries.insert(key, entry);
                restored += 1;
            }
        }
        tracing::debug!(restored, "Restored cache snapshot");
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use amen_store::{
        Callback, DocPath, Document, DocumentSnapshot, DocumentStore, FieldUpdates, MemoryStore, Query,
        ReadOnlyStore, StoreHandle, Subscription,
    };
    use async_trait::async_trait;
    use rstest::rstest;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use time::macros::{date, datetime};
    use tokio::sync::{mpsc, oneshot};

    const TODAY: Date = date!(2025 - 03 - 10);

    fn key() -> CacheKey {
        CacheKey::new("u1", "default")
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(datetime!(2025-03-10 09:00 UTC)))
    }

    fn cache(store: StoreHandle, clock: Arc<ManualClock>) -> CompletionCache {
        let repo = MonthRepository::new(store, clock.clone());
        CompletionCache::new(repo, clock, CachePolicy::default())
    }

    async fn initialized_store(clock: &Arc<ManualClock>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        MonthRepository::new(store.clone(), clock.clone())
            .initialize_year("u1", "default", 2025)
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key().to_string(), "u1_default");
    }

    #[tokio::test]
    async fn test_fresh_reads_fetch_once() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock.clone());
        let cancel = CancellationToken::new();
        let before = store.query_count();

        let first = cache.get_monthly_plans(&key(), &cancel).await.unwrap();
        clock.advance(Duration::from_secs(29 * 60));
        let second = cache.get_monthly_plans(&key(), &cancel).await.unwrap();

        assert_eq!(store.query_count() - before, 1);
        assert_eq!(first, second);
        assert_eq!(first.len(), 12);
        assert_eq!(cache.state(&key()).await, CacheState::Loaded);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock.clone());
        let cancel = CancellationToken::new();

        assert_eq!(cache.state(&key()).await, CacheState::Unloaded);
        cache.get_monthly_plans(&key(), &cancel).await.unwrap();
        clock.advance(Duration::from_secs(31 * 60));
        assert_eq!(cache.state(&key()).await, CacheState::Stale);

        let before = store.query_count();
        cache.get_monthly_plans(&key(), &cancel).await.unwrap();
        assert_eq!(store.query_count() - before, 1);
        assert_eq!(cache.last_updated(&key()).await, Some(clock.now()));
    }

    #[tokio::test]
    async fn test_first_read_initializes_the_year() {
        let clock = clock();
        let store = Arc::new(MemoryStore::default());
        let cache = cache(store.clone(), clock);

        let outcome = cache
            .refresh(&key(), RefreshMode::Forced, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Initialized);

        let records = cache.cached(&key()).await.unwrap();
        assert_eq!(records.len(), 12);
        assert_eq!(records.iter().map(|r| r.month).collect::<Vec<_>>(), (1..=12).collect::<Vec<_>>());
        assert!(records.iter().all(|r| r.year == 2025 && r.completions.is_empty() && r.likes.is_empty()));
        assert_eq!(store.len().await, 12);
    }

    #[tokio::test]
    async fn test_initialization_that_creates_nothing_fails() {
        let clock = clock();
        let store: StoreHandle = Arc::new(ReadOnlyStore::new(Arc::new(MemoryStore::default())));
        let cache = cache(store, clock);

        let err = cache
            .get_monthly_plans(&key(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::InitializationFailed("u1_default".into()));
        assert_eq!(cache.last_error(&key()).await, Some((*err).clone()));
        assert_eq!(cache.state(&key()).await, CacheState::Unloaded);
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::fewer(&[1, 2, 3])]
    #[tokio::test]
    async fn test_short_fetch_keeps_cached_records(#[case] months_in_store: &[u8]) {
        let clock = clock();
        let populated = cache(initialized_store(&clock).await, clock.clone());
        populated.set_completion(&key(), TODAY, true).await.unwrap();
        let snapshot = populated.snapshot().await;
        let original = populated.cached(&key()).await.unwrap();

        let store = Arc::new(MemoryStore::default());
        let repo = MonthRepository::new(store.clone(), clock.clone());
        for month in months_in_store {
            repo.create_month("u1", "default", 2025, *month).await.unwrap();
        }
        let cache = cache(store.clone(), clock.clone());
        cache.restore(snapshot).await;
        clock.advance(Duration::from_secs(60 * 60));

        let records = cache.get_monthly_plans(&key(), &CancellationToken::new()).await.unwrap();
        assert_eq!(records, original);
        assert!(cache.get_completion(&key(), TODAY).await);
        assert_eq!(store.len().await, months_in_store.len());
        assert_eq!(
            cache.refresh(&key(), RefreshMode::Forced, &CancellationToken::new()).await.unwrap(),
            RefreshOutcome::KeptExisting
        );
    }

    #[tokio::test]
    async fn test_non_forced_refresh_is_debounced() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock.clone());
        let cancel = CancellationToken::new();
        cache.get_monthly_plans(&key(), &cancel).await.unwrap();

        let outcome = cache.refresh(&key(), RefreshMode::IfDue, &cancel).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Skipped);
        clock.advance(Duration::from_secs(6));
        let outcome = cache.refresh(&key(), RefreshMode::IfDue, &cancel).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Applied);
    }

    #[tokio::test]
    async fn test_cancelled_refresh_is_not_an_error() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store, clock);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = cache.refresh(&key(), RefreshMode::Forced, &cancel).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Aborted);
        assert_eq!(cache.state(&key()).await, CacheState::Unloaded);
        assert_eq!(cache.last_error(&key()).await, None);
        assert!(cache.get_monthly_plans(&key(), &cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_is_reported_and_cleared() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock);
        let cancel = CancellationToken::new();

        store.set_offline(true);
        let err = cache.get_monthly_plans(&key(), &cancel).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Store);
        assert_eq!(cache.last_error(&key()).await, Some(ErrorKind::Store));

        store.set_offline(false);
        cache.get_monthly_plans(&key(), &cancel).await.unwrap();
        assert_eq!(cache.last_error(&key()).await, None);
    }

    #[tokio::test]
    async fn test_write_updates_cache_and_store() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock.clone());
        cache.get_monthly_plans(&key(), &CancellationToken::new()).await.unwrap();

        cache.set_completion(&key(), TODAY, true).await.unwrap();
        assert!(cache.toggle_like(&key(), TODAY).await.unwrap());
        assert!(cache.get_completion(&key(), TODAY).await);
        assert!(cache.get_like(&key(), TODAY).await);
        assert!(!cache.get_completion(&key(), date!(2025 - 03 - 11)).await);

        let stored = MonthRepository::new(store, clock)
            .find_month("u1", "default", 2025, 3)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_completed(10));
        assert!(stored.is_liked(10));

        assert!(!cache.toggle_completion(&key(), TODAY).await.unwrap());
        assert!(!cache.get_completion(&key(), TODAY).await);
    }

    #[rstest]
    #[case::unset(None)]
    #[case::completed(Some(true))]
    #[tokio::test]
    async fn test_failed_write_rolls_back(#[case] initial: Option<bool>) {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock);
        cache.get_monthly_plans(&key(), &CancellationToken::new()).await.unwrap();
        if let Some(completed) = initial {
            cache.set_completion(&key(), TODAY, completed).await.unwrap();
        }
        let before = cache.cached(&key()).await;

        store.set_offline(true);
        let err = cache.set_completion(&key(), TODAY, false).await.unwrap_err();
        assert_eq!(*err, ErrorKind::RemoteWrite);
        assert_eq!(cache.cached(&key()).await, before);
        let err = cache.toggle_like(&key(), TODAY).await.unwrap_err();
        assert_eq!(*err, ErrorKind::RemoteWrite);
        assert_eq!(cache.cached(&key()).await, before);
    }

    #[tokio::test]
    async fn test_new_year_starts_new_records() {
        let clock = Arc::new(ManualClock::new(datetime!(2025-12-31 22:00 UTC)));
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock.clone());
        let cancel = CancellationToken::new();
        cache.get_monthly_plans(&key(), &cancel).await.unwrap();
        cache.set_completion(&key(), date!(2025 - 01 - 02), true).await.unwrap();

        clock.set(datetime!(2026-01-02 08:00 UTC));
        assert_eq!(cache.state(&key()).await, CacheState::Stale);
        let records = cache.get_monthly_plans(&key(), &cancel).await.unwrap();
        assert_eq!(records.len(), 12);
        assert!(records.iter().all(|record| record.year == 2026));
        assert_eq!(cache.last_updated(&key()).await, Some(datetime!(2026-01-02 08:00 UTC)));

        let new_year = date!(2026 - 01 - 02);
        cache.set_completion(&key(), new_year, true).await.unwrap();
        assert!(cache.get_completion(&key(), new_year).await);

        let repo = MonthRepository::new(store, clock);
        let last_year = repo.find_month("u1", "default", 2025, 1).await.unwrap().unwrap();
        assert_eq!(last_year.year, 2025);
        assert!(last_year.is_completed(2));
        assert!(repo.find_month("u1", "default", 2026, 1).await.unwrap().unwrap().is_completed(2));
    }

    #[rstest]
    #[case::last_year(date!(2024 - 03 - 10))]
    #[case::next_year(date!(2026 - 03 - 10))]
    #[tokio::test]
    async fn test_write_outside_current_year_is_rejected(#[case] day: Date) {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store.clone(), clock.clone());
        cache.get_monthly_plans(&key(), &CancellationToken::new()).await.unwrap();
        let before = cache.cached(&key()).await;

        let err = cache.set_completion(&key(), day, true).await.unwrap_err();
        assert_eq!(*err, ErrorKind::OutsideCurrentYear(day.year()));
        assert_eq!(cache.cached(&key()).await, before);
        assert!(!cache.get_completion(&key(), TODAY).await);
        let march = MonthRepository::new(store, clock)
            .find_month("u1", "default", 2025, 3)
            .await
            .unwrap()
            .unwrap();
        assert!(march.completions.is_empty());
    }

    #[tokio::test]
    async fn test_all_completions() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store, clock);
        cache.get_monthly_plans(&key(), &CancellationToken::new()).await.unwrap();
        cache.set_completion(&key(), date!(2025 - 01 - 31), true).await.unwrap();
        cache.set_completion(&key(), TODAY, true).await.unwrap();
        cache.set_completion(&key(), TODAY, false).await.unwrap();

        let completions = cache.all_completions(&key()).await;
        assert_eq!(
            completions,
            BTreeMap::from([(date!(2025 - 01 - 31), true), (TODAY, false)])
        );
    }

    /// Delegates to a [`MemoryStore`], but holds each query's result until the
    /// test releases it.
    struct GatedStore {
        inner: Arc<MemoryStore>,
        started: mpsc::UnboundedSender<()>,
        gates: StdMutex<VecDeque<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl DocumentStore for GatedStore {
        fn name(&self) -> &str {
            "gated"
        }

        async fn get(&self, path: &DocPath) -> amen_store::error::Result<Option<Document>> {
            self.inner.get(path).await
        }

        async fn set(&self, path: &DocPath, document: Document) -> amen_store::error::Result<()> {
            self.inner.set(path, document).await
        }

        async fn update(&self, path: &DocPath, fields: FieldUpdates) -> amen_store::error::Result<()> {
            self.inner.update(path, fields).await
        }

        async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> amen_store::error::Result<()> {
            self.inner.batch_write(writes).await
        }

        async fn query(&self, query: &Query) -> amen_store::error::Result<Vec<DocumentSnapshot>> {
            let result = self.inner.query(query).await;
            let gate = self.gates.lock().unwrap().pop_front();
            self.started.send(()).unwrap();
            if let Some(gate) = gate {
                gate.await.unwrap();
            }
            result
        }

        async fn subscribe(&self, query: Query, callback: Callback) -> amen_store::error::Result<Subscription> {
            self.inner.subscribe(query, callback).await
        }
    }

    #[tokio::test]
    async fn test_out_of_order_responses_keep_the_newest() {
        let clock = clock();
        let inner = initialized_store(&clock).await;
        let (started_tx, mut started) = mpsc::unbounded_channel();
        let (release_a, gate_a) = oneshot::channel();
        let (release_b, gate_b) = oneshot::channel();
        let store = Arc::new(GatedStore {
            inner: inner.clone(),
            started: started_tx,
            gates: StdMutex::new(VecDeque::from([gate_a, gate_b])),
        });
        let cache = cache(store, clock.clone());

        // A reads the store and then stalls.
        let request_a = tokio::spawn({
            let cache = cache.clone();
            async move { cache.refresh(&key(), RefreshMode::Forced, &CancellationToken::new()).await }
        });
        started.recv().await.unwrap();

        // The data changes; B is issued later and answers first.
        MonthRepository::new(inner, clock)
            .update_completion("u1", "default", date!(2025 - 03 - 10), true)
            .await
            .unwrap();
        release_b.send(()).unwrap();
        let outcome_b = cache
            .refresh(&key(), RefreshMode::Forced, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome_b, RefreshOutcome::Applied);

        release_a.send(()).unwrap();
        let outcome_a = request_a.await.unwrap().unwrap();
        assert_eq!(outcome_a, RefreshOutcome::Superseded);

        assert!(cache.get_completion(&key(), TODAY).await);
        assert_eq!(cache.state(&key()).await, CacheState::Loaded);
    }

    #[tokio::test]
    async fn test_restore_keeps_newer_entries() {
        let clock = clock();
        let store = initialized_store(&clock).await;
        let cache = cache(store, clock.clone());
        cache.get_monthly_plans(&key(), &CancellationToken::new()).await.unwrap();
        let old = cache.snapshot().await;

        clock.advance(Duration::from_secs(10));
        cache.set_like(&key(), TODAY, true).await.unwrap();
        assert_eq!(cache.restore(old.clone()).await, 0);
        assert!(cache.get_like(&key(), TODAY).await);

        let other = CompletionCache::new(
            MonthRepository::new(Arc::new(MemoryStore::default()), clock.clone()),
            clock,
            CachePolicy::default(),
        );
        assert_eq!(other.restore(old.clone()).await, 1);
        assert_eq!(other.snapshot().await.entries, old.entries);
    }
}
