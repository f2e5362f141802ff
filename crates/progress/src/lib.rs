//! Reading progress: per-user month records and the cache in front of them.
//!
//! [`MonthRepository`] and [`UserRepository`] map records onto a
//! [`DocumentStore`](amen_store::DocumentStore). [`CompletionCache`] serves
//! reads from memory while fresh, applies completion and like changes
//! optimistically, and keeps out-of-order or short responses from the store
//! from overwriting good local state.

pub mod cache;
mod clock;
pub mod error;
mod identity;
pub mod models;
mod repo;
mod snapshot;
mod stats;

pub use crate::cache::{
    CacheEntry, CacheKey, CachePolicy, CacheState, CompletionCache, PendingWrite, PeriodicRefresh, RefreshMode,
    RefreshOutcome,
};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::identity::{IdentityProvider, StaticIdentity};
pub use crate::repo::{MonthRepository, UserRepository};
pub use crate::snapshot::{CacheSnapshot, JsonFileSnapshots, SnapshotEntry, SnapshotStore};
pub use crate::stats::StatsWatcher;
