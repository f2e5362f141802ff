//! Optimistic writes as explicit transactions.
//!
//! A [`PendingWrite`] is created by applying a change to the cached month
//! record before the remote store has seen it. It is then either committed,
//! replacing the record with the one the store returned, or rolled back,
//! restoring exactly the value the day had before: a day that was never set
//! goes back to being unset rather than `false`.

use std::collections::HashMap;

use time::{Date, OffsetDateTime};

use super::{CacheEntry, CacheKey};
use crate::models::{MonthRecord, ProgressField};

/// An optimistic change that has been applied locally but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending write must be committed or rolled back"]
pub struct PendingWrite {
    key: CacheKey,
    field: ProgressField,
    year: i32,
    month: u8,
    day: u8,
    /// `None` when there was no cached record to change.
    prior: Option<Option<bool>>,
}
impl PendingWrite {
    /// Apply `value` to the cached record for `date`, remembering what was there.
    pub fn stage(
        entries: &mut HashMap<CacheKey, CacheEntry>,
        key: &CacheKey,
        field: ProgressField,
        date: Date,
        value: bool,
    ) -> Self {
        let (year, month, day) = (date.year(), u8::from(date.month()), date.day());
        let prior = record_mut(entries, key, year, month).map(|record| {
            let prior = record.value(field, day);
            record.set_value(field, day, Some(value));
            prior
        });
        if prior.is_none() {
            tracing::debug!(%key, %field, %date, "No cached record to update optimistically");
        }
        Self {
            key: key.clone(),
            field,
            year,
            month,
            day,
            prior,
        }
    }

    /// Whether a cached record was changed by [`stage`](Self::stage).
    pub fn is_staged(&self) -> bool {
        self.prior.is_some()
    }

    /// Accept the remote store's version of the month and mark the entry fresh.
    pub fn commit(self, entries: &mut HashMap<CacheKey, CacheEntry>, remote: MonthRecord, now: OffsetDateTime) {
        let Some(entry) = entries.get_mut(&self.key) else {
            return;
        };
        if remote.year != self.year || remote.month != self.month {
            tracing::warn!(key = %self.key, month = self.month, "Store returned a different month than was written");
            return;
        }
        match entry
            .records
            .iter_mut()
            .find(|record| record.year == self.year && record.month == self.month)
        {
            Some(record) => *record = remote,
            None => {
                entry.records.push(remote);
                entry.records.sort_by_key(|record| record.month);
            },
        }
        entry.last_updated = now;
    }

    /// Put the day back the way it was before [`stage`](Self::stage).
    pub fn rollback(self, entries: &mut HashMap<CacheKey, CacheEntry>) {
        let Some(prior) = self.prior else {
            return;
        };
        if let Some(record) = record_mut(entries, &self.key, self.year, self.month) {
            record.set_value(self.field, self.day, prior);
        }
    }
}

fn record_mut<'a>(
    entries: &'a mut HashMap<CacheKey, CacheEntry>,
    key: &CacheKey,
    year: i32,
    month: u8,
) -> Option<&'a mut MonthRecord> {
    entries
        .get_mut(key)?
        .records
        .iter_mut()
        .find(|record| record.year == year && record.month == month)
}
