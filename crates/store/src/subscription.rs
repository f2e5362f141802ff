//! Live query registrations.
//!
//! Backends keep a [`Subscribers`] list and call
//! [`Subscribers::active`] after each successful write to re-run every live
//! query. Delivery stops as soon as the caller's [`Subscription`] handle is
//! dropped or explicitly unsubscribed; the registration itself is pruned on
//! the next write.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::document::DocumentSnapshot;
use crate::query::Query;

/// Receives the full result set of a live query, initially and after every change.
pub type Callback = Arc<dyn Fn(&[DocumentSnapshot]) + Send + Sync>;

/// A registered live query.
#[derive(Clone)]
pub struct Registration {
    pub id: u64,
    pub query: Query,
    callback: Callback,
    active: Arc<AtomicBool>,
}
impl Registration {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Hand a result set to the subscriber, unless it has gone away meanwhile.
    pub fn deliver(&self, results: &[DocumentSnapshot]) {
        if self.is_active() {
            (self.callback)(results);
        }
    }
}

/// Handle to a live query. Dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
}
impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}
impl Drop for Subscription {
    fn drop(&mut self) {
        if self.active.swap(false, Ordering::AcqRel) {
            tracing::trace!(subscription = self.id, "Unsubscribed from live query");
        }
    }
}

/// The live queries registered against one backend.
#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    registrations: RwLock<Vec<Registration>>,
}
impl Subscribers {
    pub fn register(&self, query: Query, callback: Callback) -> (Registration, Subscription) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        let registration = Registration {
            id,
            query,
            callback,
            active: Arc::clone(&active),
        };
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(registration.clone());
        (registration, Subscription { id, active })
    }

    /// Live registrations, pruning any whose handle has been dropped.
    pub fn active(&self) -> Vec<Registration> {
        let mut registrations = self.registrations.write().unwrap_or_else(PoisonError::into_inner);
        registrations.retain(Registration::is_active);
        registrations.clone()
    }

    pub fn len(&self) -> usize {
        self.active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
