use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{CacheKey, CompletionCache, RefreshMode};

/// A background task refreshing one cache key on a fixed interval.
///
/// The task stops when [`stop`](Self::stop) is called or the handle is dropped.
#[derive(Debug)]
pub struct PeriodicRefresh {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}
impl PeriodicRefresh {
    pub(super) fn spawn(cache: CompletionCache, key: CacheKey) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = cache.policy().refresh_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            tracing::debug!(%key, ?period, "Started periodic refresh");
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => match cache.refresh(&key, RefreshMode::IfDue, &token).await {
                        Ok(outcome) => tracing::trace!(%key, ?outcome, "Periodic refresh"),
                        Err(err) => tracing::warn!(%key, error = ?err, "Periodic refresh failed"),
                    },
                }
            }
            tracing::debug!(%key, "Stopped periodic refresh");
        });
        Self { cancel, handle }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
impl Drop for PeriodicRefresh {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
