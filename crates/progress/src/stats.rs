use amen_store::Subscription;
use time::Date;
use tokio::sync::watch;

use crate::error::Result;
use crate::models::PlanStats;
use crate::repo::MonthRepository;

/// Live totals of how many users completed and liked one day of a plan.
///
/// The current value is `None` until the store has delivered its first
/// result. Delivery stops when the watcher is dropped.
#[derive(Debug)]
pub struct StatsWatcher {
    receiver: watch::Receiver<Option<PlanStats>>,
    subscription: Subscription,
}
impl StatsWatcher {
    pub async fn start(repo: &MonthRepository, plan_id: &str, date: Date) -> Result<Self> {
        let (sender, receiver) = watch::channel(None);
        let subscription = repo
            .listen_to_plan_stats(plan_id, date, move |stats| {
                sender.send_replace(Some(stats));
            })
            .await?;
        Ok(Self { receiver, subscription })
    }

    pub fn current(&self) -> Option<PlanStats> {
        *self.receiver.borrow()
    }

    /// Another handle on the stats, e.g. for a view that outlives this call.
    pub fn subscribe(&self) -> watch::Receiver<Option<PlanStats>> {
        self.receiver.clone()
    }

    /// Wait for the next change and return it.
    ///
    /// Returns `None` once the underlying subscription has ended.
    pub async fn changed(&mut self) -> Option<PlanStats> {
        self.receiver.changed().await.ok()?;
        *self.receiver.borrow_and_update()
    }

    pub fn stop(self) {
        self.subscription.unsubscribe();
    }
}
