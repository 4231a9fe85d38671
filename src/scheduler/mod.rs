//! Periodic expiry sweep. The sweep itself is idempotent, so this task can
//! coexist with the `/admin/close-expired` trigger or an external cron
//! calling the same operation.

// region:    --- Imports
use crate::auction::lifecycle;
use crate::database::DatabaseManager;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::error;

// endregion: --- Imports

// region:    --- Auction Scheduler

pub struct AuctionScheduler {
    db: Arc<DatabaseManager>,
    period: Duration,
}

impl AuctionScheduler {
    pub fn new(db: Arc<DatabaseManager>, period_secs: u64) -> Self {
        Self {
            db,
            period: Duration::from_secs(period_secs),
        }
    }

    /// Spawn the sweep loop.
    pub fn start(&self) {
        let db = Arc::clone(&self.db);
        let period = self.period;
        tokio::spawn(async move {
            let mut interval = interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = lifecycle::close_expired_auctions(&db).await {
                    error!("{:<12} --> expiry sweep failed: {:?}", "Scheduler", e);
                }
            }
        });
    }
}
// endregion: --- Auction Scheduler
