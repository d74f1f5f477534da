// Maintenance Service
// Periodic purge of expired queue keys for backends without native expiry

use crate::application::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Default purge cadence (1 hour)
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    interval: Duration,
}

impl MaintenanceScheduler {
    pub fn new(maintenance: Arc<dyn Maintenance>, interval: Duration) -> Self {
        Self {
            maintenance,
            interval,
        }
    }

    /// Run the purge loop until shutdown; failures are logged and retried next round
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(interval_secs = self.interval.as_secs(), "Maintenance scheduler started");

        // First round one interval after start, not at boot
        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => break,
            }

            match self.maintenance.run_full_maintenance().await {
                Ok(stats) => info!(
                    key_count = stats.key_count,
                    member_count = stats.member_count,
                    "Scheduled maintenance completed"
                ),
                Err(e) => error!(error = %e, "Scheduled maintenance failed"),
            }
        }

        info!("Maintenance scheduler stopped");
    }

    /// Run one round immediately
    pub async fn run_now(&self) -> Result<MaintenanceStats> {
        self.maintenance.run_full_maintenance().await
    }
}
