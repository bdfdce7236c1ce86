use std::sync::Arc;

use foamline_booking::SweepRunner;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Handle to the background sweep loop: payment reminders, pending expiry,
/// event reminders. Ticks are sequential, so a slow sweep never overlaps
/// the next one.
pub struct SweepWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweepWorker {
    pub fn start(runner: Arc<SweepRunner>, interval_seconds: u64) -> Self {
        let (shutdown, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_seconds));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval_seconds, "sweep worker started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match runner.run_sweep().await {
                            Ok(report) => {
                                if report.payment_reminders_sent > 0
                                    || report.expired > 0
                                    || report.event_reminders_sent > 0
                                {
                                    info!(
                                        reminders = report.payment_reminders_sent,
                                        expired = report.expired,
                                        event_reminders = report.event_reminders_sent,
                                        "sweep made progress"
                                    );
                                }
                            }
                            // Failed passes are retried wholesale on the next
                            // tick; every pass is idempotent.
                            Err(e) => error!("sweep failed: {}", e),
                        }
                    }
                    _ = stopped.changed() => {
                        info!("sweep worker stopping");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Signal the loop to exit and wait for any in-flight sweep to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
