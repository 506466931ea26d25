//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Fixed-interval telemetry polling with cancellable handles."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sunkalp_session::Credentials;
use sunkalp_telemetry::FeedSource;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::dashboard::PollReport;

/// Spawns poll loops against a shared feed source.
#[derive(Clone)]
pub struct PollScheduler {
    source: Arc<dyn FeedSource>,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(source: Arc<dyn FeedSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling: one fetch right away, then one per interval.
    ///
    /// Reports are tagged with `generation` and sent on `reports`. The loop
    /// ends when the handle is stopped or dropped, or the receiver goes away.
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        generation: u64,
        credentials: Credentials,
        reports: mpsc::UnboundedSender<PollReport>,
    ) -> PollHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let source = Arc::clone(&self.source);
        let period = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                generation,
                channel_id = %credentials.channel_id(),
                interval_secs = period.as_secs_f64(),
                "telemetry polling started"
            );

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        // An in-flight fetch is allowed to finish; its report is
                        // filtered by generation on the receiving side.
                        let result = source
                            .fetch_window(credentials.channel_id(), credentials.api_key())
                            .await;
                        let report = PollReport {
                            generation,
                            result,
                            completed_at: Utc::now(),
                        };
                        if reports.send(report).is_err() {
                            warn!(generation, "poll report receiver closed");
                            break;
                        }
                    }
                }
            }
            debug!(generation, "telemetry polling stopped");
        });

        PollHandle {
            generation,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Running poll loop. Stopping guarantees no further fetch is started;
/// dropping the handle stops the loop as well.
#[derive(Debug)]
pub struct PollHandle {
    generation: u64,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop and wait for the task, including any in-flight fetch.
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(generation = self.generation, error = %err, "poll task join error");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
