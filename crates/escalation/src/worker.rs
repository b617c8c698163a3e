use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::processor::{FallbackProcessor, ProcessOutcome};
use crate::queue::EscalationQueue;

/// Default interval between queue polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default maximum number of jobs claimed per poll.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Polls the queue for due jobs and processes each on its own task.
pub struct EscalationWorker {
    queue: Arc<dyn EscalationQueue>,
    processor: Arc<FallbackProcessor>,
    poll_interval: Duration,
    batch_size: usize,
}

impl EscalationWorker {
    pub fn new(queue: Arc<dyn EscalationQueue>, processor: Arc<FallbackProcessor>) -> Self {
        Self {
            queue,
            processor,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "Escalation worker started");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Escalation worker stopped");
    }

    /// Claim one batch of due jobs and process them concurrently.
    pub async fn poll_once(&self) -> Vec<ProcessOutcome> {
        let jobs = match self.queue.claim_due(self.batch_size).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "Failed to claim due escalations");
                return Vec::new();
            }
        };

        let tasks = jobs.into_iter().map(|job| {
            let processor = Arc::clone(&self.processor);
            tokio::spawn(async move {
                match processor.process(&job).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        error!(
                            site_id = %job.site_id,
                            conversation_id = %job.conversation_id,
                            error = %e,
                            "Fallback processing failed"
                        );
                        None
                    }
                }
            })
        });

        join_all(tasks)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Fallback task panicked");
                    None
                }
            })
            .collect()
    }
}
