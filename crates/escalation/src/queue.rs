//! Cancellable one-shot escalation jobs keyed by conversation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;

/// A pending email fallback for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationJob {
    pub site_id: String,
    pub conversation_id: String,
}

impl EscalationJob {
    pub fn new(site_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

/// Delayed job store with at most one job per conversation.
#[async_trait]
pub trait EscalationQueue: Send + Sync {
    /// Schedule `job` to become due after `delay`.
    ///
    /// Returns `false` without touching the existing job when the
    /// conversation already has one: the first arm wins.
    async fn arm(&self, job: EscalationJob, delay: Duration) -> Result<bool>;

    /// Cancel the conversation's job. Returns whether one was pending.
    async fn disarm(&self, conversation_id: &str) -> Result<bool>;

    /// Remove and return up to `limit` due jobs, earliest first.
    ///
    /// A job is returned by exactly one call, across every process sharing
    /// the queue.
    async fn claim_due(&self, limit: usize) -> Result<Vec<EscalationJob>>;

    /// The conversation's pending job, if any.
    async fn pending(&self, conversation_id: &str) -> Result<Option<EscalationJob>>;
}

/// Process-local queue on the tokio clock.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    jobs: Mutex<HashMap<String, (Instant, EscalationJob)>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EscalationQueue for InMemoryQueue {
    async fn arm(&self, job: EscalationJob, delay: Duration) -> Result<bool> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job.conversation_id) {
            return Ok(false);
        }
        jobs.insert(job.conversation_id.clone(), (Instant::now() + delay, job));
        Ok(true)
    }

    async fn disarm(&self, conversation_id: &str) -> Result<bool> {
        Ok(self.jobs.lock().await.remove(conversation_id).is_some())
    }

    async fn claim_due(&self, limit: usize) -> Result<Vec<EscalationJob>> {
        let now = Instant::now();
        let mut jobs = self.jobs.lock().await;

        let mut due: Vec<(Instant, String)> = jobs
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(id, (at, _))| (*at, id.clone()))
            .collect();
        due.sort();
        due.truncate(limit);

        Ok(due
            .into_iter()
            .filter_map(|(_, id)| jobs.remove(&id).map(|(_, job)| job))
            .collect())
    }

    async fn pending(&self, conversation_id: &str) -> Result<Option<EscalationJob>> {
        Ok(self
            .jobs
            .lock()
            .await
            .get(conversation_id)
            .map(|(_, job)| job.clone()))
    }
}
