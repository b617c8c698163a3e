//! Email fallback for unanswered visitor messages.
//!
//! A visitor message arms a one-shot job for its conversation; an operator
//! reply disarms it. When the job comes due, [`FallbackProcessor`] checks the
//! current state again and emails the site's operators a digest of every
//! unread visitor message.
//!
//! ```no_run
//! use std::sync::Arc;
//! use escalation::{EscalationJob, EscalationQueue, EscalationWorker, FallbackProcessor, InMemoryQueue};
//! use mailer::Mailer;
//!
//! # async fn example(db: database::Database) -> escalation::Result<()> {
//! let queue = Arc::new(InMemoryQueue::new());
//! queue
//!     .arm(EscalationJob::new("site-1", "chat-1"), std::time::Duration::from_secs(300))
//!     .await?;
//!
//! let processor = FallbackProcessor::new(db, Arc::new(Mailer::from_env()?), "https://admin.example.com");
//! let (_stop, stopped) = tokio::sync::watch::channel(false);
//! EscalationWorker::new(queue, Arc::new(processor)).run(stopped).await;
//! # Ok(())
//! # }
//! ```

mod digest;
mod error;
mod processor;
mod queue;
mod redis_queue;
mod worker;

pub use digest::{compose, find_reply_to, Digest, DEFAULT_VISITOR_NAME};
pub use error::{EscalationError, Result};
pub use processor::{FallbackProcessor, ProcessOutcome, SkipReason};
pub use queue::{EscalationJob, EscalationQueue, InMemoryQueue};
pub use redis_queue::{RedisQueue, DEFAULT_KEY_PREFIX};
pub use worker::{EscalationWorker, DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL};
