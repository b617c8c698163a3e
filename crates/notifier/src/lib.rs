//! Notification coordinator for ChatIQ.
//!
//! Turns chat events into notifications:
//! - visitor message: live broadcast, bot push and (when enabled) an email
//!   fallback armed for the site's timeout, all concurrently;
//! - operator message: the pending fallback is cancelled.
//!
//! The coordinator only sees the traits in [`channels`], so any channel can
//! be swapped for a fake in tests.

pub mod channels;
pub mod coordinator;
pub mod error;

pub use channels::{BotNotifier, LiveBroadcaster, SiteDirectory};
pub use coordinator::{BotStatus, Coordinator, DispatchReport, EscalationStatus};
pub use error::NotifyError;
