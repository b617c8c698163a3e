//! # mailer
//!
//! Outbound email for operator notifications, over SMTP or the Resend HTTP API.
//!
//! ```no_run
//! use mailer::{Email, MailTransport, Mailer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailer::MailError> {
//!     let mailer = Mailer::from_env()?;
//!
//!     let email = Email::new("owner@example.com", "New message", "A visitor is waiting")
//!         .with_reply_to("visitor@example.org");
//!     mailer.send(&email).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! When `SMTP_HOST` is unset the mailer is unconfigured and every send is
//! skipped with a warning.

mod config;
mod error;
mod mailer;
mod resend;
mod smtp;
mod types;

pub use config::{MailConfig, Provider, DEFAULT_SMTP_PORT};
pub use error::MailError;
pub use mailer::{MailTransport, Mailer};
pub use resend::{ResendClient, RESEND_API_BASE};
pub use smtp::SmtpClient;
pub use types::{is_valid_address, Email, SendStatus};
