//! # fanout
//!
//! Real-time delivery of chat events to operators.
//!
//! - [`FanoutBus`]: tenant-keyed publish/subscribe, in-process
//!   ([`InMemoryBus`]) or across instances over Redis ([`RedisBus`]).
//! - [`LiveGateway`]: per-connection operator sessions that join a site room,
//!   receive its events and query the unread conversation count.
//!
//! ```no_run
//! use std::sync::Arc;
//! use database::Database;
//! use fanout::{InMemoryBus, LiveGateway};
//!
//! # async fn run(db: Database) -> Result<(), fanout::GatewayError> {
//! let gateway = LiveGateway::new(db, Arc::new(InMemoryBus::new()));
//! let mut conn = gateway.connect("operator-1");
//! gateway.join(&mut conn, "site-1").await?;
//! let count = gateway.get_unread_count(&conn, "site-1").await?;
//! # Ok(())
//! # }
//! ```

mod bus;
mod error;
mod gateway;
mod memory;
mod protocol;
mod redis_bus;
mod session;

pub use bus::{FanoutBus, FanoutEvent, Subscription};
pub use error::{BusError, GatewayError};
pub use gateway::{Connection, LiveGateway};
pub use memory::{InMemoryBus, DEFAULT_CAPACITY};
pub use protocol::{ClientFrame, ServerFrame};
pub use redis_bus::{RedisBus, ReconnectConfig};
pub use session::{ConnectionId, Session, SessionState, SessionTable};
