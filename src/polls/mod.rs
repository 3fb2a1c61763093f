//! Polling Module
//!
//! In-memory poll registry with single-ballot-per-voter voting and
//! lifecycle notifications for integrations.

pub mod error;
pub mod events;
pub mod ids;
pub mod store;
pub mod types;

pub use error::PollError;
pub use events::{ListenerError, LoggingListener, PollEvent, PollListener};
pub use ids::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use store::{create_store, PollStore};
pub use types::{Poll, PollOption};
