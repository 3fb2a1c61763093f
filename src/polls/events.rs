//! Poll lifecycle notifications
//!
//! The store raises a [`PollEvent`] after each successful mutation and hands it
//! to every registered [`PollListener`]. Delivery is fire-and-forget: listener
//! errors and panics are logged here and never reach the caller of the store.

use super::types::Poll;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Notification raised by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A poll was added to the registry
    PollCreated(Poll),
    /// A ballot was recorded
    Vote {
        poll_id: String,
        option_id: String,
        voter_id: String,
    },
}

impl PollEvent {
    /// Event name as exposed to integrations
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PollCreated(_) => "pollCreated",
            Self::Vote { .. } => "vote",
        }
    }

    /// ID of the poll the event concerns
    pub fn poll_id(&self) -> &str {
        match self {
            Self::PollCreated(poll) => &poll.id,
            Self::Vote { poll_id, .. } => poll_id,
        }
    }
}

/// Listener failure
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Delivery queue full")]
    QueueFull,
    #[error("Delivery queue closed")]
    QueueClosed,
    #[error("Listener error: {0}")]
    Other(String),
}

/// Observer of store notifications
pub trait PollListener: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Handle one event. Called synchronously after the store lock is released.
    ///
    /// Events from concurrent callers may arrive in a different order than
    /// their mutations were applied; read the current state with
    /// `PollStore::get_poll` rather than replaying events.
    fn on_event(&self, event: &PollEvent) -> Result<(), ListenerError>;
}

/// Registered listeners, notified in registration order
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: RwLock<Vec<Arc<dyn PollListener>>>,
}

impl ListenerSet {
    pub(crate) fn add(&self, listener: Arc<dyn PollListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub(crate) fn emit(&self, event: &PollEvent) {
        // Snapshot so a listener may subscribe others without deadlocking
        let listeners: Vec<Arc<dyn PollListener>> = self.listeners.read().clone();

        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        listener = listener.name(),
                        event = event.kind(),
                        poll_id = event.poll_id(),
                        error = %e,
                        "poll listener failed"
                    );
                }
                Err(_) => {
                    error!(
                        listener = listener.name(),
                        event = event.kind(),
                        poll_id = event.poll_id(),
                        "poll listener panicked"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl PollListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_event(&self, event: &PollEvent) -> Result<(), ListenerError> {
        match event {
            PollEvent::PollCreated(poll) => {
                info!(
                    poll_id = %poll.id,
                    question = %poll.question,
                    options = poll.options.len(),
                    "A new poll was created"
                );
            }
            PollEvent::Vote {
                poll_id,
                option_id,
                voter_id,
            } => {
                info!(
                    poll_id = %poll_id,
                    option_id = %option_id,
                    voter_id = %voter_id,
                    "Vote recorded"
                );
            }
        }
        Ok(())
    }
}
