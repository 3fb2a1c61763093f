//! Poll delivery to Slack.
//!
//! [`SlackNotifier`] is a store listener that queues newly created polls;
//! [`delivery_loop`] drains the queue in the background and posts each poll,
//! retrying transient failures. The store never waits on Slack.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::slack::{SlackChannel, SlackError};
use crate::polls::{ListenerError, Poll, PollEvent, PollListener};

/// Capacity of the delivery queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Base delay between delivery attempts; grows linearly per attempt
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Queues new polls for delivery
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    tx: mpsc::Sender<Poll>,
}

impl SlackNotifier {
    /// Create a notifier and the receiving end for [`delivery_loop`]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Poll>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl PollListener for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    fn on_event(&self, event: &PollEvent) -> Result<(), ListenerError> {
        match event {
            PollEvent::PollCreated(poll) => self.tx.try_send(poll.clone()).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ListenerError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => ListenerError::QueueClosed,
            }),
            PollEvent::Vote { .. } => Ok(()),
        }
    }
}

/// Publishes a poll somewhere
#[async_trait]
pub trait PollPublisher: Send + Sync {
    async fn publish(&self, poll: &Poll) -> Result<String, SlackError>;
}

#[async_trait]
impl PollPublisher for SlackChannel {
    async fn publish(&self, poll: &Poll) -> Result<String, SlackError> {
        self.publish_poll(poll).await
    }
}

/// Run the delivery worker loop.
///
/// Exits when the queue closes or on shutdown.
pub async fn delivery_loop<P: PollPublisher>(
    publisher: P,
    mut rx: mpsc::Receiver<Poll>,
    max_retries: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let poll = tokio::select! {
            next = rx.recv() => match next {
                Some(poll) => poll,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        if *shutdown.borrow() {
            break;
        }

        deliver(&publisher, &poll, max_retries).await;
    }

    debug!("poll delivery loop stopped");
}

/// Deliver one poll, retrying retryable failures. Returns whether it landed.
pub async fn deliver<P: PollPublisher>(publisher: &P, poll: &Poll, max_retries: u32) -> bool {
    let mut attempt: u32 = 0;
    loop {
        match publisher.publish(poll).await {
            Ok(ts) => {
                info!(poll_id = %poll.id, ts = %ts, "poll delivered to Slack");
                return true;
            }
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!(poll_id = %poll.id, attempt, error = %e, "poll delivery failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => {
                warn!(poll_id = %poll.id, error = %e, "poll delivery failed");
                return false;
            }
        }
    }
}
