//! Channels Module
//!
//! Outbound delivery of polls to messaging platforms and decoding of the
//! interactions users send back.

pub mod interaction;
pub mod notifier;
pub mod signing;
pub mod slack;

pub use interaction::{decode_choice, encode_choice, parse_vote, InteractionError, VoteChoice};
pub use notifier::{delivery_loop, PollPublisher, SlackNotifier, DEFAULT_QUEUE_CAPACITY};
pub use signing::{SignatureError, SlackVerifier};
pub use slack::{render_poll, SlackChannel, SlackConfig, SlackError};
