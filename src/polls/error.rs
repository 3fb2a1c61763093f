//! Poll Store errors

use thiserror::Error;

/// Outcomes the store reports instead of a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Poll '{0}' not found")]
    PollNotFound(String),

    #[error("Option '{option_id}' not found in poll '{poll_id}'")]
    OptionNotFound { poll_id: String, option_id: String },

    #[error("Could not generate a unique identifier after {0} attempts")]
    IdExhausted(usize),
}

impl PollError {
    /// True for unknown poll or option lookups
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PollNotFound(_) | Self::OptionNotFound { .. })
    }
}
