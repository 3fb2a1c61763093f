//! Poll Records
//!
//! Snapshot types handed out by the store and serialized by the HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One selectable choice within a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    /// Option ID (unique within poll)
    pub id: String,
    /// Option text/label
    pub text: String,
    /// Voters currently counted for this option, in the order they arrived
    #[serde(default)]
    pub votes: Vec<String>,
}

impl PollOption {
    /// Create an option with no votes
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            votes: Vec::new(),
        }
    }

    /// Number of voters currently holding this option
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Whether the voter is counted for this option
    pub fn has_voter(&self, voter_id: &str) -> bool {
        self.votes.iter().any(|v| v == voter_id)
    }

    pub(crate) fn add_voter(&mut self, voter_id: &str) {
        if !self.has_voter(voter_id) {
            self.votes.push(voter_id.to_string());
        }
    }

    pub(crate) fn remove_voter(&mut self, voter_id: &str) {
        self.votes.retain(|v| v != voter_id);
    }
}

/// A question with a fixed, ordered set of options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    /// Poll ID (unique identifier)
    pub id: String,
    /// Poll question
    pub question: String,
    /// Options in display order
    pub options: Vec<PollOption>,
    /// voter_id -> option_id of the voter's live ballot
    #[serde(default)]
    pub voters: BTreeMap<String, String>,
}

impl Poll {
    /// Find an option by ID
    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub(crate) fn option_mut(&mut self, option_id: &str) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| o.id == option_id)
    }

    /// The option currently holding the voter's ballot, if any
    pub fn vote_of(&self, voter_id: &str) -> Option<&str> {
        self.voters.get(voter_id).map(String::as_str)
    }

    /// Total live ballots across all options
    pub fn total_votes(&self) -> usize {
        self.options.iter().map(PollOption::vote_count).sum()
    }
}
