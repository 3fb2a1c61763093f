//! Poll Store
//!
//! Authoritative in-memory registry of polls. Each voter holds at most one
//! live ballot per poll; a revote moves that ballot between options while the
//! collection lock is held, so readers never see a half-applied transfer.

use super::error::PollError;
use super::events::{ListenerSet, PollEvent, PollListener};
use super::ids::{IdGenerator, RandomIdGenerator};
use super::types::{Poll, PollOption};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Consecutive collisions tolerated before giving up on an identifier
pub const MAX_ID_ATTEMPTS: usize = 16;

/// Minimum number of options a poll must have
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Default)]
struct Registry {
    /// Polls in creation order
    polls: Vec<Poll>,
    /// poll_id -> index into `polls`
    index: HashMap<String, usize>,
}

impl Registry {
    fn get(&self, poll_id: &str) -> Option<&Poll> {
        self.index.get(poll_id).map(|&i| &self.polls[i])
    }

    fn get_mut(&mut self, poll_id: &str) -> Option<&mut Poll> {
        match self.index.get(poll_id) {
            Some(&i) => self.polls.get_mut(i),
            None => None,
        }
    }

    fn insert(&mut self, poll: Poll) {
        self.index.insert(poll.id.clone(), self.polls.len());
        self.polls.push(poll);
    }
}

/// In-memory poll registry
pub struct PollStore {
    registry: RwLock<Registry>,
    ids: Box<dyn IdGenerator>,
    listeners: ListenerSet,
}

impl Default for PollStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PollStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollStore")
            .field("polls", &self.poll_count())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl PollStore {
    /// Create an empty store with random identifiers
    pub fn new() -> Self {
        Self::with_id_generator(RandomIdGenerator)
    }

    /// Create an empty store with a custom identifier source
    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            ids: Box::new(ids),
            listeners: ListenerSet::default(),
        }
    }

    /// Register a listener for lifecycle notifications
    pub fn subscribe(&self, listener: Arc<dyn PollListener>) {
        self.listeners.add(listener);
    }

    /// Create a poll from a question and at least two option texts.
    ///
    /// Emits `PollCreated` once the poll is readable through [`Self::get_poll`].
    pub fn create_poll<S: AsRef<str>>(
        &self,
        question: &str,
        options: &[S],
    ) -> Result<Poll, PollError> {
        if question.trim().is_empty() {
            return Err(PollError::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }
        if options.len() < MIN_OPTIONS {
            return Err(PollError::InvalidArgument(format!(
                "a poll needs at least {} options, got {}",
                MIN_OPTIONS,
                options.len()
            )));
        }

        let poll = {
            let mut registry = self.registry.write();

            let poll_id = self.fresh_id(|id| registry.index.contains_key(id))?;
            let mut option_ids: HashSet<String> = HashSet::with_capacity(options.len());
            let mut poll_options = Vec::with_capacity(options.len());
            for text in options {
                let option_id = self.fresh_id(|id| option_ids.contains(id))?;
                option_ids.insert(option_id.clone());
                poll_options.push(PollOption::new(option_id, text.as_ref()));
            }

            let poll = Poll {
                id: poll_id,
                question: question.to_string(),
                options: poll_options,
                voters: Default::default(),
            };
            registry.insert(poll.clone());
            poll
        };

        self.listeners.emit(&PollEvent::PollCreated(poll.clone()));
        Ok(poll)
    }

    /// Get a poll by ID
    pub fn get_poll(&self, poll_id: &str) -> Option<Poll> {
        self.registry.read().get(poll_id).cloned()
    }

    /// All polls in creation order
    pub fn get_all_polls(&self) -> Vec<Poll> {
        self.registry.read().polls.clone()
    }

    /// Number of polls in the registry
    pub fn poll_count(&self) -> usize {
        self.registry.read().polls.len()
    }

    /// Record `voter_id`'s ballot for `option_id`, replacing any earlier ballot
    /// the voter held in this poll. Returns the updated poll.
    pub fn vote(&self, poll_id: &str, option_id: &str, voter_id: &str) -> Result<Poll, PollError> {
        let poll = {
            let mut registry = self.registry.write();
            let poll = registry
                .get_mut(poll_id)
                .ok_or_else(|| PollError::PollNotFound(poll_id.to_string()))?;

            if poll.option(option_id).is_none() {
                return Err(PollError::OptionNotFound {
                    poll_id: poll_id.to_string(),
                    option_id: option_id.to_string(),
                });
            }

            // A stale reference to an option that no longer resolves is tolerated
            if let Some(previous) = poll.voters.get(voter_id).cloned() {
                if let Some(prev_option) = poll.option_mut(&previous) {
                    prev_option.remove_voter(voter_id);
                }
            }

            if let Some(target) = poll.option_mut(option_id) {
                target.add_voter(voter_id);
            }
            poll.voters.insert(voter_id.to_string(), option_id.to_string());

            poll.clone()
        };

        self.listeners.emit(&PollEvent::Vote {
            poll_id: poll_id.to_string(),
            option_id: option_id.to_string(),
            voter_id: voter_id.to_string(),
        });
        Ok(poll)
    }

    fn fresh_id(&self, taken: impl Fn(&str) -> bool) -> Result<String, PollError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            if !id.is_empty() && !taken(&id) {
                return Ok(id);
            }
        }
        Err(PollError::IdExhausted(MAX_ID_ATTEMPTS))
    }
}

/// Create a shared poll store
pub fn create_store() -> Arc<PollStore> {
    Arc::new(PollStore::new())
}
