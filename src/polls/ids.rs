//! Identifier generation
//!
//! The store asks an [`IdGenerator`] for every poll and option identifier.
//! Uniqueness against the live registry is checked by the store itself, so a
//! generator only has to make collisions unlikely.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces fresh opaque tokens
pub trait IdGenerator: Send + Sync {
    /// Generate a new identifier
    fn generate(&self) -> String;
}

/// Length of identifiers produced by [`RandomIdGenerator`]
pub const RANDOM_ID_LEN: usize = 12;

/// Random 48-bit identifiers rendered as lowercase hex
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(RANDOM_ID_LEN);
        id
    }
}

/// Monotonic counter with a prefix (`p1`, `p2`, ...)
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}
