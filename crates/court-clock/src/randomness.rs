//! # Randomness and Time Sources
//!
//! The draft seed of a term is the hash of a block produced after the term
//! was ensured. Block hashes can only be looked up for a bounded window, so
//! a seed is either not produced yet, available, or gone for good. The three
//! cases are distinct variants: callers cannot mistake "wait" for "never".

use court_core::{Seed, Timestamp};
use serde::{Deserialize, Serialize};

/// Number of past blocks whose hashes remain queryable.
pub const BLOCKHASH_WINDOW: u64 = 256;

/// Availability of a block-derived seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Randomness {
    /// The block has not been produced yet.
    NotYetAvailable,
    /// The block hash is queryable.
    Available(Seed),
    /// The block fell out of the lookup window.
    Unavailable,
}

/// Source of block numbers and block-derived seeds.
pub trait RandomnessSource {
    /// The block currently being produced.
    fn current_block(&self) -> u64;

    /// Seed of `block`, classified by availability.
    fn seed_for(&self, block: u64) -> Randomness;
}

/// Source of wall-clock time.
pub trait TimeSource {
    fn now(&self) -> Timestamp;
}

/// Availability rule for block hashes: a block's hash is readable from the
/// next block on, for [`BLOCKHASH_WINDOW`] blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashWindow {
    pub window: u64,
}

impl Default for BlockhashWindow {
    fn default() -> Self {
        Self {
            window: BLOCKHASH_WINDOW,
        }
    }
}

impl BlockhashWindow {
    /// Classify `block` as seen from `current_block`, producing the seed with
    /// `hash` when it is readable.
    pub fn classify(
        &self,
        block: u64,
        current_block: u64,
        hash: impl FnOnce(u64) -> Seed,
    ) -> Randomness {
        if current_block <= block {
            Randomness::NotYetAvailable
        } else if current_block - block <= self.window {
            Randomness::Available(hash(block))
        } else {
            Randomness::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(block: u64) -> Seed {
        Seed::derive(&[&block.to_be_bytes()])
    }

    #[test]
    fn same_block_is_not_yet_available() {
        let window = BlockhashWindow::default();
        assert_eq!(window.classify(10, 10, seed), Randomness::NotYetAvailable);
        assert_eq!(window.classify(10, 9, seed), Randomness::NotYetAvailable);
    }

    #[test]
    fn next_block_through_window_is_available() {
        let window = BlockhashWindow::default();
        assert_eq!(window.classify(10, 11, seed), Randomness::Available(seed(10)));
        assert_eq!(
            window.classify(10, 10 + BLOCKHASH_WINDOW, seed),
            Randomness::Available(seed(10))
        );
    }

    #[test]
    fn past_window_is_unavailable() {
        let window = BlockhashWindow::default();
        assert_eq!(
            window.classify(10, 10 + BLOCKHASH_WINDOW + 1, seed),
            Randomness::Unavailable
        );
    }
}
