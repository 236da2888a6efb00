//! # Simulated Chain
//!
//! An in-memory block producer and wall clock. Handles are cheap clones of
//! shared state, so a test or simulation can keep one handle to drive time
//! while the court reads through another.

use std::sync::Arc;

use court_core::{CoreError, Seed, Timestamp};
use parking_lot::Mutex;

use crate::randomness::{BlockhashWindow, Randomness, RandomnessSource, TimeSource};

#[derive(Debug)]
struct ChainState {
    now: Timestamp,
    block: u64,
    salt: Seed,
}

/// Shared handle to a simulated chain.
#[derive(Debug, Clone)]
pub struct SimulatedChain {
    state: Arc<Mutex<ChainState>>,
    window: BlockhashWindow,
}

impl SimulatedChain {
    /// Start a chain at `now`, block 1, whose block hashes are keyed by `salt`.
    pub fn new(now: Timestamp, salt: Seed) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                now,
                block: 1,
                salt,
            })),
            window: BlockhashWindow::default(),
        }
    }

    pub fn block(&self) -> u64 {
        self.state.lock().block
    }

    pub fn advance_blocks(&self, blocks: u64) {
        let mut state = self.state.lock();
        state.block = state.block.saturating_add(blocks);
    }

    /// Move the clock forward by `secs`, producing one block.
    pub fn advance_secs(&self, secs: u64) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        state.now = state.now.plus_secs(secs)?;
        state.block = state.block.saturating_add(1);
        Ok(())
    }

    /// Jump to `now`; rejects moving backwards.
    pub fn set_time(&self, now: Timestamp) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        if now < state.now {
            return Err(CoreError::InvalidTimestamp(format!(
                "cannot rewind simulated chain from {} to {now}",
                state.now
            )));
        }
        state.now = now;
        Ok(())
    }

    fn block_hash(salt: &Seed, block: u64) -> Seed {
        Seed::derive(&[salt.as_bytes(), &block.to_be_bytes()])
    }
}

impl TimeSource for SimulatedChain {
    fn now(&self) -> Timestamp {
        self.state.lock().now
    }
}

impl RandomnessSource for SimulatedChain {
    fn current_block(&self) -> u64 {
        self.block()
    }

    fn seed_for(&self, block: u64) -> Randomness {
        let state = self.state.lock();
        self.window
            .classify(block, state.block, |b| Self::block_hash(&state.salt, b))
    }
}
