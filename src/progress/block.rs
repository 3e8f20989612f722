use std::collections::{BTreeSet, HashMap};

use alloy::primitives::BlockNumber;

/// A `(block number, block timestamp)` pair marking persisted progress.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockCheckpoint {
    pub number: BlockNumber,
    pub timestamp: u64,
}

/// Tracks persistence of individual block bodies.
///
/// Blocks are registered as pending before their tasks run; a completed block
/// only advances the checkpoint once every pending block at or below it has
/// completed as well.
#[derive(Debug, Default)]
pub struct BlockProgress {
    pending: BTreeSet<BlockNumber>,
    completed: HashMap<BlockNumber, u64>,
    checkpoint: Option<BlockCheckpoint>,
}

impl BlockProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers blocks that must complete before the checkpoint may pass
    /// them. Callers must not re-add numbers that already completed.
    pub fn add_pending(&mut self, numbers: impl IntoIterator<Item = BlockNumber>) {
        self.pending.extend(numbers);
    }

    /// Records `(number, timestamp)` as completed and drains every pending
    /// block that is now accounted for, in ascending order.
    ///
    /// Returns the new checkpoint iff it advanced in this call.
    pub fn add_completed(&mut self, number: BlockNumber, timestamp: u64) -> Option<BlockCheckpoint> {
        self.completed.insert(number, timestamp);

        let mut advanced = false;
        while let Some(&next) = self.pending.first() {
            let Some(timestamp) = self.completed.remove(&next) else { break };
            self.pending.pop_first();
            self.checkpoint = Some(BlockCheckpoint { number: next, timestamp });
            advanced = true;
        }
        if advanced { self.checkpoint } else { None }
    }

    #[must_use]
    pub fn checkpoint(&self) -> Option<BlockCheckpoint> {
        self.checkpoint
    }
}
