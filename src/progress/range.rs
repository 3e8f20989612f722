use std::slice;

use alloy::primitives::BlockNumber;

use crate::interval::{self, BlockRange};

/// Result of recording a completed interval.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Whether the checkpoint advanced in this call.
    pub is_updated: bool,
    pub prev_checkpoint: Option<BlockNumber>,
    pub new_checkpoint: Option<BlockNumber>,
}

/// Tracks completion of a target block range.
///
/// The checkpoint is the largest block `B` such that `[target.start, B]` is
/// fully completed, or `None` while nothing contiguous with the target start
/// has completed. It never regresses.
#[derive(Clone, Debug)]
pub struct RangeProgress {
    target: BlockRange,
    completed: Vec<BlockRange>,
}

impl RangeProgress {
    /// Creates a tracker for `target` seeded with already-completed
    /// intervals. Intervals outside the target are clipped away.
    #[must_use]
    pub fn new(target: BlockRange, completed: impl IntoIterator<Item = BlockRange>) -> Self {
        let merged = completed
            .into_iter()
            .fold(Vec::new(), |acc, range| interval::union(&acc, slice::from_ref(&range)));
        let completed = interval::intersection(&merged, slice::from_ref(&target));
        Self { target, completed }
    }

    /// Records `range` as completed, clipped to the target.
    pub fn add_completed(&mut self, range: BlockRange) -> ProgressUpdate {
        let prev_checkpoint = self.checkpoint();
        let clipped =
            interval::intersection(slice::from_ref(&range), slice::from_ref(&self.target));
        self.completed = interval::union(&self.completed, &clipped);
        let new_checkpoint = self.checkpoint();
        ProgressUpdate {
            is_updated: new_checkpoint > prev_checkpoint,
            prev_checkpoint,
            new_checkpoint,
        }
    }

    /// The largest block `B` with `[target.start, B]` fully completed.
    #[must_use]
    pub fn checkpoint(&self) -> Option<BlockNumber> {
        match self.completed.first() {
            Some(first) if first.start() == self.target.start() => Some(*first.end()),
            _ => None,
        }
    }

    /// The intervals still missing from the target.
    #[must_use]
    pub fn required(&self) -> Vec<BlockRange> {
        interval::difference(slice::from_ref(&self.target), &self.completed)
    }

    #[must_use]
    pub fn target(&self) -> &BlockRange {
        &self.target
    }

    /// Number of target blocks already completed.
    #[must_use]
    pub fn completed_sum(&self) -> u64 {
        interval::interval_sum(&self.completed)
    }
}
