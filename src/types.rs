use alloy::primitives::BlockNumber;

/// Events emitted by the historical sync service on its output channel.
///
/// The channel preserves emission order: checkpoints are monotone per service
/// instance, and [`SyncEvent::SyncComplete`] is terminal — the channel closes
/// after it is sent.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// All events at or below `block_number` have been fetched and persisted.
    ///
    /// Downstream indexers may process events up to this block.
    HistoricalCheckpoint { block_number: BlockNumber, block_timestamp: u64 },

    /// The configured block range is fully cached. Emitted once.
    SyncComplete,
}

impl SyncEvent {
    /// Returns the checkpoint pair if this is a checkpoint event.
    #[must_use]
    pub fn checkpoint(&self) -> Option<(BlockNumber, u64)> {
        match self {
            SyncEvent::HistoricalCheckpoint { block_number, block_timestamp } => {
                Some((*block_number, *block_timestamp))
            }
            SyncEvent::SyncComplete => None,
        }
    }
}
