//! Historical synchronization engine for EVM event indexing.
//!
//! One [`HistoricalSyncService`] instance reconstructs, for a set of
//! declared event sources and a bounded block range on a single network, a
//! complete local store of on-chain events: logs, their transactions, and
//! their enclosing blocks. Progress persists through the event store, so a
//! restarted sync resumes from whatever intervals are already cached.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use alloy::providers::ProviderBuilder;
//! use historical_sync::{
//!     HistoricalSyncBuilder, NetworkConfig, SyncEvent,
//!     source::{EventSource, LogFilterCriteria, LogFilterSource},
//!     test_utils::MemoryStore,
//! };
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new().connect("ws://localhost:8546").await?;
//!
//! let source = EventSource::LogFilter(LogFilterSource {
//!     name: "transfers".into(),
//!     chain_id: 1,
//!     criteria: LogFilterCriteria { address: None, topics: vec![] },
//!     start_block: 18_000_000,
//!     end_block: None,
//!     max_block_range: None,
//! });
//!
//! let service = HistoricalSyncBuilder::new(NetworkConfig::new("mainnet", 1))
//!     .finalized_block(18_500_000)
//!     .source(source)
//!     .build(provider.root().clone(), Arc::new(MemoryStore::default()))?;
//!
//! let (handle, mut events) = service.start().await?;
//! while let Some(event) = events.next().await {
//!     match event {
//!         SyncEvent::HistoricalCheckpoint { block_number, .. } => {
//!             println!("synced through block {block_number}");
//!         }
//!         SyncEvent::SyncComplete => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod interval;
pub mod metrics;
pub mod progress;
pub mod source;
pub mod store;
pub mod test_utils;

mod error;
mod fetcher;
mod historical_sync;
mod queue;
mod types;

pub use error::{StoreError, SyncError};
pub use historical_sync::{
    DEFAULT_MAX_BLOCK_RANGE, DEFAULT_MAX_RPC_REQUEST_CONCURRENCY, HistoricalSyncBuilder,
    HistoricalSyncService, NetworkConfig, SyncHandle,
};
pub use types::SyncEvent;
