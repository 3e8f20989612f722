//! The event store consumed by the sync engine.
//!
//! The store is the single source of truth for what *cached* means across
//! restarts: interval reads seed the progress trackers at setup, and insert
//! operations are idempotent under the same `(criteria, interval)` so block
//! task retries are harmless.

use alloy::{
    primitives::{Address, BlockNumber},
    rpc::types::{Block, Log, Transaction},
};
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    StoreError,
    interval::BlockRange,
    source::{FactoryCriteria, LogFilterCriteria},
};

/// Child contract addresses, streamed in store-chosen batches.
pub type AddressBatchStream<'a> = BoxStream<'a, Result<Vec<Address>, StoreError>>;

/// Persistence operations the engine drives. All intervals returned by the
/// getters are in canonical form (sorted, non-overlapping, non-adjacent).
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Previously cached coverage of a log filter.
    async fn get_log_filter_intervals(
        &self,
        chain_id: u64,
        criteria: &LogFilterCriteria,
    ) -> Result<Vec<BlockRange>, StoreError>;

    /// Persists a fully-fetched log filter interval: the logs, their
    /// transactions, the block at the interval end, and the coverage mark.
    async fn insert_log_filter_interval(
        &self,
        chain_id: u64,
        block: &Block,
        transactions: &[Transaction],
        logs: &[Log],
        criteria: &LogFilterCriteria,
        interval: BlockRange,
    ) -> Result<(), StoreError>;

    /// Previously cached coverage of a factory's child-log filter.
    async fn get_factory_log_filter_intervals(
        &self,
        chain_id: u64,
        criteria: &FactoryCriteria,
    ) -> Result<Vec<BlockRange>, StoreError>;

    /// Persists a fully-fetched factory log filter interval.
    async fn insert_factory_log_filter_interval(
        &self,
        chain_id: u64,
        criteria: &FactoryCriteria,
        block: &Block,
        transactions: &[Transaction],
        logs: &[Log],
        interval: BlockRange,
    ) -> Result<(), StoreError>;

    /// Records raw child-address discovery logs. Called before the owning
    /// interval commits so child addresses are readable immediately.
    async fn insert_factory_child_address_logs(
        &self,
        chain_id: u64,
        logs: &[Log],
    ) -> Result<(), StoreError>;

    /// Streams the child addresses discovered for a factory up to and
    /// including `up_to_block`.
    async fn get_factory_child_addresses(
        &self,
        chain_id: u64,
        criteria: &FactoryCriteria,
        up_to_block: BlockNumber,
    ) -> Result<AddressBatchStream<'_>, StoreError>;
}
