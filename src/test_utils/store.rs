use std::collections::HashMap;
use std::sync::Mutex;

use alloy::{
    primitives::{Address, BlockNumber},
    rpc::types::{Block, Log, Transaction},
};
use async_trait::async_trait;
use futures::StreamExt;

use crate::{
    StoreError,
    interval::{self, BlockRange},
    source::{FactoryCriteria, LogFilterCriteria},
    store::{AddressBatchStream, SyncStore},
};

const CHILD_ADDRESS_BATCH_SIZE: usize = 100;

/// An in-memory [`SyncStore`].
///
/// Coverage intervals are kept canonical by unioning on insert, which also
/// makes the insert operations idempotent. Suitable as the reference store
/// for end-to-end scenarios; it never fails.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    log_filter_intervals: HashMap<(u64, LogFilterCriteria), Vec<BlockRange>>,
    factory_log_filter_intervals: HashMap<(u64, FactoryCriteria), Vec<BlockRange>>,
    factory_logs: HashMap<u64, Vec<Log>>,
}

impl MemoryStore {
    /// Marks an interval as cached without any backing data. For seeding
    /// partial-cache scenarios.
    pub fn seed_log_filter_interval(
        &self,
        chain_id: u64,
        criteria: &LogFilterCriteria,
        interval: BlockRange,
    ) {
        let mut inner = self.inner.lock().unwrap();
        let entry =
            inner.log_filter_intervals.entry((chain_id, criteria.clone())).or_default();
        *entry = interval::union(entry, &[interval]);
    }

    /// Current cached coverage of a log filter.
    pub fn cached_log_filter_intervals(
        &self,
        chain_id: u64,
        criteria: &LogFilterCriteria,
    ) -> Vec<BlockRange> {
        let inner = self.inner.lock().unwrap();
        inner.log_filter_intervals.get(&(chain_id, criteria.clone())).cloned().unwrap_or_default()
    }

    /// Current cached coverage of a factory log filter.
    pub fn cached_factory_log_filter_intervals(
        &self,
        chain_id: u64,
        criteria: &FactoryCriteria,
    ) -> Vec<BlockRange> {
        let inner = self.inner.lock().unwrap();
        inner
            .factory_log_filter_intervals
            .get(&(chain_id, criteria.clone()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn get_log_filter_intervals(
        &self,
        chain_id: u64,
        criteria: &LogFilterCriteria,
    ) -> Result<Vec<BlockRange>, StoreError> {
        Ok(self.cached_log_filter_intervals(chain_id, criteria))
    }

    async fn insert_log_filter_interval(
        &self,
        chain_id: u64,
        _block: &Block,
        _transactions: &[Transaction],
        _logs: &[Log],
        criteria: &LogFilterCriteria,
        interval: BlockRange,
    ) -> Result<(), StoreError> {
        self.seed_log_filter_interval(chain_id, criteria, interval);
        Ok(())
    }

    async fn get_factory_log_filter_intervals(
        &self,
        chain_id: u64,
        criteria: &FactoryCriteria,
    ) -> Result<Vec<BlockRange>, StoreError> {
        Ok(self.cached_factory_log_filter_intervals(chain_id, criteria))
    }

    async fn insert_factory_log_filter_interval(
        &self,
        chain_id: u64,
        criteria: &FactoryCriteria,
        _block: &Block,
        _transactions: &[Transaction],
        _logs: &[Log],
        interval: BlockRange,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let entry =
            inner.factory_log_filter_intervals.entry((chain_id, criteria.clone())).or_default();
        *entry = interval::union(entry, &[interval]);
        Ok(())
    }

    async fn insert_factory_child_address_logs(
        &self,
        chain_id: u64,
        logs: &[Log],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let existing = inner.factory_logs.entry(chain_id).or_default();
        for log in logs {
            // retried tasks re-insert the same discovery logs
            if !existing.contains(log) {
                existing.push(log.clone());
            }
        }
        Ok(())
    }

    async fn get_factory_child_addresses(
        &self,
        chain_id: u64,
        criteria: &FactoryCriteria,
        up_to_block: BlockNumber,
    ) -> Result<AddressBatchStream<'_>, StoreError> {
        let mut matching: Vec<Log> = {
            let inner = self.inner.lock().unwrap();
            inner
                .factory_logs
                .get(&chain_id)
                .map(|logs| {
                    logs.iter()
                        .filter(|log| {
                            log.inner.address == criteria.address
                                && log.inner.data.topics().first() == Some(&criteria.event_selector)
                                && log.block_number.is_some_and(|number| number <= up_to_block)
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        matching.sort_by_key(|log| (log.block_number, log.log_index));

        let mut seen = std::collections::HashSet::new();
        let addresses: Vec<Address> = matching
            .iter()
            .filter_map(|log| criteria.child_address_location.extract(log))
            .filter(|address| seen.insert(*address))
            .collect();

        let batches: Vec<Result<Vec<Address>, StoreError>> =
            addresses.chunks(CHILD_ADDRESS_BATCH_SIZE).map(|batch| Ok(batch.to_vec())).collect();
        Ok(futures::stream::iter(batches).boxed())
    }
}
