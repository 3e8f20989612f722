use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use alloy::{
    network::TransactionResponse,
    primitives::{BlockNumber, TxHash},
    providers::Provider,
    rpc::types::{Block, Log, Transaction},
};
use futures::{TryStreamExt, future::try_join_all};
use metrics::counter;
use tracing::{debug, info};

use crate::{
    SyncError,
    fetcher::LogFetcher,
    interval::BlockRange,
    metrics::COMPLETED_BLOCKS,
    source::{FactorySource, LogFilterSource},
    store::SyncStore,
};

use super::task::{BlockCallback, CallbackTarget, Task};

/// Everything a worker needs besides the task itself. Workers perform only
/// I/O and pure computation; tracker state stays with the service actor.
pub(crate) struct WorkerContext<P, S> {
    pub fetcher: LogFetcher<P>,
    pub store: Arc<S>,
    pub chain_id: u64,
    pub network: String,
}

impl<P: Clone, S> Clone for WorkerContext<P, S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            store: self.store.clone(),
            chain_id: self.chain_id,
            network: self.network.clone(),
        }
    }
}

/// A contiguous sub-range of a task ending at a block that bears logs (or at
/// the task end). Committing every log interval of a task caches exactly the
/// task's range.
pub(crate) struct LogInterval {
    pub range: BlockRange,
    pub logs: Vec<Log>,
}

pub(crate) enum TaskOutput {
    LogFilter { source: Arc<LogFilterSource>, range: BlockRange, intervals: Vec<LogInterval> },
    FactoryChildAddress { source: Arc<FactorySource>, range: BlockRange, intervals: Vec<LogInterval> },
    FactoryLogFilter { source: Arc<FactorySource>, range: BlockRange, intervals: Vec<LogInterval> },
    Block { number: BlockNumber, timestamp: u64, committed_blocks: u64 },
}

/// A finished worker: the task comes back with the result so the service can
/// re-enqueue it unchanged on failure.
pub(crate) struct TaskOutcome {
    pub task: Task,
    pub result: Result<TaskOutput, SyncError>,
}

pub(crate) async fn run_task<P, S>(ctx: WorkerContext<P, S>, task: Task) -> TaskOutcome
where
    P: Provider + Clone,
    S: SyncStore,
{
    let result = match &task {
        Task::LogFilter { source, range } => run_log_filter(&ctx, source, range).await,
        Task::FactoryChildAddress { source, range } => {
            run_factory_child_address(&ctx, source, range).await
        }
        Task::FactoryLogFilter { source, range } => {
            run_factory_log_filter(&ctx, source, range).await
        }
        Task::Block { number, callbacks } => run_block(&ctx, *number, callbacks).await,
    };
    TaskOutcome { task, result }
}

async fn run_log_filter<P, S>(
    ctx: &WorkerContext<P, S>,
    source: &Arc<LogFilterSource>,
    range: &BlockRange,
) -> Result<TaskOutput, SyncError>
where
    P: Provider + Clone,
    S: SyncStore,
{
    let filter = source.criteria.to_filter();
    let logs = ctx.fetcher.get_logs(&filter, range.clone()).await?;

    info!(
        source = %source.name,
        from_block = range.start(),
        to_block = range.end(),
        log_count = logs.len(),
        "fetched log filter range"
    );

    Ok(TaskOutput::LogFilter {
        source: source.clone(),
        range: range.clone(),
        intervals: build_log_intervals(range, logs),
    })
}

async fn run_factory_child_address<P, S>(
    ctx: &WorkerContext<P, S>,
    source: &Arc<FactorySource>,
    range: &BlockRange,
) -> Result<TaskOutput, SyncError>
where
    P: Provider + Clone,
    S: SyncStore,
{
    let filter = source.criteria.child_address_criteria().to_filter();
    let logs = ctx.fetcher.get_logs(&filter, range.clone()).await?;

    // Raw discovery logs land before the interval commits, so factory log
    // filter workers can already read these children.
    ctx.store.insert_factory_child_address_logs(ctx.chain_id, &logs).await?;

    info!(
        source = %source.name,
        from_block = range.start(),
        to_block = range.end(),
        log_count = logs.len(),
        "fetched factory child address range"
    );

    Ok(TaskOutput::FactoryChildAddress {
        source: source.clone(),
        range: range.clone(),
        intervals: build_log_intervals(range, logs),
    })
}

async fn run_factory_log_filter<P, S>(
    ctx: &WorkerContext<P, S>,
    source: &Arc<FactorySource>,
    range: &BlockRange,
) -> Result<TaskOutput, SyncError>
where
    P: Provider + Clone,
    S: SyncStore,
{
    let base_filter = source.criteria.child_log_filter();

    let mut batches = ctx
        .store
        .get_factory_child_addresses(ctx.chain_id, &source.criteria, *range.end())
        .await?;

    let mut logs = Vec::new();
    let mut child_count = 0usize;
    while let Some(batch) = batches.try_next().await? {
        if batch.is_empty() {
            continue;
        }
        child_count += batch.len();
        let filter = base_filter.clone().address(batch);
        logs.extend(ctx.fetcher.get_logs(&filter, range.clone()).await?);
    }
    drop(batches);

    info!(
        source = %source.name,
        from_block = range.start(),
        to_block = range.end(),
        child_count,
        log_count = logs.len(),
        "fetched factory log filter range"
    );

    Ok(TaskOutput::FactoryLogFilter {
        source: source.clone(),
        range: range.clone(),
        intervals: build_log_intervals(range, logs),
    })
}

async fn run_block<P, S>(
    ctx: &WorkerContext<P, S>,
    number: BlockNumber,
    callbacks: &[BlockCallback],
) -> Result<TaskOutput, SyncError>
where
    P: Provider + Clone,
    S: SyncStore,
{
    let block = ctx.fetcher.get_block_with_transactions(number).await?;
    let transactions: Vec<Transaction> = block.transactions.txns().cloned().collect();

    // Callbacks are idempotent against the store, so a retried block task may
    // safely re-run all of them.
    let widths = try_join_all(
        callbacks.iter().map(|callback| execute_callback(ctx, callback, &block, &transactions)),
    )
    .await?;

    debug!(block_number = number, callback_count = callbacks.len(), "committed block callbacks");

    Ok(TaskOutput::Block {
        number,
        timestamp: block.header.timestamp,
        committed_blocks: widths.iter().sum(),
    })
}

async fn execute_callback<P, S>(
    ctx: &WorkerContext<P, S>,
    callback: &BlockCallback,
    block: &Block,
    transactions: &[Transaction],
) -> Result<u64, SyncError>
where
    P: Provider + Clone,
    S: SyncStore,
{
    let transactions = matching_transactions(&callback.tx_hashes, transactions);

    match &callback.target {
        CallbackTarget::LogFilter { criteria } => {
            ctx.store
                .insert_log_filter_interval(
                    ctx.chain_id,
                    block,
                    &transactions,
                    &callback.logs,
                    criteria,
                    callback.interval.clone(),
                )
                .await?;
        }
        CallbackTarget::FactoryLogFilter { criteria } => {
            ctx.store
                .insert_factory_log_filter_interval(
                    ctx.chain_id,
                    criteria,
                    block,
                    &transactions,
                    &callback.logs,
                    callback.interval.clone(),
                )
                .await?;
        }
    }

    let width = callback.width();
    counter!(
        COMPLETED_BLOCKS,
        "network" => ctx.network.clone(),
        "event_source" => callback.source_name.to_string()
    )
    .increment(width);
    Ok(width)
}

/// The subset of a block's transactions that produced the callback's logs.
fn matching_transactions(
    tx_hashes: &HashSet<TxHash>,
    transactions: &[Transaction],
) -> Vec<Transaction> {
    transactions.iter().filter(|tx| tx_hashes.contains(&tx.tx_hash())).cloned().collect()
}

/// Partitions a task range into log intervals.
///
/// Logs are grouped by block number; each group owns the interval reaching
/// back to the previous boundary. A terminal empty interval keeps the full
/// range covered when the tail of the range bears no logs — an empty range
/// yields exactly one empty interval. The first interval always starts at
/// `range.start()` and the last always ends at `range.end()`.
pub(crate) fn build_log_intervals(range: &BlockRange, logs: Vec<Log>) -> Vec<LogInterval> {
    let mut by_block: BTreeMap<BlockNumber, Vec<Log>> = BTreeMap::new();
    for log in logs {
        let Some(number) = log.block_number else {
            debug!("dropping pending log without a block number");
            continue;
        };
        debug_assert!(range.contains(&number), "log outside the fetched range");
        by_block.entry(number).or_default().push(log);
    }

    let mut intervals = Vec::with_capacity(by_block.len() + 1);
    let mut cursor = *range.start();
    for (number, logs) in by_block {
        intervals.push(LogInterval { range: cursor..=number, logs });
        cursor = number + 1;
    }

    match intervals.last() {
        Some(last) if last.range.end() == range.end() => {}
        _ => intervals.push(LogInterval { range: cursor..=*range.end(), logs: Vec::new() }),
    }
    intervals
}
