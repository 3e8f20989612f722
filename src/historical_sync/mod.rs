//! The historical sync service.
//!
//! One service instance reconstructs the event history of a set of sources
//! over `[start, finalized]` on a single network. Setup subtracts cached
//! intervals from each source's target range and enqueues fetch tasks; task
//! workers register block callbacks keyed by the block number at which their
//! interval commits; once every source-level tracker has advanced past a
//! block, its callbacks are bundled into block tasks that fetch the block
//! body, persist, and advance the emitted checkpoint.
//!
//! All tracker state is owned by a single actor, so worker continuations
//! never overlap; workers themselves only perform I/O and pure computation.

use std::collections::BTreeMap;
use std::slice;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::{primitives::BlockNumber, providers::Provider};
use metrics::gauge;
use tokio::{sync::mpsc, task::JoinSet};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    SyncError, SyncEvent,
    fetcher::LogFetcher,
    interval,
    metrics::{CACHED_BLOCKS, ProgressMeter, TOTAL_BLOCKS},
    progress::{BlockProgress, RangeProgress},
    queue::TaskQueue,
    source::{EventSource, FactoryCriteria, FactorySource, LogFilterCriteria, LogFilterSource},
    store::SyncStore,
};

mod task;
mod worker;

use task::{BlockCallback, CallbackTarget, Task};
use worker::{LogInterval, TaskOutcome, TaskOutput, WorkerContext};

pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 2_000;

pub const DEFAULT_MAX_RPC_REQUEST_CONCURRENCY: usize = 10;

const EVENT_BUFFER_CAPACITY: usize = 1_024;

/// Per-network configuration.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    /// Chunk width for fetch tasks when a source does not override it.
    pub default_max_block_range: u64,
    /// Maximum number of concurrently running task bodies.
    pub max_rpc_request_concurrency: usize,
}

impl NetworkConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            chain_id,
            default_max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            max_rpc_request_concurrency: DEFAULT_MAX_RPC_REQUEST_CONCURRENCY,
        }
    }
}

#[derive(Debug)]
pub struct HistoricalSyncBuilder {
    network: NetworkConfig,
    finalized_block: BlockNumber,
    sources: Vec<EventSource>,
}

impl HistoricalSyncBuilder {
    #[must_use]
    pub fn new(network: NetworkConfig) -> Self {
        Self { network, finalized_block: 0, sources: Vec::new() }
    }

    /// Sets the upper bound of the historical range. Blocks past it belong
    /// to the realtime sync.
    #[must_use]
    pub fn finalized_block(mut self, block: BlockNumber) -> Self {
        self.finalized_block = block;
        self
    }

    #[must_use]
    pub fn source(mut self, source: EventSource) -> Self {
        self.sources.push(source);
        self
    }

    #[must_use]
    pub fn sources(mut self, sources: impl IntoIterator<Item = EventSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Validates the configuration and binds it to a provider and store.
    ///
    /// # Errors
    ///
    /// * [`SyncError::InvalidConcurrency`] - zero request concurrency
    /// * [`SyncError::InvalidMaxBlockRange`] - a zero block range, on the
    ///   network default or any source override
    /// * [`SyncError::DuplicateSource`] - two sources sharing a name
    /// * [`SyncError::InvalidRange`] - a source whose start block is past its
    ///   explicit end block
    pub fn build<P, S>(
        self,
        provider: P,
        store: Arc<S>,
    ) -> Result<HistoricalSyncService<P, S>, SyncError>
    where
        P: Provider + Clone,
        S: SyncStore,
    {
        if self.network.max_rpc_request_concurrency == 0 {
            return Err(SyncError::InvalidConcurrency);
        }
        if self.network.default_max_block_range == 0 {
            return Err(SyncError::InvalidMaxBlockRange);
        }

        let mut names = std::collections::HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name()) {
                return Err(SyncError::DuplicateSource(source.name().to_owned()));
            }
            if source.max_block_range() == Some(0) {
                return Err(SyncError::InvalidMaxBlockRange);
            }
            if let Some(end) = source.end_block()
                && source.start_block() > end
            {
                return Err(SyncError::InvalidRange {
                    name: source.name().to_owned(),
                    start: source.start_block(),
                    end,
                });
            }
        }

        Ok(HistoricalSyncService {
            network: Arc::new(self.network),
            finalized_block: self.finalized_block,
            sources: self.sources,
            provider,
            store,
        })
    }
}

/// A validated, not-yet-started sync service.
pub struct HistoricalSyncService<P, S> {
    network: Arc<NetworkConfig>,
    finalized_block: BlockNumber,
    sources: Vec<EventSource>,
    provider: P,
    store: Arc<S>,
}

impl<P, S> HistoricalSyncService<P, S>
where
    P: Provider + Clone + 'static,
    S: SyncStore + 'static,
{
    /// Loads persisted progress, seeds the work queue, and spawns the
    /// service actor.
    ///
    /// Returns a kill handle and the event stream. The stream yields
    /// monotone [`SyncEvent::HistoricalCheckpoint`]s followed by a single
    /// [`SyncEvent::SyncComplete`], then closes.
    ///
    /// # Errors
    ///
    /// Propagates store failures encountered while loading cached intervals.
    pub async fn start(self) -> Result<(SyncHandle, ReceiverStream<SyncEvent>), SyncError> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_CAPACITY);

        let mut service = Service::new(
            self.network,
            self.finalized_block,
            self.provider,
            self.store,
            event_tx,
        );
        service.setup(self.sources).await?;

        let token = CancellationToken::new();
        let actor_token = token.clone();
        tokio::spawn(async move {
            service.run(actor_token).await;
        });

        Ok((SyncHandle { token }, ReceiverStream::new(event_rx)))
    }
}

/// Handle for stopping a running sync service.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    token: CancellationToken,
}

impl SyncHandle {
    /// Stops the service: queued tasks are dropped, in-flight tasks run to
    /// completion, and the event channel closes without `SyncComplete`.
    pub fn kill(&self) {
        self.token.cancel();
    }
}

struct LogFilterSync {
    source: Arc<LogFilterSource>,
    name: Arc<str>,
    criteria: Arc<LogFilterCriteria>,
    progress: RangeProgress,
}

struct FactorySync {
    source: Arc<FactorySource>,
    name: Arc<str>,
    criteria: Arc<FactoryCriteria>,
    child_criteria: Arc<LogFilterCriteria>,
    child_progress: RangeProgress,
    log_progress: RangeProgress,
}

#[derive(Default)]
struct Trackers {
    log_filters: Vec<LogFilterSync>,
    factories: Vec<FactorySync>,
}

impl Trackers {
    /// The minimum checkpoint across every tracker of every kind. `None`
    /// while any tracker has not advanced past its target start.
    fn checkpoint(&self) -> Option<BlockNumber> {
        self.log_filters
            .iter()
            .map(|entry| entry.progress.checkpoint())
            .chain(self.factories.iter().flat_map(|entry| {
                [entry.child_progress.checkpoint(), entry.log_progress.checkpoint()]
            }))
            .min()
            .flatten()
    }

    fn log_filter_mut(&mut self, source: &Arc<LogFilterSource>) -> &mut LogFilterSync {
        self.log_filters
            .iter_mut()
            .find(|entry| Arc::ptr_eq(&entry.source, source))
            .expect("worker output for an unknown log filter source")
    }

    fn factory_mut(&mut self, source: &Arc<FactorySource>) -> &mut FactorySync {
        self.factories
            .iter_mut()
            .find(|entry| Arc::ptr_eq(&entry.source, source))
            .expect("worker output for an unknown factory source")
    }
}

/// The actor owning all mutable sync state.
struct Service<P, S> {
    network: Arc<NetworkConfig>,
    finalized_block: BlockNumber,
    store: Arc<S>,
    fetcher: LogFetcher<P>,
    queue: TaskQueue<Task>,
    trackers: Trackers,
    block_callbacks: BTreeMap<BlockNumber, Vec<BlockCallback>>,
    block_progress: BlockProgress,
    blocks_enqueued_to: Option<BlockNumber>,
    meter: ProgressMeter,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl<P, S> Service<P, S>
where
    P: Provider + Clone + 'static,
    S: SyncStore + 'static,
{
    fn new(
        network: Arc<NetworkConfig>,
        finalized_block: BlockNumber,
        provider: P,
        store: Arc<S>,
        event_tx: mpsc::Sender<SyncEvent>,
    ) -> Self {
        let fetcher = LogFetcher::new(provider, network.name.clone());
        let meter = ProgressMeter::new(network.name.clone(), 0, 0);
        Self {
            network,
            finalized_block,
            store,
            fetcher,
            queue: TaskQueue::new(),
            trackers: Trackers::default(),
            block_callbacks: BTreeMap::new(),
            block_progress: BlockProgress::new(),
            blocks_enqueued_to: None,
            meter,
            event_tx,
        }
    }

    /// Seeds trackers and the initial queue from persisted intervals.
    async fn setup(&mut self, sources: Vec<EventSource>) -> Result<(), SyncError> {
        let chain_id = self.network.chain_id;
        let mut total_blocks = 0u64;
        let mut cached_blocks = 0u64;

        for source in sources {
            let Some(target) = source.target_range(self.finalized_block) else {
                warn!(
                    source = source.name(),
                    start_block = source.start_block(),
                    finalized_block = self.finalized_block,
                    "source starts past the finalized block, deferring to realtime sync"
                );
                self.set_source_gauges(source.name(), 0, 0);
                continue;
            };
            let max_block_range =
                source.max_block_range().unwrap_or(self.network.default_max_block_range);
            let target_sum = interval::interval_sum(slice::from_ref(&target));

            match source {
                EventSource::LogFilter(source) => {
                    let source = Arc::new(source);
                    let cached =
                        self.store.get_log_filter_intervals(chain_id, &source.criteria).await?;
                    let progress = RangeProgress::new(target, cached);

                    for range in interval::chunks(&progress.required(), max_block_range) {
                        self.push_task(Task::LogFilter { source: source.clone(), range });
                    }

                    let cached_sum = progress.completed_sum();
                    self.set_source_gauges(&source.name, target_sum, cached_sum);
                    total_blocks += target_sum;
                    cached_blocks += cached_sum;

                    self.trackers.log_filters.push(LogFilterSync {
                        name: Arc::from(source.name.as_str()),
                        criteria: Arc::new(source.criteria.clone()),
                        source,
                        progress,
                    });
                }
                EventSource::Factory(source) => {
                    let source = Arc::new(source);
                    let criteria = Arc::new(source.criteria.clone());
                    let child_criteria = Arc::new(source.criteria.child_address_criteria());

                    let child_cached =
                        self.store.get_log_filter_intervals(chain_id, &child_criteria).await?;
                    let log_cached =
                        self.store.get_factory_log_filter_intervals(chain_id, &criteria).await?;
                    let child_progress = RangeProgress::new(target.clone(), child_cached);
                    let log_progress = RangeProgress::new(target, log_cached);

                    let required_child = child_progress.required();
                    for range in interval::chunks(&required_child, max_block_range) {
                        self.push_task(Task::FactoryChildAddress { source: source.clone(), range });
                    }

                    // Ranges whose children are already cached need no
                    // unblocking; everything else waits for the
                    // child-address checkpoint.
                    let ready = interval::difference(&log_progress.required(), &required_child);
                    for range in interval::chunks(&ready, max_block_range) {
                        self.push_task(Task::FactoryLogFilter { source: source.clone(), range });
                    }

                    let cached_sum = log_progress.completed_sum();
                    self.set_source_gauges(&source.name, target_sum, cached_sum);
                    total_blocks += target_sum;
                    cached_blocks += cached_sum;

                    self.trackers.factories.push(FactorySync {
                        name: Arc::from(source.name.as_str()),
                        source,
                        criteria,
                        child_criteria,
                        child_progress,
                        log_progress,
                    });
                }
            }
        }

        self.meter = ProgressMeter::new(self.network.name.clone(), total_blocks, cached_blocks);
        info!(
            network = %self.network.name,
            total_blocks,
            cached_blocks,
            queued_tasks = self.queue.len(),
            "historical sync setup complete"
        );
        Ok(())
    }

    async fn run(mut self, token: CancellationToken) {
        // Full cache: nothing to fetch, the finalized block is the checkpoint.
        if self.queue.is_empty() {
            let block_timestamp = unix_now();
            info!(finalized_block = self.finalized_block, "historical sync is fully cached");
            if self
                .emit(SyncEvent::HistoricalCheckpoint {
                    block_number: self.finalized_block,
                    block_timestamp,
                })
                .await
            {
                let _ = self.emit(SyncEvent::SyncComplete).await;
            }
            return;
        }

        let mut in_flight: JoinSet<TaskOutcome> = JoinSet::new();
        loop {
            while in_flight.len() < self.network.max_rpc_request_concurrency
                && let Some(task) = self.queue.pop()
            {
                in_flight.spawn(worker::run_task(self.worker_context(), task));
            }

            tokio::select! {
                () = token.cancelled() => {
                    self.queue.clear();
                    // in-flight tasks run to completion; their continuations
                    // are dropped with the actor
                    while in_flight.join_next().await.is_some() {}
                    info!("historical sync service killed");
                    return;
                }
                Some(joined) = in_flight.join_next() => {
                    match joined {
                        Ok(outcome) => {
                            if !self.handle_outcome(outcome).await {
                                return;
                            }
                        }
                        Err(join_error) => {
                            error!(error = %join_error, "sync worker panicked");
                        }
                    }

                    if self.queue.is_empty() && in_flight.is_empty() {
                        info!("historical sync complete");
                        let _ = self.emit(SyncEvent::SyncComplete).await;
                        return;
                    }
                }
            }
        }
    }

    /// Processes one finished worker. Returns `false` when the event channel
    /// is gone and the actor should stop.
    async fn handle_outcome(&mut self, outcome: TaskOutcome) -> bool {
        let TaskOutcome { task, result } = outcome;
        let output = match result {
            Err(error) => {
                warn!(
                    task = task.kind(),
                    from_block = task.from_block(),
                    error = %error,
                    "task failed, re-enqueueing at the same priority"
                );
                self.push_task(task);
                return true;
            }
            Ok(output) => output,
        };

        match output {
            TaskOutput::LogFilter { source, range, intervals } => {
                let entry = self.trackers.log_filter_mut(&source);
                let update = entry.progress.add_completed(range);
                let name = entry.name.clone();
                let target = CallbackTarget::LogFilter { criteria: entry.criteria.clone() };
                debug!(
                    source = %name,
                    checkpoint = ?update.new_checkpoint,
                    "log filter tracker advanced"
                );

                register_callbacks(&mut self.block_callbacks, &name, &target, intervals);
                self.enqueue_block_tasks();
            }
            TaskOutput::FactoryChildAddress { source, range, intervals } => {
                let entry = self.trackers.factory_mut(&source);
                let update = entry.child_progress.add_completed(range);
                let name = entry.name.clone();
                let target = CallbackTarget::LogFilter { criteria: entry.child_criteria.clone() };

                // The cross-kind unblocking rule: child addresses are now
                // known up to the new checkpoint, so the factory's log
                // filter may cover that far.
                let mut unlocked = Vec::new();
                if update.is_updated
                    && let Some(new_checkpoint) = update.new_checkpoint
                {
                    let delta_start = update
                        .prev_checkpoint
                        .map_or(*entry.child_progress.target().start(), |prev| prev + 1);
                    unlocked = interval::intersection(
                        slice::from_ref(&(delta_start..=new_checkpoint)),
                        &entry.log_progress.required(),
                    );
                    debug!(
                        source = %name,
                        checkpoint = new_checkpoint,
                        unlocked = ?unlocked,
                        "child address tracker advanced"
                    );
                }
                let max_block_range =
                    source.max_block_range.unwrap_or(self.network.default_max_block_range);

                register_callbacks(&mut self.block_callbacks, &name, &target, intervals);
                for range in interval::chunks(&unlocked, max_block_range) {
                    self.push_task(Task::FactoryLogFilter { source: source.clone(), range });
                }
                self.enqueue_block_tasks();
            }
            TaskOutput::FactoryLogFilter { source, range, intervals } => {
                let entry = self.trackers.factory_mut(&source);
                let update = entry.log_progress.add_completed(range);
                let name = entry.name.clone();
                let target = CallbackTarget::FactoryLogFilter { criteria: entry.criteria.clone() };
                debug!(
                    source = %name,
                    checkpoint = ?update.new_checkpoint,
                    "factory log filter tracker advanced"
                );

                register_callbacks(&mut self.block_callbacks, &name, &target, intervals);
                self.enqueue_block_tasks();
            }
            TaskOutput::Block { number, timestamp, committed_blocks } => {
                self.meter.on_commit(committed_blocks);
                if let Some(checkpoint) = self.block_progress.add_completed(number, timestamp) {
                    return self
                        .emit(SyncEvent::HistoricalCheckpoint {
                            block_number: checkpoint.number,
                            block_timestamp: checkpoint.timestamp,
                        })
                        .await;
                }
            }
        }
        true
    }

    /// The block-task gate.
    ///
    /// Once every tracker's checkpoint reaches `T`, no future task can
    /// register a callback at a block number `≤ T`, so the callbacks
    /// accumulated there are complete and may be turned into block tasks.
    fn enqueue_block_tasks(&mut self) {
        let Some(checkpoint) = self.trackers.checkpoint() else { return };
        if self.blocks_enqueued_to.is_some_and(|enqueued| checkpoint <= enqueued) {
            return;
        }

        let above = self.block_callbacks.split_off(&(checkpoint + 1));
        let ready = std::mem::replace(&mut self.block_callbacks, above);
        if !ready.is_empty() {
            self.block_progress.add_pending(ready.keys().copied());
            for (number, callbacks) in ready {
                debug!(block_number = number, callback_count = callbacks.len(), "block task ready");
                self.push_task(Task::Block { number, callbacks });
            }
        }
        self.blocks_enqueued_to = Some(checkpoint);
    }

    fn push_task(&mut self, task: Task) {
        let priority = task.priority();
        self.queue.push(task, priority);
    }

    fn worker_context(&self) -> WorkerContext<P, S> {
        WorkerContext {
            fetcher: self.fetcher.clone(),
            store: self.store.clone(),
            chain_id: self.network.chain_id,
            network: self.network.name.clone(),
        }
    }

    fn set_source_gauges(&self, source: &str, total: u64, cached: u64) {
        let labels =
            [("network", self.network.name.clone()), ("event_source", source.to_owned())];
        gauge!(TOTAL_BLOCKS, &labels).set(total as f64);
        gauge!(CACHED_BLOCKS, &labels).set(cached as f64);
    }

    /// Sends an event; `false` means every consumer is gone.
    async fn emit(&self, event: SyncEvent) -> bool {
        if self.event_tx.send(event).await.is_err() {
            warn!("event consumer dropped, stopping historical sync");
            return false;
        }
        true
    }
}

fn register_callbacks(
    table: &mut BTreeMap<BlockNumber, Vec<BlockCallback>>,
    source_name: &Arc<str>,
    target: &CallbackTarget,
    intervals: Vec<LogInterval>,
) {
    for interval in intervals {
        let tx_hashes =
            interval.logs.iter().filter_map(|log| log.transaction_hash).collect();
        table.entry(*interval.range.end()).or_default().push(BlockCallback {
            source_name: source_name.clone(),
            interval: interval.range,
            logs: interval.logs,
            tx_hashes,
            target: target.clone(),
        });
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        source::{LogFilterCriteria, LogFilterSource},
        test_utils::MemoryStore,
    };
    use alloy::{
        network::Ethereum,
        providers::{RootProvider, mock::Asserter},
        rpc::client::RpcClient,
    };

    fn log_filter_source(name: &str, start: u64, end: u64) -> EventSource {
        EventSource::LogFilter(LogFilterSource {
            name: name.into(),
            chain_id: 1,
            criteria: LogFilterCriteria { address: None, topics: vec![] },
            start_block: start,
            end_block: Some(end),
            max_block_range: Some(50),
        })
    }

    fn mocked_service(
        finalized_block: BlockNumber,
    ) -> Service<RootProvider<Ethereum>, MemoryStore> {
        let provider = RootProvider::new(RpcClient::mocked(Asserter::new()));
        let (event_tx, _event_rx) = mpsc::channel(8);
        Service::new(
            Arc::new(NetworkConfig::new("testnet", 1)),
            finalized_block,
            provider,
            Arc::new(MemoryStore::default()),
            event_tx,
        )
    }

    #[test]
    fn builder_rejects_invalid_configuration() {
        let store = Arc::new(MemoryStore::default());
        let provider = RootProvider::<Ethereum>::new(RpcClient::mocked(Asserter::new()));

        let mut network = NetworkConfig::new("testnet", 1);
        network.max_rpc_request_concurrency = 0;
        let result =
            HistoricalSyncBuilder::new(network).build(provider.clone(), store.clone());
        assert!(matches!(result, Err(SyncError::InvalidConcurrency)));

        let result = HistoricalSyncBuilder::new(NetworkConfig::new("testnet", 1))
            .source(log_filter_source("a", 0, 10))
            .source(log_filter_source("a", 20, 30))
            .build(provider.clone(), store.clone());
        assert!(matches!(result, Err(SyncError::DuplicateSource(name)) if name == "a"));

        let result = HistoricalSyncBuilder::new(NetworkConfig::new("testnet", 1))
            .source(log_filter_source("backwards", 100, 50))
            .build(provider, store);
        assert!(matches!(
            result,
            Err(SyncError::InvalidRange { start: 100, end: 50, .. })
        ));
    }

    #[tokio::test]
    async fn setup_chunks_required_intervals_into_tasks() {
        let mut service = mocked_service(199);
        service.setup(vec![log_filter_source("transfers", 100, 199)]).await.unwrap();

        assert_eq!(service.queue.len(), 2);
        let first = service.queue.pop().unwrap();
        let second = service.queue.pop().unwrap();
        assert_eq!(first.from_block(), 100);
        assert_eq!(second.from_block(), 150);
        assert!(matches!(first, Task::LogFilter { .. }));
    }

    #[tokio::test]
    async fn setup_skips_sources_past_the_finalized_block() {
        let mut service = mocked_service(500);
        service.setup(vec![log_filter_source("future", 1_000, 2_000)]).await.unwrap();

        assert!(service.queue.is_empty());
        assert!(service.trackers.log_filters.is_empty());
        assert_eq!(service.trackers.checkpoint(), None);
    }

    #[tokio::test]
    async fn block_tasks_wait_for_every_tracker() {
        let mut service = mocked_service(149);
        service
            .setup(vec![log_filter_source("a", 100, 149), log_filter_source("b", 100, 149)])
            .await
            .unwrap();

        let task_a = service.queue.pop().unwrap();
        let task_b = service.queue.pop().unwrap();
        assert!(service.queue.is_empty());

        let source_a = match &task_a {
            Task::LogFilter { source, .. } => source.clone(),
            _ => panic!("expected log filter task"),
        };

        // source `a` completes its whole range; `b` has not advanced, so the
        // gate must hold all block tasks back
        let outcome = TaskOutcome {
            task: task_a,
            result: Ok(TaskOutput::LogFilter {
                source: source_a,
                range: 100..=149,
                intervals: worker::build_log_intervals(&(100..=149), vec![]),
            }),
        };
        assert!(service.handle_outcome(outcome).await);
        assert!(service.queue.is_empty(), "block task enqueued before all trackers advanced");

        let source_b = match &task_b {
            Task::LogFilter { source, .. } => source.clone(),
            _ => panic!("expected log filter task"),
        };
        let outcome = TaskOutcome {
            task: task_b,
            result: Ok(TaskOutput::LogFilter {
                source: source_b,
                range: 100..=149,
                intervals: worker::build_log_intervals(&(100..=149), vec![]),
            }),
        };
        assert!(service.handle_outcome(outcome).await);

        // both empty-interval callbacks sit at block 149: one block task
        let task = service.queue.pop().unwrap();
        match task {
            Task::Block { number, callbacks } => {
                assert_eq!(number, 149);
                assert_eq!(callbacks.len(), 2);
            }
            _ => panic!("expected block task"),
        }
        assert!(service.queue.is_empty());
        assert_eq!(service.blocks_enqueued_to, Some(149));
    }

    #[tokio::test]
    async fn failed_tasks_are_requeued_at_the_same_priority() {
        let mut service = mocked_service(199);
        service.setup(vec![log_filter_source("transfers", 100, 199)]).await.unwrap();

        let task = service.queue.pop().unwrap();
        assert_eq!(task.from_block(), 100);

        let outcome = TaskOutcome {
            task,
            result: Err(SyncError::BlockNotFound(100)),
        };
        assert!(service.handle_outcome(outcome).await);

        // the retried task outranks the remaining [150, 199] chunk again
        assert_eq!(service.queue.len(), 2);
        assert_eq!(service.queue.pop().unwrap().from_block(), 100);
        assert_eq!(service.queue.pop().unwrap().from_block(), 150);
    }
}
