use std::collections::HashSet;
use std::sync::Arc;

use alloy::{
    primitives::{BlockNumber, TxHash},
    rpc::types::Log,
};

use crate::{
    interval::BlockRange,
    source::{FactoryCriteria, FactorySource, LogFilterCriteria, LogFilterSource},
};

/// A unit of sync work. Priority is `-(starting block number)`, so the queue
/// keeps the working set near the current checkpoint.
pub(crate) enum Task {
    LogFilter { source: Arc<LogFilterSource>, range: BlockRange },
    FactoryChildAddress { source: Arc<FactorySource>, range: BlockRange },
    FactoryLogFilter { source: Arc<FactorySource>, range: BlockRange },
    Block { number: BlockNumber, callbacks: Vec<BlockCallback> },
}

impl Task {
    pub(crate) fn priority(&self) -> i64 {
        -(self.from_block() as i64)
    }

    pub(crate) fn from_block(&self) -> BlockNumber {
        match self {
            Task::LogFilter { range, .. }
            | Task::FactoryChildAddress { range, .. }
            | Task::FactoryLogFilter { range, .. } => *range.start(),
            Task::Block { number, .. } => *number,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Task::LogFilter { .. } => "log_filter",
            Task::FactoryChildAddress { .. } => "factory_child_address",
            Task::FactoryLogFilter { .. } => "factory_log_filter",
            Task::Block { .. } => "block",
        }
    }
}

/// What a block callback persists once the block body arrives.
#[derive(Clone)]
pub(crate) enum CallbackTarget {
    LogFilter { criteria: Arc<LogFilterCriteria> },
    FactoryLogFilter { criteria: Arc<FactoryCriteria> },
}

/// A deferred persist action keyed by the block number at which its interval
/// commits. Captures everything except the block body, which the block
/// worker injects at invocation.
pub(crate) struct BlockCallback {
    pub source_name: Arc<str>,
    pub interval: BlockRange,
    pub logs: Vec<Log>,
    pub tx_hashes: HashSet<TxHash>,
    pub target: CallbackTarget,
}

impl BlockCallback {
    pub(crate) fn width(&self) -> u64 {
        self.interval.end() - self.interval.start() + 1
    }
}
