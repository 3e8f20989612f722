use std::sync::Arc;

use alloy::{
    primitives::BlockNumber,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("RPC error: {0}")]
    Rpc(Arc<RpcError<TransportErrorKind>>),

    #[error("block {0} not found")]
    BlockNotFound(BlockNumber),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid block range for source `{name}`: start block {start} is past end block {end}")]
    InvalidRange { name: String, start: BlockNumber, end: BlockNumber },

    #[error("duplicate event source name `{0}`")]
    DuplicateSource(String),

    #[error("max block range must be greater than 0")]
    InvalidMaxBlockRange,

    #[error("RPC request concurrency must be greater than 0")]
    InvalidConcurrency,
}

impl From<RpcError<TransportErrorKind>> for SyncError {
    fn from(error: RpcError<TransportErrorKind>) -> Self {
        SyncError::Rpc(Arc::new(error))
    }
}

/// Failure reported by an event store implementation.
///
/// Store backends differ, so the engine only keeps the rendered message; the
/// work queue treats every store failure as retryable.
#[derive(Error, Debug, Clone)]
#[error("event store error: {0}")]
pub struct StoreError(String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for StoreError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for StoreError {
    fn from(message: &str) -> Self {
        Self(message.to_owned())
    }
}
