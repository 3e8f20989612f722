//! Resilient `eth_getLogs` wrapper.
//!
//! Providers reject over-large queries in provider-specific ways, sometimes
//! suggesting a narrower range in the error message. The fetcher recognises
//! those errors, splits the range (using the suggestion when it parses,
//! midpoint otherwise) and retries the halves recursively until individual
//! calls succeed. Every other error is propagated to the caller — transient
//! failures are the work queue's retry concern, not the fetcher's.

use std::time::Instant;

use alloy::{
    primitives::BlockNumber,
    providers::Provider,
    rpc::types::{Block, Filter, Log},
    transports::{RpcError, TransportErrorKind},
};
use metrics::histogram;
use tracing::{debug, warn};

use crate::{SyncError, interval::BlockRange, metrics::RPC_REQUEST_DURATION_SECONDS};

#[derive(Clone)]
pub(crate) struct LogFetcher<P> {
    provider: P,
    network: String,
}

impl<P: Provider + Clone> LogFetcher<P> {
    pub(crate) fn new(provider: P, network: impl Into<String>) -> Self {
        Self { provider, network: network.into() }
    }

    /// Fetches logs matching `filter` over `range`, transparently splitting
    /// on recognised range/size errors.
    pub(crate) async fn get_logs(
        &self,
        filter: &Filter,
        range: BlockRange,
    ) -> Result<Vec<Log>, SyncError> {
        let ranged = filter.clone().from_block(*range.start()).to_block(*range.end());

        let started = Instant::now();
        let result = self.provider.get_logs(&ranged).await;
        self.record_duration("eth_getLogs", started);

        let error = match result {
            Ok(logs) => return Ok(logs),
            Err(error) => error,
        };

        let Some((left, right)) = split_range(&range, &error) else {
            return Err(error.into());
        };

        warn!(
            from_block = range.start(),
            to_block = range.end(),
            retry_ranges = ?(&left, &right),
            error = %error,
            "eth_getLogs range rejected by provider, splitting"
        );

        let mut logs = Box::pin(self.get_logs(filter, left)).await?;
        logs.extend(Box::pin(self.get_logs(filter, right)).await?);
        Ok(logs)
    }

    /// Fetches a block with full transactions.
    pub(crate) async fn get_block_with_transactions(
        &self,
        number: BlockNumber,
    ) -> Result<Block, SyncError> {
        let started = Instant::now();
        let result = self.provider.get_block_by_number(number.into()).full().await;
        self.record_duration("eth_getBlockByNumber", started);

        result?.ok_or(SyncError::BlockNotFound(number))
    }

    fn record_duration(&self, method: &'static str, started: Instant) {
        histogram!(
            RPC_REQUEST_DURATION_SECONDS,
            "method" => method,
            "network" => self.network.clone()
        )
        .record(started.elapsed().as_secs_f64());
    }
}

/// Classifies a provider error and picks the retry split, if any.
///
/// A single-block range cannot be split; whatever the provider said, the
/// error is then terminal for this call.
fn split_range(
    range: &BlockRange,
    error: &RpcError<TransportErrorKind>,
) -> Option<(BlockRange, BlockRange)> {
    let RpcError::ErrorResp(payload) = error else { return None };
    let message = payload.message.to_lowercase();

    let (from, to) = (*range.start(), *range.end());
    if from >= to {
        return None;
    }

    if message.contains("log response size exceeded")
        || message.contains("query returned more than 10000 results")
    {
        return Some(suggested_split(from, to, &message).unwrap_or_else(|| midpoint_split(from, to)));
    }

    if message.contains("block range less than 20000")
        || message.contains("limited to a 10,000 blocks range")
    {
        return Some(midpoint_split(from, to));
    }

    None
}

/// The split derived from a provider-suggested `[a, b]` range.
///
/// Only the suggested end is used: the halves must still cover `[from, to]`
/// exactly, so the left half always starts at `from`.
fn suggested_split(
    from: BlockNumber,
    to: BlockNumber,
    message: &str,
) -> Option<(BlockRange, BlockRange)> {
    let (start, end) = parse_suggested_range(message)?;
    if start > end || end < from || end >= to {
        debug!(start, end, "unusable suggested range, falling back to midpoint split");
        return None;
    }
    Some((from..=end, end + 1..=to))
}

fn midpoint_split(from: BlockNumber, to: BlockNumber) -> (BlockRange, BlockRange) {
    let mid = from + (to - from) / 2;
    (from..=mid, mid + 1..=to)
}

/// Extracts the last bracketed `[a, b]` pair from an error message.
fn parse_suggested_range(message: &str) -> Option<(BlockNumber, BlockNumber)> {
    let open = message.rfind('[')?;
    let close = message[open..].find(']')? + open;
    let (first, second) = message[open + 1..close].split_once(',')?;
    Some((parse_block_number(first)?, parse_block_number(second)?))
}

fn parse_block_number(raw: &str) -> Option<BlockNumber> {
    let cleaned = raw.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
    match cleaned.strip_prefix("0x") {
        Some(hex) => BlockNumber::from_str_radix(hex, 16).ok(),
        None => cleaned.parse().ok(),
    }
}
