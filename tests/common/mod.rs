use std::time::Duration;

use alloy::{
    network::Ethereum,
    primitives::BlockNumber,
    providers::{RootProvider, mock::Asserter},
    rpc::client::RpcClient,
};
use historical_sync::{NetworkConfig, SyncEvent};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

pub const CHAIN_ID: u64 = 1;

pub fn mocked_provider(asserter: &Asserter) -> RootProvider<Ethereum> {
    RootProvider::new(RpcClient::mocked(asserter.clone()))
}

/// Single-worker network so mocked responses are consumed in a
/// deterministic order.
pub fn test_network() -> NetworkConfig {
    let mut network = NetworkConfig::new("testnet", CHAIN_ID);
    network.max_rpc_request_concurrency = 1;
    network
}

/// Drains the event stream through `SyncComplete`, failing on a stall.
pub async fn collect_until_complete(stream: &mut ReceiverStream<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for a sync event")
            .expect("event stream closed before SyncComplete");
        let done = event == SyncEvent::SyncComplete;
        events.push(event);
        if done {
            return events;
        }
    }
}

pub fn checkpoint_blocks(events: &[SyncEvent]) -> Vec<BlockNumber> {
    events.iter().filter_map(|event| event.checkpoint()).map(|(number, _)| number).collect()
}
