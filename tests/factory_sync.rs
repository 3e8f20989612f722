//! End-to-end factory scenario: child contracts discovered from factory
//! logs, then a log filter over the discovered children.

mod common;

use std::sync::Arc;

use alloy::{
    primitives::{Address, B256, address, b256},
    providers::mock::Asserter,
};
use historical_sync::{
    HistoricalSyncBuilder, SyncEvent,
    source::{ChildAddressLocation, EventSource, FactoryCriteria, FactorySource},
    store::SyncStore,
    test_utils::{MemoryStore, rpc},
};

use common::{CHAIN_ID, checkpoint_blocks, collect_until_complete, mocked_provider, test_network};

const FACTORY: Address = address!("0x00000000000000000000000000000000000000f0");
const SELECTOR: B256 =
    b256!("0x00000000000000000000000000000000000000000000000000000000000000e5");

fn factory_criteria() -> FactoryCriteria {
    FactoryCriteria {
        address: FACTORY,
        event_selector: SELECTOR,
        child_address_location: ChildAddressLocation::Topic1,
        topics: vec![],
    }
}

fn pools_source() -> EventSource {
    EventSource::Factory(FactorySource {
        name: "pools".into(),
        chain_id: CHAIN_ID,
        criteria: factory_criteria(),
        start_block: 100,
        end_block: Some(199),
        max_block_range: Some(50),
    })
}

#[tokio::test]
async fn factory_discovers_children_and_syncs_their_logs() -> anyhow::Result<()> {
    let asserter = Asserter::new();
    let store = Arc::new(MemoryStore::default());

    let child_1 = address!("0x00000000000000000000000000000000000000c1");
    let child_2 = address!("0x00000000000000000000000000000000000000c2");

    // child address task [100, 149]: child 0xC1 created at block 105
    asserter.push_success(&vec![rpc::log(
        FACTORY,
        vec![SELECTOR, child_1.into_word()],
        105,
        b256!("0x00000000000000000000000000000000000000000000000000000000000000b1"),
    )]);
    // factory log task [100, 149] (addresses: [0xC1]): log at block 120
    asserter.push_success(&vec![rpc::log(
        child_1,
        vec![],
        120,
        b256!("0x0000000000000000000000000000000000000000000000000000000000000120"),
    )]);
    // block tasks at the callback keys <= the common checkpoint 149
    asserter.push_success(&rpc::block(105, 10_500, vec![]));
    asserter.push_success(&rpc::block(120, 12_000, vec![]));
    asserter.push_success(&rpc::block(149, 14_900, vec![]));
    // child address task [150, 199]: child 0xC2 created at block 180
    asserter.push_success(&vec![rpc::log(
        FACTORY,
        vec![SELECTOR, child_2.into_word()],
        180,
        b256!("0x00000000000000000000000000000000000000000000000000000000000000b2"),
    )]);
    // factory log task [150, 199] (addresses: [0xC1, 0xC2]): log at block 190
    asserter.push_success(&vec![rpc::log(
        child_2,
        vec![],
        190,
        b256!("0x0000000000000000000000000000000000000000000000000000000000000190"),
    )]);
    asserter.push_success(&rpc::block(180, 18_000, vec![]));
    asserter.push_success(&rpc::block(190, 19_000, vec![]));
    asserter.push_success(&rpc::block(199, 19_900, vec![]));

    let service = HistoricalSyncBuilder::new(test_network())
        .finalized_block(199)
        .source(pools_source())
        .build(mocked_provider(&asserter), store.clone())?;
    let (_handle, mut events) = service.start().await?;

    let events = collect_until_complete(&mut events).await;
    assert_eq!(checkpoint_blocks(&events), vec![105, 120, 149, 180, 190, 199]);
    assert_eq!(events.last(), Some(&SyncEvent::SyncComplete));

    // child-address discovery coverage persists under the derived filter
    let child_criteria = factory_criteria().child_address_criteria();
    assert_eq!(store.cached_log_filter_intervals(CHAIN_ID, &child_criteria), vec![100..=199]);
    // and the children's log coverage under the factory criteria
    assert_eq!(
        store.cached_factory_log_filter_intervals(CHAIN_ID, &factory_criteria()),
        vec![100..=199]
    );
    Ok(())
}

#[tokio::test]
async fn cached_children_skip_straight_to_factory_logs() -> anyhow::Result<()> {
    let asserter = Asserter::new();
    let store = Arc::new(MemoryStore::default());

    let child_1 = address!("0x00000000000000000000000000000000000000c1");

    // child discovery for the whole range is already cached
    let child_criteria = factory_criteria().child_address_criteria();
    store.seed_log_filter_interval(CHAIN_ID, &child_criteria, 100..=199);
    store
        .insert_factory_child_address_logs(
            CHAIN_ID,
            &[rpc::log(
                FACTORY,
                vec![SELECTOR, child_1.into_word()],
                105,
                b256!("0x00000000000000000000000000000000000000000000000000000000000000b1"),
            )],
        )
        .await?;

    // only factory log tasks run: [100, 149] then [150, 199]
    asserter.push_success(&vec![rpc::log(
        child_1,
        vec![],
        120,
        b256!("0x0000000000000000000000000000000000000000000000000000000000000120"),
    )]);
    asserter.push_success(&rpc::block(120, 12_000, vec![]));
    asserter.push_success(&rpc::block(149, 14_900, vec![]));
    asserter.push_success(&Vec::<alloy::rpc::types::Log>::new());
    asserter.push_success(&rpc::block(199, 19_900, vec![]));

    let service = HistoricalSyncBuilder::new(test_network())
        .finalized_block(199)
        .source(pools_source())
        .build(mocked_provider(&asserter), store.clone())?;
    let (_handle, mut events) = service.start().await?;

    let events = collect_until_complete(&mut events).await;
    assert_eq!(checkpoint_blocks(&events), vec![120, 149, 199]);
    assert_eq!(
        store.cached_factory_log_filter_intervals(CHAIN_ID, &factory_criteria()),
        vec![100..=199]
    );
    Ok(())
}
