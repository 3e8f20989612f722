//! Event source declarations.
//!
//! A source is either a plain log filter or a *factory*: a contract whose
//! logs announce child contracts, followed by a log filter over the
//! discovered children. Source names are unique per network.

use alloy::{
    primitives::{Address, B256, BlockNumber},
    rpc::types::{Filter, Log},
};

use crate::interval::BlockRange;

/// Topic filter positions for `eth_getLogs`; `None` is a wildcard.
pub type Topics = Vec<Option<Vec<B256>>>;

/// The `(address, topics)` pair passed to `eth_getLogs`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogFilterCriteria {
    pub address: Option<Vec<Address>>,
    pub topics: Topics,
}

impl LogFilterCriteria {
    /// Builds the wire filter for these criteria. Block bounds are applied
    /// by the fetcher per request.
    pub(crate) fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(address) = &self.address {
            filter = filter.address(address.clone());
        }
        apply_topics(&mut filter, &self.topics);
        filter
    }
}

/// Where a factory log encodes the child contract address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildAddressLocation {
    Topic1,
    Topic2,
    Topic3,
    /// Byte offset of a 32-byte word in the log data; the address occupies
    /// the word's last 20 bytes.
    Offset(usize),
}

impl ChildAddressLocation {
    /// Extracts the child contract address from a factory log, if present.
    #[must_use]
    pub fn extract(&self, log: &Log) -> Option<Address> {
        match self {
            ChildAddressLocation::Topic1 => topic_address(log, 1),
            ChildAddressLocation::Topic2 => topic_address(log, 2),
            ChildAddressLocation::Topic3 => topic_address(log, 3),
            ChildAddressLocation::Offset(offset) => {
                let word = log.inner.data.data.get(*offset..*offset + 32)?;
                Some(Address::from_slice(&word[12..]))
            }
        }
    }
}

fn topic_address(log: &Log, position: usize) -> Option<Address> {
    log.inner.data.topics().get(position).map(|topic| Address::from_word(*topic))
}

/// Criteria identifying a factory and its children's logs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FactoryCriteria {
    /// The factory contract emitting child-creation logs.
    pub address: Address,
    /// Topic0 of the child-creation event.
    pub event_selector: B256,
    pub child_address_location: ChildAddressLocation,
    /// Topics filtering the *children's* logs.
    pub topics: Topics,
}

impl FactoryCriteria {
    /// The log filter that discovers child addresses.
    ///
    /// Coverage of this filter is what marks child-address discovery as
    /// cached, so it doubles as the factory's child-address interval key.
    #[must_use]
    pub fn child_address_criteria(&self) -> LogFilterCriteria {
        LogFilterCriteria {
            address: Some(vec![self.address]),
            topics: vec![Some(vec![self.event_selector])],
        }
    }

    /// The wire filter for the children's logs; the per-batch child
    /// addresses are applied by the caller.
    pub(crate) fn child_log_filter(&self) -> Filter {
        let mut filter = Filter::new();
        apply_topics(&mut filter, &self.topics);
        filter
    }
}

fn apply_topics(filter: &mut Filter, topics: &Topics) {
    for (position, topics) in topics.iter().enumerate().take(4) {
        if let Some(topics) = topics {
            filter.topics[position] = topics.clone().into();
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogFilterSource {
    pub name: String,
    pub chain_id: u64,
    pub criteria: LogFilterCriteria,
    pub start_block: BlockNumber,
    pub end_block: Option<BlockNumber>,
    pub max_block_range: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct FactorySource {
    pub name: String,
    pub chain_id: u64,
    pub criteria: FactoryCriteria,
    pub start_block: BlockNumber,
    pub end_block: Option<BlockNumber>,
    pub max_block_range: Option<u64>,
}

/// A user-declared event source on a single network.
#[derive(Clone, Debug)]
pub enum EventSource {
    LogFilter(LogFilterSource),
    Factory(FactorySource),
}

impl EventSource {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            EventSource::LogFilter(source) => &source.name,
            EventSource::Factory(source) => &source.name,
        }
    }

    #[must_use]
    pub fn start_block(&self) -> BlockNumber {
        match self {
            EventSource::LogFilter(source) => source.start_block,
            EventSource::Factory(source) => source.start_block,
        }
    }

    #[must_use]
    pub fn end_block(&self) -> Option<BlockNumber> {
        match self {
            EventSource::LogFilter(source) => source.end_block,
            EventSource::Factory(source) => source.end_block,
        }
    }

    #[must_use]
    pub fn max_block_range(&self) -> Option<u64> {
        match self {
            EventSource::LogFilter(source) => source.max_block_range,
            EventSource::Factory(source) => source.max_block_range,
        }
    }

    /// The target range `[start, min(end, finalized)]`, or `None` when the
    /// source starts past the finalized block.
    #[must_use]
    pub fn target_range(&self, finalized_block: BlockNumber) -> Option<BlockRange> {
        if self.start_block() > finalized_block {
            return None;
        }
        let end = self.end_block().map_or(finalized_block, |end| end.min(finalized_block));
        Some(self.start_block()..=end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData, address, b256};

    fn factory_log(topics: Vec<B256>, data: Bytes) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: address!("0x00000000000000000000000000000000000000f0"),
                data: LogData::new_unchecked(topics, data),
            },
            block_hash: None,
            block_number: Some(105),
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            removed: false,
        }
    }

    const SELECTOR: B256 =
        b256!("0x1111111111111111111111111111111111111111111111111111111111111111");

    #[test]
    fn extracts_child_address_from_topic() {
        let child = address!("0x00000000000000000000000000000000000000c1");
        let log = factory_log(vec![SELECTOR, child.into_word()], Bytes::new());

        assert_eq!(ChildAddressLocation::Topic1.extract(&log), Some(child));
        assert_eq!(ChildAddressLocation::Topic2.extract(&log), None);
    }

    #[test]
    fn extracts_child_address_from_data_offset() {
        let child = address!("0x00000000000000000000000000000000000000c2");
        let mut data = vec![0u8; 64];
        data[32 + 12..64].copy_from_slice(child.as_slice());
        let log = factory_log(vec![SELECTOR], data.into());

        assert_eq!(ChildAddressLocation::Offset(32).extract(&log), Some(child));
        assert_eq!(ChildAddressLocation::Offset(64).extract(&log), None);
    }

    #[test]
    fn child_address_criteria_filter_on_factory_and_selector() {
        let criteria = FactoryCriteria {
            address: address!("0x00000000000000000000000000000000000000f0"),
            event_selector: SELECTOR,
            child_address_location: ChildAddressLocation::Topic1,
            topics: vec![],
        };

        let derived = criteria.child_address_criteria();
        assert_eq!(derived.address, Some(vec![criteria.address]));
        assert_eq!(derived.topics, vec![Some(vec![SELECTOR])]);
    }

    #[test]
    fn target_range_is_clamped_to_finalized() {
        let source = EventSource::LogFilter(LogFilterSource {
            name: "transfers".into(),
            chain_id: 1,
            criteria: LogFilterCriteria { address: None, topics: vec![] },
            start_block: 100,
            end_block: Some(500),
            max_block_range: None,
        });

        assert_eq!(source.target_range(199), Some(100..=199));
        assert_eq!(source.target_range(1_000), Some(100..=500));
        assert_eq!(source.target_range(99), None);
    }
}
