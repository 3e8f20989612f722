//! Builders for mock RPC payloads.
//!
//! The values produced here serialize into the wire shapes expected by
//! alloy's mocked transport (`Asserter`), carrying just enough structure for
//! the sync engine: block numbers, timestamps, topics, and hashes.

use alloy::{
    consensus::{Signed, TxEnvelope, TxLegacy, transaction::Recovered},
    primitives::{Address, B256, BlockNumber, Bytes, LogData, Signature, TxKind, U256},
    rpc::types::{Block, BlockTransactions, Header, Log, Transaction},
};

/// A log emitted by `address` at `block_number` from transaction `tx_hash`.
pub fn log(address: Address, topics: Vec<B256>, block_number: BlockNumber, tx_hash: B256) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address,
            data: LogData::new_unchecked(topics, Bytes::new()),
        },
        block_hash: None,
        block_number: Some(block_number),
        block_timestamp: None,
        transaction_hash: Some(tx_hash),
        transaction_index: Some(0),
        log_index: Some(0),
        removed: false,
    }
}

/// A block carrying full transaction objects.
pub fn block(number: BlockNumber, timestamp: u64, transactions: Vec<Transaction>) -> Block {
    let header = alloy::consensus::Header { number, timestamp, ..Default::default() };
    let hash = header.hash_slow();
    Block {
        header: Header { hash, inner: header, total_difficulty: None, size: None },
        uncles: Vec::new(),
        transactions: BlockTransactions::Full(transactions),
        withdrawals: None,
    }
}

/// A minimal legacy transaction with the given hash.
pub fn transaction(hash: B256, block_number: BlockNumber) -> Transaction {
    let inner = TxLegacy {
        chain_id: Some(1),
        nonce: 0,
        gas_price: 0,
        gas_limit: 21_000,
        to: TxKind::Create,
        value: U256::ZERO,
        input: Bytes::new(),
    };
    let signature = Signature::new(U256::from(1), U256::from(1), false);
    let envelope = TxEnvelope::Legacy(Signed::new_unchecked(inner, signature, hash));
    Transaction {
        inner: Recovered::new_unchecked(envelope, Address::ZERO),
        block_hash: None,
        block_number: Some(block_number),
        transaction_index: Some(0),
        effective_gas_price: None,
    }
}
