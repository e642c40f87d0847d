//! Shared fixtures: an in-memory store, canned call events, and typed
//! entity accessors.

#![allow(dead_code)]

use epoch_indexer::testing::MemoryStore;
use epoch_indexer::{
    entrypoint, payload_id, CallEvent, EntityKind, GlobalState, IndexerConfig, InvocationReceipt,
    MessageBlock, MessageRecord, Network, NetworkEpochBlockNumber, Payload, GLOBAL_STATE_ID,
};
use ethereum_types::{Address, H256};
use pretty_env_logger::env_logger::{try_init_from_env, Env, DEFAULT_FILTER_ENV};

pub fn init_logger() {
    let _ = try_init_from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, "info"));
}

/// The id the payload of call `seq` is recorded under.
pub fn tx_id(seq: u64) -> String {
    payload_id(H256::from_low_u64_be(seq))
}

pub fn call(seq: u64, payload: Vec<u8>) -> CallEvent {
    CallEvent {
        tx_hash: H256::from_low_u64_be(seq),
        submitter: Address::repeat_byte(0x42),
        payload,
        block_number: 100 + seq,
    }
}

pub fn process(store: &mut MemoryStore, seq: u64, payload: Vec<u8>) -> InvocationReceipt {
    process_with(store, seq, payload, &IndexerConfig::default())
}

pub fn process_with(
    store: &mut MemoryStore,
    seq: u64,
    payload: Vec<u8>,
    config: &IndexerConfig,
) -> InvocationReceipt {
    entrypoint(store, &call(seq, payload), config).expect("store is healthy")
}

pub fn global_state(store: &MemoryStore) -> GlobalState {
    store
        .get(EntityKind::GlobalState, GLOBAL_STATE_ID)
        .expect("global state exists")
        .as_global_state()
        .expect("kind matches")
        .clone()
}

pub fn network(store: &MemoryStore, id: &str) -> Network {
    store
        .get(EntityKind::Network, id)
        .unwrap_or_else(|| panic!("network {id} exists"))
        .as_network()
        .expect("kind matches")
        .clone()
}

pub fn block_number(store: &MemoryStore, id: &str) -> NetworkEpochBlockNumber {
    store
        .get(EntityKind::NetworkEpochBlockNumber, id)
        .unwrap_or_else(|| panic!("block number {id} exists"))
        .as_block_number()
        .expect("kind matches")
        .clone()
}

pub fn payload_record(store: &MemoryStore, seq: u64) -> Payload {
    store
        .get(EntityKind::Payload, &tx_id(seq))
        .expect("payload record exists")
        .as_payload()
        .expect("kind matches")
        .clone()
}

pub fn message_block(store: &MemoryStore, id: &str) -> MessageBlock {
    store
        .get(EntityKind::MessageBlock, id)
        .unwrap_or_else(|| panic!("message block {id} exists"))
        .as_message_block()
        .expect("kind matches")
        .clone()
}

pub fn message(store: &MemoryStore, id: &str) -> MessageRecord {
    store
        .get(EntityKind::Message, id)
        .unwrap_or_else(|| panic!("message {id} exists"))
        .as_message()
        .expect("kind matches")
        .clone()
}

/// Follows `next_array_element` edges from the state's head, the way
/// the external query layer recovers the active set.
pub fn walk_active_list(store: &MemoryStore) -> Vec<Network> {
    let state = global_state(store);
    let mut networks = Vec::new();
    let mut next = state.network_array_head;
    while let Some(id) = next {
        let node = network(store, &id);
        assert!(node.removed_at.is_none(), "removed network {id} still linked");
        next = node.next_array_element.clone();
        networks.push(node);
    }
    assert_eq!(networks.len() as u64, state.active_network_count);
    networks
}
