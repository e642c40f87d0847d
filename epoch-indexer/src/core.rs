//! Top-level, per-invocation driver.

use anyhow::{ensure, Context as _};
use epoch_encoding::{Preamble, Tag};
use ethereum_types::U256;
use log::{debug, trace, warn};

use crate::entities::{
    message_block_id, message_id, payload_id, Entity, EntityKind, GlobalState, MessageBlock,
    MessageRecord, Payload, GLOBAL_STATE_ID,
};
use crate::exec::{execute_message, ExecError};
use crate::interface::{CallEvent, EntityStore, IndexerConfig, InvocationReceipt, StoreError};
use crate::store::{unexpected_kind, StoreCache};

/// Byte offset of the 32-byte payload length word inside raw calldata.
const CALLDATA_LENGTH_OFFSET: usize = 36;
/// Byte offset of the payload itself inside raw calldata.
const CALLDATA_PAYLOAD_OFFSET: usize = 68;

/// Processes one on-chain call against the store.
///
/// Successful invocations commit the mutated state and the full audit
/// log atomically. Decoder errors and invariant violations roll
/// everything back and persist a single invalid [`Payload`] record.
/// Store failures abort with nothing written at all.
pub fn entrypoint(
    store: &mut dyn EntityStore,
    call: &CallEvent,
    config: &IndexerConfig,
) -> anyhow::Result<InvocationReceipt> {
    let payload_id = payload_id(call.tx_hash);
    debug!(
        "processing payload {payload_id} ({} bytes) from block {}",
        call.payload.len(),
        call.block_number,
    );

    let mut cache = StoreCache::new(store);
    let mut state = load_global_state(&mut cache, config)?;

    match process_payload(&mut cache, &mut state, call, &payload_id, config) {
        Ok(messages) => {
            cache.set(GLOBAL_STATE_ID.to_owned(), Entity::GlobalState(state));
            cache.set(
                payload_id.clone(),
                Entity::Payload(Payload {
                    id: payload_id.clone(),
                    data: call.payload.clone(),
                    submitter: call.submitter,
                    valid: true,
                    created_at: call.block_number,
                    error_message: None,
                }),
            );
            cache.commit().context("committing invocation")?;
            Ok(InvocationReceipt {
                valid: true,
                messages,
                error_message: None,
            })
        }
        Err(ExecError::Store(error)) => {
            Err(error).context(format!("store failure while processing {payload_id}"))
        }
        Err(error) => {
            warn!("payload {payload_id} rolled back: {error}");
            cache.discard();
            let error_message = error.audit_label();
            store
                .save(
                    payload_id.clone(),
                    Entity::Payload(Payload {
                        id: payload_id,
                        data: call.payload.clone(),
                        submitter: call.submitter,
                        valid: false,
                        created_at: call.block_number,
                        error_message: Some(error_message.clone()),
                    }),
                )
                .context("recording failed payload")?;
            Ok(InvocationReceipt {
                valid: false,
                messages: 0,
                error_message: Some(error_message),
            })
        }
    }
}

fn load_global_state(
    cache: &mut StoreCache<'_>,
    config: &IndexerConfig,
) -> Result<GlobalState, StoreError> {
    match cache.get(EntityKind::GlobalState, GLOBAL_STATE_ID)? {
        Some(entity) => entity
            .into_global_state()
            .map_err(|other| unexpected_kind(EntityKind::GlobalState, GLOBAL_STATE_ID, &other)),
        None => Ok(GlobalState {
            id: GLOBAL_STATE_ID.to_owned(),
            encoding_version: config.initial_encoding_version,
            ..Default::default()
        }),
    }
}

/// Decodes and executes every message block, staging the audit log as
/// it goes. Returns the number of messages executed.
fn process_payload(
    cache: &mut StoreCache<'_>,
    state: &mut GlobalState,
    call: &CallEvent,
    payload_id: &str,
    config: &IndexerConfig,
) -> Result<usize, ExecError> {
    let mut remaining: &[u8] = &call.payload;
    let mut messages = 0;

    for block_index in 0.. {
        if remaining.is_empty() {
            break;
        }
        let block_id = message_block_id(payload_id, block_index);
        let block_start = remaining;
        let preamble = Preamble::read(&mut remaining)?;

        let mut block_messages = 0;
        for nibble in preamble.tags() {
            // Trailing zero-filled tag slots are indistinguishable from
            // real empty-bodied messages, so an exhausted payload ends
            // the block before the next dispatch.
            if remaining.is_empty() {
                break;
            }
            let Some(tag) = Tag::from_nibble(nibble) else {
                debug!("unknown tag {:#x} ends block {block_id}", nibble as u8);
                break;
            };

            let message_id = message_id(&block_id, block_messages);
            let before = remaining;
            let body = execute_message(tag, &mut remaining, cache, state, config, &message_id)?;
            let consumed = before.len() - remaining.len();
            trace!("message {message_id}: {tag:?}, {consumed} bytes");
            cache.set(
                message_id.clone(),
                Entity::Message(MessageRecord {
                    id: message_id,
                    block: block_id.clone(),
                    data: before[..consumed].to_vec(),
                    body,
                }),
            );
            block_messages += 1;
            messages += 1;
        }

        let consumed = block_start.len() - remaining.len();
        cache.set(
            block_id.clone(),
            Entity::MessageBlock(MessageBlock {
                id: block_id,
                data: block_start[..consumed].to_vec(),
                payload: payload_id.to_owned(),
            }),
        );
    }
    Ok(messages)
}

/// Locates the payload inside raw calldata, for harnesses that consume
/// whole transactions: a 32-byte little-endian length word at offset
/// [`CALLDATA_LENGTH_OFFSET`], then that many bytes starting at offset
/// [`CALLDATA_PAYLOAD_OFFSET`].
pub fn payload_from_calldata(calldata: &[u8]) -> anyhow::Result<&[u8]> {
    ensure!(
        calldata.len() >= CALLDATA_PAYLOAD_OFFSET,
        "calldata too short for framing: {} bytes",
        calldata.len(),
    );
    let length = U256::from_little_endian(
        &calldata[CALLDATA_LENGTH_OFFSET..CALLDATA_LENGTH_OFFSET + 32],
    );
    ensure!(length <= U256::from(u32::MAX), "payload length {length} out of range");
    let length = length.as_usize();
    let end = CALLDATA_PAYLOAD_OFFSET + length;
    ensure!(
        calldata.len() >= end,
        "calldata too short for {length}-byte payload",
    );
    Ok(&calldata[CALLDATA_PAYLOAD_OFFSET..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calldata_framing() {
        let payload = b"epoch oracle payload";
        let mut calldata = vec![0xEE; CALLDATA_LENGTH_OFFSET];
        let mut length = [0; 32];
        U256::from(payload.len()).to_little_endian(&mut length);
        calldata.extend_from_slice(&length);
        calldata.extend_from_slice(payload);
        calldata.extend_from_slice(b"trailing junk is ignored");

        assert_eq!(payload_from_calldata(&calldata).unwrap(), payload);
    }

    #[test]
    fn calldata_too_short_for_length_word() {
        assert!(payload_from_calldata(&[0; 40]).is_err());
    }

    #[test]
    fn calldata_shorter_than_declared_payload() {
        let mut calldata = vec![0; CALLDATA_PAYLOAD_OFFSET];
        let mut length = [0; 32];
        U256::from(1000u64).to_little_endian(&mut length);
        calldata[CALLDATA_LENGTH_OFFSET..CALLDATA_LENGTH_OFFSET + 32].copy_from_slice(&length);
        assert!(payload_from_calldata(&calldata).is_err());
    }
}
