//! Payload encoder.
//!
//! Messages are chunked [`TAGS_PER_PREAMBLE`] to a block; each block is
//! one packed preamble word followed by the bodies in tag order. Unused
//! trailing tag slots encode as zero, which decoders skip once the
//! payload is exhausted.

use u4::U4;

use crate::messages::{Message, SetBlockNumbers};
use crate::preamble::{Preamble, TAGS_PER_PREAMBLE};
use crate::varint;

/// Encodes `messages` into one payload.
pub fn encode_messages(messages: &[Message]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for block in messages.chunks(TAGS_PER_PREAMBLE) {
        encode_preamble(block, &mut bytes);
        for message in block {
            encode_message(message, &mut bytes);
        }
    }
    bytes
}

fn encode_preamble(messages: &[Message], bytes: &mut Vec<u8>) {
    let tags: Vec<U4> = messages.iter().map(|message| message.tag().nibble()).collect();
    bytes.extend_from_slice(&Preamble::pack(&tags).to_le_bytes());
}

fn encode_message(message: &Message, bytes: &mut Vec<u8>) {
    match message {
        Message::SetBlockNumbers(SetBlockNumbers::Empty) => {}
        Message::SetBlockNumbers(SetBlockNumbers::NonEmpty { root, accelerations }) => {
            bytes.extend_from_slice(root.as_bytes());
            for &acceleration in accelerations.iter() {
                varint::encode_i64(acceleration, bytes);
            }
        }
        Message::CorrectEpochs => {}
        Message::UpdateVersions { version } => varint::encode_u64(*version, bytes),
        Message::RegisterNetworks { remove, add } => {
            encode_removals(remove, bytes);
            varint::encode_u64(add.len() as u64, bytes);
            for chain_id in add {
                encode_str(chain_id, bytes);
            }
        }
        Message::RegisterNetworksAndAliases { remove, add } => {
            encode_removals(remove, bytes);
            varint::encode_u64(add.len() as u64, bytes);
            for (chain_id, alias) in add {
                encode_str(chain_id, bytes);
                encode_str(alias, bytes);
            }
        }
        Message::ChangePermissions {
            address,
            valid_through,
            old_permissions,
            new_permissions,
        } => {
            bytes.extend_from_slice(address.as_bytes());
            varint::encode_u64(*valid_through, bytes);
            encode_str_list(old_permissions, bytes);
            encode_str_list(new_permissions, bytes);
        }
        Message::ResetState => {}
    }
}

fn encode_removals(remove: &[u64], bytes: &mut Vec<u8>) {
    varint::encode_u64(remove.len() as u64, bytes);
    for &index in remove {
        varint::encode_u64(index, bytes);
    }
}

fn encode_str(value: &str, bytes: &mut Vec<u8>) {
    varint::encode_u64(value.len() as u64, bytes);
    bytes.extend_from_slice(value.as_bytes());
}

fn encode_str_list(values: &[String], bytes: &mut Vec<u8>) {
    varint::encode_u64(values.len() as u64, bytes);
    for value in values {
        encode_str(value, bytes);
    }
}
