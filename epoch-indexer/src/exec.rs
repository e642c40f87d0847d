//! One executor per message kind.
//!
//! Each executor consumes its body from the front of the remaining
//! payload, mutates the working [`GlobalState`] and related entities
//! through the [`StoreCache`], and returns the decoded [`MessageBody`]
//! for the audit log. Bytes consumed are observed by the driver from
//! the slice it handed in.

use epoch_encoding::varint::{decode_i64, decode_str, decode_str_list, decode_u64, take_bytes};
use epoch_encoding::{DecodeError, Tag};
use ethereum_types::{Address, H256};
use itertools::Itertools as _;
use log::debug;

use crate::entities::{
    block_number_id, Entity, GlobalState, MessageBody, Network, NetworkEpochBlockNumber,
    PermissionListEntry,
};
use crate::interface::{IndexerConfig, NetworkIdentity, StoreError};
use crate::network_list;
use crate::store::StoreCache;

/// A broken oracle-state invariant. Aborts the invocation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Walking the network list found a different number of active
    /// nodes than the recorded count.
    #[error("network list disagrees with state: walked {walked}, expected {expected}")]
    ActiveCountMismatch {
        /// Nodes found by the walk.
        walked: u64,
        /// [`GlobalState::active_network_count`].
        expected: u64,
    },
    /// A `next_array_element` edge points at a missing entity.
    #[error("network list edge points at missing network {id}")]
    DanglingNetworkLink {
        /// The id the edge pointed at.
        id: String,
    },
    /// A removal index fell outside the active list.
    #[error("remove index {index} out of range for {len} active networks")]
    RemoveIndexOutOfRange {
        /// The index as decoded.
        index: u64,
        /// Active networks at that point.
        len: usize,
    },
    /// An UpdateVersions message did not increase the version.
    #[error("encoding version must increase: {new_version} <= {old_version}")]
    NonMonotonicVersion {
        /// Version before the message.
        old_version: u64,
        /// Version the message carried.
        new_version: u64,
    },
}

/// Why an invocation was aborted.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The payload ended (or was malformed) mid-field.
    #[error("truncation: {0}")]
    Decode(#[from] DecodeError),
    /// See [`InvariantViolation`].
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    /// Fatal store failure. Never recorded on the payload; always
    /// propagated to the caller.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ExecError {
    /// The short failure kind recorded on the Payload entity.
    pub fn audit_label(&self) -> String {
        match self {
            ExecError::Decode(_) => "truncation".to_owned(),
            ExecError::Invariant(violation) => violation.to_string(),
            ExecError::Store(error) => error.to_string(),
        }
    }
}

/// Dispatches one tagged message to its executor.
pub(crate) fn execute_message(
    tag: Tag,
    input: &mut &[u8],
    cache: &mut StoreCache<'_>,
    state: &mut GlobalState,
    config: &IndexerConfig,
    message_id: &str,
) -> Result<MessageBody, ExecError> {
    match tag {
        Tag::SetBlockNumbers => set_block_numbers(input, cache, state, message_id),
        Tag::CorrectEpochs => Ok(MessageBody::CorrectEpochs),
        Tag::UpdateVersions => update_versions(input, state),
        Tag::RegisterNetworks => register_networks(input, cache, state, config, message_id, false),
        Tag::RegisterNetworksAndAliases => {
            register_networks(input, cache, state, config, message_id, true)
        }
        Tag::ChangePermissions => change_permissions(input, cache, state, message_id),
        Tag::ResetState => reset_state(state, config),
    }
}

/// Opens the next epoch and appends one block-number sample per active
/// network.
///
/// With no active networks the message has no body at all: nothing is
/// consumed and no epoch is opened.
fn set_block_numbers(
    input: &mut &[u8],
    cache: &mut StoreCache<'_>,
    state: &mut GlobalState,
    message_id: &str,
) -> Result<MessageBody, ExecError> {
    if state.active_network_count == 0 {
        debug!("no active networks; block-number message is empty");
        return Ok(MessageBody::SetBlockNumbersForEpoch {
            merkle_root: None,
            accelerations: Vec::new(),
        });
    }

    let epoch_number = state.latest_valid_epoch.unwrap_or(0) + 1;
    state.latest_valid_epoch = Some(epoch_number);
    let epoch = cache.epoch(epoch_number)?;

    let merkle_root = H256::from_slice(take_bytes(input, 32)?);

    let mut networks = network_list::materialize(cache, state)?;
    let mut accelerations = Vec::with_capacity(networks.len());
    for network in &mut networks {
        let acceleration = decode_i64(input)?;
        accelerations.push(acceleration);
        let sample = next_sample(cache, network, &epoch.id, epoch_number, acceleration)?;
        network.latest_valid_block_number = Some(sample.id.clone());
        network.last_updated_at = message_id.to_owned();
        cache.set(sample.id.clone(), Entity::BlockNumber(sample));
        cache.set(network.id.clone(), Entity::Network(network.clone()));
    }
    debug!("epoch {epoch_number}: recorded {} block numbers", accelerations.len());

    Ok(MessageBody::SetBlockNumbersForEpoch {
        merkle_root: Some(merkle_root),
        accelerations,
    })
}

/// Builds the epoch's sample for one network, accumulating delta and
/// block number from the previous epoch's sample when one exists.
fn next_sample(
    cache: &mut StoreCache<'_>,
    network: &Network,
    epoch: &str,
    epoch_number: u64,
    acceleration: i64,
) -> Result<NetworkEpochBlockNumber, StoreError> {
    let previous = match epoch_number.checked_sub(1) {
        Some(previous_epoch) => cache.block_number(&block_number_id(previous_epoch, &network.id))?,
        None => None,
    };
    let (delta, block_number, previous_id) = match previous {
        Some(previous) => {
            let delta = previous.delta + i128::from(acceleration);
            (delta, previous.block_number + delta, Some(previous.id))
        }
        None => (i128::from(acceleration), i128::from(acceleration), None),
    };
    Ok(NetworkEpochBlockNumber {
        id: block_number_id(epoch_number, &network.id),
        acceleration,
        delta,
        block_number,
        epoch_number,
        network: network.id.clone(),
        epoch: epoch.to_owned(),
        previous_block_number: previous_id,
    })
}

fn update_versions(input: &mut &[u8], state: &mut GlobalState) -> Result<MessageBody, ExecError> {
    let new_version = decode_u64(input)?;
    let old_version = state.encoding_version;
    if new_version <= old_version {
        return Err(InvariantViolation::NonMonotonicVersion {
            old_version,
            new_version,
        }
        .into());
    }
    state.encoding_version = new_version;
    Ok(MessageBody::UpdateVersions {
        old_version,
        new_version,
    })
}

/// Applies removals (by active-list index, swap-and-pop) and additions
/// (by chain id, or by registration ordinal under the legacy scheme).
fn register_networks(
    input: &mut &[u8],
    cache: &mut StoreCache<'_>,
    state: &mut GlobalState,
    config: &IndexerConfig,
    message_id: &str,
    with_aliases: bool,
) -> Result<MessageBody, ExecError> {
    let mut list = network_list::materialize(cache, state)?;

    let mut removed = Vec::new();
    let remove_count = decode_u64(input)?;
    for _ in 0..remove_count {
        let index = decode_u64(input)?;
        let mut network = network_list::swap_and_pop(&mut list, index)?;
        network.removed_at = Some(message_id.to_owned());
        network.last_updated_at = message_id.to_owned();
        removed.push(network);
    }

    let mut added = Vec::new();
    let add_count = decode_u64(input)?;
    for ordinal in 0..add_count {
        let chain_id = decode_str(input)?;
        let alias = with_aliases.then(|| decode_str(input)).transpose()?;
        let id = match config.network_identity {
            NetworkIdentity::ChainId => chain_id.clone(),
            NetworkIdentity::Ordinal => (state.network_count + ordinal).to_string(),
        };
        // Re-registering a previously removed id resurrects the entity.
        let mut network = cache.network(&id)?;
        network.chain_id = chain_id;
        network.alias = alias;
        network.added_at = message_id.to_owned();
        network.last_updated_at = message_id.to_owned();
        network.removed_at = None;
        added.push(network.id.clone());
        list.push(network);
    }
    state.network_count += add_count;

    let removed_ids: Vec<String> = removed.iter().map(|network| network.id.clone()).collect();
    network_list::commit(cache, removed, list, state);
    debug!(
        "networks: removed [{}], added [{}], {} active",
        removed_ids.iter().join(", "),
        added.iter().join(", "),
        state.active_network_count,
    );

    Ok(match with_aliases {
        false => MessageBody::RegisterNetworks {
            removed: removed_ids,
            added,
        },
        true => MessageBody::RegisterNetworksAndAliases {
            removed: removed_ids,
            added,
        },
    })
}

fn change_permissions(
    input: &mut &[u8],
    cache: &mut StoreCache<'_>,
    state: &mut GlobalState,
    message_id: &str,
) -> Result<MessageBody, ExecError> {
    let address = Address::from_slice(take_bytes(input, 20)?);
    let valid_through = decode_u64(input)?;
    let old_permissions = decode_str_list(input)?;
    let new_permissions = decode_str_list(input)?;

    let entry = PermissionListEntry {
        id: message_id.to_owned(),
        address,
        valid_through,
        old_permissions,
        new_permissions,
    };
    cache.set(entry.id.clone(), Entity::PermissionListEntry(entry));
    state.permission_list.push(message_id.to_owned());

    Ok(MessageBody::ChangePermissions {
        entry: message_id.to_owned(),
    })
}

fn reset_state(state: &mut GlobalState, config: &IndexerConfig) -> Result<MessageBody, ExecError> {
    state.permission_list.clear();
    state.encoding_version = config.initial_encoding_version;
    Ok(MessageBody::ResetState)
}
