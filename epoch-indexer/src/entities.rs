//! The persisted entity model.
//!
//! Every entity is keyed by a string id; the id formats are part of the
//! public query contract and are kept stable by the helpers at the
//! bottom of this module.

use enum_as_inner::EnumAsInner;
use ethereum_types::{Address, H256};
use serde::{Deserialize, Serialize};

/// Id of the canonical [`GlobalState`] singleton.
pub const GLOBAL_STATE_ID: &str = "0";

/// The entity namespaces the store is partitioned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// [`GlobalState`]
    GlobalState,
    /// [`Network`]
    Network,
    /// [`Epoch`]
    Epoch,
    /// [`NetworkEpochBlockNumber`]
    NetworkEpochBlockNumber,
    /// [`Payload`]
    Payload,
    /// [`MessageBlock`]
    MessageBlock,
    /// [`MessageRecord`]
    Message,
    /// [`PermissionListEntry`]
    PermissionListEntry,
}

/// Any persisted entity, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// [`GlobalState`]
    GlobalState(GlobalState),
    /// [`Network`]
    Network(Network),
    /// [`Epoch`]
    Epoch(Epoch),
    /// [`NetworkEpochBlockNumber`]
    BlockNumber(NetworkEpochBlockNumber),
    /// [`Payload`]
    Payload(Payload),
    /// [`MessageBlock`]
    MessageBlock(MessageBlock),
    /// [`MessageRecord`]
    Message(MessageRecord),
    /// [`PermissionListEntry`]
    PermissionListEntry(PermissionListEntry),
}

impl Entity {
    /// The namespace this entity lives in.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::GlobalState(_) => EntityKind::GlobalState,
            Entity::Network(_) => EntityKind::Network,
            Entity::Epoch(_) => EntityKind::Epoch,
            Entity::BlockNumber(_) => EntityKind::NetworkEpochBlockNumber,
            Entity::Payload(_) => EntityKind::Payload,
            Entity::MessageBlock(_) => EntityKind::MessageBlock,
            Entity::Message(_) => EntityKind::Message,
            Entity::PermissionListEntry(_) => EntityKind::PermissionListEntry,
        }
    }
}

/// The singleton oracle state, stored under [`GLOBAL_STATE_ID`].
///
/// Mutated only by message executors, and only promoted to the store
/// when the whole invocation succeeds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Entity id; always [`GLOBAL_STATE_ID`].
    pub id: String,
    /// Networks ever registered. Never decreases; feeds the legacy
    /// ordinal identity scheme.
    pub network_count: u64,
    /// Networks currently tracked. Always equals the length of the
    /// linked list hanging off `network_array_head`.
    pub active_network_count: u64,
    /// Head of the active-network list, threaded through
    /// [`Network::next_array_element`].
    pub network_array_head: Option<String>,
    /// Number of the most recently opened epoch.
    pub latest_valid_epoch: Option<u64>,
    /// Payload encoding version; bumped by UpdateVersions messages.
    pub encoding_version: u64,
    /// Ids of the [`PermissionListEntry`] records currently in force.
    pub permission_list: Vec<String>,
}

/// One tracked network.
///
/// Active networks form a singly-linked list starting at
/// [`GlobalState::network_array_head`]; the list fields are cleared
/// when the network is removed, but the entity itself persists forever.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Entity id: the chain id, or the registration ordinal under the
    /// legacy identity scheme.
    pub id: String,
    /// The network's chain id as decoded off the wire.
    pub chain_id: String,
    /// Optional human-readable alias.
    pub alias: Option<String>,
    /// Id of the message that registered this network.
    pub added_at: String,
    /// Id of the message that last touched this network.
    pub last_updated_at: String,
    /// Id of the message that removed this network, if any.
    pub removed_at: Option<String>,
    /// Next node in the active list; `None` for the tail and for
    /// removed networks.
    pub next_array_element: Option<String>,
    /// Position in the active list; `None` for removed networks.
    pub array_index: Option<u32>,
    /// Back-reference to the owning [`GlobalState`] while active.
    pub state: Option<String>,
    /// Id of this network's most recent [`NetworkEpochBlockNumber`].
    pub latest_valid_block_number: Option<String>,
}

/// One epoch, created the first time block numbers are posted for it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    /// Entity id: the epoch number in decimal.
    pub id: String,
    /// The epoch number; epochs start at 1.
    pub epoch_number: u64,
}

/// The block-number sample of one network at one epoch.
///
/// Only the acceleration travels on the wire; delta and block number
/// are the running first and zeroth derivatives, accumulated from the
/// previous epoch's sample.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkEpochBlockNumber {
    /// Entity id: `"{epoch}-{network}"`.
    pub id: String,
    /// Signed second-derivative as decoded off the wire.
    pub acceleration: i64,
    /// `previous.delta + acceleration`, or just the acceleration for a
    /// network's first sample.
    pub delta: i128,
    /// `previous.block_number + delta`, or just the delta for a
    /// network's first sample.
    pub block_number: i128,
    /// The epoch this sample belongs to.
    pub epoch_number: u64,
    /// Id of the owning [`Network`].
    pub network: String,
    /// Id of the owning [`Epoch`].
    pub epoch: String,
    /// Id of the previous epoch's sample for the same network, when one
    /// exists.
    pub previous_block_number: Option<String>,
}

/// Audit record of one invocation's raw payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Entity id: the `0x`-prefixed transaction hash.
    pub id: String,
    /// The full payload bytes as submitted.
    #[serde(with = "crate::hex")]
    pub data: Vec<u8>,
    /// Address that submitted the call.
    pub submitter: Address,
    /// Whether the payload decoded and executed fully.
    pub valid: bool,
    /// Block number of the call.
    pub created_at: u64,
    /// Failure kind, for invalid payloads.
    pub error_message: Option<String>,
}

/// Audit record of one message block: a preamble word plus the bodies
/// decoded under it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBlock {
    /// Entity id: `"{payload}-{blockIndex}"`.
    pub id: String,
    /// The consumed slice, preamble included.
    #[serde(with = "crate::hex")]
    pub data: Vec<u8>,
    /// Id of the owning [`Payload`].
    pub payload: String,
}

/// Audit record of one decoded message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Entity id: `"{block}-{msgIndex}"`.
    pub id: String,
    /// Id of the owning [`MessageBlock`].
    pub block: String,
    /// The slice this message consumed.
    #[serde(with = "crate::hex")]
    pub data: Vec<u8>,
    /// The decoded form.
    pub body: MessageBody,
}

/// Decoded form of one message, by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    /// Opened an epoch (or recorded nothing, when no networks were
    /// active).
    SetBlockNumbersForEpoch {
        /// Merkle root of the epoch's block-hash batch; `None` when the
        /// active set was empty.
        merkle_root: Option<H256>,
        /// One acceleration per active network, in list order.
        accelerations: Vec<i64>,
    },
    /// Reserved no-op.
    CorrectEpochs,
    /// Bumped the encoding version.
    UpdateVersions {
        /// Version before this message.
        old_version: u64,
        /// Version after this message.
        new_version: u64,
    },
    /// Removed and/or added tracked networks.
    RegisterNetworks {
        /// Ids of the networks removed, in removal order.
        removed: Vec<String>,
        /// Ids of the networks added, in wire order.
        added: Vec<String>,
    },
    /// Removed and/or added tracked networks, with aliases.
    RegisterNetworksAndAliases {
        /// Ids of the networks removed, in removal order.
        removed: Vec<String>,
        /// Ids of the networks added, in wire order.
        added: Vec<String>,
    },
    /// Rotated the permission list.
    ChangePermissions {
        /// Id of the [`PermissionListEntry`] this message appended.
        entry: String,
    },
    /// Cleared permissions and reset the encoding version.
    ResetState,
}

/// One permission-list rotation, kept for audit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionListEntry {
    /// Entity id: the id of the ChangePermissions message.
    pub id: String,
    /// The submitter the permissions apply to.
    pub address: Address,
    /// Last block the new permissions are valid for.
    pub valid_through: u64,
    /// Permissions replaced by this rotation.
    pub old_permissions: Vec<String>,
    /// Permissions in force after this rotation.
    pub new_permissions: Vec<String>,
}

/// Id of a [`Payload`]: the `0x`-prefixed transaction hash.
pub fn payload_id(tx_hash: H256) -> String {
    format!("{tx_hash:?}")
}

/// Id of a [`MessageBlock`]: payload id plus block index.
pub fn message_block_id(payload: &str, index: usize) -> String {
    format!("{payload}-{index}")
}

/// Id of a [`MessageRecord`]: block id plus message index.
pub fn message_id(block: &str, index: usize) -> String {
    format!("{block}-{index}")
}

/// Id of an [`Epoch`]: the epoch number in decimal.
pub fn epoch_id(number: u64) -> String {
    number.to_string()
}

/// Id of a [`NetworkEpochBlockNumber`].
pub fn block_number_id(epoch: u64, network: &str) -> String {
    format!("{epoch}-{network}")
}
