//! Public types for the collaborator seams: the inbound call shape,
//! the entity store, and driver configuration.

use ethereum_types::{Address, H256};
use serde::{Deserialize, Serialize};

use crate::entities::{Entity, EntityKind};

/// One decoded call to the oracle contract's entry point.
///
/// The event source is expected to deliver these in on-chain order;
/// that order is the total order on derived state.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CallEvent {
    /// Transaction hash. Keys the [`crate::Payload`] audit entity.
    pub tx_hash: H256,
    /// Address that submitted the call.
    pub submitter: Address,
    /// The opaque payload bytes.
    #[serde(with = "crate::hex")]
    pub payload: Vec<u8>,
    /// Block the call was mined in.
    pub block_number: u64,
}

/// A failure inside the backing entity store.
///
/// Always fatal for the invocation: nothing is committed and nothing is
/// recorded, the caller decides whether to retry the event.
#[derive(Debug, thiserror::Error)]
#[error("entity store failure: {0}")]
pub struct StoreError(#[from] pub anyhow::Error);

/// Load/save access to the backing store, by entity kind and string id.
///
/// Implementations only need point lookups; scans and secondary indexes
/// live behind the external query layer, which reads whatever this
/// store persists.
pub trait EntityStore {
    /// Fetches the entity stored under `id`, `None` when absent.
    fn load(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>, StoreError>;

    /// Writes `entity` under `id`, overwriting any previous value.
    fn save(&mut self, id: String, entity: Entity) -> Result<(), StoreError>;
}

/// How newly registered networks are keyed in the store.
///
/// Two revisions of the on-chain encoder disagreed here, so the choice
/// is surfaced as configuration instead of being hardcoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NetworkIdentity {
    /// Key networks by their chain id string (`"eip155:1"`, `"gno"`, …).
    #[default]
    ChainId,
    /// Key networks by the running registration counter, as the legacy
    /// encoder revision did. The chain id is still kept on the entity.
    Ordinal,
}

/// Driver configuration for one indexer deployment.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndexerConfig {
    /// Identity scheme for newly registered networks.
    pub network_identity: NetworkIdentity,
    /// The version the oracle state starts at and returns to on a
    /// reset message.
    pub initial_encoding_version: u64,
}

/// What one invocation did, for the caller's logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationReceipt {
    /// Whether the payload decoded and executed fully.
    pub valid: bool,
    /// Messages executed and recorded. Zero for failed invocations:
    /// nothing but the payload record survives a rollback.
    pub messages: usize,
    /// Failure kind when `valid` is false.
    pub error_message: Option<String>,
}
