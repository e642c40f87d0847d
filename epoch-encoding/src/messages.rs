//! The oracle message vocabulary.

use ethereum_types::{Address, H256};
use u4::U4;

/// Message kinds, as they appear in preamble tag slots.
///
/// Nibbles outside this set belong to encoders this revision does not
/// know about and terminate the surrounding message block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Open the next epoch and post one acceleration per active network.
    SetBlockNumbers = 0,
    /// Reserved for retroactive epoch corrections; currently empty.
    CorrectEpochs = 1,
    /// Bump the payload encoding version.
    UpdateVersions = 2,
    /// Remove and/or add tracked networks.
    RegisterNetworks = 3,
    /// Like [`Tag::RegisterNetworks`], with a human-readable alias per
    /// addition.
    RegisterNetworksAndAliases = 4,
    /// Rotate the submitter permission list.
    ChangePermissions = 5,
    /// Clear permissions and reset the encoding version.
    ResetState = 6,
}

impl Tag {
    /// Maps a preamble nibble to a tag, `None` for unknown nibbles.
    pub fn from_nibble(nibble: U4) -> Option<Self> {
        Some(match nibble as u8 {
            0 => Self::SetBlockNumbers,
            1 => Self::CorrectEpochs,
            2 => Self::UpdateVersions,
            3 => Self::RegisterNetworks,
            4 => Self::RegisterNetworksAndAliases,
            5 => Self::ChangePermissions,
            6 => Self::ResetState,
            _ => return None,
        })
    }

    /// The preamble nibble for this tag.
    pub fn nibble(self) -> U4 {
        U4::new(self as u8).expect("tags fit in four bits")
    }
}

/// One oracle message, in encoder form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// See [`SetBlockNumbers`].
    SetBlockNumbers(SetBlockNumbers),
    /// Reserved; carries no body.
    CorrectEpochs,
    /// Bump the encoding version. Must be strictly increasing.
    UpdateVersions {
        /// The new version.
        version: u64,
    },
    /// Remove networks by active-list index, then add networks by chain
    /// id.
    RegisterNetworks {
        /// Indices into the active list, applied in order with
        /// swap-and-pop semantics.
        remove: Vec<u64>,
        /// Chain ids to start tracking.
        add: Vec<String>,
    },
    /// Like [`Message::RegisterNetworks`], with an alias per addition.
    RegisterNetworksAndAliases {
        /// Indices into the active list, applied in order with
        /// swap-and-pop semantics.
        remove: Vec<u64>,
        /// `(chain_id, alias)` pairs to start tracking.
        add: Vec<(String, String)>,
    },
    /// Rotate the permission list for a submitter address.
    ChangePermissions {
        /// The submitter the permissions apply to.
        address: Address,
        /// Last block the new permissions are valid for.
        valid_through: u64,
        /// Permissions being replaced.
        old_permissions: Vec<String>,
        /// Permissions now in force.
        new_permissions: Vec<String>,
    },
    /// Clear the permission list and reset the encoding version.
    ResetState,
}

/// Body of a [`Tag::SetBlockNumbers`] message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetBlockNumbers {
    /// No networks are tracked; the message carries no body at all.
    Empty,
    /// One acceleration per active network, in list order, plus the
    /// merkle root of the off-chain block-hash batch.
    NonEmpty {
        /// Merkle root of the epoch's block-hash batch.
        root: H256,
        /// Signed second-derivatives of each network's block numbers.
        accelerations: nunny::Vec<i64>,
    },
}

impl Message {
    /// The preamble tag this message encodes under.
    pub fn tag(&self) -> Tag {
        match self {
            Message::SetBlockNumbers(_) => Tag::SetBlockNumbers,
            Message::CorrectEpochs => Tag::CorrectEpochs,
            Message::UpdateVersions { .. } => Tag::UpdateVersions,
            Message::RegisterNetworks { .. } => Tag::RegisterNetworks,
            Message::RegisterNetworksAndAliases { .. } => Tag::RegisterNetworksAndAliases,
            Message::ChangePermissions { .. } => Tag::ChangePermissions,
            Message::ResetState => Tag::ResetState,
        }
    }
}
