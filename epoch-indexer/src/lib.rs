//! The _Cross-Chain Epoch Oracle_ posts opaque calldata payloads to a
//! single on-chain entry point. This crate decodes those payloads and
//! derives, deterministically, the replicated oracle state: the set of
//! tracked networks, their per-epoch block-number progressions, and an
//! ordered audit log of every decoded message.
//!
//! One call to [`entrypoint`] processes one on-chain invocation.
//! Conforming implementations fed the same byte stream must arrive at
//! the same entity state, so everything here is driven purely by the
//! payload and the store contents; there are no clocks and no
//! environment reads.
//!
//! The collaborators are deliberately thin seams:
//! - an [`EntityStore`] (load/save by kind and id),
//! - a caller-supplied event feed producing [`CallEvent`]s in on-chain
//!   order,
//! - the `log` facade.
//!
//! # Non-goals
//! - Consensus with other decoders, or any network I/O.
//! - Signature validation; the chain already ordered and attributed the
//!   calls.
//! - Concurrency: invocations are processed strictly one at a time.

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]

mod core;
mod entities;
mod exec;
mod interface;
mod network_list;
mod store;

pub mod testing;

pub use core::{entrypoint, payload_from_calldata};
pub use entities::*;
pub use exec::{ExecError, InvariantViolation};
pub use interface::*;
pub use store::StoreCache;

/// Like `#[serde(with = "hex")]`, but tolerates and emits leading `0x`
/// prefixes.
mod hex {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer, T>(data: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: hex::ToHex,
    {
        let s = data.encode_hex::<String>();
        serializer.serialize_str(&format!("0x{}", s))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T>(deserializer: D) -> Result<T, D::Error>
    where
        T: hex::FromHex,
        T::Error: std::fmt::Display,
    {
        let s = String::deserialize(deserializer)?;
        match s.strip_prefix("0x") {
            Some(rest) => T::from_hex(rest),
            None => T::from_hex(&*s),
        }
        .map_err(D::Error::custom)
    }
}
