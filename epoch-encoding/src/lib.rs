//! Wire format for the Cross-Chain Epoch Oracle.
//!
//! Oracle payloads are sequences of _message blocks_: an 8-byte
//! preamble word carrying up to 16 four-bit message tags, followed by
//! the body of each tagged message. Integers travel as prefix-varints
//! (see [`varint`]), signed values through the ZigZag mapping, and
//! strings length-prefixed.
//!
//! This crate owns both directions of the format:
//! - the decoding primitives that the indexer drives one field at a
//!   time (message bodies can only be framed against live oracle state,
//!   so there is deliberately no standalone payload parser), and
//! - a complete [`encode_messages`], used by local harnesses and
//!   round-trip tests to produce payloads an indexer will accept.

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]

pub mod varint;

mod encode;
mod messages;
mod preamble;

pub use encode::encode_messages;
pub use messages::{Message, SetBlockNumbers, Tag};
pub use preamble::{Preamble, PREAMBLE_BITS, PREAMBLE_BYTES, TAGS_PER_PREAMBLE, TAG_BITS};
pub use varint::DecodeError;
