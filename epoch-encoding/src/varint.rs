//! Prefix-varint integers and the ZigZag signed wrapper.
//!
//! The first byte of an encoded integer announces the total encoded
//! length through its trailing zero bits: `L = min(ctz, 8) + 1` bytes.
//! A decoder therefore never has to probe past the first byte to know
//! how much input it needs, unlike LEB128-style continuation bits.
//!
//! All decoders take the input as `&mut &[u8]` and advance it by
//! reslicing; they return a structured [`DecodeError`] instead of an
//! in-band sentinel, so a legitimate zero is never confusable with a
//! failure.

use thiserror::Error;

/// A wire-level decoding failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended while more bytes were expected.
    #[error("unexpected end of input (wanted {wanted} bytes, {have} available)")]
    UnexpectedEof {
        /// How many bytes the current field needed.
        wanted: usize,
        /// How many bytes were left.
        have: usize,
    },
}

/// Decodes one prefix-varint `u64`, advancing `input` past it.
pub fn decode_u64(input: &mut &[u8]) -> Result<u64, DecodeError> {
    let &first = input.first().ok_or(DecodeError::UnexpectedEof { wanted: 1, have: 0 })?;
    let len = (first.trailing_zeros() as usize).min(8) + 1;
    if input.len() < len {
        return Err(DecodeError::UnexpectedEof {
            wanted: len,
            have: input.len(),
        });
    }
    let (head, rest) = input.split_at(len);
    let value = match len {
        1 => u64::from(first >> 1),
        9 => {
            let mut bytes = [0; 8];
            bytes.copy_from_slice(&head[1..]);
            u64::from_le_bytes(bytes)
        }
        _ => {
            // The low `len` bits of the first byte are the length
            // prefix; the value starts at bit `len`.
            let mut bytes = [0; 8];
            bytes[..len - 1].copy_from_slice(&head[1..]);
            (u64::from(first) >> len) | (u64::from_le_bytes(bytes) << (8 - len))
        }
    };
    *input = rest;
    Ok(value)
}

/// Appends the prefix-varint encoding of `value` to `out`.
///
/// Byte-exact inverse of [`decode_u64`]: the shortest length whose
/// `7 * L` payload bits fit the value, or the 9-byte escape
/// (`0x00` + 8 little-endian bytes) for values above `2^56 - 1`.
pub fn encode_u64(value: u64, out: &mut Vec<u8>) {
    let len = match (1usize..=8).find(|l| value < 1 << (7 * l)) {
        Some(len) => len,
        None => {
            out.push(0x00);
            out.extend_from_slice(&value.to_le_bytes());
            return;
        }
    };
    out.push((value << len) as u8 | 1 << (len - 1));
    out.extend_from_slice(&(value >> (8 - len)).to_le_bytes()[..len - 1]);
}

/// Decodes one ZigZag-mapped signed varint.
pub fn decode_i64(input: &mut &[u8]) -> Result<i64, DecodeError> {
    decode_u64(input).map(zigzag_decode)
}

/// Appends the ZigZag-mapped encoding of `value` to `out`.
pub fn encode_i64(value: i64, out: &mut Vec<u8>) {
    encode_u64(zigzag_encode(value), out)
}

/// Maps a signed value to an unsigned one so that small magnitudes of
/// either sign stay small: `0, -1, 1, -2, … → 0, 1, 2, 3, …`.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Takes exactly `n` bytes off the front of `input`.
pub fn take_bytes<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof {
            wanted: n,
            have: input.len(),
        });
    }
    let (head, rest) = input.split_at(n);
    *input = rest;
    Ok(head)
}

/// Decodes one length-prefixed string.
///
/// The bytes are assumed to be UTF-8; malformed sequences are passed
/// through lossily rather than rejected.
pub fn decode_str(input: &mut &[u8]) -> Result<String, DecodeError> {
    let len = decode_u64(input)? as usize;
    Ok(String::from_utf8_lossy(take_bytes(input, len)?).into_owned())
}

/// Decodes a count-prefixed list of length-prefixed strings.
pub fn decode_str_list(input: &mut &[u8]) -> Result<Vec<String>, DecodeError> {
    let count = decode_u64(input)?;
    (0..count).map(|_| decode_str(input)).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn decode_all(mut bytes: &[u8]) -> (Result<u64, DecodeError>, usize) {
        let before = bytes.len();
        let result = decode_u64(&mut bytes);
        (result, before - bytes.len())
    }

    #[rstest]
    #[case(0, &[0x01])]
    #[case(1, &[0x03])]
    #[case(2, &[0x05])]
    #[case(3, &[0x07])]
    #[case(10, &[0x15])]
    #[case(127, &[0xFF])]
    #[case(128, &[0x02, 0x02])]
    fn known_vectors(#[case] value: u64, #[case] encoded: &[u8]) {
        let mut out = Vec::new();
        encode_u64(value, &mut out);
        assert_eq!(out, encoded);
        assert_eq!(decode_all(encoded), (Ok(value), encoded.len()));
    }

    #[test]
    fn length_boundaries() {
        // Each length L covers exactly 7 * L bits; the 9-byte escape
        // covers the rest of the u64 range.
        for l in 1..=8usize {
            let max = (1u128 << (7 * l)) - 1;
            for value in [max as u64, (max / 2 + 1) as u64] {
                let mut out = Vec::new();
                encode_u64(value, &mut out);
                assert_eq!(out.len(), l, "value {value:#x}");
                assert_eq!(decode_all(&out), (Ok(value), l));
            }
        }
        let mut out = Vec::new();
        encode_u64(1 << 56, &mut out);
        assert_eq!(out.len(), 9);
        assert_eq!(out[0], 0x00);
        assert_eq!(decode_all(&out), (Ok(1 << 56), 9));
    }

    #[test]
    fn truncated_input_does_not_advance() {
        // First byte promises 2 bytes, only 1 present.
        let mut input: &[u8] = &[0x02];
        assert_eq!(
            decode_u64(&mut input),
            Err(DecodeError::UnexpectedEof { wanted: 2, have: 1 })
        );
        assert_eq!(input, &[0x02]);

        let mut empty: &[u8] = &[];
        assert_eq!(
            decode_u64(&mut empty),
            Err(DecodeError::UnexpectedEof { wanted: 1, have: 0 })
        );
    }

    #[rstest]
    #[case(0, 0)]
    #[case(-1, 1)]
    #[case(1, 2)]
    #[case(-2, 3)]
    #[case(2, 4)]
    #[case(i64::MAX, u64::MAX - 1)]
    #[case(i64::MIN, u64::MAX)]
    fn zigzag_vectors(#[case] signed: i64, #[case] unsigned: u64) {
        assert_eq!(zigzag_encode(signed), unsigned);
        assert_eq!(zigzag_decode(unsigned), signed);
    }

    #[test]
    fn strings_pass_malformed_utf8_through() {
        let mut input: &[u8] = &[0x07, 0xFF, b'o', b'k'];
        let decoded = decode_str(&mut input).unwrap();
        assert!(decoded.ends_with("ok"));
        assert!(input.is_empty());
    }

    proptest! {
        #[test]
        fn u64_round_trips(value in any::<u64>()) {
            let mut out = Vec::new();
            encode_u64(value, &mut out);
            prop_assert!((1..=9).contains(&out.len()));
            prop_assert_eq!(decode_all(&out), (Ok(value), out.len()));
        }

        #[test]
        fn i64_round_trips(value in any::<i64>()) {
            let mut out = Vec::new();
            encode_i64(value, &mut out);
            let mut input = out.as_slice();
            prop_assert_eq!(decode_i64(&mut input), Ok(value));
            prop_assert!(input.is_empty());
        }

        #[test]
        fn decoding_never_reads_past_declared_length(bytes in proptest::collection::vec(any::<u8>(), 0..12)) {
            let mut input = bytes.as_slice();
            if decode_u64(&mut input).is_ok() {
                let consumed = bytes.len() - input.len();
                let declared = (bytes[0].trailing_zeros() as usize).min(8) + 1;
                prop_assert_eq!(consumed, declared);
            } else {
                prop_assert_eq!(input, bytes.as_slice());
            }
        }
    }
}
