//! Fixed-width encoding for 32-bit shard keys.
//!
//! A canonical RLP integer drops leading zero bytes, so its width depends on
//! the value. Shard keys are instead always written as the tag byte followed
//! by four big-endian bytes, which lets the ledger skip the field by a
//! constant offset. The tag is the RLP header of a 4-byte string, so generic
//! RLP readers still see a well-formed item.

use thiserror::Error;

use crate::config::{FIXED_WIDTH_LEN, FIXED_WIDTH_TAG};

/// Errors produced while decoding a fixed-width field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedWidthError {
    #[error("fixed-width field is {actual} bytes, expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("fixed-width field starts with 0x{actual:02x}, expected tag 0x{expected:02x}")]
    WrongTag { expected: u8, actual: u8 },
}

/// Encodes `value` as `[tag, b3, b2, b1, b0]`.
pub fn encode_fixed_u32(value: u32) -> [u8; FIXED_WIDTH_LEN] {
    let mut out = [0u8; FIXED_WIDTH_LEN];
    out[0] = FIXED_WIDTH_TAG;
    out[1..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Decodes a field produced by [`encode_fixed_u32`].
///
/// The length is checked before the tag.
pub fn decode_fixed_u32(data: &[u8]) -> Result<u32, FixedWidthError> {
    if data.len() != FIXED_WIDTH_LEN {
        return Err(FixedWidthError::WrongLength {
            expected: FIXED_WIDTH_LEN,
            actual: data.len(),
        });
    }
    if data[0] != FIXED_WIDTH_TAG {
        return Err(FixedWidthError::WrongTag {
            expected: FIXED_WIDTH_TAG,
            actual: data[0],
        });
    }
    let mut be = [0u8; 4];
    be.copy_from_slice(&data[1..]);
    Ok(u32::from_be_bytes(be))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_value_roundtrips(v in any::<u32>()) {
            let bytes = encode_fixed_u32(v);
            prop_assert_eq!(bytes.len(), FIXED_WIDTH_LEN);
            prop_assert_eq!(bytes[0], FIXED_WIDTH_TAG);
            prop_assert_eq!(decode_fixed_u32(&bytes), Ok(v));
        }

        #[test]
        fn any_other_tag_is_rejected(tag in any::<u8>(), body in any::<[u8; 4]>()) {
            prop_assume!(tag != FIXED_WIDTH_TAG);
            let mut bytes = vec![tag];
            bytes.extend_from_slice(&body);
            prop_assert_eq!(
                decode_fixed_u32(&bytes),
                Err(FixedWidthError::WrongTag { expected: FIXED_WIDTH_TAG, actual: tag })
            );
        }

        #[test]
        fn any_other_length_is_rejected(data in proptest::collection::vec(any::<u8>(), 0..16)) {
            prop_assume!(data.len() != FIXED_WIDTH_LEN);
            let is_wrong_length = matches!(
                decode_fixed_u32(&data),
                Err(FixedWidthError::WrongLength { expected: 5, .. })
            );
            prop_assert!(is_wrong_length);
        }
    }

    #[test]
    fn encodes_default_shard_key() {
        assert_eq!(encode_fixed_u32(262_145), [0x84, 0x00, 0x04, 0x00, 0x01]);
    }

    #[test]
    fn zero_keeps_full_width() {
        assert_eq!(encode_fixed_u32(0), [0x84, 0, 0, 0, 0]);
    }

    #[test]
    fn decodes_boundary_values() {
        for v in [0u32, 1, 0x7f, 0x80, 0xffff, 0x1_0000, u32::MAX - 1, u32::MAX] {
            assert_eq!(decode_fixed_u32(&encode_fixed_u32(v)), Ok(v));
        }
    }

    #[test]
    fn wrong_tag_is_reported() {
        let err = decode_fixed_u32(&[0x83, 0, 4, 0, 1]).unwrap_err();
        assert_eq!(
            err,
            FixedWidthError::WrongTag {
                expected: 0x84,
                actual: 0x83
            }
        );
    }

    #[test]
    fn wrong_length_is_reported_before_tag() {
        assert_eq!(
            decode_fixed_u32(&[0x00, 1, 2]).unwrap_err(),
            FixedWidthError::WrongLength {
                expected: 5,
                actual: 3
            }
        );
        assert!(matches!(
            decode_fixed_u32(&[0x84, 0, 0, 0, 0, 0]),
            Err(FixedWidthError::WrongLength { actual: 6, .. })
        ));
        assert!(matches!(
            decode_fixed_u32(&[]),
            Err(FixedWidthError::WrongLength { actual: 0, .. })
        ));
    }
}
