//! Utilities used in this crate which can also be generally useful downstream.

use alloc::vec::Vec;

use thiserror::Error;
// Re-export serialization traits from winter-utils
pub use winter_utils::{
    ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable, SliceReader,
};

pub mod zeroize {
    //! Re-exports of the secret-clearing traits used by key material.
    pub use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};
}

// LANE PACKING
// ================================================================================================

/// Defines errors which can occur while unpacking fixed-width lanes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaneError {
    #[error("expected {expected} packed bytes, found {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("unused high bits of the final packed byte must be zero")]
    NonZeroPadding,
}

/// Returns the number of bytes needed to store `count` lanes of `bits` bits each.
pub const fn packed_len(count: usize, bits: u32) -> usize {
    (count * bits as usize).div_ceil(8)
}

/// Appends `values` to `target` as consecutive little-endian bit lanes of `bits` bits.
///
/// Only the low `bits` bits of every value are written; callers are expected to pass values which
/// already fit.
pub fn pack_lanes(values: &[u32], bits: u32, target: &mut Vec<u8>) {
    debug_assert!((1..=32).contains(&bits));
    let mask = lane_mask(bits);
    let mut acc = 0_u64;
    let mut filled = 0_u32;

    target.reserve(packed_len(values.len(), bits));
    for &value in values {
        acc |= ((value as u64) & mask) << filled;
        filled += bits;
        while filled >= 8 {
            target.push(acc as u8);
            acc >>= 8;
            filled -= 8;
        }
    }
    if filled > 0 {
        target.push(acc as u8);
    }
}

/// Reads `count` lanes of `bits` bits each from `bytes`, which must have exactly the packed length.
///
/// Padding bits in the last byte must be zero so that every value has a single encoding.
pub fn unpack_lanes(bytes: &[u8], bits: u32, count: usize) -> Result<Vec<u32>, LaneError> {
    debug_assert!((1..=32).contains(&bits));
    let expected = packed_len(count, bits);
    if bytes.len() != expected {
        return Err(LaneError::InvalidLength { expected, actual: bytes.len() });
    }

    let mask = lane_mask(bits);
    let mut values = Vec::with_capacity(count);
    let mut acc = 0_u64;
    let mut filled = 0_u32;
    let mut bytes_iter = bytes.iter();

    while values.len() < count {
        while filled < bits {
            // the length check above guarantees enough input for `count` lanes
            let Some(&byte) = bytes_iter.next() else {
                return Err(LaneError::InvalidLength { expected, actual: bytes.len() });
            };
            acc |= (byte as u64) << filled;
            filled += 8;
        }
        values.push((acc & mask) as u32);
        acc >>= bits;
        filled -= bits;
    }

    if acc != 0 {
        return Err(LaneError::NonZeroPadding);
    }
    Ok(values)
}

fn lane_mask(bits: u32) -> u64 {
    (1_u64 << bits) - 1
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(2, 7, 2)]
    #[case(16, 3, 6)]
    #[case(17, 5, 11)]
    #[case(8, 4, 4)]
    fn packed_len_rounds_up(#[case] bits: u32, #[case] count: usize, #[case] expected: usize) {
        assert_eq!(packed_len(count, bits), expected);
    }

    #[test]
    fn seventeen_bit_lanes_have_known_layout() {
        let mut bytes = Vec::new();
        pack_lanes(&[0x1_ffff, 1], 17, &mut bytes);
        assert_eq!(bytes, [0xff, 0xff, 0x03, 0x00, 0x00]);
        assert_eq!(unpack_lanes(&bytes, 17, 2).unwrap(), [0x1_ffff, 1]);
    }

    #[test]
    fn unpacking_rejects_dirty_padding_and_bad_lengths() {
        assert_eq!(unpack_lanes(&[0b0100_0000], 2, 3), Err(LaneError::NonZeroPadding));
        assert_eq!(
            unpack_lanes(&[0, 0], 2, 3),
            Err(LaneError::InvalidLength { expected: 1, actual: 2 })
        );
    }

    proptest! {
        #[test]
        fn lanes_survive_a_round_trip(bits in 1_u32..=32, raw in prop::collection::vec(any::<u32>(), 0..64)) {
            let mask = lane_mask(bits) as u32;
            let values: Vec<u32> = raw.iter().map(|v| v & mask).collect();
            let mut bytes = Vec::new();
            pack_lanes(&values, bits, &mut bytes);
            prop_assert_eq!(bytes.len(), packed_len(values.len(), bits));
            prop_assert_eq!(unpack_lanes(&bytes, bits, values.len()).unwrap(), values);
        }
    }
}
