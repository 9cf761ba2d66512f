//! Variable-length encoding of the transmitted signature vector.
//!
//! Every coefficient `x` is split into `low = |x| mod 2^KEEP_BITS`, its sign, and
//! `high = |x| >> KEEP_BITS`. The low bits and the sign are written verbatim as
//! `KEEP_BITS + 1`-bit lanes into a block of fixed size; the high parts, which are small and
//! heavily skewed towards zero, go through a static rANS coder. The payload is the raw block
//! followed by the rANS stream.

use alloc::vec::Vec;

use self::rans::RansTable;
use super::{EncodingError, ParameterSet};
use crate::utils::{LaneError, pack_lanes, unpack_lanes};

mod rans;

/// Compresses the `N + M` transmitted coefficients of a signature.
///
/// # Errors
/// Returns an error if the number of coefficients is wrong or if some `|x| >> KEEP_BITS` falls
/// outside the alphabet of `P`.
pub fn compress<P: ParameterSet>(coefficients: &[i64]) -> Result<Vec<u8>, EncodingError> {
    if coefficients.len() != P::SIG_LEN {
        return Err(EncodingError::InvalidLength {
            expected: P::SIG_LEN,
            actual: coefficients.len(),
        });
    }

    let low_mask = (1_u64 << P::KEEP_BITS) - 1;
    let mut lanes = Vec::with_capacity(P::SIG_LEN);
    let mut highs = Vec::with_capacity(P::SIG_LEN);
    for &x in coefficients {
        let magnitude = x.unsigned_abs();
        let high = magnitude >> P::KEEP_BITS;
        if high >= P::ALPHABET as u64 {
            return Err(EncodingError::OutOfRange { value: x });
        }
        let sign = (x < 0) as u32;
        lanes.push((magnitude & low_mask) as u32 | sign << P::KEEP_BITS);
        highs.push(high as u32);
    }

    let mut payload = Vec::with_capacity(P::RAW_BYTES + P::SIG_LEN / 2);
    pack_lanes(&lanes, P::KEEP_BITS + 1, &mut payload);
    payload.extend_from_slice(&rans::encode(&highs, &RansTable::new(P::FREQUENCIES)));
    Ok(payload)
}

/// Recovers the `N + M` coefficients from a payload produced by [compress].
///
/// Every coefficient vector has exactly one encoding: negative zeros, unread bytes and
/// non-canonical coder states are all rejected.
pub fn decompress<P: ParameterSet>(payload: &[u8]) -> Result<Vec<i64>, EncodingError> {
    if payload.len() < P::RAW_BYTES {
        return Err(EncodingError::Truncated);
    }
    let (raw, stream) = payload.split_at(P::RAW_BYTES);

    let lanes = unpack_lanes(raw, P::KEEP_BITS + 1, P::SIG_LEN).map_err(|err| match err {
        LaneError::InvalidLength { .. } => EncodingError::Truncated,
        LaneError::NonZeroPadding => EncodingError::NonZeroPadding,
    })?;
    let highs = rans::decode(stream, P::SIG_LEN, &RansTable::new(P::FREQUENCIES))?;

    let low_mask = (1_u32 << P::KEEP_BITS) - 1;
    lanes
        .iter()
        .zip(&highs)
        .map(|(&lane, &high)| {
            let magnitude = ((high as i64) << P::KEEP_BITS) | (lane & low_mask) as i64;
            let negative = (lane >> P::KEEP_BITS) & 1 == 1;
            match (magnitude, negative) {
                (0, true) => Err(EncodingError::NegativeZero),
                (m, true) => Ok(-m),
                (m, false) => Ok(m),
            }
        })
        .collect()
}

// TESTS
// ================================================================================================
