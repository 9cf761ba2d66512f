//! Byte-oriented rANS over a static frequency table.
//!
//! The coder state is a `u32` kept in `[L, 256 * L)` with `L = 2^23`. Symbols are encoded in
//! reverse so that the decoder reads them front to back; the encoder's final state is emitted
//! first, little-endian.

use alloc::vec::Vec;

use crate::dsa::hufu::{EncodingError, RANS_SCALE_BITS};

/// Lower end of the normalized state interval.
pub(super) const RANS_LOWER_BOUND: u32 = 1 << 23;

const SCALE_MASK: u32 = (1 << RANS_SCALE_BITS) - 1;

// FREQUENCY TABLE
// ================================================================================================

/// A static table with its cumulative frequencies.
pub(super) struct RansTable {
    frequencies: &'static [u16],
    cumulative: Vec<u32>,
}

impl RansTable {
    pub(super) fn new(frequencies: &'static [u16]) -> Self {
        let mut cumulative = Vec::with_capacity(frequencies.len() + 1);
        let mut total = 0_u32;
        cumulative.push(total);
        for &f in frequencies {
            total += f as u32;
            cumulative.push(total);
        }
        debug_assert!(total <= 1 << RANS_SCALE_BITS);
        Self { frequencies, cumulative }
    }

    /// Number of symbols in the table.
    pub(super) fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Returns the symbol whose cumulative range contains `slot`, if any.
    fn symbol(&self, slot: u32) -> Option<usize> {
        // `cumulative[0] = 0 <= slot`, so the partition point is at least one
        let symbol = self.cumulative.partition_point(|&c| c <= slot) - 1;
        (symbol < self.len()).then_some(symbol)
    }
}

// ENCODER
// ================================================================================================

/// Encodes `symbols`, each smaller than `table.len()`.
pub(super) fn encode(symbols: &[u32], table: &RansTable) -> Vec<u8> {
    // bytes are produced back to front and reversed once at the end
    let mut out = Vec::with_capacity(symbols.len() / 2 + 4);
    let mut x = RANS_LOWER_BOUND;

    for &s in symbols.iter().rev() {
        let s = s as usize;
        debug_assert!(s < table.len());
        let freq = table.frequencies[s] as u32;
        let start = table.cumulative[s];

        let x_max = ((RANS_LOWER_BOUND >> RANS_SCALE_BITS) << 8) * freq;
        while x >= x_max {
            out.push(x as u8);
            x >>= 8;
        }
        x = ((x / freq) << RANS_SCALE_BITS) + (x % freq) + start;
    }

    out.extend_from_slice(&x.to_be_bytes());
    out.reverse();
    out
}

// DECODER
// ================================================================================================

/// Decodes exactly `count` symbols from `bytes`, which must be consumed entirely.
pub(super) fn decode(
    bytes: &[u8],
    count: usize,
    table: &RansTable,
) -> Result<Vec<u32>, EncodingError> {
    let (head, mut rest) = bytes.split_first_chunk::<4>().ok_or(EncodingError::Truncated)?;
    let mut x = u32::from_le_bytes(*head);
    if !(RANS_LOWER_BOUND..RANS_LOWER_BOUND << 8).contains(&x) {
        return Err(EncodingError::InvalidInitialState);
    }

    let mut symbols = Vec::with_capacity(count);
    for _ in 0..count {
        let slot = x & SCALE_MASK;
        let s = table.symbol(slot).ok_or(EncodingError::InvalidSymbol)?;
        let freq = table.frequencies[s] as u32;
        x = freq * (x >> RANS_SCALE_BITS) + slot - table.cumulative[s];

        while x < RANS_LOWER_BOUND {
            let (&byte, tail) = rest.split_first().ok_or(EncodingError::Truncated)?;
            x = (x << 8) | byte as u32;
            rest = tail;
        }
        symbols.push(s as u32);
    }

    if !rest.is_empty() {
        return Err(EncodingError::TrailingBytes { count: rest.len() });
    }
    if x != RANS_LOWER_BOUND {
        return Err(EncodingError::InvalidFinalState);
    }
    Ok(symbols)
}

// TESTS
// ================================================================================================
