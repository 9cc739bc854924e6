//! Sequence sanitization and packing.
//!
//! Raw text is normalized to the {A,C,G,T,N} alphabet and packed four
//! symbols per byte (2-bit codes) into the layout the engine transfers to
//! the device. Transfer sizes are additionally rounded up to 8-byte
//! multiples; [`transfer_bytes`] owns that rule.

use std::fmt;

/// Which side of a pair a sequence plays in an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Query,
    Target,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Query => write!(f, "query"),
            Role::Target => write!(f, "target"),
        }
    }
}

/// A sanitized sequence over the {A,C,G,T,N} alphabet.
///
/// Immutable once built. Construction is total: every input byte maps to
/// exactly one output symbol at the same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    symbols: Vec<u8>,
}

impl Sequence {
    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True if the sequence holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The sanitized symbols as uppercase ASCII bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.symbols
    }
}

/// Normalizes raw text to the fixed alphabet.
///
/// Every byte is uppercased; anything outside {A,C,G,T,N} becomes `N`.
/// Length and symbol order are preserved exactly.
pub fn sanitize(text: &[u8]) -> Sequence {
    let symbols = text
        .iter()
        .map(|&b| {
            let u = b.to_ascii_uppercase();
            match u {
                b'A' | b'C' | b'G' | b'T' | b'N' => u,
                _ => b'N',
            }
        })
        .collect();
    Sequence { symbols }
}

/// 2-bit code for one sanitized symbol.
///
/// `N` has no slot in a 2-bit alphabet and packs as code 0; the device
/// side distinguishes it through the translation table keyed by the
/// session's `n_code`.
#[inline]
fn base_code(symbol: u8) -> u8 {
    match symbol {
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => 0,
    }
}

/// A sequence in the on-wire packed representation: four symbols per byte,
/// first symbol in the low bits, final partial byte zero-padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSequence {
    bytes: Vec<u8>,
    symbol_len: usize,
}

impl PackedSequence {
    /// Packed payload, `ceil(symbol_len / 4)` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True symbol count. This, not the packed or padded byte count, is
    /// what the engine's length fields carry.
    pub fn symbol_len(&self) -> usize {
        self.symbol_len
    }

    /// Byte count this sequence occupies in a device transfer.
    pub fn transfer_len(&self) -> usize {
        transfer_bytes(self.symbol_len)
    }
}

/// Packs a sanitized sequence into the wire layout.
pub fn encode(seq: &Sequence) -> PackedSequence {
    let symbols = seq.as_bytes();
    let mut bytes = vec![0u8; symbols.len().div_ceil(4)];
    for (i, &s) in symbols.iter().enumerate() {
        bytes[i / 4] |= base_code(s) << ((i % 4) * 2);
    }
    PackedSequence {
        bytes,
        symbol_len: symbols.len(),
    }
}

/// Device transfer size for a sequence of `symbol_len` symbols:
/// `ceil(L/4)` packed bytes rounded up to the next multiple of 8.
///
/// The engine accepts unrounded sizes but corrupts the batch with them, so
/// every transfer-size argument must come through here.
pub fn transfer_bytes(symbol_len: usize) -> usize {
    symbol_len.div_ceil(4).div_ceil(8) * 8
}

/// Recovers the 2-bit code stream from a packed payload. Padding bytes
/// beyond `symbol_len` are never read.
pub(crate) fn unpack(bytes: &[u8], symbol_len: usize) -> Vec<u8> {
    (0..symbol_len)
        .map(|i| (bytes[i / 4] >> ((i % 4) * 2)) & 0x3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_is_total_and_length_preserving() {
        let all_bytes: Vec<u8> = (0..=255u8).collect();
        let seq = sanitize(&all_bytes);
        assert_eq!(seq.len(), 256);
        for &s in seq.as_bytes() {
            assert!(matches!(s, b'A' | b'C' | b'G' | b'T' | b'N'));
        }
    }

    #[test]
    fn sanitize_uppercases_in_place() {
        let seq = sanitize(b"acgtnACGTN");
        assert_eq!(seq.as_bytes(), b"ACGTNACGTN");
    }

    #[test]
    fn sanitize_coerces_unknown_symbols() {
        let seq = sanitize(b"AC-GT RYKM");
        assert_eq!(seq.as_bytes(), b"ACNGTNNNNN");
    }

    #[test]
    fn transfer_bytes_is_padded_and_sufficient() {
        for len in 0..=1000 {
            let t = transfer_bytes(len);
            assert_eq!(t % 8, 0, "transfer size for {len} not 8-byte aligned");
            assert!(t >= len.div_ceil(4), "transfer size for {len} too small");
        }
        assert_eq!(transfer_bytes(0), 0);
        assert_eq!(transfer_bytes(1), 8);
        assert_eq!(transfer_bytes(32), 8);
        assert_eq!(transfer_bytes(33), 16);
    }

    #[test]
    fn encode_reports_true_length() {
        for len in [0usize, 1, 3, 4, 5, 31, 32, 33, 100] {
            let seq = sanitize(&vec![b'A'; len]);
            let packed = encode(&seq);
            assert_eq!(packed.symbol_len(), len);
            assert_eq!(packed.as_bytes().len(), len.div_ceil(4));
            assert_eq!(packed.transfer_len(), transfer_bytes(len));
        }
    }

    #[test]
    fn pack_unpack_round_trips_codes() {
        let seq = sanitize(b"ACGTTGCAACGTG");
        let packed = encode(&seq);
        let codes = unpack(packed.as_bytes(), packed.symbol_len());
        let expected: Vec<u8> = seq.as_bytes().iter().map(|&s| base_code(s)).collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn lowercase_n_packs_like_uppercase() {
        let lower = encode(&sanitize(b"acgnntga"));
        let upper = encode(&sanitize(b"ACGNNTGA"));
        assert_eq!(lower, upper);
    }

    #[test]
    fn final_partial_byte_is_zero_padded() {
        // 5 symbols: second byte holds one symbol in its low bits only
        let packed = encode(&sanitize(b"TTTTA"));
        assert_eq!(packed.as_bytes().len(), 2);
        assert_eq!(packed.as_bytes()[1] & 0b1111_1100, 0);
    }
}
