//! Piece-availability bitfield: one boolean per piece, transported packed
//! MSB-first, one bit per piece, padded to a whole byte with zero bits.

use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<bool>,
}

impl Bitfield {
    /// An all-`false` bitfield for `piece_count` pieces.
    pub fn new(piece_count: usize) -> Self {
        Self {
            bits: vec![false; piece_count],
        }
    }

    pub fn from_bools(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, piece: usize) -> bool {
        self.bits.get(piece).copied().unwrap_or(false)
    }

    pub fn set(&mut self, piece: usize, has: bool) {
        if piece < self.bits.len() {
            self.bits[piece] = has;
        }
    }

    /// True iff this bitfield carries exactly `piece_count` entries. The
    /// codec never calls this automatically; per §9 the consumer is
    /// responsible for checking a received bitfield against the known
    /// piece count.
    pub fn validate_len(&self, piece_count: usize) -> bool {
        self.bits.len() == piece_count
    }

    /// Packs into `ceil(len / 8)` bytes, MSB-first within each byte.
    /// Trailing padding bits beyond `len()` are zero.
    pub fn to_bytes(&self) -> Bytes {
        let byte_len = (self.bits.len() + 7) / 8;
        let mut out = BytesMut::with_capacity(byte_len);
        for chunk in self.bits.chunks(8) {
            let mut byte = 0u8;
            for (i, &bit) in chunk.iter().enumerate() {
                if bit {
                    byte |= 1 << (7 - i);
                }
            }
            out.put_u8(byte);
        }
        out.freeze()
    }

    /// Unpacks `piece_count` bits from a packed byte array, MSB-first.
    /// Trailing bits beyond `piece_count` (including any spare bits an
    /// out-of-spec sender left set) are ignored rather than rejected, per
    /// the robustness note in §9.
    pub fn from_bytes(bytes: &[u8], piece_count: usize) -> Self {
        let mut bits = Vec::with_capacity(piece_count);
        for piece in 0..piece_count {
            let byte_ix = piece / 8;
            let bit_ix = 7 - (piece % 8);
            let has = bytes
                .get(byte_ix)
                .map(|b| (b >> bit_ix) & 1 != 0)
                .unwrap_or(false);
            bits.push(has);
        }
        Self { bits }
    }
}
