//! Block/piece addressing. Pure value types; no I/O, no hashing, no
//! knowledge of the torrent's total piece count (that bound is enforced by
//! the consumer, not here).

use bytes::Bytes;

pub type PieceIndex = u32;
pub type BlockOffset = u32;
pub type BlockLength = u32;

/// Pure addressing value, no payload. Used by `Request`, `Cancel`, and
/// `RejectRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockIndex {
    pub piece: PieceIndex,
    pub offset: BlockOffset,
    pub length: BlockLength,
}

/// A payload-bearing block, as carried by a `Piece` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub piece: PieceIndex,
    pub offset: BlockOffset,
    pub data: Bytes,
}

/// Sentinel `BlockIndex` addressing a whole piece, with offset and length
/// left at zero. Callers that need the piece's real length should consult
/// the torrent's metainfo; this codec-level type deliberately doesn't.
pub fn piece_index(piece: PieceIndex) -> BlockIndex {
    BlockIndex {
        piece,
        offset: 0,
        length: 0,
    }
}

/// Derives addressing from a payload-bearing block.
pub fn block_index(block: &Block) -> BlockIndex {
    BlockIndex {
        piece: block.piece,
        offset: block.offset,
        length: block.data.len() as BlockLength,
    }
}

/// `(lo, hi)` absolute byte offsets of `block` within the torrent, given the
/// torrent's fixed piece size. Arithmetic is performed at 64-bit width so a
/// large piece count can't overflow a 32-bit offset.
pub fn block_range(piece_size: u32, block: &Block) -> (u64, u64) {
    let lo = piece_size as u64 * block.piece as u64 + block.offset as u64;
    let hi = lo + block.data.len() as u64;
    (lo, hi)
}

/// `(lo, hi)` absolute byte offsets of `ix`, analogous to [`block_range`]
/// but using `ix.length` instead of a payload's actual length.
pub fn index_range(piece_size: u32, ix: &BlockIndex) -> (u64, u64) {
    let lo = piece_size as u64 * ix.piece as u64 + ix.offset as u64;
    let hi = lo + ix.length as u64;
    (lo, hi)
}

/// True iff `block` spans an entire piece of `piece_size` bytes: offset is
/// zero and the payload is exactly one piece long.
pub fn is_piece(piece_size: u32, block: &Block) -> bool {
    block.offset == 0 && block.data.len() as u64 == piece_size as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_index_is_a_zero_sentinel() {
        let ix = piece_index(7);
        assert_eq!(ix.piece, 7);
        assert_eq!(ix.offset, 0);
        assert_eq!(ix.length, 0);
    }

    #[test]
    fn block_index_derives_length_from_payload() {
        let block = Block {
            piece: 3,
            offset: 16384,
            data: Bytes::from_static(&[0u8; 100]),
        };
        let ix = block_index(&block);
        assert_eq!(
            ix,
            BlockIndex {
                piece: 3,
                offset: 16384,
                length: 100,
            }
        );
    }

    #[test]
    fn block_range_matches_the_range_law() {
        let block = Block {
            piece: 7,
            offset: 16384,
            data: Bytes::from_static(&[0u8; 16384]),
        };
        let piece_size = 262144u32;
        let (lo, hi) = block_range(piece_size, &block);
        assert_eq!(lo, piece_size as u64 * 7 + 16384);
        assert_eq!(hi, lo + 16384);
    }

    #[test]
    fn index_range_uses_declared_length_not_a_payload() {
        let ix = BlockIndex {
            piece: 1,
            offset: 0,
            length: 16384,
        };
        let (lo, hi) = index_range(262144, &ix);
        assert_eq!(lo, 262144);
        assert_eq!(hi, 262144 + 16384);
    }

    #[test]
    fn is_piece_requires_zero_offset_and_full_length() {
        let piece_size = 4u32;
        let whole = Block {
            piece: 0,
            offset: 0,
            data: Bytes::from_static(&[0u8; 4]),
        };
        assert!(is_piece(piece_size, &whole));

        let partial = Block {
            piece: 0,
            offset: 0,
            data: Bytes::from_static(&[0u8; 2]),
        };
        assert!(!is_piece(piece_size, &partial));

        let shifted = Block {
            piece: 0,
            offset: 2,
            data: Bytes::from_static(&[0u8; 2]),
        };
        assert!(!is_piece(piece_size, &shifted));
    }

    #[test]
    fn block_range_handles_large_piece_indices_without_overflow() {
        let block = Block {
            piece: u32::MAX,
            offset: 0,
            data: Bytes::from_static(&[0u8; 16384]),
        };
        let (lo, hi) = block_range(1 << 20, &block);
        assert_eq!(lo, (1u64 << 20) * u32::MAX as u64);
        assert_eq!(hi, lo + 16384);
    }
}
