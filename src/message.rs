//! The post-handshake framed message grammar: `<len: u32 be><payload>`,
//! wired as a `tokio_util::codec::{Decoder, Encoder}` pair so it composes
//! with `Framed` the way the teacher's own starter codec does.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::block::{Block, BlockIndex, PieceIndex};
use crate::config::PeerWireConfig;
use crate::error::PeerWireError;

pub const ID_CHOKE: u8 = 0x00;
pub const ID_UNCHOKE: u8 = 0x01;
pub const ID_INTERESTED: u8 = 0x02;
pub const ID_NOT_INTERESTED: u8 = 0x03;
pub const ID_HAVE: u8 = 0x04;
pub const ID_BITFIELD: u8 = 0x05;
pub const ID_REQUEST: u8 = 0x06;
pub const ID_PIECE: u8 = 0x07;
pub const ID_CANCEL: u8 = 0x08;
pub const ID_PORT: u8 = 0x09;
pub const ID_SUGGEST_PIECE: u8 = 0x0D;
pub const ID_HAVE_ALL: u8 = 0x0E;
pub const ID_HAVE_NONE: u8 = 0x0F;
pub const ID_REJECT_REQUEST: u8 = 0x10;
pub const ID_ALLOWED_FAST: u8 = 0x11;

fn is_fast_extension_id(id: u8) -> bool {
    matches!(
        id,
        ID_SUGGEST_PIECE | ID_HAVE_ALL | ID_HAVE_NONE | ID_REJECT_REQUEST | ID_ALLOWED_FAST
    )
}

/// A decoded peer-wire message. `Bitfield` and `Extended` carry their raw
/// wire payload verbatim (no piece-count is known at this layer to
/// interpret the bitfield's bits, and no extension dictionary is parsed)
/// so that `decode(encode(m)) == m` holds exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    KeepAlive,
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have(PieceIndex),
    Bitfield(Bytes),
    Request(BlockIndex),
    Piece(Block),
    Cancel(BlockIndex),
    Port(u16),
    HaveAll,
    HaveNone,
    SuggestPiece(PieceIndex),
    RejectRequest(BlockIndex),
    AllowedFast(PieceIndex),
    /// A BEP 10 extension message whose id was registered via
    /// `NegotiatedExtensions::accept_extra_id`. The payload excludes the id
    /// byte itself.
    Extended(u8, Bytes),
}

impl Message {
    /// The control messages that drive the session state machine (§4.4).
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Message::Choke | Message::Unchoke | Message::Interested | Message::NotInterested
        )
    }

    fn id(&self) -> Option<u8> {
        match self {
            Message::KeepAlive => None,
            Message::Choke => Some(ID_CHOKE),
            Message::Unchoke => Some(ID_UNCHOKE),
            Message::Interested => Some(ID_INTERESTED),
            Message::NotInterested => Some(ID_NOT_INTERESTED),
            Message::Have(_) => Some(ID_HAVE),
            Message::Bitfield(_) => Some(ID_BITFIELD),
            Message::Request(_) => Some(ID_REQUEST),
            Message::Piece(_) => Some(ID_PIECE),
            Message::Cancel(_) => Some(ID_CANCEL),
            Message::Port(_) => Some(ID_PORT),
            Message::HaveAll => Some(ID_HAVE_ALL),
            Message::HaveNone => Some(ID_HAVE_NONE),
            Message::SuggestPiece(_) => Some(ID_SUGGEST_PIECE),
            Message::RejectRequest(_) => Some(ID_REJECT_REQUEST),
            Message::AllowedFast(_) => Some(ID_ALLOWED_FAST),
            Message::Extended(id, _) => Some(*id),
        }
    }

    fn body_len(&self) -> usize {
        match self {
            Message::KeepAlive
            | Message::Choke
            | Message::Unchoke
            | Message::Interested
            | Message::NotInterested
            | Message::HaveAll
            | Message::HaveNone => 0,
            Message::Have(_) | Message::SuggestPiece(_) | Message::AllowedFast(_) => 4,
            Message::Bitfield(bytes) => bytes.len(),
            Message::Request(_) | Message::Cancel(_) | Message::RejectRequest(_) => 12,
            Message::Piece(block) => 8 + block.data.len(),
            Message::Port(_) => 2,
            Message::Extended(_, payload) => payload.len(),
        }
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        match self {
            Message::KeepAlive
            | Message::Choke
            | Message::Unchoke
            | Message::Interested
            | Message::NotInterested
            | Message::HaveAll
            | Message::HaveNone => {}
            Message::Have(piece) | Message::SuggestPiece(piece) | Message::AllowedFast(piece) => {
                buf.put_u32(*piece);
            }
            Message::Bitfield(bytes) => buf.put_slice(bytes),
            Message::Request(ix) | Message::Cancel(ix) | Message::RejectRequest(ix) => {
                buf.put_u32(ix.piece);
                buf.put_u32(ix.offset);
                buf.put_u32(ix.length);
            }
            Message::Piece(block) => {
                buf.put_u32(block.piece);
                buf.put_u32(block.offset);
                buf.put_slice(&block.data);
            }
            Message::Port(port) => buf.put_u16(*port),
            Message::Extended(_, payload) => buf.put_slice(payload),
        }
    }
}

/// The `Decoder`/`Encoder` pair for the post-handshake frame stream.
/// Parameterized by [`PeerWireConfig`] rather than a bare constant so the
/// frame-size ceiling and the negotiated-extensions policy are per-channel.
pub struct MessageCodec {
    config: PeerWireConfig,
}

impl MessageCodec {
    pub fn new(config: PeerWireConfig) -> Self {
        Self { config }
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes(bytes.try_into().expect("slice is exactly 4 bytes"))
}

fn read_block_index(bytes: &[u8]) -> BlockIndex {
    BlockIndex {
        piece: read_u32(&bytes[0..4]),
        offset: read_u32(&bytes[4..8]),
        length: read_u32(&bytes[8..12]),
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = PeerWireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, PeerWireError> {
        if src.len() < 4 {
            return Ok(None);
        }

        let len = read_u32(&src[..4]);

        if len == 0 {
            src.advance(4);
            return Ok(Some(Message::KeepAlive));
        }

        if len > self.config.max_frame_len {
            return Err(PeerWireError::FrameTooLarge(len));
        }

        let frame_len = 4 + len as usize;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let id = src[4];
        let body = Bytes::copy_from_slice(&src[5..frame_len]);
        let body_len = body.len();

        if is_fast_extension_id(id) && !self.config.extensions.fast_extension() {
            src.advance(frame_len);
            return Err(PeerWireError::UnsupportedExtension(id));
        }

        let message = match id {
            ID_CHOKE if body_len == 0 => Message::Choke,
            ID_UNCHOKE if body_len == 0 => Message::Unchoke,
            ID_INTERESTED if body_len == 0 => Message::Interested,
            ID_NOT_INTERESTED if body_len == 0 => Message::NotInterested,
            ID_HAVE_ALL if body_len == 0 => Message::HaveAll,
            ID_HAVE_NONE if body_len == 0 => Message::HaveNone,
            ID_HAVE if body_len == 4 => Message::Have(read_u32(&body)),
            ID_SUGGEST_PIECE if body_len == 4 => Message::SuggestPiece(read_u32(&body)),
            ID_ALLOWED_FAST if body_len == 4 => Message::AllowedFast(read_u32(&body)),
            ID_PORT if body_len == 2 => {
                Message::Port(u16::from_be_bytes([body[0], body[1]]))
            }
            ID_BITFIELD => Message::Bitfield(body),
            ID_REQUEST if body_len == 12 => Message::Request(read_block_index(&body)),
            ID_CANCEL if body_len == 12 => Message::Cancel(read_block_index(&body)),
            ID_REJECT_REQUEST if body_len == 12 => Message::RejectRequest(read_block_index(&body)),
            ID_PIECE if len >= 9 => Message::Piece(Block {
                piece: read_u32(&body[0..4]),
                offset: read_u32(&body[4..8]),
                data: body.slice(8..),
            }),
            ID_PIECE => {
                src.advance(frame_len);
                return Err(PeerWireError::MalformedFrame { id, len });
            }
            _ if self.config.extensions.is_extra_id_accepted(id) => Message::Extended(id, body),
            _ if matches!(
                id,
                ID_CHOKE
                    | ID_UNCHOKE
                    | ID_INTERESTED
                    | ID_NOT_INTERESTED
                    | ID_HAVE
                    | ID_REQUEST
                    | ID_CANCEL
                    | ID_PORT
                    | ID_SUGGEST_PIECE
                    | ID_HAVE_ALL
                    | ID_HAVE_NONE
                    | ID_REJECT_REQUEST
                    | ID_ALLOWED_FAST
            ) =>
            {
                src.advance(frame_len);
                return Err(PeerWireError::MalformedFrame { id, len });
            }
            _ => {
                src.advance(frame_len);
                return Err(PeerWireError::UnknownMessage(id));
            }
        };

        src.advance(frame_len);
        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = PeerWireError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), PeerWireError> {
        if item.id().is_none() {
            // KeepAlive: <len=0000>, no id byte.
            dst.put_u32(0);
            return Ok(());
        }

        let body_len = item.body_len();
        let len = 1 + body_len;
        if len as u64 > self.config.max_frame_len as u64 {
            return Err(PeerWireError::FrameTooLarge(len as u32));
        }

        dst.reserve(4 + len);
        dst.put_u32(len as u32);
        dst.put_u8(item.id().expect("checked above"));
        item.encode_body(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NegotiatedExtensions;

    fn codec() -> MessageCodec {
        MessageCodec::new(PeerWireConfig::default())
    }

    fn fast_codec() -> MessageCodec {
        MessageCodec::new(PeerWireConfig {
            extensions: NegotiatedExtensions::new().with_fast_extension(true),
            ..PeerWireConfig::default()
        })
    }

    fn round_trip(codec: &mut MessageCodec, msg: Message) -> Message {
        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();
        codec.decode(&mut buf).unwrap().unwrap()
    }

    #[test]
    fn keep_alive_is_four_zero_bytes() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        c.encode(Message::KeepAlive, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 0]);
        assert_eq!(c.decode(&mut buf).unwrap(), Some(Message::KeepAlive));
    }

    #[test]
    fn choke_frame_matches_s3() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        c.encode(Message::Choke, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 1, 0]);
    }

    #[test]
    fn request_frame_matches_s4() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        c.encode(
            Message::Request(BlockIndex {
                piece: 7,
                offset: 16384,
                length: 16384,
            }),
            &mut buf,
        )
        .unwrap();
        let expected: &[u8] = &[
            0x00, 0x00, 0x00, 0x0D, 0x06, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x40, 0x00, 0x00,
            0x00, 0x40, 0x00,
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn piece_frame_round_trips_and_matches_s5() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        let msg = Message::Piece(Block {
            piece: 0,
            offset: 0,
            data: Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]),
        });
        c.encode(msg.clone(), &mut buf).unwrap();
        let expected: &[u8] = &[
            0x00, 0x00, 0x00, 0x0D, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xDE,
            0xAD, 0xBE, 0xEF,
        ];
        assert_eq!(&buf[..], expected);
        assert_eq!(c.decode(&mut buf).unwrap(), Some(msg));
    }

    #[test]
    fn piece_with_len_below_nine_is_malformed() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        // len=5 (too short for a 9-byte Piece header), id=0x07.
        buf.put_u32(5);
        buf.put_u8(ID_PIECE);
        buf.put_slice(&[0u8; 4]);
        let err = c.decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            PeerWireError::MalformedFrame { id: ID_PIECE, len: 5 }
        ));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u8(0x7F);
        let err = c.decode(&mut buf).unwrap_err();
        assert!(matches!(err, PeerWireError::UnknownMessage(0x7F)));
    }

    #[test]
    fn frame_exceeding_ceiling_is_rejected() {
        let mut c = MessageCodec::new(PeerWireConfig {
            max_frame_len: 16,
            ..PeerWireConfig::default()
        });
        let mut buf = BytesMut::new();
        buf.put_u32(17);
        let err = c.decode(&mut buf).unwrap_err();
        assert!(matches!(err, PeerWireError::FrameTooLarge(17)));
    }

    #[test]
    fn fast_extension_message_rejected_without_negotiation() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        buf.put_u32(1);
        buf.put_u8(ID_HAVE_ALL);
        let err = c.decode(&mut buf).unwrap_err();
        assert!(matches!(err, PeerWireError::UnsupportedExtension(ID_HAVE_ALL)));
    }

    #[test]
    fn fast_extension_message_accepted_once_negotiated() {
        let mut c = fast_codec();
        let round = round_trip(&mut c, Message::HaveAll);
        assert_eq!(round, Message::HaveAll);
    }

    #[test]
    fn accepted_extra_id_decodes_as_extended() {
        let mut c = MessageCodec::new(PeerWireConfig {
            extensions: NegotiatedExtensions::new().accept_extra_id(0x14),
            ..PeerWireConfig::default()
        });
        let mut buf = BytesMut::new();
        buf.put_u32(3);
        buf.put_u8(0x14);
        buf.put_slice(&[0xAA, 0xBB]);
        let msg = c.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg, Message::Extended(0x14, Bytes::from_static(&[0xAA, 0xBB])));
    }

    #[test]
    fn bitfield_round_trips_raw_bytes_unchanged() {
        let mut c = codec();
        let payload = Bytes::from_static(&[0xFF, 0x00, 0xAC]);
        let round = round_trip(&mut c, Message::Bitfield(payload.clone()));
        assert_eq!(round, Message::Bitfield(payload));
    }

    #[test]
    fn decoder_waits_for_a_full_frame() {
        let mut c = codec();
        let mut buf = BytesMut::new();
        buf.put_u32(5);
        buf.put_u8(ID_HAVE);
        buf.put_slice(&[0, 0, 0]); // only 3 of 4 body bytes present
        assert_eq!(c.decode(&mut buf).unwrap(), None);
        buf.put_u8(7);
        assert_eq!(c.decode(&mut buf).unwrap(), Some(Message::Have(7)));
    }
}
