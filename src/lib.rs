//! BitTorrent peer-wire protocol core: handshake framing, the post-
//! handshake message codec (including the BEP 6 Fast Extension), and the
//! bilateral choke/interest session state machine.
//!
//! Tracker communication, torrent metainfo parsing, on-disk storage, peer
//! discovery, piece selection, and the choking algorithm are all out of
//! scope — this crate exposes a typed message stream and a session state
//! that those higher layers drive.

pub mod bitfield;
pub mod block;
pub mod capabilities;
pub mod channel;
pub mod config;
pub mod error;
pub mod handshake;
pub mod message;
pub mod session;

pub use bitfield::Bitfield;
pub use block::{Block, BlockIndex, BlockLength, BlockOffset, PieceIndex};
pub use capabilities::Capabilities;
pub use channel::{PeerChannel, PeerReader, PeerWriter};
pub use config::{
    LocalIdentity, MetainfoHandle, NegotiatedExtensions, PeerAddr, PeerWireConfig,
    DEFAULT_BLOCK_SIZE, DEFAULT_UNCHOKE_SLOTS, KEEPALIVE_INTERVAL,
};
pub use error::PeerWireError;
pub use handshake::{Handshake, InfoHash, PeerId};
pub use message::Message;
pub use session::{AvailabilityEvent, PeerStatusSnapshot, SessionStatus, SessionStatusView};
