//! Concrete, minimal stand-ins for the external interfaces named in §6, plus
//! the per-channel policy knobs (frame-size ceiling, negotiated extensions)
//! the codec and channel need. None of this performs tracker/DHT/disk I/O;
//! it exists so the core is self-contained and configurable.

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::capabilities::Capabilities;
use crate::handshake::{InfoHash, PeerId};

/// `2^14` bytes, the widely deployed block size used by request planners.
pub const DEFAULT_BLOCK_SIZE: u32 = 16384;

/// Advisory count of peers a client may unchoke simultaneously. Consumed by
/// the (out-of-scope) choking algorithm, not enforced here.
pub const DEFAULT_UNCHOKE_SLOTS: usize = 4;

/// BEP 3's guideline keep-alive cadence. The core exposes the constant; the
/// session-management layer owns the actual timer.
pub const KEEPALIVE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(120);

/// Stands in for the *Metainfo provider* abstract contract of §6: piece
/// size/count and info hash, as supplied by torrent metainfo parsing
/// (out of scope here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetainfoHandle {
    pub piece_size: u32,
    pub piece_count: u32,
    pub info_hash: InfoHash,
}

/// Stands in for the *Identity provider* abstract contract of §6: the local
/// peer id and the capabilities this client negotiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    pub peer_id: PeerId,
    pub capabilities: Capabilities,
}

/// Stands in for the *Peer source* (tracker / DHT) abstract contract of
/// §6: just an address, no discovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

/// Which extensions a channel has negotiated. Set once at
/// [`crate::channel::PeerChannel::open`] time from the two handshakes'
/// capability words, and consulted by the codec to decide whether a
/// Fast-Extension-only message id is a protocol violation.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedExtensions {
    fast_extension: bool,
    extension_protocol: bool,
    extra_ids: HashSet<u8>,
}

impl NegotiatedExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fast_extension(mut self, on: bool) -> Self {
        self.fast_extension = on;
        self
    }

    #[must_use]
    pub fn with_extension_protocol(mut self, on: bool) -> Self {
        self.extension_protocol = on;
        self
    }

    /// Registers an id (conventionally `>= 0x14`) that the codec should
    /// decode as `Message::Extended` instead of rejecting with
    /// `UnknownMessage`. The base 16 ids are always recognized and never
    /// need registering.
    #[must_use]
    pub fn accept_extra_id(mut self, id: u8) -> Self {
        self.extra_ids.insert(id);
        self
    }

    pub fn fast_extension(&self) -> bool {
        self.fast_extension
    }

    pub fn extension_protocol(&self) -> bool {
        self.extension_protocol
    }

    pub fn is_extra_id_accepted(&self, id: u8) -> bool {
        self.extra_ids.contains(&id)
    }

    /// Derives the negotiated set from the bitwise AND of both sides'
    /// handshake capability words — an extension is only "negotiated" if
    /// both peers advertised it.
    pub fn from_capabilities(local: Capabilities, remote: Capabilities) -> Self {
        let fast_extension =
            local.supports_fast_extension() && remote.supports_fast_extension();
        let extension_protocol =
            local.supports_extension_protocol() && remote.supports_extension_protocol();
        Self {
            fast_extension,
            extension_protocol,
            extra_ids: HashSet::new(),
        }
    }
}

/// Per-channel policy: the frame-size ceiling and the negotiated-extensions
/// set. Passed to [`crate::message::MessageCodec`] and retained by
/// [`crate::channel::PeerChannel`].
#[derive(Debug, Clone)]
pub struct PeerWireConfig {
    /// Frames larger than this are rejected with `FrameTooLarge` before
    /// their body is even buffered. Recommended ceiling is 2^24 (16 MiB).
    pub max_frame_len: u32,
    pub extensions: NegotiatedExtensions,
}

impl Default for PeerWireConfig {
    fn default() -> Self {
        Self {
            max_frame_len: 1 << 24,
            extensions: NegotiatedExtensions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiated_extensions_requires_both_sides() {
        let fast_only_local = Capabilities::empty().set(Capabilities::FAST_EXTENSION);
        let none_remote = Capabilities::empty();
        let negotiated = NegotiatedExtensions::from_capabilities(fast_only_local, none_remote);
        assert!(!negotiated.fast_extension());

        let fast_both = Capabilities::empty().set(Capabilities::FAST_EXTENSION);
        let negotiated = NegotiatedExtensions::from_capabilities(fast_both, fast_both);
        assert!(negotiated.fast_extension());
    }

    #[test]
    fn default_config_uses_recommended_ceiling() {
        let config = PeerWireConfig::default();
        assert_eq!(config.max_frame_len, 1 << 24);
    }
}
