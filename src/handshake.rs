//! The fixed-layout handshake: one send, one receive, exactly once per
//! connection, before the message codec takes over.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::capabilities::Capabilities;
use crate::error::PeerWireError;

pub const PROTOCOL_ID: &[u8] = b"BitTorrent protocol";

/// Opaque 20-byte identifier of a swarm, the SHA-1 of a torrent's bencoded
/// `info` dictionary. Hashing itself is out of scope here; this core only
/// carries the 20 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(pub [u8; 20]);

/// Opaque 20-byte self-assigned peer identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(self.0))
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for InfoHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The full handshake value: a protocol identifier string (19 bytes by
/// default, but up to 255), the reserved capability word, and the two
/// 20-byte identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol: Bytes,
    pub reserved: Capabilities,
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
}

/// Largest possible handshake: 1 + 255 + 8 + 20 + 20.
pub const MAX_HANDSHAKE_LEN: usize = 1 + 255 + 8 + 20 + 20;

impl Handshake {
    pub fn new(info_hash: InfoHash, peer_id: PeerId, reserved: Capabilities) -> Self {
        Self {
            protocol: Bytes::from_static(PROTOCOL_ID),
            reserved,
            info_hash,
            peer_id,
        }
    }

    /// Encodes the fixed wire layout described in §4.2: pstrlen, protocol
    /// string, 8-byte reserved word (big-endian), info_hash, peer_id.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.protocol.len() + 8 + 20 + 20);
        buf.put_u8(self.protocol.len() as u8);
        buf.put_slice(&self.protocol);
        buf.put_u64(self.reserved.bits());
        buf.put_slice(&self.info_hash.0);
        buf.put_slice(&self.peer_id.0);
        buf.freeze()
    }

    /// Decodes a full handshake frame: `bytes` must be exactly
    /// `1 + pstrlen + 48` bytes, where `pstrlen` is `bytes[0]`. Callers are
    /// expected to have already read the pstrlen byte to know how many more
    /// bytes to read (§4.2 steps 2-3); this function re-derives it from the
    /// first byte for convenience when the whole buffer is already in hand.
    pub fn decode(mut bytes: &[u8]) -> Result<Self, PeerWireError> {
        if bytes.is_empty() {
            return Err(PeerWireError::HandshakeClosed);
        }
        let pstrlen = bytes[0] as usize;
        let expected_len = 1 + pstrlen + 8 + 20 + 20;
        if bytes.len() < expected_len {
            return Err(PeerWireError::HandshakeClosed);
        }
        bytes.advance(1);
        let protocol = Bytes::copy_from_slice(&bytes[..pstrlen]);
        bytes.advance(pstrlen);
        let reserved = Capabilities::from_bits(bytes.get_u64());
        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&bytes[..20]);
        bytes.advance(20);
        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&bytes[..20]);

        Ok(Self {
            protocol,
            reserved,
            info_hash: InfoHash(info_hash),
            peer_id: PeerId(peer_id),
        })
    }
}
