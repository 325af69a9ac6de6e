use std::io;

/// The error taxonomy for the peer-wire core. Every variant is fatal to the
/// channel that produced it; the core never retries internally.
#[derive(thiserror::Error, Debug)]
pub enum PeerWireError {
    #[error("stream closed before the handshake could be completed")]
    HandshakeClosed,

    #[error("remote info_hash does not match the locally intended torrent")]
    InfoHashMismatch,

    #[error("frame length {len} is inconsistent with message id {id:#04x}")]
    MalformedFrame { id: u8, len: u32 },

    #[error("frame length {0} exceeds the configured ceiling")]
    FrameTooLarge(u32),

    #[error("unknown message id {0:#04x}")]
    UnknownMessage(u8),

    #[error("message id {0:#04x} requires a Fast Extension that was not negotiated")]
    UnsupportedExtension(u8),

    #[error("bitfield received outside the post-handshake position")]
    OutOfOrderBitfield,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("operation attempted on a closed channel")]
    ChannelClosed,
}
