//! The peer channel facade (§4.6): owns one handshaked byte stream plus one
//! `SessionStatus`, and exposes typed `send`/`recv`. Internally splits the
//! stream into owned halves via `tokio::io::split` (the same pattern
//! `TcpStream::split` uses elsewhere in the corpus) so a caller that wants
//! the two independently-concurrent halves required by §5 can pull them out
//! with [`PeerChannel::split`]; callers that only ever touch the channel
//! from one task can use `send`/`recv` directly.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{LocalIdentity, PeerWireConfig};
use crate::error::PeerWireError;
use crate::handshake::{Handshake, InfoHash};
use crate::message::{Message, MessageCodec};
use crate::session::{AvailabilityEvent, SessionStatus, SessionStatusView};

const READ_BUF_CAPACITY: usize = 4096;

/// State shared between a channel's reader and writer halves: the bilateral
/// session status, whether the channel has been closed, and whether any
/// message has been observed yet (for the bitfield-position check in §4.3).
struct Shared {
    status: Arc<SessionStatus>,
    closed: AtomicBool,
    seen_any_message: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            status: Arc::new(SessionStatus::new()),
            closed: AtomicBool::new(false),
            seen_any_message: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), PeerWireError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(PeerWireError::ChannelClosed)
        } else {
            Ok(())
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Runs the §4.2 handshake exchange on a not-yet-split stream: send local,
/// then read and validate remote.
async fn exchange_handshake<S>(
    stream: &mut S,
    local_identity: LocalIdentity,
    info_hash: InfoHash,
) -> Result<Handshake, PeerWireError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let local_handshake = Handshake::new(info_hash, local_identity.peer_id, local_identity.capabilities);
    stream.write_all(&local_handshake.encode()).await?;
    log::debug!("sent handshake, info_hash={}", info_hash);

    let mut pstrlen_byte = [0u8; 1];
    if let Err(e) = stream.read_exact(&mut pstrlen_byte).await {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            log::warn!("stream closed before handshake completed");
            return Err(PeerWireError::HandshakeClosed);
        }
        return Err(e.into());
    }

    let pstrlen = pstrlen_byte[0] as usize;
    let mut rest = vec![0u8; pstrlen + 8 + 20 + 20];
    if let Err(e) = stream.read_exact(&mut rest).await {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            log::warn!("stream closed mid-handshake");
            return Err(PeerWireError::HandshakeClosed);
        }
        return Err(e.into());
    }

    let mut full = Vec::with_capacity(1 + rest.len());
    full.push(pstrlen_byte[0]);
    full.extend(rest);
    let remote_handshake = Handshake::decode(&full)?;

    if remote_handshake.info_hash != info_hash {
        log::warn!("info_hash mismatch: expected {}, got {}", info_hash, remote_handshake.info_hash);
        return Err(PeerWireError::InfoHashMismatch);
    }

    log::debug!("handshake complete with peer {}", remote_handshake.peer_id);
    Ok(remote_handshake)
}

/// The read half of an opened channel. May be driven from a task
/// independent of [`PeerWriter`] (§5); the two share only [`Shared`].
pub struct PeerReader<R> {
    source: R,
    codec: MessageCodec,
    buf: BytesMut,
    shared: Arc<Shared>,
}

impl<R: AsyncRead + Unpin> PeerReader<R> {
    /// Reads one frame, applies its session-state transition (if any), and
    /// returns it along with an [`AvailabilityEvent`] when the message also
    /// carries piece-availability information.
    pub async fn recv(&mut self) -> Result<(Message, Option<AvailabilityEvent>), PeerWireError> {
        self.shared.ensure_open()?;
        loop {
            match self.codec.decode(&mut self.buf) {
                Ok(Some(msg)) => {
                    if matches!(msg, Message::Bitfield(_))
                        && self.shared.seen_any_message.swap(true, Ordering::SeqCst)
                    {
                        self.shared.close();
                        log::warn!("bitfield received out of position, closing channel");
                        return Err(PeerWireError::OutOfOrderBitfield);
                    }
                    self.shared.seen_any_message.store(true, Ordering::SeqCst);

                    let event = self.shared.status.apply_received(&msg);
                    log::trace!("received {:?}", msg);
                    return Ok((msg, event));
                }
                Ok(None) => {
                    let n = match self.source.read_buf(&mut self.buf).await {
                        Ok(n) => n,
                        Err(e) => {
                            self.shared.close();
                            return Err(e.into());
                        }
                    };
                    if n == 0 {
                        self.shared.close();
                        return Err(PeerWireError::Io(io::Error::from(io::ErrorKind::UnexpectedEof)));
                    }
                }
                Err(e) => {
                    self.shared.close();
                    log::warn!("frame decode failed: {e}");
                    return Err(e);
                }
            }
        }
    }

    pub fn close(&self) {
        self.shared.close();
    }

    pub fn status(&self) -> SessionStatusView {
        SessionStatusView::new(self.shared.status.clone())
    }
}

/// The write half of an opened channel. May be driven from a task
/// independent of [`PeerReader`] (§5); the two share only [`Shared`].
pub struct PeerWriter<W> {
    sink: W,
    codec: MessageCodec,
    buf: BytesMut,
    shared: Arc<Shared>,
}

impl<W: AsyncWrite + Unpin> PeerWriter<W> {
    /// Encodes and writes one frame. The session-state transition for a
    /// control message is applied only after the write has fully completed,
    /// so a cancelled send can never leave a half-applied transition (§5).
    pub async fn send(&mut self, msg: Message) -> Result<(), PeerWireError> {
        self.shared.ensure_open()?;
        self.buf.clear();
        if let Err(e) = self.codec.encode(msg.clone(), &mut self.buf) {
            self.shared.close();
            return Err(e);
        }
        if let Err(e) = self.sink.write_all(&self.buf).await {
            self.shared.close();
            return Err(e.into());
        }
        self.shared.status.apply_sent(&msg);
        log::trace!("sent {:?}", msg);
        Ok(())
    }

    pub fn close(&self) {
        self.shared.close();
    }

    pub fn status(&self) -> SessionStatusView {
        SessionStatusView::new(self.shared.status.clone())
    }
}

/// Owns one handshaked stream plus one `SessionStatus`. See the module
/// docs for the split-halves vs. single-task usage tradeoff.
pub struct PeerChannel<S> {
    reader: PeerReader<ReadHalf<S>>,
    writer: PeerWriter<WriteHalf<S>>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> PeerChannel<S> {
    /// Runs the handshake (§4.2) on `stream`, then installs a fresh
    /// [`SessionStatus`] at defaults and wraps the remainder of the stream
    /// in the message codec described in §4.3.
    pub async fn open(
        mut stream: S,
        config: PeerWireConfig,
        local_identity: LocalIdentity,
        info_hash: InfoHash,
    ) -> Result<(Handshake, Self), PeerWireError> {
        let remote_handshake = exchange_handshake(&mut stream, local_identity, info_hash).await?;

        let shared = Arc::new(Shared::new());
        let (read_half, write_half) = tokio::io::split(stream);
        let reader = PeerReader {
            source: read_half,
            codec: MessageCodec::new(config.clone()),
            buf: BytesMut::with_capacity(READ_BUF_CAPACITY),
            shared: shared.clone(),
        };
        let writer = PeerWriter {
            sink: write_half,
            codec: MessageCodec::new(config),
            buf: BytesMut::with_capacity(256),
            shared,
        };

        Ok((remote_handshake, Self { reader, writer }))
    }

    pub async fn send(&mut self, msg: Message) -> Result<(), PeerWireError> {
        self.writer.send(msg).await
    }

    pub async fn recv(&mut self) -> Result<(Message, Option<AvailabilityEvent>), PeerWireError> {
        self.reader.recv().await
    }

    /// Idempotent; subsequent `send`/`recv` calls return `ChannelClosed`.
    pub fn close(&self) {
        self.reader.close();
    }

    pub fn status(&self) -> SessionStatusView {
        self.writer.status()
    }

    /// Decomposes the channel into independently drivable halves sharing
    /// only the session status and closed flag, per the concurrency model
    /// in §5.
    pub fn split(self) -> (PeerReader<ReadHalf<S>>, PeerWriter<WriteHalf<S>>) {
        (self.reader, self.writer)
    }
}
