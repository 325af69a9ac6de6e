//! The bilateral choke/interest state machine (§4.4). Represented with
//! independent atomic booleans per side, per the design note in §9: each
//! side's booleans are only ever written by one half of the channel (the
//! writer half sends and flips `client`, the reader half receives and flips
//! `peer`), so atomics suffice without a lock.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::message::Message;

const ORDERING: Ordering = Ordering::SeqCst;

/// One endpoint's declared choke/interest state.
#[derive(Debug)]
pub struct PeerStatus {
    choking: AtomicBool,
    interested: AtomicBool,
}

impl PeerStatus {
    /// Peers start choked and uninterested, per BEP 3.
    fn default_state() -> Self {
        Self {
            choking: AtomicBool::new(true),
            interested: AtomicBool::new(false),
        }
    }

    pub fn choking(&self) -> bool {
        self.choking.load(ORDERING)
    }

    pub fn interested(&self) -> bool {
        self.interested.load(ORDERING)
    }

    fn set_choking(&self, choking: bool) {
        self.choking.store(choking, ORDERING);
    }

    fn set_interested(&self, interested: bool) {
        self.interested.store(interested, ORDERING);
    }
}

impl Default for PeerStatus {
    fn default() -> Self {
        Self::default_state()
    }
}

/// A snapshot pair: a PeerStatus value copied out of the live atomics,
/// useful for logging or assertions without holding a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStatusSnapshot {
    pub choking: bool,
    pub interested: bool,
}

/// Availability-related events that don't affect choke/interest but that
/// higher layers need a hook to observe (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityEvent {
    HaveAll,
    HaveNone,
    Have(u32),
}

/// The 2x2 bilateral state: this client's declared status toward the peer,
/// and the peer's declared status toward this client. Owned exclusively by
/// one [`crate::channel::PeerChannel`]; shared between its reader and
/// writer halves.
#[derive(Debug, Default)]
pub struct SessionStatus {
    client: PeerStatus,
    peer: PeerStatus,
}

impl SessionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> PeerStatusSnapshot {
        PeerStatusSnapshot {
            choking: self.client.choking(),
            interested: self.client.interested(),
        }
    }

    pub fn peer(&self) -> PeerStatusSnapshot {
        PeerStatusSnapshot {
            choking: self.peer.choking(),
            interested: self.peer.interested(),
        }
    }

    /// `peer.interested ∧ ¬client.choking`
    pub fn can_upload(&self) -> bool {
        self.peer.interested() && !self.client.choking()
    }

    /// `client.interested ∧ ¬peer.choking`
    pub fn can_download(&self) -> bool {
        self.client.interested() && !self.peer.choking()
    }

    /// Applies the "send X" transition for a just-sent control message.
    /// No-op for any non-control message.
    pub fn apply_sent(&self, msg: &Message) {
        match msg {
            Message::Choke => self.client.set_choking(true),
            Message::Unchoke => self.client.set_choking(false),
            Message::Interested => self.client.set_interested(true),
            Message::NotInterested => self.client.set_interested(false),
            _ => {}
        }
    }

    /// Applies the "receive X" transition for a just-received control
    /// message, and surfaces an [`AvailabilityEvent`] for HaveAll/HaveNone/
    /// Have so higher layers can update a piece-availability bitmap without
    /// re-deriving which messages carry that information. Returns `None`
    /// for messages that are neither a control message nor an availability
    /// event.
    pub fn apply_received(&self, msg: &Message) -> Option<AvailabilityEvent> {
        match msg {
            Message::Choke => {
                self.peer.set_choking(true);
                None
            }
            Message::Unchoke => {
                self.peer.set_choking(false);
                None
            }
            Message::Interested => {
                self.peer.set_interested(true);
                None
            }
            Message::NotInterested => {
                self.peer.set_interested(false);
                None
            }
            Message::HaveAll => Some(AvailabilityEvent::HaveAll),
            Message::HaveNone => Some(AvailabilityEvent::HaveNone),
            Message::Have(piece) => Some(AvailabilityEvent::Have(*piece)),
            _ => None,
        }
    }
}

/// Read-only view of a channel's [`SessionStatus`], shared across an `Arc`.
#[derive(Clone)]
pub struct SessionStatusView(std::sync::Arc<SessionStatus>);

impl SessionStatusView {
    pub(crate) fn new(status: std::sync::Arc<SessionStatus>) -> Self {
        Self(status)
    }

    pub fn client(&self) -> PeerStatusSnapshot {
        self.0.client()
    }

    pub fn peer(&self) -> PeerStatusSnapshot {
        self.0.peer()
    }

    pub fn can_upload(&self) -> bool {
        self.0.can_upload()
    }

    pub fn can_download(&self) -> bool {
        self.0.can_download()
    }
}
