use crate::media::{LocalTrack, MediaKind, TrackId};
use crate::peer::TransportError;
use async_trait::async_trait;
use huddle_core::PeerId;
use std::sync::Arc;
use tokio::sync::mpsc;

/// SDP negotiation state of one peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// Liveness of the underlying media transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A media track the transport has received from the remote side.
/// Whether the sender currently has anything on it is advertised through
/// roster state updates, not observable here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: TrackId,
    pub kind: MediaKind,
}

/// How an outbound video change landed on the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSenderOp {
    /// Existing sender kept, track swapped in place; no renegotiation of
    /// the media section and no ICE restart.
    Replaced,
    /// First video track on this connection; a fresh sender was added.
    Attached,
}

/// Asynchronous notifications out of one peer transport, consumed by the
/// room session loop.
#[derive(Debug)]
pub enum PeerEvent {
    /// The outbound track set changed; run a renegotiation attempt.
    NegotiationNeeded(PeerId),
    CandidateReady {
        peer_id: PeerId,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    },
    TrackReceived {
        peer_id: PeerId,
        track: RemoteTrack,
    },
    ConnectionChanged {
        peer_id: PeerId,
        state: TransportState,
    },
}

/// One remote peer's media transport. The real implementation wraps a
/// WebRTC peer connection; tests drive the negotiation machine through a
/// scripted double.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn negotiation_state(&self) -> NegotiationState;

    async fn connection_state(&self) -> TransportState;

    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<String, TransportError>;

    /// Create an answer to the current remote offer and install it as the
    /// local description.
    async fn create_answer(&self) -> Result<String, TransportError>;

    async fn apply_remote_offer(&self, sdp: &str) -> Result<(), TransportError>;

    async fn apply_remote_answer(&self, sdp: &str) -> Result<(), TransportError>;

    /// Discard the pending local offer; the polite side of glare calls
    /// this before conceding to the remote offer.
    async fn rollback_local(&self) -> Result<(), TransportError>;

    async fn add_ice_candidate(
        &self,
        candidate: &str,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    ) -> Result<(), TransportError>;

    /// Attach an outbound track on its own sender.
    async fn attach_track(&self, track: LocalTrack) -> Result<(), TransportError>;

    /// Put `track` on the video sender: replace in place when one exists,
    /// attach otherwise.
    async fn set_video_track(&self, track: LocalTrack) -> Result<VideoSenderOp, TransportError>;

    /// Detach outbound video, keeping the sender for later reuse.
    async fn clear_video_track(&self) -> Result<(), TransportError>;

    /// Snapshot of tracks actually received so far, regardless of whether
    /// the corresponding track events were observed.
    async fn received_tracks(&self) -> Vec<RemoteTrack>;

    async fn close(&self);
}

/// Creates transports for newly discovered peers; the seam the room uses
/// so tests can substitute scripted transports.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        peer_id: PeerId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError>;

    /// A stopped local track will never be sent again; drop any per-track
    /// state held for it.
    fn release_track(&self, _track_id: &TrackId) {}
}
