use async_trait::async_trait;
use huddle_core::PeerId;
use huddle_session::media::{LocalTrack, TrackId};
use huddle_session::peer::{
    NegotiationState, PeerEvent, PeerTransport, RemoteTrack, TransportError, TransportFactory,
    TransportState, VideoSenderOp,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Every operation a test can assert on, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CreateOffer,
    CreateAnswer,
    ApplyRemoteOffer,
    ApplyRemoteAnswer,
    Rollback,
    AddCandidate(String),
    AttachTrack(String),
    SetVideo(String),
    ClearVideo,
    Close,
}

/// Scripted transport that models the signaling-state machine of a real
/// peer connection without any network.
pub struct MockTransport {
    peer_id: PeerId,
    state: Mutex<NegotiationState>,
    calls: Mutex<Vec<TransportCall>>,
    video_ops: Mutex<Vec<VideoSenderOp>>,
    has_video_sender: AtomicBool,
    fail_offers: AtomicBool,
    fail_video: AtomicBool,
    fail_candidates: AtomicBool,
    received: Mutex<Vec<RemoteTrack>>,
    sdp_counter: AtomicU32,
    events: mpsc::Sender<PeerEvent>,
}

impl MockTransport {
    pub fn new(peer_id: PeerId, events: mpsc::Sender<PeerEvent>) -> Self {
        Self {
            peer_id,
            state: Mutex::new(NegotiationState::Stable),
            calls: Mutex::new(Vec::new()),
            video_ops: Mutex::new(Vec::new()),
            has_video_sender: AtomicBool::new(false),
            fail_offers: AtomicBool::new(false),
            fail_video: AtomicBool::new(false),
            fail_candidates: AtomicBool::new(false),
            received: Mutex::new(Vec::new()),
            sdp_counter: AtomicU32::new(0),
            events,
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn video_ops(&self) -> Vec<VideoSenderOp> {
        self.video_ops.lock().unwrap().clone()
    }

    pub fn set_state(&self, state: NegotiationState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn fail_offers(&self, fail: bool) {
        self.fail_offers.store(fail, Ordering::SeqCst);
    }

    pub fn fail_video(&self, fail: bool) {
        self.fail_video.store(fail, Ordering::SeqCst);
    }

    pub fn fail_candidates(&self, fail: bool) {
        self.fail_candidates.store(fail, Ordering::SeqCst);
    }

    /// Seed ground truth the reconciler will discover without any track
    /// event being delivered.
    pub fn push_received(&self, track: RemoteTrack) {
        self.received.lock().unwrap().push(track);
    }

    /// Deliver a transport event to the owning room session.
    pub async fn emit(&self, event: PeerEvent) {
        self.events.send(event).await.expect("room session gone");
    }

    pub fn is_closed(&self) -> bool {
        self.calls().contains(&TransportCall::Close)
    }

    fn record(&self, call: TransportCall) {
        tracing::debug!(peer = %self.peer_id, ?call, "[MockTransport]");
        self.calls.lock().unwrap().push(call);
    }

    fn next_sdp(&self, prefix: &str) -> String {
        let n = self.sdp_counter.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}-{}-{n}", self.peer_id)
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn negotiation_state(&self) -> NegotiationState {
        *self.state.lock().unwrap()
    }

    async fn connection_state(&self) -> TransportState {
        if self.is_closed() {
            TransportState::Closed
        } else {
            TransportState::Connected
        }
    }

    async fn create_offer(&self) -> Result<String, TransportError> {
        self.record(TransportCall::CreateOffer);
        if self.fail_offers.load(Ordering::SeqCst) {
            return Err(TransportError::Backend("scripted offer failure".into()));
        }
        *self.state.lock().unwrap() = NegotiationState::HaveLocalOffer;
        Ok(self.next_sdp("offer"))
    }

    async fn create_answer(&self) -> Result<String, TransportError> {
        self.record(TransportCall::CreateAnswer);
        *self.state.lock().unwrap() = NegotiationState::Stable;
        Ok(self.next_sdp("answer"))
    }

    async fn apply_remote_offer(&self, _sdp: &str) -> Result<(), TransportError> {
        self.record(TransportCall::ApplyRemoteOffer);
        *self.state.lock().unwrap() = NegotiationState::HaveRemoteOffer;
        Ok(())
    }

    async fn apply_remote_answer(&self, _sdp: &str) -> Result<(), TransportError> {
        self.record(TransportCall::ApplyRemoteAnswer);
        *self.state.lock().unwrap() = NegotiationState::Stable;
        Ok(())
    }

    async fn rollback_local(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Rollback);
        *self.state.lock().unwrap() = NegotiationState::Stable;
        Ok(())
    }

    async fn add_ice_candidate(
        &self,
        candidate: &str,
        _sdp_mid: Option<String>,
        _sdp_mline_index: Option<u16>,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::AddCandidate(candidate.to_string()));
        if self.fail_candidates.load(Ordering::SeqCst) {
            return Err(TransportError::Ice("scripted candidate failure".into()));
        }
        Ok(())
    }

    async fn attach_track(&self, track: LocalTrack) -> Result<(), TransportError> {
        self.record(TransportCall::AttachTrack(track.id().0.clone()));
        Ok(())
    }

    async fn set_video_track(&self, track: LocalTrack) -> Result<VideoSenderOp, TransportError> {
        self.record(TransportCall::SetVideo(track.id().0.clone()));
        if self.fail_video.load(Ordering::SeqCst) {
            return Err(TransportError::Backend("scripted video failure".into()));
        }
        let op = if self.has_video_sender.swap(true, Ordering::SeqCst) {
            VideoSenderOp::Replaced
        } else {
            VideoSenderOp::Attached
        };
        self.video_ops.lock().unwrap().push(op);
        Ok(op)
    }

    async fn clear_video_track(&self) -> Result<(), TransportError> {
        // Sender is kept; the next set replaces in place.
        self.record(TransportCall::ClearVideo);
        Ok(())
    }

    async fn received_tracks(&self) -> Vec<RemoteTrack> {
        self.received.lock().unwrap().clone()
    }

    async fn close(&self) {
        self.record(TransportCall::Close);
        *self.state.lock().unwrap() = NegotiationState::Closed;
    }
}

/// Factory handed to the room session; remembers every transport it built
/// so tests can script and inspect them afterwards.
#[derive(Default)]
pub struct MockTransportFactory {
    created: Mutex<Vec<(PeerId, Arc<MockTransport>)>>,
    released: Mutex<Vec<TrackId>>,
    fail_create: AtomicBool,
}

impl MockTransportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn create_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Track ids the room session told us will never be sent again.
    pub fn released(&self) -> Vec<TrackId> {
        self.released.lock().unwrap().clone()
    }

    pub fn transport_for(&self, peer: &PeerId) -> Option<Arc<MockTransport>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == peer)
            .map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        peer_id: PeerId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(TransportError::Backend("scripted create failure".into()));
        }
        let transport = Arc::new(MockTransport::new(peer_id.clone(), events));
        self.created
            .lock()
            .unwrap()
            .push((peer_id, transport.clone()));
        Ok(transport)
    }

    fn release_track(&self, track_id: &TrackId) {
        self.released.lock().unwrap().push(track_id.clone());
    }
}
