use crate::media::{LocalTrack, MediaKind, TrackId};
use crate::peer::{
    NegotiationState, PeerEvent, PeerTransport, RemoteTrack, TransportError, TransportFactory,
    TransportState, VideoSenderOp,
};
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{IceServerConfig, PeerId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

fn backend(e: webrtc::Error) -> TransportError {
    TransportError::Backend(e.to_string())
}

fn codec_for(kind: MediaKind) -> RTCRtpCodecCapability {
    match kind {
        MediaKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48_000,
            channels: 2,
            ..Default::default()
        },
        MediaKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90_000,
            ..Default::default()
        },
    }
}

/// Builds [`RtcPeerTransport`]s and owns the RTP-level track registry: one
/// sample track per local capture track, shared by reference across every
/// peer connection so a media mutation propagates with a single write.
pub struct RtcTransportFactory {
    ice_servers: Vec<IceServerConfig>,
    rtp_tracks: Arc<DashMap<TrackId, Arc<TrackLocalStaticSample>>>,
}

fn resolve_rtp_track(
    registry: &DashMap<TrackId, Arc<TrackLocalStaticSample>>,
    track: &LocalTrack,
) -> Arc<TrackLocalStaticSample> {
    registry
        .entry(track.id().clone())
        .or_insert_with(|| {
            Arc::new(TrackLocalStaticSample::new(
                codec_for(track.kind()),
                track.id().0.clone(),
                "huddle".to_owned(),
            ))
        })
        .clone()
}

impl RtcTransportFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            ice_servers,
            rtp_tracks: Arc::new(DashMap::new()),
        }
    }

    /// Where the embedder's capture pipeline writes encoded samples for a
    /// given local track.
    pub fn sample_writer(&self, track_id: &TrackId) -> Option<Arc<TrackLocalStaticSample>> {
        self.rtp_tracks.get(track_id).map(|t| t.clone())
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        peer_id: PeerId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        let registry = self.rtp_tracks.clone();
        let transport = RtcPeerTransport::new(
            peer_id,
            self.ice_servers.clone(),
            Arc::new(move |track: &LocalTrack| resolve_rtp_track(&registry, track)),
            events,
        )
        .await?;
        Ok(Arc::new(transport))
    }

    /// Camera toggles, device switches and screen shares each mint a fresh
    /// track id; the session releases retired ids so the registry holds
    /// only tracks that can still be sent.
    fn release_track(&self, track_id: &TrackId) {
        self.rtp_tracks.remove(track_id);
    }
}

type TrackResolver = dyn Fn(&LocalTrack) -> Arc<TrackLocalStaticSample> + Send + Sync;

/// One remote peer's WebRTC connection: callback plumbing into the room's
/// event channel plus the sender bookkeeping for track replacement.
pub struct RtcPeerTransport {
    peer_id: PeerId,
    pc: Arc<RTCPeerConnection>,
    resolve_track: Arc<TrackResolver>,
    video_sender: Mutex<Option<Arc<RTCRtpSender>>>,
    received: Arc<StdMutex<Vec<RemoteTrack>>>,
    closed: AtomicBool,
}

impl RtcPeerTransport {
    pub async fn new(
        peer_id: PeerId,
        ice_servers: Vec<IceServerConfig>,
        resolve_track: Arc<TrackResolver>,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Self, TransportError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs().map_err(backend)?;
        let registry =
            register_default_interceptors(Registry::new(), &mut media_engine).map_err(backend)?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .into_iter()
                .map(|s| RTCIceServer {
                    urls: s.urls,
                    username: s.username.unwrap_or_default(),
                    credential: s.credential.unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await.map_err(backend)?);
        let received = Arc::new(StdMutex::new(Vec::new()));

        let state_tx = events.clone();
        let state_peer = peer_id.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let peer = state_peer.clone();
            Box::pin(async move {
                info!(peer = %peer, state = ?s, "peer connection state changed");
                let state = match s {
                    RTCPeerConnectionState::New => TransportState::New,
                    RTCPeerConnectionState::Connecting => TransportState::Connecting,
                    RTCPeerConnectionState::Connected => TransportState::Connected,
                    RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
                    RTCPeerConnectionState::Failed => TransportState::Failed,
                    _ => TransportState::Closed,
                };
                let _ = tx
                    .send(PeerEvent::ConnectionChanged {
                        peer_id: peer,
                        state,
                    })
                    .await;
            })
        }));

        let ice_tx = events.clone();
        let ice_peer = peer_id.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let peer = ice_peer.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(PeerEvent::CandidateReady {
                        peer_id: peer,
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                    })
                    .await;
            })
        }));

        let track_tx = events.clone();
        let track_peer = peer_id.clone();
        let track_log = received.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let peer = track_peer.clone();
            let log = track_log.clone();
            Box::pin(async move {
                let remote = RemoteTrack {
                    id: TrackId(track.id()),
                    kind: match track.kind() {
                        RTPCodecType::Audio => MediaKind::Audio,
                        _ => MediaKind::Video,
                    },
                };
                debug!(peer = %peer, track = %remote.id, kind = ?remote.kind, "remote track arrived");
                if let Ok(mut log) = log.lock() {
                    if !log.iter().any(|t: &RemoteTrack| t.id == remote.id) {
                        log.push(remote.clone());
                    }
                }
                let _ = tx
                    .send(PeerEvent::TrackReceived {
                        peer_id: peer,
                        track: remote,
                    })
                    .await;
            })
        }));

        let neg_tx = events;
        let neg_peer = peer_id.clone();
        pc.on_negotiation_needed(Box::new(move || {
            let tx = neg_tx.clone();
            let peer = neg_peer.clone();
            Box::pin(async move {
                let _ = tx.send(PeerEvent::NegotiationNeeded(peer)).await;
            })
        }));

        Ok(Self {
            peer_id,
            pc,
            resolve_track,
            video_sender: Mutex::new(None),
            received,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl PeerTransport for RtcPeerTransport {
    async fn negotiation_state(&self) -> NegotiationState {
        if self.closed.load(Ordering::SeqCst) {
            return NegotiationState::Closed;
        }
        match self.pc.signaling_state() {
            RTCSignalingState::Stable => NegotiationState::Stable,
            RTCSignalingState::HaveLocalOffer | RTCSignalingState::HaveLocalPranswer => {
                NegotiationState::HaveLocalOffer
            }
            RTCSignalingState::HaveRemoteOffer | RTCSignalingState::HaveRemotePranswer => {
                NegotiationState::HaveRemoteOffer
            }
            _ => NegotiationState::Closed,
        }
    }

    async fn connection_state(&self) -> TransportState {
        match self.pc.connection_state() {
            RTCPeerConnectionState::New => TransportState::New,
            RTCPeerConnectionState::Connecting => TransportState::Connecting,
            RTCPeerConnectionState::Connected => TransportState::Connected,
            RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
            RTCPeerConnectionState::Failed => TransportState::Failed,
            _ => TransportState::Closed,
        }
    }

    async fn create_offer(&self) -> Result<String, TransportError> {
        let offer = self.pc.create_offer(None).await.map_err(backend)?;
        let sdp = offer.sdp.clone();
        self.pc
            .set_local_description(offer)
            .await
            .map_err(|e| TransportError::Sdp(e.to_string()))?;
        Ok(sdp)
    }

    async fn create_answer(&self) -> Result<String, TransportError> {
        let answer = self.pc.create_answer(None).await.map_err(backend)?;
        let sdp = answer.sdp.clone();
        self.pc
            .set_local_description(answer)
            .await
            .map_err(|e| TransportError::Sdp(e.to_string()))?;
        Ok(sdp)
    }

    async fn apply_remote_offer(&self, sdp: &str) -> Result<(), TransportError> {
        let desc = RTCSessionDescription::offer(sdp.to_string())
            .map_err(|e| TransportError::Sdp(e.to_string()))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| TransportError::Sdp(e.to_string()))
    }

    async fn apply_remote_answer(&self, sdp: &str) -> Result<(), TransportError> {
        let desc = RTCSessionDescription::answer(sdp.to_string())
            .map_err(|e| TransportError::Sdp(e.to_string()))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| TransportError::Sdp(e.to_string()))
    }

    async fn rollback_local(&self) -> Result<(), TransportError> {
        let mut desc = RTCSessionDescription::default();
        desc.sdp_type = RTCSdpType::Rollback;
        self.pc
            .set_local_description(desc)
            .await
            .map_err(|e| TransportError::Sdp(e.to_string()))
    }

    async fn add_ice_candidate(
        &self,
        candidate: &str,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    ) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let init = RTCIceCandidateInit {
            candidate: candidate.to_string(),
            sdp_mid,
            sdp_mline_index,
            ..Default::default()
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| TransportError::Ice(e.to_string()))
    }

    async fn attach_track(&self, track: LocalTrack) -> Result<(), TransportError> {
        let rtp_track = (self.resolve_track)(&track);
        self.pc
            .add_track(rtp_track as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn set_video_track(&self, track: LocalTrack) -> Result<VideoSenderOp, TransportError> {
        let rtp_track = (self.resolve_track)(&track);
        let mut slot = self.video_sender.lock().await;
        match slot.as_ref() {
            Some(sender) => {
                sender
                    .replace_track(Some(rtp_track as Arc<dyn TrackLocal + Send + Sync>))
                    .await
                    .map_err(backend)?;
                Ok(VideoSenderOp::Replaced)
            }
            None => {
                let sender = self
                    .pc
                    .add_track(rtp_track as Arc<dyn TrackLocal + Send + Sync>)
                    .await
                    .map_err(backend)?;
                *slot = Some(sender);
                Ok(VideoSenderOp::Attached)
            }
        }
    }

    async fn clear_video_track(&self) -> Result<(), TransportError> {
        let slot = self.video_sender.lock().await;
        if let Some(sender) = slot.as_ref() {
            sender.replace_track(None).await.map_err(backend)?;
        }
        Ok(())
    }

    async fn received_tracks(&self) -> Vec<RemoteTrack> {
        self.received
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Err(e) = self.pc.close().await {
            debug!(peer = %self.peer_id, error = %e, "error closing peer connection");
        }
    }
}
