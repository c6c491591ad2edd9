use crate::audio::MonitorKey;
use crate::media::{DeviceError, LocalMediaFlags};
use crate::room::RemoteStream;
use huddle_core::{ParticipantInfo, PeerId};

/// What the embedding application observes about a room. One unbounded
/// stream per session; the UI renders from these alone.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Identity assigned by the server. Re-emitted after a reconnect,
    /// possibly with a new id.
    Joined { self_id: PeerId },
    RosterChanged {
        peers: Vec<ParticipantInfo>,
    },
    PeerConnected {
        peer_id: PeerId,
    },
    PeerLeft {
        peer_id: PeerId,
    },
    StreamUpdated {
        peer_id: PeerId,
        stream: RemoteStream,
    },
    SpeakingChanged {
        speaker: MonitorKey,
        level: f32,
        speaking: bool,
    },
    ChatReceived {
        from: PeerId,
        display_name: String,
        text: String,
    },
    LocalMediaChanged {
        flags: LocalMediaFlags,
    },
    /// A capture request failed. Non-fatal; the session keeps running with
    /// whatever tracks it has.
    MediaError {
        error: DeviceError,
    },
    /// The signaling reconnect budget ran out. Terminal.
    SignalingDown {
        reason: String,
    },
    /// Orderly shutdown finished. Terminal.
    Left,
}
