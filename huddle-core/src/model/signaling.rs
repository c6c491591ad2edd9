use crate::model::participant::ParticipantInfo;
use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Everything that crosses the signaling websocket, in both directions.
///
/// The server assigns an identity with `Welcome`, the client announces
/// itself with `Join` (again after every reconnect), and `Membership`
/// snapshots are the only authority on who is in the room. Offer, answer
/// and candidate payloads are opaque to the server; it routes them by `to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum SignalMessage {
    Welcome {
        peer_id: PeerId,
    },
    Join {
        room: RoomId,
        display_name: String,
        camera_on: bool,
    },
    Leave,
    Membership {
        peers: Vec<ParticipantInfo>,
    },
    Offer {
        from: PeerId,
        to: PeerId,
        sdp: String,
    },
    Answer {
        from: PeerId,
        to: PeerId,
        sdp: String,
    },
    IceCandidate {
        from: PeerId,
        to: PeerId,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    },
    /// Broadcast by a peer whenever its camera flag or display name
    /// changes, so remote tiles update without waiting for media.
    StateUpdate {
        from: PeerId,
        display_name: String,
        camera_on: bool,
    },
    Chat {
        from: PeerId,
        display_name: String,
        text: String,
    },
}
