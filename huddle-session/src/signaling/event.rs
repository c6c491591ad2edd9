use crate::signaling::SignalingError;
use huddle_core::{ParticipantInfo, PeerId};

/// Decoded inbound traffic from the rendezvous server, as consumed by the
/// room session. Delivery per sender is FIFO but not exactly-once;
/// consumers treat duplicated or replayed events as idempotent.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// Emitted after every successful (re)connect, once the server has
    /// assigned our identity and the join announce went out.
    Connected { self_id: PeerId },
    /// Authoritative room snapshot; consumers diff it against their own
    /// peer map.
    Membership { peers: Vec<ParticipantInfo> },
    Offer {
        from: PeerId,
        sdp: String,
    },
    Answer {
        from: PeerId,
        sdp: String,
    },
    IceCandidate {
        from: PeerId,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    },
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
    /// Terminal: either an orderly leave (`reason` is `None`) or the
    /// reconnect budget ran out.
    Closed { reason: Option<SignalingError> },
}
