use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// One roster entry as announced by the rendezvous server. `camera_on`
/// travels out of band from the media path so UIs can render a placeholder
/// tile before (or without) a video track arriving.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub peer_id: PeerId,
    pub display_name: String,
    pub camera_on: bool,
}
