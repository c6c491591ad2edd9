use crate::media::DeviceError;
use crate::peer::TransportError;
use crate::signaling::SignalingError;
use thiserror::Error;

/// Top-level failure taxonomy. The only user-visible fatal case is
/// signaling exhaustion; device and per-peer transport failures never
/// take the rest of the room down.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("signaling: {0}")]
    Signaling(#[from] SignalingError),
    #[error("device: {0}")]
    Device(#[from] DeviceError),
    #[error("peer transport: {0}")]
    Transport(#[from] TransportError),
    #[error("already joined room")]
    AlreadyJoined,
    #[error("room session is no longer running")]
    RoomClosed,
}
