use thiserror::Error;

/// Failures from one peer's media transport. Always scoped to that peer:
/// the room removes the failing leg and keeps everyone else connected.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("sdp: {0}")]
    Sdp(String),
    #[error("ice: {0}")]
    Ice(String),
    #[error("webrtc: {0}")]
    Backend(String),
}
