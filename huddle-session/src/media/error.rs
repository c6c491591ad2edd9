use thiserror::Error;

/// Enumerated capture-platform failures. All of them are recoverable by
/// user action and none of them may abort other peers' sessions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("capture permission denied")]
    PermissionDenied,
    #[error("no matching capture device")]
    NotFound,
    /// Device exists but is busy or failed to start; callers retry with a
    /// narrower request instead of failing the session.
    #[error("capture device busy or unreadable")]
    NotReadable,
    #[error("capture constraints cannot be satisfied")]
    Overconstrained,
}
