use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Connect/reconnect budget exhausted. The room is unusable until the
    /// embedder re-joins; everything else in the taxonomy is recoverable.
    #[error("signaling server unreachable after {attempts} attempts: {last}")]
    Unavailable { attempts: u32, last: String },
    #[error("signaling channel closed")]
    ChannelClosed,
}
