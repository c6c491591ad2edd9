use async_trait::async_trait;
use huddle_core::SignalMessage;

/// Outbound half of the signaling channel. Peer state machines only ever
/// see this seam, never the socket; sends are best-effort and the
/// implementation owns the logging for undeliverable messages.
#[async_trait]
pub trait SignalingSink: Send + Sync {
    async fn send(&self, msg: SignalMessage);
}
