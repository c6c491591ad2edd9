use async_trait::async_trait;
use huddle_core::{PeerId, SignalMessage};
use huddle_session::signaling::SignalingSink;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// SignalingSink double that captures every outbound message for
/// verification and forwards it on a channel for tests that want to await
/// traffic.
pub struct CapturingSink {
    sent: Mutex<Vec<SignalMessage>>,
    tx: mpsc::UnboundedSender<SignalMessage>,
}

impl CapturingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SignalMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                tx,
            }),
            rx,
        )
    }

    pub fn sent(&self) -> Vec<SignalMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn offers_to(&self, peer: &PeerId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SignalMessage::Offer { to, sdp, .. } if to == *peer => Some(sdp),
                _ => None,
            })
            .collect()
    }

    pub fn answers_to(&self, peer: &PeerId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SignalMessage::Answer { to, sdp, .. } if to == *peer => Some(sdp),
                _ => None,
            })
            .collect()
    }

    pub fn candidates_to(&self, peer: &PeerId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SignalMessage::IceCandidate { to, candidate, .. } if to == *peer => Some(candidate),
                _ => None,
            })
            .collect()
    }

    pub fn chats(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SignalMessage::Chat { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SignalingSink for CapturingSink {
    async fn send(&self, msg: SignalMessage) {
        tracing::debug!(?msg, "[CapturingSink] send");
        self.sent.lock().unwrap().push(msg.clone());
        let _ = self.tx.send(msg);
    }
}
