use crate::peer::{NegotiationState, PeerTransport, TransportError};
use crate::signaling::SignalingSink;
use huddle_core::{PeerId, SignalMessage};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Deterministic politeness assignment: the lexicographically greater peer
/// id yields on glare. Both sides of any pair compute opposite values, so
/// exactly one connection attempt survives a collision.
pub fn is_polite(self_id: &PeerId, peer_id: &PeerId) -> bool {
    self_id > peer_id
}

/// Whether [`PeerNegotiator::try_offer`] put an offer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Sent,
    /// Negotiation was already in flight; the pending exchange will carry
    /// the current track set when it settles.
    Skipped,
}

#[derive(Default)]
struct NegotiationFlags {
    /// Set for the whole window from deciding to offer until the local
    /// description is installed and the offer is on the wire. Cleared on
    /// every exit path, including failure.
    making_offer: bool,
}

/// Drives offer/answer for a single remote peer on top of a transport,
/// with perfect-negotiation glare handling: the polite side rolls back its
/// own offer and answers, the impolite side ignores the colliding offer.
pub struct PeerNegotiator {
    peer_id: PeerId,
    self_id: PeerId,
    polite: bool,
    transport: Arc<dyn PeerTransport>,
    signaling: Arc<dyn SignalingSink>,
    negotiation: Mutex<NegotiationFlags>,
}

impl PeerNegotiator {
    pub fn new(
        self_id: PeerId,
        peer_id: PeerId,
        transport: Arc<dyn PeerTransport>,
        signaling: Arc<dyn SignalingSink>,
    ) -> Self {
        let polite = is_polite(&self_id, &peer_id);
        debug!(peer = %peer_id, polite, "negotiator created");
        Self {
            peer_id,
            self_id,
            polite,
            transport,
            signaling,
            negotiation: Mutex::new(NegotiationFlags::default()),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn polite(&self) -> bool {
        self.polite
    }

    pub fn transport(&self) -> &Arc<dyn PeerTransport> {
        &self.transport
    }

    /// Starts an offer round unless one is already pending. Callers never
    /// queue retries; the next track mutation or negotiation-needed event
    /// triggers the next attempt.
    pub async fn try_offer(&self) -> Result<OfferOutcome, TransportError> {
        let mut flags = self.negotiation.lock().await;
        if flags.making_offer || self.transport.negotiation_state().await != NegotiationState::Stable
        {
            debug!(peer = %self.peer_id, "offer skipped, negotiation in flight");
            return Ok(OfferOutcome::Skipped);
        }
        flags.making_offer = true;

        let result = self.offer_once().await;
        flags.making_offer = false;
        result?;
        Ok(OfferOutcome::Sent)
    }

    async fn offer_once(&self) -> Result<(), TransportError> {
        let sdp = self.transport.create_offer().await?;
        self.signaling
            .send(SignalMessage::Offer {
                from: self.self_id.clone(),
                to: self.peer_id.clone(),
                sdp,
            })
            .await;
        debug!(peer = %self.peer_id, "offer sent");
        Ok(())
    }

    /// Inbound offer. On glare the impolite side drops it and lets its own
    /// offer stand; the polite side rolls back and answers.
    pub async fn handle_offer(&self, sdp: &str) -> Result<(), TransportError> {
        let mut flags = self.negotiation.lock().await;
        let collision = flags.making_offer
            || self.transport.negotiation_state().await != NegotiationState::Stable;

        if collision {
            if !self.polite {
                info!(peer = %self.peer_id, "glare: impolite side ignoring remote offer");
                return Ok(());
            }
            info!(peer = %self.peer_id, "glare: polite side rolling back local offer");
            self.transport.rollback_local().await?;
            flags.making_offer = false;
        }

        self.transport.apply_remote_offer(sdp).await?;
        let answer = self.transport.create_answer().await?;
        self.signaling
            .send(SignalMessage::Answer {
                from: self.self_id.clone(),
                to: self.peer_id.clone(),
                sdp: answer,
            })
            .await;
        debug!(peer = %self.peer_id, "answer sent");
        Ok(())
    }

    /// Inbound answer. Only meaningful with a local offer outstanding;
    /// anything else is a stale message from an abandoned round.
    pub async fn handle_answer(&self, sdp: &str) -> Result<(), TransportError> {
        if self.transport.negotiation_state().await != NegotiationState::HaveLocalOffer {
            debug!(peer = %self.peer_id, "discarding answer with no local offer pending");
            return Ok(());
        }
        self.transport.apply_remote_answer(sdp).await
    }

    /// Inbound ICE candidate. Failures are logged and swallowed; a bad
    /// candidate must not take down the peer.
    pub async fn handle_candidate(
        &self,
        candidate: &str,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u16>,
    ) {
        if let Err(e) = self
            .transport
            .add_ice_candidate(candidate, sdp_mid, sdp_mline_index)
            .await
        {
            warn!(peer = %self.peer_id, error = %e, "failed to apply ice candidate");
        }
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }
}
