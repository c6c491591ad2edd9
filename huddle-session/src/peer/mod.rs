mod error;
mod negotiator;
mod rtc;
mod transport;

pub use error::TransportError;
pub use negotiator::{OfferOutcome, PeerNegotiator, is_polite};
pub use rtc::{RtcPeerTransport, RtcTransportFactory};
pub use transport::{
    NegotiationState, PeerEvent, PeerTransport, RemoteTrack, TransportFactory, TransportState,
    VideoSenderOp,
};
