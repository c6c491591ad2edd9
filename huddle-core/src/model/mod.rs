mod participant;
mod peer;
mod room;
mod signaling;

pub use participant::ParticipantInfo;
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{IceServerConfig, SignalMessage};
