pub mod model;

pub use model::{IceServerConfig, ParticipantInfo, PeerId, RoomId, SignalMessage};
