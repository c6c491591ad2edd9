pub mod audio;
pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod room;
pub mod signaling;

pub use config::SessionConfig;
pub use error::SessionError;
pub use room::{RoomCommand, RoomEvent, RoomHandle, RoomSession, SessionCoordinator};
