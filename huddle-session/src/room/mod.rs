mod command;
mod coordinator;
mod event;
mod handle;
mod session;
mod streams;

pub use command::RoomCommand;
pub use coordinator::SessionCoordinator;
pub use event::RoomEvent;
pub use handle::RoomHandle;
pub use session::RoomSession;
pub use streams::{RemoteStream, RemoteStreams};
