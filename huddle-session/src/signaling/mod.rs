mod channel;
mod error;
mod event;
mod health;
mod sink;

pub use channel::{ChannelSink, SignalingChannel};
pub use error::SignalingError;
pub use event::SignalingEvent;
pub use health::{LinkState, SignalingHealth};
pub use sink::SignalingSink;
