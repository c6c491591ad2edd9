pub mod mock_signaling;
pub mod mock_transport;
pub mod signal_helpers;

pub use mock_media::*;
pub use mock_signaling::*;
pub use mock_transport::*;
pub use signal_helpers::*;
