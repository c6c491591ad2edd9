mod error;
mod local_media;
mod source;
mod track;

pub use error::DeviceError;
pub use local_media::{LocalMedia, LocalMediaFlags, TrackUpdate};
pub use source::{CaptureRequest, MediaSource};
pub use track::{DeviceId, DeviceInfo, LocalTrack, MediaKind, TrackId, VideoSource};
