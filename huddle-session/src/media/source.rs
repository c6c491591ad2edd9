use crate::media::{DeviceError, DeviceId, DeviceInfo, LocalTrack};
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    pub audio: bool,
    pub video: bool,
    pub video_device: Option<DeviceId>,
}

/// Camera/microphone/display capture as an external capability.
///
/// Acquisition may prompt the user and can take arbitrarily long; callers
/// must not hold up other peers while awaiting it. A combined request
/// fails as a whole, which is why [`crate::media::LocalMedia`] retries
/// busy devices with narrower requests.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn capture(&self, request: CaptureRequest) -> Result<Vec<LocalTrack>, DeviceError>;

    async fn capture_display(&self) -> Result<LocalTrack, DeviceError>;

    async fn list_video_devices(&self) -> Result<Vec<DeviceInfo>, DeviceError>;
}
