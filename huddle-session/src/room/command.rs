use crate::audio::{AudioTap, MonitorKey};
use crate::media::{DeviceError, DeviceId, DeviceInfo};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Control-plane requests into a running room session, sent through the
/// [`crate::room::RoomHandle`].
pub enum RoomCommand {
    StartMedia {
        audio: bool,
        video: bool,
    },
    ToggleCamera {
        on: bool,
    },
    ToggleMute,
    ShareScreen,
    StopShareScreen,
    SelectVideoDevice {
        device: DeviceId,
    },
    ListVideoDevices {
        reply: oneshot::Sender<Result<Vec<DeviceInfo>, DeviceError>>,
    },
    SendChat {
        text: String,
    },
    SetDisplayName {
        name: String,
    },
    /// Wire a decoded-PCM tap into the speaking monitor for one speaker.
    RegisterAudioTap {
        speaker: MonitorKey,
        tap: Arc<dyn AudioTap>,
    },
    Leave,
}
