use crate::audio::{AudioTap, MonitorKey};
use crate::error::SessionError;
use crate::media::{DeviceId, DeviceInfo};
use crate::room::RoomCommand;
use crate::signaling::SignalingHealth;
use huddle_core::RoomId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable control handle for one joined room. All methods are
/// fire-and-forget into the session actor; results come back on the room's
/// event stream.
#[derive(Clone)]
pub struct RoomHandle {
    room: RoomId,
    commands: mpsc::Sender<RoomCommand>,
    health: watch::Receiver<SignalingHealth>,
}

impl RoomHandle {
    pub(crate) fn new(
        room: RoomId,
        commands: mpsc::Sender<RoomCommand>,
        health: watch::Receiver<SignalingHealth>,
    ) -> Self {
        Self {
            room,
            commands,
            health,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Live view of the signaling link for connection indicators.
    pub fn health(&self) -> watch::Receiver<SignalingHealth> {
        self.health.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), SessionError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| SessionError::RoomClosed)
    }

    pub async fn start_media(&self, audio: bool, video: bool) -> Result<(), SessionError> {
        self.send(RoomCommand::StartMedia { audio, video }).await
    }

    pub async fn toggle_camera(&self, on: bool) -> Result<(), SessionError> {
        self.send(RoomCommand::ToggleCamera { on }).await
    }

    pub async fn toggle_mute(&self) -> Result<(), SessionError> {
        self.send(RoomCommand::ToggleMute).await
    }

    pub async fn share_screen(&self) -> Result<(), SessionError> {
        self.send(RoomCommand::ShareScreen).await
    }

    pub async fn stop_share_screen(&self) -> Result<(), SessionError> {
        self.send(RoomCommand::StopShareScreen).await
    }

    pub async fn select_video_device(&self, device: DeviceId) -> Result<(), SessionError> {
        self.send(RoomCommand::SelectVideoDevice { device }).await
    }

    pub async fn list_video_devices(&self) -> Result<Vec<DeviceInfo>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::ListVideoDevices { reply }).await?;
        let devices = rx.await.map_err(|_| SessionError::RoomClosed)??;
        Ok(devices)
    }

    pub async fn send_chat(&self, text: String) -> Result<(), SessionError> {
        self.send(RoomCommand::SendChat { text }).await
    }

    pub async fn set_display_name(&self, name: String) -> Result<(), SessionError> {
        self.send(RoomCommand::SetDisplayName { name }).await
    }

    pub async fn register_audio_tap(
        &self,
        speaker: MonitorKey,
        tap: Arc<dyn AudioTap>,
    ) -> Result<(), SessionError> {
        self.send(RoomCommand::RegisterAudioTap { speaker, tap })
            .await
    }

    pub async fn leave(&self) -> Result<(), SessionError> {
        self.send(RoomCommand::Leave).await
    }
}
