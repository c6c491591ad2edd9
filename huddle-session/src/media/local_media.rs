use crate::media::{
    CaptureRequest, DeviceError, DeviceId, DeviceInfo, LocalTrack, MediaKind, MediaSource,
    TrackId, VideoSource,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A change to the local track set. The room session fans each update out
/// to every active peer connection in one pass.
#[derive(Debug, Clone)]
pub enum TrackUpdate {
    AttachAudio(LocalTrack),
    /// Attach or replace in place; the transport replaces when a video
    /// sender already exists, so device switches never renegotiate.
    SetVideo(LocalTrack),
    ClearVideo,
}

/// Local flags surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalMediaFlags {
    pub camera_on: bool,
    pub muted: bool,
    pub sharing_screen: bool,
}

/// Owns acquisition, mutation and release of the local tracks: at most one
/// audio track and one video track, where the video slot holds either the
/// camera or a screen share, never both.
pub struct LocalMedia {
    source: Arc<dyn MediaSource>,
    audio: Option<LocalTrack>,
    video: Option<LocalTrack>,
    /// Camera track parked while a screen share occupies the video slot;
    /// restored when the share stops.
    parked_camera: Option<LocalTrack>,
    video_device: Option<DeviceId>,
    muted: bool,
    /// Ids of tracks stopped for good since the last drain.
    retired: Vec<TrackId>,
}

impl LocalMedia {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self {
            source,
            audio: None,
            video: None,
            parked_camera: None,
            video_device: None,
            muted: false,
            retired: Vec::new(),
        }
    }

    fn retire(&mut self, track: LocalTrack) {
        track.stop();
        self.retired.push(track.id().clone());
    }

    /// Ids of tracks stopped since the last call. The owner forwards them
    /// to the transport layer so per-track state dies with the track.
    pub fn take_retired(&mut self) -> Vec<TrackId> {
        std::mem::take(&mut self.retired)
    }

    pub fn flags(&self) -> LocalMediaFlags {
        LocalMediaFlags {
            camera_on: self.camera_on(),
            muted: self.muted,
            sharing_screen: self.sharing_screen(),
        }
    }

    pub fn camera_on(&self) -> bool {
        matches!(&self.video, Some(v) if v.source() == Some(VideoSource::Camera))
            || (self.sharing_screen() && self.parked_camera.is_some())
    }

    pub fn sharing_screen(&self) -> bool {
        matches!(&self.video, Some(v) if v.source() == Some(VideoSource::Screen))
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn audio(&self) -> Option<&LocalTrack> {
        self.audio.as_ref()
    }

    pub fn video(&self) -> Option<&LocalTrack> {
        self.video.as_ref()
    }

    /// Tracks to attach when a peer connection is created.
    pub fn current_tracks(&self) -> Vec<LocalTrack> {
        self.audio.iter().chain(self.video.iter()).cloned().collect()
    }

    /// First acquisition of camera/microphone. A busy device fails the
    /// combined request; retry scoped to audio alone, then layer video in
    /// separately so one wedged camera cannot cost the user the session.
    pub async fn start(
        &mut self,
        want_audio: bool,
        want_video: bool,
    ) -> Result<Vec<TrackUpdate>, DeviceError> {
        let request = CaptureRequest {
            audio: want_audio && self.audio.is_none(),
            video: want_video && self.video.is_none(),
            video_device: self.video_device.clone(),
        };
        if !request.audio && !request.video {
            return Ok(Vec::new());
        }

        match self.source.capture(request.clone()).await {
            Ok(tracks) => Ok(self.install(tracks)),
            Err(DeviceError::NotReadable) if request.audio && request.video => {
                warn!("combined capture failed with busy device, retrying audio-only");
                let audio = self
                    .source
                    .capture(CaptureRequest {
                        audio: true,
                        video: false,
                        video_device: None,
                    })
                    .await?;
                let mut updates = self.install(audio);

                let video_request = CaptureRequest {
                    audio: false,
                    video: true,
                    video_device: self.video_device.clone(),
                };
                match self.source.capture(video_request).await {
                    Ok(video) => updates.extend(self.install(video)),
                    // Audio-only session; the user can toggle the camera
                    // once the device frees up.
                    Err(e) => warn!(error = %e, "video capture still failing"),
                }
                Ok(updates)
            }
            Err(e) => Err(e),
        }
    }

    fn install(&mut self, tracks: Vec<LocalTrack>) -> Vec<TrackUpdate> {
        let mut updates = Vec::new();
        for track in tracks {
            match track.kind() {
                MediaKind::Audio => {
                    track.set_enabled(!self.muted);
                    self.audio = Some(track.clone());
                    updates.push(TrackUpdate::AttachAudio(track));
                }
                MediaKind::Video => {
                    self.video = Some(track.clone());
                    updates.push(TrackUpdate::SetVideo(track));
                }
            }
        }
        updates
    }

    /// Camera off stops and detaches only the video track; the audio track
    /// is never touched by this path.
    pub async fn toggle_camera(&mut self, on: bool) -> Result<Vec<TrackUpdate>, DeviceError> {
        if !on {
            // During a share only the parked camera is released; the
            // screen track keeps flowing.
            if self.sharing_screen() {
                if let Some(camera) = self.parked_camera.take() {
                    self.retire(camera);
                }
                return Ok(Vec::new());
            }
            let Some(video) = self.video.take() else {
                return Ok(Vec::new());
            };
            self.retire(video);
            info!("camera off");
            return Ok(vec![TrackUpdate::ClearVideo]);
        }

        // The share keeps the video slot; acquire the camera parked so
        // stopping the share restores it.
        if self.sharing_screen() {
            if self.parked_camera.is_none() {
                let tracks = self
                    .source
                    .capture(CaptureRequest {
                        audio: false,
                        video: true,
                        video_device: self.video_device.clone(),
                    })
                    .await?;
                self.parked_camera = tracks.into_iter().find(|t| t.kind() == MediaKind::Video);
                info!("camera acquired behind the active share");
            }
            return Ok(Vec::new());
        }

        if self.video.is_some() {
            return Ok(Vec::new());
        }
        let tracks = self
            .source
            .capture(CaptureRequest {
                audio: false,
                video: true,
                video_device: self.video_device.clone(),
            })
            .await?;
        info!("camera on");
        Ok(self.install(tracks))
    }

    /// Mute disables rather than stops the audio track so the hardware
    /// stream stays warm for instant re-enable.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if let Some(audio) = &self.audio {
            audio.set_enabled(!self.muted);
        }
        self.muted
    }

    pub async fn share_screen(&mut self) -> Result<Vec<TrackUpdate>, DeviceError> {
        if self.sharing_screen() {
            return Ok(Vec::new());
        }
        let screen = self.source.capture_display().await?;
        // Park the camera track alive so stopping the share restores it
        // without a fresh permission prompt.
        self.parked_camera = self.video.take();
        self.video = Some(screen.clone());
        info!("screen share started");
        Ok(vec![TrackUpdate::SetVideo(screen)])
    }

    pub fn stop_share_screen(&mut self) -> Vec<TrackUpdate> {
        if !self.sharing_screen() {
            return Vec::new();
        }
        if let Some(screen) = self.video.take() {
            self.retire(screen);
        }
        info!("screen share stopped");
        match self.parked_camera.take() {
            Some(camera) => {
                self.video = Some(camera.clone());
                vec![TrackUpdate::SetVideo(camera)]
            }
            None => vec![TrackUpdate::ClearVideo],
        }
    }

    /// The OS-level "stop sharing" gesture ends the capture track out of
    /// band; fold that into the normal stop path. Polled by the room tick.
    pub fn reap_ended_share(&mut self) -> Option<Vec<TrackUpdate>> {
        let ended = matches!(&self.video, Some(v) if v.source() == Some(VideoSource::Screen) && v.is_stopped());
        if !ended {
            return None;
        }
        debug!("screen share ended by platform gesture");
        Some(self.stop_share_screen())
    }

    /// Re-acquires video with the new device constraint. The resulting
    /// `SetVideo` lands as an in-place sender replacement on every peer,
    /// so no remove/add pair and no ICE restart.
    pub async fn select_video_device(
        &mut self,
        device: DeviceId,
    ) -> Result<Vec<TrackUpdate>, DeviceError> {
        self.video_device = Some(device.clone());

        let camera_active = matches!(&self.video, Some(v) if v.source() == Some(VideoSource::Camera));
        if !camera_active {
            // Takes effect on the next camera acquisition.
            return Ok(Vec::new());
        }

        let tracks = self
            .source
            .capture(CaptureRequest {
                audio: false,
                video: true,
                video_device: Some(device),
            })
            .await?;
        if let Some(old) = self.video.take() {
            self.retire(old);
        }
        info!("switched video device");
        Ok(self.install(tracks))
    }

    pub async fn list_video_devices(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        self.source.list_video_devices().await
    }
}
