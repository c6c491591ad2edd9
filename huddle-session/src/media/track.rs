use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

/// What feeds the video slot. Camera and screen capture are mutually
/// exclusive: a share replaces the camera track on every sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    Camera,
    Screen,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(pub String);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub label: String,
}

/// One local capture track. Shared by reference across every active peer
/// connection's sender; mute flips the enabled flag without releasing the
/// underlying hardware stream, stop releases it for good.
#[derive(Debug, Clone)]
pub struct LocalTrack {
    inner: Arc<TrackInner>,
}

#[derive(Debug)]
struct TrackInner {
    id: TrackId,
    kind: MediaKind,
    source: Option<VideoSource>,
    device: Option<DeviceId>,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl LocalTrack {
    pub fn new(
        id: TrackId,
        kind: MediaKind,
        source: Option<VideoSource>,
        device: Option<DeviceId>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id,
                kind,
                source,
                device,
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.inner.id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn source(&self) -> Option<VideoSource> {
        self.inner.source
    }

    pub fn device(&self) -> Option<&DeviceId> {
        self.inner.device.as_ref()
    }

    pub fn set_enabled(&self, on: bool) {
        self.inner.enabled.store(on, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Releases the capture. Also set externally when the platform ends a
    /// screen share through the OS-level gesture.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}
