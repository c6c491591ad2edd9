use crate::audio::{AudioTap, SpeakingTracker};
use crate::config::SessionConfig;
use huddle_core::PeerId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Which speaker a reading belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MonitorKey {
    Local,
    Peer(PeerId),
}

/// One speaker's state at a sampling tick.
#[derive(Debug, Clone)]
pub struct LevelReading {
    pub key: MonitorKey,
    pub level: f32,
    pub speaking: bool,
    /// The speaking flag flipped on this tick; only these readings turn
    /// into session events.
    pub changed: bool,
}

/// Samples every registered tap on the room's sampling tick and keeps a
/// smoothed tracker per speaker.
pub struct SpeakingMonitor {
    threshold: f32,
    decay: f32,
    speakers: HashMap<MonitorKey, (Arc<dyn AudioTap>, SpeakingTracker)>,
}

impl SpeakingMonitor {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            threshold: config.speaking_threshold,
            decay: config.speaking_decay,
            speakers: HashMap::new(),
        }
    }

    /// Registers a tap for a speaker. Re-attaching an already monitored
    /// speaker replaces the tap and resets the tracker.
    pub fn attach(&mut self, key: MonitorKey, tap: Arc<dyn AudioTap>) -> bool {
        debug!(speaker = ?key, "audio tap attached");
        let fresh = SpeakingTracker::new(self.threshold, self.decay);
        self.speakers.insert(key, (tap, fresh)).is_none()
    }

    pub fn detach(&mut self, key: &MonitorKey) {
        self.speakers.remove(key);
    }

    pub fn is_monitoring(&self, key: &MonitorKey) -> bool {
        self.speakers.contains_key(key)
    }

    /// One sampling tick across all speakers.
    pub fn sample(&mut self) -> Vec<LevelReading> {
        let mut readings = Vec::with_capacity(self.speakers.len());
        for (key, (tap, tracker)) in &mut self.speakers {
            let samples = tap.drain();
            let changed = tracker.ingest(&samples);
            readings.push(LevelReading {
                key: key.clone(),
                level: tracker.level(),
                speaking: tracker.is_speaking(),
                changed,
            });
        }
        readings
    }
}
