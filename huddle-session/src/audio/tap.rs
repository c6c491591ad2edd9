use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of decoded PCM for one speaker. The capture pipeline (local
/// microphone) or the decode side of a remote audio track pushes samples
/// in; the speaking monitor drains them on its sampling tick.
pub trait AudioTap: Send + Sync {
    /// Samples accumulated since the previous drain, normalized to
    /// `-1.0..=1.0`. Empty when the speaker produced no audio.
    fn drain(&self) -> Vec<f32>;
}

/// Bounded in-memory tap. Overflow drops the oldest samples; the monitor
/// only ever needs the most recent window.
pub struct PcmRingTap {
    buf: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl PcmRingTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, samples: &[f32]) {
        if let Ok(mut buf) = self.buf.lock() {
            for &s in samples {
                if buf.len() == self.capacity {
                    buf.pop_front();
                }
                buf.push_back(s);
            }
        }
    }
}

impl AudioTap for PcmRingTap {
    fn drain(&self) -> Vec<f32> {
        match self.buf.lock() {
            Ok(mut buf) => buf.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}
