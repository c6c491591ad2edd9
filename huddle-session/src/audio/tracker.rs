/// Smoothed level estimation for one speaker. Attack is instant (a loud
/// chunk raises the level immediately), release decays geometrically per
/// sampling tick so the indicator does not flicker between words.
pub struct SpeakingTracker {
    threshold: f32,
    decay: f32,
    level: f32,
    speaking: bool,
}

impl SpeakingTracker {
    pub fn new(threshold: f32, decay: f32) -> Self {
        Self {
            threshold,
            decay,
            level: 0.0,
            speaking: false,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Feed one tick's worth of samples. Returns true when the speaking
    /// flag flipped.
    pub fn ingest(&mut self, samples: &[f32]) -> bool {
        let magnitude = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
        };
        self.level = magnitude.max(self.level * self.decay);

        let speaking = self.level >= self.threshold;
        let changed = speaking != self.speaking;
        self.speaking = speaking;
        changed
    }
}
