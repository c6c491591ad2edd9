mod monitor;
mod tap;
mod tracker;

pub use monitor::{LevelReading, MonitorKey, SpeakingMonitor};
pub use tap::{AudioTap, PcmRingTap};
pub use tracker::SpeakingTracker;
