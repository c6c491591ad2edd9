use huddle_core::IceServerConfig;
use std::time::Duration;

/// Tunables for one session. Plain data: the embedding application owns
/// whatever persistent configuration layer it wants on top.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Rendezvous server websocket endpoint, e.g. `ws://host:port/ws`.
    pub signaling_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    /// How many consecutive connect attempts before the signaling channel
    /// gives up and the room is declared unusable.
    pub max_connect_attempts: u32,
    /// Base delay between reconnect attempts; doubles per attempt.
    pub reconnect_backoff: Duration,
    pub max_backoff: Duration,
    /// Remote media reconciler tick.
    pub reconcile_interval: Duration,
    /// Audio activity sampling tick.
    pub sample_interval: Duration,
    pub speaking_threshold: f32,
    pub speaking_decay: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:9447/ws".to_string(),
            ice_servers: vec![IceServerConfig {
                urls: vec!["stun:stun.l.google.com:19302".to_string()],
                username: None,
                credential: None,
            }],
            max_connect_attempts: 5,
            reconnect_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            reconcile_interval: Duration::from_secs(2),
            sample_interval: Duration::from_millis(200),
            speaking_threshold: 0.08,
            speaking_decay: 0.8,
        }
    }
}
