/// Connectivity of the signaling link, published over a watch channel for
/// the UI's troubleshooting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Connecting,
    Up,
    Reconnecting,
    Down,
}

#[derive(Debug, Clone, Default)]
pub struct SignalingHealth {
    pub state: LinkState,
    /// Attempts made in the current connect cycle; resets after a
    /// successful connection.
    pub connect_attempts: u32,
    pub last_error: Option<String>,
}
