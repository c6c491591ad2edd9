use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::MediaSource;
use crate::peer::{RtcTransportFactory, TransportFactory};
use crate::room::{RoomEvent, RoomHandle, RoomSession};
use crate::signaling::SignalingChannel;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use huddle_core::RoomId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Process-wide entry point: owns the shared configuration and the map of
/// joined rooms, at most one live session per room id.
pub struct SessionCoordinator {
    config: SessionConfig,
    media: Arc<dyn MediaSource>,
    transports: Arc<dyn TransportFactory>,
    rooms: DashMap<RoomId, RoomHandle>,
}

impl SessionCoordinator {
    pub fn new(config: SessionConfig, media: Arc<dyn MediaSource>) -> Self {
        let transports = Arc::new(RtcTransportFactory::new(config.ice_servers.clone()));
        Self::with_transports(config, media, transports)
    }

    /// Injection point for scripted transports.
    pub fn with_transports(
        config: SessionConfig,
        media: Arc<dyn MediaSource>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            config,
            media,
            transports,
            rooms: DashMap::new(),
        }
    }

    /// Connects signaling and spawns the room session. Fails fast when the
    /// room is already joined; everything network-related is reported
    /// asynchronously on the returned event stream.
    pub fn join(
        &self,
        room: RoomId,
        display_name: String,
    ) -> Result<(RoomHandle, mpsc::UnboundedReceiver<RoomEvent>), SessionError> {
        match self.rooms.entry(room.clone()) {
            Entry::Occupied(_) => Err(SessionError::AlreadyJoined),
            Entry::Vacant(slot) => {
                let (channel, signaling_rx) =
                    SignalingChannel::connect(&self.config, room.clone(), display_name.clone());
                let sink = Arc::new(channel.sink());

                let (commands, events) = RoomSession::spawn(
                    room.clone(),
                    display_name,
                    self.config.clone(),
                    self.media.clone(),
                    self.transports.clone(),
                    sink,
                    signaling_rx,
                );

                let handle = RoomHandle::new(room.clone(), commands, channel.health());
                slot.insert(handle.clone());
                info!(room = %room, "joined room");
                Ok((handle, events))
            }
        }
    }

    pub fn room(&self, room: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room).map(|h| h.clone())
    }

    pub async fn leave(&self, room: &RoomId) -> Result<(), SessionError> {
        let (_, handle) = self
            .rooms
            .remove(room)
            .ok_or(SessionError::RoomClosed)?;
        handle.leave().await
    }

    /// Drop handles whose sessions already terminated on their own, e.g.
    /// after signaling exhaustion.
    pub fn prune(&self) {
        self.rooms.retain(|_, handle| !handle.is_closed());
    }

    pub fn active_rooms(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|e| e.key().clone()).collect()
    }
}
