pub mod signaling_tests;

use crate::utils::{CapturingSink, MockMediaSource, MockTransportFactory};
use huddle_core::{ParticipantInfo, PeerId, RoomId, SignalMessage};
use huddle_session::room::{RoomCommand, RoomEvent, RoomSession};
use huddle_session::signaling::SignalingEvent;
use huddle_session::SessionConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Short ticks so reconcile/sampling behavior shows up inside test
/// timeouts.
pub fn test_config() -> SessionConfig {
    SessionConfig {
        max_connect_attempts: 2,
        reconnect_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(40),
        reconcile_interval: Duration::from_millis(50),
        sample_interval: Duration::from_millis(20),
        ..SessionConfig::default()
    }
}

/// One spawned room session wired entirely to doubles.
pub struct TestRoom {
    pub commands: mpsc::Sender<RoomCommand>,
    pub events: mpsc::UnboundedReceiver<RoomEvent>,
    pub signaling_tx: mpsc::Sender<SignalingEvent>,
    pub sink: Arc<CapturingSink>,
    pub sink_rx: mpsc::UnboundedReceiver<SignalMessage>,
    pub factory: Arc<MockTransportFactory>,
    pub media: Arc<MockMediaSource>,
}

pub fn spawn_test_room() -> TestRoom {
    init_tracing();

    let (sink, sink_rx) = CapturingSink::new();
    let factory = MockTransportFactory::new();
    let media = Arc::new(MockMediaSource::new());
    let (signaling_tx, signaling_rx) = mpsc::channel(64);

    let (commands, events) = RoomSession::spawn(
        RoomId("test-room".to_string()),
        "tester".to_string(),
        test_config(),
        media.clone(),
        factory.clone(),
        sink.clone(),
        signaling_rx,
    );

    TestRoom {
        commands,
        events,
        signaling_tx,
        sink,
        sink_rx,
        factory,
        media,
    }
}

pub fn participant(id: &str) -> ParticipantInfo {
    ParticipantInfo {
        peer_id: PeerId::from(id),
        display_name: id.to_string(),
        camera_on: false,
    }
}

/// Complete the join handshake with the given server-assigned identity.
pub async fn join_as(room: &mut TestRoom, self_id: &str) {
    room.signaling_tx
        .send(SignalingEvent::Connected {
            self_id: PeerId::from(self_id),
        })
        .await
        .expect("session gone");
    let joined = wait_for(room, |e| matches!(e, RoomEvent::Joined { .. })).await;
    match joined {
        RoomEvent::Joined { self_id: id } => assert_eq!(id, PeerId::from(self_id)),
        _ => unreachable!(),
    }
}

/// Deliver a membership snapshot and wait for the roster to apply.
pub async fn announce_membership(room: &mut TestRoom, ids: &[&str]) {
    room.signaling_tx
        .send(SignalingEvent::Membership {
            peers: ids.iter().map(|id| participant(id)).collect(),
        })
        .await
        .expect("session gone");
    wait_for(room, |e| matches!(e, RoomEvent::RosterChanged { .. })).await;
}

/// Wait for the first event matching `pred`, discarding everything else.
pub async fn wait_for<F>(room: &mut TestRoom, mut pred: F) -> RoomEvent
where
    F: FnMut(&RoomEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = room.events.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for room event")
}

/// Give the session task a beat to process already-queued input.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}
