use crate::integration::{init_tracing, test_config};
use crate::utils::start_stub_server;
use huddle_core::{PeerId, RoomId, SignalMessage};
use huddle_session::signaling::{LinkState, SignalingChannel, SignalingError, SignalingEvent, SignalingSink};
use std::time::Duration;
use tokio::time::timeout;

async fn recv<T>(rx: &mut tokio::sync::mpsc::UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

async fn recv_event(rx: &mut tokio::sync::mpsc::Receiver<SignalingEvent>) -> SignalingEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

#[tokio::test]
async fn connect_welcomes_joins_and_relays() {
    init_tracing();
    let mut server = start_stub_server(PeerId::from("srv-1"))
        .await
        .expect("stub server");

    let mut config = test_config();
    config.signaling_url = server.url.clone();
    let (channel, mut events) =
        SignalingChannel::connect(&config, RoomId("daily".to_string()), "ana".to_string());

    // Welcome triggers the join announce and surfaces our identity.
    match recv_event(&mut events).await {
        SignalingEvent::Connected { self_id } => assert_eq!(self_id, PeerId::from("srv-1")),
        other => panic!("expected Connected, got {other:?}"),
    }
    match recv(&mut server.inbound).await {
        SignalMessage::Join {
            room, display_name, ..
        } => {
            assert_eq!(room, RoomId("daily".to_string()));
            assert_eq!(display_name, "ana");
        }
        other => panic!("expected Join, got {other:?}"),
    }

    // Server pushes a snapshot; it comes out decoded.
    server
        .outbound
        .send(SignalMessage::Membership { peers: vec![] })
        .unwrap();
    assert!(matches!(
        recv_event(&mut events).await,
        SignalingEvent::Membership { .. }
    ));

    // Outbound traffic reaches the server through the sink.
    channel
        .sink()
        .send(SignalMessage::Chat {
            from: PeerId::from("srv-1"),
            display_name: "ana".to_string(),
            text: "hi".to_string(),
        })
        .await;
    assert!(matches!(
        recv(&mut server.inbound).await,
        SignalMessage::Chat { .. }
    ));

    // Orderly leave: notice on the wire, then a clean close.
    channel.leave();
    assert!(matches!(
        recv(&mut server.inbound).await,
        SignalMessage::Leave
    ));
    assert!(matches!(
        recv_event(&mut events).await,
        SignalingEvent::Closed { reason: None }
    ));
}

#[tokio::test]
async fn reconnect_reannounces_the_last_advertised_state() {
    init_tracing();
    let mut server = start_stub_server(PeerId::from("srv-1"))
        .await
        .expect("stub server");

    let mut config = test_config();
    config.signaling_url = server.url.clone();
    let (channel, mut events) =
        SignalingChannel::connect(&config, RoomId("daily".to_string()), "ana".to_string());

    assert!(matches!(
        recv_event(&mut events).await,
        SignalingEvent::Connected { .. }
    ));
    match recv(&mut server.inbound).await {
        SignalMessage::Join { camera_on, .. } => assert!(!camera_on),
        other => panic!("expected Join, got {other:?}"),
    }

    // Camera comes on and the server hears about it.
    channel
        .sink()
        .send(SignalMessage::StateUpdate {
            from: PeerId::from("srv-1"),
            display_name: "Ana".to_string(),
            camera_on: true,
        })
        .await;
    assert!(matches!(
        recv(&mut server.inbound).await,
        SignalMessage::StateUpdate { .. }
    ));

    // The server drops us; the rejoin must not regress the flag.
    server.drop_connection();
    assert!(matches!(
        recv_event(&mut events).await,
        SignalingEvent::Connected { .. }
    ));
    match recv(&mut server.inbound).await {
        SignalMessage::Join {
            display_name,
            camera_on,
            ..
        } => {
            assert_eq!(display_name, "Ana");
            assert!(camera_on);
        }
        other => panic!("expected Join, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_exhausts_the_retry_budget() {
    init_tracing();

    // Grab a port and release it so the connect is refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = test_config();
    config.signaling_url = format!("ws://{addr}/ws");
    let (channel, mut events) =
        SignalingChannel::connect(&config, RoomId("daily".to_string()), "ana".to_string());

    match recv_event(&mut events).await {
        SignalingEvent::Closed {
            reason: Some(SignalingError::Unavailable { attempts, .. }),
        } => assert_eq!(attempts, config.max_connect_attempts),
        other => panic!("expected exhaustion, got {other:?}"),
    }

    let health = channel.health();
    assert_eq!(health.borrow().state, LinkState::Down);
}
