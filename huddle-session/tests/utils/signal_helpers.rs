use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::any;
use huddle_core::{PeerId, SignalMessage};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, mpsc};

/// Loopback rendezvous stub: greets each websocket client with `Welcome`,
/// relays scripted messages out and decodes everything the client sends
/// for assertions. The current connection can be dropped on demand to
/// exercise the reconnect path.
pub struct StubServer {
    pub url: String,
    /// Messages the client sent, decoded.
    pub inbound: mpsc::UnboundedReceiver<SignalMessage>,
    /// Messages to push to the client.
    pub outbound: mpsc::UnboundedSender<SignalMessage>,
    drop_conn: Arc<Notify>,
}

impl StubServer {
    /// Kill the live connection server-side; the client is expected to
    /// reconnect.
    pub fn drop_connection(&self) {
        self.drop_conn.notify_one();
    }
}

#[derive(Clone)]
struct StubState {
    welcome_id: PeerId,
    inbound: mpsc::UnboundedSender<SignalMessage>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedReceiver<SignalMessage>>>>,
    drop_conn: Arc<Notify>,
}

pub async fn start_stub_server(welcome_id: PeerId) -> anyhow::Result<StubServer> {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let drop_conn = Arc::new(Notify::new());
    let state = StubState {
        welcome_id,
        inbound: in_tx,
        outbound: Arc::new(Mutex::new(Some(out_rx))),
        drop_conn: drop_conn.clone(),
    };
    let app = Router::new()
        .route("/ws", any(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(StubServer {
        url: format!("ws://{addr}/ws"),
        inbound: in_rx,
        outbound: out_tx,
        drop_conn,
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<StubState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: StubState) {
    let mut out_rx = state.outbound.lock().await.take();

    let welcome = SignalMessage::Welcome {
        peer_id: state.welcome_id.clone(),
    };
    let Ok(json) = serde_json::to_string(&welcome) else {
        return;
    };
    if socket.send(Message::Text(json.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = state.drop_conn.notified() => return,
            scripted = recv_scripted(&mut out_rx) => {
                let Ok(json) = serde_json::to_string(&scripted) else { continue };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(msg) = serde_json::from_str::<SignalMessage>(&text) {
                        let _ = state.inbound.send(msg);
                    }
                }
                Some(Ok(_)) => {}
                _ => return,
            }
        }
    }
}

async fn recv_scripted(rx: &mut Option<mpsc::UnboundedReceiver<SignalMessage>>) -> SignalMessage {
    match rx {
        Some(rx) => match rx.recv().await {
            Some(msg) => msg,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}
