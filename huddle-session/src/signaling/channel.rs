use crate::config::SessionConfig;
use crate::signaling::{LinkState, SignalingError, SignalingEvent, SignalingHealth, SignalingSink};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::{RoomId, SignalMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnecting websocket client for the rendezvous server.
///
/// A driver task owns the socket. Outbound messages go through an
/// unbounded channel so callers never block on the network; inbound
/// traffic is decoded into [`SignalingEvent`]s. On every successful
/// (re)connect the driver waits for the server's `Welcome`, re-announces
/// the room with `Join`, and emits `Connected` with the assigned id.
pub struct SignalingChannel {
    outbound: mpsc::UnboundedSender<SignalMessage>,
    health: watch::Receiver<SignalingHealth>,
}

impl SignalingChannel {
    pub fn connect(
        config: &SessionConfig,
        room: RoomId,
        display_name: String,
    ) -> (Self, mpsc::Receiver<SignalingEvent>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (evt_tx, evt_rx) = mpsc::channel(256);
        let (health_tx, health_rx) = watch::channel(SignalingHealth::default());

        tokio::spawn(drive(
            config.clone(),
            room,
            display_name,
            out_rx,
            evt_tx,
            health_tx,
        ));

        (
            Self {
                outbound: out_tx,
                health: health_rx,
            },
            evt_rx,
        )
    }

    pub fn sink(&self) -> ChannelSink {
        ChannelSink {
            tx: self.outbound.clone(),
        }
    }

    pub fn health(&self) -> watch::Receiver<SignalingHealth> {
        self.health.clone()
    }

    /// Best-effort leave notice; the driver closes the socket afterwards.
    pub fn leave(&self) {
        let _ = self.outbound.send(SignalMessage::Leave);
    }
}

/// Cloneable outbound handle handed to peer state machines.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SignalMessage>,
}

#[async_trait]
impl SignalingSink for ChannelSink {
    async fn send(&self, msg: SignalMessage) {
        if self.tx.send(msg).is_err() {
            warn!("signaling channel gone, dropping outbound message");
        }
    }
}

pub(crate) fn backoff_delay(config: &SessionConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay = config.reconnect_backoff.saturating_mul(1u32 << exp);
    delay.min(config.max_backoff)
}

/// Why one websocket session ended.
enum Detach {
    /// Orderly leave requested by the session; no reconnect.
    Leave,
    Lost(String),
}

/// Last state advertised to the server. The `Join` sent after a reconnect
/// repeats it so the membership snapshot never regresses to defaults.
struct Announce {
    display_name: String,
    camera_on: bool,
}

impl Announce {
    fn note_outbound(&mut self, msg: &SignalMessage) {
        if let SignalMessage::StateUpdate {
            display_name,
            camera_on,
            ..
        } = msg
        {
            self.display_name = display_name.clone();
            self.camera_on = *camera_on;
        }
    }
}

async fn drive(
    config: SessionConfig,
    room: RoomId,
    display_name: String,
    mut out_rx: mpsc::UnboundedReceiver<SignalMessage>,
    evt_tx: mpsc::Sender<SignalingEvent>,
    health_tx: watch::Sender<SignalingHealth>,
) {
    let mut attempts: u32 = 0;
    let mut announce = Announce {
        display_name,
        camera_on: false,
    };

    loop {
        health_tx.send_modify(|h| {
            h.state = if h.state == LinkState::Up || attempts > 0 {
                LinkState::Reconnecting
            } else {
                LinkState::Connecting
            };
            h.connect_attempts = attempts + 1;
        });

        match connect_async(&config.signaling_url).await {
            Ok((ws, _)) => {
                info!(room = %room, "signaling connected");
                attempts = 0;
                health_tx.send_modify(|h| {
                    h.state = LinkState::Up;
                    h.connect_attempts = 0;
                    h.last_error = None;
                });

                match run_connection(ws, &room, &mut announce, &mut out_rx, &evt_tx).await {
                    Detach::Leave => {
                        info!(room = %room, "signaling channel left");
                        let _ = evt_tx.send(SignalingEvent::Closed { reason: None }).await;
                        return;
                    }
                    Detach::Lost(reason) => {
                        warn!(room = %room, reason, "signaling connection lost");
                        health_tx.send_modify(|h| h.last_error = Some(reason));
                    }
                }
            }
            Err(e) => {
                warn!(room = %room, error = %e, "signaling connect failed");
                health_tx.send_modify(|h| h.last_error = Some(e.to_string()));
            }
        }

        attempts += 1;
        if attempts >= config.max_connect_attempts {
            let last = health_tx
                .borrow()
                .last_error
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            let err = SignalingError::Unavailable { attempts, last };
            health_tx.send_modify(|h| {
                h.state = LinkState::Down;
                h.connect_attempts = attempts;
            });
            let _ = evt_tx
                .send(SignalingEvent::Closed { reason: Some(err) })
                .await;
            return;
        }

        tokio::time::sleep(backoff_delay(&config, attempts)).await;
    }
}

/// One websocket session: pump outbound messages and decode inbound ones
/// until either side goes away.
async fn run_connection(
    ws: WsStream,
    room: &RoomId,
    announce: &mut Announce,
    out_rx: &mut mpsc::UnboundedReceiver<SignalMessage>,
    evt_tx: &mpsc::Sender<SignalingEvent>,
) -> Detach {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            out = out_rx.recv() => match out {
                Some(SignalMessage::Leave) => {
                    if let Ok(json) = serde_json::to_string(&SignalMessage::Leave) {
                        let _ = sink.send(Message::Text(json)).await;
                    }
                    let _ = sink.close().await;
                    return Detach::Leave;
                }
                Some(msg) => {
                    announce.note_outbound(&msg);
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "failed to encode signal message");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(json)).await {
                        return Detach::Lost(e.to_string());
                    }
                }
                // All handles dropped; treat as an orderly shutdown.
                None => return Detach::Leave,
            },

            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<SignalMessage>(&text) {
                    Ok(SignalMessage::Welcome { peer_id }) => {
                        let join = SignalMessage::Join {
                            room: room.clone(),
                            display_name: announce.display_name.clone(),
                            camera_on: announce.camera_on,
                        };
                        match serde_json::to_string(&join) {
                            Ok(json) => {
                                if let Err(e) = sink.send(Message::Text(json)).await {
                                    return Detach::Lost(e.to_string());
                                }
                            }
                            Err(e) => warn!(error = %e, "failed to encode join"),
                        }
                        let _ = evt_tx
                            .send(SignalingEvent::Connected { self_id: peer_id })
                            .await;
                    }
                    Ok(msg) => {
                        if let Some(event) = decode_event(msg) {
                            let _ = evt_tx.send(event).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "invalid signal message"),
                },
                Some(Ok(Message::Close(_))) | None => return Detach::Lost("server closed connection".to_string()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Detach::Lost(e.to_string()),
            }
        }
    }
}

fn decode_event(msg: SignalMessage) -> Option<SignalingEvent> {
    match msg {
        SignalMessage::Membership { peers } => Some(SignalingEvent::Membership { peers }),
        SignalMessage::Offer { from, sdp, .. } => Some(SignalingEvent::Offer { from, sdp }),
        SignalMessage::Answer { from, sdp, .. } => Some(SignalingEvent::Answer { from, sdp }),
        SignalMessage::IceCandidate {
            from,
            candidate,
            sdp_mid,
            sdp_mline_index,
            ..
        } => Some(SignalingEvent::IceCandidate {
            from,
            candidate,
            sdp_mid,
            sdp_mline_index,
        }),
        SignalMessage::StateUpdate {
            from,
            display_name,
            camera_on,
        } => Some(SignalingEvent::StateUpdate {
            from,
            display_name,
            camera_on,
        }),
        SignalMessage::Chat {
            from,
            display_name,
            text,
        } => Some(SignalingEvent::Chat {
            from,
            display_name,
            text,
        }),
        other => {
            debug!(?other, "ignoring unexpected inbound signal");
            None
        }
    }
}
