use crate::audio::{MonitorKey, SpeakingMonitor};
use crate::config::SessionConfig;
use crate::media::{LocalMedia, MediaSource, TrackUpdate};
use crate::peer::{
    PeerEvent, PeerNegotiator, TransportError, TransportFactory, TransportState,
};
use crate::room::{RemoteStreams, RoomCommand, RoomEvent};
use crate::signaling::{SignalingEvent, SignalingSink};
use huddle_core::{ParticipantInfo, PeerId, RoomId, SignalMessage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// The per-room actor. Owns every piece of mutable session state and
/// serializes all of it on one task: control commands, signaling traffic,
/// transport callbacks and the two periodic ticks all land here through
/// `select!`, so peer maps and media state need no locks.
pub struct RoomSession {
    room: RoomId,
    self_id: Option<PeerId>,
    display_name: String,
    config: SessionConfig,
    local: LocalMedia,
    peers: HashMap<PeerId, PeerNegotiator>,
    roster: Vec<ParticipantInfo>,
    streams: RemoteStreams,
    speaking: SpeakingMonitor,
    signaling: Arc<dyn SignalingSink>,
    transports: Arc<dyn TransportFactory>,
    peer_tx: mpsc::Sender<PeerEvent>,
    events: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomSession {
    /// Spawns the session task. The caller keeps the command sender and
    /// the event receiver; everything else lives inside the task.
    pub fn spawn(
        room: RoomId,
        display_name: String,
        config: SessionConfig,
        media: Arc<dyn MediaSource>,
        transports: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingSink>,
        signaling_rx: mpsc::Receiver<SignalingEvent>,
    ) -> (mpsc::Sender<RoomCommand>, mpsc::UnboundedReceiver<RoomEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (evt_tx, evt_rx) = mpsc::unbounded_channel();
        let (peer_tx, peer_rx) = mpsc::channel(256);

        let session = Self {
            room,
            self_id: None,
            display_name,
            speaking: SpeakingMonitor::new(&config),
            config,
            local: LocalMedia::new(media),
            peers: HashMap::new(),
            roster: Vec::new(),
            streams: RemoteStreams::default(),
            signaling,
            transports,
            peer_tx,
            events: evt_tx,
        };
        tokio::spawn(session.run(cmd_rx, signaling_rx, peer_rx));

        (cmd_tx, evt_rx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<RoomCommand>,
        mut signaling_rx: mpsc::Receiver<SignalingEvent>,
        mut peer_rx: mpsc::Receiver<PeerEvent>,
    ) {
        let mut reconcile = interval(self.config.reconcile_interval);
        reconcile.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sampling = interval(self.config.sample_interval);
        sampling.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(room = %self.room, "room session started");
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(RoomCommand::Leave) | None => {
                        self.signaling.send(SignalMessage::Leave).await;
                        self.shutdown(RoomEvent::Left).await;
                        return;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                },

                evt = signaling_rx.recv() => match evt {
                    Some(SignalingEvent::Closed { reason }) => {
                        let terminal = match reason {
                            Some(e) => RoomEvent::SignalingDown { reason: e.to_string() },
                            None => RoomEvent::Left,
                        };
                        self.shutdown(terminal).await;
                        return;
                    }
                    Some(evt) => self.handle_signal(evt).await,
                    None => {
                        self.shutdown(RoomEvent::Left).await;
                        return;
                    }
                },

                Some(evt) = peer_rx.recv() => self.handle_peer_event(evt).await,

                _ = reconcile.tick() => self.reconcile().await,

                _ = sampling.tick() => self.sample_audio(),
            }
        }
    }

    async fn shutdown(&mut self, terminal: RoomEvent) {
        info!(room = %self.room, "room session shutting down");
        for (_, negotiator) in self.peers.drain() {
            negotiator.close().await;
        }
        let _ = self.events.send(terminal);
    }

    fn emit(&self, event: RoomEvent) {
        let _ = self.events.send(event);
    }

    // ---- control plane ----------------------------------------------------

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::StartMedia { audio, video } => {
                match self.local.start(audio, video).await {
                    Ok(updates) => {
                        self.fan_out(updates).await;
                        self.announce_state().await;
                        self.emit(RoomEvent::LocalMediaChanged {
                            flags: self.local.flags(),
                        });
                    }
                    Err(error) => self.emit(RoomEvent::MediaError { error }),
                }
            }
            RoomCommand::ToggleCamera { on } => match self.local.toggle_camera(on).await {
                Ok(updates) => {
                    self.fan_out(updates).await;
                    self.announce_state().await;
                    self.emit(RoomEvent::LocalMediaChanged {
                        flags: self.local.flags(),
                    });
                }
                Err(error) => self.emit(RoomEvent::MediaError { error }),
            },
            RoomCommand::ToggleMute => {
                self.local.toggle_mute();
                self.emit(RoomEvent::LocalMediaChanged {
                    flags: self.local.flags(),
                });
            }
            RoomCommand::ShareScreen => match self.local.share_screen().await {
                Ok(updates) => {
                    self.fan_out(updates).await;
                    self.emit(RoomEvent::LocalMediaChanged {
                        flags: self.local.flags(),
                    });
                }
                Err(error) => self.emit(RoomEvent::MediaError { error }),
            },
            RoomCommand::StopShareScreen => {
                let updates = self.local.stop_share_screen();
                self.fan_out(updates).await;
                self.emit(RoomEvent::LocalMediaChanged {
                    flags: self.local.flags(),
                });
            }
            RoomCommand::SelectVideoDevice { device } => {
                match self.local.select_video_device(device).await {
                    Ok(updates) => {
                        self.fan_out(updates).await;
                        self.emit(RoomEvent::LocalMediaChanged {
                            flags: self.local.flags(),
                        });
                    }
                    Err(error) => self.emit(RoomEvent::MediaError { error }),
                }
            }
            RoomCommand::ListVideoDevices { reply } => {
                let _ = reply.send(self.local.list_video_devices().await);
            }
            RoomCommand::SendChat { text } => {
                let Some(from) = self.self_id.clone() else {
                    warn!("chat dropped, not yet joined");
                    return;
                };
                self.signaling
                    .send(SignalMessage::Chat {
                        from,
                        display_name: self.display_name.clone(),
                        text,
                    })
                    .await;
            }
            RoomCommand::SetDisplayName { name } => {
                self.display_name = name;
                self.announce_state().await;
            }
            RoomCommand::RegisterAudioTap { speaker, tap } => {
                self.speaking.attach(speaker, tap);
            }
            // Intercepted by the run loop before dispatch.
            RoomCommand::Leave => {}
        }
    }

    async fn announce_state(&self) {
        let Some(from) = self.self_id.clone() else {
            return;
        };
        self.signaling
            .send(SignalMessage::StateUpdate {
                from,
                display_name: self.display_name.clone(),
                camera_on: self.local.camera_on(),
            })
            .await;
    }

    // ---- signaling --------------------------------------------------------

    async fn handle_signal(&mut self, evt: SignalingEvent) {
        match evt {
            SignalingEvent::Connected { self_id } => {
                // A reconnect may hand us a fresh identity, which
                // invalidates every politeness assignment. Tear the mesh
                // down; membership after the re-announce rebuilds it.
                if self.self_id.as_ref().is_some_and(|prev| *prev != self_id) {
                    info!(room = %self.room, "identity changed on reconnect, resetting peers");
                    let ids: Vec<PeerId> = self.peers.keys().cloned().collect();
                    for id in ids {
                        self.remove_peer(&id).await;
                    }
                }
                self.self_id = Some(self_id.clone());
                self.announce_state().await;
                self.emit(RoomEvent::Joined { self_id });
            }
            SignalingEvent::Membership { peers } => self.apply_membership(peers).await,
            SignalingEvent::Offer { from, sdp } => {
                // First contact may arrive as an offer before any snapshot
                // mentions the peer. Create the leg without offering; the
                // inbound offer drives this negotiation.
                if !self.peers.contains_key(&from) && !self.add_peer(from.clone(), false).await {
                    return;
                }
                if let Some(negotiator) = self.peers.get(&from) {
                    if let Err(e) = negotiator.handle_offer(&sdp).await {
                        self.fail_peer(from, e).await;
                    }
                }
            }
            SignalingEvent::Answer { from, sdp } => match self.peers.get(&from) {
                Some(negotiator) => {
                    if let Err(e) = negotiator.handle_answer(&sdp).await {
                        self.fail_peer(from, e).await;
                    }
                }
                None => debug!(peer = %from, "answer for unknown peer dropped"),
            },
            SignalingEvent::IceCandidate {
                from,
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => {
                if let Some(negotiator) = self.peers.get(&from) {
                    negotiator
                        .handle_candidate(&candidate, sdp_mid, sdp_mline_index)
                        .await;
                }
            }
            SignalingEvent::StateUpdate {
                from,
                display_name,
                camera_on,
            } => {
                if let Some(entry) = self.roster.iter_mut().find(|p| p.peer_id == from) {
                    entry.display_name = display_name;
                    entry.camera_on = camera_on;
                    self.emit(RoomEvent::RosterChanged {
                        peers: self.roster.clone(),
                    });
                }
            }
            SignalingEvent::Chat {
                from,
                display_name,
                text,
            } => self.emit(RoomEvent::ChatReceived {
                from,
                display_name,
                text,
            }),
            // Terminal closes never reach here; the run loop intercepts them.
            SignalingEvent::Closed { .. } => {}
        }
    }

    /// Diff the authoritative snapshot against the live peer map. Snapshot
    /// replays are idempotent by construction.
    async fn apply_membership(&mut self, peers: Vec<ParticipantInfo>) {
        let announced: HashSet<PeerId> = peers
            .iter()
            .map(|p| p.peer_id.clone())
            .filter(|id| Some(id) != self.self_id.as_ref())
            .collect();

        let gone: Vec<PeerId> = self
            .peers
            .keys()
            .filter(|id| !announced.contains(*id))
            .cloned()
            .collect();
        for id in gone {
            self.remove_peer(&id).await;
        }

        for id in announced {
            if !self.peers.contains_key(&id) {
                self.add_peer(id, true).await;
            }
        }

        self.roster = peers;
        self.emit(RoomEvent::RosterChanged {
            peers: self.roster.clone(),
        });
    }

    // ---- peer lifecycle ---------------------------------------------------

    async fn add_peer(&mut self, peer_id: PeerId, initiate: bool) -> bool {
        let Some(self_id) = self.self_id.clone() else {
            warn!(peer = %peer_id, "cannot add peer before join completes");
            return false;
        };

        let transport = match self
            .transports
            .create(peer_id.clone(), self.peer_tx.clone())
            .await
        {
            Ok(t) => t,
            Err(e) => {
                warn!(peer = %peer_id, error = %e, "failed to create peer transport");
                return false;
            }
        };

        let negotiator =
            PeerNegotiator::new(self_id, peer_id.clone(), transport, self.signaling.clone());

        let seeded = apply_updates(
            &negotiator,
            &self
                .local
                .current_tracks()
                .into_iter()
                .map(track_to_update)
                .collect::<Vec<_>>(),
        )
        .await;
        if let Err(e) = seeded {
            warn!(peer = %peer_id, error = %e, "failed to seed local tracks");
            negotiator.close().await;
            return false;
        }

        if initiate {
            if let Err(e) = negotiator.try_offer().await {
                warn!(peer = %peer_id, error = %e, "initial offer failed");
                negotiator.close().await;
                return false;
            }
        }

        info!(peer = %peer_id, polite = negotiator.polite(), "peer added");
        self.peers.insert(peer_id, negotiator);
        true
    }

    async fn remove_peer(&mut self, peer_id: &PeerId) {
        let Some(negotiator) = self.peers.remove(peer_id) else {
            return;
        };
        negotiator.close().await;
        self.streams.remove(peer_id);
        self.speaking.detach(&MonitorKey::Peer(peer_id.clone()));
        info!(peer = %peer_id, "peer removed");
        self.emit(RoomEvent::PeerLeft {
            peer_id: peer_id.clone(),
        });
    }

    /// Per-peer failure isolation: drop the one leg, leave the rest of the
    /// mesh alone.
    async fn fail_peer(&mut self, peer_id: PeerId, error: TransportError) {
        warn!(peer = %peer_id, error = %error, "peer transport failed");
        self.remove_peer(&peer_id).await;
    }

    // ---- transport events -------------------------------------------------

    async fn handle_peer_event(&mut self, evt: PeerEvent) {
        match evt {
            PeerEvent::NegotiationNeeded(peer_id) => {
                if let Some(negotiator) = self.peers.get(&peer_id) {
                    if let Err(e) = negotiator.try_offer().await {
                        self.fail_peer(peer_id, e).await;
                    }
                }
            }
            PeerEvent::CandidateReady {
                peer_id,
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => {
                let Some(from) = self.self_id.clone() else {
                    return;
                };
                self.signaling
                    .send(SignalMessage::IceCandidate {
                        from,
                        to: peer_id,
                        candidate,
                        sdp_mid,
                        sdp_mline_index,
                    })
                    .await;
            }
            PeerEvent::TrackReceived { peer_id, track } => {
                if let Some(stream) = self.streams.record_track(&peer_id, track) {
                    self.emit(RoomEvent::StreamUpdated { peer_id, stream });
                }
            }
            PeerEvent::ConnectionChanged { peer_id, state } => match state {
                TransportState::Connected => {
                    self.emit(RoomEvent::PeerConnected { peer_id });
                }
                TransportState::Failed => {
                    self.fail_peer(peer_id, TransportError::Closed).await;
                }
                // ICE is allowed to recover a Disconnected leg on its own.
                _ => debug!(peer = %peer_id, ?state, "peer connection state"),
            },
        }
    }

    // ---- media fan-out ----------------------------------------------------

    /// Apply a batch of local track changes to every peer connection, then
    /// nudge renegotiation. Failures cost only the failing peer.
    async fn fan_out(&mut self, updates: Vec<TrackUpdate>) {
        // Every mutation funnels through here, so retired tracks are
        // released from the transport layer on the same pass.
        for id in self.local.take_retired() {
            self.transports.release_track(&id);
        }
        if updates.is_empty() {
            return;
        }
        let ids: Vec<PeerId> = self.peers.keys().cloned().collect();
        let mut failed: Vec<(PeerId, TransportError)> = Vec::new();

        for id in ids {
            let Some(negotiator) = self.peers.get(&id) else {
                continue;
            };
            let result = match apply_updates(negotiator, &updates).await {
                Ok(()) => negotiator.try_offer().await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                failed.push((id, e));
            }
        }

        for (id, e) in failed {
            self.fail_peer(id, e).await;
        }
    }

    // ---- periodic ticks ---------------------------------------------------

    async fn reconcile(&mut self) {
        // Screen shares ended by the platform gesture surface here.
        if let Some(updates) = self.local.reap_ended_share() {
            self.fan_out(updates).await;
            self.announce_state().await;
            self.emit(RoomEvent::LocalMediaChanged {
                flags: self.local.flags(),
            });
        }

        let transports: Vec<(PeerId, Arc<dyn crate::peer::PeerTransport>)> = self
            .peers
            .iter()
            .map(|(id, n)| (id.clone(), n.transport().clone()))
            .collect();
        for (id, transport) in transports {
            let current = transport.received_tracks().await;
            if let Some(stream) = self.streams.reconcile(&id, current) {
                self.emit(RoomEvent::StreamUpdated {
                    peer_id: id,
                    stream,
                });
            }
        }
    }

    fn sample_audio(&mut self) {
        for reading in self.speaking.sample() {
            if reading.changed {
                self.emit(RoomEvent::SpeakingChanged {
                    speaker: reading.key,
                    level: reading.level,
                    speaking: reading.speaking,
                });
            }
        }
    }
}

fn track_to_update(track: crate::media::LocalTrack) -> TrackUpdate {
    match track.kind() {
        crate::media::MediaKind::Audio => TrackUpdate::AttachAudio(track),
        crate::media::MediaKind::Video => TrackUpdate::SetVideo(track),
    }
}

async fn apply_updates(
    negotiator: &PeerNegotiator,
    updates: &[TrackUpdate],
) -> Result<(), TransportError> {
    for update in updates {
        match update {
            TrackUpdate::AttachAudio(track) => {
                negotiator.transport().attach_track(track.clone()).await?;
            }
            TrackUpdate::SetVideo(track) => {
                negotiator.transport().set_video_track(track.clone()).await?;
            }
            TrackUpdate::ClearVideo => {
                negotiator.transport().clear_video_track().await?;
            }
        }
    }
    Ok(())
}
