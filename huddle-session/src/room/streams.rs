use crate::media::MediaKind;
use crate::peer::RemoteTrack;
use huddle_core::PeerId;
use std::collections::HashMap;
use tracing::debug;

/// Everything we are currently receiving from one peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteStream {
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteStream {
    pub fn has_video(&self) -> bool {
        self.tracks.iter().any(|t| t.kind == MediaKind::Video)
    }

    pub fn has_audio(&self) -> bool {
        self.tracks.iter().any(|t| t.kind == MediaKind::Audio)
    }
}

/// The session's view of remote media, kept correct two ways: track events
/// apply immediately, and a periodic reconcile pass against what each
/// transport actually holds repairs anything an event miss left behind.
#[derive(Default)]
pub struct RemoteStreams {
    streams: HashMap<PeerId, RemoteStream>,
}

impl RemoteStreams {
    pub fn get(&self, peer: &PeerId) -> Option<&RemoteStream> {
        self.streams.get(peer)
    }

    pub fn remove(&mut self, peer: &PeerId) {
        self.streams.remove(peer);
    }

    /// Apply one track arrival. Returns the updated stream when it
    /// actually changed, `None` for a duplicate.
    pub fn record_track(&mut self, peer: &PeerId, track: RemoteTrack) -> Option<RemoteStream> {
        let stream = self.streams.entry(peer.clone()).or_default();
        if let Some(existing) = stream.tracks.iter_mut().find(|t| t.id == track.id) {
            if *existing == track {
                return None;
            }
            *existing = track;
        } else {
            stream.tracks.push(track);
        }
        Some(stream.clone())
    }

    /// Replace the view for `peer` with the transport's ground truth.
    /// Returns the rebuilt stream only when it differs from the held view.
    pub fn reconcile(&mut self, peer: &PeerId, current: Vec<RemoteTrack>) -> Option<RemoteStream> {
        let rebuilt = RemoteStream { tracks: current };
        match self.streams.get(peer) {
            Some(held) if *held == rebuilt => None,
            // A peer nothing has arrived from yet has nothing to repair.
            None if rebuilt.tracks.is_empty() => None,
            _ => {
                debug!(peer = %peer, tracks = rebuilt.tracks.len(), "remote stream view rebuilt");
                self.streams.insert(peer.clone(), rebuilt.clone());
                Some(rebuilt)
            }
        }
    }
}
