//! Per-timestamp packets and the time-ordered buffer that holds them until
//! they can be emitted.

use std::collections::{HashSet, VecDeque};

use crate::geometry::Homography;
use crate::interpolation::history_cache::HistoryCache;
use crate::interpolation::output::OutputPacket;
use crate::tracking::{Timestamp, Track};

/// Output readiness; a packet is emitted once both halves are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub homography: bool,
    pub tracks: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.homography && self.tracks
    }

    pub fn complete() -> Self {
        Self {
            homography: true,
            tracks: true,
        }
    }
}

/// One output timestamp with its (possibly still incomplete) data.
#[derive(Debug, Clone)]
pub(crate) struct Packet {
    pub timestamp: Timestamp,
    /// Engine-owned clones of the tick's tracks.
    pub tracks: Vec<Track>,
    pub homography: Option<Homography>,
    pub ref_to_world: Homography,
    pub gsd: f64,
    /// `defined_at_ts[i]` is true when `tracks[i]` has a state at `timestamp`.
    pub defined_at_ts: Vec<bool>,
    pub ready: Readiness,
}

impl Packet {
    /// The packet carrying the tick's real tracks and homography.
    pub fn live(
        cache: &HistoryCache,
        tracks: Vec<Track>,
        timestamp: Timestamp,
        homography: Option<Homography>,
        ref_to_world: Homography,
        gsd: f64,
    ) -> Self {
        let defined_at_ts = tracks
            .iter()
            .map(|t| {
                cache
                    .state_at_frame(t.id(), timestamp.frame_number)
                    .is_some()
            })
            .collect();
        Self {
            timestamp,
            tracks,
            homography,
            ref_to_world,
            gsd,
            defined_at_ts,
            ready: Readiness::default(),
        }
    }

    /// An upsampling target: no tracks and no homography yet.
    pub fn placeholder(timestamp: Timestamp, ref_to_world: Homography, gsd: f64) -> Self {
        Self {
            timestamp,
            tracks: Vec::new(),
            homography: None,
            ref_to_world,
            gsd,
            defined_at_ts: Vec::new(),
            ready: Readiness::default(),
        }
    }

    #[inline]
    pub fn frame(&self) -> u32 {
        self.timestamp.frame_number
    }

    /// Number of tracks with no state at this packet's timestamp.
    pub fn undefined_count(&self) -> usize {
        self.defined_at_ts.iter().filter(|d| !**d).count()
    }

    pub fn into_output(self) -> OutputPacket {
        OutputPacket {
            tracks: self.tracks,
            timestamp: self.timestamp,
            homography: self.homography,
            ref_to_world: self.ref_to_world,
            gsd: self.gsd,
        }
    }
}

/// Packets waiting for their gaps to close, strictly increasing by frame.
#[derive(Debug, Default)]
pub(crate) struct PendingPackets {
    packets: VecDeque<Packet>,
}

impl PendingPackets {
    /// Append a packet; the caller guarantees it is newer than every
    /// pending one.
    pub fn push(&mut self, packet: Packet) {
        debug_assert!(
            self.newest_frame()
                .is_none_or(|newest| newest < packet.frame()),
            "pending packets must be strictly increasing by frame"
        );
        self.packets.push_back(packet);
    }

    fn index_of(&self, frame: u32) -> Option<usize> {
        self.packets
            .binary_search_by_key(&frame, |p| p.frame())
            .ok()
    }

    pub fn get(&self, frame: u32) -> Option<&Packet> {
        self.index_of(frame).map(|i| &self.packets[i])
    }

    pub fn get_mut(&mut self, frame: u32) -> Option<&mut Packet> {
        self.index_of(frame).map(move |i| &mut self.packets[i])
    }

    pub fn newest_frame(&self) -> Option<u32> {
        self.packets.back().map(|p| p.frame())
    }

    /// Frames between the oldest and newest pending packet.
    pub fn span(&self) -> u32 {
        match (self.packets.front(), self.packets.back()) {
            (Some(oldest), Some(newest)) => newest.frame() - oldest.frame(),
            _ => 0,
        }
    }

    /// Ids of every track referenced by a pending packet.
    pub fn track_ids(&self) -> HashSet<u64> {
        self.packets
            .iter()
            .flat_map(|p| p.tracks.iter().map(Track::id))
            .collect()
    }

    pub fn mark_all_complete(&mut self) {
        for packet in &mut self.packets {
            packet.ready = Readiness::complete();
        }
    }

    /// Remove and return every ready packet in arrival order; the rest stay
    /// buffered in their original order.
    pub fn take_ready(&mut self) -> Vec<Packet> {
        let (ready, retained): (VecDeque<Packet>, VecDeque<Packet>) = self
            .packets
            .drain(..)
            .partition(|p| p.ready.is_ready());
        self.packets = retained;
        ready.into()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }
}
