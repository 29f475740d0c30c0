//! Per-track log of every observed or synthesized state.
//!
//! The upstream tracker hands us tracks whose histories know nothing about
//! the states we synthesize, so the interpolator keeps its own copy. A log is
//! created the first time a track is seen and dropped once the track has left
//! the live list and no pending packet refers to it any more.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::interpolation::error::ConsistencyError;
use crate::tracking::{Track, TrackState};

#[derive(Debug, Default)]
pub struct HistoryCache {
    logs: HashMap<u64, BTreeMap<u32, TrackState>>,
}

impl HistoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the cache in line with the tracker's current live list.
    ///
    /// States at frames already present are never overwritten, so anything
    /// synthesized earlier survives. Departed tracks whose id is in `pinned`
    /// keep their log.
    pub fn synchronize(&mut self, live_tracks: &[Track], pinned: &HashSet<u64>) {
        for track in live_tracks {
            let log = self.logs.entry(track.id()).or_insert_with(|| {
                debug!(
                    track_id = track.id(),
                    states = track.history().len(),
                    "adding track to history cache"
                );
                BTreeMap::new()
            });
            for state in track.history() {
                log.entry(state.frame_number())
                    .or_insert_with(|| state.clone());
            }
        }

        self.logs.retain(|id, _| {
            let keep = pinned.contains(id) || live_tracks.iter().any(|t| t.id() == *id);
            if !keep {
                debug!(track_id = *id, "removing track from history cache");
            }
            keep
        });
    }

    /// The recorded state of a track at exactly `frame`.
    pub fn state_at_frame(&self, track_id: u64, frame: u32) -> Option<&TrackState> {
        self.logs.get(&track_id)?.get(&frame)
    }

    /// All recorded states with frame number `<= frame`, in frame order.
    pub fn load_history_up_to_frame(&self, track_id: u64, frame: u32) -> Vec<TrackState> {
        let Some(log) = self.logs.get(&track_id) else {
            return Vec::new();
        };

        let mut last_frame: Option<u32> = None;
        let mut history = Vec::new();
        for (&f, state) in log.range(..=frame) {
            if let Some(prev) = last_frame {
                if f - prev != 1 {
                    debug!(track_id, from = prev, to = f, "history up to frame {frame} has a gap");
                }
            }
            last_frame = Some(f);
            history.push(state.clone());
        }
        history
    }

    pub fn add_interpolated_state(
        &mut self,
        track_id: u64,
        state: TrackState,
    ) -> Result<(), ConsistencyError> {
        let log = self
            .logs
            .get_mut(&track_id)
            .ok_or(ConsistencyError::UnknownTrack { track_id })?;
        let frame = state.frame_number();
        if log.contains_key(&frame) {
            return Err(ConsistencyError::DuplicateState { track_id, frame });
        }
        log.insert(frame, state);
        Ok(())
    }

    /// Whether the track has a log.
    pub fn contains_track(&self, track_id: u64) -> bool {
        self.logs.contains_key(&track_id)
    }

    /// Number of tracks with a log.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }
}
