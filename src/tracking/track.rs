//! Track identity plus its frame-ordered state history.

use crate::tracking::track_state::TrackState;

/// A tracked object.
///
/// `Clone` produces a fully independent copy; the interpolator only ever
/// rewrites histories of the copies it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: u64,
    /// Strictly increasing by frame number
    history: Vec<TrackState>,
}

impl Track {
    /// Create a track with an empty history.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            history: Vec::new(),
        }
    }

    /// Create a track from an arbitrary list of states.
    ///
    /// States are ordered by frame number; when two share a frame the first
    /// one wins.
    pub fn from_history(id: u64, mut states: Vec<TrackState>) -> Self {
        states.sort_by_key(|s| s.frame_number());
        states.dedup_by_key(|s| s.frame_number());
        Self {
            id,
            history: states,
        }
    }

    /// Id assigned by the upstream tracker.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn history(&self) -> &[TrackState] {
        &self.history
    }

    pub fn last_state(&self) -> Option<&TrackState> {
        self.history.last()
    }

    pub(crate) fn reset_history(&mut self, history: Vec<TrackState>) {
        self.history = history;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::tracking::Timestamp;
    use nalgebra::Vector3;

    fn state(frame: u32, x: f64) -> TrackState {
        TrackState::new(
            Timestamp::new(frame as f64, frame),
            Vector3::new(x, 0.0, 0.0),
            Vector3::zeros(),
            Rect::new(x, 0.0, 10.0, 10.0),
        )
    }

    #[test]
    fn test_from_history_orders_and_dedups() {
        let track = Track::from_history(7, vec![state(3, 3.0), state(1, 1.0), state(3, 9.0)]);
        let frames: Vec<u32> = track.history().iter().map(|s| s.frame_number()).collect();
        assert_eq!(frames, vec![1, 3]);
        assert_eq!(track.last_state().unwrap().location.x, 3.0);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = Track::from_history(2, vec![state(0, 0.0)]);
        let mut copy = original.clone();
        copy.reset_history(vec![state(0, 0.0), state(1, 1.0)]);
        assert_eq!(original.history().len(), 1);
        assert_eq!(copy.history().len(), 2);
    }
}
