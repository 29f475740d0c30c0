//! Shared anchor bookkeeping for the two interpolation state machines.

use crate::geometry::{Homography, MathError};
use crate::interpolation::history_cache::HistoryCache;
use crate::interpolation::packet::PendingPackets;

/// Where a manager stands after seeing a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpStatus {
    /// No anchor; the packet has nothing to wait for.
    #[default]
    Nil,
    /// The packet became (or replaced) the leading anchor.
    Anchor0,
    /// The packet is incomplete and waits behind anchor_0.
    Gap,
    /// The packet closes a gap; interpolation can run.
    Anchor1,
}

impl std::fmt::Display for InterpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Nil => "nil",
            Self::Anchor0 => "anchor_0",
            Self::Gap => "gap",
            Self::Anchor1 => "anchor_1",
        };
        f.write_str(name)
    }
}

/// Frame numbers of the anchors and of the gap between them.
///
/// Managers refer to packets by frame number; the packets themselves live
/// in the controller's pending buffer.
#[derive(Debug, Clone, Default)]
pub(crate) struct Anchors {
    pub anchor_0: Option<u32>,
    pub anchor_1: Option<u32>,
    /// Contiguous, increasing frames strictly between the anchors.
    pub gap_frames: Vec<u32>,
}

impl Anchors {
    pub fn status(&self) -> InterpStatus {
        // most restrictive first
        if self.anchor_1.is_some() {
            InterpStatus::Anchor1
        } else if !self.gap_frames.is_empty() {
            InterpStatus::Gap
        } else if self.anchor_0.is_some() {
            InterpStatus::Anchor0
        } else {
            InterpStatus::Nil
        }
    }

    /// Both anchors when a gap is ready to interpolate.
    pub fn bracket(&self) -> Option<(u32, u32)> {
        match (self.anchor_0, self.anchor_1) {
            (Some(a0), Some(a1)) if !self.gap_frames.is_empty() => Some((a0, a1)),
            _ => None,
        }
    }

    /// anchor_1 becomes the new anchor_0; the gap is forgotten.
    pub fn advance(&mut self) -> Option<u32> {
        if let Some(a1) = self.anchor_1.take() {
            self.anchor_0 = Some(a1);
        }
        self.gap_frames.clear();
        self.anchor_0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Borrowed engine state a manager works against for one packet.
pub(crate) struct InterpolationContext<'a> {
    pub pending: &'a mut PendingPackets,
    pub cache: &'a mut HistoryCache,
    /// Held constant across any one interpolation window.
    pub ref_to_world: &'a Homography,
    pub timestamp_to_seconds: f64,
}

/// The uniform face of the homography and track state machines.
pub(crate) trait InterpolationManager {
    /// Feed the pending packet at `frame` through the state machine.
    fn record_and_classify(&mut self, frame: u32, ctx: &mut InterpolationContext<'_>)
    -> InterpStatus;

    /// Fill the gap between anchor_0 and anchor_1, then slide the window.
    fn interpolate(&mut self, ctx: &mut InterpolationContext<'_>) -> Result<(), MathError>;

    fn status(&self) -> InterpStatus;

    fn reset(&mut self);
}
