//! Builder for assembling one tick's inputs.

use crate::geometry::Homography;
use crate::interpolation::StepInputs;
use crate::tracking::{Timestamp, Track};

/// Builder for [`StepInputs`].
///
/// Anything not set stays missing, which makes the tick fail with
/// `StepError::InputIncomplete`.
#[derive(Debug, Clone, Default)]
pub struct StepInputsBuilder<'a> {
    inputs: StepInputs<'a>,
}

impl<'a> StepInputsBuilder<'a> {
    /// Start with every input missing.
    pub fn new() -> Self {
        Self::default()
    }

    /// The upstream tracker's live track list.
    pub fn tracks(mut self, tracks: &'a [Track]) -> Self {
        self.inputs.tracks = Some(tracks);
        self
    }

    /// A valid image-to-reference homography for the live timestamp.
    pub fn img_to_ref(mut self, homography: Homography) -> Self {
        self.inputs.img_to_ref = Some(Some(homography));
        self
    }

    /// Mark the image-to-reference homography as explicitly absent this tick.
    pub fn img_to_ref_absent(mut self) -> Self {
        self.inputs.img_to_ref = Some(None);
        self
    }

    /// The reference-to-world homography.
    pub fn ref_to_world(mut self, homography: Homography) -> Self {
        self.inputs.ref_to_world = Some(homography);
        self
    }

    /// Replace the requested output timestamps.
    pub fn timestamps(mut self, timestamps: Vec<Timestamp>) -> Self {
        self.inputs.timestamps = Some(timestamps);
        self
    }

    /// Append one requested output timestamp.
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.inputs
            .timestamps
            .get_or_insert_with(Vec::new)
            .push(timestamp);
        self
    }

    /// Ground sampling distance for the tick.
    pub fn gsd(mut self, gsd: f64) -> Self {
        self.inputs.gsd = Some(gsd);
        self
    }

    /// Finish building.
    pub fn build(self) -> StepInputs<'a> {
        self.inputs
    }
}
