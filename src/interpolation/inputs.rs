use crate::geometry::Homography;
use crate::interpolation::error::StepError;
use crate::tracking::{Timestamp, Track};

/// The values supplied to one scheduler tick.
///
/// Every field is optional on its own; a tick only runs normally when all of
/// them are set. `img_to_ref` distinguishes "not supplied" (`None`) from an
/// explicitly absent homography (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct StepInputs<'a> {
    pub tracks: Option<&'a [Track]>,
    pub img_to_ref: Option<Option<Homography>>,
    pub ref_to_world: Option<Homography>,
    /// Requested output timestamps; the configured live index picks the one
    /// the tracks and homography belong to.
    pub timestamps: Option<Vec<Timestamp>>,
    pub gsd: Option<f64>,
}

/// A tick with every input present.
pub(crate) struct TickInputs<'a> {
    pub tracks: &'a [Track],
    pub img_to_ref: Option<Homography>,
    pub ref_to_world: Homography,
    pub timestamps: &'a [Timestamp],
    pub gsd: f64,
}

impl<'a> StepInputs<'a> {
    /// Names of the inputs this tick is missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.tracks.is_none() {
            missing.push("tracks");
        }
        if self.img_to_ref.is_none() {
            missing.push("img_to_ref");
        }
        if self.ref_to_world.is_none() {
            missing.push("ref_to_world");
        }
        if self.timestamps.is_none() {
            missing.push("timestamps");
        }
        if self.gsd.is_none() {
            missing.push("gsd");
        }
        missing
    }

    pub(crate) fn require(&self) -> Result<TickInputs<'_>, StepError> {
        match (
            self.tracks,
            self.img_to_ref,
            self.ref_to_world,
            self.timestamps.as_deref(),
            self.gsd,
        ) {
            (Some(tracks), Some(img_to_ref), Some(ref_to_world), Some(timestamps), Some(gsd)) => {
                Ok(TickInputs {
                    tracks,
                    img_to_ref,
                    ref_to_world,
                    timestamps,
                    gsd,
                })
            }
            _ => Err(StepError::InputIncomplete {
                missing: self.missing(),
            }),
        }
    }
}
