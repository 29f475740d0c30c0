//! Anchor/gap/anchor state machine over per-frame homography validity.
//!
//! Homographies are interpolated in world coordinates: the canonical
//! reference corners are pushed through both anchors into the world plane,
//! interpolated linearly there, pulled back into the reference plane, and a
//! fresh image-to-reference homography is solved from the four
//! correspondences.

use tracing::{debug, info};

use crate::geometry::{MathError, PointBlock, solve_four_point};
use crate::interpolation::manager::{
    Anchors, InterpStatus, InterpolationContext, InterpolationManager,
};

/// Side of the canonical square used as homography control points.
pub(crate) const CORNER_EXTENT: f64 = 1000.0;

#[derive(Debug, Default)]
pub(crate) struct HomographyManager {
    anchors: Anchors,
}

impl HomographyManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn fill_gap(
        &self,
        anchor_0: u32,
        anchor_1: u32,
        ctx: &mut InterpolationContext<'_>,
    ) -> Result<(), MathError> {
        let h0 = ctx.pending.get(anchor_0).and_then(|p| p.homography);
        let h1 = ctx.pending.get(anchor_1).and_then(|p| p.homography);
        let (Some(h0), Some(h1)) = (h0, h1) else {
            // anchors are only ever set on packets with a homography
            debug_assert!(false, "homography anchor without a homography");
            return Ok(());
        };

        let corners = PointBlock::canonical_corners(CORNER_EXTENT);
        let world_0 = h0.then(ctx.ref_to_world).project(&corners)?;
        let world_1 = h1.then(ctx.ref_to_world).project(&corners)?;
        let world_to_ref = ctx.ref_to_world.try_inverse()?;
        let nframes = f64::from(anchor_1 - anchor_0);

        for &frame in &self.anchors.gap_frames {
            let Some(packet) = ctx.pending.get_mut(frame) else {
                continue;
            };
            if packet.homography.is_some() {
                debug!(frame, "gap frame already has a homography");
                continue;
            }

            let t = f64::from(frame - anchor_0) / nframes;
            let world = world_0.lerp(&world_1, t);
            let reference = world_to_ref.project(&world)?;
            packet.homography = Some(solve_four_point(&corners, &reference)?);
        }
        Ok(())
    }
}

impl InterpolationManager for HomographyManager {
    fn record_and_classify(
        &mut self,
        frame: u32,
        ctx: &mut InterpolationContext<'_>,
    ) -> InterpStatus {
        debug_assert!(
            self.anchors.anchor_1.is_none(),
            "packet recorded before the previous anchor_1 was interpolated"
        );

        let has_h = ctx
            .pending
            .get(frame)
            .is_some_and(|p| p.homography.is_some());

        match (has_h, self.anchors.anchor_0) {
            (false, None) => {
                // nothing to wait for
                if let Some(packet) = ctx.pending.get_mut(frame) {
                    packet.ready.homography = true;
                }
                InterpStatus::Nil
            }
            (false, Some(_)) => {
                self.anchors.gap_frames.push(frame);
                InterpStatus::Gap
            }
            (true, None) => {
                self.anchors.anchor_0 = Some(frame);
                InterpStatus::Anchor0
            }
            (true, Some(old)) if self.anchors.gap_frames.is_empty() => {
                if let Some(packet) = ctx.pending.get_mut(old) {
                    packet.ready.homography = true;
                }
                self.anchors.anchor_0 = Some(frame);
                InterpStatus::Anchor0
            }
            (true, Some(_)) => {
                self.anchors.anchor_1 = Some(frame);
                InterpStatus::Anchor1
            }
        }
    }

    fn interpolate(&mut self, ctx: &mut InterpolationContext<'_>) -> Result<(), MathError> {
        let Some((anchor_0, anchor_1)) = self.anchors.bracket() else {
            debug_assert!(false, "homography interpolation without a bracket");
            return Ok(());
        };

        let result = self.fill_gap(anchor_0, anchor_1, ctx);

        // Release the old anchor and the gap, whether or not every frame got a
        // homography, and hold the new anchor back for the next window.
        for frame in std::iter::once(anchor_0).chain(self.anchors.gap_frames.iter().copied()) {
            if let Some(packet) = ctx.pending.get_mut(frame) {
                packet.ready.homography = true;
            }
        }
        let gap_len = self.anchors.gap_frames.len();
        if let Some(new_anchor) = self.anchors.advance() {
            if let Some(packet) = ctx.pending.get_mut(new_anchor) {
                packet.ready.homography = false;
            }
        }

        if result.is_ok() {
            info!(anchor_0, anchor_1, gap_len, "homography interpolation complete");
        }
        result
    }

    fn status(&self) -> InterpStatus {
        self.anchors.status()
    }

    fn reset(&mut self) {
        self.anchors.reset();
    }
}
