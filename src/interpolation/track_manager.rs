//! Anchor/gap/anchor state machine over track-list completeness.
//!
//! The outer machine brackets whole packets. Inside one bracket each track
//! runs its own smaller machine, because a track may miss only some of the
//! gap frames, or start or end between the outer anchors. A track's bracket
//! is always `defined, undefined+, defined`; only those frames receive
//! synthesized states.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector3;
use ndarray::{Array1, Array2, s};
use tracing::{debug, error, info, warn};

use crate::geometry::{Homography, MathError, PointBlock, Rect};
use crate::interpolation::manager::{
    Anchors, InterpStatus, InterpolationContext, InterpolationManager,
};
use crate::interpolation::packet::Packet;
use crate::tracking::{ImageObject, Timestamp, Track, TrackState};

/// One track at one frame while a gap window is being resolved.
#[derive(Debug, Clone)]
struct InterpolationRecord {
    timestamp: Timestamp,
    /// The packet's homography, possibly synthesized a moment ago.
    homography: Option<Homography>,
    /// The cached state at `timestamp`; `None` means the track is undefined there.
    state: Option<TrackState>,
}

impl InterpolationRecord {
    fn is_defined(&self) -> bool {
        self.state.is_some()
    }

    fn frame(&self) -> u32 {
        self.timestamp.frame_number
    }
}

/// Frame-contiguous records of one track since its last defined frame.
#[derive(Debug)]
struct TrackMemory {
    /// Handle cloned into packets that lack the track.
    track: Track,
    records: Vec<InterpolationRecord>,
}

impl TrackMemory {
    fn new(track: &Track, record: InterpolationRecord) -> Self {
        Self {
            track: track.clone(),
            records: vec![record],
        }
    }

    /// Add the track's record for the next frame.
    ///
    /// Returns true when the record closes a bracket. A defined record that
    /// does not close one restarts the memory, so the first record is always
    /// the bracket's opening anchor.
    fn accept(&mut self, track: &Track, record: InterpolationRecord) -> bool {
        if !record.is_defined() {
            self.records.push(record);
            return false;
        }

        let closes = self.records.first().is_some_and(|r| r.is_defined())
            && self.records.last().is_some_and(|r| !r.is_defined());
        if !closes {
            self.track = track.clone();
            self.records.clear();
        }
        self.records.push(record);
        closes
    }

    /// Records strictly between the two anchors of a closed bracket.
    fn gap_records(&self) -> &[InterpolationRecord] {
        match self.records.len() {
            0..=2 => &[],
            n => &self.records[1..n - 1],
        }
    }
}

/// Synthesized data for one gap frame, before it is written anywhere.
struct Synthesized {
    timestamp: Timestamp,
    location: Vector3<f64>,
    bbox: Rect,
}

#[derive(Debug, Default)]
pub(crate) struct TrackManager {
    anchors: Anchors,
    /// Track ids present in the anchor_0 packet.
    anchor_0_ids: BTreeSet<u64>,
}

impl TrackManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn has_interval_gap(&self, packet: &Packet) -> bool {
        if packet.undefined_count() > 0 {
            return true;
        }
        if self.anchors.anchor_0.is_none() {
            return false;
        }
        track_ids(packet) != self.anchor_0_ids
    }
}

fn track_ids(packet: &Packet) -> BTreeSet<u64> {
    packet.tracks.iter().map(Track::id).collect()
}

impl InterpolationManager for TrackManager {
    fn record_and_classify(
        &mut self,
        frame: u32,
        ctx: &mut InterpolationContext<'_>,
    ) -> InterpStatus {
        debug_assert!(
            self.anchors.anchor_1.is_none(),
            "packet recorded before the previous anchor_1 was interpolated"
        );

        let Some(packet) = ctx.pending.get(frame) else {
            return self.status();
        };
        let has_gap = self.has_interval_gap(packet);
        let no_tracks = packet.tracks.is_empty();
        let ids = track_ids(packet);
        debug!(
            frame,
            tracks = ids.len(),
            undefined = packet.undefined_count(),
            has_gap,
            "classifying packet for track interpolation"
        );

        let mark_ready = |ctx: &mut InterpolationContext<'_>, frame: u32| {
            if let Some(packet) = ctx.pending.get_mut(frame) {
                packet.ready.tracks = true;
            }
        };

        match (has_gap, self.anchors.anchor_0) {
            (true, None) => {
                mark_ready(ctx, frame);
                InterpStatus::Nil
            }
            (true, Some(_)) => {
                self.anchors.gap_frames.push(frame);
                InterpStatus::Gap
            }
            (false, None) if no_tracks => {
                mark_ready(ctx, frame);
                InterpStatus::Nil
            }
            (false, None) => {
                self.anchors.anchor_0 = Some(frame);
                self.anchor_0_ids = ids;
                InterpStatus::Anchor0
            }
            (false, Some(old)) if self.anchors.gap_frames.is_empty() => {
                mark_ready(ctx, old);
                self.anchors.anchor_0 = Some(frame);
                self.anchor_0_ids = ids;
                InterpStatus::Anchor0
            }
            (false, Some(_)) => {
                self.anchors.anchor_1 = Some(frame);
                InterpStatus::Anchor1
            }
        }
    }

    fn interpolate(&mut self, ctx: &mut InterpolationContext<'_>) -> Result<(), MathError> {
        let Some((anchor_0, anchor_1)) = self.anchors.bracket() else {
            debug_assert!(false, "track interpolation without a bracket");
            return Ok(());
        };
        info!(
            anchor_0,
            anchor_1,
            gap_len = self.anchors.gap_frames.len(),
            "interpolating tracks"
        );

        let mut memory: BTreeMap<u64, TrackMemory> = BTreeMap::new();
        if let Some(packet) = ctx.pending.get_mut(anchor_0) {
            packet.ready.tracks = true;
            for track in &packet.tracks {
                let record = InterpolationRecord {
                    timestamp: packet.timestamp,
                    homography: packet.homography,
                    state: ctx.cache.state_at_frame(track.id(), anchor_0).cloned(),
                };
                debug_assert!(record.is_defined(), "track {} undefined at anchor_0", track.id());
                memory.insert(track.id(), TrackMemory::new(track, record));
            }
        }

        let mut first_error = None;
        let frames = self.anchors.gap_frames.iter().copied().chain(std::iter::once(anchor_1));
        for frame in frames {
            if let Err(err) = interpolate_on_packet(frame, &mut memory, ctx) {
                first_error = first_error.or(Some(err));
            }
        }

        if let Some(new_anchor) = self.anchors.advance() {
            if let Some(packet) = ctx.pending.get_mut(new_anchor) {
                packet.ready.tracks = false;
                self.anchor_0_ids = track_ids(packet);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn status(&self) -> InterpStatus {
        self.anchors.status()
    }

    fn reset(&mut self) {
        self.anchors.reset();
        self.anchor_0_ids.clear();
    }
}

/// Push one packet's records into the per-track memories and resolve every
/// bracket the packet closes.
fn interpolate_on_packet(
    frame: u32,
    memory: &mut BTreeMap<u64, TrackMemory>,
    ctx: &mut InterpolationContext<'_>,
) -> Result<(), MathError> {
    let Some(packet) = ctx.pending.get_mut(frame) else {
        return Ok(());
    };
    // As ready as it will ever be; the new anchor_0 is held back afterwards.
    packet.ready.tracks = true;

    let mut seen = BTreeSet::new();
    let mut closed = Vec::new();
    for track in &packet.tracks {
        let id = track.id();
        seen.insert(id);
        let record = InterpolationRecord {
            timestamp: packet.timestamp,
            homography: packet.homography,
            state: ctx.cache.state_at_frame(id, frame).cloned(),
        };
        match memory.get_mut(&id) {
            Some(mem) => {
                if mem.accept(track, record) {
                    debug!(track_id = id, frame, "track bracket closed");
                    closed.push(id);
                }
            }
            None => {
                memory.insert(id, TrackMemory::new(track, record));
            }
        }
    }

    // Keep absent tracks frame-contiguous. The cache may still know the
    // track at this frame if it was re-synchronized after coming back.
    for (&id, mem) in memory.iter_mut() {
        if seen.contains(&id) {
            continue;
        }
        let record = InterpolationRecord {
            timestamp: packet.timestamp,
            homography: packet.homography,
            state: ctx.cache.state_at_frame(id, frame).cloned(),
        };
        let handle = mem.track.clone();
        if mem.accept(&handle, record) {
            debug!(track_id = id, frame, "absent track bracket closed");
            closed.push(id);
        }
    }

    let mut first_error = None;
    for id in closed {
        let Some(mem) = memory.remove(&id) else {
            continue;
        };
        match interpolate_states_for_a_track(id, &mem, ctx) {
            Ok(true) => move_interpolated_states_into_a_track(id, &mem, ctx),
            Ok(false) => {}
            Err(err) => {
                warn!(track_id = id, frame, %err, "track interpolation failed");
                first_error = first_error.or(Some(err));
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Synthesize states for the gap frames of one closed bracket and record
/// them in the history cache.
///
/// Returns `Ok(false)` when the bracket lacks what it needs and is skipped.
/// Nothing is written unless every gap frame could be computed.
fn interpolate_states_for_a_track(
    track_id: u64,
    mem: &TrackMemory,
    ctx: &mut InterpolationContext<'_>,
) -> Result<bool, MathError> {
    let (Some(first), Some(last)) = (mem.records.first(), mem.records.last()) else {
        return Ok(false);
    };
    let (Some(anchor_0), Some(anchor_1)) = (&first.state, &last.state) else {
        return Ok(false);
    };

    let (Some(object_0), Some(object_1)) = (&anchor_0.image_object, &anchor_1.image_object) else {
        warn!(
            track_id,
            from = first.frame(),
            to = last.frame(),
            "bracket endpoint has no image object; skipping track"
        );
        return Ok(false);
    };
    let (Some(h0), Some(h1)) = (first.homography, last.homography) else {
        warn!(
            track_id,
            from = first.frame(),
            to = last.frame(),
            "bracket endpoint has no homography; skipping track"
        );
        return Ok(false);
    };
    let gap = mem.gap_records();
    if let Some(missing) = gap.iter().find(|r| r.homography.is_none()) {
        warn!(track_id, frame = missing.frame(), "gap frame has no homography; skipping track");
        return Ok(false);
    }

    let ref_to_world = ctx.ref_to_world;
    let world_0 = h0
        .then(ref_to_world)
        .project(&PointBlock::from_rect(&object_0.bbox))?;
    let world_1 = h1
        .then(ref_to_world)
        .project(&PointBlock::from_rect(&object_1.bbox))?;
    let nframes = f64::from(last.frame() - first.frame());

    let mut synthesized = Vec::with_capacity(gap.len());
    for record in gap {
        let Some(h) = record.homography else {
            continue;
        };
        let t = f64::from(record.frame() - first.frame()) / nframes;
        let world_box = world_0.lerp(&world_1, t);

        let img_to_world = h.then(ref_to_world);
        let bbox = img_to_world
            .try_inverse()?
            .project(&world_box)?
            .bounding_rect();
        let (cx, cy) = bbox.center();
        let (wx, wy) = img_to_world.project_point(cx, cy)?;

        synthesized.push(Synthesized {
            timestamp: record.timestamp,
            location: Vector3::new(wx, wy, 0.0),
            bbox,
        });
    }

    let velocities = finite_difference_velocities(anchor_0, &synthesized, ctx.timestamp_to_seconds);
    for (s, velocity) in synthesized.into_iter().zip(velocities) {
        let frame = s.timestamp.frame_number;
        let state = TrackState::new(s.timestamp, s.location, velocity, s.bbox)
            .with_image_object(ImageObject::from_bbox(s.bbox));
        if let Err(err) = ctx.cache.add_interpolated_state(track_id, state) {
            error!(track_id, frame, %err, "refusing to overwrite cached state");
            debug_assert!(false, "{err}");
        }
    }
    Ok(true)
}

/// Unsmoothed forward differences of the synthesized locations, starting
/// from the opening anchor's own location.
fn finite_difference_velocities(
    anchor: &TrackState,
    synthesized: &[Synthesized],
    timestamp_to_seconds: f64,
) -> Vec<Vector3<f64>> {
    let n = synthesized.len() + 1;
    let mut locations = Array2::<f64>::zeros((n, 3));
    let mut times = Array1::<f64>::zeros(n);

    let points = std::iter::once((anchor.timestamp.time, &anchor.location))
        .chain(synthesized.iter().map(|s| (s.timestamp.time, &s.location)));
    for (i, (time, location)) in points.enumerate() {
        times[i] = time;
        for k in 0..3 {
            locations[[i, k]] = location[k];
        }
    }

    let steps = &locations.slice(s![1.., ..]) - &locations.slice(s![..-1, ..]);
    let dts = (&times.slice(s![1..]) - &times.slice(s![..-1])) * timestamp_to_seconds;

    steps
        .outer_iter()
        .zip(dts.iter())
        .map(|(step, &dt)| {
            if dt == 0.0 {
                Vector3::zeros()
            } else {
                Vector3::new(step[0], step[1], step[2]) / dt
            }
        })
        .collect()
}

/// Rewrite the history of the track inside every gap packet of a bracket.
///
/// Packets that never listed the track get a clone of its last handle; the
/// caller's tracks are never touched.
fn move_interpolated_states_into_a_track(
    track_id: u64,
    mem: &TrackMemory,
    ctx: &mut InterpolationContext<'_>,
) {
    for record in mem.gap_records() {
        let frame = record.frame();
        let history = ctx.cache.load_history_up_to_frame(track_id, frame);
        let Some(packet) = ctx.pending.get_mut(frame) else {
            continue;
        };

        let index = match packet.tracks.iter().position(|t| t.id() == track_id) {
            Some(index) => index,
            None => {
                debug!(track_id, frame, "adding track clone to packet");
                packet.tracks.push(mem.track.clone());
                packet.defined_at_ts.push(false);
                packet.tracks.len() - 1
            }
        };
        packet.tracks[index].reset_history(history);
        packet.defined_at_ts[index] = true;
    }
}
