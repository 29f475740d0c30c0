//! The packet pipeline controller.

use tracing::{debug, info, warn};

use crate::interpolation::config::InterpolatorConfig;
use crate::interpolation::error::{ConfigError, StepError};
use crate::interpolation::history_cache::HistoryCache;
use crate::interpolation::homography_manager::HomographyManager;
use crate::interpolation::inputs::{StepInputs, TickInputs};
use crate::interpolation::manager::{InterpStatus, InterpolationContext, InterpolationManager};
use crate::interpolation::output::{OutputPacket, OutputSink};
use crate::interpolation::packet::{Packet, PendingPackets};
use crate::interpolation::track_manager::TrackManager;

/// Fills homography and track gaps in a stream of tick results and emits
/// every requested timestamp, in order, once its data is complete.
///
/// One instance owns its pending buffer and history cache; calls must be
/// serialized by the caller.
pub struct TrackStateInterpolator {
    config: InterpolatorConfig,
    pending: PendingPackets,
    history_cache: HistoryCache,
    homography_manager: HomographyManager,
    track_manager: TrackManager,
}

impl TrackStateInterpolator {
    pub fn new(config: InterpolatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            pending: PendingPackets::default(),
            history_cache: HistoryCache::new(),
            homography_manager: HomographyManager::new(),
            track_manager: TrackManager::new(),
        })
    }

    pub fn config(&self) -> &InterpolatorConfig {
        &self.config
    }

    /// Number of packets buffered behind an open gap.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn history_cache(&self) -> &HistoryCache {
        &self.history_cache
    }

    pub fn homography_status(&self) -> InterpStatus {
        self.homography_manager.status()
    }

    pub fn track_status(&self) -> InterpStatus {
        self.track_manager.status()
    }

    /// Drop everything pending, the history cache and both managers' anchors.
    ///
    /// Afterwards the instance behaves exactly like a freshly built one.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.history_cache.clear();
        self.homography_manager.reset();
        self.track_manager.reset();
    }

    /// Run one scheduler tick.
    ///
    /// Returns the number of packets pushed to `sink`, which may be zero
    /// while a gap is open. Missing inputs flush every pending packet first
    /// and then fail the tick; the next complete tick resumes normally.
    pub fn step<S: OutputSink + ?Sized>(
        &mut self,
        inputs: &StepInputs<'_>,
        sink: &mut S,
    ) -> Result<usize, StepError> {
        let tick = match inputs.require() {
            Ok(tick) => tick,
            Err(err) => {
                if self.config.enabled {
                    warn!(%err, pending = self.pending.len(), "flushing on incomplete tick");
                    self.flush(sink);
                }
                return Err(err);
            }
        };

        if tick.timestamps.is_empty() {
            warn!("tick carries no timestamps; nothing to do");
            return Ok(0);
        }

        if !self.config.enabled {
            return Ok(self.copy_inputs_to_outputs(&tick, sink));
        }

        let pinned = self.pending.track_ids();
        self.history_cache.synchronize(tick.tracks, &pinned);

        let mut emitted = 0;
        for packet in self.to_packets(&tick) {
            emitted += self.process_packet(packet, sink);
        }
        Ok(emitted)
    }

    /// Mark every pending packet complete, emit all of them in order and
    /// return both managers to their initial state.
    pub fn flush<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        self.pending.mark_all_complete();
        let emitted = self.emit_and_clear(sink);
        self.homography_manager.reset();
        self.track_manager.reset();
        if emitted > 0 {
            info!(emitted, "flushed pending packets");
        }
        emitted
    }

    /// Pass-through used while interpolation is disabled.
    fn copy_inputs_to_outputs<S: OutputSink + ?Sized>(
        &self,
        tick: &TickInputs<'_>,
        sink: &mut S,
    ) -> usize {
        let live = self.config.clipped_live_index(tick.timestamps.len());
        sink.push(OutputPacket {
            tracks: tick.tracks.to_vec(),
            timestamp: tick.timestamps[live],
            homography: tick.img_to_ref,
            ref_to_world: tick.ref_to_world,
            gsd: tick.gsd,
        });
        1
    }

    /// One packet per requested timestamp; only the live slot carries the
    /// tick's tracks and homography.
    fn to_packets(&self, tick: &TickInputs<'_>) -> Vec<Packet> {
        let live = self.config.clipped_live_index(tick.timestamps.len());
        if live != self.config.live_index {
            debug!(
                configured = self.config.live_index,
                clipped = live,
                "live index clipped to timestamp vector"
            );
        }

        tick.timestamps
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| {
                if i == live {
                    Packet::live(
                        &self.history_cache,
                        tick.tracks.to_vec(),
                        timestamp,
                        tick.img_to_ref,
                        tick.ref_to_world,
                        tick.gsd,
                    )
                } else {
                    Packet::placeholder(timestamp, tick.ref_to_world, tick.gsd)
                }
            })
            .collect()
    }

    fn process_packet<S: OutputSink + ?Sized>(&mut self, packet: Packet, sink: &mut S) -> usize {
        let frame = packet.frame();
        let ref_to_world = packet.ref_to_world;
        let mut emitted = 0;

        if let Some(newest) = self.pending.newest_frame() {
            if frame <= newest {
                warn!(frame, newest, "frame number went backwards; restarting");
                emitted += self.flush(sink);
            }
        }

        self.pending.push(packet);
        let mut ctx = InterpolationContext {
            pending: &mut self.pending,
            cache: &mut self.history_cache,
            ref_to_world: &ref_to_world,
            timestamp_to_seconds: self.config.timestamp_to_seconds,
        };

        let h_status = self.homography_manager.record_and_classify(frame, &mut ctx);
        let t_status = self.track_manager.record_and_classify(frame, &mut ctx);
        debug!(frame, homography = %h_status, tracks = %t_status, "packet classified");

        if h_status == InterpStatus::Nil && t_status == InterpStatus::Nil {
            // nothing is waiting on anything
            self.pending.mark_all_complete();
            return emitted + self.emit_and_clear(sink);
        }

        if h_status == InterpStatus::Anchor1 {
            if let Err(err) = self.homography_manager.interpolate(&mut ctx) {
                warn!(frame, %err, "homography interpolation failed");
            }
        }

        if t_status == InterpStatus::Anchor1 {
            if let Err(err) = self.track_manager.interpolate(&mut ctx) {
                warn!(frame, %err, "track interpolation failed");
            }
            return emitted + self.emit_and_clear(sink);
        }

        let span = self.pending.span();
        if span > self.config.gap_buffer_max_length {
            info!(
                frame,
                span,
                limit = self.config.gap_buffer_max_length,
                "gap buffer timed out"
            );
            return emitted + self.flush(sink);
        }

        emitted
    }

    /// Push every ready packet downstream in arrival order.
    fn emit_and_clear<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let ready = self.pending.take_ready();
        let count = ready.len();
        for packet in ready {
            debug!(frame = packet.frame(), tracks = packet.tracks.len(), "emitting packet");
            sink.push(packet.into_output());
        }
        count
    }
}
