//! InterpolationPipeline for driving the interpolator from a scheduler.

use tracing::info;

use crate::interpolation::{
    ConfigError, InterpolatorConfig, OutputPacket, OutputSink, StepError, StepInputs,
    TrackStateInterpolator,
};

/// Counts what passes through to the wrapped sink.
struct Counted<'a, S: OutputSink> {
    inner: &'a mut S,
    pushed: u64,
}

impl<S: OutputSink> OutputSink for Counted<'_, S> {
    fn push(&mut self, packet: OutputPacket) {
        self.pushed += 1;
        self.inner.push(packet);
    }
}

/// Running totals over the ticks a pipeline has processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub emitted: u64,
}

/// Bundles a [`TrackStateInterpolator`] with the sink its packets go to.
///
/// This is the shape a dataflow scheduler wants: feed one tick, and
/// whatever the tick resolves lands in the sink.
pub struct InterpolationPipeline<S: OutputSink> {
    interpolator: TrackStateInterpolator,
    sink: S,
    stats: PipelineStats,
}

impl<S: OutputSink> InterpolationPipeline<S> {
    /// Create a pipeline, validating the config.
    pub fn new(config: InterpolatorConfig, sink: S) -> Result<Self, ConfigError> {
        Ok(Self {
            interpolator: TrackStateInterpolator::new(config)?,
            sink,
            stats: PipelineStats::default(),
        })
    }

    /// Create a pipeline with [`InterpolatorConfig::default`].
    pub fn with_default_config(sink: S) -> Result<Self, ConfigError> {
        Self::new(InterpolatorConfig::default(), sink)
    }

    /// Process one tick.
    ///
    /// Returns how many packets reached the sink during the tick. An
    /// incomplete tick still flushes to the sink before failing.
    pub fn process_tick(&mut self, inputs: &StepInputs<'_>) -> Result<usize, StepError> {
        self.stats.ticks += 1;
        let mut sink = Counted {
            inner: &mut self.sink,
            pushed: 0,
        };
        let result = self.interpolator.step(inputs, &mut sink);
        self.stats.emitted += sink.pushed;
        if result.is_err() {
            self.stats.failed_ticks += 1;
        }
        result
    }

    /// Release everything still pending at end of stream.
    pub fn finish(&mut self) -> usize {
        let emitted = self.interpolator.flush(&mut self.sink);
        self.stats.emitted += emitted as u64;
        info!(
            ticks = self.stats.ticks,
            failed = self.stats.failed_ticks,
            emitted = self.stats.emitted,
            "interpolation pipeline finished"
        );
        emitted
    }

    /// Totals so far.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// The sink packets are pushed into.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn interpolator(&self) -> &TrackStateInterpolator {
        &self.interpolator
    }

    pub fn interpolator_mut(&mut self) -> &mut TrackStateInterpolator {
        &mut self.interpolator
    }

    /// Consume the pipeline, keeping the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Homography;
    use crate::integration::StepInputsBuilder;
    use crate::tracking::{Timestamp, Track};
    use std::sync::mpsc;

    #[test]
    fn test_pipeline_counts_ticks_and_flushes_on_finish() {
        let sink: Vec<OutputPacket> = Vec::new();
        let mut pipeline = InterpolationPipeline::with_default_config(sink).unwrap();
        let tracks: Vec<Track> = Vec::new();

        for frame in 0..3 {
            let inputs = StepInputsBuilder::new()
                .tracks(&tracks)
                .img_to_ref(Homography::identity())
                .ref_to_world(Homography::identity())
                .timestamp(Timestamp::new(f64::from(frame) * 1000.0, frame))
                .gsd(0.1)
                .build();
            pipeline.process_tick(&inputs).unwrap();
        }
        assert!(pipeline.process_tick(&StepInputs::default()).is_err());
        pipeline.finish();

        let stats = pipeline.stats();
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.failed_ticks, 1);
        assert_eq!(stats.emitted, 3);
        assert_eq!(pipeline.into_sink().len(), 3);
    }

    #[test]
    fn test_channel_sink() {
        let (tx, rx) = mpsc::channel::<OutputPacket>();
        let mut pipeline = InterpolationPipeline::with_default_config(tx).unwrap();
        let tracks: Vec<Track> = Vec::new();
        let inputs = StepInputsBuilder::new()
            .tracks(&tracks)
            .img_to_ref_absent()
            .ref_to_world(Homography::identity())
            .timestamp(Timestamp::new(0.0, 0))
            .gsd(0.1)
            .build();

        assert_eq!(pipeline.process_tick(&inputs), Ok(1));
        drop(pipeline);
        assert_eq!(rx.iter().count(), 1);
    }
}
