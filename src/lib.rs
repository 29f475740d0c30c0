//! Temporal gap interpolation for video tracking pipelines.
//!
//! The engine consumes per-frame tracking results that may be missing frames
//! (dropped detections, failed homographies, upsampling requests) and emits
//! one complete packet per requested timestamp, synthesizing homographies and
//! track states for the frames in between two complete anchors.

pub mod geometry;
pub mod integration;
pub mod interpolation;
pub mod tracking;

pub use geometry::{Homography, MathError, PointBlock, Rect};
pub use integration::{InterpolationPipeline, PipelineStats, StepInputsBuilder};
pub use interpolation::{
    ConfigError, ConsistencyError, HistoryCache, InterpStatus, InterpolatorConfig, OutputPacket,
    OutputSink, StepError, StepInputs, TrackStateInterpolator,
};
pub use tracking::{ImageObject, Timestamp, Track, TrackState};
