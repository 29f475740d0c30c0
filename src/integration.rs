//! Integration module for embedding the interpolator in a dataflow scheduler.
//!
//! The scheduler assembles each tick with [`StepInputsBuilder`] and hands it
//! to an [`InterpolationPipeline`], which pushes resolved packets into any
//! [`OutputSink`](crate::interpolation::OutputSink).

mod builder;
mod pipeline;

pub use builder::StepInputsBuilder;
pub use pipeline::{InterpolationPipeline, PipelineStats};
