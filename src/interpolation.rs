//! The temporal gap-interpolation engine.
//!
//! [`TrackStateInterpolator`] turns each tick into one packet per requested
//! timestamp and feeds them through two coupled anchor/gap/anchor state
//! machines, one over homography validity and one over track completeness.
//! Packets are released downstream, in order, once both machines are done
//! with them.

mod config;
mod error;
mod history_cache;
mod homography_manager;
mod inputs;
mod interpolator;
mod manager;
mod output;
mod packet;
mod track_manager;

pub use config::InterpolatorConfig;
pub use error::{ConfigError, ConsistencyError, StepError};
pub use history_cache::HistoryCache;
pub use inputs::StepInputs;
pub use interpolator::TrackStateInterpolator;
pub use manager::InterpStatus;
pub use output::{OutputPacket, OutputSink};
