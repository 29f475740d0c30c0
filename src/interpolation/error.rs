use thiserror::Error;

/// Invalid interpolator setup; fatal at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("timestamp_to_seconds must be finite and positive, got {0}")]
    InvalidTimestampScale(f64),
    #[error("gap_buffer_max_length must be at least one frame")]
    ZeroGapBuffer,
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A tick could not be processed normally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// Pending packets were flushed; the next complete tick resumes normally.
    #[error("missing step inputs: {}", .missing.join(", "))]
    InputIncomplete { missing: Vec<&'static str> },
}

/// A synthesized state could not be recorded in the history cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("track {track_id} already has a state at frame {frame}")]
    DuplicateState { track_id: u64, frame: u32 },
    #[error("track {track_id} is not in the history cache")]
    UnknownTrack { track_id: u64 },
}
