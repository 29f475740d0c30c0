mod timestamp;
mod track;
mod track_state;

pub use timestamp::Timestamp;
pub use track::Track;
pub use track_state::{ImageObject, TrackState};
