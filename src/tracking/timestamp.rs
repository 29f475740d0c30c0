/// A frame timestamp: raw time plus the frame number it belongs to.
///
/// `time` is in whatever unit the upstream source uses; the interpolator
/// converts differences to seconds with its configured scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamp {
    pub time: f64,
    pub frame_number: u32,
}

impl Timestamp {
    pub fn new(time: f64, frame_number: u32) -> Self {
        Self { time, frame_number }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame {} @ {}", self.frame_number, self.time)
    }
}
