use std::collections::VecDeque;

use tracing::debug;

use crate::geometry::Homography;
use crate::tracking::{Timestamp, Track};

/// One fully resolved timestamp, as pushed downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPacket {
    /// Independent clones; interpolated states appear only here.
    pub tracks: Vec<Track>,
    pub timestamp: Timestamp,
    /// Image-to-reference homography, possibly synthesized.
    pub homography: Option<Homography>,
    pub ref_to_world: Homography,
    pub gsd: f64,
}

/// Downstream consumer of resolved packets.
///
/// A single tick may push zero, one or many packets; each push is an
/// independent, ordered emission.
pub trait OutputSink {
    /// Take ownership of the next packet in frame order.
    fn push(&mut self, packet: OutputPacket);
}

impl OutputSink for Vec<OutputPacket> {
    fn push(&mut self, packet: OutputPacket) {
        Vec::push(self, packet);
    }
}

impl OutputSink for VecDeque<OutputPacket> {
    fn push(&mut self, packet: OutputPacket) {
        self.push_back(packet);
    }
}

impl OutputSink for std::sync::mpsc::Sender<OutputPacket> {
    fn push(&mut self, packet: OutputPacket) {
        if let Err(err) = self.send(packet) {
            debug!(frame = err.0.timestamp.frame_number, "receiver hung up; dropping packet");
        }
    }
}
