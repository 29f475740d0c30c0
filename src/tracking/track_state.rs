use nalgebra::Vector3;

use crate::geometry::Rect;
use crate::tracking::timestamp::Timestamp;

/// The detection an upstream tracker associated with a state.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageObject {
    pub bbox: Rect,
    /// Image position of the object (box center).
    pub image_location: (f64, f64),
    pub area: f64,
}

impl ImageObject {
    pub fn from_bbox(bbox: Rect) -> Self {
        Self {
            bbox,
            image_location: bbox.center(),
            area: bbox.area(),
        }
    }
}

/// One frame's snapshot of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    pub timestamp: Timestamp,
    /// World location; z is zero on the ground plane.
    pub location: Vector3<f64>,
    /// World velocity in world units per second.
    pub velocity: Vector3<f64>,
    /// Image bounding box
    pub bbox: Rect,
    pub image_object: Option<ImageObject>,
}

impl TrackState {
    pub fn new(
        timestamp: Timestamp,
        location: Vector3<f64>,
        velocity: Vector3<f64>,
        bbox: Rect,
    ) -> Self {
        Self {
            timestamp,
            location,
            velocity,
            bbox,
            image_object: None,
        }
    }

    /// Attach the detection whose box is the state's own box.
    pub fn with_detection(mut self) -> Self {
        self.image_object = Some(ImageObject::from_bbox(self.bbox));
        self
    }

    pub fn with_image_object(mut self, object: ImageObject) -> Self {
        self.image_object = Some(object);
        self
    }

    #[inline]
    pub fn frame_number(&self) -> u32 {
        self.timestamp.frame_number
    }
}
