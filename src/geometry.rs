//! Planar projective geometry used by the interpolation managers.
//!
//! Everything here is pure and stateless: homography composition and
//! inversion, homogeneous point blocks, and the exact four-point solve.

mod homography;
mod point_block;
mod rect;

pub use homography::{Homography, solve_four_point};
pub use point_block::PointBlock;
pub use rect::Rect;

use thiserror::Error;

/// Failures raised while projecting points between planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    /// A projected point landed on the line at infinity.
    #[error("homogeneous point in column {column} has zero weight")]
    ZeroWeight { column: usize },
    /// The homography has no inverse.
    #[error("homography is singular")]
    SingularHomography,
    /// The four correspondences do not determine a homography.
    #[error("four-point correspondence is degenerate")]
    DegenerateCorrespondence,
}
