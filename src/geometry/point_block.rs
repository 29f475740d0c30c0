use nalgebra::Matrix3x4;

use crate::geometry::MathError;
use crate::geometry::rect::Rect;

/// Four planar points stored column-wise in homogeneous coordinates.
///
/// Every interpolation in the engine moves exactly four points at a time
/// (reference corners or box corners), so the block is a fixed 3x4 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointBlock(Matrix3x4<f64>);

impl PointBlock {
    /// Build a block from four Euclidean points (weight 1).
    pub fn from_points(points: [(f64, f64); 4]) -> Self {
        let mut m = Matrix3x4::zeros();
        for (column, (x, y)) in points.into_iter().enumerate() {
            m[(0, column)] = x;
            m[(1, column)] = y;
            m[(2, column)] = 1.0;
        }
        Self(m)
    }

    /// The square `(0,0) (e,0) (e,e) (0,e)`.
    pub fn canonical_corners(extent: f64) -> Self {
        Self::from_points([(0.0, 0.0), (extent, 0.0), (extent, extent), (0.0, extent)])
    }

    /// The four corners of a box.
    pub fn from_rect(rect: &Rect) -> Self {
        Self::from_points(rect.corners())
    }

    /// Wrap a raw 3x4 block.
    pub fn from_matrix(m: Matrix3x4<f64>) -> Self {
        Self(m)
    }

    /// The underlying homogeneous block.
    pub fn as_matrix(&self) -> &Matrix3x4<f64> {
        &self.0
    }

    /// Divide every column by its weight.
    ///
    /// Fails without touching the block if any weight is exactly zero.
    pub fn normalize_homogeneous(&mut self) -> Result<(), MathError> {
        if let Some(column) = (0..4).find(|&c| self.0[(2, c)] == 0.0) {
            return Err(MathError::ZeroWeight { column });
        }
        for c in 0..4 {
            let w = self.0[(2, c)];
            self.0[(0, c)] /= w;
            self.0[(1, c)] /= w;
            self.0[(2, c)] = 1.0;
        }
        Ok(())
    }

    /// Consuming form of [`normalize_homogeneous`](Self::normalize_homogeneous).
    pub fn normalized(mut self) -> Result<Self, MathError> {
        self.normalize_homogeneous()?;
        Ok(self)
    }

    /// Linear interpolation `self + (other - self) * t`.
    ///
    /// Both blocks are expected to be normalized; the result then is too.
    pub fn lerp(&self, other: &PointBlock, t: f64) -> PointBlock {
        PointBlock(self.0 + (other.0 - self.0) * t)
    }

    /// Euclidean coordinates of one column (assumes a normalized block).
    pub fn point(&self, column: usize) -> (f64, f64) {
        (self.0[(0, column)], self.0[(1, column)])
    }

    /// All four columns as Euclidean points.
    pub fn points(&self) -> [(f64, f64); 4] {
        [self.point(0), self.point(1), self.point(2), self.point(3)]
    }

    /// Smallest axis-aligned box holding all four points.
    pub fn bounding_rect(&self) -> Rect {
        let xs = self.0.row(0);
        let ys = self.0.row(1);
        Rect::from_tlbr(xs.min(), ys.min(), xs.max(), ys.max())
    }
}
