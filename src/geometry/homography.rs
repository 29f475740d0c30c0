//! Homographies between image, reference and world planes.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::geometry::MathError;
use crate::geometry::point_block::PointBlock;

/// A 3x3 projective transform between two planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl Homography {
    /// The identity mapping.
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Wrap a raw 3x3 matrix.
    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        Self(m)
    }

    /// Build from nine coefficients in row-major order.
    pub fn from_rows(rows: [f64; 9]) -> Self {
        Self(Matrix3::from_row_slice(&rows))
    }

    /// Uniform scaling about the origin.
    pub fn scaling(factor: f64) -> Self {
        Self(Matrix3::new(factor, 0.0, 0.0, 0.0, factor, 0.0, 0.0, 0.0, 1.0))
    }

    /// Pure translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self(Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0))
    }

    /// The underlying 3x3 matrix.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Composition: apply `self` first, then `next`.
    pub fn then(&self, next: &Homography) -> Homography {
        Homography(next.0 * self.0)
    }

    /// Inverse mapping, or `SingularHomography`.
    pub fn try_inverse(&self) -> Result<Homography, MathError> {
        self.0
            .try_inverse()
            .map(Homography)
            .ok_or(MathError::SingularHomography)
    }

    /// Map a point block without normalizing the result.
    pub fn transform(&self, block: &PointBlock) -> PointBlock {
        PointBlock::from_matrix(self.0 * block.as_matrix())
    }

    /// Map a point block and normalize it back to unit weight.
    pub fn project(&self, block: &PointBlock) -> Result<PointBlock, MathError> {
        self.transform(block).normalized()
    }

    /// Map a single Euclidean point.
    pub fn project_point(&self, x: f64, y: f64) -> Result<(f64, f64), MathError> {
        let p = self.0 * Vector3::new(x, y, 1.0);
        if p.z == 0.0 {
            return Err(MathError::ZeroWeight { column: 0 });
        }
        Ok((p.x / p.z, p.y / p.z))
    }
}

/// Exact homography taking each column of `src` onto the matching column of
/// `dst`.
///
/// With exactly four correspondences the eight unknowns (h33 fixed at 1) are
/// solved directly from an 8x8 linear system; no least squares is involved.
pub fn solve_four_point(src: &PointBlock, dst: &PointBlock) -> Result<Homography, MathError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (i, ((x, y), (u, v))) in src.points().into_iter().zip(dst.points()).enumerate() {
        let r = 2 * i;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let h = a
        .lu()
        .solve(&b)
        .ok_or(MathError::DegenerateCorrespondence)?;
    if h.iter().any(|c| !c.is_finite()) {
        return Err(MathError::DegenerateCorrespondence);
    }

    Ok(Homography(Matrix3::new(
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
    )))
}
