//! Parametrized planar warps
//!
//! Every warp stores a 3x3 homogeneous matrix and exposes a minimal parameter
//! vector, the Jacobian of the warped coordinate with respect to those
//! parameters and the three update rules used by the alignment algorithms.
//!
//! A good overview of the supported motions is given in
//! Szeliski, "Image alignment and stitching: A tutorial", section 2.1.

pub mod affine;
pub mod dynamic;
pub mod euclidean;
pub mod perspective;
pub mod similarity;
pub mod translation;

pub use affine::AffineWarp;
pub use dynamic::DynWarp;
pub use euclidean::EuclideanWarp;
pub use perspective::PerspectiveWarp;
pub use similarity::SimilarityWarp;
pub use translation::TranslationWarp;

use nalgebra::{Matrix2, Matrix3, SMatrix, SVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 2D image coordinate. Integer values address pixel centers.
pub type Point = Vector2<f64>;

/// Parameter vector of a warp with `N` degrees of freedom.
pub type Params<const N: usize> = SVector<f64, N>;

/// Jacobian of the warped coordinate with respect to the parameters (2 x N).
pub type Jacobian<const N: usize> = SMatrix<f64, 2, N>;

/// Gauss-Newton Hessian approximation (N x N).
pub type Hessian<const N: usize> = SMatrix<f64, N, N>;

/// Steepest descent image entry of a single pixel (1 x N).
pub type PixelSdi<const N: usize> = SMatrix<f64, 1, N>;

/// Supported motion models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarpMode {
    Translation,
    Euclidean,
    Similarity,
    Affine,
    Perspective,
}

impl WarpMode {
    pub const ALL: [WarpMode; 5] = [
        WarpMode::Translation,
        WarpMode::Euclidean,
        WarpMode::Similarity,
        WarpMode::Affine,
        WarpMode::Perspective,
    ];

    /// Degrees of freedom of the motion model
    pub fn num_parameters(&self) -> usize {
        match self {
            WarpMode::Translation => 2,
            WarpMode::Euclidean => 3,
            WarpMode::Similarity => 4,
            WarpMode::Affine => 6,
            WarpMode::Perspective => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WarpMode::Translation => "translation",
            WarpMode::Euclidean => "euclidean",
            WarpMode::Similarity => "similarity",
            WarpMode::Affine => "affine",
            WarpMode::Perspective => "perspective",
        }
    }

    /// Whether mapping a point requires the division by the homogeneous coordinate
    pub fn is_perspective(&self) -> bool {
        matches!(self, WarpMode::Perspective)
    }
}

impl fmt::Display for WarpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WarpMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "translation" => Ok(WarpMode::Translation),
            "euclidean" => Ok(WarpMode::Euclidean),
            "similarity" => Ok(WarpMode::Similarity),
            "affine" => Ok(WarpMode::Affine),
            "perspective" | "homography" => Ok(WarpMode::Perspective),
            other => Err(anyhow::anyhow!("Unknown warp mode: {}", other)),
        }
    }
}

/// Anything that maps image coordinates of one frame into another.
pub trait Transform2D {
    fn apply(&self, p: &Point) -> Point;
}

/// A planar warp with `N` parameters.
///
/// Implementors only provide the matrix/parameter mapping and the Jacobian,
/// the update rules and level rescaling are derived from the matrix form.
pub trait Warp<const N: usize>: Transform2D + Clone + fmt::Debug + Default + Send + Sync {
    const MODE: WarpMode;

    fn matrix(&self) -> Matrix3<f64>;

    fn set_matrix(&mut self, m: Matrix3<f64>);

    fn parameters(&self) -> Params<N>;

    fn set_parameters(&mut self, p: &Params<N>);

    /// Jacobian evaluated at `p` under the current parameters.
    fn jacobian(&self, p: &Point) -> Jacobian<N>;

    fn to_dynamic(&self) -> DynWarp;

    /// Returns `None` if `w` holds a different motion model.
    fn from_dynamic(w: &DynWarp) -> Option<Self>;

    fn identity() -> Self {
        Self::default()
    }

    fn set_identity(&mut self) {
        self.set_matrix(Matrix3::identity());
    }

    fn from_parameters(p: &Params<N>) -> Self {
        let mut w = Self::identity();
        w.set_parameters(p);
        w
    }

    fn num_parameters(&self) -> usize {
        N
    }

    /// `p <- p + delta`
    fn update_forward_additive(&mut self, delta: &Params<N>) {
        let p = self.parameters() + delta;
        self.set_parameters(&p);
    }

    /// `M <- M * M(delta)`
    fn update_forward_compositional(&mut self, delta: &Params<N>) {
        let d = Self::from_parameters(delta);
        self.set_matrix(self.matrix() * d.matrix());
    }

    /// `M <- M * M(delta)^-1`
    fn update_inverse_compositional(&mut self, delta: &Params<N>) {
        let d = Self::from_parameters(delta);
        match invert_planar(&d.matrix(), Self::MODE) {
            Some(inv) => self.set_matrix(self.matrix() * inv),
            None => tracing::warn!(
                mode = %Self::MODE,
                "Skipping inverse compositional update, incremental warp is not invertible"
            ),
        }
    }

    /// Inverse motion, `None` if the matrix is singular.
    fn inverse(&self) -> Option<Self> {
        invert_planar(&self.matrix(), Self::MODE).map(|m| {
            let mut w = Self::identity();
            w.set_matrix(m);
            w
        })
    }

    /// Transfer the warp between pyramid levels.
    ///
    /// Positive `num_levels` moves towards finer levels (translations grow by
    /// `2^num_levels`), negative towards coarser ones.
    fn scaled(&self, num_levels: i32) -> Self {
        let mut w = self.clone();
        w.set_matrix(scale_matrix(&self.matrix(), 2f64.powi(num_levels)));
        w
    }
}

/// `S * M * S^-1` with `S = diag(s, s, 1)`.
pub fn scale_matrix(m: &Matrix3<f64>, s: f64) -> Matrix3<f64> {
    let mut r = *m;
    r[(0, 2)] *= s;
    r[(1, 2)] *= s;
    r[(2, 0)] /= s;
    r[(2, 1)] /= s;
    r
}

/// Map a point through a homogeneous matrix.
///
/// Sub-perspective motions keep the third row at `[0, 0, 1]` so the
/// normalization is skipped for them.
pub fn transform_point(m: &Matrix3<f64>, p: &Point, perspective: bool) -> Point {
    let x = m * Vector3::new(p.x, p.y, 1.0);
    if perspective {
        Point::new(x.x / x.z, x.y / x.z)
    } else {
        Point::new(x.x, x.y)
    }
}

/// Invert a planar motion matrix.
///
/// Sub-perspective motions are inverted block-wise: the 2x2 linear part is
/// inverted directly and the translation is back-substituted.
pub fn invert_planar(m: &Matrix3<f64>, mode: WarpMode) -> Option<Matrix3<f64>> {
    if mode.is_perspective() {
        return m.try_inverse();
    }

    let a = Matrix2::new(m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]);
    let det = a.determinant();
    if !det.is_finite() || det.abs() <= f64::EPSILON {
        return None;
    }
    let a_inv = Matrix2::new(a[(1, 1)], -a[(0, 1)], -a[(1, 0)], a[(0, 0)]) / det;
    let t = a_inv * Vector2::new(m[(0, 2)], m[(1, 2)]);

    Some(Matrix3::new(
        a_inv[(0, 0)],
        a_inv[(0, 1)],
        -t.x,
        a_inv[(1, 0)],
        a_inv[(1, 1)],
        -t.y,
        0.0,
        0.0,
        1.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_warp_mode_names_roundtrip() {
        for mode in WarpMode::ALL {
            assert_eq!(mode.name().parse::<WarpMode>().unwrap(), mode);
        }
        assert_eq!("Homography".parse::<WarpMode>().unwrap(), WarpMode::Perspective);
        assert!("shear".parse::<WarpMode>().is_err());
    }

    #[test]
    fn test_num_parameters() {
        let counts: Vec<usize> = WarpMode::ALL.iter().map(|m| m.num_parameters()).collect();
        assert_eq!(counts, vec![2, 3, 4, 6, 8]);
    }

    #[test]
    fn test_invert_planar_matches_general_inverse() {
        let m = Matrix3::new(1.1, -0.2, 5.0, 0.3, 0.9, -2.0, 0.0, 0.0, 1.0);
        let block = invert_planar(&m, WarpMode::Affine).unwrap();
        let general = m.try_inverse().unwrap();
        assert_relative_eq!(block, general, epsilon = 1e-12);
    }

    #[test]
    fn test_invert_planar_singular() {
        let m = Matrix3::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0);
        assert!(invert_planar(&m, WarpMode::Affine).is_none());
    }

    #[test]
    fn test_scale_matrix_translation() {
        let m = Matrix3::new(1.0, 0.0, 3.0, 0.0, 1.0, -4.0, 0.0, 0.0, 1.0);
        let s = scale_matrix(&m, 4.0);
        assert_relative_eq!(s[(0, 2)], 12.0);
        assert_relative_eq!(s[(1, 2)], -16.0);
        assert_relative_eq!(s[(0, 0)], 1.0);
    }
}
