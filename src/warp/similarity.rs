use super::{transform_point, DynWarp, Jacobian, Params, Point, Transform2D, Warp, WarpMode};
use nalgebra::{Matrix3, Vector4};

/// Rotation, uniform scale and translation.
///
/// Parameters are `(tx, ty, a, b)` with the linear part
///
/// ```text
/// | 1+a  -b |
/// |  b  1+a |
/// ```
///
/// which keeps the motion linear in its parameters. The canonical form
/// `(tx, ty, theta, scale)` is available through
/// [`SimilarityWarp::parameters_canonical`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWarp {
    m: Matrix3<f64>,
}

impl Default for SimilarityWarp {
    fn default() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }
}

impl SimilarityWarp {
    /// Build from the canonical representation.
    pub fn from_canonical(tx: f64, ty: f64, theta: f64, scale: f64) -> Self {
        let mut w = Self::identity();
        w.set_parameters_canonical(&Vector4::new(tx, ty, theta, scale));
        w
    }

    /// `(tx, ty, theta, scale)`, assumes a positive scale.
    pub fn parameters_canonical(&self) -> Vector4<f64> {
        let m00 = self.m[(0, 0)];
        let m01 = self.m[(0, 1)];
        Vector4::new(
            self.m[(0, 2)],
            self.m[(1, 2)],
            (-m01).atan2(m00),
            (m00 * m00 + m01 * m01).sqrt(),
        )
    }

    pub fn set_parameters_canonical(&mut self, p: &Vector4<f64>) {
        let (s, c) = p[2].sin_cos();
        let a = p[3] * c - 1.0;
        let b = p[3] * s;
        self.set_parameters(&Params::<4>::new(p[0], p[1], a, b));
    }
}

impl Transform2D for SimilarityWarp {
    fn apply(&self, p: &Point) -> Point {
        transform_point(&self.m, p, false)
    }
}

impl Warp<4> for SimilarityWarp {
    const MODE: WarpMode = WarpMode::Similarity;

    fn matrix(&self) -> Matrix3<f64> {
        self.m
    }

    fn set_matrix(&mut self, m: Matrix3<f64>) {
        self.m = m;
    }

    fn parameters(&self) -> Params<4> {
        Params::<4>::new(
            self.m[(0, 2)],
            self.m[(1, 2)],
            self.m[(0, 0)] - 1.0,
            self.m[(1, 0)],
        )
    }

    fn set_parameters(&mut self, p: &Params<4>) {
        self.m = Matrix3::new(
            1.0 + p[2],
            -p[3],
            p[0],
            p[3],
            1.0 + p[2],
            p[1],
            0.0,
            0.0,
            1.0,
        );
    }

    /// Independent of the current parameters:
    ///
    /// ```text
    ///      tx  ty  a   b
    /// x     1   0  x  -y
    /// y     0   1  y   x
    /// ```
    fn jacobian(&self, p: &Point) -> Jacobian<4> {
        Jacobian::<4>::new(1.0, 0.0, p.x, -p.y, 0.0, 1.0, p.y, p.x)
    }

    fn to_dynamic(&self) -> DynWarp {
        DynWarp::Similarity(*self)
    }

    fn from_dynamic(w: &DynWarp) -> Option<Self> {
        match w {
            DynWarp::Similarity(s) => Some(*s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_canonical() {
        let mut w = SimilarityWarp::from_canonical(3.0, 1.0, 0.4, 1.3);
        w.set_identity();
        assert_relative_eq!(w.parameters(), Params::<4>::zeros());
        assert_relative_eq!(
            w.parameters_canonical(),
            Vector4::new(0.0, 0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn test_canonical_roundtrip() {
        let canonical = Vector4::new(10.0, 15.0, 0.18, 1.0);
        let w = SimilarityWarp::from_canonical(10.0, 15.0, 0.18, 1.0);
        assert_relative_eq!(w.parameters_canonical(), canonical, epsilon = 1e-12);

        let scaled = SimilarityWarp::from_canonical(-2.0, 4.0, -0.6, 0.75);
        assert_relative_eq!(
            scaled.parameters_canonical(),
            Vector4::new(-2.0, 4.0, -0.6, 0.75),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_jacobian_at_identity() {
        let w = SimilarityWarp::identity();
        let j = w.jacobian(&Point::new(10.0, 10.0));
        let expected = Jacobian::<4>::new(1.0, 0.0, 10.0, -10.0, 0.0, 1.0, 10.0, 10.0);
        assert_relative_eq!(j, expected);
    }

    #[test]
    fn test_composition_stays_similarity() {
        let mut w = SimilarityWarp::from_canonical(2.0, 3.0, 0.3, 1.2);
        w.update_forward_compositional(&Params::<4>::new(0.5, 0.2, 0.05, -0.02));
        let m = w.matrix();
        assert_relative_eq!(m[(0, 0)], m[(1, 1)], epsilon = 1e-12);
        assert_relative_eq!(m[(0, 1)], -m[(1, 0)], epsilon = 1e-12);
    }
}
