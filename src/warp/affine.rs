use super::{transform_point, DynWarp, Jacobian, Params, Point, Transform2D, Warp, WarpMode};
use nalgebra::Matrix3;

/// General affine motion.
///
/// Parameters are `(tx, ty, m00 - 1, m10, m01, m11 - 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineWarp {
    m: Matrix3<f64>,
}

impl Default for AffineWarp {
    fn default() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }
}

impl Transform2D for AffineWarp {
    fn apply(&self, p: &Point) -> Point {
        transform_point(&self.m, p, false)
    }
}

impl Warp<6> for AffineWarp {
    const MODE: WarpMode = WarpMode::Affine;

    fn matrix(&self) -> Matrix3<f64> {
        self.m
    }

    fn set_matrix(&mut self, m: Matrix3<f64>) {
        self.m = m;
    }

    fn parameters(&self) -> Params<6> {
        Params::<6>::new(
            self.m[(0, 2)],
            self.m[(1, 2)],
            self.m[(0, 0)] - 1.0,
            self.m[(1, 0)],
            self.m[(0, 1)],
            self.m[(1, 1)] - 1.0,
        )
    }

    fn set_parameters(&mut self, p: &Params<6>) {
        self.m = Matrix3::new(
            1.0 + p[2],
            p[4],
            p[0],
            p[3],
            1.0 + p[5],
            p[1],
            0.0,
            0.0,
            1.0,
        );
    }

    fn jacobian(&self, p: &Point) -> Jacobian<6> {
        Jacobian::<6>::new(
            1.0, 0.0, p.x, 0.0, p.y, 0.0, //
            0.0, 1.0, 0.0, p.x, 0.0, p.y,
        )
    }

    fn to_dynamic(&self) -> DynWarp {
        DynWarp::Affine(*self)
    }

    fn from_dynamic(w: &DynWarp) -> Option<Self> {
        match w {
            DynWarp::Affine(a) => Some(*a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parameter_roundtrip() {
        let p = Params::<6>::new(4.0, -1.0, 0.1, -0.05, 0.2, -0.1);
        let w = AffineWarp::from_parameters(&p);
        assert_relative_eq!(w.parameters(), p, epsilon = 1e-12);
    }

    #[test]
    fn test_point_mapping() {
        let w = AffineWarp::from_parameters(&Params::<6>::new(1.0, 2.0, 1.0, 0.0, 0.5, 0.0));
        let x = w.apply(&Point::new(2.0, 4.0));
        assert_relative_eq!(x, Point::new(2.0 * 2.0 + 0.5 * 4.0 + 1.0, 4.0 + 2.0));
    }

    #[test]
    fn test_inverse() {
        let w = AffineWarp::from_parameters(&Params::<6>::new(3.0, -2.0, 0.2, 0.1, -0.3, 0.05));
        let inv = w.inverse().unwrap();
        let p = Point::new(11.0, -4.0);
        assert_relative_eq!(inv.apply(&w.apply(&p)), p, epsilon = 1e-10);
    }
}
