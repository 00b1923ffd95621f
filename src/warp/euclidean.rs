use super::{transform_point, DynWarp, Jacobian, Params, Point, Transform2D, Warp, WarpMode};
use nalgebra::Matrix3;

/// Rigid motion (rotation + translation), parameters `(tx, ty, theta)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuclideanWarp {
    m: Matrix3<f64>,
}

impl Default for EuclideanWarp {
    fn default() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }
}

impl EuclideanWarp {
    pub fn new(tx: f64, ty: f64, theta: f64) -> Self {
        Self::from_parameters(&Params::<3>::new(tx, ty, theta))
    }

    pub fn angle(&self) -> f64 {
        self.m[(1, 0)].atan2(self.m[(0, 0)])
    }
}

impl Transform2D for EuclideanWarp {
    fn apply(&self, p: &Point) -> Point {
        transform_point(&self.m, p, false)
    }
}

impl Warp<3> for EuclideanWarp {
    const MODE: WarpMode = WarpMode::Euclidean;

    fn matrix(&self) -> Matrix3<f64> {
        self.m
    }

    fn set_matrix(&mut self, m: Matrix3<f64>) {
        self.m = m;
    }

    fn parameters(&self) -> Params<3> {
        Params::<3>::new(self.m[(0, 2)], self.m[(1, 2)], self.angle())
    }

    fn set_parameters(&mut self, p: &Params<3>) {
        let (s, c) = p[2].sin_cos();
        self.m = Matrix3::new(c, -s, p[0], s, c, p[1], 0.0, 0.0, 1.0);
    }

    /// Depends on the current rotation:
    ///
    /// ```text
    ///      tx  ty  theta
    /// x     1   0  -x sin(theta) - y cos(theta)
    /// y     0   1   x cos(theta) - y sin(theta)
    /// ```
    fn jacobian(&self, p: &Point) -> Jacobian<3> {
        let (s, c) = self.angle().sin_cos();
        Jacobian::<3>::new(
            1.0,
            0.0,
            -p.x * s - p.y * c,
            0.0,
            1.0,
            p.x * c - p.y * s,
        )
    }

    fn to_dynamic(&self) -> DynWarp {
        DynWarp::Euclidean(*self)
    }

    fn from_dynamic(w: &DynWarp) -> Option<Self> {
        match w {
            DynWarp::Euclidean(e) => Some(*e),
            _ => None,
        }
    }
}
