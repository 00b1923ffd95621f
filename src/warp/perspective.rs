use super::{transform_point, DynWarp, Jacobian, Params, Point, Transform2D, Warp, WarpMode};
use nalgebra::Matrix3;

/// Full planar homography with `m22` fixed to one.
///
/// Parameters are `(tx, ty, m00 - 1, m10, m01, m11 - 1, m20, m21)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveWarp {
    m: Matrix3<f64>,
}

impl Default for PerspectiveWarp {
    fn default() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }
}

impl Transform2D for PerspectiveWarp {
    fn apply(&self, p: &Point) -> Point {
        transform_point(&self.m, p, true)
    }
}

impl Warp<8> for PerspectiveWarp {
    const MODE: WarpMode = WarpMode::Perspective;

    fn matrix(&self) -> Matrix3<f64> {
        self.m
    }

    /// Rescales the matrix so that `m22 == 1`.
    fn set_matrix(&mut self, m: Matrix3<f64>) {
        let w = m[(2, 2)];
        self.m = if w != 0.0 && w.is_finite() { m / w } else { m };
    }

    fn parameters(&self) -> Params<8> {
        Params::<8>::from_column_slice(&[
            self.m[(0, 2)],
            self.m[(1, 2)],
            self.m[(0, 0)] - 1.0,
            self.m[(1, 0)],
            self.m[(0, 1)],
            self.m[(1, 1)] - 1.0,
            self.m[(2, 0)],
            self.m[(2, 1)],
        ])
    }

    fn set_parameters(&mut self, p: &Params<8>) {
        self.m = Matrix3::new(
            1.0 + p[2],
            p[4],
            p[0],
            p[3],
            1.0 + p[5],
            p[1],
            p[6],
            p[7],
            1.0,
        );
    }

    fn jacobian(&self, p: &Point) -> Jacobian<8> {
        let m = &self.m;
        let (x, y) = (p.x, p.y);
        let w = m[(2, 0)] * x + m[(2, 1)] * y + 1.0;
        let wx = (m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w;
        let wy = (m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w;
        let iw = 1.0 / w;

        #[rustfmt::skip]
        let j = Jacobian::<8>::from_row_slice(&[
            iw, 0.0, x * iw, 0.0, y * iw, 0.0, -wx * x * iw, -wx * y * iw,
            0.0, iw, 0.0, x * iw, 0.0, y * iw, -wy * x * iw, -wy * y * iw,
        ]);
        j
    }

    fn to_dynamic(&self) -> DynWarp {
        DynWarp::Perspective(*self)
    }

    fn from_dynamic(w: &DynWarp) -> Option<Self> {
        match w {
            DynWarp::Perspective(h) => Some(*h),
            _ => None,
        }
    }
}
