use super::{DynWarp, Jacobian, Params, Point, Transform2D, Warp, WarpMode};
use nalgebra::Matrix3;

/// Pure translational motion, parameters `(tx, ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationWarp {
    m: Matrix3<f64>,
}

impl Default for TranslationWarp {
    fn default() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }
}

impl TranslationWarp {
    pub fn new(tx: f64, ty: f64) -> Self {
        Self::from_parameters(&Params::<2>::new(tx, ty))
    }
}

impl Transform2D for TranslationWarp {
    fn apply(&self, p: &Point) -> Point {
        Point::new(p.x + self.m[(0, 2)], p.y + self.m[(1, 2)])
    }
}

impl Warp<2> for TranslationWarp {
    const MODE: WarpMode = WarpMode::Translation;

    fn matrix(&self) -> Matrix3<f64> {
        self.m
    }

    fn set_matrix(&mut self, m: Matrix3<f64>) {
        self.m = m;
    }

    fn parameters(&self) -> Params<2> {
        Params::<2>::new(self.m[(0, 2)], self.m[(1, 2)])
    }

    fn set_parameters(&mut self, p: &Params<2>) {
        self.m = Matrix3::identity();
        self.m[(0, 2)] = p[0];
        self.m[(1, 2)] = p[1];
    }

    /// Constant:
    ///
    /// ```text
    ///      tx  ty
    /// x     1   0
    /// y     0   1
    /// ```
    fn jacobian(&self, _p: &Point) -> Jacobian<2> {
        Jacobian::<2>::identity()
    }

    fn to_dynamic(&self) -> DynWarp {
        DynWarp::Translation(*self)
    }

    fn from_dynamic(w: &DynWarp) -> Option<Self> {
        match w {
            DynWarp::Translation(t) => Some(*t),
            _ => None,
        }
    }

    fn update_forward_compositional(&mut self, delta: &Params<2>) {
        self.update_forward_additive(delta);
    }

    fn update_inverse_compositional(&mut self, delta: &Params<2>) {
        let p = self.parameters() - delta;
        self.set_parameters(&p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parameters() {
        let mut w = TranslationWarp::new(3.0, 4.0);
        w.set_identity();
        assert_eq!(w.parameters(), Params::<2>::zeros());
    }

    #[test]
    fn test_point_mapping() {
        let mut w = TranslationWarp::identity();
        w.set_parameters(&Params::<2>::new(10.0, 5.0));
        let wx = w.apply(&Point::new(5.0, 5.0));
        assert_eq!(wx, Point::new(15.0, 10.0));
    }

    #[test]
    fn test_jacobian_is_identity() {
        let w = TranslationWarp::new(7.0, -2.0);
        assert_eq!(w.jacobian(&Point::new(12.0, 3.0)), Jacobian::<2>::identity());
    }

    #[test]
    fn test_compositional_updates_match_matrix_algebra() {
        let mut fc = TranslationWarp::new(1.0, 2.0);
        fc.update_forward_compositional(&Params::<2>::new(0.5, -0.5));
        assert_eq!(fc.parameters(), Params::<2>::new(1.5, 1.5));

        let mut ic = TranslationWarp::new(1.0, 2.0);
        ic.update_inverse_compositional(&Params::<2>::new(0.5, -0.5));
        assert_eq!(ic.parameters(), Params::<2>::new(0.5, 2.5));
    }

    #[test]
    fn test_scaled_between_levels() {
        let w = TranslationWarp::new(10.0, 6.0);
        assert_eq!(w.scaled(1).parameters(), Params::<2>::new(20.0, 12.0));
        assert_eq!(w.scaled(-1).parameters(), Params::<2>::new(5.0, 3.0));
        assert_eq!(w.scaled(-1).scaled(1), w);
    }
}
