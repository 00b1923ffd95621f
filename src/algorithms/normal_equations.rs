//! Gauss-Newton normal equations `H * delta = b`.

use crate::warp::{Hessian, Params, PixelSdi};
use nalgebra::{Cholesky, Const};
use rayon::prelude::*;

/// Running sums over the constraint pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalEquations<const N: usize> {
    pub hessian: Hessian<N>,
    pub b: Params<N>,
    pub sum_squared_error: f64,
    pub num_constraints: usize,
}

impl<const N: usize> Default for NormalEquations<N> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const N: usize> NormalEquations<N> {
    pub fn zeros() -> Self {
        Self {
            hessian: Hessian::<N>::zeros(),
            b: Params::<N>::zeros(),
            sum_squared_error: 0.0,
            num_constraints: 0,
        }
    }

    /// Add one pixel with steepest descent row `sdi` and residual `error`.
    #[inline]
    pub fn add(&mut self, sdi: &PixelSdi<N>, error: f64) {
        self.hessian += sdi.transpose() * sdi;
        self.add_residual(sdi, error);
    }

    /// Like [`NormalEquations::add`] but leaves the Hessian alone, for
    /// algorithms that precompute it.
    #[inline]
    pub fn add_residual(&mut self, sdi: &PixelSdi<N>, error: f64) {
        self.b += sdi.transpose() * error;
        self.sum_squared_error += error * error;
        self.num_constraints += 1;
    }

    pub fn merge(mut self, other: &Self) -> Self {
        self.hessian += other.hessian;
        self.b += other.b;
        self.sum_squared_error += other.sum_squared_error;
        self.num_constraints += other.num_constraints;
        self
    }

    /// Solve with the accumulated Hessian.
    pub fn solve(&self) -> Option<Params<N>> {
        if self.num_constraints == 0 {
            return None;
        }
        let chol = self.hessian.cholesky()?;
        solve_with(&chol, &self.b)
    }
}

/// Solve against an already factorized Hessian, rejecting non-finite results.
pub fn solve_with<const N: usize>(
    chol: &Cholesky<f64, Const<N>>,
    b: &Params<N>,
) -> Option<Params<N>> {
    let delta = chol.solve(b);
    delta.iter().all(|v| v.is_finite()).then_some(delta)
}

/// Evaluate `row_fn` for every row in parallel and add the partial sums
/// in row order, so the result does not depend on the thread count.
pub fn accumulate_rows<const N: usize, F>(rows: usize, row_fn: F) -> NormalEquations<N>
where
    F: Fn(usize) -> NormalEquations<N> + Sync + Send,
{
    let partial: Vec<NormalEquations<N>> = (0..rows).into_par_iter().map(row_fn).collect();
    partial
        .iter()
        .fold(NormalEquations::zeros(), |acc, row| acc.merge(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solves_least_squares() {
        // Fit error = 2*a - 3*b from exact samples.
        let mut eq = NormalEquations::<2>::zeros();
        for (u, v) in [(1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (2.0, -1.0)] {
            eq.add(&PixelSdi::<2>::new(u, v), 2.0 * u - 3.0 * v);
        }
        let delta = eq.solve().unwrap();
        assert_relative_eq!(delta, Params::<2>::new(2.0, -3.0), epsilon = 1e-10);
        assert_eq!(eq.num_constraints, 4);
    }

    #[test]
    fn test_singular_hessian_is_rejected() {
        let mut eq = NormalEquations::<2>::zeros();
        for _ in 0..10 {
            eq.add(&PixelSdi::<2>::new(0.0, 0.0), 1.0);
        }
        assert!(eq.solve().is_none());
        assert!(NormalEquations::<3>::zeros().solve().is_none());
    }

    #[test]
    fn test_row_accumulation_is_deterministic() {
        let row = |y: usize| {
            let mut eq = NormalEquations::<2>::zeros();
            for x in 0..17 {
                let sdi = PixelSdi::<2>::new((x as f64).sin(), (y as f64 * 0.3).cos());
                eq.add(&sdi, (x * y) as f64 * 0.01);
            }
            eq
        };
        let a = accumulate_rows(50, row);
        let b = accumulate_rows(50, row);
        assert_eq!(a, b);

        let sequential = (0..50).fold(NormalEquations::zeros(), |acc, y| acc.merge(&row(y)));
        assert_eq!(a, sequential);
    }
}
