//! Forward compositional Lucas-Kanade.
//!
//! The Jacobian is evaluated at the identity warp and precomputed per
//! level. Each iteration rasterizes the target into the template frame and
//! takes intensities and gradients from that warped image. The update is
//! `M <- M * M(delta)`.

use super::align_base::{AlignBase, AlignmentAlgorithm, LevelContext, SingleStepResult};
use super::normal_equations::{accumulate_rows, NormalEquations};
use super::AlgorithmKind;
use crate::imgproc::{gradient, warp_image_into, Bilinear, ImagePyramid, Nearest};
use crate::warp::{Jacobian, Params, Point, Warp};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct ForwardCompositional<const N: usize> {
    /// Identity Jacobians per level, row-major over the template pixels.
    jacobians: Vec<Vec<Jacobian<N>>>,
    warped: Array2<f32>,
}

/// Identity-warp Jacobians of every template pixel at one level, in
/// finest-level parameter units.
pub(crate) fn identity_jacobians<W: Warp<N>, const N: usize>(
    rows: usize,
    cols: usize,
    scale_up: f64,
) -> Vec<Jacobian<N>> {
    let identity = W::identity();
    (0..rows * cols)
        .into_par_iter()
        .map(|i| {
            let p = Point::new((i % cols) as f64, (i / cols) as f64);
            identity.jacobian(&(p * scale_up)) / scale_up
        })
        .collect()
}

impl<W: Warp<N>, const N: usize> AlignmentAlgorithm<W, N> for ForwardCompositional<N> {
    const KIND: AlgorithmKind = AlgorithmKind::ForwardCompositional;

    fn prepare_impl(&mut self, template: &ImagePyramid, _target: &ImagePyramid, _warp: &W) {
        let n = template.num_levels();
        self.jacobians = template
            .levels()
            .iter()
            .enumerate()
            .map(|(l, img)| {
                let (rows, cols) = img.dim();
                identity_jacobians::<W, N>(rows, cols, 2f64.powi((n - 1 - l) as i32))
            })
            .collect();
        debug!(levels = n, "Forward compositional Jacobians precomputed");
    }

    fn align_impl(&mut self, ctx: &LevelContext<'_>, warp: &W) -> SingleStepResult<N> {
        let level_warp = warp.scaled(-ctx.levels_below_finest());
        let (rows, cols) = ctx.template.dim();
        warp_image_into(&ctx.target, &mut self.warped, (rows, cols), &level_warp, &Bilinear);

        let warped = self.warped.view();
        let jacobians = &self.jacobians[ctx.level];
        let sampler = Nearest;

        let eq: NormalEquations<N> = accumulate_rows(rows, |y| {
            let mut eq = NormalEquations::zeros();
            for x in 0..cols {
                let p = Point::new(x as f64, y as f64);
                let grad = gradient(&sampler, &warped, &p);
                let sdi = grad * jacobians[y * cols + x];
                let error = f64::from(ctx.template[[y, x]]) - f64::from(warped[[y, x]]);
                eq.add(&sdi, error);
            }
            eq
        });

        match eq.solve() {
            Some(delta) => SingleStepResult::solved(delta, eq.sum_squared_error, eq.num_constraints),
            None => SingleStepResult::degenerate(eq.sum_squared_error, eq.num_constraints),
        }
    }

    fn update(warp: &mut W, delta: &Params<N>) {
        warp.update_forward_compositional(delta);
    }
}

/// Forward compositional aligner for warp `W`.
pub type AlignForwardCompositional<W, const N: usize> = AlignBase<ForwardCompositional<N>, W, N>;
