//! Inverse compositional Lucas-Kanade (Baker & Matthews 2001).
//!
//! Template and target swap roles, so the steepest descent images and the
//! Hessian depend only on the template and are computed once per level in
//! `prepare`. An iteration only samples the target and accumulates `b`.
//! The update is `M <- M * M(delta)^-1`.

use super::align_base::{AlignBase, AlignmentAlgorithm, LevelContext, SingleStepResult};
use super::forward_compositional::identity_jacobians;
use super::normal_equations::{accumulate_rows, solve_with, NormalEquations};
use super::AlgorithmKind;
use crate::imgproc::{gradient, Bilinear, ImagePyramid, Nearest, Sampler};
use crate::warp::{Params, PixelSdi, Point, Warp};
use nalgebra::{Cholesky, Const};
use rayon::prelude::*;
use tracing::{debug, warn};

struct LevelData<const N: usize> {
    sdi: Vec<PixelSdi<N>>,
    /// `None` when the template carries no information at this level.
    hessian: Option<Cholesky<f64, Const<N>>>,
}

#[derive(Default)]
pub struct InverseCompositional<const N: usize> {
    levels: Vec<LevelData<N>>,
}

impl<W: Warp<N>, const N: usize> AlignmentAlgorithm<W, N> for InverseCompositional<N> {
    const KIND: AlgorithmKind = AlgorithmKind::InverseCompositional;

    fn prepare_impl(&mut self, template: &ImagePyramid, _target: &ImagePyramid, _warp: &W) {
        let n = template.num_levels();
        self.levels = template
            .levels()
            .iter()
            .enumerate()
            .map(|(l, img)| {
                let (rows, cols) = img.dim();
                let scale_up = 2f64.powi((n - 1 - l) as i32);
                let jacobians = identity_jacobians::<W, N>(rows, cols, scale_up);
                let view = img.view();

                let sdi: Vec<PixelSdi<N>> = jacobians
                    .par_iter()
                    .enumerate()
                    .map(|(i, jac)| {
                        let p = Point::new((i % cols) as f64, (i / cols) as f64);
                        gradient(&Nearest, &view, &p) * jac
                    })
                    .collect();

                let hessian = accumulate_rows(rows, |y| {
                    let mut eq = NormalEquations::<N>::zeros();
                    for s in &sdi[y * cols..(y + 1) * cols] {
                        eq.add(s, 0.0);
                    }
                    eq
                })
                .hessian
                .cholesky();
                if hessian.is_none() {
                    warn!(level = l, "Template Hessian is singular, level carries no constraints");
                }

                LevelData { sdi, hessian }
            })
            .collect();
        debug!(levels = n, "Inverse compositional steepest descent images precomputed");
    }

    fn align_impl(&mut self, ctx: &LevelContext<'_>, warp: &W) -> SingleStepResult<N> {
        let level_warp = warp.scaled(-ctx.levels_below_finest());
        let data = &self.levels[ctx.level];
        let (rows, cols) = ctx.template.dim();
        let (target_rows, target_cols) = ctx.target.dim();
        let max_x = target_cols as f64 - 1.0;
        let max_y = target_rows as f64 - 1.0;
        let sampler = Bilinear;

        let eq: NormalEquations<N> = accumulate_rows(rows, |y| {
            let mut eq = NormalEquations::zeros();
            for x in 0..cols {
                let wp = level_warp.apply(&Point::new(x as f64, y as f64));
                if !(wp.x >= 0.0 && wp.x <= max_x && wp.y >= 0.0 && wp.y <= max_y) {
                    continue;
                }
                let error = sampler.sample(&ctx.target, &wp) - f64::from(ctx.template[[y, x]]);
                eq.add_residual(&data.sdi[y * cols + x], error);
            }
            eq
        });

        if eq.num_constraints == 0 {
            return SingleStepResult::degenerate(0.0, 0);
        }
        match data.hessian.as_ref().and_then(|h| solve_with(h, &eq.b)) {
            Some(delta) => SingleStepResult::solved(delta, eq.sum_squared_error, eq.num_constraints),
            None => SingleStepResult::degenerate(eq.sum_squared_error, eq.num_constraints),
        }
    }

    fn update(warp: &mut W, delta: &Params<N>) {
        warp.update_inverse_compositional(delta);
    }
}

/// Inverse compositional aligner for warp `W`.
pub type AlignInverseCompositional<W, const N: usize> = AlignBase<InverseCompositional<N>, W, N>;
