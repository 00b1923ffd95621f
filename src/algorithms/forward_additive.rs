//! Forward additive Lucas-Kanade (Lucas & Kanade 1981).
//!
//! Every iteration warps the template pixels into the target, samples the
//! target intensity and gradient there and evaluates the Jacobian under the
//! current parameters. Nothing can be precomputed. The update is `p += delta`.

use super::align_base::{AlignBase, AlignmentAlgorithm, LevelContext, SingleStepResult};
use super::normal_equations::{accumulate_rows, NormalEquations};
use super::AlgorithmKind;
use crate::imgproc::{gradient, Bilinear, ImagePyramid, Sampler};
use crate::warp::{Params, Point, Warp};

#[derive(Debug, Default, Clone)]
pub struct ForwardAdditive;

impl<W: Warp<N>, const N: usize> AlignmentAlgorithm<W, N> for ForwardAdditive {
    const KIND: AlgorithmKind = AlgorithmKind::ForwardAdditive;

    fn prepare_impl(&mut self, _template: &ImagePyramid, _target: &ImagePyramid, _warp: &W) {}

    fn align_impl(&mut self, ctx: &LevelContext<'_>, warp: &W) -> SingleStepResult<N> {
        let level_warp = warp.scaled(-ctx.levels_below_finest());
        let (rows, cols) = ctx.template.dim();
        let sampler = Bilinear;

        let eq: NormalEquations<N> = accumulate_rows(rows, |y| {
            let mut eq = NormalEquations::zeros();
            for x in 0..cols {
                let p = Point::new(x as f64, y as f64);
                let wp = level_warp.apply(&p);

                let grad = gradient(&sampler, &ctx.target, &wp);
                let jac = warp.jacobian(&(p * ctx.scale_up)) * ctx.scale_down;
                let sdi = grad * jac;

                let error = f64::from(ctx.template[[y, x]]) - sampler.sample(&ctx.target, &wp);
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
        warp.update_forward_additive(delta);
    }
}

/// Forward additive aligner for warp `W`.
pub type AlignForwardAdditive<W, const N: usize> = AlignBase<ForwardAdditive, W, N>;
