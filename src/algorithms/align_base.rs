//! Shared coarse-to-fine driver for the Lucas-Kanade variants.

use super::AlgorithmKind;
use crate::imgproc::ImagePyramid;
use crate::utils::image_conversion::AsFloatImage;
use crate::warp::{Params, Warp};
use crate::Result;
use anyhow::ensure;
use ndarray::ArrayView2;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Outcome of a single Gauss-Newton iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleStepResult<const N: usize> {
    pub delta: Params<N>,
    pub sum_squared_error: f64,
    pub num_constraints: usize,
    /// No usable increment, either no constraints or singular equations.
    pub degenerate: bool,
}

impl<const N: usize> SingleStepResult<N> {
    pub fn solved(delta: Params<N>, sum_squared_error: f64, num_constraints: usize) -> Self {
        Self {
            delta,
            sum_squared_error,
            num_constraints,
            degenerate: false,
        }
    }

    pub fn degenerate(sum_squared_error: f64, num_constraints: usize) -> Self {
        Self {
            delta: Params::<N>::zeros(),
            sum_squared_error,
            num_constraints,
            degenerate: true,
        }
    }
}

/// Images and scale of the level currently being aligned.
#[derive(Debug, Clone, Copy)]
pub struct LevelContext<'a> {
    pub level: usize,
    pub num_levels: usize,
    pub template: ArrayView2<'a, f32>,
    pub target: ArrayView2<'a, f32>,
    /// Level coordinates to finest-level coordinates.
    pub scale_up: f64,
    /// Finest-level coordinates to level coordinates.
    pub scale_down: f64,
}

impl LevelContext<'_> {
    /// Exponent `k` such that `warp.scaled(-k)` maps level template pixels
    /// to level target pixels.
    pub fn levels_below_finest(&self) -> i32 {
        (self.num_levels - 1 - self.level) as i32
    }
}

/// Per-variant hooks called by [`AlignBase`].
pub trait AlignmentAlgorithm<W: Warp<N>, const N: usize>: Default + Send {
    const KIND: AlgorithmKind;

    /// Precompute whatever stays fixed while iterating, for every level.
    fn prepare_impl(&mut self, template: &ImagePyramid, target: &ImagePyramid, warp: &W);

    /// One iteration at the level described by `ctx`. Must not modify the warp.
    fn align_impl(&mut self, ctx: &LevelContext<'_>, warp: &W) -> SingleStepResult<N>;

    /// Combine the current warp with an increment.
    fn update(warp: &mut W, delta: &Params<N>);
}

/// Alignment driver that owns the pyramids and the iteration state.
///
/// The warp is always expressed in coordinates of the finest level, the
/// driver takes care of scaling it to the level being aligned.
pub struct AlignBase<A, W, const N: usize>
where
    A: AlignmentAlgorithm<W, N>,
    W: Warp<N>,
{
    algorithm: A,
    template: Arc<ImagePyramid>,
    target: Arc<ImagePyramid>,
    level: usize,
    scale_up: f64,
    scale_down: f64,
    iterations: usize,
    last_error: f64,
    previous_error: f64,
    last_increment: Params<N>,
    last_degenerate: bool,
    prepared: bool,
    _warp: PhantomData<fn() -> W>,
}

impl<A, W, const N: usize> Default for AlignBase<A, W, N>
where
    A: AlignmentAlgorithm<W, N>,
    W: Warp<N>,
{
    fn default() -> Self {
        Self {
            algorithm: A::default(),
            template: Arc::new(ImagePyramid::default()),
            target: Arc::new(ImagePyramid::default()),
            level: 0,
            scale_up: 1.0,
            scale_down: 1.0,
            iterations: 0,
            last_error: f64::INFINITY,
            previous_error: f64::INFINITY,
            last_increment: Params::<N>::zeros(),
            last_degenerate: false,
            prepared: false,
            _warp: PhantomData,
        }
    }
}

impl<A, W, const N: usize> AlignBase<A, W, N>
where
    A: AlignmentAlgorithm<W, N>,
    W: Warp<N>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> AlgorithmKind {
        A::KIND
    }

    /// Build both pyramids and run the per-variant precomputation.
    ///
    /// `pyramid_levels` is clamped to at least one. Resets the iteration
    /// state and selects the coarsest level.
    pub fn prepare<T, I>(
        &mut self,
        template: &T,
        target: &I,
        warp: &W,
        pyramid_levels: usize,
    ) -> Result<()>
    where
        T: AsFloatImage + ?Sized,
        I: AsFloatImage + ?Sized,
    {
        let levels = pyramid_levels.max(1);
        let template = ImagePyramid::create(template, levels)?;
        let target = ImagePyramid::create(target, levels)?;
        self.prepare_pyramids(Arc::new(template), Arc::new(target), warp)
    }

    /// Like [`AlignBase::prepare`] with pyramids built elsewhere, so one
    /// target pyramid can be shared between many aligners.
    pub fn prepare_pyramids(
        &mut self,
        template: Arc<ImagePyramid>,
        target: Arc<ImagePyramid>,
        warp: &W,
    ) -> Result<()> {
        ensure!(
            template.num_levels() > 0,
            "Template pyramid has no levels"
        );
        ensure!(
            template.num_levels() == target.num_levels(),
            "Template and target pyramids differ in depth ({} vs {})",
            template.num_levels(),
            target.num_levels()
        );
        for (l, (t, i)) in template.levels().iter().zip(target.levels()).enumerate() {
            ensure!(
                !t.is_empty() && !i.is_empty(),
                "Pyramid level {} contains an empty image",
                l
            );
        }

        self.template = template;
        self.target = target;
        self.iterations = 0;
        self.last_increment = Params::<N>::zeros();
        self.last_degenerate = false;
        self.last_error = f64::INFINITY;
        self.previous_error = f64::INFINITY;

        self.algorithm
            .prepare_impl(&self.template, &self.target, warp);
        self.prepared = true;
        self.set_level(0);

        debug!(
            algorithm = %A::KIND,
            mode = %W::MODE,
            levels = self.template.num_levels(),
            template = ?self.template[self.template.num_levels() - 1].dim(),
            target = ?self.target[self.target.num_levels() - 1].dim(),
            "Alignment prepared"
        );
        Ok(())
    }

    /// Select a pyramid level, clamped to the valid range. Errors of
    /// different levels are not comparable, so the error history restarts.
    pub fn set_level(&mut self, level: usize) -> &mut Self {
        let n = self.num_levels().max(1);
        self.level = level.min(n - 1);
        self.scale_up = 2f64.powi((n - 1 - self.level) as i32);
        self.scale_down = 1.0 / self.scale_up;
        self.last_error = f64::INFINITY;
        self.previous_error = f64::INFINITY;
        self
    }

    /// Perform exactly one iteration at the current level.
    pub fn align(&mut self, warp: &mut W) -> &mut Self {
        if !self.prepared {
            warn!(algorithm = %A::KIND, "align called before prepare, ignoring");
            return self;
        }

        let ctx = LevelContext {
            level: self.level,
            num_levels: self.template.num_levels(),
            template: self.template[self.level].view(),
            target: self.target[self.level].view(),
            scale_up: self.scale_up,
            scale_down: self.scale_down,
        };
        let step = self.algorithm.align_impl(&ctx, warp);

        self.previous_error = self.last_error;
        self.last_degenerate = step.degenerate || step.num_constraints == 0;
        if self.last_degenerate {
            self.last_increment = Params::<N>::zeros();
            self.last_error = f64::MAX;
        } else {
            A::update(warp, &step.delta);
            self.last_increment = step.delta;
            self.last_error = step.sum_squared_error / step.num_constraints as f64;
        }
        self.iterations += 1;

        trace!(
            level = self.level,
            iteration = self.iterations,
            error = self.last_error,
            increment = self.last_increment.norm(),
            constraints = step.num_constraints,
            degenerate = step.degenerate,
            "Alignment step"
        );
        self
    }

    /// Iterate until `max_iterations` is reached or the L2 norm of the
    /// increment drops below `eps`.
    pub fn align_until(&mut self, warp: &mut W, max_iterations: usize, eps: f64) -> &mut Self {
        for _ in 0..max_iterations {
            self.align(warp);
            if self.last_increment.norm() < eps {
                break;
            }
        }
        self
    }

    /// Same as [`AlignBase::align_until`], returning the warp after every
    /// iteration.
    pub fn align_with_history(
        &mut self,
        warp: &mut W,
        max_iterations: usize,
        eps: f64,
    ) -> Vec<W> {
        let mut history = Vec::with_capacity(max_iterations);
        for _ in 0..max_iterations {
            self.align(warp);
            history.push(warp.clone());
            if self.last_increment.norm() < eps {
                break;
            }
        }
        history
    }

    /// Run all levels coarse to fine. Level `l` gets `iterations[l]`
    /// iterations, the last entry applies to any remaining levels.
    pub fn align_levels(&mut self, warp: &mut W, iterations: &[usize], eps: f64) -> &mut Self {
        let Some(&last) = iterations.last() else {
            return self;
        };
        for level in 0..self.num_levels() {
            let budget = iterations.get(level).copied().unwrap_or(last);
            self.set_level(level);
            self.align_until(warp, budget, eps);
            debug!(
                level,
                error = self.last_error,
                iterations = self.iterations,
                "Level finished"
            );
        }
        self
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn num_levels(&self) -> usize {
        self.template.num_levels()
    }

    /// Total number of iterations since the last prepare.
    pub fn iteration(&self) -> usize {
        self.iterations
    }

    /// Mean squared residual of the last iteration, `f64::MAX` if it was
    /// degenerate and infinity before the first iteration of a level.
    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    /// Difference between the last two errors on the current level.
    /// Positive means the error grew, positive infinity when the last step
    /// was degenerate after a measured one. Negative infinity until two
    /// measured errors exist.
    pub fn error_change(&self) -> f64 {
        let measured = |e: f64| e.is_finite() && e != f64::MAX;
        match (measured(self.previous_error), measured(self.last_error)) {
            (true, true) => self.last_error - self.previous_error,
            (true, false) => f64::INFINITY,
            _ => f64::NEG_INFINITY,
        }
    }

    /// Whether the last iteration found no usable increment
    pub fn last_step_degenerate(&self) -> bool {
        self.last_degenerate
    }

    pub fn last_increment(&self) -> Params<N> {
        self.last_increment
    }

    pub fn scale_up_factor(&self) -> f64 {
        self.scale_up
    }

    pub fn scale_down_factor(&self) -> f64 {
        self.scale_down
    }

    pub fn template_pyramid(&self) -> &Arc<ImagePyramid> {
        &self.template
    }

    pub fn target_pyramid(&self) -> &Arc<ImagePyramid> {
        &self.target
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }
}
