use crate::algorithms::{AlgorithmKind, AlignBase, AlignmentAlgorithm};
use crate::imgproc::ImagePyramid;
use crate::warp::{DynWarp, Warp, WarpMode};
use crate::Result;
use anyhow::anyhow;
use nalgebra::DVector;
use ndarray::Array2;
use std::sync::Arc;

/// Alignment driver with warp model and algorithm chosen at run time.
///
/// Implemented by every [`AlignBase`] instantiation. Warps are exchanged as
/// [`DynWarp`]; passing a warp of another motion model is an error.
pub trait Aligner: Send {
    fn kind(&self) -> AlgorithmKind;

    fn mode(&self) -> WarpMode;

    fn prepare(
        &mut self,
        template: &Array2<f32>,
        target: &Array2<f32>,
        warp: &DynWarp,
        pyramid_levels: usize,
    ) -> Result<()>;

    fn prepare_pyramids(
        &mut self,
        template: Arc<ImagePyramid>,
        target: Arc<ImagePyramid>,
        warp: &DynWarp,
    ) -> Result<()>;

    fn set_level(&mut self, level: usize);

    /// One iteration at the current level
    fn align(&mut self, warp: &mut DynWarp) -> Result<()>;

    fn align_until(&mut self, warp: &mut DynWarp, max_iterations: usize, eps: f64) -> Result<()>;

    fn level(&self) -> usize;

    fn num_levels(&self) -> usize;

    fn iteration(&self) -> usize;

    fn last_error(&self) -> f64;

    fn error_change(&self) -> f64;

    fn last_increment(&self) -> DVector<f64>;

    fn last_step_degenerate(&self) -> bool;
}

fn concrete<W: Warp<N>, const N: usize>(warp: &DynWarp) -> Result<W> {
    W::from_dynamic(warp)
        .ok_or_else(|| anyhow!("Expected a {} warp, got {}", W::MODE, warp.mode()))
}

impl<A, W, const N: usize> Aligner for AlignBase<A, W, N>
where
    A: AlignmentAlgorithm<W, N>,
    W: Warp<N> + 'static,
{
    fn kind(&self) -> AlgorithmKind {
        A::KIND
    }

    fn mode(&self) -> WarpMode {
        W::MODE
    }

    fn prepare(
        &mut self,
        template: &Array2<f32>,
        target: &Array2<f32>,
        warp: &DynWarp,
        pyramid_levels: usize,
    ) -> Result<()> {
        let w = concrete::<W, N>(warp)?;
        AlignBase::prepare(self, template, target, &w, pyramid_levels)
    }

    fn prepare_pyramids(
        &mut self,
        template: Arc<ImagePyramid>,
        target: Arc<ImagePyramid>,
        warp: &DynWarp,
    ) -> Result<()> {
        let w = concrete::<W, N>(warp)?;
        AlignBase::prepare_pyramids(self, template, target, &w)
    }

    fn set_level(&mut self, level: usize) {
        AlignBase::set_level(self, level);
    }

    fn align(&mut self, warp: &mut DynWarp) -> Result<()> {
        let mut w = concrete::<W, N>(warp)?;
        AlignBase::align(self, &mut w);
        *warp = w.to_dynamic();
        Ok(())
    }

    fn align_until(&mut self, warp: &mut DynWarp, max_iterations: usize, eps: f64) -> Result<()> {
        let mut w = concrete::<W, N>(warp)?;
        AlignBase::align_until(self, &mut w, max_iterations, eps);
        *warp = w.to_dynamic();
        Ok(())
    }

    fn level(&self) -> usize {
        AlignBase::level(self)
    }

    fn num_levels(&self) -> usize {
        AlignBase::num_levels(self)
    }

    fn iteration(&self) -> usize {
        AlignBase::iteration(self)
    }

    fn last_error(&self) -> f64 {
        AlignBase::last_error(self)
    }

    fn error_change(&self) -> f64 {
        AlignBase::error_change(self)
    }

    fn last_increment(&self) -> DVector<f64> {
        DVector::from_column_slice(AlignBase::last_increment(self).as_slice())
    }

    fn last_step_degenerate(&self) -> bool {
        AlignBase::last_step_degenerate(self)
    }
}
