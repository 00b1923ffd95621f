//! Multi-resolution image pyramid, coarsest level first.

use super::sampling::border_reflect_101;
use crate::utils::image_conversion::AsFloatImage;
use crate::Result;
use anyhow::ensure;
use ndarray::{Array2, ArrayView2, Zip};
use std::ops::Index;
use tracing::debug;

const KERNEL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Minimum extent (both dimensions) a level must have to be halved again.
pub const MIN_LEVEL_EXTENT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct ImagePyramid {
    levels: Vec<Array2<f32>>,
}

impl ImagePyramid {
    /// Build `num_levels` levels from `image`.
    ///
    /// The finest level is the float conversion of `image`, every coarser
    /// level is the previous one smoothed with a 5-tap binomial kernel and
    /// decimated by two (`floor(dim / 2)`).
    pub fn create<I: AsFloatImage + ?Sized>(image: &I, num_levels: usize) -> Result<Self> {
        let num_levels = num_levels.max(1);
        let finest = image.to_float_image();
        ensure!(
            finest.nrows() > 0 && finest.ncols() > 0,
            "Cannot build a pyramid from an empty image"
        );

        let mut levels = Vec::with_capacity(num_levels);
        levels.push(finest);
        for i in 1..num_levels {
            let prev = &levels[i - 1];
            let (rows, cols) = prev.dim();
            ensure!(
                rows / 2 > 0 && cols / 2 > 0,
                "Pyramid level {} of a {}x{} image would be empty ({} levels requested)",
                i,
                levels[0].ncols(),
                levels[0].nrows(),
                num_levels
            );
            let next = pyr_down(&prev.view());
            levels.push(next);
        }
        levels.reverse();

        debug!(
            levels = num_levels,
            coarsest = ?levels[0].dim(),
            "Image pyramid created"
        );
        Ok(Self { levels })
    }

    /// Wrap existing levels, ordered coarsest first.
    pub fn from_levels(levels: Vec<Array2<f32>>) -> Self {
        Self { levels }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, i: usize) -> Option<&Array2<f32>> {
        self.levels.get(i)
    }

    pub fn levels(&self) -> &[Array2<f32>] {
        &self.levels
    }

    pub fn coarsest(&self) -> Option<&Array2<f32>> {
        self.levels.first()
    }

    pub fn finest(&self) -> Option<&Array2<f32>> {
        self.levels.last()
    }

    /// Sub-pyramid of `count` levels starting at `start`, clipped to the
    /// available levels.
    pub fn slice(&self, start: usize, count: usize) -> Self {
        let start = start.min(self.levels.len());
        let end = start.saturating_add(count).min(self.levels.len());
        Self {
            levels: self.levels[start..end].to_vec(),
        }
    }

    /// Number of levels such that the coarsest level is still at least
    /// `MIN_LEVEL_EXTENT` pixels wide and high before its last halving.
    /// Never less than one.
    pub fn max_levels_for_image_size(width: usize, height: usize) -> usize {
        let (mut w, mut h) = (width, height);
        let mut levels = 0;
        while w >= MIN_LEVEL_EXTENT && h >= MIN_LEVEL_EXTENT {
            w /= 2;
            h /= 2;
            levels += 1;
        }
        levels.max(1)
    }
}

impl Index<usize> for ImagePyramid {
    type Output = Array2<f32>;

    fn index(&self, i: usize) -> &Self::Output {
        &self.levels[i]
    }
}

/// Smooth with the separable binomial kernel and keep every second pixel.
pub fn pyr_down(src: &ArrayView2<f32>) -> Array2<f32> {
    let (rows, cols) = src.dim();
    let (out_rows, out_cols) = (rows / 2, cols / 2);

    // Horizontal pass only on the rows that survive decimation.
    let mut horizontal = Array2::<f32>::zeros((rows, out_cols));
    Zip::indexed(&mut horizontal).par_for_each(|(y, x), v| {
        let cx = 2 * x as i64;
        *v = KERNEL
            .iter()
            .enumerate()
            .map(|(k, w)| w * src[[y, border_reflect_101(cx + k as i64 - 2, cols)]])
            .sum();
    });

    let mut out = Array2::<f32>::zeros((out_rows, out_cols));
    Zip::indexed(&mut out).par_for_each(|(y, x), v| {
        let cy = 2 * y as i64;
        *v = KERNEL
            .iter()
            .enumerate()
            .map(|(k, w)| w * horizontal[[border_reflect_101(cy + k as i64 - 2, rows), x]])
            .sum();
    });
    out
}
