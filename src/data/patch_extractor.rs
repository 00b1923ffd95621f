use ndarray::{s, Array2};

pub struct PatchExtractor;

impl PatchExtractor {
    /// Copy the `width` x `height` region whose top-left pixel is `(x, y)`
    pub fn extract_patch(
        source: &Array2<f32>,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> crate::Result<Array2<f32>> {
        let (rows, cols) = source.dim();
        if width == 0 || height == 0 {
            return Err(anyhow::anyhow!("Patch size must be non-zero"));
        }
        let fits = |start: usize, len: usize, bound: usize| {
            start.checked_add(len).is_some_and(|end| end <= bound)
        };
        if !fits(x, width, cols) || !fits(y, height, rows) {
            return Err(anyhow::anyhow!(
                "Patch {}x{} at ({}, {}) extends beyond {}x{} image",
                width, height, x, y, cols, rows
            ));
        }
        Ok(source.slice(s![y..y + height, x..x + width]).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_patch() {
        let img = Array2::from_shape_fn((10, 12), |(y, x)| (y * 12 + x) as f32);
        let patch = PatchExtractor::extract_patch(&img, 3, 2, 4, 5).unwrap();
        assert_eq!(patch.dim(), (5, 4));
        assert_eq!(patch[[0, 0]], img[[2, 3]]);
        assert_eq!(patch[[4, 3]], img[[6, 6]]);
        assert!(PatchExtractor::extract_patch(&img, 10, 0, 4, 4).is_err());
        assert!(PatchExtractor::extract_patch(&img, usize::MAX, 0, 4, 4).is_err());
    }
}
