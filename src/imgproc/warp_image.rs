use super::sampling::{Pixel, Sampler};
use crate::warp::{Point, Transform2D};
use ndarray::{Array2, ArrayView2, Zip};

/// Rasterize `src` through `warp` into a new `(rows, cols)` image.
///
/// Destination pixel `(x, y)` receives `src(warp((x, y)))`.
pub fn warp_image<T, D, W, S>(
    src: &ArrayView2<T>,
    dst_shape: (usize, usize),
    warp: &W,
    sampler: &S,
) -> Array2<D>
where
    T: Pixel,
    D: Pixel + num_traits::Zero,
    W: Transform2D + Sync,
    S: Sampler,
{
    let mut dst = Array2::<D>::zeros(dst_shape);
    warp_image_into(src, &mut dst, dst_shape, warp, sampler);
    dst
}

/// Like [`warp_image`] but reuses `dst` when it already has the requested
/// shape.
pub fn warp_image_into<T, D, W, S>(
    src: &ArrayView2<T>,
    dst: &mut Array2<D>,
    dst_shape: (usize, usize),
    warp: &W,
    sampler: &S,
) where
    T: Pixel,
    D: Pixel + num_traits::Zero,
    W: Transform2D + Sync,
    S: Sampler,
{
    if dst.dim() != dst_shape {
        *dst = Array2::<D>::zeros(dst_shape);
    }
    if src.is_empty() {
        return;
    }
    Zip::indexed(dst).par_for_each(|(y, x), v| {
        let p = warp.apply(&Point::new(x as f64, y as f64));
        *v = sampler.sample_as(src, &p);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imgproc::{Bilinear, Nearest};
    use crate::warp::{TranslationWarp, Warp};

    #[test]
    fn test_identity_copies() {
        let src = Array2::from_shape_fn((6, 7), |(y, x)| (y * 7 + x) as u8);
        let out: Array2<u8> =
            warp_image(&src.view(), (6, 7), &TranslationWarp::identity(), &Bilinear);
        assert_eq!(out, src);
    }

    #[test]
    fn test_translation_crops() {
        let src = Array2::from_shape_fn((20, 20), |(y, x)| (y * 20 + x) as f32);
        let w = TranslationWarp::new(5.0, 3.0);
        let out: Array2<f32> = warp_image(&src.view(), (4, 6), &w, &Nearest);
        assert_eq!(out.dim(), (4, 6));
        assert_eq!(out[[0, 0]], src[[3, 5]]);
        assert_eq!(out[[3, 5]], src[[6, 10]]);
    }

    #[test]
    fn test_into_reuses_and_resizes() {
        let src = Array2::<f32>::from_elem((5, 5), 2.0);
        let mut dst = Array2::<f32>::zeros((1, 1));
        warp_image_into(&src.view(), &mut dst, (3, 4), &TranslationWarp::identity(), &Bilinear);
        assert_eq!(dst.dim(), (3, 4));
        assert!(dst.iter().all(|v| *v == 2.0));
    }
}
