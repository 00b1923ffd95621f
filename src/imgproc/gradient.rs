use super::sampling::{Pixel, Sampler};
use crate::warp::Point;
use nalgebra::RowVector2;
use ndarray::ArrayView2;

/// Central difference gradient `[dI/dx, dI/dy]` at `p`.
///
/// The four taps go through `sampler`, so borders follow its policy.
#[inline]
pub fn gradient<S: Sampler, T: Pixel>(
    sampler: &S,
    img: &ArrayView2<T>,
    p: &Point,
) -> RowVector2<f64> {
    let dx = sampler.sample(img, &Point::new(p.x + 1.0, p.y))
        - sampler.sample(img, &Point::new(p.x - 1.0, p.y));
    let dy = sampler.sample(img, &Point::new(p.x, p.y + 1.0))
        - sampler.sample(img, &Point::new(p.x, p.y - 1.0));
    RowVector2::new(dx * 0.5, dy * 0.5)
}
