//! Pixel interpolation with reflect-101 borders.
//!
//! Integer coordinates address pixel centers: sampling `(x, y)` with
//! integral values returns the stored value of column `x`, row `y`.

use crate::warp::Point;
use ndarray::ArrayView2;
use num_traits::{Bounded, NumCast, ToPrimitive};

/// Sample type that can be read into and written from `f64`.
pub trait Pixel: Copy + Send + Sync + 'static {
    fn to_f64(self) -> f64;

    /// Saturating conversion, integer types round to nearest.
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_float_pixel {
    ($($t:ty),*) => {$(
        impl Pixel for $t {
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    )*};
}

macro_rules! impl_int_pixel {
    ($($t:ty),*) => {$(
        impl Pixel for $t {
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                saturate_cast::<$t>(v)
            }
        }
    )*};
}

impl_float_pixel!(f32, f64);
impl_int_pixel!(u8, u16, i16, i32);

/// Round and clamp into the range of `T`. NaN maps to the minimum.
pub fn saturate_cast<T: Bounded + NumCast + ToPrimitive>(v: f64) -> T {
    let lo = T::min_value().to_f64().unwrap_or(f64::MIN);
    let hi = T::max_value().to_f64().unwrap_or(f64::MAX);
    NumCast::from(v.round().clamp(lo, hi)).unwrap_or_else(T::min_value)
}

/// Map any index into `[0, len)` by mirroring at the borders without
/// repeating the edge sample (`gfedcb|abcdefgh|gfedcba`).
///
/// Indices arbitrarily far outside fold periodically. `len` must be
/// non-zero.
#[inline]
pub fn border_reflect_101(index: i64, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let n = len as i64;
    if (0..n).contains(&index) {
        return index as usize;
    }
    let period = 2 * (n - 1);
    let r = index.rem_euclid(period);
    (if r >= n { period - r } else { r }) as usize
}

/// Keep huge coordinates away from integer overflow; the reflection is
/// periodic anyway.
#[inline]
fn floor_index(v: f64) -> i64 {
    v.floor().clamp(-1e15, 1e15) as i64
}

/// Pixel value interpolation strategy.
pub trait Sampler: Copy + Default + Send + Sync + 'static {
    /// Interpolated value at `p`, never reads out of bounds.
    fn sample<T: Pixel>(&self, img: &ArrayView2<T>, p: &Point) -> f64;

    /// Sample and saturate-cast to the destination type.
    fn sample_as<T: Pixel, D: Pixel>(&self, img: &ArrayView2<T>, p: &Point) -> D {
        D::from_f64(self.sample(img, p))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bilinear;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nearest;

impl Sampler for Bilinear {
    #[inline]
    fn sample<T: Pixel>(&self, img: &ArrayView2<T>, p: &Point) -> f64 {
        let (rows, cols) = img.dim();
        let x0 = floor_index(p.x);
        let y0 = floor_index(p.y);
        let fx = p.x - x0 as f64;
        let fy = p.y - y0 as f64;

        let xa = border_reflect_101(x0, cols);
        let xb = border_reflect_101(x0 + 1, cols);
        let ya = border_reflect_101(y0, rows);
        let yb = border_reflect_101(y0 + 1, rows);

        let v00 = img[[ya, xa]].to_f64();
        let v01 = img[[ya, xb]].to_f64();
        let v10 = img[[yb, xa]].to_f64();
        let v11 = img[[yb, xb]].to_f64();

        let top = v00 + (v01 - v00) * fx;
        let bottom = v10 + (v11 - v10) * fx;
        top + (bottom - top) * fy
    }
}

impl Sampler for Nearest {
    #[inline]
    fn sample<T: Pixel>(&self, img: &ArrayView2<T>, p: &Point) -> f64 {
        let (rows, cols) = img.dim();
        let x = border_reflect_101(floor_index(p.x), cols);
        let y = border_reflect_101(floor_index(p.y), rows);
        img[[y, x]].to_f64()
    }
}
