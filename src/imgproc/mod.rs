//! Image processing primitives used by the alignment algorithms.

pub mod gradient;
pub mod pyramid;
pub mod sampling;
pub mod warp_image;

pub use gradient::gradient;
pub use pyramid::ImagePyramid;
pub use sampling::{border_reflect_101, Bilinear, Nearest, Pixel, Sampler};
pub use warp_image::{warp_image, warp_image_into};
