use crate::Result;
use image::GrayImage;
use ndarray::{Array2, ArrayView2};

/// Anything that can serve as a single-channel alignment input.
pub trait AsFloatImage {
    /// Copy into an `f32` array indexed `[[y, x]]`.
    fn to_float_image(&self) -> Array2<f32>;
}

impl AsFloatImage for GrayImage {
    fn to_float_image(&self) -> Array2<f32> {
        grayimage_to_array(self)
    }
}

impl AsFloatImage for Array2<f32> {
    fn to_float_image(&self) -> Array2<f32> {
        self.clone()
    }
}

impl AsFloatImage for Array2<u8> {
    fn to_float_image(&self) -> Array2<f32> {
        self.mapv(f32::from)
    }
}

impl AsFloatImage for ArrayView2<'_, f32> {
    fn to_float_image(&self) -> Array2<f32> {
        self.to_owned()
    }
}

impl AsFloatImage for ArrayView2<'_, u8> {
    fn to_float_image(&self) -> Array2<f32> {
        self.mapv(f32::from)
    }
}

/// Convert a GrayImage to a float array
pub fn grayimage_to_array(image: &GrayImage) -> Array2<f32> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        f32::from(image.get_pixel(x as u32, y as u32)[0])
    })
}

/// Convert a float array back to a GrayImage, rounding and saturating
pub fn array_to_grayimage(array: &Array2<f32>) -> Result<GrayImage> {
    let (rows, cols) = array.dim();
    let data: Vec<u8> = array
        .iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();

    let gray_image = GrayImage::from_raw(cols as u32, rows as u32, data)
        .ok_or_else(|| anyhow::anyhow!("Failed to create GrayImage from {}x{} array", cols, rows))?;

    Ok(gray_image)
}
