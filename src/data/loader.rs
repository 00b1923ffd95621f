use crate::utils::image_conversion::grayimage_to_array;
use image::{open, GrayImage};
use ndarray::Array2;
use std::path::Path;

pub fn load_image<P: AsRef<Path>>(path: P) -> crate::Result<GrayImage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(anyhow::anyhow!("Image file does not exist: {}", path.display()));
    }
    let img = open(path)?;
    Ok(img.to_luma8())
}

/// Load an image as single-channel floating point, `[[y, x]]` indexed.
pub fn load_float_image<P: AsRef<Path>>(path: P) -> crate::Result<Array2<f32>> {
    Ok(grayimage_to_array(&load_image(path)?))
}

pub fn validate_image_size(img: &Array2<f32>, min_size: usize) -> crate::Result<()> {
    let (rows, cols) = img.dim();
    if cols < min_size || rows < min_size {
        return Err(anyhow::anyhow!("Image too small: {}x{}, minimum: {}x{}",
                          cols, rows, min_size, min_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_roundtrip_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ramp.png");
        let img = GrayImage::from_fn(12, 8, |x, y| image::Luma([(x * 10 + y) as u8]));
        img.save(&path).unwrap();

        let loaded = load_float_image(&path).unwrap();
        assert_eq!(loaded.dim(), (8, 12));
        assert_eq!(loaded[[7, 11]], 117.0);
        assert!(validate_image_size(&loaded, 8).is_ok());
        assert!(validate_image_size(&loaded, 10).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_image("/definitely/not/here.png").is_err());
    }
}
