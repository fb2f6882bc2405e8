//! On-screen preview of a crop
//!
//! Applies the same rectangle and scale the engine uses, but to a rendered
//! page image instead of the page boxes: crop, then resize to
//! `round(width * scale) x round(height * scale)` pixels.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::error::PageCropError;
use crate::geometry::{is_valid_scale, validate, CropRect, PageRect};

/// Largest preview the projection will allocate (about 120 MB of RGB)
pub const MAX_PREVIEW_PIXELS: u64 = 40_000_000;

/// Crop `image` to `crop` and resize the result by `scale`
pub fn project_preview(
    image: &RgbImage,
    crop: &CropRect,
    scale: f64,
) -> Result<RgbImage, PageCropError> {
    if !is_valid_scale(scale) {
        return Err(PageCropError::InvalidScale(scale));
    }
    let bounds = PageRect::new(image.width() as f64, image.height() as f64);
    validate(crop, &bounds)
        .map_err(|e| PageCropError::Image(format!("crop does not fit the preview image: {}", e)))?;

    let x0 = crop.left.round() as u32;
    let y0 = crop.top.round() as u32;
    let x1 = (crop.right.round() as u32).max(x0 + 1).min(image.width());
    let y1 = (crop.bottom.round() as u32).max(y0 + 1).min(image.height());
    if x0 >= x1 || y0 >= y1 {
        return Err(PageCropError::Image(
            "crop is smaller than one pixel".to_string(),
        ));
    }

    let (width, height) = preview_size(crop, scale)?;
    debug!(
        "Preview crop {}x{} at ({}, {}) -> {}x{}",
        x1 - x0,
        y1 - y0,
        x0,
        y0,
        width,
        height
    );

    let cropped = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
    Ok(imageops::resize(&cropped, width, height, FilterType::Lanczos3))
}

/// Pixel size of the preview for `crop` at `scale`, never below 1x1.
///
/// Fails when the preview would exceed `MAX_PREVIEW_PIXELS`.
pub fn preview_size(crop: &CropRect, scale: f64) -> Result<(u32, u32), PageCropError> {
    let width = (crop.width() * scale).round().max(1.0);
    let height = (crop.height() * scale).round().max(1.0);
    let too_large = || {
        PageCropError::Image(format!(
            "preview too large: {:.0}x{:.0} pixels exceeds the {} pixel limit",
            width, height, MAX_PREVIEW_PIXELS
        ))
    };
    // saturating casts; overflow of the product is caught below
    let pixels = (width as u64).checked_mul(height as u64).ok_or_else(too_large)?;
    if pixels > MAX_PREVIEW_PIXELS {
        return Err(too_large());
    }
    Ok((width as u32, height as u32))
}

pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, PageCropError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| PageCropError::Image(format!("Failed to decode image: {}", e)))
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, PageCropError> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| PageCropError::Image(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]))
    }

    #[test]
    fn test_preview_size_rounds_to_nearest_pixel() {
        let crop = CropRect::new(10.0, 10.0, 90.0, 190.0);
        assert_eq!(preview_size(&crop, 1.5).unwrap(), (120, 270));
        assert_eq!(
            preview_size(&CropRect::new(0.0, 0.0, 3.0, 5.0), 0.5).unwrap(),
            (2, 3)
        );
    }

    #[test]
    fn test_project_preview_dimensions() {
        let image = gradient(100, 200);
        let crop = CropRect::new(10.0, 10.0, 90.0, 190.0);

        let preview = project_preview(&image, &crop, 1.5).unwrap();

        assert_eq!(preview.dimensions(), (120, 270));
    }

    #[test]
    fn test_project_preview_identity_copies_region() {
        let image = gradient(64, 64);
        let crop = CropRect::new(8.0, 16.0, 24.0, 48.0);

        let preview = project_preview(&image, &crop, 1.0).unwrap();

        assert_eq!(preview.dimensions(), (16, 32));
        assert_eq!(preview.get_pixel(0, 0), image.get_pixel(8, 16));
        assert_eq!(preview.get_pixel(15, 31), image.get_pixel(23, 47));
    }

    #[test]
    fn test_project_preview_rejects_out_of_bounds_crop() {
        let image = gradient(50, 50);
        let crop = CropRect::new(0.0, 0.0, 60.0, 40.0);
        let result = project_preview(&image, &crop, 1.0);
        assert!(matches!(result, Err(PageCropError::Image(_))));
    }

    #[test]
    fn test_project_preview_rejects_bad_scale() {
        let image = gradient(50, 50);
        let crop = CropRect::new(0.0, 0.0, 10.0, 10.0);
        let result = project_preview(&image, &crop, 0.0);
        assert!(matches!(result, Err(PageCropError::InvalidScale(_))));
    }

    #[test]
    fn test_project_preview_rejects_oversized_output() {
        let image = RgbImage::new(10, 10);
        let crop = CropRect::new(0.0, 0.0, 10.0, 10.0);

        for scale in [1e9, 1e300, 1000.0] {
            match project_preview(&image, &crop, scale) {
                Err(PageCropError::Image(msg)) => assert!(msg.contains("preview too large")),
                other => panic!("scale {} gave {:?}", scale, other.map(|i| i.dimensions())),
            }
        }
    }

    #[test]
    fn test_preview_size_limit_is_inclusive() {
        // 8000 x 5000 is exactly the limit
        let crop = CropRect::new(0.0, 0.0, 80.0, 50.0);
        assert_eq!(preview_size(&crop, 100.0).unwrap(), (8000, 5000));
        assert!(preview_size(&crop, 100.1).is_err());
    }

    #[test]
    fn test_png_encode_decode() {
        let image = gradient(12, 7);
        let png = encode_png(&image).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        let decoded = decode_image(&png).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }
}
