//! Page rasterization for previews and slider bounds

use std::fs;
use std::path::PathBuf;

use image::RgbImage;
use tracing::debug;

use crate::convert::run_tool;
use crate::error::PageCropError;
use crate::preview::decode_image;

/// At 72 dpi one pixel equals one PDF point, so crop values picked on the
/// preview map directly onto page coordinates.
pub const DEFAULT_DPI: u32 = 72;

/// Renders a single page of a PDF to an RGB image
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, document: &[u8], page_index: usize) -> Result<RgbImage, PageCropError>;
}

/// Rasterizer backed by poppler's `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    pub program: PathBuf,
    pub dpi: u32,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
            dpi: DEFAULT_DPI,
        }
    }
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }

    fn args(&self, page_index: usize, input: &str, prefix: &str) -> Vec<String> {
        let page = (page_index + 1).to_string();
        vec![
            "-f".to_string(),
            page.clone(),
            "-l".to_string(),
            page,
            "-r".to_string(),
            self.dpi.to_string(),
            "-png".to_string(),
            "-singlefile".to_string(),
            input.to_string(),
            prefix.to_string(),
        ]
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, document: &[u8], page_index: usize) -> Result<RgbImage, PageCropError> {
        let workspace = tempfile::tempdir()
            .map_err(|e| PageCropError::Rasterize(format!("Failed to create temp dir: {}", e)))?;
        let input = workspace.path().join("document.pdf");
        let prefix = workspace.path().join("page");
        fs::write(&input, document)
            .map_err(|e| PageCropError::Rasterize(format!("Failed to stage document: {}", e)))?;

        let args = self.args(
            page_index,
            &input.to_string_lossy(),
            &prefix.to_string_lossy(),
        );
        run_tool(&self.program, &args).map_err(PageCropError::Rasterize)?;

        let png = fs::read(prefix.with_extension("png"))
            .map_err(|e| PageCropError::Rasterize(format!("Rendered page not found: {}", e)))?;
        let image = decode_image(&png)?;
        debug!(
            "Rasterized page {} at {} dpi: {}x{}",
            page_index,
            self.dpi,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_use_one_based_page() {
        let rasterizer = PdftoppmRasterizer::default();
        let args = rasterizer.args(2, "in.pdf", "out");
        assert_eq!(
            args,
            vec!["-f", "3", "-l", "3", "-r", "72", "-png", "-singlefile", "in.pdf", "out"]
        );
    }

    #[test]
    fn test_missing_program_is_rasterize_error() {
        let rasterizer = PdftoppmRasterizer::new("definitely-not-pdftoppm", 72);
        let result = rasterizer.rasterize(b"%PDF-1.7", 0);
        assert!(matches!(result, Err(PageCropError::Rasterize(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_is_rasterize_error() {
        let rasterizer = PdftoppmRasterizer::new("false", 72);
        let result = rasterizer.rasterize(b"%PDF-1.7", 0);
        assert!(matches!(result, Err(PageCropError::Rasterize(_))));
    }
}
