//! PDF crop-and-scale page geometry
//!
//! This crate recomputes page boxes for a whole document from one crop
//! rectangle and one scale factor, using lopdf.
//!
//! - `geometry::validate`: pure check of a crop rectangle against one page
//! - `transform::transform_document`: all-or-nothing MediaBox/CropBox rewrite
//! - `preview::project_preview`: the same crop applied to a rendered page image
//! - `rasterize` / `convert`: external collaborators behind traits

pub mod command;
pub mod convert;
pub mod document;
pub mod error;
pub mod geometry;
pub mod preview;
pub mod rasterize;
pub mod transform;

#[cfg(any(test, feature = "test-util"))]
pub mod test_pdf;

use serde::Serialize;

pub use command::{ProcessMetrics, ProcessResult, TransformRequest};
pub use convert::{CommandConverter, DrawingFormat, FormatConverter};
pub use document::{inspect, DocumentInfo, PageInfo, PageOrientation, SourceDocument};
pub use error::{InvalidCrop, PageCropError};
pub use geometry::{validate, CropRect, PageBox, PageGeometry, PageRect};
pub use preview::project_preview;
pub use rasterize::{PdftoppmRasterizer, Rasterizer};
pub use transform::{transform, transform_document, TransformOutput};

/// Validation outcome for one page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageValidation {
    pub index: usize,
    pub valid: bool,
    pub error: Option<String>,
}

/// Check `crop` against every page independently.
///
/// Unlike the transform this reports every page instead of stopping at the
/// first failure.
pub fn validate_pages(bytes: &[u8], crop: &CropRect) -> Result<Vec<PageValidation>, PageCropError> {
    let doc = SourceDocument::load(bytes)?;
    (0..doc.page_count())
        .map(|index| {
            let rect = doc.page_rect(index)?;
            let error = validate(crop, &rect).err().map(|e| e.to_string());
            Ok(PageValidation {
                index,
                valid: error.is_none(),
                error,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{build_pdf, TestPage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_pages_reports_each_page() {
        let pdf = build_pdf(&[
            TestPage::sized(100.0, 200.0),
            TestPage::sized(50.0, 200.0),
            TestPage::sized(150.0, 200.0),
        ]);
        let crop = CropRect::new(10.0, 10.0, 90.0, 190.0);

        let results = validate_pages(&pdf, &crop).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].valid);
        assert!(!results[1].valid);
        assert_eq!(
            results[1].error.as_deref(),
            Some("right (90) exceeds page width (50)")
        );
        assert!(results[2].valid);
    }

    #[test]
    fn test_validate_pages_rejects_unreadable() {
        let crop = CropRect::new(0.0, 0.0, 1.0, 1.0);
        assert!(matches!(
            validate_pages(b"garbage bytes", &crop),
            Err(PageCropError::UnreadableDocument(_))
        ));
    }
}
