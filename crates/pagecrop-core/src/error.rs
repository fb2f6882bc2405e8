use thiserror::Error;

/// A crop rectangle that cannot be applied to a page.
///
/// Each variant names the comparison that failed so callers can point the
/// user at the offending slider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidCrop {
    #[error("crop values must be finite numbers")]
    NotFinite,

    #[error("left ({left}) must be less than right ({right})")]
    HorizontalOrder { left: f64, right: f64 },

    #[error("top ({top}) must be less than bottom ({bottom})")]
    VerticalOrder { top: f64, bottom: f64 },

    #[error("left ({left}) must not be negative")]
    NegativeLeft { left: f64 },

    #[error("top ({top}) must not be negative")]
    NegativeTop { top: f64 },

    #[error("right ({right}) exceeds page width ({width})")]
    ExceedsWidth { right: f64, width: f64 },

    #[error("bottom ({bottom}) exceeds page height ({height})")]
    ExceedsHeight { bottom: f64, height: f64 },

    #[error("scale {scale} leaves no page box within PDF coordinate limits")]
    Unrepresentable { scale: f64 },
}

#[derive(Error, Debug)]
pub enum PageCropError {
    #[error("Invalid crop for page {page}: {source}")]
    InvalidCrop {
        page: usize,
        #[source]
        source: InvalidCrop,
    },

    #[error("Invalid scale factor {0}: must be a positive finite number that keeps page boxes within PDF coordinate limits")]
    InvalidScale(f64),

    #[error("Transform failed on page {page}: {reason}")]
    Transform { page: usize, reason: String },

    #[error("Failed to serialize output document: {0}")]
    Serialization(String),

    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("Format conversion failed: {0}")]
    ConversionFailure(String),

    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    #[error("Image processing failed: {0}")]
    Image(String),
}

impl PageCropError {
    pub(crate) fn transform(page: usize, reason: impl Into<String>) -> Self {
        PageCropError::Transform {
            page,
            reason: reason.into(),
        }
    }
}
