//! Crop rectangle validation and page-box arithmetic
//!
//! All rectangles here live in top-left page space: the origin is the
//! upper-left corner of the page and y grows downward, matching a preview
//! image rendered at 72 dpi. Conversion to PDF user space happens only when
//! boxes are written back to a document (see `transform`).

use serde::{Deserialize, Serialize};

use crate::error::InvalidCrop;

/// Largest magnitude written into a page box.
///
/// PDF consumers only have to handle integers up to 2^31 - 1, and lopdf
/// writes integral reals without a decimal point, so larger values do not
/// survive a round trip.
pub const MAX_COORDINATE: f64 = 2_147_483_647.0;

/// Crop rectangle in unscaled page space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CropRect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }
}

/// Intrinsic size of a page in PDF points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageRect {
    pub width: f64,
    pub height: f64,
}

impl PageRect {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box `(x0, y0)`–`(x1, y1)` in top-left page space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Component-wise clamp of `self` against `bounds`.
    ///
    /// Returns `None` when the overlap has no area.
    pub fn intersect(&self, bounds: &PageBox) -> Option<PageBox> {
        let clamped = PageBox {
            x0: self.x0.max(bounds.x0),
            y0: self.y0.max(bounds.y0),
            x1: self.x1.min(bounds.x1),
            y1: self.y1.min(bounds.y1),
        };
        (clamped.x0 < clamped.x1 && clamped.y0 < clamped.y1).then_some(clamped)
    }

    pub fn contains(&self, other: &PageBox) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Corners as the single-precision reals stored in a PDF
    pub fn to_pdf_reals(&self) -> Option<[f32; 4]> {
        narrow_box([self.x0, self.y0, self.x1, self.y1])
    }
}

/// Narrow `[x0, y0, x1, y1]` to PDF reals.
///
/// Returns `None` when a corner is outside `±MAX_COORDINATE` or the box
/// loses its area at single precision.
pub fn narrow_box(values: [f64; 4]) -> Option<[f32; 4]> {
    if values.iter().any(|v| !v.is_finite() || v.abs() > MAX_COORDINATE) {
        return None;
    }
    let [x0, y0, x1, y1] = values.map(|v| v as f32);
    (x0 < x1 && y0 < y1).then_some([x0, y0, x1, y1])
}

/// Computed boxes for one output page
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PageGeometry {
    pub media_box: PageBox,
    pub crop_box: PageBox,
}

/// Check a crop rectangle against the unscaled bounds of one page.
///
/// Accepts exactly the rectangles with `0 <= left < right <= width` and
/// `0 <= top < bottom <= height`.
pub fn validate(crop: &CropRect, page: &PageRect) -> Result<(), InvalidCrop> {
    if !crop.is_finite() {
        return Err(InvalidCrop::NotFinite);
    }
    if crop.left >= crop.right {
        return Err(InvalidCrop::HorizontalOrder {
            left: crop.left,
            right: crop.right,
        });
    }
    if crop.top >= crop.bottom {
        return Err(InvalidCrop::VerticalOrder {
            top: crop.top,
            bottom: crop.bottom,
        });
    }
    if crop.left < 0.0 {
        return Err(InvalidCrop::NegativeLeft { left: crop.left });
    }
    if crop.top < 0.0 {
        return Err(InvalidCrop::NegativeTop { top: crop.top });
    }
    if crop.right > page.width {
        return Err(InvalidCrop::ExceedsWidth {
            right: crop.right,
            width: page.width,
        });
    }
    if crop.bottom > page.height {
        return Err(InvalidCrop::ExceedsHeight {
            bottom: crop.bottom,
            height: page.height,
        });
    }
    Ok(())
}

/// A scale factor the engine accepts
pub fn is_valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

/// Validate `crop` against `page`, then scale both and clamp the crop box
/// into the scaled media box.
///
/// Validation runs against the unscaled page while the clamp runs against
/// the scaled one; both stages are needed. A scale that pushes either box
/// out of the PDF coordinate range, or shrinks it below single precision,
/// fails with `InvalidCrop::Unrepresentable`.
pub fn project(crop: &CropRect, page: &PageRect, scale: f64) -> Result<PageGeometry, InvalidCrop> {
    validate(crop, page)?;

    let media_box = PageBox::new(0.0, 0.0, page.width * scale, page.height * scale);
    let raw_crop_box = PageBox::new(
        crop.left * scale,
        crop.top * scale,
        crop.right * scale,
        crop.bottom * scale,
    );
    let crop_box = raw_crop_box
        .intersect(&media_box)
        .ok_or(InvalidCrop::Unrepresentable { scale })?;
    if media_box.to_pdf_reals().is_none() || crop_box.to_pdf_reals().is_none() {
        return Err(InvalidCrop::Unrepresentable { scale });
    }

    Ok(PageGeometry {
        media_box,
        crop_box,
    })
}
