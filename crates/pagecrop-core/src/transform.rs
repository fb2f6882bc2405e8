//! Page transform engine
//!
//! Recomputes MediaBox and CropBox for every page of a document from one
//! crop rectangle and one scale factor. The operation is all-or-nothing:
//! every page is validated and projected before the first box is written,
//! so a failure on any page returns an error and no output bytes.

use lopdf::{Document, Object};
use tracing::{debug, info};

use crate::command::TransformRequest;
use crate::document::{SourceDocument, SourcePage};
use crate::error::{InvalidCrop, PageCropError};
use crate::geometry::{is_valid_scale, narrow_box, project, CropRect, PageBox, PageGeometry};

/// Serialized output document plus the boxes written to each page
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub bytes: Vec<u8>,
    /// Geometry per page, in document order, in top-left page space
    pub pages: Vec<PageGeometry>,
}

/// Run a transform request end to end
pub fn apply(request: &TransformRequest) -> Result<TransformOutput, PageCropError> {
    transform_document(&request.document, &request.crop, request.scale)
}

/// Parse `bytes` and transform every page
pub fn transform_document(
    bytes: &[u8],
    crop: &CropRect,
    scale: f64,
) -> Result<TransformOutput, PageCropError> {
    let source = SourceDocument::load(bytes)?;
    transform(source, crop, scale)
}

/// Transform an already-loaded document, consuming it
pub fn transform(
    source: SourceDocument,
    crop: &CropRect,
    scale: f64,
) -> Result<TransformOutput, PageCropError> {
    if !is_valid_scale(scale) {
        return Err(PageCropError::InvalidScale(scale));
    }

    let page_count = source.page_count();
    let mut plan = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let page = source.source_page(index)?;
        let geometry = project(crop, &page.rect, scale).map_err(|reason| match reason {
            InvalidCrop::Unrepresentable { scale } => PageCropError::InvalidScale(scale),
            reason => PageCropError::InvalidCrop {
                page: index,
                source: reason,
            },
        })?;
        let boxes = user_space_boxes(&page, &geometry)
            .ok_or(PageCropError::InvalidScale(scale))?;
        debug!(
            "Page {}: {}x{} -> media {:?}, crop {:?}",
            index, page.rect.width, page.rect.height, geometry.media_box, geometry.crop_box
        );
        plan.push((page, geometry, boxes));
    }

    let mut doc = source.doc;
    for (page, _, boxes) in &plan {
        write_boxes(&mut doc, page, boxes)?;
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PageCropError::Serialization(e.to_string()))?;

    info!(
        "Transformed {} pages at scale {} ({} bytes)",
        page_count,
        scale,
        bytes.len()
    );

    Ok(TransformOutput {
        bytes,
        pages: plan.into_iter().map(|(_, geometry, _)| geometry).collect(),
    })
}

/// MediaBox and CropBox narrowed to PDF reals
struct UserSpaceBoxes {
    media_box: [f32; 4],
    crop_box: [f32; 4],
}

/// Flip both boxes into PDF user space.
///
/// Boxes stay anchored at the source MediaBox origin so page content keeps
/// its absolute position. Returns `None` if the origin offset pushes a box
/// out of the PDF coordinate range.
fn user_space_boxes(page: &SourcePage, geometry: &PageGeometry) -> Option<UserSpaceBoxes> {
    let page_height = geometry.media_box.height();
    Some(UserSpaceBoxes {
        media_box: narrow_box(to_user_space(&geometry.media_box, page.origin, page_height))?,
        crop_box: narrow_box(to_user_space(&geometry.crop_box, page.origin, page_height))?,
    })
}

fn write_boxes(
    doc: &mut Document,
    page: &SourcePage,
    boxes: &UserSpaceBoxes,
) -> Result<(), PageCropError> {
    let dict = doc.get_dictionary_mut(page.id).map_err(|e| {
        PageCropError::transform(page.index, format!("page object is not a dictionary: {}", e))
    })?;
    dict.set("MediaBox", box_object(boxes.media_box));
    dict.set("CropBox", box_object(boxes.crop_box));
    Ok(())
}

/// Flip a top-left box into bottom-left PDF coordinates
fn to_user_space(rect: &PageBox, origin: (f64, f64), page_height: f64) -> [f64; 4] {
    let (ox, oy) = origin;
    [
        ox + rect.x0,
        oy + page_height - rect.y1,
        ox + rect.x1,
        oy + page_height - rect.y0,
    ]
}

fn box_object(values: [f32; 4]) -> Object {
    Object::Array(values.iter().map(|v| Object::Real(*v)).collect())
}
