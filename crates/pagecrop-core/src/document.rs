//! Source document loading and page inspection
//!
//! A `SourceDocument` is owned by a single request: it is parsed from the
//! uploaded bytes, read or consumed by one operation, and dropped when that
//! operation returns.

use lopdf::{Document, Object, ObjectId};
use serde::Serialize;

use crate::error::PageCropError;
use crate::geometry::PageRect;

/// Upper bound on page-tree depth when resolving inherited attributes
const MAX_TREE_DEPTH: usize = 64;

/// Page orientation
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

/// Information about a single page, used to bound the crop sliders
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Zero-based page index
    pub index: usize,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f64,
    /// Page height in points
    pub height: f64,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    pub orientation: PageOrientation,
}

/// Document-level summary returned by `inspect`
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    pub encrypted: bool,
    pub size_bytes: usize,
    pub pages: Vec<PageInfo>,
}

/// Geometry of one source page as read from the page tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct SourcePage {
    pub index: usize,
    pub id: ObjectId,
    pub rect: PageRect,
    /// Lower-left corner of the source MediaBox in PDF user space
    pub origin: (f64, f64),
    pub rotation: i32,
}

/// A parsed PDF, owned by the request that loaded it
pub struct SourceDocument {
    pub(crate) doc: Document,
    page_ids: Vec<ObjectId>,
    size_bytes: usize,
}

impl SourceDocument {
    /// Parse `bytes` as a PDF with at least one page.
    pub fn load(bytes: &[u8]) -> Result<Self, PageCropError> {
        quick_check(bytes)?;

        let doc = Document::load_mem(bytes)
            .map_err(|e| PageCropError::UnreadableDocument(format!("Failed to parse PDF: {}", e)))?;

        // get_pages is keyed by 1-based page number, so values come out in order
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PageCropError::UnreadableDocument(
                "PDF has no pages".to_string(),
            ));
        }

        Ok(Self {
            doc,
            page_ids,
            size_bytes: bytes.len(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Intrinsic rectangle of the page at `index`
    pub fn page_rect(&self, index: usize) -> Result<PageRect, PageCropError> {
        self.source_page(index).map(|page| page.rect)
    }

    pub(crate) fn source_page(&self, index: usize) -> Result<SourcePage, PageCropError> {
        let id = *self.page_ids.get(index).ok_or_else(|| {
            PageCropError::transform(
                index,
                format!("page does not exist (document has {} pages)", self.page_count()),
            )
        })?;

        let media_box = inherited_attribute(&self.doc, id, b"MediaBox")
            .ok_or_else(|| PageCropError::transform(index, "page has no MediaBox"))?;
        let [x0, y0, x1, y1] =
            parse_box(&self.doc, media_box).map_err(|reason| PageCropError::transform(index, reason))?;

        let rect = PageRect::new(x1 - x0, y1 - y0);
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(PageCropError::transform(
                index,
                format!("page has empty MediaBox ({} x {})", rect.width, rect.height),
            ));
        }

        Ok(SourcePage {
            index,
            id,
            rect,
            origin: (x0, y0),
            rotation: rotation(&self.doc, id),
        })
    }

    pub(crate) fn source_pages(&self) -> Result<Vec<SourcePage>, PageCropError> {
        (0..self.page_count()).map(|i| self.source_page(i)).collect()
    }

    pub fn info(&self) -> Result<DocumentInfo, PageCropError> {
        let pages = self
            .source_pages()?
            .into_iter()
            .map(|page| PageInfo {
                index: page.index,
                width: page.rect.width,
                height: page.rect.height,
                rotation: page.rotation,
                orientation: orientation(page.rect, page.rotation),
            })
            .collect();

        Ok(DocumentInfo {
            page_count: self.page_count(),
            version: self.doc.version.clone(),
            encrypted: self.doc.is_encrypted(),
            size_bytes: self.size_bytes,
            pages,
        })
    }
}

/// Load `bytes` and summarize the document
pub fn inspect(bytes: &[u8]) -> Result<DocumentInfo, PageCropError> {
    SourceDocument::load(bytes)?.info()
}

/// Cheap header check before handing bytes to the parser
fn quick_check(bytes: &[u8]) -> Result<(), PageCropError> {
    if bytes.len() < 8 {
        return Err(PageCropError::UnreadableDocument(
            "File too small to be a valid PDF".to_string(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PageCropError::UnreadableDocument(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }
    Ok(())
}

/// Follow a single indirect reference, if any
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page, walking up through `Parent` nodes
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Parse a box array into `[llx, lly, urx, ury]` with corners normalized
fn parse_box(doc: &Document, obj: &Object) -> Result<[f64; 4], String> {
    let array = obj
        .as_array()
        .map_err(|_| "MediaBox is not an array".to_string())?;
    if array.len() != 4 {
        return Err(format!("MediaBox must have 4 elements, found {}", array.len()));
    }

    let mut values = [0.0; 4];
    for (i, item) in array.iter().enumerate() {
        values[i] = match resolve(doc, item) {
            Some(Object::Integer(n)) => *n as f64,
            Some(Object::Real(n)) => *n as f64,
            _ => return Err(format!("MediaBox element {} is not a number", i)),
        };
    }

    let [ax, ay, bx, by] = values;
    Ok([ax.min(bx), ay.min(by), ax.max(bx), ay.max(by)])
}

fn rotation(doc: &Document, page_id: ObjectId) -> i32 {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(normalize_rotation)
        .unwrap_or(0)
}

/// Normalize rotation to 0, 90, 180, or 270
fn normalize_rotation(angle: i64) -> i32 {
    // rem_euclid keeps the value in 0..360, so the narrowing is lossless
    (angle.rem_euclid(360) / 90 * 90) as i32
}

fn orientation(rect: PageRect, rotation: i32) -> PageOrientation {
    let (width, height) = if rotation == 90 || rotation == 270 {
        (rect.height, rect.width)
    } else {
        (rect.width, rect.height)
    };

    if (width - height).abs() < 1.0 {
        PageOrientation::Square
    } else if width > height {
        PageOrientation::Landscape
    } else {
        PageOrientation::Portrait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{build_pdf, TestPage};
    use lopdf::Dictionary;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_rejects_non_pdf() {
        let result = SourceDocument::load(b"not a pdf file");
        assert!(matches!(result, Err(PageCropError::UnreadableDocument(_))));
    }

    #[test]
    fn test_load_rejects_small_file() {
        let result = SourceDocument::load(b"tiny");
        assert!(matches!(result, Err(PageCropError::UnreadableDocument(_))));
    }

    #[test]
    fn test_load_rejects_corrupt_body() {
        let result = SourceDocument::load(b"%PDF-1.7\ngarbage that is not a pdf\n%%EOF");
        assert!(matches!(result, Err(PageCropError::UnreadableDocument(_))));
    }

    #[test]
    fn test_load_rejects_zero_pages() {
        let pdf = build_pdf(&[]);
        let result = SourceDocument::load(&pdf);
        assert!(matches!(result, Err(PageCropError::UnreadableDocument(_))));
    }

    #[test]
    fn test_page_rects_follow_document_order() {
        let pdf = build_pdf(&[TestPage::sized(100.0, 200.0), TestPage::sized(150.0, 200.0)]);
        let doc = SourceDocument::load(&pdf).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_rect(0).unwrap(), PageRect::new(100.0, 200.0));
        assert_eq!(doc.page_rect(1).unwrap(), PageRect::new(150.0, 200.0));
    }

    #[test]
    fn test_page_rect_out_of_range() {
        let pdf = build_pdf(&[TestPage::letter()]);
        let doc = SourceDocument::load(&pdf).unwrap();
        assert!(matches!(
            doc.page_rect(3),
            Err(PageCropError::Transform { page: 3, .. })
        ));
    }

    #[test]
    fn test_media_box_with_offset_origin() {
        let page = TestPage::with_media_box([50.0, 20.0, 250.0, 420.0]);
        let pdf = build_pdf(&[page]);
        let doc = SourceDocument::load(&pdf).unwrap();
        let source = doc.source_page(0).unwrap();
        assert_eq!(source.rect, PageRect::new(200.0, 400.0));
        assert_eq!(source.origin, (50.0, 20.0));
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
        ]));
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(300),
                    Object::Integer(400),
                ]),
            ),
            ("Rotate", Object::Integer(90)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();

        let info = inspect(&buffer).unwrap();
        assert_eq!(info.pages[0].width, 300.0);
        assert_eq!(info.pages[0].height, 400.0);
        assert_eq!(info.pages[0].rotation, 90);
        assert_eq!(info.pages[0].orientation, PageOrientation::Landscape);
    }

    #[test]
    fn test_inspect_reports_document_info() {
        let pdf = build_pdf(&[TestPage::letter(), TestPage::sized(842.0, 595.0)]);
        let info = inspect(&pdf).unwrap();
        assert_eq!(info.page_count, 2);
        assert_eq!(info.version, "1.7");
        assert!(!info.encrypted);
        assert_eq!(info.size_bytes, pdf.len());
        assert_eq!(info.pages[0].orientation, PageOrientation::Portrait);
        assert_eq!(info.pages[1].orientation, PageOrientation::Landscape);
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(90), 90);
        assert_eq!(normalize_rotation(180), 180);
        assert_eq!(normalize_rotation(270), 270);
        assert_eq!(normalize_rotation(360), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
        // 2^32 + 90 is 346 mod 360; truncating to i32 first would give 90
        assert_eq!(normalize_rotation(4_294_967_386), 270);
        assert_eq!(normalize_rotation(i64::MIN), 270);
    }

    #[test]
    fn test_rotation_beyond_i32_range() {
        let mut doc = Document::load_mem(&build_pdf(&[TestPage::letter()])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Rotate", Object::Integer(4_294_967_386));
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).unwrap();

        let info = inspect(&pdf).unwrap();
        assert_eq!(info.pages[0].rotation, 270);
        assert_eq!(info.pages[0].orientation, PageOrientation::Landscape);
    }

    #[test]
    fn test_parse_box_normalizes_corners() {
        let doc = Document::with_version("1.7");
        let array = Object::Array(vec![
            Object::Real(612.0),
            Object::Integer(792),
            Object::Integer(0),
            Object::Real(0.0),
        ]);
        assert_eq!(parse_box(&doc, &array).unwrap(), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_parse_box_rejects_short_array() {
        let doc = Document::with_version("1.7");
        let array = Object::Array(vec![Object::Integer(0), Object::Integer(0)]);
        assert!(parse_box(&doc, &array).is_err());
    }
}
