//! In-memory PDF fixtures for tests
//!
//! Compiled for this crate's unit tests and, through the `test-util`
//! feature, for the server's endpoint tests.

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};

pub struct TestPage {
    pub media_box: [f64; 4],
    pub label: String,
}

impl TestPage {
    pub fn sized(width: f64, height: f64) -> Self {
        Self::with_media_box([0.0, 0.0, width, height])
    }

    pub fn letter() -> Self {
        Self::sized(612.0, 792.0)
    }

    pub fn with_media_box(media_box: [f64; 4]) -> Self {
        Self {
            media_box,
            label: String::new(),
        }
    }

    pub fn labeled(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

fn number(value: f64) -> Object {
    if value.fract() == 0.0 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value as f32)
    }
}

/// Build a PDF with one page per entry, each carrying a small text stream
pub fn build_pdf(pages: &[TestPage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        let label = if page.label.is_empty() {
            format!("Page {}", i + 1)
        } else {
            page.label.clone()
        };
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![Object::Integer(10), Object::Integer(10)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        label.into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(page.media_box.iter().copied().map(number).collect()),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page_dict));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(pages.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Read a page box back from saved output as `[llx, lly, urx, ury]`
pub fn read_box(doc: &Document, page_id: lopdf::ObjectId, key: &[u8]) -> [f64; 4] {
    let array = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(key)
        .unwrap()
        .as_array()
        .unwrap();
    let mut values = [0.0; 4];
    for (i, item) in array.iter().enumerate() {
        values[i] = match item {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            other => panic!("box element is not a number: {:?}", other),
        };
    }
    values
}
