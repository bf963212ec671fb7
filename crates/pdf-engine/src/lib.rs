use std::fs;
use std::path::Path;

use annotator_core::Size;
use lopdf::{Document, Object, ObjectId};

mod writer;

pub use writer::LopdfWriter;

/// US Letter, used when a page carries no usable MediaBox.
const FALLBACK_PAGE_SIZE: Size = Size { width: 612.0, height: 792.0 };

/// Bound on `Parent` hops when resolving inheritable page attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("no document loaded")]
    NotLoaded,
}

/// Page layout of a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub page_sizes: Vec<Size>,
}

impl DocumentInfo {
    pub fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    /// Size of a 1-based page.
    pub fn page_size(&self, page: u32) -> Result<Size, PdfEngineError> {
        page.checked_sub(1)
            .and_then(|index| self.page_sizes.get(index as usize))
            .copied()
            .ok_or(PdfEngineError::PageOutOfRange { page, page_count: self.page_count() })
    }
}

pub fn inspect(bytes: &[u8]) -> Result<DocumentInfo, PdfEngineError> {
    let document = load(bytes)?;
    let page_sizes: Vec<Size> = document
        .get_pages()
        .into_values()
        .map(|page_id| media_box_size(&document, page_id))
        .collect();

    if page_sizes.is_empty() {
        return Err(PdfEngineError::NoPages);
    }

    Ok(DocumentInfo { page_sizes })
}

pub fn inspect_path(path: &Path) -> Result<DocumentInfo, PdfEngineError> {
    inspect(&fs::read(path)?)
}

pub(crate) fn load(bytes: &[u8]) -> Result<Document, PdfEngineError> {
    if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(PdfEngineError::EncryptedUnsupported);
    }

    Ok(Document::load_mem(bytes)?)
}

/// Follow a reference to the object it names; direct objects pass through.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        direct => direct,
    }
}

/// Look up a page attribute, walking up the page tree for inherited values.
pub(crate) fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = page_id;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let dict = document.get_dictionary(node).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(document, value));
        }
        node = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }

    None
}

pub(crate) fn media_box_size(document: &Document, page_id: ObjectId) -> Size {
    inherited(document, page_id, b"MediaBox")
        .and_then(|object| object.as_array().ok())
        .and_then(|array| {
            if array.len() != 4 {
                return None;
            }
            let x0 = resolve(document, &array[0]).as_float().ok()?;
            let y0 = resolve(document, &array[1]).as_float().ok()?;
            let x1 = resolve(document, &array[2]).as_float().ok()?;
            let y1 = resolve(document, &array[3]).as_float().ok()?;
            Some(Size::new(f64::from((x1 - x0).abs()), f64::from((y1 - y0).abs())))
        })
        .unwrap_or(FALLBACK_PAGE_SIZE)
}

/// Test documents built in memory.
#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{dictionary, Document, Object};

    /// Blank pages with the given sizes; page 2 onward inherit resources
    /// from the page tree so both lookup paths are exercised.
    pub fn document(page_sizes: &[(i64, i64)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = page_sizes
            .iter()
            .map(|&(width, height)| {
                let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, b"0 0 m 10 10 l S".to_vec()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                    "Contents" => content_id,
                })
                .into()
            })
            .collect();

        doc.set_object(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "Resources" => dictionary! {},
            },
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("fixture should serialize");
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspects_page_count_and_sizes() {
        let info = inspect(&fixtures::document(&[(595, 842), (612, 792)])).expect("inspect should succeed");

        assert_eq!(info.page_count(), 2);
        assert_eq!(info.page_size(1).expect("page 1"), Size::new(595.0, 842.0));
        assert_eq!(info.page_size(2).expect("page 2"), Size::new(612.0, 792.0));
    }

    #[test]
    fn page_numbers_are_one_based() {
        let info = inspect(&fixtures::document(&[(595, 842)])).expect("inspect should succeed");

        assert!(matches!(info.page_size(0), Err(PdfEngineError::PageOutOfRange { page: 0, page_count: 1 })));
        assert!(matches!(info.page_size(2), Err(PdfEngineError::PageOutOfRange { page: 2, page_count: 1 })));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = inspect(b"definitely not a pdf").expect_err("should fail");
        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn encrypted_documents_are_rejected() {
        let err = inspect(b"%PDF-1.7\n/Encrypt 5 0 R").expect_err("should fail");
        assert!(matches!(err, PdfEngineError::EncryptedUnsupported));
    }

    #[test]
    fn inspect_path_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("doc.pdf");
        fs::write(&path, fixtures::document(&[(300, 400)])).expect("fixture should be written");

        let info = inspect_path(&path).expect("inspect should succeed");
        assert_eq!(info.page_sizes, vec![Size::new(300.0, 400.0)]);

        let missing = inspect_path(&dir.path().join("missing.pdf")).expect_err("missing file should fail");
        assert!(matches!(missing, PdfEngineError::Io(_)));
    }
}
