//! `PdfWriter` backed by lopdf.
//!
//! Drawing is buffered per page and stamped on save: the page's existing
//! content is wrapped in `q`/`Q` so annotation overlays start from a clean
//! graphics state, and the label font is merged into the page resources.

use std::collections::{BTreeMap, BTreeSet};

use annotator_core::{PdfWriter, Point, Rect, RgbColor, Size};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::{inherited, load, media_box_size, resolve, PdfEngineError};

const LABEL_FONT: &str = "AnnF1";

#[derive(Debug, Default)]
pub struct LopdfWriter {
    document: Option<Document>,
    kept: BTreeSet<u32>,
    overlays: BTreeMap<u32, Vec<Operation>>,
}

impl LopdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn document(&self) -> Result<&Document, PdfEngineError> {
        self.document.as_ref().ok_or(PdfEngineError::NotLoaded)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, PdfEngineError> {
        let pages = self.document()?.get_pages();
        pages.get(&page).copied().ok_or(PdfEngineError::PageOutOfRange { page, page_count: pages.len() as u32 })
    }

    fn overlay(&mut self, page: u32) -> Result<&mut Vec<Operation>, PdfEngineError> {
        self.page_id(page)?;
        Ok(self.overlays.entry(page).or_default())
    }
}

impl PdfWriter for LopdfWriter {
    type Error = PdfEngineError;

    fn load(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let document = load(bytes)?;
        if document.get_pages().is_empty() {
            return Err(PdfEngineError::NoPages);
        }

        self.document = Some(document);
        self.kept.clear();
        self.overlays.clear();
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |document| document.get_pages().len() as u32)
    }

    fn page_size(&self, page: u32) -> Result<Size, Self::Error> {
        let page_id = self.page_id(page)?;
        Ok(media_box_size(self.document()?, page_id))
    }

    fn copy_page(&mut self, page: u32) -> Result<(), Self::Error> {
        self.page_id(page)?;
        self.kept.insert(page);
        Ok(())
    }

    fn draw_rectangle(
        &mut self,
        page: u32,
        rect: Rect,
        stroke: RgbColor,
        stroke_width: f64,
    ) -> Result<(), Self::Error> {
        self.overlay(page)?.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", color_operands(stroke)),
            Operation::new("w", vec![real(stroke_width)]),
            Operation::new("re", vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: u32,
        text: &str,
        origin: Point,
        size: f64,
        color: RgbColor,
    ) -> Result<(), Self::Error> {
        self.overlay(page)?.extend([
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("rg", color_operands(color)),
            Operation::new("Tf", vec![LABEL_FONT.into(), real(size)]),
            Operation::new("Td", vec![real(origin.x), real(origin.y)]),
            Operation::new("Tj", vec![Object::String(encode_label(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>, Self::Error> {
        let mut document = self.document.take().ok_or(PdfEngineError::NotLoaded)?;
        let overlays = std::mem::take(&mut self.overlays);
        let pages = document.get_pages();

        if !overlays.is_empty() {
            let font_id = document.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });

            for (page, operations) in overlays {
                if let Some(&page_id) = pages.get(&page) {
                    stamp_page(&mut document, page_id, operations, font_id)?;
                }
            }
        }

        let dropped: Vec<u32> = pages.keys().copied().filter(|page| !self.kept.contains(page)).collect();
        if !dropped.is_empty() {
            log::debug!("dropping {} uncopied pages", dropped.len());
            document.delete_pages(&dropped);
        }
        self.kept.clear();

        let mut buffer = Vec::new();
        document.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

fn stamp_page(
    document: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
    font_id: ObjectId,
) -> Result<(), PdfEngineError> {
    let mut resources = inherited(document, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|object| resolve(document, object).as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    fonts.set(LABEL_FONT, font_id);
    resources.set("Font", fonts);

    let mut contents = match document.get_dictionary(page_id)?.get(b"Contents") {
        Ok(object) => match resolve(document, object) {
            Object::Array(items) => items.clone(),
            _ => vec![object.clone()],
        },
        Err(_) => Vec::new(),
    };

    let mut overlay = Vec::with_capacity(operations.len() + 1);
    overlay.push(Operation::new("Q", vec![]));
    overlay.extend(operations);
    // Streams are concatenated as-is, so keep the first token separated.
    let mut overlay_bytes = b"\n".to_vec();
    overlay_bytes.extend(Content { operations: overlay }.encode()?);

    let save_id = document.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let overlay_id = document.add_object(Stream::new(dictionary! {}, overlay_bytes));
    contents.insert(0, save_id.into());
    contents.push(overlay_id.into());

    let page = document.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", resources);
    page.set("Contents", contents);
    Ok(())
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operands(color: RgbColor) -> Vec<Object> {
    vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)]
}

/// The label font uses a single-byte encoding; characters outside Latin-1
/// become `?`.
fn encode_label(text: &str) -> Vec<u8> {
    text.chars().map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?')).collect()
}
