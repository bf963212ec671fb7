//! Export pipeline: annotated PDF plus JSON sidecar.
//!
//! Byte-level PDF work is delegated to a [`PdfWriter`]. Failures from any
//! stage are folded into one [`ExportError`] and nothing partial is returned.

use std::error::Error as StdError;

use crate::annotation::{self, Annotation};
use crate::config::{AnnotatorConfig, RgbColor};
use crate::projection::{DrawCommand, ExportProjector};
use crate::transform::{Point, Rect, Size};

/// PDF-authoring collaborator. Page numbers are 1-based.
pub trait PdfWriter {
    type Error: StdError + Send + Sync + 'static;

    /// Load the source document.
    fn load(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Number of pages in the loaded source document.
    fn page_count(&self) -> u32;

    /// Size of a source page in page units.
    fn page_size(&self, page: u32) -> Result<Size, Self::Error>;

    /// Keep source page `page` in the output. Pages never copied are dropped
    /// on save; draw calls address pages by their source number.
    fn copy_page(&mut self, page: u32) -> Result<(), Self::Error>;

    fn draw_rectangle(
        &mut self,
        page: u32,
        rect: Rect,
        stroke: RgbColor,
        stroke_width: f64,
    ) -> Result<(), Self::Error>;

    fn draw_text(
        &mut self,
        page: u32,
        text: &str,
        origin: Point,
        size: f64,
        color: RgbColor,
    ) -> Result<(), Self::Error>;

    /// Serialize the output document.
    fn save(&mut self) -> Result<Vec<u8>, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Load,
    CopyPages,
    Draw,
    Save,
    Sidecar,
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Self::Load => "loading the source PDF",
            Self::CopyPages => "copying pages",
            Self::Draw => "drawing annotations",
            Self::Save => "writing the PDF",
            Self::Sidecar => "serializing annotations",
        };
        f.write_str(stage)
    }
}

/// The one user-visible export failure. The failing stage and the
/// underlying error are available through the error chain.
#[derive(Debug, thiserror::Error)]
#[error("Failed to export PDF and annotations")]
pub struct ExportError {
    stage: ExportStage,
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl ExportError {
    pub(crate) fn new<E>(stage: ExportStage, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self { stage, source: Box::new(source) }
    }

    pub fn stage(&self) -> ExportStage {
        self.stage
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifacts {
    pub pdf: Vec<u8>,
    pub json: String,
}

/// Draw commands for every annotation that targets an existing page.
pub fn plan_draw_commands<W: PdfWriter>(
    writer: &W,
    annotations: &[Annotation],
    config: &AnnotatorConfig,
) -> Result<Vec<DrawCommand>, W::Error> {
    let projector = ExportProjector::new(config);
    let page_count = writer.page_count();
    let mut commands = Vec::with_capacity(annotations.len() * 2);

    for annotation in annotations {
        if annotation.page == 0 || annotation.page > page_count {
            log::warn!(
                "skipping annotation {}: page {} is outside 1..={page_count}",
                annotation.id,
                annotation.page
            );
            continue;
        }

        let media_box = writer.page_size(annotation.page)?;
        let page_height = projector.page_height(Some(media_box.height));
        commands.extend(projector.draw_commands(annotation, page_height));
    }

    Ok(commands)
}

/// Produce the annotated PDF and the JSON sidecar from the source bytes.
pub fn export_document<W: PdfWriter>(
    writer: &mut W,
    source: &[u8],
    annotations: &[Annotation],
    config: &AnnotatorConfig,
) -> Result<ExportArtifacts, ExportError> {
    writer.load(source).map_err(|err| ExportError::new(ExportStage::Load, err))?;

    for page in 1..=writer.page_count() {
        writer.copy_page(page).map_err(|err| ExportError::new(ExportStage::CopyPages, err))?;
    }

    let commands =
        plan_draw_commands(writer, annotations, config).map_err(|err| ExportError::new(ExportStage::Draw, err))?;

    for command in &commands {
        let drawn = match command {
            DrawCommand::Rectangle { page, rect, stroke, stroke_width } => {
                writer.draw_rectangle(*page, *rect, *stroke, *stroke_width)
            }
            DrawCommand::Text { page, text, origin, size, color } => {
                writer.draw_text(*page, text, *origin, *size, *color)
            }
        };
        drawn.map_err(|err| ExportError::new(ExportStage::Draw, err))?;
    }

    let pdf = writer.save().map_err(|err| ExportError::new(ExportStage::Save, err))?;
    let json = annotation::to_json(annotations).map_err(|err| ExportError::new(ExportStage::Sidecar, err))?;

    log::debug!("exported {} annotations ({} bytes of PDF)", annotations.len(), pdf.len());
    Ok(ExportArtifacts { pdf, json })
}
