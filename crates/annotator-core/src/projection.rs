//! Reprojection from viewport pixels into PDF page space.
//!
//! ```text
//! pdfX = (x - anchorX) * 100 / zoom
//! pdfY = (y - anchorY) * 100 / zoom
//! rectY = pageHeight - pdfY - pdfHeight
//! ```
//!
//! The same anchor used by [`crate::store::AnnotationStore::rescale_for_zoom`]
//! is subtracted here, which makes rescaling and exporting commute.

use crate::annotation::Annotation;
use crate::config::{AnchorOffset, AnnotatorConfig, PageHeight, RgbColor};
use crate::transform::{Mat3, Point, Rect};

/// Drawing instruction for the PDF writer, in page space (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rectangle { page: u32, rect: Rect, stroke: RgbColor, stroke_width: f64 },
    Text { page: u32, text: String, origin: Point, size: f64, color: RgbColor },
}

/// Viewport → page transform for geometry captured at `zoom` percent.
///
/// Removes the anchor offset, undoes the zoom, then flips the y axis about
/// `page_height`.
pub fn viewport_to_page(anchor: AnchorOffset, zoom: u32, page_height: f64) -> Mat3 {
    let unzoom = 100.0 / f64::from(zoom);
    let flip = Mat3::new([1.0, 0.0, 0.0, 0.0, -1.0, page_height, 0.0, 0.0, 1.0]);

    flip.compose(&Mat3::scaling(unzoom, unzoom)).compose(&Mat3::translation(-anchor.x, -anchor.y))
}

#[derive(Debug, Clone, Copy)]
pub struct ExportProjector<'a> {
    config: &'a AnnotatorConfig,
}

impl<'a> ExportProjector<'a> {
    pub fn new(config: &'a AnnotatorConfig) -> Self {
        Self { config }
    }

    /// Height to flip about: the calibration constant, or the page's own
    /// MediaBox height when configured (and known).
    pub fn page_height(&self, media_box_height: Option<f64>) -> f64 {
        match self.config.page_height {
            PageHeight::Reference(height) => height,
            PageHeight::MediaBox => media_box_height.unwrap_or(842.0),
        }
    }

    /// Page-space rectangle; `y` is the bottom edge.
    pub fn project(&self, annotation: &Annotation, page_height: f64) -> Rect {
        if annotation.zoom == 0 {
            log::warn!("annotation {} has no zoom level, exporting unscaled", annotation.id);
        }

        viewport_to_page(self.config.anchor, annotation.zoom, page_height).transform_rect(annotation.rect())
    }

    /// Rectangle stroke plus the description label below it.
    pub fn draw_commands(&self, annotation: &Annotation, page_height: f64) -> [DrawCommand; 2] {
        let rect = self.project(annotation, page_height);
        let label = self.config.label;

        [
            DrawCommand::Rectangle {
                page: annotation.page,
                rect,
                stroke: self.config.color,
                stroke_width: self.config.stroke_width,
            },
            DrawCommand::Text {
                page: annotation.page,
                text: annotation.description.clone(),
                origin: Point::new(rect.x + label.offset_x, rect.y - label.offset_y),
                size: label.font_size,
                color: self.config.color,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationId, Draft};
    use crate::store::AnnotationStore;

    fn annotation(x: f64, y: f64, width: f64, height: f64, zoom: u32) -> Annotation {
        Annotation::new(AnnotationId(1), 1, Rect::new(x, y, width, height), "Sig".to_owned(), zoom)
    }

    #[test]
    fn projects_baseline_zoom_with_flip() {
        let config = AnnotatorConfig::default();
        let projector = ExportProjector::new(&config);

        let rect = projector.project(&annotation(50.0, 50.0, 100.0, 100.0, 100), 842.0);

        assert_eq!(rect, Rect::new(6.0, 732.0, 100.0, 100.0));
    }

    #[test]
    fn undoes_recorded_zoom() {
        let config = AnnotatorConfig::default();
        let projector = ExportProjector::new(&config);

        let rect = projector.project(&annotation(56.0, 60.0, 200.0, 200.0, 200), 842.0);

        assert_eq!(rect, Rect::new(6.0, 732.0, 100.0, 100.0));
    }

    #[test]
    fn rescale_then_export_matches_direct_export() {
        let config = AnnotatorConfig::default();
        let projector = ExportProjector::new(&config);
        let mut store = AnnotationStore::new(config.anchor);
        let id = store
            .add_annotation(&Draft { page: 1, x: 50.0, y: 50.0, width: 100.0, height: 100.0 }, "Sig", 100)
            .expect("created");

        let direct = projector.project(store.get(id).expect("exists"), 842.0);

        store.rescale_for_zoom(200);
        let after_zoom_in = projector.project(store.get(id).expect("exists"), 842.0);

        store.rescale_for_zoom(50);
        let after_zoom_out = projector.project(store.get(id).expect("exists"), 842.0);

        assert_eq!(after_zoom_in, direct);
        assert_eq!(after_zoom_out, direct);
    }

    #[test]
    fn emits_rectangle_and_label_below_it() {
        let config = AnnotatorConfig::default();
        let projector = ExportProjector::new(&config);

        let [rect, text] = projector.draw_commands(&annotation(50.0, 50.0, 100.0, 100.0, 100), 842.0);

        assert_eq!(
            rect,
            DrawCommand::Rectangle {
                page: 1,
                rect: Rect::new(6.0, 732.0, 100.0, 100.0),
                stroke: RgbColor::BLUE,
                stroke_width: 2.0,
            }
        );
        assert_eq!(
            text,
            DrawCommand::Text {
                page: 1,
                text: "Sig".to_owned(),
                origin: Point::new(11.0, 717.0),
                size: 12.0,
                color: RgbColor::BLUE,
            }
        );
    }

    #[test]
    fn media_box_mode_uses_page_height() {
        let config = AnnotatorConfig { page_height: PageHeight::MediaBox, ..AnnotatorConfig::default() };
        let projector = ExportProjector::new(&config);

        assert_eq!(projector.page_height(Some(792.0)), 792.0);
        assert_eq!(projector.page_height(None), 842.0);

        let reference = AnnotatorConfig::default();
        assert_eq!(ExportProjector::new(&reference).page_height(Some(792.0)), 842.0);
    }
}
