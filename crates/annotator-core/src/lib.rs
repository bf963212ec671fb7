//! Annotation kernel for a PDF region annotator.
//!
//! Regions are drawn in viewport pixels over a zoomable viewer, stay anchored
//! to the page content as the zoom changes, and are reprojected into PDF page
//! space on export. PDF bytes are handled by an external [`export::PdfWriter`].

pub mod annotation;
pub mod config;
pub mod export;
pub mod interaction;
pub mod projection;
pub mod session;
pub mod store;
pub mod transform;
pub mod upload;
pub mod viewport;

pub use annotation::{Annotation, AnnotationId, Draft};
pub use config::{AnchorOffset, AnnotatorConfig, PageHeight, RgbColor};
pub use export::{export_document, ExportArtifacts, ExportError, ExportStage, PdfWriter};
pub use interaction::{InteractionController, InteractionState, Transition};
pub use projection::{DrawCommand, ExportProjector};
pub use session::{AnnotatorSession, SessionEvent, SessionOutcome, SharedSession};
pub use store::{AnnotationStore, SubscriptionId};
pub use transform::{Mat3, Point, Rect, Size};
pub use upload::{accept_upload, UploadError, UploadedPdf};
pub use viewport::{FixedSurface, ViewerSurface, ViewportState, ZoomLevel};
