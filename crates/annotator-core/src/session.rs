//! Annotator session: one open document, its annotations and the pointer
//! controller, driven by [`SessionEvent`]s.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId};
use crate::config::AnnotatorConfig;
use crate::export::{self, ExportArtifacts, ExportError, ExportStage, PdfWriter};
use crate::interaction::{InteractionController, Transition};
use crate::store::AnnotationStore;
use crate::transform::Point;
use crate::upload::{self, UploadError, UploadedPdf};
use crate::viewport::{ViewerSurface, ViewportState, ZoomLevel};

/// Input delivered by the viewer host. Pointer coordinates are client
/// coordinates; the session measures the surface when applying them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    /// Zoom readout as the viewer displays it, e.g. `"150%"`.
    Zoom { readout: String },
    Page { page: u32 },
    Commit { description: String },
    Cancel,
    Delete { id: AnnotationId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    Pointer(Transition),
    Committed(AnnotationId),
    Deleted(AnnotationId),
    Rescaled(ZoomLevel),
    PageChanged(u32),
    Unchanged,
}

#[derive(Debug, thiserror::Error)]
#[error("no document is open")]
pub struct NoDocument;

#[derive(Debug)]
pub struct AnnotatorSession {
    config: AnnotatorConfig,
    store: AnnotationStore,
    controller: InteractionController,
    viewport: ViewportState,
    document: Option<UploadedPdf>,
}

impl Default for AnnotatorSession {
    fn default() -> Self {
        Self::new(AnnotatorConfig::default())
    }
}

impl AnnotatorSession {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            store: AnnotationStore::new(config.anchor),
            controller: InteractionController::new(config.min_draft_extent),
            viewport: ViewportState::new(),
            document: None,
            config,
        }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Mutable store access, for subscribing.
    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn document(&self) -> Option<&UploadedPdf> {
        self.document.as_ref()
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.annotations()
    }

    /// Open an uploaded file. A rejected upload leaves the session untouched;
    /// an accepted one replaces the document and starts a fresh annotation set.
    pub fn open(&mut self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<(), UploadError> {
        let document = upload::accept_upload(name, mime, bytes)?;

        self.controller = InteractionController::new(self.config.min_draft_extent);
        self.viewport = ViewportState::new();
        self.store.clear();
        self.document = Some(document);
        Ok(())
    }

    pub fn apply(&mut self, event: SessionEvent, surface: &dyn ViewerSurface) -> SessionOutcome {
        match event {
            SessionEvent::PointerDown { x, y } => {
                let page = self.viewport.current_page;
                SessionOutcome::Pointer(self.controller.pointer_down(Point::new(x, y), surface, &self.store, page))
            }
            SessionEvent::PointerMove { x, y } => {
                SessionOutcome::Pointer(self.controller.pointer_move(Point::new(x, y), surface, &mut self.store))
            }
            SessionEvent::PointerUp => SessionOutcome::Pointer(self.controller.pointer_up(&mut self.store)),
            SessionEvent::Zoom { readout } => match readout.parse::<ZoomLevel>() {
                Ok(zoom) => self.set_zoom(zoom),
                Err(err) => {
                    log::warn!("ignoring zoom signal: {err}");
                    SessionOutcome::Unchanged
                }
            },
            SessionEvent::Page { page } => {
                self.viewport.set_page(page);
                SessionOutcome::PageChanged(self.viewport.current_page)
            }
            SessionEvent::Commit { description } => {
                let zoom = self.viewport.current_zoom.percent();
                match self.controller.commit(&description, &mut self.store, zoom) {
                    Some(id) => SessionOutcome::Committed(id),
                    None => SessionOutcome::Unchanged,
                }
            }
            SessionEvent::Cancel => {
                self.controller.cancel();
                SessionOutcome::Unchanged
            }
            SessionEvent::Delete { id } => {
                if self.store.delete_annotation(id) {
                    SessionOutcome::Deleted(id)
                } else {
                    SessionOutcome::Unchanged
                }
            }
        }
    }

    /// Record a zoom signal and rescale when the level changed.
    pub fn set_zoom(&mut self, zoom: ZoomLevel) -> SessionOutcome {
        if !self.viewport.set_zoom(zoom) {
            return SessionOutcome::Unchanged;
        }

        let scale = f64::from(zoom.percent()) / f64::from(self.viewport.old_zoom.percent());
        self.controller.rescale(self.config.anchor.as_point(), scale);
        self.store.rescale_for_zoom(zoom.percent());
        SessionOutcome::Rescaled(zoom)
    }

    /// Export the open document with the current annotations.
    pub fn export<W: PdfWriter>(&self, writer: &mut W) -> Result<ExportArtifacts, ExportError> {
        let document = self.document.as_ref().ok_or_else(|| ExportError::new(ExportStage::Load, NoDocument))?;
        export::export_document(writer, &document.bytes, self.store.annotations(), &self.config)
    }
}

/// A session shared between threads. Every event is applied under one lock.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<AnnotatorSession>>,
}

impl SharedSession {
    pub fn new(session: AnnotatorSession) -> Self {
        Self { inner: Arc::new(Mutex::new(session)) }
    }

    pub fn apply(&self, event: SessionEvent, surface: &dyn ViewerSurface) -> SessionOutcome {
        self.with(|session| session.apply(event, surface))
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut AnnotatorSession) -> R) -> R {
        let mut session = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.with(|session| session.annotations().to_vec())
    }
}
