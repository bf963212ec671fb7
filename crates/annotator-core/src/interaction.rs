//! Pointer interaction state machine.
//!
//! Translates press/move/release on the viewer surface into drawing a new
//! annotation or dragging an existing one. At most one gesture is in flight;
//! presses arriving mid-gesture are ignored.

use crate::annotation::{AnnotationId, Draft};
use crate::store::AnnotationStore;
use crate::transform::{Point, Rect};
use crate::viewport::{to_surface, ViewerSurface};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Dragging out a new rectangle.
    Drawing(Draft),
    /// Draft released and large enough; waiting for a description.
    PendingDescription(Draft),
    /// Moving an annotation, `offset` is the grab point relative to its top-left.
    Dragging { id: AnnotationId, offset: Point },
}

/// What a pointer event did, for hosts that need to react (show the
/// description form, persist, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Ignored,
    DrawStarted,
    DragStarted(AnnotationId),
    DraftResized,
    Moved(AnnotationId),
    AwaitingDescription,
    DraftDiscarded,
    DragFinished(AnnotationId),
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    state: InteractionState,
    min_draft_extent: f64,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl InteractionController {
    pub fn new(min_draft_extent: f64) -> Self {
        Self { state: InteractionState::Idle, min_draft_extent }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    pub fn is_awaiting_description(&self) -> bool {
        matches!(self.state, InteractionState::PendingDescription(_))
    }

    /// Normalized rectangle of the draft being drawn or awaiting a
    /// description, with its page.
    pub fn draft_preview(&self) -> Option<(u32, Rect)> {
        match self.state {
            InteractionState::Drawing(draft) | InteractionState::PendingDescription(draft) => {
                Some((draft.page, draft.normalized()))
            }
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        client: Point,
        surface: &dyn ViewerSurface,
        store: &AnnotationStore,
        page: u32,
    ) -> Transition {
        match self.state {
            InteractionState::Drawing(_) | InteractionState::Dragging { .. } => {
                log::debug!("ignoring pointer-down during an active gesture");
                return Transition::Ignored;
            }
            InteractionState::PendingDescription(_) => self.cancel(),
            InteractionState::Idle => {}
        }

        let Some(pointer) = to_surface(surface, client) else {
            return Transition::Ignored;
        };

        if let Some(annotation) = store.hit_test(page, pointer) {
            let offset = Point::new(pointer.x - annotation.x, pointer.y - annotation.y);
            self.state = InteractionState::Dragging { id: annotation.id, offset };
            return Transition::DragStarted(annotation.id);
        }

        self.state = InteractionState::Drawing(Draft::start(page, pointer));
        Transition::DrawStarted
    }

    pub fn pointer_move(
        &mut self,
        client: Point,
        surface: &dyn ViewerSurface,
        store: &mut AnnotationStore,
    ) -> Transition {
        if self.is_idle() || self.is_awaiting_description() {
            return Transition::Ignored;
        }

        let Some(pointer) = to_surface(surface, client) else {
            return Transition::Ignored;
        };

        match &mut self.state {
            InteractionState::Drawing(draft) => {
                draft.extend_to(pointer);
                Transition::DraftResized
            }
            InteractionState::Dragging { id, offset } => {
                let (id, offset) = (*id, *offset);
                if store.update_geometry(id, pointer.x - offset.x, pointer.y - offset.y) {
                    Transition::Moved(id)
                } else {
                    // Deleted mid-drag.
                    self.state = InteractionState::Idle;
                    Transition::Ignored
                }
            }
            _ => Transition::Ignored,
        }
    }

    pub fn pointer_up(&mut self, store: &mut AnnotationStore) -> Transition {
        match self.state {
            InteractionState::Dragging { id, .. } => {
                self.state = InteractionState::Idle;
                store.publish();
                Transition::DragFinished(id)
            }
            InteractionState::Drawing(draft) if draft.exceeds(self.min_draft_extent) => {
                self.state = InteractionState::PendingDescription(draft);
                Transition::AwaitingDescription
            }
            InteractionState::Drawing(_) => {
                self.state = InteractionState::Idle;
                Transition::DraftDiscarded
            }
            _ => Transition::Ignored,
        }
    }

    /// Commit the pending draft. An empty description keeps the draft pending.
    pub fn commit(&mut self, description: &str, store: &mut AnnotationStore, zoom: u32) -> Option<AnnotationId> {
        let InteractionState::PendingDescription(draft) = self.state else {
            return None;
        };

        let id = store.add_annotation(&draft, description, zoom)?;
        self.state = InteractionState::Idle;
        Some(id)
    }

    /// Follow a viewer zoom change: the draft scales about `anchor`, a drag's
    /// grab offset scales with it.
    pub fn rescale(&mut self, anchor: Point, scale: f64) {
        match &mut self.state {
            InteractionState::Drawing(draft) | InteractionState::PendingDescription(draft) => {
                let scaled = Rect::new(draft.x, draft.y, draft.width, draft.height).scaled_about(anchor, scale);
                *draft = Draft { page: draft.page, x: scaled.x, y: scaled.y, width: scaled.width, height: scaled.height };
            }
            InteractionState::Dragging { offset, .. } => {
                *offset = Point::new(offset.x * scale, offset.y * scale);
            }
            InteractionState::Idle => {}
        }
    }

    /// Discard any draft. Drags are left alone since their moves are
    /// already applied.
    pub fn cancel(&mut self) {
        if matches!(self.state, InteractionState::Drawing(_) | InteractionState::PendingDescription(_)) {
            self.state = InteractionState::Idle;
        }
    }
}
