//! Annotation state store
//!
//! Authoritative list of committed annotations for the open document. Every
//! mutation notifies subscribers synchronously with the full list, so a
//! consumer holding a copy never diverges from the store.

use crate::annotation::{Annotation, AnnotationId, Draft};
use crate::config::AnchorOffset;
use crate::transform::Point;

/// Handle returned by [`AnnotationStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&[Annotation]) + Send>;

pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    next_id: u64,
    anchor: AnchorOffset,
    old_zoom: u32,
    current_zoom: u32,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl std::fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("annotations", &self.annotations)
            .field("next_id", &self.next_id)
            .field("anchor", &self.anchor)
            .field("old_zoom", &self.old_zoom)
            .field("current_zoom", &self.current_zoom)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(AnchorOffset::default())
    }
}

impl AnnotationStore {
    pub fn new(anchor: AnchorOffset) -> Self {
        Self {
            annotations: Vec::new(),
            next_id: 0,
            anchor,
            old_zoom: 100,
            current_zoom: 100,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn anchor(&self) -> AnchorOffset {
        self.anchor
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|annotation| annotation.id == id)
    }

    /// Annotations on `page`, in insertion order.
    pub fn annotations_on_page(&self, page: u32) -> impl DoubleEndedIterator<Item = &Annotation> {
        self.annotations.iter().filter(move |annotation| annotation.page == page)
    }

    /// Topmost (most recently added) annotation on `page` containing `point`.
    pub fn hit_test(&self, page: u32, point: Point) -> Option<&Annotation> {
        self.annotations_on_page(page).rev().find(|annotation| annotation.contains(point))
    }

    /// Zoom percentage before the latest rescale.
    pub fn old_zoom(&self) -> u32 {
        self.old_zoom
    }

    pub fn current_zoom(&self) -> u32 {
        self.current_zoom
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[Annotation]) + Send + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Push the current list to every subscriber.
    pub fn publish(&mut self) {
        let annotations = &self.annotations;
        for (_, subscriber) in &mut self.subscribers {
            subscriber(annotations);
        }
    }

    /// Commit a draft. Returns `None` (and changes nothing) when the trimmed
    /// description is empty.
    pub fn add_annotation(&mut self, draft: &Draft, description: &str, zoom: u32) -> Option<AnnotationId> {
        let description = description.trim();
        if description.is_empty() {
            return None;
        }

        self.next_id += 1;
        let id = AnnotationId(self.next_id);
        let annotation = Annotation::new(id, draft.page, draft.normalized(), description.to_owned(), zoom);

        log::debug!("added annotation {id} on page {} at {:?}", annotation.page, annotation.rect());
        self.annotations.push(annotation);
        self.publish();

        Some(id)
    }

    pub fn delete_annotation(&mut self, id: AnnotationId) -> bool {
        let Some(index) = self.annotations.iter().position(|annotation| annotation.id == id) else {
            return false;
        };

        self.annotations.remove(index);
        log::debug!("deleted annotation {id}");
        self.publish();
        true
    }

    /// Move an annotation; extents, description and zoom are untouched.
    pub fn update_geometry(&mut self, id: AnnotationId, x: f64, y: f64) -> bool {
        let Some(annotation) = self.annotations.iter_mut().find(|annotation| annotation.id == id) else {
            return false;
        };

        annotation.x = x;
        annotation.y = y;
        self.publish();
        true
    }

    /// Rescale every annotation for a new viewer zoom about the anchor offset.
    ///
    /// Each annotation scales by `new_zoom / annotation.zoom`, so geometry
    /// always matches its zoom label even if the store's own zoom tracking
    /// lagged behind a commit.
    pub fn rescale_for_zoom(&mut self, new_zoom: u32) {
        if new_zoom == 0 {
            log::warn!("ignoring zoom change to 0%");
            return;
        }

        let anchor = self.anchor.as_point();
        for annotation in &mut self.annotations {
            let old_zoom = if annotation.zoom == 0 { new_zoom } else { annotation.zoom };
            let scale = f64::from(new_zoom) / f64::from(old_zoom);
            let rect = annotation.rect().scaled_about(anchor, scale);
            annotation.apply_rescale(rect, new_zoom);
        }

        log::debug!("rescaled {} annotations from {}% to {new_zoom}%", self.annotations.len(), self.current_zoom);
        self.old_zoom = self.current_zoom;
        self.current_zoom = new_zoom;
        self.publish();
    }

    /// Drop every annotation and restart id assignment (new document).
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.next_id = 0;
        self.old_zoom = 100;
        self.current_zoom = 100;
        self.publish();
    }

    /// Replace the list with previously exported annotations.
    pub fn load(&mut self, annotations: Vec<Annotation>) {
        self.next_id = annotations.iter().map(|annotation| annotation.id.0).max().unwrap_or(0);
        self.annotations = annotations;
        self.publish();
    }
}
