//! Annotation data model
//!
//! Committed annotations live in viewport pixel space: the top-left corner is
//! relative to the viewer container and the extents are the on-screen size at
//! the zoom recorded alongside them. Conversion to PDF page space happens only
//! on export (see [`crate::projection`]).

use serde::{Deserialize, Serialize};

use crate::transform::{Point, Rect};

/// Session-unique annotation identifier, assigned monotonically from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-progress rectangle while the user drags out a new region.
///
/// `width`/`height` go negative when dragging up or left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draft {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Draft {
    pub fn start(page: u32, origin: Point) -> Self {
        Self { page, x: origin.x, y: origin.y, width: 0.0, height: 0.0 }
    }

    pub fn extend_to(&mut self, pointer: Point) {
        self.width = pointer.x - self.x;
        self.height = pointer.y - self.y;
    }

    /// Whether both extents strictly exceed `min_extent`.
    pub fn exceeds(&self, min_extent: f64) -> bool {
        self.width.abs() > min_extent && self.height.abs() > min_extent
    }

    /// Top-left anchored rectangle with non-negative extents.
    pub fn normalized(&self) -> Rect {
        let (x, width) = if self.width < 0.0 { (self.x + self.width, -self.width) } else { (self.x, self.width) };
        let (y, height) =
            if self.height < 0.0 { (self.y + self.height, -self.height) } else { (self.y, self.height) };

        Rect::new(x, y, width, height)
    }
}

/// A committed, described rectangular region on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    /// 1-based page index.
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub description: String,
    /// Zoom percentage the geometry is valid for.
    pub zoom: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_been_scaled: bool,
}

impl Annotation {
    pub fn new(id: AnnotationId, page: u32, rect: Rect, description: String, zoom: u32) -> Self {
        Self {
            id,
            page,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            description,
            zoom,
            original_x: None,
            original_y: None,
            original_width: None,
            original_height: None,
            has_been_scaled: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.rect().contains(point)
    }

    /// Replace geometry for a new zoom level, keeping the previous geometry
    /// as provenance.
    pub(crate) fn apply_rescale(&mut self, rect: Rect, zoom: u32) {
        self.original_x = Some(self.x);
        self.original_y = Some(self.y);
        self.original_width = Some(self.width);
        self.original_height = Some(self.height);
        self.has_been_scaled = true;

        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
        self.zoom = zoom;
    }
}

/// Serialize annotations as the JSON sidecar document (top-level array).
pub fn to_json(annotations: &[Annotation]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(annotations)
}

pub fn from_json(json: &str) -> Result<Vec<Annotation>, serde_json::Error> {
    serde_json::from_str(json)
}
