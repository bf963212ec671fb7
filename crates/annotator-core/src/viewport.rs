//! Viewer-side signals: zoom readout, current page, surface measurement.
//!
//! The annotator never drives the viewer; it only reads what the viewer
//! reports. Surface bounds are queried through [`ViewerSurface`] on every
//! pointer event so a resized viewer is always measured fresh.

use std::str::FromStr;

use crate::config::AnnotatorConfig;
use crate::transform::{Point, Rect};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoomParseError {
    #[error("zoom readout {0:?} does not start with a number")]
    NotANumber(String),
    #[error("zoom readout {0:?} is not a positive percentage")]
    NotPositive(String),
}

/// Zoom level as an integer percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoomLevel(u32);

impl ZoomLevel {
    pub const ACTUAL_SIZE: ZoomLevel = ZoomLevel(100);

    pub fn new(percent: u32) -> Option<Self> {
        (percent > 0).then_some(Self(percent))
    }

    pub fn percent(self) -> u32 {
        self.0
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::ACTUAL_SIZE
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Parses viewer readouts such as `"150%"`, `" 75 %"` or `"200"`.
///
/// Leading digits are taken and anything after them is ignored.
impl FromStr for ZoomLevel {
    type Err = ZoomParseError;

    fn from_str(readout: &str) -> Result<Self, Self::Err> {
        let trimmed = readout.trim();
        let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(ZoomParseError::NotANumber(readout.to_owned()));
        }

        let percent: u32 = digits.parse().map_err(|_| ZoomParseError::NotANumber(readout.to_owned()))?;
        Self::new(percent).ok_or_else(|| ZoomParseError::NotPositive(readout.to_owned()))
    }
}

/// Screen measurement of the viewer's annotation surface.
pub trait ViewerSurface {
    /// Surface bounds in client coordinates, or `None` when it is not mounted.
    fn bounds(&self) -> Option<Rect>;
}

/// A surface with fixed bounds, for hosts that measure once per event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSurface {
    pub bounds: Rect,
}

impl FixedSurface {
    pub fn new(bounds: Rect) -> Self {
        Self { bounds }
    }
}

impl ViewerSurface for FixedSurface {
    fn bounds(&self) -> Option<Rect> {
        Some(self.bounds)
    }
}

/// Convert a client-space pointer position into surface-local pixels.
pub fn to_surface(surface: &dyn ViewerSurface, client: Point) -> Option<Point> {
    let bounds = surface.bounds()?;
    Some(Point::new(client.x - bounds.x, client.y - bounds.y))
}

/// Width the annotation container needs to wrap a rendered page.
pub fn container_width(page_width: f64, config: &AnnotatorConfig) -> f64 {
    (page_width + config.anchor.x).max(config.min_container_width)
}

/// Viewer state as last reported by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportState {
    pub old_zoom: ZoomLevel,
    pub current_zoom: ZoomLevel,
    pub current_page: u32,
}

impl ViewportState {
    pub fn new() -> Self {
        Self { current_page: 1, ..Self::default() }
    }

    /// Record a zoom readout; returns `true` when the level actually changed.
    pub fn set_zoom(&mut self, zoom: ZoomLevel) -> bool {
        if zoom == self.current_zoom {
            return false;
        }

        self.old_zoom = self.current_zoom;
        self.current_zoom = zoom;
        true
    }

    pub fn set_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }
}
