//! Annotator settings shared by the store, the controller and the projector.
//!
//! The anchor offset is the one value both the zoom rescale and the export
//! reprojection depend on; keeping it here means the two can never disagree.

use serde::{Deserialize, Serialize};

use crate::transform::Point;

/// Pixel offset between the viewer's outer container and its rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorOffset {
    pub x: f64,
    pub y: f64,
}

impl Default for AnchorOffset {
    fn default() -> Self {
        Self { x: 44.0, y: 40.0 }
    }
}

impl AnchorOffset {
    pub fn as_point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Page height used when flipping into PDF page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "height")]
pub enum PageHeight {
    /// Fixed calibration height in page units (842 for A4).
    Reference(f64),
    /// Height of the target page's MediaBox.
    MediaBox,
}

impl Default for PageHeight {
    fn default() -> Self {
        Self::Reference(842.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLUE: RgbColor = RgbColor { r: 0.0, g: 0.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::BLUE
    }
}

/// Placement of the description label relative to the exported rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub offset_x: f64,
    pub offset_y: f64,
    pub font_size: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self { offset_x: 5.0, offset_y: 15.0, font_size: 12.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub anchor: AnchorOffset,
    /// Drafts must exceed this extent on both axes to be kept.
    pub min_draft_extent: f64,
    pub page_height: PageHeight,
    pub stroke_width: f64,
    pub color: RgbColor,
    pub label: LabelStyle,
    pub min_container_width: f64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            anchor: AnchorOffset::default(),
            min_draft_extent: 10.0,
            page_height: PageHeight::default(),
            stroke_width: 2.0,
            color: RgbColor::BLUE,
            label: LabelStyle::default(),
            min_container_width: 338.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let config: AnnotatorConfig =
            serde_json::from_str(r#"{ "anchor": { "x": 10.0, "y": 12.0 } }"#)
                .expect("partial config should parse");

        assert_eq!(config.anchor, AnchorOffset { x: 10.0, y: 12.0 });
        assert_eq!(config.page_height, PageHeight::Reference(842.0));
        assert_eq!(config.min_draft_extent, 10.0);
    }

    #[test]
    fn page_height_modes_are_tagged() {
        let media_box: PageHeight =
            serde_json::from_str(r#"{ "mode": "media_box" }"#).expect("media box should parse");
        assert_eq!(media_box, PageHeight::MediaBox);

        let json = serde_json::to_string(&PageHeight::Reference(792.0)).expect("serialize");
        assert_eq!(json, r#"{"mode":"reference","height":792.0}"#);
    }
}
