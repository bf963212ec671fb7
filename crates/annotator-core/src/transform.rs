//! Affine transform engine
//!
//! A 3x3 homogeneous matrix used for every mapping the annotator performs:
//! fitting a page into a container, rescaling annotations when the viewer
//! zoom changes, and reprojecting viewport rectangles into PDF page space.
//! Values are stored row-major; `a.compose(&b)` applies `b` first.

/// Determinant magnitude below which a matrix is treated as non-invertible.
const SINGULAR_EPSILON: f64 = 1e-8;

/// Homogeneous weight magnitude below which points are not normalized.
const HOMOGENEOUS_EPSILON: f64 = 1e-10;

/// A point in viewport pixels or page units, depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Inclusive containment test; assumes non-negative extents.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Uniform scale about `anchor`: `x' = (x - ax) * s + ax`, `w' = w * s`.
    ///
    /// Same mapping as [`Mat3::anchored_scaling`] in closed form, so zoom
    /// rescales stay bit-exact for the 100 -> 200 -> 100 round trip. Signed
    /// extents keep their sign.
    pub fn scaled_about(&self, anchor: Point, scale: f64) -> Rect {
        Rect::new(
            (self.x - anchor.x) * scale + anchor.x,
            (self.y - anchor.y) * scale + anchor.y,
            self.width * scale,
            self.height * scale,
        )
    }

    fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.x, self.bottom()),
            Point::new(self.right(), self.bottom()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("a 3x3 matrix needs exactly 9 values, got {0}")]
    WrongLength(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignX {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignY {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Options for [`Mat3::fit_transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub maintain_aspect_ratio: bool,
    pub align_x: AlignX,
    pub align_y: AlignY,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { maintain_aspect_ratio: true, align_x: AlignX::Center, align_y: AlignY::Center }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn positive_or_one(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// Immutable 3x3 transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    values: [f64; 9],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 { values: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] };

    /// Build a matrix from row-major values. Non-finite entries become 0.
    pub fn new(values: [f64; 9]) -> Self {
        Self { values: values.map(|value| finite_or(value, 0.0)) }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        let dx = finite_or(dx, 0.0);
        let dy = finite_or(dy, 0.0);
        Self { values: [1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0] }
    }

    /// Scale matrix. Zero or non-finite factors fall back to 1.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        let valid = |factor: f64| if factor.is_finite() && factor != 0.0 { factor } else { 1.0 };
        Self { values: [valid(sx), 0.0, 0.0, 0.0, valid(sy), 0.0, 0.0, 0.0, 1.0] }
    }

    /// Uniform scale about `anchor` rather than the origin.
    pub fn anchored_scaling(anchor: Point, scale: f64) -> Self {
        Self::translation(anchor.x, anchor.y)
            .compose(&Self::scaling(scale, scale))
            .compose(&Self::translation(-anchor.x, -anchor.y))
    }

    pub fn values(&self) -> &[f64; 9] {
        &self.values
    }

    pub fn compose(&self, other: &Mat3) -> Mat3 {
        let a = &self.values;
        let b = &other.values;
        let mut result = [0.0; 9];

        for row in 0..3 {
            for col in 0..3 {
                result[row * 3 + col] = (0..3).map(|i| a[row * 3 + i] * b[i * 3 + col]).sum();
            }
        }

        Mat3::new(result)
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let x = finite_or(point.x, 0.0);
        let y = finite_or(point.y, 0.0);
        let m = &self.values;

        let tx = m[0] * x + m[1] * y + m[2];
        let ty = m[3] * x + m[4] * y + m[5];
        let tw = m[6] * x + m[7] * y + m[8];

        if tw.abs() < HOMOGENEOUS_EPSILON {
            return Point::new(tx, ty);
        }

        Point::new(tx / tw, ty / tw)
    }

    /// Axis-aligned bounding box of the four transformed corners.
    pub fn transform_rect(&self, rect: Rect) -> Rect {
        let rect = Rect::new(
            finite_or(rect.x, 0.0),
            finite_or(rect.y, 0.0),
            finite_or(rect.width, 0.0),
            finite_or(rect.height, 0.0),
        );

        let corners = rect.corners().map(|corner| self.transform_point(corner));
        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.values;
        m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
            + m[2] * (m[3] * m[7] - m[4] * m[6])
    }

    /// Adjugate inverse, or `None` when the matrix is (near) singular.
    pub fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();
        if det.abs() < SINGULAR_EPSILON {
            log::warn!("matrix is not invertible (determinant {det:e})");
            return None;
        }

        let m = &self.values;
        let inv = 1.0 / det;

        Some(Mat3::new([
            (m[4] * m[8] - m[5] * m[7]) * inv,
            (m[2] * m[7] - m[1] * m[8]) * inv,
            (m[1] * m[5] - m[2] * m[4]) * inv,
            (m[5] * m[6] - m[3] * m[8]) * inv,
            (m[0] * m[8] - m[2] * m[6]) * inv,
            (m[2] * m[3] - m[0] * m[5]) * inv,
            (m[3] * m[7] - m[4] * m[6]) * inv,
            (m[1] * m[6] - m[0] * m[7]) * inv,
            (m[0] * m[4] - m[1] * m[3]) * inv,
        ]))
    }

    /// Map a rectangle of size `rect` into `container`.
    ///
    /// Degenerate dimensions are treated as 1. The result is
    /// `translate · scale`, so the scale is applied first.
    pub fn fit_transform(rect: Size, container: Size, options: FitOptions) -> Mat3 {
        let rect_width = positive_or_one(rect.width);
        let rect_height = positive_or_one(rect.height);
        let container_width = positive_or_one(container.width);
        let container_height = positive_or_one(container.height);

        let mut scale_x = finite_or(container_width / rect_width, 1.0);
        let mut scale_y = finite_or(container_height / rect_height, 1.0);

        if options.maintain_aspect_ratio {
            let scale = scale_x.min(scale_y);
            scale_x = scale;
            scale_y = scale;
        }

        let slack_x = container_width - rect_width * scale_x;
        let slack_y = container_height - rect_height * scale_y;

        let tx = match options.align_x {
            AlignX::Left => 0.0,
            AlignX::Center => slack_x / 2.0,
            AlignX::Right => slack_x,
        };
        let ty = match options.align_y {
            AlignY::Top => 0.0,
            AlignY::Center => slack_y / 2.0,
            AlignY::Bottom => slack_y,
        };

        Mat3::translation(tx, ty).compose(&Mat3::scaling(scale_x, scale_y))
    }
}

impl TryFrom<&[f64]> for Mat3 {
    type Error = TransformError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let values: [f64; 9] =
            values.try_into().map_err(|_| TransformError::WrongLength(values.len()))?;
        Ok(Mat3::new(values))
    }
}

impl std::ops::Mul for Mat3 {
    type Output = Mat3;

    fn mul(self, rhs: Mat3) -> Mat3 {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    fn sample_matrices() -> Vec<Mat3> {
        vec![
            Mat3::identity(),
            Mat3::translation(12.5, -40.0),
            Mat3::scaling(2.0, 0.5),
            Mat3::anchored_scaling(Point::new(44.0, 40.0), 1.5),
            Mat3::new([0.0, -1.0, 3.0, 1.0, 0.0, -7.0, 0.0, 0.0, 1.0]),
            Mat3::new([2.0, 0.3, 1.0, -0.4, 1.1, 5.0, 0.0, 0.0, 1.0]),
        ]
    }

    #[test]
    fn non_finite_inputs_are_coerced() {
        assert_eq!(Mat3::translation(f64::NAN, f64::INFINITY), Mat3::identity());
        assert_eq!(Mat3::scaling(0.0, f64::NAN), Mat3::identity());

        let matrix = Mat3::new([f64::NAN, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(matrix.values()[0], 0.0);

        let point = Mat3::translation(1.0, 2.0).transform_point(Point::new(f64::NAN, 3.0));
        assert_eq!(point, Point::new(1.0, 5.0));
    }

    #[test]
    fn wrong_length_slice_is_rejected() {
        let err = Mat3::try_from(&[1.0, 2.0, 3.0][..]).expect_err("three values should fail");
        assert_eq!(err, TransformError::WrongLength(3));

        let values = [1.0, 0.0, 4.0, 0.0, 1.0, 5.0, 0.0, 0.0, 1.0];
        let matrix = Mat3::try_from(&values[..]).expect("nine values should succeed");
        assert_eq!(matrix, Mat3::translation(4.0, 5.0));
    }

    #[test]
    fn identity_is_neutral_for_compose() {
        for matrix in sample_matrices() {
            assert_eq!(matrix.compose(&Mat3::identity()), matrix);
            assert_eq!(Mat3::identity().compose(&matrix), matrix);
        }
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let translate = Mat3::translation(10.0, 0.0);
        let scale = Mat3::scaling(2.0, 2.0);

        let scale_then_translate = translate * scale;
        assert_eq!(scale_then_translate.transform_point(Point::new(1.0, 1.0)), Point::new(12.0, 2.0));

        let translate_then_scale = scale * translate;
        assert_eq!(translate_then_scale.transform_point(Point::new(1.0, 1.0)), Point::new(22.0, 2.0));
    }

    #[test]
    fn inverse_round_trips_points() {
        let points = [Point::new(0.0, 0.0), Point::new(56.0, 60.0), Point::new(-13.25, 700.5)];

        for matrix in sample_matrices() {
            let inverse = matrix.inverse().expect("sample matrices are invertible");
            for point in points {
                let back = inverse.transform_point(matrix.transform_point(point));
                assert_close(back.x, point.x);
                assert_close(back.y, point.y);
            }
        }
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let flat = Mat3::new([1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(flat.inverse().is_none());
    }

    #[test]
    fn zero_homogeneous_weight_returns_numerators() {
        let projective = Mat3::new([1.0, 0.0, 3.0, 0.0, 1.0, 4.0, 0.0, 0.0, 0.0]);
        assert_eq!(projective.transform_point(Point::new(1.0, 1.0)), Point::new(4.0, 5.0));
    }

    #[test]
    fn transform_rect_returns_bounding_box_of_rotated_corners() {
        let rotate_90 = Mat3::new([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let rect = rotate_90.transform_rect(Rect::new(0.0, 0.0, 20.0, 10.0));

        assert_eq!(rect, Rect::new(-10.0, 0.0, 10.0, 20.0));
    }

    #[test]
    fn anchored_scaling_keeps_anchor_fixed() {
        let anchor = Point::new(44.0, 40.0);
        let matrix = Mat3::anchored_scaling(anchor, 2.0);

        assert_eq!(matrix.transform_point(anchor), anchor);
        assert_eq!(matrix.transform_point(Point::new(50.0, 50.0)), Point::new(56.0, 60.0));
    }

    #[test]
    fn scaled_about_matches_closed_form() {
        let anchor = Point::new(44.0, 40.0);
        let rect = Rect::new(50.3, 61.7, 33.7, 12.1).scaled_about(anchor, 1.5);

        assert_eq!(rect.x, (50.3 - 44.0) * 1.5 + 44.0);
        assert_eq!(rect.y, (61.7 - 40.0) * 1.5 + 40.0);
        assert_eq!(rect.width, 33.7 * 1.5);
        assert_eq!(rect.height, 12.1 * 1.5);

        let matrix = Mat3::anchored_scaling(anchor, 1.5).transform_rect(Rect::new(50.3, 61.7, 33.7, 12.1));
        assert!((matrix.x - rect.x).abs() < 1e-9);
        assert!((matrix.width - rect.width).abs() < 1e-9);
    }

    #[test]
    fn fit_transform_fills_one_axis_when_preserving_aspect_ratio() {
        let cases = [
            (Size::new(100.0, 50.0), Size::new(400.0, 400.0)),
            (Size::new(595.0, 842.0), Size::new(800.0, 600.0)),
            (Size::new(3.0, 7.0), Size::new(21.0, 9.0)),
        ];

        for (source, container) in cases {
            let fit = Mat3::fit_transform(source, container, FitOptions::default());
            let bounds = fit.transform_rect(Rect::new(0.0, 0.0, source.width, source.height));

            let fills_width = (bounds.width - container.width).abs() < 1e-9;
            let fills_height = (bounds.height - container.height).abs() < 1e-9;
            assert!(fills_width || fills_height, "{bounds:?} should fill {container:?}");
            assert!(bounds.width <= container.width + 1e-9);
            assert!(bounds.height <= container.height + 1e-9);

            // Centered by default.
            assert_close(bounds.x * 2.0 + bounds.width, container.width);
            assert_close(bounds.y * 2.0 + bounds.height, container.height);
        }
    }

    #[test]
    fn fit_transform_fills_both_axes_when_stretching() {
        let options = FitOptions { maintain_aspect_ratio: false, ..FitOptions::default() };
        let fit = Mat3::fit_transform(Size::new(100.0, 50.0), Size::new(300.0, 400.0), options);
        let bounds = fit.transform_rect(Rect::new(0.0, 0.0, 100.0, 50.0));

        assert_eq!(bounds, Rect::new(0.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn fit_transform_honours_alignment() {
        let options = FitOptions {
            maintain_aspect_ratio: true,
            align_x: AlignX::Right,
            align_y: AlignY::Top,
        };
        let fit = Mat3::fit_transform(Size::new(100.0, 100.0), Size::new(400.0, 200.0), options);
        let bounds = fit.transform_rect(Rect::new(0.0, 0.0, 100.0, 100.0));

        assert_eq!(bounds, Rect::new(200.0, 0.0, 200.0, 200.0));

        let options = FitOptions { align_x: AlignX::Left, align_y: AlignY::Bottom, ..options };
        let fit = Mat3::fit_transform(Size::new(100.0, 100.0), Size::new(200.0, 400.0), options);
        let bounds = fit.transform_rect(Rect::new(0.0, 0.0, 100.0, 100.0));

        assert_eq!(bounds, Rect::new(0.0, 200.0, 200.0, 200.0));
    }

    #[test]
    fn fit_transform_coerces_degenerate_dimensions() {
        let fit = Mat3::fit_transform(Size::new(0.0, f64::NAN), Size::new(-5.0, 1.0), FitOptions::default());
        assert_eq!(fit, Mat3::identity());
    }
}
