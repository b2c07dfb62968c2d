//! Capture geometry
//!
//! The final screenshot region is a [`ClipRect`] derived from an element
//! bounding box, an explicit clip option, or the viewport, optionally
//! adjusted by an [`Inset`](crate::options::Inset). Resolution happens
//! post-navigation; an empty result is a [`GeometryError`], distinct from
//! the pre-navigation option validator.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::options::Inset;

/// A rectangle in page coordinates (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width; positive for any valid capture region
    pub width: f64,
    /// Height; positive for any valid capture region
    pub height: f64,
}

impl ClipRect {
    /// Construct a rectangle
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The viewport rectangle for a given CSS size
    pub fn viewport(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, f64::from(width), f64::from(height))
    }

    /// Whether both dimensions are positive
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Shrink (positive amounts) or grow (negative amounts) a rectangle by
/// per-edge inset values.
///
/// Fails when the adjusted width or height is not positive.
pub fn apply_inset(base: ClipRect, inset: &Inset) -> Result<ClipRect, GeometryError> {
    let (top, right, bottom, left) = inset.edges();

    let adjusted = ClipRect {
        x: base.x + left,
        y: base.y + top,
        width: base.width - left - right,
        height: base.height - top - bottom,
    };

    if adjusted.width <= 0.0 {
        return Err(GeometryError::EmptyRegion {
            dimension: "width",
            value: adjusted.width,
        });
    }
    if adjusted.height <= 0.0 {
        return Err(GeometryError::EmptyRegion {
            dimension: "height",
            value: adjusted.height,
        });
    }

    Ok(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_rect() {
        let rect = ClipRect::viewport(1280, 800);
        assert_eq!(rect, ClipRect::new(0.0, 0.0, 1280.0, 800.0));
        assert!(!rect.is_empty());
    }

    #[test]
    fn test_uniform_inset_shrinks_symmetrically() {
        let rect = apply_inset(ClipRect::viewport(100, 100), &Inset::All(10.0)).unwrap();
        assert_eq!(rect, ClipRect::new(10.0, 10.0, 80.0, 80.0));
    }

    #[test]
    fn test_single_edge_inset() {
        let inset = Inset::Edges {
            top: 25.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        };
        let rect = apply_inset(ClipRect::viewport(100, 100), &inset).unwrap();
        assert_eq!(rect, ClipRect::new(0.0, 25.0, 100.0, 75.0));
    }

    #[test]
    fn test_negative_inset_grows() {
        let rect = apply_inset(ClipRect::new(50.0, 50.0, 100.0, 100.0), &Inset::All(-10.0)).unwrap();
        assert_eq!(rect, ClipRect::new(40.0, 40.0, 120.0, 120.0));
    }

    #[test]
    fn test_collapsing_width_fails() {
        let err = apply_inset(ClipRect::viewport(100, 200), &Inset::All(50.0)).unwrap_err();
        assert_eq!(
            err,
            GeometryError::EmptyRegion {
                dimension: "width",
                value: 0.0,
            }
        );
    }

    #[test]
    fn test_collapsing_height_fails() {
        let inset = Inset::Edges {
            top: 150.0,
            right: 0.0,
            bottom: 60.0,
            left: 0.0,
        };
        let err = apply_inset(ClipRect::viewport(300, 200), &inset).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::EmptyRegion {
                dimension: "height",
                ..
            }
        ));
    }

    #[test]
    fn test_deserializes_from_page_json() {
        let rect: ClipRect =
            serde_json::from_str(r#"{"x": 8, "y": 16, "width": 320, "height": 240}"#).unwrap();
        assert_eq!(rect, ClipRect::new(8.0, 16.0, 320.0, 240.0));
    }
}
