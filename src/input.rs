//! Mapping of global pointer and touch events into element UV space.

use lyon::math::{point, size, Box2D, Point, Size};

use crate::util::{clamp01, to_logical};

/// A pointer or touch event in viewport (CSS/logical) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Move(Point),
    TouchStart(Point),
    TouchMove(Point),
}

impl PointerInput {
    pub fn position(&self) -> Point {
        match *self {
            PointerInput::Move(p) | PointerInput::TouchStart(p) | PointerInput::TouchMove(p) => p,
        }
    }
}

/// The effect element's bounding rectangle in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRect {
    pub bounds: Box2D,
}

impl ElementRect {
    pub fn new(origin: Point, size: Size) -> Self {
        Self {
            bounds: Box2D::from_origin_and_size(origin, size),
        }
    }

    /// An element covering the whole viewport.
    pub fn viewport(width: f32, height: f32) -> Self {
        Self::new(point(0.0, 0.0), size(width, height))
    }

    /// An element covering a surface of `physical_size` pixels at `scale_factor`.
    pub fn from_physical(physical_size: (u32, u32), scale_factor: f64) -> Self {
        let (width, height) = to_logical(physical_size, scale_factor);
        Self::viewport(width, height)
    }

    /// Maps a viewport position into the element's UV space, clamped to `[0, 1]`.
    ///
    /// Events outside the element still map, so the reveal follows a pointer
    /// that wanders past the edges.
    pub fn to_uv(&self, position: Point) -> Point {
        let width = self.bounds.width().max(1.0);
        let height = self.bounds.height().max(1.0);
        point(
            clamp01((position.x - self.bounds.min.x) / width),
            clamp01((position.y - self.bounds.min.y) / height),
        )
    }
}
