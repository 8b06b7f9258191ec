//! popperkit Placement Engine
//!
//! Platform-agnostic positioning for floating "popper" elements.
//!
//! Given the page-absolute rectangle of a trigger element, the size of the
//! popper and the current viewport, this crate decides:
//! - which side of the trigger the popper sits on (resolving `auto`)
//! - whether the popper has to flip to the opposite side or be clamped
//!   back inside the visible window
//! - where the entrance slide starts
//! - where an optional arrow points, clamped to the popper body

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod arrow;
pub mod calculator;
pub mod geometry;

pub use calculator::{compute, try_compute, Measurement, PositionCalculator};

/// Opaque handle for an element owned by the host's render tree.
pub type ElementId = u64;

/// Errors that can occur while computing a placement.
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("Unknown side {0:?} (expected auto, top, bottom, left or right)")]
    UnknownSide(String),

    #[error("Element {0} is not part of the render tree")]
    ElementDetached(ElementId),

    #[error("Invalid {what} rectangle: {rect:?}")]
    InvalidRect { what: &'static str, rect: Rect },

    #[error("Invalid viewport: {0:?}")]
    InvalidViewport(Viewport),
}

/// Axis of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A rectangle in page-absolute coordinates (pixels, scroll included).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A rectangle of the given size anchored at the page origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// Leading coordinate along an axis (left or top).
    pub fn start(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.left,
            Axis::Vertical => self.top,
        }
    }

    /// Extent along an axis (width or height).
    pub fn size(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Whether every component is finite and the size is non-negative.
    pub fn is_valid(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// The visible window plus its scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_left: f64,
    #[serde(default)]
    pub scroll_top: f64,
}

impl Viewport {
    /// Create an unscrolled viewport.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_left: 0.0,
            scroll_top: 0.0,
        }
    }

    /// Same viewport scrolled to the given offsets.
    pub fn with_scroll(mut self, scroll_left: f64, scroll_top: f64) -> Self {
        self.scroll_left = scroll_left;
        self.scroll_top = scroll_top;
        self
    }

    /// Page coordinate of the visible window's leading edge on an axis.
    pub fn origin(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.scroll_left,
            Axis::Vertical => self.scroll_top,
        }
    }

    /// Visible extent on an axis.
    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Check if a page-absolute rectangle lies fully inside the visible window.
    pub fn contains(&self, rect: &Rect) -> bool {
        rect.left >= self.scroll_left
            && rect.top >= self.scroll_top
            && rect.right() <= self.scroll_left + self.width
            && rect.bottom() <= self.scroll_top + self.height
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.scroll_left.is_finite()
            && self.scroll_top.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// The edge of the trigger a popper is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// Every side, in the order used for CSS class bookkeeping.
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

    /// The side on the other end of the same axis.
    pub fn opposite(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// The axis along which the popper is offset from the trigger.
    pub fn axis(self) -> Axis {
        match self {
            Side::Top | Side::Bottom => Axis::Vertical,
            Side::Left | Side::Right => Axis::Horizontal,
        }
    }

    /// Whether this side sits on the leading (left/top) edge of its axis.
    pub fn is_leading(self) -> bool {
        matches!(self, Side::Top | Side::Left)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Side::Top),
            "bottom" => Ok(Side::Bottom),
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            _ => Err(PlacementError::UnknownSide(s.to_string())),
        }
    }
}

/// Requested side: either a concrete side or `auto`, which is resolved on
/// every positioning pass and never stored as a final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SideRequest {
    /// Pick whichever vertical side has more room.
    #[default]
    Auto,
    /// Always start from this side (it may still flip).
    Fixed(Side),
}

impl FromStr for SideRequest {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(SideRequest::Auto);
        }
        s.parse().map(SideRequest::Fixed)
    }
}

impl TryFrom<String> for SideRequest {
    type Error = PlacementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SideRequest> for String {
    fn from(request: SideRequest) -> Self {
        request.to_string()
    }
}

impl fmt::Display for SideRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideRequest::Auto => f.write_str("auto"),
            SideRequest::Fixed(side) => side.fmt(f),
        }
    }
}

/// A `{top, left}` pair in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

impl Position {
    pub fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }

    /// Coordinate along an axis.
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.left,
            Axis::Vertical => self.top,
        }
    }

    /// Replace the coordinate along an axis.
    pub fn set_along(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Horizontal => self.left = value,
            Axis::Vertical => self.top = value,
        }
    }
}

/// Inputs of a positioning pass that come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    /// Requested side.
    pub side: SideRequest,
    /// Gap between trigger and popper along the main axis.
    pub margin: f64,
    /// Length of the entrance slide.
    pub transition_distance: f64,
    /// Half of the arrow's width. `None` means the popper has no arrow.
    pub arrow_half_width: Option<f64>,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            side: SideRequest::Auto,
            margin: 4.0,
            transition_distance: 10.0,
            arrow_half_width: None,
        }
    }
}

/// Arrow offset along the axis perpendicular to the popper's side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowOffset {
    pub offset_along_axis: f64,
}

/// Computed placement for a popper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementResult {
    /// Resolved side, after `auto` resolution and flipping.
    pub side: Side,
    /// Resting top coordinate.
    pub top: f64,
    /// Resting left coordinate.
    pub left: f64,
    /// Top coordinate the entrance slide starts from.
    pub from_top: f64,
    /// Left coordinate the entrance slide starts from.
    pub from_left: f64,
    /// Arrow offset, when the popper has an arrow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow: Option<ArrowOffset>,
}

impl PlacementResult {
    /// Resting position.
    pub fn target(&self) -> Position {
        Position::new(self.top, self.left)
    }

    /// Entrance starting position.
    pub fn from(&self) -> Position {
        Position::new(self.from_top, self.from_left)
    }

    /// The popper rectangle once it has reached its resting position.
    pub fn target_rect(&self, popper: &Rect) -> Rect {
        Rect::new(self.left, self.top, popper.width, popper.height)
    }

    /// Arrow translation as `(x, y)`: the aligned offset lands on x for
    /// top/bottom poppers and on y for left/right poppers.
    pub fn arrow_translation(&self) -> Option<(f64, f64)> {
        self.arrow.map(|arrow| match self.side.axis() {
            Axis::Vertical => (arrow.offset_along_axis, 0.0),
            Axis::Horizontal => (0.0, arrow.offset_along_axis),
        })
    }
}
