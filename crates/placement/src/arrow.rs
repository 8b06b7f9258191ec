//! Arrow alignment.
//!
//! The arrow points at the trigger's center along the axis perpendicular to
//! the popper's side, but never leaves the popper body: when the popper was
//! clamped away from the trigger, the arrow stops at the popper's edge.

use crate::{Axis, Position, Rect, Side};

/// Offset of the arrow along the popper edge facing the trigger.
///
/// For `top`/`bottom` poppers this is the trigger's horizontal center minus
/// the popper's final left, clamped to
/// `[arrow_half_width, popper.width - arrow_half_width]`. For `left`/`right`
/// poppers the vertical center and the popper height are used instead.
///
/// A popper narrower than the arrow itself has no valid range; the arrow is
/// then centered on the popper.
pub fn align(
    side: Side,
    trigger: &Rect,
    popper: &Rect,
    at: Position,
    arrow_half_width: f64,
) -> f64 {
    let (trigger_center, popper_start, popper_size) = match side.axis() {
        Axis::Vertical => (trigger.center_x(), at.left, popper.width),
        Axis::Horizontal => (trigger.center_y(), at.top, popper.height),
    };

    let min = arrow_half_width;
    let max = popper_size - arrow_half_width;
    if min > max {
        return popper_size / 2.0;
    }

    (trigger_center - popper_start).clamp(min, max)
}
