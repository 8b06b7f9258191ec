//! Pure geometry: side selection, per-side candidates, collision handling.

use crate::{Axis, Position, Rect, Side, SideRequest, Viewport};

/// Candidate resting positions for every side of the trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidates {
    pub top: Position,
    pub bottom: Position,
    pub left: Position,
    pub right: Position,
}

impl Candidates {
    /// Candidate for a side.
    pub fn get(&self, side: Side) -> Position {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Result of checking one axis of a candidate against the visible window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisFit {
    /// Candidate fits on this axis.
    Fits,
    /// Candidate has to move to this coordinate.
    Clamped(f64),
    /// The chosen side itself ran out of room; use the opposite side.
    Flip,
}

/// Pick the vertical side with strictly more free space around the trigger.
///
/// Space is measured inside the visible window, so the trigger's page
/// coordinate is made viewport-relative first. Ties go to `bottom`.
pub fn more_visible_vertical(trigger: &Rect, viewport: &Viewport) -> Side {
    let above = trigger.top - viewport.scroll_top;
    let below = viewport.height - above - trigger.height;

    if above > below {
        Side::Top
    } else {
        Side::Bottom
    }
}

/// Resolve a requested side into a concrete one.
pub fn resolve_side(request: SideRequest, trigger: &Rect, viewport: &Viewport) -> Side {
    match request {
        SideRequest::Auto => more_visible_vertical(trigger, viewport),
        SideRequest::Fixed(side) => side,
    }
}

/// Compute where the popper would rest on each side of the trigger.
///
/// The popper is centered on the trigger's cross axis and offset by
/// `margin` along the main axis.
pub fn candidates(trigger: &Rect, popper: &Rect, margin: f64) -> Candidates {
    let centered_left = trigger.left + (trigger.width - popper.width) / 2.0;
    let centered_top = trigger.top + (trigger.height - popper.height) / 2.0;

    Candidates {
        top: Position::new(trigger.top - popper.height - margin, centered_left),
        bottom: Position::new(trigger.bottom() + margin, centered_left),
        left: Position::new(centered_top, trigger.left - popper.width - margin),
        right: Position::new(centered_top, trigger.right() + margin),
    }
}

/// Check one axis of a candidate.
///
/// `leading` is the side on the leading edge of `axis` (left or top). When
/// the candidate crosses an edge and the chosen side is the one sitting on
/// that edge, the popper flips; otherwise it is clamped. A popper larger
/// than the viewport is kept at the scroll origin.
pub fn fit_axis(
    axis: Axis,
    start: f64,
    size: f64,
    viewport: &Viewport,
    chosen: Side,
    leading: Side,
) -> AxisFit {
    let origin = viewport.origin(axis);
    let far_edge = origin + viewport.extent(axis);

    if start < origin {
        if chosen == leading {
            AxisFit::Flip
        } else {
            AxisFit::Clamped(origin)
        }
    } else if start + size > far_edge {
        if chosen == leading.opposite() {
            AxisFit::Flip
        } else {
            AxisFit::Clamped((far_edge - size).max(origin))
        }
    } else {
        AxisFit::Fits
    }
}

/// Apply collision handling to the chosen side's candidate.
///
/// Horizontal and vertical checks are independent. A flip swaps the side
/// and takes the opposite candidate's main-axis coordinate as is; the other
/// axis keeps the result of its own check.
pub fn resolve_collisions(
    side: Side,
    candidates: &Candidates,
    popper: &Rect,
    viewport: &Viewport,
) -> (Side, Position) {
    let mut position = candidates.get(side);
    let mut flipped = None;

    for (axis, leading) in [(Axis::Horizontal, Side::Left), (Axis::Vertical, Side::Top)] {
        match fit_axis(
            axis,
            position.along(axis),
            popper.size(axis),
            viewport,
            side,
            leading,
        ) {
            AxisFit::Fits => {}
            AxisFit::Clamped(value) => position.set_along(axis, value),
            AxisFit::Flip => flipped = Some(side.opposite()),
        }
    }

    match flipped {
        Some(opposite) => {
            let axis = opposite.axis();
            position.set_along(axis, candidates.get(opposite).along(axis));
            tracing::trace!(from = %side, to = %opposite, "popper flipped");
            (opposite, position)
        }
        None => (side, position),
    }
}

/// Starting position of the entrance slide: the resting position shifted
/// `distance` pixels along the main axis, back toward the trigger.
pub fn entrance_offset(side: Side, resting: Position, distance: f64) -> Position {
    let Position { top, left } = resting;
    match side {
        Side::Top => Position::new(top + distance, left),
        Side::Bottom => Position::new(top - distance, left),
        Side::Left => Position::new(top, left + distance),
        Side::Right => Position::new(top, left - distance),
    }
}
