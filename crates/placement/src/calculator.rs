//! Position calculator: geometry + arrow alignment against live measurements.

use crate::arrow;
use crate::geometry::{candidates, entrance_offset, resolve_collisions, resolve_side};
use crate::{
    ArrowOffset, ElementId, PlacementError, PlacementOptions, PlacementResult, Rect, Viewport,
};

/// Source of element geometry, supplied by the host.
///
/// Rectangles must be page-absolute (current scroll offset included).
pub trait Measurement {
    /// Bounding box of an element, or `None` if it is not in the render tree.
    fn absolute_rect(&self, element: ElementId) -> Option<Rect>;

    /// Current visible window and scroll offset.
    fn viewport(&self) -> Viewport;
}

/// Compute a placement from already measured rectangles.
///
/// Only the popper's width and height are used; its current position is
/// irrelevant.
pub fn compute(
    trigger: &Rect,
    popper: &Rect,
    viewport: &Viewport,
    options: &PlacementOptions,
) -> PlacementResult {
    let requested = resolve_side(options.side, trigger, viewport);
    let candidates = candidates(trigger, popper, options.margin);
    let (side, target) = resolve_collisions(requested, &candidates, popper, viewport);
    let from = entrance_offset(side, target, options.transition_distance);

    let arrow = options.arrow_half_width.map(|half| ArrowOffset {
        offset_along_axis: arrow::align(side, trigger, popper, target, half),
    });

    PlacementResult {
        side,
        top: target.top,
        left: target.left,
        from_top: from.top,
        from_left: from.left,
        arrow,
    }
}

/// Like [`compute`], but rejects non-finite or negatively sized inputs.
pub fn try_compute(
    trigger: &Rect,
    popper: &Rect,
    viewport: &Viewport,
    options: &PlacementOptions,
) -> Result<PlacementResult, PlacementError> {
    if !trigger.is_valid() {
        return Err(PlacementError::InvalidRect {
            what: "trigger",
            rect: *trigger,
        });
    }
    if !popper.is_valid() {
        return Err(PlacementError::InvalidRect {
            what: "popper",
            rect: *popper,
        });
    }
    if !viewport.is_valid() {
        return Err(PlacementError::InvalidViewport(*viewport));
    }

    Ok(compute(trigger, popper, viewport, options))
}

/// Runs positioning passes for one popper against a [`Measurement`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionCalculator {
    options: PlacementOptions,
}

impl PositionCalculator {
    pub fn new(options: PlacementOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PlacementOptions {
        &self.options
    }

    /// Measure the elements and compute a fresh placement.
    ///
    /// The popper has an arrow only when an arrow element is given. Its half
    /// width comes from the options, or from half the measured arrow width.
    pub fn place<M: Measurement + ?Sized>(
        &self,
        measurement: &M,
        trigger: ElementId,
        popper: ElementId,
        arrow: Option<ElementId>,
    ) -> Result<PlacementResult, PlacementError> {
        let trigger_rect = measurement
            .absolute_rect(trigger)
            .ok_or(PlacementError::ElementDetached(trigger))?;
        let popper_rect = measurement
            .absolute_rect(popper)
            .ok_or(PlacementError::ElementDetached(popper))?;
        let viewport = measurement.viewport();

        let arrow_half_width = arrow.and_then(|id| {
            self.options.arrow_half_width.or_else(|| {
                let measured = measurement.absolute_rect(id).map(|r| r.width / 2.0);
                if measured.is_none() {
                    tracing::debug!(arrow = id, "arrow element not measurable, skipping");
                }
                measured
            })
        });

        let options = PlacementOptions {
            arrow_half_width,
            ..self.options
        };

        try_compute(&trigger_rect, &popper_rect, &viewport, &options)
    }
}
