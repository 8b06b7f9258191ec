//! Integration tests for the popperkit placement engine.
//!
//! These tests drive the public `compute` entry point the way the popper
//! facade does and check:
//! - `auto` side resolution
//! - flipping and clamping at every viewport edge
//! - the containment invariant of the resting rectangle
//! - arrow bounds

use popperkit_placement::geometry::candidates;
use popperkit_placement::{
    compute, PlacementOptions, PlacementResult, Rect, Side, SideRequest, Viewport,
};

fn options(side: SideRequest) -> PlacementOptions {
    PlacementOptions {
        side,
        margin: 4.0,
        transition_distance: 10.0,
        arrow_half_width: None,
    }
}

fn place(trigger: Rect, popper: Rect, viewport: Viewport, side: SideRequest) -> PlacementResult {
    compute(&trigger, &popper, &viewport, &options(side))
}

// ============================================================================
// Side Selection
// ============================================================================

/// A trigger near the bottom of the window has more room above.
#[test]
fn test_auto_resolves_top_when_more_space_above() {
    let result = place(
        Rect::new(200.0, 300.0, 40.0, 20.0),
        Rect::sized(80.0, 30.0),
        Viewport::new(500.0, 400.0),
        SideRequest::Auto,
    );
    assert_eq!(result.side, Side::Top);
    assert_eq!(result.top, 300.0 - 30.0 - 4.0);
}

/// Equal room above and below resolves to bottom.
#[test]
fn test_auto_tie_resolves_bottom() {
    let result = place(
        Rect::new(200.0, 190.0, 40.0, 20.0),
        Rect::sized(80.0, 30.0),
        Viewport::new(500.0, 400.0),
        SideRequest::Auto,
    );
    assert_eq!(result.side, Side::Bottom);
}

/// The worked example: auto on a trigger with more room below.
#[test]
fn test_end_to_end_example() {
    let result = place(
        Rect::new(100.0, 100.0, 50.0, 20.0),
        Rect::sized(80.0, 30.0),
        Viewport::new(500.0, 400.0),
        SideRequest::Auto,
    );
    assert_eq!(result.side, Side::Bottom);
    assert_eq!(result.top, 124.0);
    assert_eq!(result.left, 85.0);
}

// ============================================================================
// Flipping
// ============================================================================

/// A left popper without room on the left flips to the right candidate.
#[test]
fn test_left_flips_to_right() {
    let trigger = Rect::new(30.0, 200.0, 40.0, 20.0);
    let popper = Rect::sized(80.0, 30.0);
    let viewport = Viewport::new(500.0, 400.0);

    let result = place(trigger, popper, viewport, SideRequest::Fixed(Side::Left));
    let expected = candidates(&trigger, &popper, 4.0).right;

    assert_eq!(result.side, Side::Right);
    assert_eq!(result.top, expected.top);
    assert_eq!(result.left, expected.left);
}

/// The same flip still works when the page is scrolled.
#[test]
fn test_left_flips_to_right_with_scroll() {
    let trigger = Rect::new(1030.0, 2200.0, 40.0, 20.0);
    let popper = Rect::sized(80.0, 30.0);
    let viewport = Viewport::new(500.0, 400.0).with_scroll(1000.0, 2000.0);

    let result = place(trigger, popper, viewport, SideRequest::Fixed(Side::Left));
    let expected = candidates(&trigger, &popper, 4.0).right;

    assert_eq!(result.side, Side::Right);
    assert_eq!((result.top, result.left), (expected.top, expected.left));
}

/// A right popper at the right edge flips to the left.
#[test]
fn test_right_flips_to_left() {
    let trigger = Rect::new(440.0, 200.0, 40.0, 20.0);
    let popper = Rect::sized(80.0, 30.0);
    let result = place(
        trigger,
        popper,
        Viewport::new(500.0, 400.0),
        SideRequest::Fixed(Side::Right),
    );
    assert_eq!(result.side, Side::Left);
    assert_eq!(result.left, 440.0 - 80.0 - 4.0);
}

/// A top popper at the top edge flips to the bottom.
#[test]
fn test_top_flips_to_bottom() {
    let trigger = Rect::new(200.0, 10.0, 40.0, 20.0);
    let result = place(
        trigger,
        Rect::sized(80.0, 30.0),
        Viewport::new(500.0, 400.0),
        SideRequest::Fixed(Side::Top),
    );
    assert_eq!(result.side, Side::Bottom);
    assert_eq!(result.top, 34.0);
    // Entrance slide follows the final side.
    assert_eq!(result.from_top, 24.0);
}

/// A bottom popper at the bottom edge flips to the top.
#[test]
fn test_bottom_flips_to_top() {
    let trigger = Rect::new(200.0, 370.0, 40.0, 20.0);
    let result = place(
        trigger,
        Rect::sized(80.0, 30.0),
        Viewport::new(500.0, 400.0),
        SideRequest::Fixed(Side::Bottom),
    );
    assert_eq!(result.side, Side::Top);
    assert_eq!(result.top, 336.0);
    assert_eq!(result.from_top, 346.0);
}

// ============================================================================
// Clamping
// ============================================================================

/// A bottom popper overflowing the right edge keeps its side and is clamped.
#[test]
fn test_bottom_clamped_at_right_edge() {
    let trigger = Rect::new(1470.0, 100.0, 20.0, 20.0);
    let popper = Rect::sized(120.0, 30.0);
    let viewport = Viewport::new(500.0, 400.0).with_scroll(1000.0, 0.0);

    let result = place(trigger, popper, viewport, SideRequest::Fixed(Side::Bottom));

    assert_eq!(result.side, Side::Bottom);
    assert_eq!(result.left, 500.0 + 1000.0 - 120.0);
    assert_eq!(result.top, 124.0);
}

/// A top popper overflowing the left edge is clamped to the scroll origin.
#[test]
fn test_top_clamped_at_left_edge() {
    let trigger = Rect::new(1005.0, 300.0, 10.0, 20.0);
    let viewport = Viewport::new(500.0, 400.0).with_scroll(1000.0, 0.0);
    let result = place(
        trigger,
        Rect::sized(120.0, 30.0),
        viewport,
        SideRequest::Fixed(Side::Top),
    );
    assert_eq!(result.side, Side::Top);
    assert_eq!(result.left, 1000.0);
}

/// A popper wider than the viewport sticks to the scroll origin.
#[test]
fn test_oversized_popper_sticks_to_origin() {
    let viewport = Viewport::new(300.0, 400.0).with_scroll(50.0, 0.0);
    let result = place(
        Rect::new(250.0, 100.0, 20.0, 20.0),
        Rect::sized(600.0, 30.0),
        viewport,
        SideRequest::Fixed(Side::Bottom),
    );
    assert_eq!(result.left, 50.0);
}

// ============================================================================
// Invariants
// ============================================================================

/// Whenever the popper fits in the viewport, the resting rectangle is inside it.
#[test]
fn test_resting_rect_inside_viewport() {
    let viewport = Viewport::new(400.0, 300.0).with_scroll(120.0, 80.0);
    let popper = Rect::sized(90.0, 40.0);
    let sides = [
        SideRequest::Auto,
        SideRequest::Fixed(Side::Top),
        SideRequest::Fixed(Side::Bottom),
        SideRequest::Fixed(Side::Left),
        SideRequest::Fixed(Side::Right),
    ];

    for x in [120.0, 125.0, 200.0, 300.0, 480.0, 500.0] {
        for y in [80.0, 85.0, 150.0, 300.0, 350.0, 360.0] {
            let trigger = Rect::new(x, y, 20.0, 20.0);
            for side in sides {
                let result = place(trigger, popper, viewport, side);
                let rect = result.target_rect(&popper);
                assert!(
                    viewport.contains(&rect),
                    "{side} at ({x}, {y}) escaped the viewport: {result:?}"
                );
            }
        }
    }
}

/// The arrow never leaves the popper body, whatever the size mismatch.
#[test]
fn test_arrow_within_popper() {
    let viewport = Viewport::new(500.0, 400.0);
    let half = 6.0;

    for trigger_width in [2.0, 40.0, 480.0] {
        for popper_width in [20.0, 90.0, 300.0] {
            for x in [0.0, 200.0, 490.0] {
                for side in [Side::Top, Side::Bottom, Side::Left, Side::Right] {
                    let popper = Rect::sized(popper_width, 60.0);
                    let result = compute(
                        &Rect::new(x, 180.0, trigger_width, 10.0),
                        &popper,
                        &viewport,
                        &PlacementOptions {
                            side: SideRequest::Fixed(side),
                            arrow_half_width: Some(half),
                            ..Default::default()
                        },
                    );
                    let size = match result.side {
                        Side::Top | Side::Bottom => popper.width,
                        Side::Left | Side::Right => popper.height,
                    };
                    let offset = result.arrow.expect("arrow").offset_along_axis;
                    assert!(offset >= half && offset <= size - half, "{result:?}");
                }
            }
        }
    }
}

/// Placements serialize with lowercase side names.
#[test]
fn test_placement_json_shape() {
    let result = place(
        Rect::new(100.0, 100.0, 50.0, 20.0),
        Rect::sized(80.0, 30.0),
        Viewport::new(500.0, 400.0),
        SideRequest::Auto,
    );
    let json = serde_json::to_value(result).expect("serialize");
    assert_eq!(json["side"], "bottom");
    assert_eq!(json["top"], 124.0);
    assert!(json.get("arrow").is_none());
}
