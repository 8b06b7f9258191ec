//! popperkit
//!
//! Show/hide transitions for a floating popper element.
//!
//! This crate wires the placement engine to the host:
//! - [`Renderer`]: style, visibility, class and aux-data side effects
//! - [`Scheduler`]: delayed callbacks (manual virtual clock or tokio)
//! - [`TransitionController`]: the enter/exit timer state machine
//! - [`Popper`]: the facade owning configuration and both of the above
//! - [`scene`]: an in-memory host that records every renderer call

use serde::Serialize;
use thiserror::Error;

pub mod config;
pub mod popper;
pub mod scene;
pub mod scheduler;
pub mod transition;

pub use config::{ConfigWarning, OptionValue, PopperConfig, PopperOptions, Timings};
pub use popper::{Popper, PopperElements};
pub use popperkit_placement::{
    compute, try_compute, ElementId, Measurement, PlacementError, PlacementOptions,
    PlacementResult, Position, Rect, Side, SideRequest, Viewport,
};
pub use scene::{RecordedOp, RenderOp, Scene, SceneRenderer};
pub use scheduler::{millis, ManualScheduler, Scheduler, Task, TimerHandle, TokioScheduler};
pub use transition::{AfterHide, TransitionController, TransitionState};

/// Errors that can occur while setting up a popper.
#[derive(Debug, Error, PartialEq)]
pub enum PopperError {
    #[error("Missing {0} element")]
    MissingElement(&'static str),

    #[error("Positioning failed: {0}")]
    Placement(#[from] PlacementError),

    #[error("Popper is inert")]
    Inert,
}

/// Style properties written by the popper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleProperty {
    ZIndex,
    Transform,
    TransitionDuration,
    Opacity,
}

impl StyleProperty {
    /// CSS property name.
    pub fn as_str(self) -> &'static str {
        match self {
            StyleProperty::ZIndex => "z-index",
            StyleProperty::Transform => "transform",
            StyleProperty::TransitionDuration => "transition-duration",
            StyleProperty::Opacity => "opacity",
        }
    }
}

/// Display mode of the popper element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    /// Laid out and measurable.
    InlineFlex,
    /// Removed from layout.
    None,
}

impl Display {
    pub fn as_str(self) -> &'static str {
        match self {
            Display::InlineFlex => "inline-flex",
            Display::None => "none",
        }
    }
}

/// Numeric values kept on the popper element between the positioning pass
/// and the timer steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuxKey {
    Top,
    Left,
    FromTop,
    FromLeft,
}

/// Side effects on the host's render tree.
///
/// Every call is addressed to an element handle. Implementations must
/// tolerate calls on elements that have since been removed.
pub trait Renderer {
    /// Whether the element is still part of the render tree.
    fn is_attached(&self, element: ElementId) -> bool;

    fn set_style(&mut self, element: ElementId, property: StyleProperty, value: &str);

    fn set_visible(&mut self, element: ElementId, display: Display);

    fn add_class(&mut self, element: ElementId, class: &str);

    fn remove_class(&mut self, element: ElementId, class: &str);

    fn store_aux(&mut self, element: ElementId, key: AuxKey, value: f64);

    fn read_aux(&self, element: ElementId, key: AuxKey) -> Option<f64>;

    /// Flush pending style changes (a forced synchronous style read), so
    /// the next transition starts from the current state.
    fn commit(&mut self, element: ElementId);
}

/// CSS value for a `transform` moving an element to `(x, y)`.
pub fn translate3d(x: f64, y: f64) -> String {
    format!("translate3d({x}px, {y}px, 0)")
}

/// CSS class marking the resolved side.
pub fn position_class(side: Side) -> String {
    format!("position-{side}")
}
