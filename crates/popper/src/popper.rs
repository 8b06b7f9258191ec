//! The popper facade.
//!
//! [`Popper`] owns the configuration, runs positioning passes against the
//! host's [`Measurement`] and forwards `show()`/`hide()` to its
//! [`TransitionController`].

use popperkit_placement::PositionCalculator;
use tracing::{debug, warn};

use crate::config::PopperConfig;
use crate::scheduler::Scheduler;
use crate::transition::{TransitionController, TransitionState};
use crate::{
    position_class, translate3d, AuxKey, Display, ElementId, Measurement, PlacementResult,
    PopperError, Renderer, Side, StyleProperty,
};

/// Element handles of one popper, as found by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PopperElements {
    pub trigger: Option<ElementId>,
    pub popper: Option<ElementId>,
    pub arrow: Option<ElementId>,
}

impl PopperElements {
    pub fn new(trigger: ElementId, popper: ElementId) -> Self {
        Self {
            trigger: Some(trigger),
            popper: Some(popper),
            arrow: None,
        }
    }

    pub fn with_arrow(mut self, arrow: ElementId) -> Self {
        self.arrow = Some(arrow);
        self
    }
}

/// A positioned, animated popper.
pub struct Popper<M, R, S>
where
    M: Measurement,
    R: Renderer + 'static,
    S: Scheduler + 'static,
{
    elements: PopperElements,
    config: PopperConfig,
    calculator: PositionCalculator,
    measurement: M,
    controller: TransitionController<R, S>,
    placement: Option<PlacementResult>,
}

impl<M, R, S> Popper<M, R, S>
where
    M: Measurement,
    R: Renderer + 'static,
    S: Scheduler + 'static,
{
    /// Create a popper and run the first positioning pass.
    ///
    /// Never fails: when an element is missing or cannot be measured, a
    /// warning is logged and the returned popper is inert.
    pub fn new(
        elements: PopperElements,
        config: PopperConfig,
        measurement: M,
        renderer: R,
        scheduler: S,
    ) -> Self {
        let (popper, result) = Self::construct(elements, config, measurement, renderer, scheduler);
        if let Err(err) = result {
            warn!(error = %err, "popper disabled");
        }
        popper
    }

    /// Like [`new`](Self::new), but reports why the popper would be inert.
    pub fn try_new(
        elements: PopperElements,
        config: PopperConfig,
        measurement: M,
        renderer: R,
        scheduler: S,
    ) -> Result<Self, PopperError> {
        let (popper, result) = Self::construct(elements, config, measurement, renderer, scheduler);
        result.map(|()| popper)
    }

    fn construct(
        elements: PopperElements,
        mut config: PopperConfig,
        measurement: M,
        renderer: R,
        scheduler: S,
    ) -> (Self, Result<(), PopperError>) {
        for warning in config.validate() {
            warn!(field = warning.field, "{}", warning.message);
        }

        let found = match (elements.trigger, elements.popper) {
            (None, _) => Err(PopperError::MissingElement("trigger")),
            (_, None) => Err(PopperError::MissingElement("popper")),
            (Some(trigger), _) if !renderer.is_attached(trigger) => {
                Err(PopperError::MissingElement("trigger"))
            }
            (_, Some(popper)) if !renderer.is_attached(popper) => {
                Err(PopperError::MissingElement("popper"))
            }
            (Some(_), Some(popper)) => Ok(popper),
        };

        let controller = match found {
            Ok(popper) => {
                TransitionController::new(popper, renderer, scheduler, config.timings())
            }
            Err(err) => {
                let controller = TransitionController::inert(renderer, scheduler);
                return (
                    Self::assemble(elements, config, measurement, controller),
                    Err(err),
                );
            }
        };

        let mut this = Self::assemble(elements, config, measurement, controller);
        if let Some(popper) = elements.popper {
            let z_index = this.config.z_index.to_string();
            this.controller
                .with_renderer(|r| r.set_style(popper, StyleProperty::ZIndex, &z_index));
        }

        match this.reposition() {
            Ok(_) => (this, Ok(())),
            Err(err) => {
                this.controller.disable();
                (this, Err(err))
            }
        }
    }

    fn assemble(
        elements: PopperElements,
        config: PopperConfig,
        measurement: M,
        controller: TransitionController<R, S>,
    ) -> Self {
        Self {
            elements,
            calculator: PositionCalculator::new(config.placement_options()),
            config,
            measurement,
            controller,
            placement: None,
        }
    }

    /// Run a positioning pass with fresh measurements.
    ///
    /// While hidden, the popper is laid out for measuring, moved to its
    /// entrance position and removed from layout again. While visible, only
    /// the stored coordinates, side classes and arrow are updated (plus the
    /// transform when the popper is at rest), so a running transition is not
    /// disturbed.
    pub fn reposition(&mut self) -> Result<PlacementResult, PopperError> {
        if self.controller.is_inert() {
            return Err(PopperError::Inert);
        }
        let (Some(trigger), Some(popper)) = (self.elements.trigger, self.elements.popper) else {
            return Err(PopperError::Inert);
        };
        let arrow = self.elements.arrow;
        let state = self.controller.state();
        let hidden = !state.is_visible();
        let calculator = self.calculator;
        let measurement = &self.measurement;

        let placement = self.controller.with_renderer(|r| {
            if hidden {
                r.set_visible(popper, Display::InlineFlex);
            }

            let placement = match calculator.place(measurement, trigger, popper, arrow) {
                Ok(placement) => placement,
                Err(err) => {
                    if hidden {
                        r.set_visible(popper, Display::None);
                    }
                    return Err(err);
                }
            };

            if hidden {
                r.set_style(
                    popper,
                    StyleProperty::Transform,
                    &translate3d(placement.from_left, placement.from_top),
                );
            }
            r.store_aux(popper, AuxKey::FromLeft, placement.from_left);
            r.store_aux(popper, AuxKey::FromTop, placement.from_top);
            r.store_aux(popper, AuxKey::Top, placement.top);
            r.store_aux(popper, AuxKey::Left, placement.left);

            for side in Side::ALL {
                r.remove_class(popper, &position_class(side));
            }
            r.add_class(popper, &position_class(placement.side));

            if let (Some(arrow), Some((x, y))) = (arrow, placement.arrow_translation()) {
                r.set_style(arrow, StyleProperty::Transform, &translate3d(x, y));
            }

            if state == TransitionState::Shown {
                r.set_style(
                    popper,
                    StyleProperty::Transform,
                    &translate3d(placement.left, placement.top),
                );
            }
            if hidden {
                r.set_visible(popper, Display::None);
            }
            Ok(placement)
        })?;

        debug!(
            popper,
            side = %placement.side,
            top = placement.top,
            left = placement.left,
            "positioned"
        );
        self.placement = Some(placement);
        Ok(placement)
    }

    /// Start showing the popper.
    pub fn show(&self) {
        self.controller.show();
    }

    /// Start hiding the popper.
    pub fn hide(&self) {
        self.controller.hide();
    }

    /// Set the callback run with the popper element after each completed hide.
    pub fn on_after_hide(&self, callback: impl FnMut(ElementId) + 'static) {
        self.controller.set_after_hide(callback);
    }

    /// Placement of the last successful positioning pass.
    pub fn placement(&self) -> Option<PlacementResult> {
        self.placement
    }

    pub fn state(&self) -> TransitionState {
        self.controller.state()
    }

    pub fn is_inert(&self) -> bool {
        self.controller.is_inert()
    }

    pub fn config(&self) -> &PopperConfig {
        &self.config
    }

    pub fn elements(&self) -> PopperElements {
        self.elements
    }

    pub fn measurement(&self) -> &M {
        &self.measurement
    }

    pub fn controller(&self) -> &TransitionController<R, S> {
        &self.controller
    }
}
