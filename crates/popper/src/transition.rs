//! Show/hide timer state machine.
//!
//! A show runs `enter delay -> reveal + slide in -> show duration`, a hide
//! runs `exit delay -> slide out -> hide duration -> remove + callback`.
//! Starting one direction cancels every pending timer of the other, so a
//! burst of `show()`/`hide()` calls never leaves a stale timer behind.
//!
//! Timer callbacks hold a [`Weak`] reference to the controller state: once
//! the controller is dropped, a late callback finds nothing and returns.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::Timings;
use crate::scheduler::{millis, Scheduler, TimerHandle};
use crate::{translate3d, AuxKey, Display, ElementId, Renderer, StyleProperty};

/// Callback run after a completed hide, with the popper element.
pub type AfterHide = Box<dyn FnMut(ElementId)>;

/// Where a popper is in its show/hide cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionState {
    /// Created, never shown.
    #[default]
    Idle,
    /// Revealed and sliding to its resting position.
    Entering,
    /// At rest and fully opaque.
    Shown,
    /// Sliding back out and fading.
    Exiting,
    /// Removed from layout after a completed hide.
    Hidden,
}

impl TransitionState {
    /// Whether the popper is laid out in this state.
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            TransitionState::Entering | TransitionState::Shown | TransitionState::Exiting
        )
    }
}

#[derive(Debug, Default)]
struct Timers {
    enter_delay: Option<TimerHandle>,
    show_settle: Option<TimerHandle>,
    exit_delay: Option<TimerHandle>,
    hide_settle: Option<TimerHandle>,
}

impl Timers {
    fn showing(&self) -> bool {
        self.enter_delay.is_some() || self.show_settle.is_some()
    }

    fn hiding(&self) -> bool {
        self.exit_delay.is_some() || self.hide_settle.is_some()
    }

    fn take_show(&mut self) -> [Option<TimerHandle>; 2] {
        [self.enter_delay.take(), self.show_settle.take()]
    }

    fn take_hide(&mut self) -> [Option<TimerHandle>; 2] {
        [self.exit_delay.take(), self.hide_settle.take()]
    }
}

struct ControllerInner<R> {
    /// `None` when the controller is inert.
    popper: Option<ElementId>,
    renderer: R,
    timings: Timings,
    state: TransitionState,
    timers: Timers,
    after_hide: Option<AfterHide>,
}

struct Shared<R, S> {
    scheduler: S,
    inner: RefCell<ControllerInner<R>>,
}

/// Sequences the enter/exit delays and transition durations of one popper.
///
/// The controller owns the [`Renderer`] it drives; the popper facade reaches
/// it through [`with_renderer`](Self::with_renderer).
pub struct TransitionController<R: Renderer + 'static, S: Scheduler + 'static> {
    shared: Rc<Shared<R, S>>,
}

impl<R: Renderer + 'static, S: Scheduler + 'static> TransitionController<R, S> {
    /// Create a controller for the given popper element.
    pub fn new(popper: ElementId, renderer: R, scheduler: S, timings: Timings) -> Self {
        Self::build(Some(popper), renderer, scheduler, timings)
    }

    /// Create a controller whose operations are all no-ops.
    pub fn inert(renderer: R, scheduler: S) -> Self {
        Self::build(None, renderer, scheduler, Timings::default())
    }

    fn build(popper: Option<ElementId>, renderer: R, scheduler: S, timings: Timings) -> Self {
        Self {
            shared: Rc::new(Shared {
                scheduler,
                inner: RefCell::new(ControllerInner {
                    popper,
                    renderer,
                    timings,
                    state: TransitionState::Idle,
                    timers: Timers::default(),
                    after_hide: None,
                }),
            }),
        }
    }

    /// Set the callback run after each completed hide.
    pub fn set_after_hide(&self, callback: impl FnMut(ElementId) + 'static) {
        self.shared.inner.borrow_mut().after_hide = Some(Box::new(callback));
    }

    pub fn state(&self) -> TransitionState {
        self.shared.inner.borrow().state
    }

    pub fn timings(&self) -> Timings {
        self.shared.inner.borrow().timings
    }

    pub fn is_inert(&self) -> bool {
        self.shared.inner.borrow().popper.is_none()
    }

    /// Whether any enter or exit timer is still pending.
    pub fn is_busy(&self) -> bool {
        let inner = self.shared.inner.borrow();
        inner.timers.showing() || inner.timers.hiding()
    }

    pub fn scheduler(&self) -> &S {
        &self.shared.scheduler
    }

    /// Run `f` with mutable access to the renderer.
    ///
    /// # Panics
    ///
    /// Panics if called from inside the after-hide callback.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.shared.inner.borrow_mut().renderer)
    }

    /// Turn the controller inert, cancelling whatever is pending.
    pub(crate) fn disable(&self) {
        self.cancel_all();
        self.shared.inner.borrow_mut().popper = None;
    }

    /// Start (or keep) showing the popper.
    ///
    /// Pending hide timers are cancelled. Nothing new is scheduled while a
    /// show is already in flight or the popper is already shown.
    pub fn show(&self) {
        let shared = &self.shared;
        let mut inner = shared.inner.borrow_mut();
        let Some(popper) = inner.popper else {
            debug!("show() on inert popper ignored");
            return;
        };

        for handle in inner.timers.take_hide().into_iter().flatten() {
            shared.scheduler.cancel(handle);
        }

        if inner.timers.showing() || inner.state == TransitionState::Shown {
            trace!(popper, state = ?inner.state, "show already in progress");
            return;
        }

        let weak = Rc::downgrade(shared);
        let handle = shared.scheduler.schedule(
            millis(inner.timings.enter_delay),
            Box::new(move || fire(&weak, Shared::<R, S>::enter)),
        );
        inner.timers.enter_delay = Some(handle);
        debug!(popper, delay_ms = inner.timings.enter_delay, "show scheduled");
    }

    /// Start (or keep) hiding the popper.
    ///
    /// Pending show timers are cancelled. Nothing new is scheduled while a
    /// hide is already in flight or the popper is already hidden.
    pub fn hide(&self) {
        let shared = &self.shared;
        let mut inner = shared.inner.borrow_mut();
        let Some(popper) = inner.popper else {
            debug!("hide() on inert popper ignored");
            return;
        };

        for handle in inner.timers.take_show().into_iter().flatten() {
            shared.scheduler.cancel(handle);
        }

        if inner.timers.hiding() || inner.state == TransitionState::Hidden {
            trace!(popper, state = ?inner.state, "hide already in progress");
            return;
        }

        let weak = Rc::downgrade(shared);
        let handle = shared.scheduler.schedule(
            millis(inner.timings.exit_delay),
            Box::new(move || fire(&weak, Shared::<R, S>::exit)),
        );
        inner.timers.exit_delay = Some(handle);
        debug!(popper, delay_ms = inner.timings.exit_delay, "hide scheduled");
    }

    fn cancel_all(&self) {
        let Ok(mut inner) = self.shared.inner.try_borrow_mut() else {
            return;
        };
        let mut pending = inner.timers.take_show().to_vec();
        pending.extend(inner.timers.take_hide());
        for handle in pending.into_iter().flatten() {
            self.shared.scheduler.cancel(handle);
        }
    }
}

impl<R: Renderer + 'static, S: Scheduler + 'static> Drop for TransitionController<R, S> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn fire<R, S>(weak: &Weak<Shared<R, S>>, step: fn(&Rc<Shared<R, S>>)) {
    if let Some(shared) = weak.upgrade() {
        step(&shared);
    }
}

impl<R: Renderer + 'static, S: Scheduler + 'static> Shared<R, S> {
    /// Enter delay elapsed: reveal at the entrance position and slide in.
    fn enter(self: &Rc<Self>) {
        let mut inner = self.inner.borrow_mut();
        inner.timers.enter_delay = None;
        let Some(popper) = inner.popper else {
            return;
        };
        if !inner.renderer.is_attached(popper) {
            debug!(popper, "popper detached, enter step skipped");
            return;
        }
        let (Some(top), Some(left)) = (
            inner.renderer.read_aux(popper, AuxKey::Top),
            inner.renderer.read_aux(popper, AuxKey::Left),
        ) else {
            debug!(popper, "no resting position stored, enter step skipped");
            return;
        };

        let duration = inner.timings.show_duration;
        inner.state = TransitionState::Entering;

        let renderer = &mut inner.renderer;
        renderer.set_visible(popper, Display::InlineFlex);
        // Style read between reveal and transition, so the slide starts from
        // the entrance position.
        renderer.commit(popper);
        renderer.set_style(popper, StyleProperty::TransitionDuration, &format!("{duration}ms"));
        renderer.set_style(popper, StyleProperty::Transform, &translate3d(left, top));
        renderer.set_style(popper, StyleProperty::Opacity, "1");

        let weak = Rc::downgrade(self);
        inner.timers.show_settle = Some(self.scheduler.schedule(
            millis(duration),
            Box::new(move || fire(&weak, Self::show_settled)),
        ));
        debug!(popper, duration_ms = duration, "entering");
    }

    fn show_settled(self: &Rc<Self>) {
        let mut inner = self.inner.borrow_mut();
        inner.timers.show_settle = None;
        if inner.state == TransitionState::Entering {
            inner.state = TransitionState::Shown;
            debug!(popper = ?inner.popper, "shown");
        }
    }

    /// Exit delay elapsed: slide back to the entrance position and fade.
    fn exit(self: &Rc<Self>) {
        let mut inner = self.inner.borrow_mut();
        inner.timers.exit_delay = None;
        let Some(popper) = inner.popper else {
            return;
        };
        if !inner.renderer.is_attached(popper) {
            debug!(popper, "popper detached, exit step skipped");
            return;
        }
        let (Some(from_top), Some(from_left)) = (
            inner.renderer.read_aux(popper, AuxKey::FromTop),
            inner.renderer.read_aux(popper, AuxKey::FromLeft),
        ) else {
            debug!(popper, "no entrance position stored, exit step skipped");
            return;
        };

        let duration = inner.timings.hide_duration;
        inner.state = TransitionState::Exiting;

        let renderer = &mut inner.renderer;
        renderer.set_style(popper, StyleProperty::TransitionDuration, &format!("{duration}ms"));
        renderer.set_style(popper, StyleProperty::Transform, &translate3d(from_left, from_top));
        renderer.set_style(popper, StyleProperty::Opacity, "0");

        let weak = Rc::downgrade(self);
        inner.timers.hide_settle = Some(self.scheduler.schedule(
            millis(duration),
            Box::new(move || fire(&weak, Self::hide_settled)),
        ));
        debug!(popper, duration_ms = duration, "exiting");
    }

    /// Hide duration elapsed: remove from layout and notify.
    fn hide_settled(self: &Rc<Self>) {
        let (popper, callback) = {
            let mut inner = self.inner.borrow_mut();
            inner.timers.hide_settle = None;
            let Some(popper) = inner.popper else {
                return;
            };
            if inner.renderer.is_attached(popper) {
                inner.renderer.set_visible(popper, Display::None);
            }
            inner.state = TransitionState::Hidden;
            debug!(popper, "hidden");
            (popper, inner.after_hide.take())
        };

        // The borrow is released so the callback may call back into the host.
        if let Some(mut callback) = callback {
            callback(popper);
            let mut inner = self.inner.borrow_mut();
            if inner.after_hide.is_none() {
                inner.after_hide = Some(callback);
            }
        }
    }
}
