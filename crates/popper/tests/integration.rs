//! Integration tests for the popperkit facade.
//!
//! These tests drive a `Popper` against the in-memory scene with a virtual
//! clock. They cover:
//! - Timer cancellation on rapid show/hide
//! - After-hide callback cardinality
//! - Degraded (inert) construction
//! - The tokio-backed scheduler end to end

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use popperkit::{
    AuxKey, Display, ManualScheduler, Popper, PopperConfig, PopperElements, PopperOptions, Rect,
    Scene, SceneRenderer, Side, StyleProperty, TokioScheduler, TransitionState, Viewport,
};

const TRIGGER: u64 = 1;
const POPPER: u64 = 2;

fn scene() -> Scene {
    let scene = Scene::with_viewport(Viewport::new(500.0, 400.0));
    scene.insert(TRIGGER, Rect::new(100.0, 100.0, 50.0, 20.0));
    scene.insert(POPPER, Rect::sized(80.0, 30.0));
    scene
}

fn config() -> PopperConfig {
    PopperConfig {
        enter_delay: 100.0,
        exit_delay: 50.0,
        ..Default::default()
    }
}

fn popper(scene: &Scene, scheduler: &ManualScheduler) -> Popper<Scene, SceneRenderer, ManualScheduler> {
    let clock = scheduler.clone();
    scene.set_clock(move || clock.now());
    Popper::new(
        PopperElements::new(TRIGGER, POPPER),
        config(),
        scene.clone(),
        scene.renderer(),
        scheduler.clone(),
    )
}

fn count_after_hide(popper: &Popper<Scene, SceneRenderer, ManualScheduler>) -> Rc<Cell<usize>> {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    popper.on_after_hide(move |_| counter.set(counter.get() + 1));
    calls
}

// ============================================================================
// Timer Cancellation
// ============================================================================

/// hide() right after show() never reveals the popper and ends hidden.
#[test]
fn test_hide_immediately_after_show() {
    let scene = scene();
    let scheduler = ManualScheduler::new();
    let popper = popper(&scene, &scheduler);

    popper.show();
    popper.hide();
    scheduler.run_until_idle();

    assert_eq!(scene.reveal_count(POPPER), 0);
    assert_eq!(popper.state(), TransitionState::Hidden);
    assert_eq!(scene.display(POPPER), Some(Display::None));
}

/// A burst of alternating calls leaves exactly one cycle in flight.
#[test]
fn test_rapid_toggling_leaves_no_stale_timers() {
    let scene = scene();
    let scheduler = ManualScheduler::new();
    let popper = popper(&scene, &scheduler);
    let calls = count_after_hide(&popper);

    for _ in 0..10 {
        popper.show();
        scheduler.advance(Duration::from_millis(20));
        popper.hide();
        scheduler.advance(Duration::from_millis(20));
    }
    popper.show();
    assert_eq!(scheduler.pending(), 1);

    scheduler.run_until_idle();
    assert_eq!(popper.state(), TransitionState::Shown);
    assert_eq!(scene.reveal_count(POPPER), 1);
    assert_eq!(calls.get(), 0);
}

/// The enter step runs at the configured delay on the virtual clock.
#[test]
fn test_timeline_follows_configured_delays() {
    let scene = scene();
    let scheduler = ManualScheduler::new();
    let popper = popper(&scene, &scheduler);
    scene.clear_ops();

    popper.show();
    scheduler.run_until_idle();
    popper.hide();
    scheduler.run_until_idle();

    let reveal = scene
        .ops()
        .into_iter()
        .find(|r| {
            matches!(
                r.op,
                popperkit::RenderOp::SetVisible { display: Display::InlineFlex, .. }
            )
        })
        .expect("reveal");
    assert_eq!(reveal.at_ms, 100.0);

    let removal = scene.ops().into_iter().last().expect("removal");
    // 100 enter + 300 show + 50 exit + 200 hide
    assert_eq!(removal.at_ms, 650.0);
    assert_eq!(
        removal.op,
        popperkit::RenderOp::SetVisible {
            element: POPPER,
            display: Display::None
        }
    );
}

// ============================================================================
// Callbacks
// ============================================================================

/// One show/hide cycle fires the after-hide callback exactly once.
#[test]
fn test_after_hide_once_per_cycle() {
    let scene = scene();
    let scheduler = ManualScheduler::new();
    let popper = popper(&scene, &scheduler);
    let calls = count_after_hide(&popper);

    popper.show();
    scheduler.run_until_idle();
    popper.hide();
    popper.hide();
    scheduler.run_until_idle();
    assert_eq!(calls.get(), 1);

    popper.show();
    scheduler.run_until_idle();
    popper.hide();
    scheduler.run_until_idle();
    assert_eq!(calls.get(), 2);
}

/// Removing the popper mid-hide still completes the cycle.
#[test]
fn test_detached_mid_hide_still_calls_back() {
    let scene = scene();
    let scheduler = ManualScheduler::new();
    let popper = popper(&scene, &scheduler);
    let calls = count_after_hide(&popper);

    popper.show();
    scheduler.run_until_idle();
    popper.hide();
    scheduler.advance(Duration::from_millis(60));
    assert_eq!(popper.state(), TransitionState::Exiting);

    scene.remove(POPPER);
    scheduler.run_until_idle();

    assert_eq!(popper.state(), TransitionState::Hidden);
    assert_eq!(calls.get(), 1);
}

// ============================================================================
// Construction
// ============================================================================

/// A popper whose trigger cannot be found does nothing.
#[test]
fn test_missing_trigger_is_inert() {
    let scene = scene();
    let scheduler = ManualScheduler::new();
    let popper = Popper::new(
        PopperElements {
            trigger: None,
            popper: Some(POPPER),
            arrow: None,
        },
        config(),
        scene.clone(),
        scene.renderer(),
        scheduler.clone(),
    );

    popper.show();
    popper.hide();
    scheduler.run_until_idle();

    assert!(popper.is_inert());
    assert_eq!(popper.state(), TransitionState::Idle);
    assert!(scene.ops().is_empty());
}

/// Options read from TOML flow through to the positioning pass.
#[test]
fn test_config_from_toml_options() {
    let options: PopperOptions = toml::from_str(
        r#"
        side = "left"
        margin = "8px"
        transitionDistance = 20
        "#,
    )
    .expect("parse options");
    let (config, warnings) = PopperConfig::from_options(&options);
    assert!(warnings.is_empty());

    let scene = scene();
    let popper = Popper::new(
        PopperElements::new(TRIGGER, POPPER),
        config,
        scene.clone(),
        scene.renderer(),
        ManualScheduler::new(),
    );
    let placement = popper.placement().expect("placed");

    assert_eq!(placement.side, Side::Left);
    assert_eq!(placement.left, 100.0 - 80.0 - 8.0);
    assert_eq!(placement.from_left, placement.left + 20.0);
    assert_eq!(scene.aux(POPPER, AuxKey::FromLeft), Some(placement.from_left));
}

// ============================================================================
// Tokio Scheduler
// ============================================================================

/// A full cycle on real (paused) tokio time.
#[tokio::test(start_paused = true)]
async fn test_tokio_full_cycle() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let scene = scene();
            let scheduler = TokioScheduler::new();
            let popper = Popper::new(
                PopperElements::new(TRIGGER, POPPER),
                config(),
                scene.clone(),
                scene.renderer(),
                scheduler.clone(),
            );
            let calls = Rc::new(Cell::new(0));
            let counter = Rc::clone(&calls);
            popper.on_after_hide(move |_| counter.set(counter.get() + 1));

            popper.show();
            tokio::time::sleep(Duration::from_millis(450)).await;
            assert_eq!(popper.state(), TransitionState::Shown);
            assert_eq!(
                scene.style(POPPER, StyleProperty::Opacity).as_deref(),
                Some("1")
            );

            popper.hide();
            tokio::time::sleep(Duration::from_millis(300)).await;
            assert_eq!(popper.state(), TransitionState::Hidden);
            assert_eq!(calls.get(), 1);
            assert_eq!(scheduler.pending(), 0);
        })
        .await;
}
