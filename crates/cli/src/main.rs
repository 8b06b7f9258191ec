//! popperkit CLI
//!
//! Command-line front end for the popperkit placement engine.
//!
//! - `place` computes one placement and prints it as JSON.
//! - `simulate` replays a show/hide script against an in-memory scene and
//!   prints every renderer call with its timestamp.

mod config;

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

use config::{parse_level, Config};
use popperkit::{
    millis, try_compute, ElementId, ManualScheduler, PlacementResult, Popper, PopperConfig,
    PopperElements, RecordedOp, RenderOp, Rect, Scene, Scheduler, SceneRenderer, SideRequest,
    TokioScheduler, TransitionState, Viewport,
};

const TRIGGER: ElementId = 1;
const POPPER: ElementId = 2;
const ARROW: ElementId = 3;

#[derive(Parser)]
#[command(name = "popperkit")]
#[command(author, version, about = "Position and animate popper elements")]
struct Cli {
    /// Config file (default: search the standard locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a placement and print it as JSON
    Place {
        /// Trigger rectangle as LEFT,TOP,WIDTH,HEIGHT
        #[arg(long, value_parser = parse_rect)]
        trigger: Option<Rect>,
        /// Popper size as WIDTH,HEIGHT
        #[arg(long, value_parser = parse_pair)]
        popper: Option<(f64, f64)>,
        /// Viewport size as WIDTH,HEIGHT
        #[arg(long, value_parser = parse_pair)]
        viewport: Option<(f64, f64)>,
        /// Scroll offset as LEFT,TOP
        #[arg(long, value_parser = parse_pair)]
        scroll: Option<(f64, f64)>,
        /// Side: auto, top, bottom, left or right
        #[arg(long)]
        side: Option<SideRequest>,
        /// Gap between trigger and popper in pixels
        #[arg(long)]
        margin: Option<f64>,
        /// Length of the entrance slide in pixels
        #[arg(long)]
        distance: Option<f64>,
        /// Half the arrow width; the popper has no arrow when unset
        #[arg(long)]
        arrow_half_width: Option<f64>,
    },
    /// Replay show/hide events against an in-memory scene
    Simulate {
        /// Event as ACTION@MS, e.g. show@0 or hide@250 (repeatable)
        #[arg(long = "event", value_parser = parse_event)]
        events: Vec<Event>,
        /// Run on tokio timers in real time instead of a virtual clock
        #[arg(long)]
        realtime: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Show,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct Event {
    action: Action,
    at_ms: f64,
}

#[derive(Serialize)]
struct SimulationReport {
    placement: Option<PlacementResult>,
    events: Vec<Event>,
    ops: Vec<RecordedOp>,
    final_state: TransitionState,
    after_hide_calls: usize,
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated numbers, got {s:?}"));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("{part:?} is not a number"))?;
    }
    Ok(out)
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let [left, top, width, height] = parse_numbers::<4>(s)?;
    Ok(Rect::new(left, top, width, height))
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let [a, b] = parse_numbers::<2>(s)?;
    Ok((a, b))
}

fn parse_event(s: &str) -> Result<Event, String> {
    let (action, at) = s
        .split_once('@')
        .ok_or_else(|| format!("expected ACTION@MS, got {s:?}"))?;
    let action = match action.trim().to_lowercase().as_str() {
        "show" => Action::Show,
        "hide" => Action::Hide,
        other => return Err(format!("unknown action {other:?} (expected show or hide)")),
    };
    let at_ms: f64 = at
        .trim()
        .parse()
        .map_err(|_| format!("{at:?} is not a time in milliseconds"))?;
    if !at_ms.is_finite() || at_ms < 0.0 {
        return Err(format!("event time must be a non-negative number, got {at_ms}"));
    }
    Ok(Event { action, at_ms })
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => {
            let max = LevelFilter::from_level(parse_level(level));
            EnvFilter::default().add_directive(max.into())
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for log level)
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load().unwrap_or_else(|e| {
            // Can't use tracing yet, fall back to eprintln
            eprintln!("Failed to load configuration: {e:#}. Using defaults.");
            Config::default()
        }),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level)?;

    let (popper_config, warnings) = config.popper_config();
    for w in &warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    match cli.command {
        Commands::Place {
            trigger,
            popper,
            viewport,
            scroll,
            side,
            margin,
            distance,
            arrow_half_width,
        } => {
            let scene = &config.scene;
            let trigger = trigger.unwrap_or(scene.trigger);
            let (width, height) = popper.unwrap_or((scene.popper.width, scene.popper.height));
            let mut vp = match viewport {
                Some((w, h)) => Viewport::new(w, h),
                None => scene.viewport,
            };
            if let Some((left, top)) = scroll {
                vp = vp.with_scroll(left, top);
            }

            let mut options = PopperConfig {
                side: side.unwrap_or(popper_config.side),
                margin: margin.unwrap_or(popper_config.margin),
                transition_distance: distance.unwrap_or(popper_config.transition_distance),
                arrow_half_width: arrow_half_width.or(popper_config.arrow_half_width),
                ..popper_config
            };
            for w in options.validate() {
                warn!("Option: {} - {}", w.field, w.message);
            }

            let placement = try_compute(
                &trigger,
                &Rect::sized(width, height),
                &vp,
                &options.placement_options(),
            )
            .context("Failed to compute placement")?;
            info!(side = %placement.side, "placement computed");
            println!("{}", serde_json::to_string_pretty(&placement)?);
        }
        Commands::Simulate {
            mut events,
            realtime,
            json,
        } => {
            if events.is_empty() {
                bail!("no events given (use --event show@0 --event hide@500)");
            }
            events.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));

            let report = if realtime {
                simulate_realtime(&config, popper_config, &events)?
            } else {
                simulate_virtual(&config, popper_config, &events)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }

    Ok(())
}

fn build_scene(config: &Config) -> (Scene, PopperElements) {
    let scene_config = &config.scene;
    let scene = Scene::with_viewport(scene_config.viewport);
    scene.insert(TRIGGER, scene_config.trigger);
    scene.insert(
        POPPER,
        Rect::sized(scene_config.popper.width, scene_config.popper.height),
    );

    let mut elements = PopperElements::new(TRIGGER, POPPER);
    if let Some(arrow) = scene_config.arrow {
        scene.insert(ARROW, Rect::sized(arrow.width, arrow.height));
        elements = elements.with_arrow(ARROW);
    }
    (scene, elements)
}

fn build_popper<S: Scheduler + 'static>(
    scene: &Scene,
    elements: PopperElements,
    popper_config: PopperConfig,
    scheduler: S,
) -> Result<(Popper<Scene, SceneRenderer, S>, Rc<Cell<usize>>)> {
    let popper = Popper::try_new(
        elements,
        popper_config,
        scene.clone(),
        scene.renderer(),
        scheduler,
    )
    .context("Failed to set up popper")?;

    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    popper.on_after_hide(move |element| {
        counter.set(counter.get() + 1);
        debug!(element, "after hide");
    });
    Ok((popper, calls))
}

fn apply(popper: &Popper<Scene, SceneRenderer, impl Scheduler + 'static>, event: &Event) {
    info!(action = ?event.action, at_ms = event.at_ms, "event");
    match event.action {
        Action::Show => popper.show(),
        Action::Hide => popper.hide(),
    }
}

fn simulate_virtual(
    config: &Config,
    popper_config: PopperConfig,
    events: &[Event],
) -> Result<SimulationReport> {
    let (scene, elements) = build_scene(config);
    let scheduler = ManualScheduler::new();
    let clock = scheduler.clone();
    scene.set_clock(move || clock.now());

    let (popper, calls) = build_popper(&scene, elements, popper_config, scheduler.clone())?;

    for event in events {
        scheduler.advance_to(millis(event.at_ms));
        apply(&popper, event);
    }
    scheduler.run_until_idle();

    Ok(SimulationReport {
        placement: popper.placement(),
        events: events.to_vec(),
        ops: scene.ops(),
        final_state: popper.state(),
        after_hide_calls: calls.get(),
    })
}

fn simulate_realtime(
    config: &Config,
    popper_config: PopperConfig,
    events: &[Event],
) -> Result<SimulationReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async {
        let (scene, elements) = build_scene(config);
        let start = tokio::time::Instant::now();
        scene.set_clock(move || start.elapsed());

        let scheduler = TokioScheduler::new();
        let (popper, calls) = build_popper(&scene, elements, popper_config, scheduler.clone())?;

        for event in events {
            tokio::time::sleep_until(start + millis(event.at_ms)).await;
            apply(&popper, event);
        }
        while scheduler.pending() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        Ok::<_, anyhow::Error>(SimulationReport {
            placement: popper.placement(),
            events: events.to_vec(),
            ops: scene.ops(),
            final_state: popper.state(),
            after_hide_calls: calls.get(),
        })
    })
}

fn describe(op: &RenderOp) -> String {
    match op {
        RenderOp::SetStyle {
            element,
            property,
            value,
        } => format!("#{element} style {}: {value}", property.as_str()),
        RenderOp::SetVisible { element, display } => {
            format!("#{element} display: {}", display.as_str())
        }
        RenderOp::AddClass { element, class } => format!("#{element} +class {class}"),
        RenderOp::RemoveClass { element, class } => format!("#{element} -class {class}"),
        RenderOp::StoreAux {
            element,
            key,
            value,
        } => format!("#{element} data {key:?} = {value}"),
        RenderOp::Commit { element } => format!("#{element} commit"),
    }
}

fn print_report(report: &SimulationReport) {
    if let Some(placement) = &report.placement {
        println!(
            "placement: {} at ({}, {}) from ({}, {})",
            placement.side, placement.left, placement.top, placement.from_left, placement.from_top
        );
    }
    for recorded in &report.ops {
        println!("{:>9.1}ms  {}", recorded.at_ms, describe(&recorded.op));
    }
    println!("final state: {:?}", report.final_state);
    println!("after-hide calls: {}", report.after_hide_calls);
}
