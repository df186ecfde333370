//! Run loops shared by every model: headless stepping and the minifb window.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::{debug, info, warn};

use crate::config::{Config, DisplayConfig};
use crate::error::{RunError, SimError};
use crate::export::export_history;
use crate::params::ParamSet;
use crate::render::panel::{render_panel, PanelState};
use crate::render::{colors, render_history, render_status, Canvas, Rect, STATUS_BAR_HEIGHT};
use crate::scheduler::{FrameScheduler, RunState, TickOutcome};
use crate::sim::thermo::{self, begin_process, clear_path};
use crate::sim::{LcCircuit, Pendulum, PvCycle, Readout, RlCircuit, Selection, Simulation, SpringMass};

/// Optional per-model behaviour beyond the pure step function.
pub trait Interactive: Simulation {
    /// Lets a model queue its own next action in headless runs.
    fn autopilot(_state: &Self::State, _params: &ParamSet) -> Result<Option<Self::State>, SimError> {
        Ok(None)
    }

    /// Digit keys 0-9 in the window.
    fn on_digit(_digit: u8, _state: &Self::State, _params: &ParamSet) -> Result<Option<Self::State>, SimError> {
        Ok(None)
    }
}

impl Interactive for Pendulum {}
impl Interactive for RlCircuit {}
impl Interactive for LcCircuit {}
impl Interactive for SpringMass {}
impl Interactive for Selection {}

impl Interactive for PvCycle {
    fn autopilot(state: &Self::State, params: &ParamSet) -> Result<Option<Self::State>, SimError> {
        match thermo::cycle_leg(state, params)? {
            Some(leg) => begin_process(state, params, leg).map(Some),
            None => Ok(None),
        }
    }

    fn on_digit(digit: u8, state: &Self::State, params: &ParamSet) -> Result<Option<Self::State>, SimError> {
        if digit == 0 {
            return Ok(Some(clear_path(state)));
        }
        if state.is_busy() {
            return Ok(None);
        }
        match thermo::key_target(digit, state.point) {
            Some(target) => begin_process(state, params, target).map(Some),
            None => Ok(None),
        }
    }
}

/// Scheduler with config and command-line overrides applied, in that order.
/// Bad overrides are logged and skipped.
pub fn build_scheduler<S: Simulation>(cfg: &Config, overrides: &[(String, f64)]) -> Result<FrameScheduler<S>, SimError> {
    let mut params = S::default_params();
    if let Some(from_config) = cfg.overrides_for(S::NAME) {
        params.apply(from_config);
    }
    for (name, value) in overrides {
        if let Err(e) = params.set(name, *value) {
            warn!(model = S::NAME, error = %e, "ignoring --set override");
        }
    }
    FrameScheduler::new(params, cfg.scheduler.settings())
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessOptions {
    pub frames: usize,
    pub dt: f64,
    pub export: Option<PathBuf>,
    /// Print a readout row every N frames; 0 disables printing.
    pub print_every: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessReport {
    pub frames: usize,
    pub elapsed: f64,
    pub interrupted: bool,
    pub exported: Option<usize>,
}

fn format_row(readout: &[(&'static str, f64)]) -> String {
    readout
        .iter()
        .map(|(name, v)| format!("{name}={v:.6}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Step a fixed number of frames with a fixed dt, then optionally export.
/// Stops early when `running` drops. A step error ends the run with the
/// history so far still exported.
pub fn run_headless<S: Interactive>(
    sched: &mut FrameScheduler<S>,
    opts: &HeadlessOptions,
    running: &AtomicBool,
) -> Result<HeadlessReport, RunError> {
    info!(model = S::NAME, frames = opts.frames, dt = opts.dt, "headless run");
    sched.start();
    let mut frames = 0;
    let mut fault = None;
    while frames < opts.frames {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if let Some(next) = S::autopilot(sched.state(), sched.params())? {
            sched.snap_state(|_, _| Ok(next))?;
        }
        if let Err(e) = sched.advance(opts.dt) {
            fault = Some(e);
            break;
        }
        frames += 1;
        if opts.print_every > 0 && frames % opts.print_every == 0 {
            if let Some(sample) = sched.history().latest() {
                println!("t={:.4} {}", sched.elapsed(), format_row(&sample.readout()));
            }
        }
    }
    let exported = match &opts.export {
        Some(path) => Some(export_history(path, sched.history())?),
        None => None,
    };
    if let Some(e) = fault {
        return Err(e.into());
    }
    Ok(HeadlessReport {
        frames,
        elapsed: sched.elapsed(),
        interrupted: frames < opts.frames,
        exported,
    })
}

fn status_line<S: Simulation>(sched: &FrameScheduler<S>, fps: u32) -> String {
    let state = match sched.run_state() {
        RunState::Idle => "idle",
        RunState::Running => "running",
        RunState::Paused => "paused",
    };
    let mut line = format!("{}  {}  t={:.2}  {} fps  space run  r reset  tab panel  esc quit", S::NAME, state, sched.elapsed(), fps);
    if let Some(e) = sched.last_error() {
        line = format!("{}  stopped: {}", S::NAME, e);
    }
    line
}

fn digit_pressed(window: &Window) -> Option<u8> {
    const DIGITS: [Key; 10] = [
        Key::Key0,
        Key::Key1,
        Key::Key2,
        Key::Key3,
        Key::Key4,
        Key::Key5,
        Key::Key6,
        Key::Key7,
        Key::Key8,
        Key::Key9,
    ];
    DIGITS
        .iter()
        .position(|&k| window.is_key_pressed(k, KeyRepeat::No))
        .map(|d| d as u8)
}

/// Drawing surface that follows the scheduler's resize notifications.
fn mount_canvas<S: Simulation>(sched: &mut FrameScheduler<S>, width: usize, height: usize) -> Rc<RefCell<Canvas>> {
    let canvas = Rc::new(RefCell::new(Canvas::new(width, height)));
    let sized = Rc::clone(&canvas);
    sched.add_resize_listener(move |w, h| sized.borrow_mut().resize(w, h));
    canvas
}

/// Interactive window: plots history lanes with the parameter panel on top.
pub fn run_window<S: Interactive>(
    mut sched: FrameScheduler<S>,
    display: &DisplayConfig,
    history_span: f64,
    running: &AtomicBool,
) -> Result<(), RunError> {
    let (mut w, mut h) = (display.width.max(160), display.height.max(120));
    let mut window = Window::new(
        &format!("stemlab - {}", S::NAME),
        w,
        h,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(display.target_fps.max(1));

    let canvas = mount_canvas(&mut sched, w, h);
    let mut panel = PanelState::new();
    let param_count = sched.params().defs().len();
    let mut frame_count = 0u32;
    let mut display_fps = 0u32;
    let mut last_fps_time = Instant::now();

    sched.start();

    while window.is_open() && running.load(Ordering::SeqCst) {
        if window.is_key_pressed(Key::Escape, KeyRepeat::No) {
            break;
        }
        if window.is_key_pressed(Key::Space, KeyRepeat::No) {
            sched.toggle();
        }
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            sched.reset()?;
        }
        if window.is_key_pressed(Key::Tab, KeyRepeat::No) {
            panel.toggle();
        }
        if window.is_key_pressed(Key::Up, KeyRepeat::Yes) {
            panel.navigate(-1, param_count);
        }
        if window.is_key_pressed(Key::Down, KeyRepeat::Yes) {
            panel.navigate(1, param_count);
        }
        for (key, steps) in [(Key::Left, -1), (Key::Right, 1)] {
            if !window.is_key_pressed(key, KeyRepeat::Yes) {
                continue;
            }
            if let Some(def) = panel.selected_def(sched.params()) {
                match sched.nudge_param(def.name, steps) {
                    Ok(change) if change.changed => {
                        debug!(param = def.name, value = change.value, reset = change.needs_reset(), "param changed");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(param = def.name, error = %e, "param change rejected"),
                }
            }
        }
        if let Some(digit) = digit_pressed(&window) {
            let result = S::on_digit(digit, sched.state(), sched.params());
            match result {
                Ok(Some(next)) => sched.snap_state(|_, _| Ok(next))?,
                Ok(None) => {}
                Err(e) => warn!(digit, error = %e, "action rejected"),
            }
        }

        let (new_w, new_h) = window.get_size();
        if (new_w, new_h) != (w, h) && new_w > 0 && new_h > 0 {
            w = new_w;
            h = new_h;
            sched.notify_resize(w, h);
        }

        if let TickOutcome::Faulted(e) = sched.tick(Instant::now()) {
            warn!(model = S::NAME, error = %e, "simulation stopped");
        }

        let mut frame = canvas.borrow_mut();
        frame.clear(colors::BACKGROUND);
        let plot_area = Rect {
            x: 0,
            y: 0,
            w,
            h: h.saturating_sub(STATUS_BAR_HEIGHT),
        };
        render_history(&mut frame, plot_area, sched.history(), history_span);
        render_panel(&mut frame, plot_area, &panel, S::NAME, sched.params());
        render_status(&mut frame, &status_line(&sched, display_fps));
        window.update_with_buffer(frame.pixels(), w, h)?;
        drop(frame);

        frame_count += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            display_fps = frame_count;
            frame_count = 0;
            last_fps_time = now;
        }
    }

    let teardown = sched.unmount();
    debug!(?teardown, "window closed");
    Ok(())
}
