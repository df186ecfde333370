use std::time::Instant;

use tracing::{debug, warn};

use crate::error::SimError;
use crate::history::HistoryBuffer;
use crate::params::{ParamChange, ParamSet};
use crate::sim::{Clock, Simulation};

/// Run/pause lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Scheduler tuning, usually taken from `config::SchedulerConfig`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerSettings {
    /// Upper bound on a single frame dt (s), guards against tab-switch stalls.
    pub max_dt: f64,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f64,
    pub history_capacity: usize,
    /// Wall-clock seconds between generations for `Clock::Generation` models.
    pub generation_interval: f64,
    /// Most generations run from one tick after a stall.
    pub max_catch_up: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_dt: 0.05,
            time_scale: 1.0,
            history_capacity: crate::history::DEFAULT_CAPACITY,
            generation_interval: 0.2,
            max_catch_up: 5,
        }
    }
}

/// Fixed wall-clock interval accumulator for discrete steppers that must not
/// follow the display rate.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalStepper {
    interval: f64,
    max_catch_up: usize,
    accumulator: f64,
}

impl IntervalStepper {
    pub fn new(interval: f64, max_catch_up: usize) -> Self {
        Self {
            interval: interval.max(1e-3),
            max_catch_up: max_catch_up.max(1),
            accumulator: 0.0,
        }
    }

    /// Feed elapsed wall time; returns how many steps are due.
    pub fn advance(&mut self, elapsed: f64) -> usize {
        self.accumulator += elapsed.max(0.0);
        let mut due = 0;
        while self.accumulator >= self.interval && due < self.max_catch_up {
            self.accumulator -= self.interval;
            due += 1;
        }
        if due == self.max_catch_up {
            // Drop the backlog rather than spiral after a long stall.
            self.accumulator = self.accumulator.min(self.interval);
        }
        due
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Outcome of one `tick`.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Not running, or no frame was requested.
    Skipped,
    Advanced { steps: usize, dt: f64 },
    Faulted(SimError),
}

/// Identifier returned by `add_resize_listener`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What `unmount` cleaned up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Teardown {
    pub cancelled_frame: bool,
    pub removed_listeners: usize,
}

type ResizeListener = Box<dyn FnMut(usize, usize)>;

/// Drives one model's integrator once per display refresh while running.
/// Owns the parameter set, the state vector and the history buffer.
pub struct FrameScheduler<S: Simulation> {
    params: ParamSet,
    state: S::State,
    history: HistoryBuffer<S::Sample>,
    run_state: RunState,
    pending_frame: Option<u64>,
    frame_seq: u64,
    last_tick: Option<Instant>,
    generations: IntervalStepper,
    settings: SchedulerSettings,
    last_error: Option<SimError>,
    listeners: Vec<(ListenerId, ResizeListener)>,
    next_listener: u64,
}

impl<S: Simulation> FrameScheduler<S> {
    /// Mount: build the initial state from `params`. Starts idle with empty history.
    pub fn new(params: ParamSet, settings: SchedulerSettings) -> Result<Self, SimError> {
        let state = S::initial_state(&params)?;
        debug!(model = S::NAME, "mounted");
        Ok(Self {
            params,
            state,
            history: HistoryBuffer::new(settings.history_capacity),
            run_state: RunState::Idle,
            pending_frame: None,
            frame_seq: 0,
            last_tick: None,
            generations: IntervalStepper::new(settings.generation_interval, settings.max_catch_up),
            settings,
            last_error: None,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    pub fn with_defaults() -> Result<Self, SimError> {
        Self::new(S::default_params(), SchedulerSettings::default())
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn state(&self) -> &S::State {
        &self.state
    }

    pub fn history(&self) -> &HistoryBuffer<S::Sample> {
        &self.history
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    pub fn last_error(&self) -> Option<&SimError> {
        self.last_error.as_ref()
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn elapsed(&self) -> f64 {
        S::elapsed(&self.state)
    }

    /// Current sample, computed from state without touching history.
    pub fn current_sample(&self) -> Result<S::Sample, SimError> {
        S::sample(&self.state, &self.params)
    }

    fn request_frame(&mut self) {
        self.frame_seq += 1;
        self.pending_frame = Some(self.frame_seq);
    }

    fn cancel_frame(&mut self) -> bool {
        self.pending_frame.take().is_some()
    }

    /// Idle or Paused -> Running. The first tick after starting measures zero
    /// elapsed time.
    pub fn start(&mut self) {
        if self.run_state == RunState::Running {
            return;
        }
        self.run_state = RunState::Running;
        self.last_tick = None;
        self.last_error = None;
        self.request_frame();
    }

    /// Running -> Paused; state and history are left untouched.
    pub fn pause(&mut self) {
        if self.run_state == RunState::Running {
            self.run_state = RunState::Paused;
            self.cancel_frame();
        }
    }

    pub fn resume(&mut self) {
        if self.run_state == RunState::Paused {
            self.start();
        }
    }

    pub fn toggle(&mut self) {
        match self.run_state {
            RunState::Running => self.pause(),
            RunState::Idle | RunState::Paused => self.start(),
        }
    }

    /// Cancel the pending frame, rebuild state from the current parameters,
    /// clear history. Does not resume.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.cancel_frame();
        self.run_state = RunState::Idle;
        self.last_tick = None;
        self.generations.reset();
        self.history.clear();
        self.state = S::initial_state(&self.params)?;
        self.last_error = None;
        debug!(model = S::NAME, "reset");
        Ok(())
    }

    /// Store a parameter; resets the run if the parameter declares it.
    pub fn set_param(&mut self, name: &str, value: f64) -> Result<ParamChange, SimError> {
        let change = self.params.set(name, value)?;
        if change.needs_reset() {
            self.reset()?;
        }
        Ok(change)
    }

    pub fn nudge_param(&mut self, name: &str, steps: i32) -> Result<ParamChange, SimError> {
        let change = self.params.nudge(name, steps)?;
        if change.needs_reset() {
            self.reset()?;
        }
        Ok(change)
    }

    pub fn set_choice(&mut self, name: &str, option: &str) -> Result<ParamChange, SimError> {
        let change = self.params.set_choice(name, option)?;
        if change.needs_reset() {
            self.reset()?;
        }
        Ok(change)
    }

    /// Replace the state with the result of `f`, e.g. to start a process or
    /// snap into a demo configuration. History is kept.
    pub fn snap_state<F>(&mut self, f: F) -> Result<(), SimError>
    where
        F: FnOnce(&S::State, &ParamSet) -> Result<S::State, SimError>,
    {
        self.state = f(&self.state, &self.params)?;
        Ok(())
    }

    /// Frame callback. Measures wall time since the previous tick, scales it,
    /// clamps the scaled dt to `max_dt` and steps the model. Only acts while running with a frame requested.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.run_state != RunState::Running || self.pending_frame.take().is_none() {
            return TickOutcome::Skipped;
        }
        let elapsed = self
            .last_tick
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        let (steps, dt) = match S::CLOCK {
            Clock::Frame => {
                let dt = (elapsed * self.settings.time_scale).min(self.settings.max_dt);
                (usize::from(dt > 0.0), dt)
            }
            Clock::Generation => (self.generations.advance(elapsed * self.settings.time_scale), 1.0),
        };
        for _ in 0..steps {
            if let Err(e) = self.step_once(dt) {
                return TickOutcome::Faulted(e);
            }
        }
        self.request_frame();
        TickOutcome::Advanced { steps, dt }
    }

    /// Step once with an explicit dt, bypassing the wall clock. Used by
    /// headless drivers; dt is still clamped to `max_dt` for frame models.
    pub fn advance(&mut self, dt: f64) -> Result<(), SimError> {
        let dt = match S::CLOCK {
            Clock::Frame => dt.clamp(0.0, self.settings.max_dt),
            Clock::Generation => 1.0,
        };
        self.step_once(dt)
    }

    fn step_once(&mut self, dt: f64) -> Result<(), SimError> {
        let result = S::step(&self.state, &self.params, dt)
            .and_then(|next| S::sample(&next, &self.params).map(|sample| (next, sample)));
        match result {
            Ok((next, sample)) => {
                self.state = next;
                self.history.push(sample);
                Ok(())
            }
            Err(e) => {
                warn!(model = S::NAME, error = %e, "step failed; pausing");
                self.run_state = RunState::Paused;
                self.cancel_frame();
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn add_resize_listener<F>(&mut self, f: F) -> ListenerId
    where
        F: FnMut(usize, usize) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(f)));
        id
    }

    pub fn remove_resize_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Forward a drawing-surface resize. Never touches simulation state.
    pub fn notify_resize(&mut self, width: usize, height: usize) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(width, height);
        }
    }

    /// Tear down: cancel the pending frame and drop every listener.
    pub fn unmount(mut self) -> Teardown {
        let cancelled_frame = self.cancel_frame();
        let removed_listeners = self.listeners.len();
        self.listeners.clear();
        debug!(model = S::NAME, removed_listeners, "unmounted");
        Teardown { cancelled_frame, removed_listeners }
    }
}
