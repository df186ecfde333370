//! Ideal-gas PV diagram. The state is a single (P, V) point; a process moves
//! it toward a target over a fixed duration, sampled once per frame, and each
//! sample is appended to the path. Net work is the signed trapezoid area of
//! the path, accumulated as points arrive so it survives path eviction.

use serde::Serialize;

use super::{Readout, Simulation};
use crate::error::{require_finite, require_positive, SimError};
use crate::history::{HistoryBuffer, Timestamped};
use crate::params::{ChangePolicy, ParamDef, ParamSet};

/// Universal gas constant, J/(mol K).
pub const GAS_CONSTANT: f64 = 8.314;

/// Most path points kept for drawing; older points are evicted.
pub const PATH_CAPACITY: usize = 1000;

static PARAMS: [ParamDef; 5] = [
    ParamDef::continuous("moles", "moles", "mol", 0.1, 5.0, 0.1, 1.0, ChangePolicy::RequiresReset),
    ParamDef::continuous("pressure", "initial pressure", "kPa", 10.0, 500.0, 1.0, 100.0, ChangePolicy::RequiresReset),
    ParamDef::continuous("volume", "initial volume", "L", 1.0, 100.0, 0.5, 24.94, ChangePolicy::RequiresReset),
    ParamDef::continuous("duration", "process time", "s", 0.25, 10.0, 0.25, 2.0, ChangePolicy::Live),
    ParamDef::continuous("gamma", "heat capacity ratio", "", 1.1, 1.67, 0.01, 1.4, ChangePolicy::Live),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ProcessKind {
    Isobaric,
    Isochoric,
    Isothermal,
    Adiabatic,
}

/// Where a process should end. Each kind is driven by one free variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProcessTarget {
    /// Constant P, move V (m^3).
    Isobaric { volume: f64 },
    /// Constant V, move P (Pa).
    Isochoric { pressure: f64 },
    /// PV = const, move V (m^3).
    Isothermal { volume: f64 },
    /// PV^gamma = const, move V (m^3).
    Adiabatic { volume: f64 },
}

impl ProcessTarget {
    pub fn kind(&self) -> ProcessKind {
        match self {
            ProcessTarget::Isobaric { .. } => ProcessKind::Isobaric,
            ProcessTarget::Isochoric { .. } => ProcessKind::Isochoric,
            ProcessTarget::Isothermal { .. } => ProcessKind::Isothermal,
            ProcessTarget::Adiabatic { .. } => ProcessKind::Adiabatic,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PvPoint {
    pub p: f64,
    pub v: f64,
}

/// A process in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveProcess {
    pub kind: ProcessKind,
    pub from: PvPoint,
    pub to: PvPoint,
    pub gamma: f64,
    pub elapsed: f64,
    pub duration: f64,
}

impl ActiveProcess {
    /// Point at fraction `f` in [0, 1] of the process.
    pub fn point_at(&self, f: f64) -> PvPoint {
        let f = f.clamp(0.0, 1.0);
        let lerp = |a: f64, b: f64| a + (b - a) * f;
        match self.kind {
            ProcessKind::Isobaric => PvPoint { p: self.from.p, v: lerp(self.from.v, self.to.v) },
            ProcessKind::Isochoric => PvPoint { p: lerp(self.from.p, self.to.p), v: self.from.v },
            ProcessKind::Isothermal => {
                let v = lerp(self.from.v, self.to.v);
                PvPoint { p: self.from.p * self.from.v / v, v }
            }
            ProcessKind::Adiabatic => {
                let v = lerp(self.from.v, self.to.v);
                PvPoint { p: self.from.p * (self.from.v / v).powf(self.gamma), v }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThermoState {
    pub point: PvPoint,
    pub moles: f64,
    pub t: f64,
    pub process: Option<ActiveProcess>,
    pub path: HistoryBuffer<PvPoint>,
    /// Work along every point recorded since the last clear, evicted ones included.
    pub work: f64,
}

impl ThermoState {
    pub fn temperature(&self) -> f64 {
        self.point.p * self.point.v / (self.moles * GAS_CONSTANT)
    }

    pub fn is_busy(&self) -> bool {
        self.process.is_some()
    }

    /// Work done by the gas since the path was last cleared.
    pub fn net_work(&self) -> f64 {
        self.work
    }

    fn record(&mut self, point: PvPoint) {
        if let Some(&last) = self.path.latest() {
            self.work += segment_work(last, point);
        }
        self.path.push(point);
    }
}

fn fresh_path(point: PvPoint) -> HistoryBuffer<PvPoint> {
    let mut path = HistoryBuffer::new(PATH_CAPACITY);
    path.push(point);
    path
}

fn segment_work(a: PvPoint, b: PvPoint) -> f64 {
    (b.v - a.v) * (a.p + b.p) * 0.5
}

/// Signed trapezoid-rule area under the path, taken in path order:
/// sum of (V[i+1] - V[i]) * (P[i] + P[i+1]) / 2. Expansion is positive; a
/// clockwise closed cycle yields its enclosed area.
pub fn net_work(path: &[PvPoint]) -> f64 {
    path.windows(2).map(|w| segment_work(w[0], w[1])).sum()
}

/// Start a process from the current point. The path keeps accumulating
/// across processes so a full cycle can be measured; `clear_path` starts over.
pub fn begin_process(
    state: &ThermoState,
    params: &ParamSet,
    target: ProcessTarget,
) -> Result<ThermoState, SimError> {
    let duration = require_positive("duration", params.get("duration")?)?;
    let gamma = params.get("gamma")?;
    let from = state.point;
    let to = match target {
        ProcessTarget::Isobaric { volume } => PvPoint { p: from.p, v: require_positive("volume", volume)? },
        ProcessTarget::Isochoric { pressure } => PvPoint { p: require_positive("pressure", pressure)?, v: from.v },
        ProcessTarget::Isothermal { volume } => {
            let v = require_positive("volume", volume)?;
            PvPoint { p: from.p * from.v / v, v }
        }
        ProcessTarget::Adiabatic { volume } => {
            let v = require_positive("volume", volume)?;
            PvPoint { p: from.p * (from.v / v).powf(gamma), v }
        }
    };
    let mut next = state.clone();
    next.process = Some(ActiveProcess {
        kind: target.kind(),
        from,
        to,
        gamma,
        elapsed: 0.0,
        duration,
    });
    if next.path.latest() != Some(&from) {
        next.record(from);
    }
    Ok(next)
}

/// Drop the recorded path, keeping only the current point.
pub fn clear_path(state: &ThermoState) -> ThermoState {
    let mut next = state.clone();
    next.path = fresh_path(state.point);
    next.work = 0.0;
    next
}

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs())
}

/// Next leg of the demo rectangle (P0,V0) -> (P0,2V0) -> (P0/2,2V0) ->
/// (P0/2,V0) -> (P0,V0), with corners taken from the initial parameters.
/// `None` while a process runs or when the point is off the rectangle.
pub fn cycle_leg(state: &ThermoState, params: &ParamSet) -> Result<Option<ProcessTarget>, SimError> {
    if state.is_busy() {
        return Ok(None);
    }
    let p0 = params.get("pressure")? * 1e3;
    let v0 = params.get("volume")? * 1e-3;
    let PvPoint { p, v } = state.point;
    let leg = if near(p, p0) && near(v, v0) {
        Some(ProcessTarget::Isobaric { volume: 2.0 * v0 })
    } else if near(p, p0) && near(v, 2.0 * v0) {
        Some(ProcessTarget::Isochoric { pressure: 0.5 * p0 })
    } else if near(p, 0.5 * p0) && near(v, 2.0 * v0) {
        Some(ProcessTarget::Isobaric { volume: v0 })
    } else if near(p, 0.5 * p0) && near(v, v0) {
        Some(ProcessTarget::Isochoric { pressure: p0 })
    } else {
        None
    };
    Ok(leg)
}

/// Process started by a digit key: odd digits grow the free variable by
/// half, even digits shrink it by a third. 1-2 isobaric, 3-4 isochoric,
/// 5-6 isothermal, 7-8 adiabatic.
pub fn key_target(digit: u8, from: PvPoint) -> Option<ProcessTarget> {
    let up = 1.5;
    let down = 1.0 / 1.5;
    let target = match digit {
        1 => ProcessTarget::Isobaric { volume: from.v * up },
        2 => ProcessTarget::Isobaric { volume: from.v * down },
        3 => ProcessTarget::Isochoric { pressure: from.p * up },
        4 => ProcessTarget::Isochoric { pressure: from.p * down },
        5 => ProcessTarget::Isothermal { volume: from.v * up },
        6 => ProcessTarget::Isothermal { volume: from.v * down },
        7 => ProcessTarget::Adiabatic { volume: from.v * up },
        8 => ProcessTarget::Adiabatic { volume: from.v * down },
        _ => return None,
    };
    Some(target)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ThermoSample {
    pub t: f64,
    pub p: f64,
    pub v: f64,
    pub temperature: f64,
    pub work: f64,
    pub internal_energy: f64,
    pub process: Option<ProcessKind>,
}

impl Timestamped for ThermoSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Readout for ThermoSample {
    fn readout(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("p_kpa", self.p / 1e3),
            ("v_l", self.v * 1e3),
            ("temperature", self.temperature),
            ("work", self.work),
            ("internal_energy", self.internal_energy),
        ]
    }
}

pub struct PvCycle;

impl Simulation for PvCycle {
    type State = ThermoState;
    type Sample = ThermoSample;

    const NAME: &'static str = "pv";

    fn param_defs() -> &'static [ParamDef] {
        &PARAMS
    }

    fn initial_state(params: &ParamSet) -> Result<ThermoState, SimError> {
        let moles = require_positive("moles", params.get("moles")?)?;
        let point = PvPoint {
            p: require_positive("pressure", params.get("pressure")?)? * 1e3,
            v: require_positive("volume", params.get("volume")?)? * 1e-3,
        };
        Ok(ThermoState {
            point,
            moles,
            t: 0.0,
            process: None,
            path: fresh_path(point),
            work: 0.0,
        })
    }

    fn step(state: &ThermoState, _params: &ParamSet, dt: f64) -> Result<ThermoState, SimError> {
        let mut next = state.clone();
        next.t = state.t + dt;
        if let Some(mut process) = state.process {
            process.elapsed += dt;
            let f = process.elapsed / process.duration;
            let point = process.point_at(f);
            require_finite("pressure", point.p, next.t)?;
            require_finite("volume", point.v, next.t)?;
            next.point = point;
            next.record(point);
            next.process = if f >= 1.0 { None } else { Some(process) };
        }
        Ok(next)
    }

    fn sample(state: &ThermoState, params: &ParamSet) -> Result<ThermoSample, SimError> {
        let gamma = params.get("gamma")?;
        let temperature = state.temperature();
        Ok(ThermoSample {
            t: state.t,
            p: state.point.p,
            v: state.point.v,
            temperature,
            work: state.net_work(),
            internal_energy: state.moles * GAS_CONSTANT * temperature / (gamma - 1.0),
            process: state.process.map(|p| p.kind),
        })
    }

    fn elapsed(state: &ThermoState) -> f64 {
        state.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_DT: f64 = 1.0 / 60.0;

    fn run_to_completion(mut state: ThermoState, params: &ParamSet) -> ThermoState {
        let mut guard = 0;
        while state.is_busy() {
            state = PvCycle::step(&state, params, FRAME_DT).unwrap();
            guard += 1;
            assert!(guard < 10_000, "process never finished");
        }
        state
    }

    #[test]
    fn test_initial_temperature() {
        let params = PvCycle::default_params();
        let s = PvCycle::initial_state(&params).unwrap();
        // 100 kPa * 24.94 L / (1 mol * 8.314) ~ 300 K
        assert!((s.temperature() - 300.0).abs() < 0.1, "T={}", s.temperature());
        assert_eq!(s.path.len(), 1);
    }

    #[test]
    fn test_isobaric_work() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let v1 = 2.0 * s0.point.v;
        let s = begin_process(&s0, &params, ProcessTarget::Isobaric { volume: v1 }).unwrap();
        let s = run_to_completion(s, &params);
        let expected = s0.point.p * (v1 - s0.point.v);
        assert!((s.net_work() - expected).abs() / expected < 1e-9);
        assert!((s.point.v - v1).abs() < 1e-12);
        assert_eq!(s.point.p, s0.point.p);
    }

    #[test]
    fn test_isothermal_work_matches_log() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let t0 = s0.temperature();
        let v1 = 2.0 * s0.point.v;
        let s = begin_process(&s0, &params, ProcessTarget::Isothermal { volume: v1 }).unwrap();
        let s = run_to_completion(s, &params);
        let expected = s0.moles * GAS_CONSTANT * t0 * 2.0_f64.ln();
        let rel = (s.net_work() - expected).abs() / expected;
        assert!(rel < 1e-3, "work={} expected={}", s.net_work(), expected);
        assert!((s.temperature() - t0).abs() < 1e-9);
    }

    #[test]
    fn test_isochoric_does_no_work() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let s = begin_process(&s0, &params, ProcessTarget::Isochoric { pressure: 2.0 * s0.point.p }).unwrap();
        let s = run_to_completion(s, &params);
        assert_eq!(s.net_work(), 0.0);
        assert!(s.temperature() > s0.temperature());
    }

    #[test]
    fn test_adiabatic_endpoint() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let v1 = 1.5 * s0.point.v;
        let s = begin_process(&s0, &params, ProcessTarget::Adiabatic { volume: v1 }).unwrap();
        let s = run_to_completion(s, &params);
        let lhs = s.point.p * s.point.v.powf(1.4);
        let rhs = s0.point.p * s0.point.v.powf(1.4);
        assert!((lhs - rhs).abs() / rhs < 1e-9);
        assert!(s.temperature() < s0.temperature(), "adiabatic expansion cools");
    }

    #[test]
    fn test_rectangular_cycle_work_is_enclosed_area() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let (p0, v0) = (s0.point.p, s0.point.v);
        let (p1, v1) = (2.0 * p0, 2.0 * v0);
        let mut s = s0;
        for target in [
            ProcessTarget::Isochoric { pressure: p1 },
            ProcessTarget::Isobaric { volume: v1 },
            ProcessTarget::Isochoric { pressure: p0 },
            ProcessTarget::Isobaric { volume: v0 },
        ] {
            s = begin_process(&s, &params, target).unwrap();
            s = run_to_completion(s, &params);
        }
        let area = (p1 - p0) * (v1 - v0);
        assert!((s.net_work() - area).abs() / area < 1e-9, "work={} area={}", s.net_work(), area);
        let cleared = clear_path(&s);
        assert_eq!(cleared.net_work(), 0.0);
    }

    #[test]
    fn test_step_without_process_only_advances_clock() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let s1 = PvCycle::step(&s0, &params, FRAME_DT).unwrap();
        assert_eq!(s1.point, s0.point);
        assert_eq!(s1.path.len(), 1);
        assert!(s1.t > s0.t);
    }

    #[test]
    fn test_cycle_legs_close_the_rectangle() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let mut s = s0.clone();
        for _ in 0..4 {
            let leg = cycle_leg(&s, &params).unwrap().expect("on the rectangle");
            s = begin_process(&s, &params, leg).unwrap();
            assert_eq!(cycle_leg(&s, &params).unwrap(), None, "busy while running");
            s = run_to_completion(s, &params);
        }
        // Clockwise: expand at P0, compress at P0/2.
        let area = 0.5 * s0.point.p * s0.point.v;
        assert!((s.net_work() - area).abs() / area < 1e-6, "work={} area={}", s.net_work(), area);
        assert!(near(s.point.p, s0.point.p) && near(s.point.v, s0.point.v));
    }

    #[test]
    fn test_path_stays_bounded_over_many_cycles() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let area = 0.5 * s0.point.p * s0.point.v;
        let mut s = s0;
        let cycles = 12;
        for _ in 0..cycles * 4 {
            let leg = cycle_leg(&s, &params).unwrap().expect("on the rectangle");
            s = begin_process(&s, &params, leg).unwrap();
            s = run_to_completion(s, &params);
            assert!(s.path.len() <= PATH_CAPACITY);
        }
        assert!(s.path.is_full(), "12 cycles at 60 fps overflow the path");
        let expected = cycles as f64 * area;
        assert!((s.net_work() - expected).abs() / expected < 1e-6, "work={} expected={}", s.net_work(), expected);
    }

    #[test]
    fn test_accumulated_work_matches_path_area() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let s = begin_process(&s0, &params, ProcessTarget::Isothermal { volume: 1.7 * s0.point.v }).unwrap();
        let s = run_to_completion(s, &params);
        let from_path = net_work(&s.path.to_vec());
        assert!((s.net_work() - from_path).abs() <= 1e-9 * from_path.abs());
    }

    #[test]
    fn test_key_targets() {
        let from = PvPoint { p: 1e5, v: 0.02 };
        assert_eq!(key_target(1, from).map(|t| t.kind()), Some(ProcessKind::Isobaric));
        assert_eq!(key_target(8, from).map(|t| t.kind()), Some(ProcessKind::Adiabatic));
        assert_eq!(key_target(9, from), None);
        match key_target(4, from) {
            Some(ProcessTarget::Isochoric { pressure }) => assert!(pressure < from.p),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_target_rejected() {
        let params = PvCycle::default_params();
        let s0 = PvCycle::initial_state(&params).unwrap();
        let err = begin_process(&s0, &params, ProcessTarget::Isothermal { volume: 0.0 }).unwrap_err();
        assert!(matches!(err, SimError::Degenerate { param: "volume", .. }));
    }
}
