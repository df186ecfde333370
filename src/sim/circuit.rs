//! RL and LC circuits. Both are closed-form: the reading at time t is the
//! analytic solution evaluated at the cumulative elapsed time, so stepping
//! only advances the clock and never accumulates integration error.

use std::f64::consts::PI;

use serde::Serialize;

use super::{Readout, Simulation};
use crate::error::{require_positive, SimError};
use crate::history::Timestamped;
use crate::params::{ChangePolicy, ParamDef, ParamSet};

/// Clock-only state shared by the closed-form circuits.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CircuitState {
    pub t: f64,
}

fn advance(state: &CircuitState, dt: f64) -> CircuitState {
    CircuitState { t: state.t + dt.max(0.0) }
}

// --- RL ---

pub const RL_MODES: &[&str] = &["charging", "discharging"];

static RL_PARAMS: [ParamDef; 4] = [
    ParamDef::continuous("voltage", "source", "V", 1.0, 24.0, 0.5, 12.0, ChangePolicy::Live),
    ParamDef::stepped("resistance", "resistance", "ohm", 1.0, 1000.0, 1.0, 100.0, ChangePolicy::RequiresReset),
    ParamDef::continuous("inductance", "inductance", "H", 0.01, 2.0, 0.01, 0.5, ChangePolicy::RequiresReset),
    ParamDef::choice("mode", "switch", RL_MODES, 0, ChangePolicy::RequiresReset)
        .with_desc("charging: source connected at t=0; discharging: source removed at t=0"),
];

/// Time constant tau = L/R.
pub fn rl_tau(resistance: f64, inductance: f64) -> Result<f64, SimError> {
    let r = require_positive("resistance", resistance)?;
    let l = require_positive("inductance", inductance)?;
    Ok(l / r)
}

/// Charging current I(t) = (V/R)(1 - e^(-t/tau)).
pub fn rl_current(voltage: f64, resistance: f64, inductance: f64, t: f64) -> Result<f64, SimError> {
    let tau = rl_tau(resistance, inductance)?;
    Ok(voltage / resistance * (1.0 - (-t / tau).exp()))
}

/// Decay current I(t) = (V/R) e^(-t/tau) after the source is removed.
pub fn rl_decay_current(voltage: f64, resistance: f64, inductance: f64, t: f64) -> Result<f64, SimError> {
    let tau = rl_tau(resistance, inductance)?;
    Ok(voltage / resistance * (-t / tau).exp())
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RlSample {
    pub t: f64,
    pub current: f64,
    pub tau: f64,
    pub final_current: f64,
    pub v_resistor: f64,
    pub v_inductor: f64,
    /// Current as a percentage of V/R.
    pub percent: f64,
}

impl Timestamped for RlSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Readout for RlSample {
    fn readout(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("current", self.current),
            ("v_r", self.v_resistor),
            ("v_l", self.v_inductor),
            ("percent", self.percent),
            ("tau", self.tau),
        ]
    }
}

pub struct RlCircuit;

impl Simulation for RlCircuit {
    type State = CircuitState;
    type Sample = RlSample;

    const NAME: &'static str = "rl";

    fn param_defs() -> &'static [ParamDef] {
        &RL_PARAMS
    }

    fn initial_state(params: &ParamSet) -> Result<CircuitState, SimError> {
        rl_tau(params.get("resistance")?, params.get("inductance")?)?;
        Ok(CircuitState::default())
    }

    fn step(state: &CircuitState, params: &ParamSet, dt: f64) -> Result<CircuitState, SimError> {
        rl_tau(params.get("resistance")?, params.get("inductance")?)?;
        Ok(advance(state, dt))
    }

    fn sample(state: &CircuitState, params: &ParamSet) -> Result<RlSample, SimError> {
        let v = params.get("voltage")?;
        let r = params.get("resistance")?;
        let l = params.get("inductance")?;
        let tau = rl_tau(r, l)?;
        let (current, v_inductor) = match params.choice("mode")? {
            "discharging" => {
                let i = rl_decay_current(v, r, l, state.t)?;
                (i, -i * r)
            }
            _ => {
                let i = rl_current(v, r, l, state.t)?;
                (i, v - i * r)
            }
        };
        let final_current = v / r;
        Ok(RlSample {
            t: state.t,
            current,
            tau,
            final_current,
            v_resistor: current * r,
            v_inductor,
            percent: 100.0 * current / final_current,
        })
    }

    fn elapsed(state: &CircuitState) -> f64 {
        state.t
    }
}

// --- LC ---

static LC_PARAMS: [ParamDef; 3] = [
    ParamDef::continuous("inductance", "inductance", "H", 0.01, 2.0, 0.01, 0.5, ChangePolicy::RequiresReset),
    ParamDef::stepped("capacitance", "capacitance", "uF", 1.0, 1000.0, 1.0, 100.0, ChangePolicy::RequiresReset),
    ParamDef::continuous("charge", "initial charge", "mC", 0.1, 10.0, 0.1, 1.0, ChangePolicy::RequiresReset),
];

/// Angular frequency w = 1/sqrt(LC), in SI units.
pub fn lc_omega(inductance: f64, capacitance: f64) -> Result<f64, SimError> {
    let l = require_positive("inductance", inductance)?;
    let c = require_positive("capacitance", capacitance)?;
    Ok(1.0 / (l * c).sqrt())
}

/// Period 2*pi*sqrt(LC).
pub fn lc_period(inductance: f64, capacitance: f64) -> Result<f64, SimError> {
    Ok(2.0 * PI / lc_omega(inductance, capacitance)?)
}

/// Charge and current at time t: q = Q0 cos(wt), I = Q0 w sin(wt).
pub fn lc_solution(q0: f64, inductance: f64, capacitance: f64, t: f64) -> Result<(f64, f64), SimError> {
    let w = lc_omega(inductance, capacitance)?;
    Ok((q0 * (w * t).cos(), q0 * w * (w * t).sin()))
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LcSample {
    pub t: f64,
    pub charge: f64,
    pub current: f64,
    pub omega: f64,
    pub period: f64,
    pub frequency: f64,
    pub electric_energy: f64,
    pub magnetic_energy: f64,
}

impl Timestamped for LcSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Readout for LcSample {
    fn readout(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("current", self.current),
            ("charge", self.charge),
            ("u_e", self.electric_energy),
            ("u_b", self.magnetic_energy),
            ("period", self.period),
        ]
    }
}

/// SI values (H, F, C) from the LC parameter set.
fn lc_si(params: &ParamSet) -> Result<(f64, f64, f64), SimError> {
    Ok((
        params.get("inductance")?,
        params.get("capacitance")? * 1e-6,
        params.get("charge")? * 1e-3,
    ))
}

pub struct LcCircuit;

impl Simulation for LcCircuit {
    type State = CircuitState;
    type Sample = LcSample;

    const NAME: &'static str = "lc";

    fn param_defs() -> &'static [ParamDef] {
        &LC_PARAMS
    }

    fn initial_state(params: &ParamSet) -> Result<CircuitState, SimError> {
        let (l, c, _) = lc_si(params)?;
        lc_omega(l, c)?;
        Ok(CircuitState::default())
    }

    fn step(state: &CircuitState, params: &ParamSet, dt: f64) -> Result<CircuitState, SimError> {
        let (l, c, _) = lc_si(params)?;
        lc_omega(l, c)?;
        Ok(advance(state, dt))
    }

    fn sample(state: &CircuitState, params: &ParamSet) -> Result<LcSample, SimError> {
        let (l, c, q0) = lc_si(params)?;
        let omega = lc_omega(l, c)?;
        let (charge, current) = lc_solution(q0, l, c, state.t)?;
        let period = 2.0 * PI / omega;
        Ok(LcSample {
            t: state.t,
            charge,
            current,
            omega,
            period,
            frequency: 1.0 / period,
            electric_energy: charge * charge / (2.0 * c),
            magnetic_energy: 0.5 * l * current * current,
        })
    }

    fn elapsed(state: &CircuitState) -> f64 {
        state.t
    }
}
