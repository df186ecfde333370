//! Simple and physical (rod) pendulum, integrated with semi-implicit Euler.
//!
//! alpha = -(g/L) sin(theta) for a point bob, -(3g/2L) sin(theta) for a
//! uniform rod pivoted at one end. The small-angle model replaces sin(theta)
//! with theta. Energies are always recomputed from (theta, omega), never
//! integrated alongside them.

use serde::Serialize;

use super::{Readout, Simulation};
use crate::error::{require_finite, require_positive, SimError};
use crate::history::Timestamped;
use crate::params::{ChangePolicy, ParamDef, ParamSet};

pub const KINDS: &[&str] = &["simple", "physical"];

static PARAMS: [ParamDef; 7] = [
    ParamDef::continuous("length", "length", "m", 0.2, 5.0, 0.1, 1.5, ChangePolicy::Live),
    ParamDef::continuous("gravity", "gravity", "m/s^2", 1.0, 25.0, 0.1, 9.81, ChangePolicy::Live),
    ParamDef::stepped("angle", "initial angle", "deg", -170.0, 170.0, 1.0, 45.0, ChangePolicy::RequiresReset)
        .with_desc("release angle from vertical"),
    ParamDef::continuous("damping", "damping", "", 0.9, 1.0, 0.001, 0.999, ChangePolicy::Live)
        .with_desc("velocity retained per frame"),
    ParamDef::stepped("substeps", "substeps", "", 1.0, 16.0, 1.0, 4.0, ChangePolicy::Live),
    ParamDef::choice("kind", "pendulum", KINDS, 0, ChangePolicy::RequiresReset),
    ParamDef::flag("large_angle", "large angle", true, ChangePolicy::Live)
        .with_desc("use sin(theta) instead of theta"),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PendulumKind {
    Simple,
    Physical,
}

/// Typed view of the pendulum parameter set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendulumParams {
    pub length: f64,
    pub gravity: f64,
    pub angle0: f64,
    pub damping: f64,
    pub substeps: usize,
    pub kind: PendulumKind,
    pub large_angle: bool,
}

impl PendulumParams {
    pub fn from_set(params: &ParamSet) -> Result<Self, SimError> {
        let kind = match params.choice("kind")? {
            "physical" => PendulumKind::Physical,
            _ => PendulumKind::Simple,
        };
        Ok(Self {
            length: require_positive("length", params.get("length")?)?,
            gravity: params.get("gravity")?,
            angle0: params.get("angle")?.to_radians(),
            damping: params.get("damping")?,
            substeps: params.get("substeps")?.round().max(1.0) as usize,
            kind,
            large_angle: params.flag("large_angle")?,
        })
    }

    /// g/L for a point bob, 3g/2L for a rod.
    pub fn stiffness(&self) -> f64 {
        match self.kind {
            PendulumKind::Simple => self.gravity / self.length,
            PendulumKind::Physical => 1.5 * self.gravity / self.length,
        }
    }

    pub fn angular_accel(&self, theta: f64) -> f64 {
        let restoring = if self.large_angle { theta.sin() } else { theta };
        -self.stiffness() * restoring
    }

    /// Small-amplitude period 2*pi/sqrt(stiffness).
    pub fn small_angle_period(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.stiffness().sqrt()
    }

    /// Kinetic and potential energy per unit mass.
    pub fn energy(&self, theta: f64, omega: f64) -> (f64, f64) {
        let l = self.length;
        let g = self.gravity;
        match self.kind {
            PendulumKind::Simple => (0.5 * (l * omega).powi(2), g * l * (1.0 - theta.cos())),
            // Rod: I = L^2/3 per unit mass, centre of mass at L/2.
            PendulumKind::Physical => ((l * omega).powi(2) / 6.0, g * 0.5 * l * (1.0 - theta.cos())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendulumState {
    pub theta: f64,
    pub omega: f64,
    pub t: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PendulumSample {
    pub t: f64,
    pub theta: f64,
    pub theta_deg: f64,
    pub omega: f64,
    pub x: f64,
    pub y: f64,
    pub kinetic: f64,
    pub potential: f64,
    pub total: f64,
}

impl Timestamped for PendulumSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Readout for PendulumSample {
    fn readout(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("angle_deg", self.theta_deg),
            ("omega", self.omega),
            ("ke", self.kinetic),
            ("pe", self.potential),
            ("energy", self.total),
        ]
    }
}

/// Advance (theta, omega) by `dt` using `substeps` semi-implicit Euler
/// substeps. Each substep scales omega by damping^(1/substeps).
pub fn integrate(p: &PendulumParams, theta: f64, omega: f64, dt: f64) -> (f64, f64) {
    let n = p.substeps.max(1);
    let h = dt / n as f64;
    let retain = p.damping.powf(1.0 / n as f64);
    let (mut theta, mut omega) = (theta, omega);
    for _ in 0..n {
        omega += p.angular_accel(theta) * h;
        omega *= retain;
        theta += omega * h;
    }
    (theta, omega)
}

pub struct Pendulum;

impl Simulation for Pendulum {
    type State = PendulumState;
    type Sample = PendulumSample;

    const NAME: &'static str = "pendulum";

    fn param_defs() -> &'static [ParamDef] {
        &PARAMS
    }

    fn initial_state(params: &ParamSet) -> Result<PendulumState, SimError> {
        let p = PendulumParams::from_set(params)?;
        Ok(PendulumState { theta: p.angle0, omega: 0.0, t: 0.0 })
    }

    fn step(state: &PendulumState, params: &ParamSet, dt: f64) -> Result<PendulumState, SimError> {
        let p = PendulumParams::from_set(params)?;
        let (theta, omega) = integrate(&p, state.theta, state.omega, dt);
        let t = state.t + dt;
        Ok(PendulumState {
            theta: require_finite("theta", theta, t)?,
            omega: require_finite("omega", omega, t)?,
            t,
        })
    }

    fn sample(state: &PendulumState, params: &ParamSet) -> Result<PendulumSample, SimError> {
        let p = PendulumParams::from_set(params)?;
        let (kinetic, potential) = p.energy(state.theta, state.omega);
        Ok(PendulumSample {
            t: state.t,
            theta: state.theta,
            theta_deg: state.theta.to_degrees(),
            omega: state.omega,
            x: p.length * state.theta.sin(),
            y: p.length * state.theta.cos(),
            kinetic,
            potential,
            total: kinetic + potential,
        })
    }

    fn elapsed(state: &PendulumState) -> f64 {
        state.t
    }
}
