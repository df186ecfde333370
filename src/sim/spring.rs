//! Vertical spring-mass oscillator with linear damping.
//!
//! y is the extension measured from the unstretched length (positive down),
//! so the equilibrium offset mg/k only appears in derived readings.

use serde::Serialize;

use super::{Readout, Simulation};
use crate::error::{require_finite, require_positive, SimError};
use crate::history::Timestamped;
use crate::params::{ChangePolicy, ParamDef, ParamSet};

static PARAMS: [ParamDef; 5] = [
    ParamDef::continuous("mass", "mass", "kg", 0.1, 10.0, 0.1, 1.0, ChangePolicy::Live),
    ParamDef::continuous("stiffness", "spring k", "N/m", 1.0, 100.0, 1.0, 20.0, ChangePolicy::Live),
    ParamDef::continuous("damping", "damping c", "N s/m", 0.0, 5.0, 0.05, 0.5, ChangePolicy::Live),
    ParamDef::continuous("gravity", "gravity", "m/s^2", 0.0, 25.0, 0.1, 9.81, ChangePolicy::Live),
    ParamDef::continuous("extension", "initial extension", "m", -1.0, 2.0, 0.05, 0.0, ChangePolicy::RequiresReset)
        .with_desc("release point measured from the unstretched length"),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringParams {
    pub mass: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub gravity: f64,
    pub extension0: f64,
}

impl SpringParams {
    pub fn from_set(params: &ParamSet) -> Result<Self, SimError> {
        Ok(Self {
            mass: require_positive("mass", params.get("mass")?)?,
            stiffness: require_positive("stiffness", params.get("stiffness")?)?,
            damping: params.get("damping")?,
            gravity: params.get("gravity")?,
            extension0: params.get("extension")?,
        })
    }

    /// Static extension y_eq = mg/k.
    pub fn equilibrium(&self) -> f64 {
        self.mass * self.gravity / self.stiffness
    }

    pub fn acceleration(&self, y: f64, v: f64) -> f64 {
        let force = self.mass * self.gravity - self.stiffness * y - self.damping * v;
        force / self.mass
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringState {
    pub y: f64,
    pub v: f64,
    pub t: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpringSample {
    pub t: f64,
    pub y: f64,
    pub v: f64,
    pub equilibrium: f64,
    /// y - y_eq, the quantity usually graphed.
    pub displacement: f64,
    pub kinetic: f64,
    pub spring_energy: f64,
    pub gravity_energy: f64,
}

impl Timestamped for SpringSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Readout for SpringSample {
    fn readout(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("displacement", self.displacement),
            ("y", self.y),
            ("v", self.v),
            ("ke", self.kinetic),
            ("spring_pe", self.spring_energy),
        ]
    }
}

pub struct SpringMass;

impl Simulation for SpringMass {
    type State = SpringState;
    type Sample = SpringSample;

    const NAME: &'static str = "spring";

    fn param_defs() -> &'static [ParamDef] {
        &PARAMS
    }

    fn initial_state(params: &ParamSet) -> Result<SpringState, SimError> {
        let p = SpringParams::from_set(params)?;
        Ok(SpringState { y: p.extension0, v: 0.0, t: 0.0 })
    }

    fn step(state: &SpringState, params: &ParamSet, dt: f64) -> Result<SpringState, SimError> {
        let p = SpringParams::from_set(params)?;
        let a = p.acceleration(state.y, state.v);
        let v = state.v + a * dt;
        let y = state.y + v * dt;
        let t = state.t + dt;
        Ok(SpringState {
            y: require_finite("y", y, t)?,
            v: require_finite("v", v, t)?,
            t,
        })
    }

    fn sample(state: &SpringState, params: &ParamSet) -> Result<SpringSample, SimError> {
        let p = SpringParams::from_set(params)?;
        let equilibrium = p.equilibrium();
        Ok(SpringSample {
            t: state.t,
            y: state.y,
            v: state.v,
            equilibrium,
            displacement: state.y - equilibrium,
            kinetic: 0.5 * p.mass * state.v * state.v,
            spring_energy: 0.5 * p.stiffness * state.y * state.y,
            gravity_energy: -p.mass * p.gravity * state.y,
        })
    }

    fn elapsed(state: &SpringState) -> f64 {
        state.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equilibrium_offset() {
        let params = SpringMass::default_params();
        let p = SpringParams::from_set(&params).unwrap();
        assert!((p.equilibrium() - 9.81 / 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_starts_from_unstretched() {
        let params = SpringMass::default_params();
        let s = SpringMass::initial_state(&params).unwrap();
        assert_eq!(s.y, 0.0);
        let sample = SpringMass::sample(&s, &params).unwrap();
        assert!((sample.displacement + 9.81 / 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_first_step_falls_under_gravity() {
        let params = SpringMass::default_params();
        let s0 = SpringMass::initial_state(&params).unwrap();
        let s1 = SpringMass::step(&s0, &params, 0.01).unwrap();
        // a = g at the unstretched point with zero velocity.
        assert!((s1.v - 9.81 * 0.01).abs() < 1e-12);
        assert!((s1.y - 9.81 * 0.01 * 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_damped_settles_at_equilibrium() {
        let params = SpringMass::default_params();
        let mut s = SpringMass::initial_state(&params).unwrap();
        for _ in 0..4000 {
            s = SpringMass::step(&s, &params, 0.01).unwrap();
        }
        let y_eq = 9.81 / 20.0;
        assert!((s.y - y_eq).abs() < 1e-3, "y={} y_eq={}", s.y, y_eq);
        assert!(s.v.abs() < 1e-2);
    }

    #[test]
    fn test_undamped_oscillates_about_equilibrium() {
        let mut params = SpringMass::default_params();
        params.set("damping", 0.0).unwrap();
        let mut s = SpringMass::initial_state(&params).unwrap();
        let mut max_y = f64::MIN;
        for _ in 0..2000 {
            s = SpringMass::step(&s, &params, 0.001).unwrap();
            max_y = max_y.max(s.y);
        }
        // Released from rest at the unstretched length: turning point at 2 y_eq.
        let y_eq = 9.81 / 20.0;
        assert!((max_y - 2.0 * y_eq).abs() < 0.01, "max_y={}", max_y);
    }
}
