pub mod circuit;
pub mod pendulum;
pub mod selection;
pub mod spring;
pub mod thermo;

use serde::Serialize;

use crate::error::SimError;
use crate::history::Timestamped;
use crate::params::{ParamDef, ParamSet};

pub use circuit::{LcCircuit, RlCircuit};
pub use pendulum::Pendulum;
pub use selection::Selection;
pub use spring::SpringMass;
pub use thermo::PvCycle;

/// What drives a model's step function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clock {
    /// One step per display refresh with the measured, clamped dt.
    Frame,
    /// One discrete step per fixed wall-clock interval; dt is ignored.
    Generation,
}

/// Named scalars exposed for display and plotting. The first entry is the
/// primary plotted series.
pub trait Readout {
    fn readout(&self) -> Vec<(&'static str, f64)>;
}

/// A model: parameter table, initial state, pure step function and a derived
/// sample for the history buffer.
pub trait Simulation {
    type State: Clone + std::fmt::Debug;
    type Sample: Clone + std::fmt::Debug + Timestamped + Readout + Serialize;

    const NAME: &'static str;
    const CLOCK: Clock = Clock::Frame;

    fn param_defs() -> &'static [ParamDef];

    fn initial_state(params: &ParamSet) -> Result<Self::State, SimError>;

    /// Advance by `dt` seconds (or one generation). Never mutates its inputs.
    fn step(state: &Self::State, params: &ParamSet, dt: f64) -> Result<Self::State, SimError>;

    fn sample(state: &Self::State, params: &ParamSet) -> Result<Self::Sample, SimError>;

    /// Elapsed simulated time of a state.
    fn elapsed(state: &Self::State) -> f64;

    fn default_params() -> ParamSet {
        ParamSet::new(Self::param_defs())
    }
}

/// Model selector used by the CLI and config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Pendulum,
    Rl,
    Lc,
    Spring,
    Pv,
    Selection,
}

impl Default for ModelKind {
    fn default() -> Self {
        Self::Pendulum
    }
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Pendulum => Pendulum::NAME,
            ModelKind::Rl => RlCircuit::NAME,
            ModelKind::Lc => LcCircuit::NAME,
            ModelKind::Spring => SpringMass::NAME,
            ModelKind::Pv => PvCycle::NAME,
            ModelKind::Selection => Selection::NAME,
        }
    }

    pub fn param_defs(self) -> &'static [ParamDef] {
        match self {
            ModelKind::Pendulum => Pendulum::param_defs(),
            ModelKind::Rl => RlCircuit::param_defs(),
            ModelKind::Lc => LcCircuit::param_defs(),
            ModelKind::Spring => SpringMass::param_defs(),
            ModelKind::Pv => PvCycle::param_defs(),
            ModelKind::Selection => Selection::param_defs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_tables_defaults_in_range() {
        for kind in [
            ModelKind::Pendulum,
            ModelKind::Rl,
            ModelKind::Lc,
            ModelKind::Spring,
            ModelKind::Pv,
            ModelKind::Selection,
        ] {
            for def in kind.param_defs() {
                assert!(
                    def.default >= def.min && def.default <= def.max,
                    "{}: default for {} out of range",
                    kind.name(),
                    def.name
                );
                assert_eq!(def.quantize(def.default), def.default, "{}.{} default off-grid", kind.name(), def.name);
            }
        }
    }

    #[test]
    fn test_model_names_unique() {
        let names = [
            ModelKind::Pendulum.name(),
            ModelKind::Rl.name(),
            ModelKind::Lc.name(),
            ModelKind::Spring.name(),
            ModelKind::Pv.name(),
            ModelKind::Selection.name(),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
