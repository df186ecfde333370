//! Discrete-generation natural selection on a single trait in [0, 1].
//!
//! Each generation replaces the whole population. Parents are drawn by
//! fitness-biased rejection sampling (up to `PARENT_ATTEMPTS` tries, then a
//! uniform pick); the child takes the parental mean, occasionally perturbed
//! by mutation, clamped to [0, 1].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::{Clock, Readout, Simulation};
use crate::error::SimError;
use crate::history::Timestamped;
use crate::params::{ChangePolicy, ParamDef, ParamSet};

pub const SELECTION_TYPES: &[&str] = &["directional", "stabilizing", "disruptive"];

/// Rejection-sampling attempts before falling back to a uniform pick.
pub const PARENT_ATTEMPTS: usize = 5;

pub const HISTOGRAM_BINS: usize = 10;

static PARAMS: [ParamDef; 6] = [
    ParamDef::stepped("population", "population", "", 10.0, 500.0, 10.0, 100.0, ChangePolicy::RequiresReset),
    ParamDef::choice("selection", "selection", SELECTION_TYPES, 0, ChangePolicy::Live),
    ParamDef::continuous("strength", "selection strength", "", 0.0, 1.0, 0.05, 0.5, ChangePolicy::Live),
    ParamDef::continuous("mutation_rate", "mutation rate", "", 0.0, 0.5, 0.01, 0.05, ChangePolicy::Live),
    ParamDef::continuous("mutation_size", "mutation size", "", 0.0, 0.3, 0.01, 0.1, ChangePolicy::Live),
    ParamDef::stepped("seed", "seed", "", 0.0, 9999.0, 1.0, 42.0, ChangePolicy::RequiresReset),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionType {
    Directional,
    Stabilizing,
    Disruptive,
}

impl SelectionType {
    /// Unscaled fitness shape over the trait value.
    pub fn shape(self, x: f64) -> f64 {
        match self {
            SelectionType::Directional => x,
            SelectionType::Stabilizing => 1.0 - 4.0 * (x - 0.5).powi(2),
            SelectionType::Disruptive => 4.0 * (x - 0.5).powi(2),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionParams {
    pub population: usize,
    pub selection: SelectionType,
    pub strength: f64,
    pub mutation_rate: f64,
    pub mutation_size: f64,
    pub seed: u64,
}

impl SelectionParams {
    pub fn from_set(params: &ParamSet) -> Result<Self, SimError> {
        let selection = match params.choice("selection")? {
            "stabilizing" => SelectionType::Stabilizing,
            "disruptive" => SelectionType::Disruptive,
            _ => SelectionType::Directional,
        };
        Ok(Self {
            population: params.get("population")?.round().max(2.0) as usize,
            selection,
            strength: params.get("strength")?,
            mutation_rate: params.get("mutation_rate")?,
            mutation_size: params.get("mutation_size")?,
            seed: params.get("seed")?.round() as u64,
        })
    }

    /// f(x) = (1 - s) + s * shape(x); never negative.
    pub fn fitness(&self, x: f64) -> f64 {
        ((1.0 - self.strength) + self.strength * self.selection.shape(x)).max(0.0)
    }
}

#[derive(Clone, Debug)]
pub struct Population {
    pub traits: Vec<f64>,
    pub generation: u64,
    pub t: f64,
    rng: StdRng,
}

impl PartialEq for Population {
    fn eq(&self, other: &Self) -> bool {
        self.traits == other.traits && self.generation == other.generation && self.t == other.t
    }
}

impl Population {
    pub fn seeded(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let traits = (0..size).map(|_| rng.gen_range(0.0..1.0)).collect();
        Self { traits, generation: 0, t: 0.0, rng }
    }

    pub fn mean(&self) -> f64 {
        if self.traits.is_empty() {
            return 0.0;
        }
        self.traits.iter().sum::<f64>() / self.traits.len() as f64
    }

    pub fn variance(&self) -> f64 {
        if self.traits.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.traits.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / self.traits.len() as f64
    }

    pub fn histogram(&self) -> [u32; HISTOGRAM_BINS] {
        let mut bins = [0u32; HISTOGRAM_BINS];
        for &x in &self.traits {
            let b = ((x * HISTOGRAM_BINS as f64) as usize).min(HISTOGRAM_BINS - 1);
            bins[b] += 1;
        }
        bins
    }
}

/// Pick a parent index: accept candidate i when its normalised fitness beats
/// a uniform draw, else retry; uniform fallback after `PARENT_ATTEMPTS`.
fn pick_parent<R: Rng>(rng: &mut R, normalized: &[f64]) -> usize {
    for _ in 0..PARENT_ATTEMPTS {
        let i = rng.gen_range(0..normalized.len());
        if normalized[i] >= rng.gen::<f64>() {
            return i;
        }
    }
    rng.gen_range(0..normalized.len())
}

/// Produce the next generation.
pub fn next_generation(pop: &Population, p: &SelectionParams) -> Population {
    let mut rng = pop.rng.clone();
    let fitness: Vec<f64> = pop.traits.iter().map(|&x| p.fitness(x)).collect();
    let max = fitness.iter().copied().fold(0.0_f64, f64::max);
    let normalized: Vec<f64> = if max > 0.0 {
        fitness.iter().map(|f| f / max).collect()
    } else {
        vec![1.0; fitness.len()]
    };

    let mut traits = Vec::with_capacity(p.population);
    if !pop.traits.is_empty() {
        for _ in 0..p.population {
            let a = pop.traits[pick_parent(&mut rng, &normalized)];
            let b = pop.traits[pick_parent(&mut rng, &normalized)];
            let mut child = 0.5 * (a + b);
            if p.mutation_rate > 0.0 && rng.gen_bool(p.mutation_rate.min(1.0)) && p.mutation_size > 0.0 {
                child += rng.gen_range(-p.mutation_size..=p.mutation_size);
            }
            traits.push(child.clamp(0.0, 1.0));
        }
    }

    Population {
        traits,
        generation: pop.generation + 1,
        t: pop.t + 1.0,
        rng,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectionSample {
    pub t: f64,
    pub generation: u64,
    pub mean: f64,
    pub variance: f64,
    pub histogram: [u32; HISTOGRAM_BINS],
}

impl Timestamped for SelectionSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Readout for SelectionSample {
    fn readout(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("mean", self.mean),
            ("variance", self.variance),
            ("generation", self.generation as f64),
        ]
    }
}

pub struct Selection;

impl Simulation for Selection {
    type State = Population;
    type Sample = SelectionSample;

    const NAME: &'static str = "selection";
    const CLOCK: Clock = Clock::Generation;

    fn param_defs() -> &'static [ParamDef] {
        &PARAMS
    }

    fn initial_state(params: &ParamSet) -> Result<Population, SimError> {
        let p = SelectionParams::from_set(params)?;
        Ok(Population::seeded(p.population, p.seed))
    }

    /// One generation; `dt` is ignored.
    fn step(state: &Population, params: &ParamSet, _dt: f64) -> Result<Population, SimError> {
        let p = SelectionParams::from_set(params)?;
        Ok(next_generation(state, &p))
    }

    fn sample(state: &Population, _params: &ParamSet) -> Result<SelectionSample, SimError> {
        Ok(SelectionSample {
            t: state.t,
            generation: state.generation,
            mean: state.mean(),
            variance: state.variance(),
            histogram: state.histogram(),
        })
    }

    fn elapsed(state: &Population) -> f64 {
        state.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(params: &ParamSet, generations: usize) -> (Population, Population) {
        let start = Selection::initial_state(params).unwrap();
        let mut pop = start.clone();
        for _ in 0..generations {
            pop = Selection::step(&pop, params, 0.0).unwrap();
        }
        (start, pop)
    }

    #[test]
    fn test_fitness_shapes() {
        assert_eq!(SelectionType::Directional.shape(0.8), 0.8);
        assert!((SelectionType::Stabilizing.shape(0.5) - 1.0).abs() < 1e-12);
        assert!(SelectionType::Stabilizing.shape(0.0).abs() < 1e-12);
        assert!((SelectionType::Disruptive.shape(1.0) - 1.0).abs() < 1e-12);
        assert!(SelectionType::Disruptive.shape(0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_strength_is_flat() {
        let mut params = Selection::default_params();
        params.set("strength", 0.0).unwrap();
        let p = SelectionParams::from_set(&params).unwrap();
        for x in [0.0, 0.3, 0.9] {
            assert_eq!(p.fitness(x), 1.0);
        }
    }

    #[test]
    fn test_directional_raises_mean() {
        let mut params = Selection::default_params();
        params.set("strength", 1.0).unwrap();
        params.set("mutation_rate", 0.2).unwrap();
        let (start, end) = run(&params, 20);
        assert!(
            end.mean() > start.mean() + 0.1,
            "mean should rise: {} -> {}",
            start.mean(),
            end.mean()
        );
    }

    #[test]
    fn test_traits_stay_in_unit_interval() {
        let mut params = Selection::default_params();
        params.set_choice("selection", "disruptive").unwrap();
        params.set("mutation_rate", 0.5).unwrap();
        params.set("mutation_size", 0.3).unwrap();
        let (_, end) = run(&params, 30);
        assert_eq!(end.traits.len(), 100);
        assert!(end.traits.iter().all(|x| (0.0..=1.0).contains(x)));
        assert_eq!(end.generation, 30);
        assert_eq!(end.t, 30.0);
    }

    #[test]
    fn test_same_seed_reproducible() {
        let params = Selection::default_params();
        let (a0, a) = run(&params, 10);
        let (b0, b) = run(&params, 10);
        assert_eq!(a0, b0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_differs() {
        let params = Selection::default_params();
        let mut other = Selection::default_params();
        other.set("seed", 7.0).unwrap();
        let a = Selection::initial_state(&params).unwrap();
        let b = Selection::initial_state(&other).unwrap();
        assert_ne!(a.traits, b.traits);
    }

    #[test]
    fn test_histogram_counts_everyone() {
        let params = Selection::default_params();
        let pop = Selection::initial_state(&params).unwrap();
        let sample = Selection::sample(&pop, &params).unwrap();
        assert_eq!(sample.histogram.iter().sum::<u32>(), 100);
    }

    #[test]
    fn test_pick_parent_falls_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(1);
        // All-zero fitness can never be accepted except by a zero draw.
        let normalized = vec![0.0; 4];
        for _ in 0..100 {
            assert!(pick_parent(&mut rng, &normalized) < 4);
        }
    }
}
