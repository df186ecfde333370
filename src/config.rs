use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::scheduler::SchedulerSettings;

pub const DEFAULT_PATH: &str = "stemlab.yaml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub display: DisplayConfig,
    /// Per-model parameter overrides, keyed by model name then parameter name.
    pub params: HashMap<String, HashMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_dt: f64,
    pub time_scale: f64,
    pub history_capacity: usize,
    pub generation_interval_ms: u64,
    pub max_catch_up: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    pub target_fps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            display: DisplayConfig::default(),
            params: HashMap::new(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_dt: 0.05,
            time_scale: 1.0,
            history_capacity: 300,
            generation_interval_ms: 200,
            max_catch_up: 5,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            target_fps: 60,
        }
    }
}

impl SchedulerConfig {
    /// Settings with non-positive values replaced by the defaults.
    pub fn settings(&self) -> SchedulerSettings {
        let d = SchedulerSettings::default();
        let positive = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        SchedulerSettings {
            max_dt: positive(self.max_dt, d.max_dt),
            time_scale: positive(self.time_scale, d.time_scale),
            history_capacity: if self.history_capacity > 0 { self.history_capacity } else { d.history_capacity },
            generation_interval: if self.generation_interval_ms > 0 {
                self.generation_interval_ms as f64 / 1000.0
            } else {
                d.generation_interval
            },
            max_catch_up: self.max_catch_up.max(1),
        }
    }
}

impl Config {
    pub fn overrides_for(&self, model: &str) -> Option<&HashMap<String, f64>> {
        self.params.get(model)
    }
}

/// Load `path`; a missing file gives defaults, an unreadable or invalid one
/// gives defaults with a warning.
pub fn load(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(cfg) => {
                info!(path = %path.display(), "loaded config");
                cfg
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse config; using defaults");
                Config::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read config; using defaults");
            Config::default()
        }
    }
}
