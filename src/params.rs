use std::collections::HashMap;

use crate::error::ParamError;

/// How a parameter value is quantised when set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Any value in range.
    Continuous,
    /// Rounded to the nearest `step` counted from `min`.
    Stepped,
    /// Boolean stored as 0.0 / 1.0.
    Flag,
    /// Index into `options`.
    Choice,
}

/// What a change to this parameter does to an in-progress run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangePolicy {
    /// Picked up by the next step.
    Live,
    /// The scheduler resets state and history.
    RequiresReset,
}

/// Definition of an adjustable parameter.
#[derive(Debug)]
pub struct ParamDef {
    pub name: &'static str,
    pub label: &'static str,
    pub desc: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
    pub kind: ParamKind,
    pub policy: ChangePolicy,
    pub options: &'static [&'static str],
}

impl ParamDef {
    /// Numeric parameter with a continuous range.
    pub const fn continuous(
        name: &'static str,
        label: &'static str,
        unit: &'static str,
        min: f64,
        max: f64,
        step: f64,
        default: f64,
        policy: ChangePolicy,
    ) -> Self {
        Self {
            name,
            label,
            desc: "",
            unit,
            min,
            max,
            step,
            default,
            kind: ParamKind::Continuous,
            policy,
            options: &[],
        }
    }

    /// Numeric parameter snapped to its step grid.
    pub const fn stepped(
        name: &'static str,
        label: &'static str,
        unit: &'static str,
        min: f64,
        max: f64,
        step: f64,
        default: f64,
        policy: ChangePolicy,
    ) -> Self {
        Self {
            name,
            label,
            desc: "",
            unit,
            min,
            max,
            step,
            default,
            kind: ParamKind::Stepped,
            policy,
            options: &[],
        }
    }

    pub const fn flag(name: &'static str, label: &'static str, default: bool, policy: ChangePolicy) -> Self {
        Self {
            name,
            label,
            desc: "",
            unit: "",
            min: 0.0,
            max: 1.0,
            step: 1.0,
            default: if default { 1.0 } else { 0.0 },
            kind: ParamKind::Flag,
            policy,
            options: &[],
        }
    }

    pub const fn choice(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
        default: usize,
        policy: ChangePolicy,
    ) -> Self {
        Self {
            name,
            label,
            desc: "",
            unit: "",
            min: 0.0,
            max: (options.len() - 1) as f64,
            step: 1.0,
            default: default as f64,
            kind: ParamKind::Choice,
            policy,
            options,
        }
    }

    pub const fn with_desc(mut self, desc: &'static str) -> Self {
        self.desc = desc;
        self
    }

    /// Clamp to range and quantise according to `kind`.
    pub fn quantize(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        match self.kind {
            ParamKind::Continuous => clamped,
            ParamKind::Stepped | ParamKind::Flag | ParamKind::Choice => {
                if self.step <= 0.0 {
                    return clamped;
                }
                let k = ((clamped - self.min) / self.step).round();
                (self.min + k * self.step).clamp(self.min, self.max)
            }
        }
    }

    /// Fraction of the range covered by `value`, for gauges.
    pub fn fraction(&self, value: f64) -> f64 {
        if self.max > self.min {
            ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Result of a successful `ParamSet::set`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamChange {
    pub value: f64,
    pub changed: bool,
    pub policy: ChangePolicy,
}

impl ParamChange {
    /// True when this change should reset the run.
    pub fn needs_reset(&self) -> bool {
        self.changed && self.policy == ChangePolicy::RequiresReset
    }
}

/// Current values for a model's parameter table.
#[derive(Clone, Debug)]
pub struct ParamSet {
    defs: &'static [ParamDef],
    values: Vec<f64>,
}

impl PartialEq for ParamSet {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.defs, other.defs) && self.values == other.values
    }
}

impl ParamSet {
    pub fn new(defs: &'static [ParamDef]) -> Self {
        Self {
            defs,
            values: defs.iter().map(|d| d.default).collect(),
        }
    }

    pub fn defs(&self) -> &'static [ParamDef] {
        self.defs
    }

    fn index_of(&self, name: &str) -> Result<usize, ParamError> {
        self.defs
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))
    }

    pub fn def(&self, name: &str) -> Result<&'static ParamDef, ParamError> {
        let defs = self.defs;
        self.index_of(name).map(|i| &defs[i])
    }

    pub fn get(&self, name: &str) -> Result<f64, ParamError> {
        self.index_of(name).map(|i| self.values[i])
    }

    pub fn flag(&self, name: &str) -> Result<bool, ParamError> {
        self.get(name).map(|v| v >= 0.5)
    }

    /// Selected option name of a `Choice` parameter.
    pub fn choice(&self, name: &str) -> Result<&'static str, ParamError> {
        let i = self.index_of(name)?;
        let def = &self.defs[i];
        let idx = self.values[i].round() as usize;
        def.options.get(idx).copied().ok_or_else(|| ParamError::UnknownOption {
            name: name.to_string(),
            option: idx.to_string(),
        })
    }

    /// Store a clamped, quantised value.
    pub fn set(&mut self, name: &str, value: f64) -> Result<ParamChange, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NotFinite { name: name.to_string(), value });
        }
        let i = self.index_of(name)?;
        let def = &self.defs[i];
        let new_val = def.quantize(value);
        let old = self.values[i];
        self.values[i] = new_val;
        Ok(ParamChange {
            value: new_val,
            changed: new_val != old,
            policy: def.policy,
        })
    }

    pub fn set_flag(&mut self, name: &str, on: bool) -> Result<ParamChange, ParamError> {
        self.set(name, if on { 1.0 } else { 0.0 })
    }

    pub fn set_choice(&mut self, name: &str, option: &str) -> Result<ParamChange, ParamError> {
        let def = self.def(name)?;
        let idx = def.options.iter().position(|o| *o == option).ok_or_else(|| {
            ParamError::UnknownOption {
                name: name.to_string(),
                option: option.to_string(),
            }
        })?;
        self.set(name, idx as f64)
    }

    /// Move a parameter by whole steps (positive = increase).
    pub fn nudge(&mut self, name: &str, steps: i32) -> Result<ParamChange, ParamError> {
        let def = self.def(name)?;
        let old = self.get(name)?;
        self.set(name, old + steps as f64 * def.step)
    }

    pub fn reset_to_defaults(&mut self) {
        for (v, d) in self.values.iter_mut().zip(self.defs) {
            *v = d.default;
        }
    }

    /// Apply a batch of overrides, e.g. from config. Unknown names are reported
    /// and skipped; the rest still apply.
    pub fn apply(&mut self, overrides: &HashMap<String, f64>) -> Vec<ParamError> {
        let mut errors = Vec::new();
        let mut names: Vec<&String> = overrides.keys().collect();
        names.sort();
        for name in names {
            if let Err(e) = self.set(name, overrides[name]) {
                tracing::warn!(error = %e, "ignoring parameter override");
                errors.push(e);
            }
        }
        errors
    }

    /// `(def, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static ParamDef, f64)> + '_ {
        self.defs.iter().zip(self.values.iter().copied())
    }
}

/// Parse a `name=value` override as given on the command line.
pub fn parse_override(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value for `{name}`: {e}"))?;
    Ok((name.trim().to_string(), value))
}
