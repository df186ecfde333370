use thiserror::Error;

/// Errors raised by the parameter store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),
    #[error("parameter `{name}` rejected non-finite value {value}")]
    NotFinite { name: String, value: f64 },
    #[error("parameter `{name}` has no option `{option}`")]
    UnknownOption { name: String, option: String },
}

/// Errors raised at the integrator boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A parameter sits where the model's closed form or force law is undefined
    /// (e.g. R -> 0 in tau = L/R).
    #[error("degenerate parameter `{param}` = {value}: model undefined")]
    Degenerate { param: &'static str, value: f64 },
    /// The step produced Inf/NaN in a state field.
    #[error("non-finite `{field}` at t={t:.4}")]
    NonFinite { field: &'static str, t: f64 },
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Errors raised while exporting history to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export io: {0}")]
    Io(#[from] std::io::Error),
    #[error("export encode: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that end an interactive or headless run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("window: {0}")]
    Window(#[from] minifb::Error),
}

/// Reject parameters at or below `eps`, which would divide by zero in a closed form.
pub fn require_positive(param: &'static str, value: f64) -> Result<f64, SimError> {
    if value.is_finite() && value > DEGENERATE_EPS {
        Ok(value)
    } else {
        Err(SimError::Degenerate { param, value })
    }
}

/// Smallest magnitude treated as non-zero for denominators.
pub const DEGENERATE_EPS: f64 = 1e-12;

/// Check that a freshly stepped field is finite.
pub fn require_finite(field: &'static str, value: f64, t: f64) -> Result<f64, SimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::NonFinite { field, t })
    }
}
