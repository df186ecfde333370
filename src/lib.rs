//! Stepped simulations, a frame scheduler and algorithm animators for
//! interactive STEM visualizations.

pub mod algo;
pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod history;
pub mod params;
pub mod render;
pub mod scheduler;
pub mod sim;

pub use error::{ExportError, ParamError, RunError, SimError};
pub use history::HistoryBuffer;
pub use params::{ChangePolicy, ParamDef, ParamSet};
pub use scheduler::{FrameScheduler, SchedulerSettings, TickOutcome};
pub use sim::{ModelKind, Simulation};
