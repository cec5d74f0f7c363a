//! Short-horizon inventory depletion forecasting.
//!
//! Joins a reference snapshot (on hand, average daily demand, description)
//! with a schedule of incoming shipments and projects stock day by day over
//! a fixed horizon, flagging items expected to go negative soon.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod horizon;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod reference;
pub mod report;
pub mod schema;
pub mod simulation;

#[cfg(feature = "python")]
mod python;

pub use config::{DuplicatePolicy, ForecastSettings, RunConfig};
pub use error::{ForecastError, Result};
pub use pipeline::{forecast, run, run_with, Forecast, RunSummary};
