use std::path::PathBuf;

use thiserror::Error;

use crate::loader::TableRole;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("No {0} file selected")]
    MissingSelection(&'static str),

    #[error(
        "Could not find required headers {missing:?} in {role} file '{}' (checked header offsets {offsets:?})",
        path.display()
    )]
    MissingColumns {
        role: TableRole,
        path: PathBuf,
        missing: Vec<String>,
        offsets: Vec<usize>,
    },

    #[error("Failed reading {role} file '{}': {source}", path.display())]
    Load {
        role: TableRole,
        path: PathBuf,
        #[source]
        source: Box<ForecastError>,
    },

    #[error("Duplicate identifier in reference table: {0}")]
    DuplicateIdentifier(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Failed writing output '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
}

pub type Result<T, E = ForecastError> = std::result::Result<T, E>;

#[cfg(feature = "python")]
impl From<ForecastError> for pyo3::PyErr {
    fn from(err: ForecastError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}
