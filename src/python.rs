use std::path::PathBuf;

use chrono::NaiveDate;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3_polars::PyDataFrame;

use crate::config::{ForecastSettings, RunConfig};
use crate::horizon::{FileCreationDate, ReferenceDateSource};
use crate::loader::{load_table, FileTable, OffsetCandidates, TableRole};
use crate::pipeline;
use crate::schema::{reference, shipment};

/// Run a forecast end to end and return the run summary as a dict.
#[pyfunction]
#[pyo3(signature = (input, reference, output, reference_date=None))]
fn run_forecast<'py>(
    py: Python<'py>,
    input: PathBuf,
    reference: PathBuf,
    output: PathBuf,
    reference_date: Option<NaiveDate>,
) -> PyResult<Bound<'py, PyDict>> {
    let mut config = RunConfig::new(input, reference, output);
    config.reference_date = reference_date;
    let summary = pipeline::run(&config)?;

    let out = PyDict::new(py);
    out.set_item("output", summary.output)?;
    out.set_item("reference_date", summary.reference_date)?;
    out.set_item("items", summary.items)?;
    out.set_item("flagged", summary.flagged)?;
    out.set_item(
        "defaulted_quantities",
        summary.diagnostics.defaulted_quantities(),
    )?;
    out.set_item("dropped_due_dates", summary.diagnostics.dropped_due_dates)?;
    out.set_item(
        "unknown_shipment_rows",
        summary.diagnostics.unknown_shipment_rows,
    )?;
    Ok(out)
}

/// Forecast without writing anything; returns the "Inventory Status" and
/// "Negative Tracking" frames.
#[pyfunction]
#[pyo3(signature = (input, reference_file, reference_date=None))]
fn forecast_frames(
    input: PathBuf,
    reference_file: PathBuf,
    reference_date: Option<NaiveDate>,
) -> PyResult<(PyDataFrame, PyDataFrame)> {
    let locator = OffsetCandidates::default();
    let shipments = load_table(
        &FileTable::new(&input),
        TableRole::Shipments,
        &shipment::REQUIRED,
        &locator,
    )?;
    let reference_df = load_table(
        &FileTable::new(&reference_file),
        TableRole::Reference,
        &reference::REQUIRED,
        &locator,
    )?;
    let date = match reference_date {
        Some(d) => d,
        None => FileCreationDate.reference_date(&input)?,
    };

    let settings = ForecastSettings::default();
    let result = pipeline::forecast(shipments, reference_df, date, &settings)?;
    let report = result.report(&settings)?;
    Ok((
        PyDataFrame(report.inventory_status),
        PyDataFrame(report.negative_tracking),
    ))
}

#[pymodule]
fn depletion_forecast(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_forecast, m)?)?;
    m.add_function(wrap_pyfunction!(forecast_frames, m)?)?;
    Ok(())
}
