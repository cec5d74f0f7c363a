//! Output tables and their persistence.
//!
//! The report is two frames: the full trajectory per item ("Inventory
//! Status") and the early-warning watchlist ("Negative Tracking"). Writing
//! them is delegated to a [`ReportWriter`].

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{ForecastError, Result};
use crate::horizon::Horizon;
use crate::reference::ReferenceItem;
use crate::schema::{inventory_status, negative_tracking};
use crate::simulation::DepletionTrajectory;

// ── Report ──────────────────────────────────────────────────────────────────

/// A named table destined for one sheet of the output artifact.
#[derive(Debug, Clone, Copy)]
pub struct Sheet<'a> {
    pub name: &'a str,
    pub frame: &'a DataFrame,
}

#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub inventory_status: DataFrame,
    pub negative_tracking: DataFrame,
}

impl ForecastReport {
    /// Build both tables. `items` and `trajectories` are parallel slices.
    pub fn build(
        items: &[ReferenceItem],
        trajectories: &[DepletionTrajectory],
        horizon: &Horizon,
        warning_cutoff_day: usize,
    ) -> Result<Self> {
        Ok(Self {
            inventory_status: inventory_status_frame(items, trajectories, horizon)?,
            negative_tracking: negative_tracking_frame(items, trajectories, warning_cutoff_day)?,
        })
    }

    /// Sheets in output order.
    pub fn sheets(&self) -> [Sheet<'_>; 2] {
        [
            Sheet {
                name: inventory_status::SHEET_NAME,
                frame: &self.inventory_status,
            },
            Sheet {
                name: negative_tracking::SHEET_NAME,
                frame: &self.negative_tracking,
            },
        ]
    }

    pub fn flagged(&self) -> usize {
        self.negative_tracking.height()
    }
}

fn inventory_status_frame(
    items: &[ReferenceItem],
    trajectories: &[DepletionTrajectory],
    horizon: &Horizon,
) -> Result<DataFrame> {
    let descriptions: Vec<&str> = items.iter().map(|i| i.description.as_str()).collect();
    let skus: Vec<&str> = items.iter().map(|i| i.sku.as_str()).collect();
    let ids: Vec<&str> = items.iter().map(|i| i.identifier.as_str()).collect();
    let on_hand: Vec<f64> = items.iter().map(|i| i.on_hand).collect();
    let demand: Vec<f64> = items.iter().map(|i| i.daily_demand).collect();
    let shipped: Vec<f64> = trajectories.iter().map(|t| t.total_shipped).collect();

    let mut columns = vec![
        Column::new(inventory_status::DESCRIPTION.into(), &descriptions),
        Column::new(inventory_status::SKU.into(), &skus),
        Column::new(inventory_status::OPC.into(), &ids),
        Column::new(inventory_status::ON_HAND.into(), &on_hand),
        Column::new(inventory_status::ADD.into(), &demand),
        Column::new(inventory_status::TOTAL_SHIP_QTY.into(), &shipped),
    ];

    for (day, label) in horizon.labels().iter().enumerate() {
        let stock: Vec<f64> = trajectories.iter().map(|t| t.daily_stock[day]).collect();
        columns.push(Column::new(label.as_str().into(), &stock));
    }

    Ok(DataFrame::new(columns)?)
}

fn negative_tracking_frame(
    items: &[ReferenceItem],
    trajectories: &[DepletionTrajectory],
    warning_cutoff_day: usize,
) -> Result<DataFrame> {
    let flagged: Vec<(&ReferenceItem, u32)> = items
        .iter()
        .zip(trajectories)
        .filter(|(_, t)| t.goes_negative_by(warning_cutoff_day))
        .filter_map(|(item, t)| Some((item, t.first_negative_day? as u32)))
        .collect();

    let descriptions: Vec<&str> = flagged.iter().map(|(i, _)| i.description.as_str()).collect();
    let skus: Vec<&str> = flagged.iter().map(|(i, _)| i.sku.as_str()).collect();
    let ids: Vec<&str> = flagged.iter().map(|(i, _)| i.identifier.as_str()).collect();
    let on_hand: Vec<f64> = flagged.iter().map(|(i, _)| i.on_hand).collect();
    let demand: Vec<f64> = flagged.iter().map(|(i, _)| i.daily_demand).collect();
    let days: Vec<u32> = flagged.iter().map(|(_, d)| *d).collect();

    Ok(DataFrame::new(vec![
        Column::new(negative_tracking::DESCRIPTION.into(), &descriptions),
        Column::new(negative_tracking::SKU.into(), &skus),
        Column::new(negative_tracking::OPC.into(), &ids),
        Column::new(negative_tracking::INITIAL_ON_HAND.into(), &on_hand),
        Column::new(negative_tracking::DAILY_ADD.into(), &demand),
        Column::new(negative_tracking::DAYS_TO_NEGATIVE.into(), &days),
    ])?)
}

// ── Persistence ─────────────────────────────────────────────────────────────

/// Writes named sheets, in order, to one output artifact.
pub trait ReportWriter {
    fn destination(&self) -> &Path;

    fn write(&self, sheets: &[Sheet<'_>]) -> Result<()>;
}

fn persistence_error(
    path: &Path,
    source: impl std::error::Error + Send + Sync + 'static,
) -> ForecastError {
    ForecastError::Persistence {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

/// One workbook, one worksheet per sheet, bold header row.
#[derive(Debug, Clone)]
pub struct XlsxReportWriter {
    path: PathBuf,
}

impl XlsxReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn build_workbook(sheets: &[Sheet<'_>]) -> std::result::Result<Workbook, WriteError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name)?;

            for (c, column) in sheet.frame.get_columns().iter().enumerate() {
                let c = u16::try_from(c).map_err(|_| WriteError::TooWide(sheet.name.to_string()))?;
                worksheet.write_string_with_format(0, c, column.name().as_str(), &header)?;

                if column.dtype() == &DataType::String {
                    for (r, value) in column.str()?.into_iter().enumerate() {
                        if let Some(v) = value {
                            worksheet.write_string(r as u32 + 1, c, v)?;
                        }
                    }
                } else {
                    let numbers = column.cast(&DataType::Float64)?;
                    for (r, value) in numbers.f64()?.into_iter().enumerate() {
                        if let Some(v) = value {
                            worksheet.write_number(r as u32 + 1, c, v)?;
                        }
                    }
                }
            }
        }
        Ok(workbook)
    }
}

/// Failures while assembling a workbook in memory.
#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("sheet '{0}' has more columns than a worksheet allows")]
    TooWide(String),
}

impl ReportWriter for XlsxReportWriter {
    fn destination(&self) -> &Path {
        &self.path
    }

    fn write(&self, sheets: &[Sheet<'_>]) -> Result<()> {
        let mut workbook =
            Self::build_workbook(sheets).map_err(|e| persistence_error(&self.path, e))?;
        workbook
            .save(&self.path)
            .map_err(|e| persistence_error(&self.path, e))
    }
}

/// One `<sheet name>.csv` per sheet inside a directory.
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    dir: PathBuf,
}

impl CsvReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }
}

impl ReportWriter for CsvReportWriter {
    fn destination(&self) -> &Path {
        &self.dir
    }

    fn write(&self, sheets: &[Sheet<'_>]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| persistence_error(&self.dir, e))?;

        for sheet in sheets {
            let path = self.sheet_path(sheet.name);
            let mut file = File::create(&path).map_err(|e| persistence_error(&path, e))?;
            let mut frame = sheet.frame.clone();
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut frame)
                .map_err(|e| persistence_error(&path, e))?;
        }
        Ok(())
    }
}

/// An xlsx workbook for `.xlsx` paths, a CSV directory for anything else.
pub fn writer_for(path: &Path) -> Box<dyn ReportWriter> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        Box::new(XlsxReportWriter::new(path))
    } else {
        Box::new(CsvReportWriter::new(path))
    }
}
