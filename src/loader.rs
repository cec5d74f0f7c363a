//! Table loading with header-row detection.
//!
//! Inputs come from spreadsheets or CSV files that sometimes carry a banner
//! row above the real header. A [`HeaderLocator`] probes a [`TableSource`]
//! at candidate header offsets until all required columns are present.
//! Every cell is loaded as a string; coercion happens in `normalize`.

use std::fmt;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;

use crate::error::{ForecastError, Result};

/// Which input a table plays in a run; used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Shipments,
    Reference,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRole::Shipments => f.write_str("input"),
            TableRole::Reference => f.write_str("reference"),
        }
    }
}

// ── Sources ─────────────────────────────────────────────────────────────────

/// Something that can produce a string-typed frame given a header offset.
pub trait TableSource {
    fn path(&self) -> &Path;

    /// Read the table treating row `offset` as the header.
    fn read_with_header(&self, offset: usize) -> Result<DataFrame>;
}

/// A file on disk. Spreadsheet extensions go through calamine, everything
/// else is parsed as CSV.
#[derive(Debug, Clone)]
pub struct FileTable {
    path: PathBuf,
}

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

impl FileTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_spreadsheet(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                SPREADSHEET_EXTENSIONS
                    .iter()
                    .any(|s| e.eq_ignore_ascii_case(s))
            })
            .unwrap_or(false)
    }

    fn read_csv(&self, offset: usize) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_skip_rows(offset)
            .with_infer_schema_length(Some(0)) // all columns as String
            .map_parse_options(|opts| opts.with_truncate_ragged_lines(true))
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()?;
        Ok(df)
    }

    fn read_spreadsheet(&self, offset: usize) -> Result<DataFrame> {
        let mut workbook = open_workbook_auto(&self.path)?;
        let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
            return Ok(DataFrame::empty());
        };
        let range = workbook.worksheet_range(&sheet_name)?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        frame_from_rows(&rows, offset)
    }
}

impl TableSource for FileTable {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_with_header(&self, offset: usize) -> Result<DataFrame> {
        let df = if self.is_spreadsheet() {
            self.read_spreadsheet(offset)?
        } else {
            self.read_csv(offset)?
        };
        trim_column_names(df)
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        Data::Bool(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Data::Error(e) => format!("#ERROR: {:?}", e),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("{}", dt.as_f64()),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Build a string frame from raw rows, using row `offset` as the header.
///
/// Blank header cells become `column_N`; repeated names get a numeric
/// suffix so the frame stays constructible.
pub fn frame_from_rows(rows: &[Vec<String>], offset: usize) -> Result<DataFrame> {
    let Some(header) = rows.get(offset) else {
        return Ok(DataFrame::empty());
    };
    let body = &rows[offset + 1..];
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut seen: Vec<String> = Vec::with_capacity(width);
    let mut columns = Vec::with_capacity(width);
    for i in 0..width {
        let raw = header.get(i).map(|s| s.trim()).unwrap_or("");
        let base = if raw.is_empty() {
            format!("column_{}", i + 1)
        } else {
            raw.to_string()
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        seen.push(name.clone());

        let values: Vec<Option<String>> = body
            .iter()
            .map(|row| row.get(i).filter(|s| !s.is_empty()).cloned())
            .collect();
        columns.push(Column::new(name.into(), &values));
    }

    Ok(DataFrame::new(columns)?)
}

fn trim_column_names(mut df: DataFrame) -> Result<DataFrame> {
    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

fn row_is_blank(df: &DataFrame, row: usize) -> bool {
    df.get_columns().iter().all(|c| match c.get(row) {
        Ok(AnyValue::Null) => true,
        Ok(AnyValue::String(s)) => s.trim().is_empty(),
        Ok(AnyValue::StringOwned(s)) => s.trim().is_empty(),
        Ok(_) => false,
        Err(_) => true,
    })
}

/// Drop the first data row when every cell in it is blank.
fn drop_blank_leading_row(df: DataFrame) -> DataFrame {
    if df.height() > 0 && row_is_blank(&df, 0) {
        df.slice(1, df.height() - 1)
    } else {
        df
    }
}

pub fn missing_columns(df: &DataFrame, required: &[&str]) -> Vec<String> {
    let schema = df.schema();
    required
        .iter()
        .filter(|c| !schema.contains(c))
        .map(|c| c.to_string())
        .collect()
}

// ── Header location ─────────────────────────────────────────────────────────

/// A header offset that yields every required column, with the frame read there.
#[derive(Debug, Clone)]
pub struct HeaderMatch {
    pub offset: usize,
    pub frame: DataFrame,
}

/// Outcome of a header search.
#[derive(Debug, Clone)]
pub enum HeaderSearch {
    Found(HeaderMatch),
    /// No offset had every required column; `missing` is what the closest
    /// candidate lacked.
    NotFound { missing: Vec<String> },
}

/// Strategy for finding the header row of a table.
pub trait HeaderLocator {
    /// Offsets this locator will try, for error reporting.
    fn candidates(&self) -> Vec<usize>;

    fn locate(&self, source: &dyn TableSource, required: &[&str]) -> Result<HeaderSearch>;
}

/// Tries a fixed list of header offsets in order, discarding a fully blank
/// first data row under each.
#[derive(Debug, Clone)]
pub struct OffsetCandidates {
    offsets: Vec<usize>,
}

impl OffsetCandidates {
    pub fn new(offsets: Vec<usize>) -> Self {
        Self { offsets }
    }
}

impl Default for OffsetCandidates {
    /// Header on the first row, else on the second.
    fn default() -> Self {
        Self::new(vec![0, 1])
    }
}

impl HeaderLocator for OffsetCandidates {
    fn candidates(&self) -> Vec<usize> {
        self.offsets.clone()
    }

    fn locate(
        &self,
        source: &dyn TableSource,
        required: &[&str],
    ) -> Result<HeaderSearch> {
        let mut last_error = None;
        let mut closest: Option<Vec<String>> = None;

        for &offset in &self.offsets {
            let df = match source.read_with_header(offset) {
                Ok(df) => df,
                Err(e) => {
                    tracing::debug!(
                        "{}: header offset {offset} unreadable: {e}",
                        source.path().display()
                    );
                    last_error = Some(e);
                    continue;
                }
            };
            let df = drop_blank_leading_row(df);
            let missing = missing_columns(&df, required);
            if missing.is_empty() {
                tracing::debug!(
                    "{}: header found at offset {offset}",
                    source.path().display()
                );
                return Ok(HeaderSearch::Found(HeaderMatch { offset, frame: df }));
            }
            tracing::debug!(
                "{}: header offset {offset} missing {missing:?}",
                source.path().display()
            );
            if closest.as_ref().map_or(true, |c| missing.len() < c.len()) {
                closest = Some(missing);
            }
        }

        match (closest, last_error) {
            (Some(missing), _) => Ok(HeaderSearch::NotFound { missing }),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(HeaderSearch::NotFound {
                missing: required.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }
}

/// Load a table and guarantee every `required` column is present.
pub fn load_table(
    source: &dyn TableSource,
    role: TableRole,
    required: &[&str],
    locator: &dyn HeaderLocator,
) -> Result<DataFrame> {
    let wrap = |e: ForecastError| ForecastError::Load {
        role,
        path: source.path().to_path_buf(),
        source: Box::new(e),
    };

    match locator.locate(source, required).map_err(wrap)? {
        HeaderSearch::Found(found) => {
            tracing::info!(
                "loaded {role} table {} ({} rows, header offset {})",
                source.path().display(),
                found.frame.height(),
                found.offset
            );
            Ok(found.frame)
        }
        HeaderSearch::NotFound { missing } => Err(ForecastError::MissingColumns {
            role,
            path: source.path().to_path_buf(),
            missing,
            offsets: locator.candidates(),
        }),
    }
}
