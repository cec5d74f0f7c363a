//! Cell coercion for quantity and due-date fields.
//!
//! Both coercions are total: a bad quantity becomes `0.0` and a bad date
//! becomes `None`, so nothing here returns an error. The conversion is
//! intentionally lossy; callers who want to know how much was lost pass a
//! [`Diagnostics`] tally to the column-level helpers.

use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;

use crate::error::Result;
use crate::horizon::day_label;

/// Counters for everything a run silently recovered from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    /// Quantity cells that were empty after stripping and defaulted to zero.
    pub blank_quantities: usize,
    /// Quantity cells that did not parse as a finite number.
    pub unparsable_quantities: usize,
    /// Shipment rows dropped because the due date did not parse.
    pub dropped_due_dates: usize,
    /// Shipment rows dropped because their identifier is not in the reference table.
    pub unknown_shipment_rows: usize,
    /// Reference identifiers that had no shipments and got a zero placeholder.
    pub placeholder_items: usize,
    /// Rows skipped because the identifier cell was blank.
    pub blank_identifiers: usize,
    /// Reference rows whose identifier had already been seen.
    pub duplicate_identifiers: usize,
}

impl Diagnostics {
    pub fn defaulted_quantities(&self) -> usize {
        self.blank_quantities + self.unparsable_quantities
    }
}

enum Quantity {
    Value(f64),
    Blank,
    Unparsable,
}

fn parse_quantity(raw: &str) -> Quantity {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Quantity::Blank;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Quantity::Value(v),
        _ => Quantity::Unparsable,
    }
}

/// Coerce a quantity-like cell to a number.
///
/// Thousands separators and surrounding whitespace are stripped. Blank or
/// unparsable input yields `0.0`. The same rule applies to on-hand, demand
/// and shipment quantities.
pub fn normalize_quantity(raw: &str) -> f64 {
    match parse_quantity(raw) {
        Quantity::Value(v) => v,
        Quantity::Blank | Quantity::Unparsable => 0.0,
    }
}

fn normalize_quantity_counted(raw: Option<&str>, diagnostics: &mut Diagnostics) -> f64 {
    match parse_quantity(raw.unwrap_or("")) {
        Quantity::Value(v) => v,
        Quantity::Blank => {
            diagnostics.blank_quantities += 1;
            0.0
        }
        Quantity::Unparsable => {
            diagnostics.unparsable_quantities += 1;
            0.0
        }
    }
}

// Accepted after the date, separated by a space or ISO 'T'.
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

// Day-first readings come before year-first ones: "%Y" accepts a two-digit
// year, so "03-05-24" must not reach "%Y-%m-%d". Within day-first, "%y"
// precedes "%Y" because "%y" rejects a four-digit year as trailing input.
const DAY_FIRST_FORMATS: [&str; 13] = [
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d, %Y",
];

const MONTH_FIRST_FORMATS: [&str; 2] = ["%m/%d/%Y", "%m/%d/%y"];

/// Parse a raw due date, day before month, into a year-agnostic `dd/mm` label.
///
/// Returns `None` when nothing matches; the owning shipment row is then
/// excluded from aggregation.
pub fn normalize_due_date(raw: &str) -> Option<String> {
    parse_due_date(raw).map(day_label)
}

/// Drop a trailing `HH:MM[:SS[.f]]` so only the date part is parsed.
fn strip_time_suffix(s: &str) -> &str {
    let Some(split) = s.rfind([' ', 'T']) else {
        return s;
    };
    let time = &s[split + 1..];
    if TIME_FORMATS
        .iter()
        .any(|fmt| NaiveTime::parse_from_str(time, fmt).is_ok())
    {
        s[..split].trim_end()
    } else {
        s
    }
}

fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let s = strip_time_suffix(s);
    for fmt in DAY_FIRST_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // "dd/mm" with no year. 2000 is a leap year, so 29/02 stays valid.
    if s.matches('/').count() == 1 {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}/2000"), "%d/%m/%Y") {
            return Some(d);
        }
    }

    MONTH_FIRST_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

// ── Column helpers ──────────────────────────────────────────────────────────

/// Replace a string column with its `Float64` quantity coercion.
pub fn normalize_quantity_column(
    mut df: DataFrame,
    column: &str,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame> {
    let values: Vec<f64> = df
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| normalize_quantity_counted(v, diagnostics))
        .collect();

    df.with_column(Series::new(column.into(), values))?;
    Ok(df)
}

/// Add a `dd/mm` label column derived from `source`; unparsable dates are null.
pub fn add_day_label_column(
    mut df: DataFrame,
    source: &str,
    target: &str,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame> {
    let labels: Vec<Option<String>> = df
        .column(source)?
        .str()?
        .into_iter()
        .map(|v| {
            let label = v.and_then(normalize_due_date);
            if label.is_none() {
                diagnostics.dropped_due_dates += 1;
            }
            label
        })
        .collect();

    df.with_column(Series::new(target.into(), labels))?;
    Ok(df)
}

/// Trim identifier cells in place and drop rows whose identifier is blank.
pub fn normalize_identifier_column(
    mut df: DataFrame,
    column: &str,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame> {
    let ids: Vec<Option<String>> = df
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    diagnostics.blank_identifiers += ids.iter().filter(|v| v.is_none()).count();

    df.with_column(Series::new(column.into(), ids))?;
    let df = df.lazy().filter(col(column).is_not_null()).collect()?;
    Ok(df)
}
