use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{ForecastError, Result};

/// Number of days simulated after the reference date.
pub const DEFAULT_HORIZON_DAYS: usize = 8;

/// Items going negative on or before this horizon day land on the watchlist.
pub const DEFAULT_WARNING_CUTOFF_DAY: usize = 4;

/// Longest horizon whose `dd/mm` labels cannot repeat.
pub const MAX_HORIZON_DAYS: usize = 31;

/// What to do when the reference table lists an identifier more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Keep the first row, ignore later ones.
    #[default]
    KeepFirst,
    /// Sum on-hand and demand; keep the first description and SKU.
    MergeSum,
    /// Fail the run.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSettings {
    pub horizon_days: usize,
    pub warning_cutoff_day: usize,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            warning_cutoff_day: DEFAULT_WARNING_CUTOFF_DAY,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_HORIZON_DAYS).contains(&self.horizon_days) {
            return Err(ForecastError::InvalidSettings(format!(
                "horizon must be between 1 and {MAX_HORIZON_DAYS} days, got {}",
                self.horizon_days
            )));
        }
        if self.warning_cutoff_day == 0 {
            return Err(ForecastError::InvalidSettings(
                "warning cutoff day must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything one run needs. Built once by the caller and never mutated.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub input: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Overrides the input file's creation date when set.
    pub reference_date: Option<NaiveDate>,
    pub settings: ForecastSettings,
}

/// The three locations of a run, all known to be selected.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub input: &'a Path,
    pub reference: &'a Path,
    pub output: &'a Path,
}

impl RunConfig {
    pub fn new(
        input: impl Into<PathBuf>,
        reference: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: Some(input.into()),
            reference: Some(reference.into()),
            output: Some(output.into()),
            ..Default::default()
        }
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn with_settings(mut self, settings: ForecastSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Check that input, reference and output are all set. An empty path
    /// counts as unset.
    pub fn selection(&self) -> Result<Selection<'_>> {
        fn selected<'a>(path: &'a Option<PathBuf>, what: &'static str) -> Result<&'a Path> {
            match path {
                Some(p) if !p.as_os_str().is_empty() => Ok(p.as_path()),
                _ => Err(ForecastError::MissingSelection(what)),
            }
        }

        Ok(Selection {
            input: selected(&self.input, "input")?,
            reference: selected(&self.reference, "reference")?,
            output: selected(&self.output, "output")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_standard_forecast() {
        let s = ForecastSettings::default();
        assert_eq!(s.horizon_days, 8);
        assert_eq!(s.warning_cutoff_day, 4);
        assert_eq!(s.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn horizon_bounds_are_enforced() {
        for days in [0, MAX_HORIZON_DAYS + 1] {
            let s = ForecastSettings {
                horizon_days: days,
                ..Default::default()
            };
            assert!(matches!(s.validate(), Err(ForecastError::InvalidSettings(_))));
        }
    }

    #[test]
    fn every_location_must_be_selected() {
        let mut cfg = RunConfig::new("in.xlsx", "ref.xlsx", "out.xlsx");
        assert!(cfg.selection().is_ok());

        cfg.reference = None;
        assert!(matches!(
            cfg.selection(),
            Err(ForecastError::MissingSelection("reference"))
        ));

        let cfg = RunConfig::new("in.xlsx", "ref.xlsx", "");
        assert!(matches!(
            cfg.selection(),
            Err(ForecastError::MissingSelection("output"))
        ));
    }
}
