use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Days, Local, NaiveDate};

use crate::error::Result;

/// Day labels are day/month, independent of year.
pub const DAY_LABEL_FORMAT: &str = "%d/%m";

pub fn day_label(date: NaiveDate) -> String {
    date.format(DAY_LABEL_FORMAT).to_string()
}

/// The forecast window: the days following a reference date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Horizon {
    reference_date: NaiveDate,
    labels: Vec<String>,
}

impl Horizon {
    /// Day `i` (1-based) of the horizon is `reference_date + i` days.
    pub fn following(reference_date: NaiveDate, days: usize) -> Self {
        let labels = (1..=days as u64)
            .map(|i| day_label(reference_date + Days::new(i)))
            .collect();
        Self {
            reference_date,
            labels,
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ── Reference date ──────────────────────────────────────────────────────────

/// Supplies the date a horizon is anchored on.
pub trait ReferenceDateSource {
    fn reference_date(&self, input: &Path) -> Result<NaiveDate>;
}

/// Uses the local calendar date the input file was created.
///
/// Falls back to the modification time on filesystems that do not record
/// creation times.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileCreationDate;

impl ReferenceDateSource for FileCreationDate {
    fn reference_date(&self, input: &Path) -> Result<NaiveDate> {
        let meta = std::fs::metadata(input)?;
        let stamp: SystemTime = match meta.created() {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(
                    "creation time unavailable for {}: {e}; using modification time",
                    input.display()
                );
                meta.modified()?
            }
        };
        Ok(DateTime::<Local>::from(stamp).date_naive())
    }
}

/// A date chosen by the caller.
#[derive(Debug, Clone, Copy)]
pub struct FixedDate(pub NaiveDate);

impl ReferenceDateSource for FixedDate {
    fn reference_date(&self, _input: &Path) -> Result<NaiveDate> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn horizon_starts_the_day_after() {
        let h = Horizon::following(date(2024, 5, 1), 8);
        assert_eq!(
            h.labels(),
            &["02/05", "03/05", "04/05", "05/05", "06/05", "07/05", "08/05", "09/05"]
        );
        assert_eq!(h.reference_date(), date(2024, 5, 1));
    }

    #[test]
    fn horizon_crosses_month_and_year() {
        let h = Horizon::following(date(2023, 12, 29), 4);
        assert_eq!(h.labels(), &["30/12", "31/12", "01/01", "02/01"]);
    }

    #[test]
    fn fixed_date_ignores_the_file() {
        let d = date(2024, 2, 28);
        let got = FixedDate(d)
            .reference_date(Path::new("/does/not/exist.xlsx"))
            .unwrap();
        assert_eq!(got, d);
    }

    #[test]
    fn file_date_requires_the_file() {
        assert!(FileCreationDate
            .reference_date(Path::new("/does/not/exist.xlsx"))
            .is_err());
    }

    #[test]
    fn file_date_of_fresh_file_is_today() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let got = FileCreationDate.reference_date(file.path()).unwrap();
        let today = Local::now().date_naive();
        // Allow for a run that straddles midnight.
        assert!(got == today || got + Days::new(1) == today);
    }
}
