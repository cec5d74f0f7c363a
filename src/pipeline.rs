use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::aggregation::aggregate;
use crate::config::{ForecastSettings, RunConfig};
use crate::error::Result;
use crate::horizon::{FileCreationDate, FixedDate, Horizon, ReferenceDateSource};
use crate::loader::{load_table, FileTable, HeaderLocator, OffsetCandidates, TableRole};
use crate::normalize::{
    add_day_label_column, normalize_identifier_column, normalize_quantity_column, Diagnostics,
};
use crate::reconcile::reconcile;
use crate::reference::{reference_items, ReferenceItem};
use crate::report::{writer_for, ForecastReport, ReportWriter};
use crate::schema::{reference, shipment};
use crate::simulation::{simulate_all, DepletionTrajectory};

/// Result of the core computation, before anything is written.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub horizon: Horizon,
    pub items: Vec<ReferenceItem>,
    /// Parallel to `items`.
    pub trajectories: Vec<DepletionTrajectory>,
    pub diagnostics: Diagnostics,
}

impl Forecast {
    pub fn report(&self, settings: &ForecastSettings) -> Result<ForecastReport> {
        ForecastReport::build(
            &self.items,
            &self.trajectories,
            &self.horizon,
            settings.warning_cutoff_day,
        )
    }

    /// Items that go negative on or before the warning cutoff.
    pub fn watchlist(
        &self,
        settings: &ForecastSettings,
    ) -> impl Iterator<Item = (&ReferenceItem, &DepletionTrajectory)> {
        let cutoff = settings.warning_cutoff_day;
        self.items
            .iter()
            .zip(&self.trajectories)
            .filter(move |(_, t)| t.goes_negative_by(cutoff))
    }
}

/// What a successful run reports back to its caller.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub reference_date: NaiveDate,
    pub items: usize,
    pub flagged: usize,
    pub diagnostics: Diagnostics,
}

/// Run the forecast over two raw, string-typed tables.
///
/// `shipments` needs `OPC`, `Due Date`, `Ship Qty`; `reference` needs
/// `OPC`, `On Hand`, `ADD`, `Descr`, `SKU`. Pure: the same inputs always
/// give the same forecast.
pub fn forecast(
    shipments: DataFrame,
    reference: DataFrame,
    reference_date: NaiveDate,
    settings: &ForecastSettings,
) -> Result<Forecast> {
    settings.validate()?;
    let mut diagnostics = Diagnostics::default();

    // Reference side
    let reference = normalize_identifier_column(reference, reference::OPC, &mut diagnostics)?;
    let reference = normalize_quantity_column(reference, reference::ON_HAND, &mut diagnostics)?;
    let reference = normalize_quantity_column(reference, reference::ADD, &mut diagnostics)?;
    let items = reference_items(&reference, settings.duplicate_policy, &mut diagnostics)?;

    // Shipment side
    let shipments = normalize_identifier_column(shipments, shipment::OPC, &mut diagnostics)?;
    let shipments = normalize_quantity_column(shipments, shipment::SHIP_QTY, &mut diagnostics)?;
    let shipments = add_day_label_column(
        shipments,
        shipment::DUE_DATE,
        shipment::DUE_DAY,
        &mut diagnostics,
    )?;
    let shipments = shipments
        .lazy()
        .filter(col(shipment::DUE_DAY).is_not_null())
        .collect()?;
    if diagnostics.dropped_due_dates > 0 {
        tracing::warn!(
            "dropped {} shipment rows with unparsable due dates",
            diagnostics.dropped_due_dates
        );
    }

    let reference_ids: HashSet<String> = items.iter().map(|i| i.identifier.clone()).collect();
    let shipments = reconcile(&reference_ids, shipments, &mut diagnostics)?;
    let aggregated = aggregate(&shipments)?;

    let horizon = Horizon::following(reference_date, settings.horizon_days);
    let trajectories = simulate_all(&items, &aggregated, &horizon);

    if diagnostics.defaulted_quantities() > 0 {
        tracing::warn!(
            "{} quantity cells were blank or unparsable and counted as zero",
            diagnostics.defaulted_quantities()
        );
    }

    Ok(Forecast {
        horizon,
        items,
        trajectories,
        diagnostics,
    })
}

/// Load both inputs, forecast, and write the report with default
/// capabilities: two-offset header detection, the input file's creation
/// date (unless the config fixes one), and a writer chosen from the output
/// extension.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let selection = config.selection()?;
    let writer = writer_for(selection.output);
    match config.reference_date {
        Some(date) => run_with(config, &OffsetCandidates::default(), &FixedDate(date), &*writer),
        None => run_with(config, &OffsetCandidates::default(), &FileCreationDate, &*writer),
    }
}

/// [`run`] with every external capability supplied by the caller.
pub fn run_with(
    config: &RunConfig,
    locator: &dyn HeaderLocator,
    dates: &dyn ReferenceDateSource,
    writer: &dyn ReportWriter,
) -> Result<RunSummary> {
    let selection = config.selection()?;
    config.settings.validate()?;

    let shipments = load_table(
        &FileTable::new(selection.input),
        TableRole::Shipments,
        &shipment::REQUIRED,
        locator,
    )?;
    let reference = load_table(
        &FileTable::new(selection.reference),
        TableRole::Reference,
        &reference::REQUIRED,
        locator,
    )?;

    let reference_date = dates.reference_date(selection.input)?;
    tracing::info!("forecasting from reference date {reference_date}");

    let result = forecast(shipments, reference, reference_date, &config.settings)?;
    let report = result.report(&config.settings)?;
    writer.write(&report.sheets())?;

    tracing::info!("Output saved to {}", writer.destination().display());
    tracing::debug!("run diagnostics: {:?}", result.diagnostics);

    Ok(RunSummary {
        output: writer.destination().to_path_buf(),
        reference_date,
        items: result.items.len(),
        flagged: report.flagged(),
        diagnostics: result.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;
    use crate::error::ForecastError;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn shipments() -> DataFrame {
        df!(
            shipment::OPC => &["B", "A", "ZZZ", "B", "A"],
            shipment::DUE_DATE => &["03/05/2024", "not a date", "02/05/2024", "20/05/2024", "2024-05-04"],
            shipment::SHIP_QTY => &["5", "1,000", "50", "7", ""]
        )
        .unwrap()
    }

    fn reference() -> DataFrame {
        df!(
            reference::OPC => &["A", "B", "X100"],
            reference::ON_HAND => &["100", "10", "30"],
            reference::ADD => &["20", "15", "10"],
            reference::DESCR => &["Alpha", "Bravo", "Xray"],
            reference::SKU => &["SKU-A", "SKU-B", "SKU-X"]
        )
        .unwrap()
    }

    fn trajectory<'a>(f: &'a Forecast, id: &str) -> &'a DepletionTrajectory {
        f.trajectories
            .iter()
            .find(|t| t.identifier == id)
            .unwrap()
    }

    #[test]
    fn every_reference_item_gets_exactly_one_trajectory() {
        let f = forecast(shipments(), reference(), date(), &ForecastSettings::default()).unwrap();
        let ids: Vec<&str> = f.trajectories.iter().map(|t| t.identifier.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "X100"]);
        assert!(f.trajectories.iter().all(|t| t.daily_stock.len() == 8));
    }

    #[test]
    fn unknown_identifiers_contribute_nothing() {
        let f = forecast(shipments(), reference(), date(), &ForecastSettings::default()).unwrap();
        assert!(f.trajectories.iter().all(|t| t.identifier != "ZZZ"));
        assert_eq!(f.diagnostics.unknown_shipment_rows, 1);
    }

    #[test]
    fn early_crossings_are_flagged() {
        let settings = ForecastSettings::default();
        let f = forecast(shipments(), reference(), date(), &settings).unwrap();
        let b = trajectory(&f, "B");
        assert_eq!(b.daily_stock[0], -5.0);
        assert_eq!(b.daily_stock[1], -15.0);
        assert_eq!(b.first_negative_day, Some(1));
        // The 20/05 shipment is outside the horizon but still counted in the total.
        assert_eq!(b.total_shipped, 12.0);

        let flagged: Vec<&str> = f
            .watchlist(&settings)
            .map(|(item, _)| item.identifier.as_str())
            .collect();
        // X100 reaches -10 on day 4, still inside the cutoff.
        assert_eq!(flagged, vec!["B", "X100"]);
    }

    #[test]
    fn bad_dates_and_blank_quantities_are_recovered() {
        let f = forecast(shipments(), reference(), date(), &ForecastSettings::default()).unwrap();
        let a = trajectory(&f, "A");
        // "not a date" is dropped; the 04/05 shipment has a blank quantity.
        assert_eq!(a.total_shipped, 0.0);
        assert_eq!(a.first_negative_day, Some(6));
        assert_eq!(f.diagnostics.dropped_due_dates, 1);
        assert_eq!(f.diagnostics.blank_quantities, 1);
    }

    #[test]
    fn item_without_shipments_depletes_by_demand_only() {
        let f = forecast(shipments(), reference(), date(), &ForecastSettings::default()).unwrap();
        let x = trajectory(&f, "X100");
        assert_eq!(x.total_shipped, 0.0);
        assert_eq!(x.daily_stock, vec![20.0, 10.0, 0.0, -10.0, -20.0, -30.0, -40.0, -50.0]);
        assert_eq!(f.diagnostics.placeholder_items, 1);
    }

    #[test]
    fn forecast_is_idempotent() {
        let settings = ForecastSettings::default();
        let a = forecast(shipments(), reference(), date(), &settings).unwrap();
        let b = forecast(shipments(), reference(), date(), &settings).unwrap();
        assert_eq!(a.trajectories, b.trajectories);
    }

    #[test]
    fn watchlist_cutoff_is_configurable() {
        let settings = ForecastSettings {
            warning_cutoff_day: 6,
            ..Default::default()
        };
        let f = forecast(shipments(), reference(), date(), &settings).unwrap();
        let flagged: Vec<&str> = f
            .watchlist(&settings)
            .map(|(item, _)| item.identifier.as_str())
            .collect();
        assert_eq!(flagged, vec!["A", "B", "X100"]);
    }

    #[test]
    fn duplicate_policy_reaches_the_core() {
        let reference = df!(
            reference::OPC => &["A", "A"],
            reference::ON_HAND => &["1", "2"],
            reference::ADD => &["0", "0"],
            reference::DESCR => &["Alpha", "Alpha"],
            reference::SKU => &["SKU-A", "SKU-A"]
        )
        .unwrap();
        let settings = ForecastSettings {
            duplicate_policy: DuplicatePolicy::Reject,
            ..Default::default()
        };
        let err = forecast(shipments(), reference, date(), &settings).unwrap_err();
        assert!(matches!(err, ForecastError::DuplicateIdentifier(_)));
    }

    #[test]
    fn missing_selection_is_checked_before_loading() {
        let config = RunConfig {
            input: Some("/nonexistent/in.csv".into()),
            reference: None,
            output: Some("/nonexistent/out.xlsx".into()),
            ..Default::default()
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(err, ForecastError::MissingSelection("reference")));
    }
}
