use std::collections::HashSet;

use polars::prelude::*;

use crate::error::Result;
use crate::normalize::Diagnostics;
use crate::schema::shipment;

/// Restrict shipments to the reference universe and backfill the gaps.
///
/// Expects a frame with `OPC`, `Due Day` (nullable string) and `Ship Qty`
/// (`Float64`). Rows for identifiers outside `reference_ids` are dropped.
/// Every reference identifier left without a shipment row gets one
/// placeholder row with a null due day and zero quantity. Row order of the
/// result is unspecified.
pub fn reconcile(
    reference_ids: &HashSet<String>,
    shipments: DataFrame,
    diagnostics: &mut Diagnostics,
) -> Result<DataFrame> {
    let before = shipments.height();
    let known = Series::new(
        "known".into(),
        reference_ids.iter().cloned().collect::<Vec<String>>(),
    );

    let kept = shipments
        .lazy()
        .filter(col(shipment::OPC).is_in(lit(known), false))
        .select([
            col(shipment::OPC),
            col(shipment::DUE_DAY),
            col(shipment::SHIP_QTY),
        ])
        .collect()?;

    let dropped = before - kept.height();
    if dropped > 0 {
        tracing::warn!("dropped {dropped} shipment rows for identifiers not in the reference table");
    }
    diagnostics.unknown_shipment_rows += dropped;

    let present: HashSet<&str> = kept
        .column(shipment::OPC)?
        .str()?
        .into_iter()
        .flatten()
        .collect();
    let mut missing: Vec<String> = reference_ids
        .iter()
        .filter(|id| !present.contains(id.as_str()))
        .cloned()
        .collect();
    missing.sort();

    if missing.is_empty() {
        return Ok(kept);
    }
    tracing::debug!("{} reference identifiers have no shipments", missing.len());
    diagnostics.placeholder_items += missing.len();

    let n = missing.len();
    let placeholders = DataFrame::new(vec![
        Column::new(shipment::OPC.into(), &missing),
        Column::new(shipment::DUE_DAY.into(), &vec![None::<String>; n]),
        Column::new(shipment::SHIP_QTY.into(), &vec![0.0f64; n]),
    ])?;

    Ok(kept.vstack(&placeholders)?)
}
