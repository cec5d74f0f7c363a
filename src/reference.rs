use std::collections::HashMap;

use polars::prelude::*;

use crate::config::DuplicatePolicy;
use crate::error::{ForecastError, Result};
use crate::normalize::Diagnostics;
use crate::schema::reference;

/// One stock-keeping location from the reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceItem {
    pub identifier: String,
    pub description: String,
    pub sku: String,
    pub on_hand: f64,
    pub daily_demand: f64,
}

/// Turn a normalized reference frame into items, one per identifier, in
/// order of first appearance.
///
/// `On Hand` and `ADD` must already be `Float64` and `OPC` trimmed.
pub fn reference_items(
    df: &DataFrame,
    policy: DuplicatePolicy,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ReferenceItem>> {
    let ids = df.column(reference::OPC)?.str()?;
    let descrs = df.column(reference::DESCR)?.str()?;
    let skus = df.column(reference::SKU)?.str()?;
    let on_hand = df.column(reference::ON_HAND)?.f64()?;
    let demand = df.column(reference::ADD)?.f64()?;

    let mut items: Vec<ReferenceItem> = Vec::with_capacity(df.height());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(df.height());

    for i in 0..df.height() {
        let Some(id) = ids.get(i) else {
            continue;
        };
        let item = ReferenceItem {
            identifier: id.to_string(),
            description: descrs.get(i).unwrap_or("").to_string(),
            sku: skus.get(i).unwrap_or("").to_string(),
            on_hand: on_hand.get(i).unwrap_or(0.0),
            daily_demand: demand.get(i).unwrap_or(0.0),
        };

        match index.get(id) {
            None => {
                index.insert(item.identifier.clone(), items.len());
                items.push(item);
            }
            Some(&pos) => {
                diagnostics.duplicate_identifiers += 1;
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(ForecastError::DuplicateIdentifier(item.identifier));
                    }
                    DuplicatePolicy::KeepFirst => {
                        tracing::warn!("duplicate reference identifier {id}: keeping the first row");
                    }
                    DuplicatePolicy::MergeSum => {
                        tracing::warn!("duplicate reference identifier {id}: merging rows");
                        let first = &mut items[pos];
                        first.on_hand += item.on_hand;
                        first.daily_demand += item.daily_demand;
                    }
                }
            }
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            reference::OPC => &["A", "B", "A"],
            reference::DESCR => &[Some("Widget"), None, Some("Widget v2")],
            reference::SKU => &["W-1", "G-2", "W-1b"],
            reference::ON_HAND => &[100.0, 5.0, 20.0],
            reference::ADD => &[10.0, 1.0, 2.0]
        )
        .unwrap()
    }

    #[test]
    fn keep_first_ignores_later_rows() {
        let mut diag = Diagnostics::default();
        let items = reference_items(&frame(), DuplicatePolicy::KeepFirst, &mut diag).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].identifier, "A");
        assert_eq!(items[0].on_hand, 100.0);
        assert_eq!(items[0].description, "Widget");
        assert_eq!(items[1].description, "");
        assert_eq!(diag.duplicate_identifiers, 1);
    }

    #[test]
    fn merge_sum_adds_quantities() {
        let mut diag = Diagnostics::default();
        let items = reference_items(&frame(), DuplicatePolicy::MergeSum, &mut diag).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].on_hand, 120.0);
        assert_eq!(items[0].daily_demand, 12.0);
        assert_eq!(items[0].sku, "W-1");
    }

    #[test]
    fn reject_fails_on_the_duplicate() {
        let mut diag = Diagnostics::default();
        let err = reference_items(&frame(), DuplicatePolicy::Reject, &mut diag).unwrap_err();
        assert!(matches!(err, ForecastError::DuplicateIdentifier(id) if id == "A"));
    }
}
