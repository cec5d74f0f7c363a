use std::collections::HashMap;

use polars::prelude::*;

use crate::error::Result;
use crate::schema::shipment;

/// Summed shipment quantities for one identifier, keyed by due-day label.
///
/// A `None` key is the zero placeholder added for identifiers with no
/// shipments; it never matches a horizon day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemShipments {
    by_day: HashMap<Option<String>, f64>,
}

impl ItemShipments {
    pub fn from_days<I, S>(days: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut item = Self::default();
        for (day, qty) in days {
            item.add(Some(day.into()), qty);
        }
        item
    }

    fn add(&mut self, day: Option<String>, qty: f64) {
        *self.by_day.entry(day).or_insert(0.0) += qty;
    }

    /// Quantity arriving on `label`, or zero.
    pub fn on(&self, label: &str) -> f64 {
        self.by_day
            .get(&Some(label.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Everything shipped for the item, inside the horizon or not.
    pub fn total(&self) -> f64 {
        self.by_day.values().sum()
    }

    pub fn days(&self) -> impl Iterator<Item = (Option<&str>, f64)> {
        self.by_day.iter().map(|(d, q)| (d.as_deref(), *q))
    }
}

/// Shipments grouped by `(identifier, due day)`.
#[derive(Debug, Clone, Default)]
pub struct AggregatedShipments {
    items: HashMap<String, ItemShipments>,
}

impl AggregatedShipments {
    pub fn get(&self, identifier: &str) -> Option<&ItemShipments> {
        self.items.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Sum `Ship Qty` per `(OPC, Due Day)` with a polars group-by.
pub fn aggregate(shipments: &DataFrame) -> Result<AggregatedShipments> {
    let grouped = shipments
        .clone()
        .lazy()
        .group_by([col(shipment::OPC), col(shipment::DUE_DAY)])
        .agg([col(shipment::SHIP_QTY).sum()])
        .collect()?;

    let ids = grouped.column(shipment::OPC)?.str()?;
    let days = grouped.column(shipment::DUE_DAY)?.str()?;
    let qtys = grouped.column(shipment::SHIP_QTY)?.f64()?;

    let mut items: HashMap<String, ItemShipments> = HashMap::new();
    for i in 0..grouped.height() {
        // Reconciled frames carry no null identifiers.
        let Some(id) = ids.get(i) else { continue };
        let day = days.get(i).map(str::to_string);
        let qty = qtys.get(i).unwrap_or(0.0);
        items.entry(id.to_string()).or_default().add(day, qty);
    }

    Ok(AggregatedShipments { items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_per_identifier_and_day() {
        let df = df!(
            shipment::OPC => &["A", "A", "A", "B"],
            shipment::DUE_DAY => &[Some("02/05"), Some("02/05"), Some("03/05"), Some("02/05")],
            shipment::SHIP_QTY => &[5.0, 10.0, 1.0, 4.0]
        )
        .unwrap();

        let agg = aggregate(&df).unwrap();
        assert_eq!(agg.len(), 2);
        let a = agg.get("A").unwrap();
        let b = agg.get("B").unwrap();
        assert_eq!(a.on("02/05"), 15.0);
        assert_eq!(a.on("03/05"), 1.0);
        assert_eq!(b.on("02/05"), 4.0);
        assert_eq!(b.on("03/05"), 0.0);
        assert_eq!(b.days().count(), 1);
        assert_eq!(a.total(), 16.0);
    }

    #[test]
    fn placeholder_rows_never_match_a_day() {
        let df = df!(
            shipment::OPC => &["X100"],
            shipment::DUE_DAY => &[None::<&str>],
            shipment::SHIP_QTY => &[0.0]
        )
        .unwrap();

        let agg = aggregate(&df).unwrap();
        let item = agg.get("X100").unwrap();
        assert_eq!(item.days().collect::<Vec<_>>(), vec![(None, 0.0)]);
        assert_eq!(item.on("02/05"), 0.0);
        assert_eq!(item.total(), 0.0);
    }

    #[test]
    fn order_of_rows_is_irrelevant() {
        let forward = df!(
            shipment::OPC => &["A", "B", "A"],
            shipment::DUE_DAY => &[Some("01/01"), Some("01/01"), Some("01/01")],
            shipment::SHIP_QTY => &[1.0, 2.0, 3.0]
        )
        .unwrap();
        let reversed = forward.reverse();

        let a = aggregate(&forward).unwrap();
        let b = aggregate(&reversed).unwrap();
        assert_eq!(a.get("A"), b.get("A"));
        assert_eq!(a.get("B"), b.get("B"));
    }
}
