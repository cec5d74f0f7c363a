//! Forward simulation of stock level over the horizon.
//!
//! Each day adds that day's inbound shipments, then subtracts the daily
//! demand once. Stock is never clamped, so a trajectory can go negative and
//! stay there. Items are independent of each other; a run simulates them in
//! reference order.

use crate::aggregation::{AggregatedShipments, ItemShipments};
use crate::horizon::Horizon;
use crate::reference::ReferenceItem;

/// Day-by-day projected stock for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct DepletionTrajectory {
    pub identifier: String,
    /// One entry per horizon day, in horizon order.
    pub daily_stock: Vec<f64>,
    /// 1-based index of the first day stock dropped below zero.
    pub first_negative_day: Option<usize>,
    /// All shipments for the item, whether or not they fall in the horizon.
    pub total_shipped: f64,
}

impl DepletionTrajectory {
    /// True when the item first goes negative on or before `cutoff_day`.
    pub fn goes_negative_by(&self, cutoff_day: usize) -> bool {
        self.first_negative_day
            .is_some_and(|day| day <= cutoff_day)
    }
}

pub fn simulate(
    item: &ReferenceItem,
    shipments: &ItemShipments,
    horizon: &Horizon,
) -> DepletionTrajectory {
    let mut stock = item.on_hand;
    let mut daily_stock = Vec::with_capacity(horizon.len());
    let mut first_negative_day = None;

    for (day, label) in (1..).zip(horizon.labels()) {
        stock += shipments.on(label);
        stock -= item.daily_demand;
        daily_stock.push(stock);

        if first_negative_day.is_none() && stock < 0.0 {
            first_negative_day = Some(day);
        }
    }

    DepletionTrajectory {
        identifier: item.identifier.clone(),
        daily_stock,
        first_negative_day,
        total_shipped: shipments.total(),
    }
}

/// Simulate every reference item. Items absent from `shipments` are treated
/// as having none.
pub fn simulate_all(
    items: &[ReferenceItem],
    shipments: &AggregatedShipments,
    horizon: &Horizon,
) -> Vec<DepletionTrajectory> {
    let none = ItemShipments::default();
    items
        .iter()
        .map(|item| {
            let for_item = shipments.get(&item.identifier).unwrap_or(&none);
            simulate(item, for_item, horizon)
        })
        .collect()
}
