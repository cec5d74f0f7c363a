/// Column-name constants for depletion-forecast tables.
/// Single source of truth for loaders, reports and the Python bindings.

// ── Shipment (input) columns ────────────────────────────────────────────────
pub mod shipment {
    pub const OPC: &str = "OPC";
    pub const DUE_DATE: &str = "Due Date";
    pub const SHIP_QTY: &str = "Ship Qty";

    /// Derived day/month label, added after date normalization.
    pub const DUE_DAY: &str = "Due Day";

    pub const REQUIRED: [&str; 3] = [OPC, DUE_DATE, SHIP_QTY];
}

// ── Reference columns ───────────────────────────────────────────────────────
pub mod reference {
    pub const OPC: &str = "OPC";
    pub const ON_HAND: &str = "On Hand";
    pub const ADD: &str = "ADD";
    pub const DESCR: &str = "Descr";
    pub const SKU: &str = "SKU";

    pub const REQUIRED: [&str; 5] = [OPC, ON_HAND, ADD, DESCR, SKU];
}

// ── "Inventory Status" output sheet ─────────────────────────────────────────
pub mod inventory_status {
    pub const SHEET_NAME: &str = "Inventory Status";

    pub const DESCRIPTION: &str = "Description";
    pub const SKU: &str = "SKU";
    pub const OPC: &str = "OPC";
    pub const ON_HAND: &str = "On Hand";
    pub const ADD: &str = "ADD";
    pub const TOTAL_SHIP_QTY: &str = "Total Ship Qty";

    /// Leading columns; one column per horizon day follows.
    pub const LEADING: [&str; 6] = [DESCRIPTION, SKU, OPC, ON_HAND, ADD, TOTAL_SHIP_QTY];
}

// ── "Negative Tracking" output sheet ────────────────────────────────────────
pub mod negative_tracking {
    pub const SHEET_NAME: &str = "Negative Tracking";

    pub const DESCRIPTION: &str = "Description";
    pub const SKU: &str = "SKU";
    pub const OPC: &str = "OPC";
    pub const INITIAL_ON_HAND: &str = "Initial On Hand";
    pub const DAILY_ADD: &str = "Daily ADD";
    pub const DAYS_TO_NEGATIVE: &str = "Days to Negative";

    pub const ALL: [&str; 6] = [
        DESCRIPTION,
        SKU,
        OPC,
        INITIAL_ON_HAND,
        DAILY_ADD,
        DAYS_TO_NEGATIVE,
    ];
}
