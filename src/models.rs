use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::order::{OrderMode, StatusCode};

// ============================================================================
// Read Models
// These are the rows the Order Service returns; they are replaced wholesale
// on every successful fetch and never mutated in place.
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        OrderId(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DripFeed {
    pub runs: u32,
    pub interval_minutes: u32,
    pub quantity_per_run: i64,
    pub runs_done: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub id: OrderId,
    pub status: StatusCode,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub source: Option<String>,
    pub link: Option<String>,
    pub mode: OrderMode,

    // Money, all in THB
    pub order_amount: f64,
    #[serde(rename = "totalCostTHB")]
    pub total_cost_thb: f64,
    #[serde(rename = "originalPriceTHB")]
    pub original_price_thb: f64,
    #[serde(rename = "profitTHB")]
    pub profit_thb: f64,

    pub quantity: i64,
    pub remains: i64,
    pub start_count: i64,
    pub drip_feed: Option<DripFeed>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn has_negative_profit(&self) -> bool {
        self.profit_thb < 0.0
    }
}

/// One page of rows plus the size of the whole filtered set.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub rows: Vec<OrderRow>,
    pub total_count: u64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn row(status: StatusCode) -> OrderRow {
        let now = Utc::now();
        OrderRow {
            id: OrderId::new(),
            status,
            user_id: Uuid::new_v4(),
            category_id: None,
            provider_id: None,
            service_id: None,
            source: None,
            link: None,
            mode: OrderMode::Auto,
            order_amount: 100.0,
            total_cost_thb: 80.0,
            original_price_thb: 90.0,
            profit_thb: 20.0,
            quantity: 1000,
            remains: 0,
            start_count: 0,
            drip_feed: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_row_wire_names() {
        let row = fixtures::row(StatusCode::Partial);
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["status"], "PARTIAL");
        assert!(json.get("totalCostTHB").is_some());
        assert!(json.get("profitTHB").is_some());
        assert!(json.get("startCount").is_some());
        assert_eq!(json["id"], serde_json::Value::String(row.id.to_string()));
    }

    #[test]
    fn test_drip_feed_decodes_camel_case() {
        let drip: DripFeed = serde_json::from_value(serde_json::json!({
            "runs": 5,
            "intervalMinutes": 30,
            "quantityPerRun": 200,
            "runsDone": 2
        }))
        .unwrap();

        assert_eq!(drip.interval_minutes, 30);
        assert_eq!(drip.quantity_per_run, 200);
        assert_eq!(drip.runs_done, 2);

        let mut row = fixtures::row(StatusCode::InProgress);
        row.drip_feed = Some(drip);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["dripFeed"]["intervalMinutes"], 30);
    }

    #[test]
    fn test_negative_profit() {
        let mut row = fixtures::row(StatusCode::Completed);
        assert!(!row.has_negative_profit());
        row.profit_thb = -0.5;
        assert!(row.has_negative_profit());
    }
}
