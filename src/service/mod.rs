//! Order Service boundary.
//!
//! The controller talks to the REST backend only through [`OrderService`].
//! Two implementations ship with the crate: [`HttpOrderService`] for a real
//! backend and [`InMemoryOrderService`] for demos and tests.

mod http;
mod memory;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::order::{FilterState, ManualStatus, OrderMode, OrderTarget, SortSpec, StatusCode};
use crate::models::OrderPage;

pub use http::HttpOrderService;
pub use memory::{InMemoryOrderService, RecordedMutation};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The HTTP request failed (network, DNS, timeout, body decode).
    #[error("Order service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Order service returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Order service unavailable: {0}")]
    Unavailable(String),

    /// The caller's cancellation signal fired first.
    #[error("Request cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A fetchable snapshot of the filter, with the debounced search term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderQuery {
    pub search: String,
    pub date_from: NaiveDateTime,
    pub date_to: NaiveDateTime,
    pub statuses: Vec<StatusCode>,
    pub category_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub mode: OrderMode,
    pub source: Option<String>,
    pub sort: SortSpec,
    pub show_negative_profit: bool,
    pub page: u32,
    pub page_size: u32,
}

impl OrderQuery {
    /// `None` while the date range is incomplete.
    pub fn from_filter(filter: &FilterState, search: &str) -> Option<Self> {
        let (date_from, date_to) = filter.date_range.bounds()?;

        Some(Self {
            search: search.trim().to_string(),
            date_from,
            date_to,
            statuses: filter.statuses.iter().copied().collect(),
            category_id: filter.category_id,
            provider_id: filter.provider_id,
            service_id: filter.service_id,
            user_id: filter.user_id,
            mode: filter.mode,
            source: filter.source.clone(),
            sort: filter.sort,
            show_negative_profit: filter.show_negative_profit,
            page: filter.page,
            page_size: filter.page_size.get(),
        })
    }

    /// URL query pairs. Empty and wildcard values are omitted.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

        let mut pairs = vec![
            ("startDate", self.date_from.format(DATE_FORMAT).to_string()),
            ("endDate", self.date_to.format(DATE_FORMAT).to_string()),
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("sortBy", self.sort.column.as_str().to_string()),
            ("sortOrder", self.sort.direction.as_str().to_string()),
        ];

        if !self.search.is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        if !self.statuses.is_empty() {
            let joined = self
                .statuses
                .iter()
                .map(StatusCode::as_str)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("status", joined));
        }

        let ids = [
            ("categoryId", self.category_id),
            ("providerId", self.provider_id),
            ("serviceId", self.service_id),
            ("userId", self.user_id),
        ];
        for (key, id) in ids {
            if let Some(id) = id {
                pairs.push((key, id.to_string()));
            }
        }

        if self.mode != OrderMode::All {
            pairs.push(("mode", self.mode.as_str().to_string()));
        }
        if let Some(source) = &self.source {
            pairs.push(("source", source.clone()));
        }
        if self.show_negative_profit {
            pairs.push(("negativeProfit", "true".to_string()));
        }

        pairs
    }
}

// ---------------------------------------------------------------------------
// Mutation envelope
// ---------------------------------------------------------------------------

/// Uniform `{success, message}` reply of every mutating call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MutationEnvelope {
    pub fn ok() -> Self {
        Self {
            success: Some(true),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            message: Some(message.into()),
        }
    }

    /// A missing `success` field counts as failure.
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[async_trait]
pub trait OrderService: Send + Sync {
    async fn list_orders(
        &self,
        query: &OrderQuery,
        cancel: CancellationToken,
    ) -> Result<OrderPage, ServiceError>;

    /// Whether any order in the whole filtered set (not just this page)
    /// has negative profit.
    async fn has_negative_profit_in_range(
        &self,
        query: &OrderQuery,
        cancel: CancellationToken,
    ) -> Result<bool, ServiceError>;

    async fn change_status(
        &self,
        target: &OrderTarget,
        status: ManualStatus,
    ) -> Result<MutationEnvelope, ServiceError>;

    async fn resend(&self, target: &OrderTarget) -> Result<MutationEnvelope, ServiceError>;

    async fn cancel_and_refund(&self, target: &OrderTarget) -> Result<MutationEnvelope, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{FilterField, PageSize};
    use chrono::NaiveDate;

    fn filter() -> FilterState {
        FilterState::defaults(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(), 3, PageSize::default())
    }

    #[test]
    fn test_query_requires_both_bounds() {
        let mut filter = filter();
        assert!(OrderQuery::from_filter(&filter, "").is_some());

        filter.apply(FilterField::DateStart(None));
        assert!(OrderQuery::from_filter(&filter, "").is_none());
    }

    #[test]
    fn test_query_uses_debounced_search() {
        let mut filter = filter();
        filter.apply(FilterField::Search("typing...".into()));

        let query = OrderQuery::from_filter(&filter, " settled ").unwrap();
        assert_eq!(query.search, "settled");
    }

    #[test]
    fn test_query_pairs_skip_wildcards() {
        let query = OrderQuery::from_filter(&filter(), "").unwrap();
        let keys: Vec<_> = query.to_query_pairs().into_iter().map(|(k, _)| k).collect();

        assert_eq!(keys, vec!["startDate", "endDate", "page", "pageSize", "sortBy", "sortOrder"]);
    }

    #[test]
    fn test_query_pairs_with_filters() {
        let mut filter = filter();
        filter.apply(FilterField::Status(Some(StatusCode::Fail)));
        filter.apply(FilterField::Mode(OrderMode::Manual));
        filter.apply(FilterField::ShowNegativeProfit(true));

        let pairs = OrderQuery::from_filter(&filter, "abc").unwrap().to_query_pairs();
        assert!(pairs.contains(&("status", "FAIL".to_string())));
        assert!(pairs.contains(&("mode", "manual".to_string())));
        assert!(pairs.contains(&("negativeProfit", "true".to_string())));
        assert!(pairs.contains(&("search", "abc".to_string())));
        assert!(pairs.contains(&("startDate", "2024-02-20T00:00:00".to_string())));
    }

    #[test]
    fn test_envelope_without_success_is_failure() {
        let envelope: MutationEnvelope = serde_json::from_str(r#"{"message":"nope"}"#).unwrap();
        assert!(!envelope.is_success());
        assert!(MutationEnvelope::ok().is_success());
        assert!(!MutationEnvelope::failed("x").is_success());
    }
}
