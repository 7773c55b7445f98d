use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{MutationEnvelope, OrderQuery, OrderService, ServiceError};
use crate::domain::order::{
    ManualStatus, OrderMode, OrderTarget, SortColumn, SortDirection, StatusCode,
};
use crate::models::{OrderId, OrderPage, OrderRow};
use crate::utils::until_cancelled;

// ============================================================================
// In-Memory Order Service
// ============================================================================
//
// Serves a fixed row set with the same filtering, sorting and paging
// semantics as the backend. Latency and failures can be scripted per call,
// and every query and mutation is recorded for inspection.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedMutation {
    ChangeStatus(OrderTarget, ManualStatus),
    Resend(OrderTarget),
    CancelAndRefund(OrderTarget),
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<OrderRow>,
    default_latency: Duration,
    list_latencies: VecDeque<Duration>,
    failing_lists: u32,
    failing_aggregates: u32,
    mutation_replies: VecDeque<MutationEnvelope>,
    ignore_cancellation: bool,
    queries: Vec<OrderQuery>,
    mutations: Vec<RecordedMutation>,
}

pub struct InMemoryOrderService {
    state: Mutex<MemoryState>,
}

impl InMemoryOrderService {
    pub fn new(rows: Vec<OrderRow>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                rows,
                ..Default::default()
            }),
        }
    }

    /// Latency applied to every call without a scripted one.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.state.get_mut().default_latency = latency;
        self
    }

    /// Latency for the next `list_orders` call only.
    pub async fn push_list_latency(&self, latency: Duration) {
        self.state.lock().await.list_latencies.push_back(latency);
    }

    pub async fn fail_next_lists(&self, count: u32) {
        self.state.lock().await.failing_lists = count;
    }

    pub async fn fail_next_aggregates(&self, count: u32) {
        self.state.lock().await.failing_aggregates = count;
    }

    /// Reply for the next mutation instead of applying it.
    pub async fn script_mutation_reply(&self, reply: MutationEnvelope) {
        self.state.lock().await.mutation_replies.push_back(reply);
    }

    /// Keep sleeping through cancellation, to simulate a backend that answers late.
    pub async fn set_ignore_cancellation(&self, ignore: bool) {
        self.state.lock().await.ignore_cancellation = ignore;
    }

    pub async fn recorded_queries(&self) -> Vec<OrderQuery> {
        self.state.lock().await.queries.clone()
    }

    pub async fn recorded_mutations(&self) -> Vec<RecordedMutation> {
        self.state.lock().await.mutations.clone()
    }

    pub async fn rows(&self) -> Vec<OrderRow> {
        self.state.lock().await.rows.clone()
    }

    /// A spread of orders across every status, dated back from `today`.
    pub fn sample_rows(today: NaiveDate, count: usize) -> Vec<OrderRow> {
        let statuses = StatusCode::FILTER_OPTIONS;
        let anchor = today
            .and_hms_opt(12, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);
        let users: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();

        (0..count)
            .map(|i| {
                let status = statuses[i % statuses.len()];
                let created_at = anchor - ChronoDuration::hours(i as i64 * 7);
                let order_amount = 50.0 + (i % 13) as f64 * 25.0;
                let total_cost = order_amount * if i % 11 == 0 { 1.2 } else { 0.7 };
                OrderRow {
                    id: OrderId::new(),
                    status,
                    user_id: users[i % users.len()],
                    category_id: None,
                    provider_id: None,
                    service_id: None,
                    source: Some(if i % 2 == 0 { "web" } else { "api" }.to_string()),
                    link: Some(format!("https://example.com/post/{i}")),
                    mode: if i % 3 == 0 { OrderMode::Manual } else { OrderMode::Auto },
                    order_amount,
                    total_cost_thb: total_cost,
                    original_price_thb: total_cost * 0.9,
                    profit_thb: order_amount - total_cost,
                    quantity: 1000,
                    remains: if status == StatusCode::Partial { 250 } else { 0 },
                    start_count: 100 + i as i64,
                    drip_feed: None,
                    created_at,
                    updated_at: created_at,
                }
            })
            .collect()
    }

    async fn pause(&self, latency: Duration, cancel: &CancellationToken) -> Result<(), ServiceError> {
        if latency.is_zero() {
            return Ok(());
        }
        let ignore = self.state.lock().await.ignore_cancellation;
        if ignore {
            tokio::time::sleep(latency).await;
            return Ok(());
        }
        until_cancelled(cancel, tokio::time::sleep(latency))
            .await
            .ok_or(ServiceError::Cancelled)
    }

    async fn mutate(&self, record: RecordedMutation) -> Result<MutationEnvelope, ServiceError> {
        let latency = {
            let mut state = self.state.lock().await;
            state.mutations.push(record.clone());
            state.default_latency
        };
        tokio::time::sleep(latency).await;

        let mut state = self.state.lock().await;
        if let Some(reply) = state.mutation_replies.pop_front() {
            if !reply.is_success() {
                return Ok(reply);
            }
        }

        let (target, new_status) = match &record {
            RecordedMutation::ChangeStatus(target, status) => (target, StatusCode::from(*status)),
            RecordedMutation::Resend(target) => (target, StatusCode::Pending),
            RecordedMutation::CancelAndRefund(target) => (target, StatusCode::Canceled),
        };

        let now = Utc::now();
        for row in state.rows.iter_mut().filter(|row| target.contains(&row.id)) {
            row.status = new_status;
            row.updated_at = now;
        }

        Ok(MutationEnvelope::ok())
    }
}

fn row_matches(row: &OrderRow, query: &OrderQuery) -> bool {
    let created = row.created_at.naive_utc();
    if created < query.date_from || created > query.date_to {
        return false;
    }
    if !query.statuses.is_empty() && !query.statuses.contains(&row.status) {
        return false;
    }

    let ids = [
        (query.category_id, row.category_id),
        (query.provider_id, row.provider_id),
        (query.service_id, row.service_id),
        (query.user_id, Some(row.user_id)),
    ];
    if ids.iter().any(|(wanted, actual)| wanted.is_some() && wanted != actual) {
        return false;
    }

    if query.mode != OrderMode::All && row.mode != query.mode {
        return false;
    }
    if query.source.is_some() && query.source != row.source {
        return false;
    }
    if query.show_negative_profit && !row.has_negative_profit() {
        return false;
    }

    if query.search.is_empty() {
        return true;
    }
    let needle = query.search.to_lowercase();
    row.id.to_string().contains(&needle)
        || row.link.as_deref().is_some_and(|link| link.to_lowercase().contains(&needle))
}

fn compare(a: &OrderRow, b: &OrderRow, column: SortColumn) -> Ordering {
    match column {
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortColumn::OrderAmount => a.order_amount.total_cmp(&b.order_amount),
        SortColumn::TotalCost => a.total_cost_thb.total_cmp(&b.total_cost_thb),
        SortColumn::Profit => a.profit_thb.total_cmp(&b.profit_thb),
        SortColumn::Status => a.status.cmp(&b.status),
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn list_orders(
        &self,
        query: &OrderQuery,
        cancel: CancellationToken,
    ) -> Result<OrderPage, ServiceError> {
        let (latency, fail) = {
            let mut state = self.state.lock().await;
            state.queries.push(query.clone());
            let latency = state
                .list_latencies
                .pop_front()
                .unwrap_or(state.default_latency);
            let fail = state.failing_lists > 0;
            if fail {
                state.failing_lists -= 1;
            }
            (latency, fail)
        };

        self.pause(latency, &cancel).await?;
        if fail {
            return Err(ServiceError::Unavailable("scripted list failure".to_string()));
        }

        let state = self.state.lock().await;
        let mut matched: Vec<OrderRow> = state
            .rows
            .iter()
            .filter(|row| row_matches(row, query))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort.column);
            match query.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total_count = matched.len() as u64;
        let offset = (query.page.saturating_sub(1) as usize) * query.page_size as usize;
        let rows = matched
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect();

        Ok(OrderPage { rows, total_count })
    }

    async fn has_negative_profit_in_range(
        &self,
        query: &OrderQuery,
        cancel: CancellationToken,
    ) -> Result<bool, ServiceError> {
        let (latency, fail) = {
            let mut state = self.state.lock().await;
            let fail = state.failing_aggregates > 0;
            if fail {
                state.failing_aggregates -= 1;
            }
            (state.default_latency, fail)
        };

        self.pause(latency, &cancel).await?;
        if fail {
            return Err(ServiceError::Unavailable("scripted aggregate failure".to_string()));
        }

        let state = self.state.lock().await;
        Ok(state
            .rows
            .iter()
            .filter(|row| row_matches(row, query))
            .any(OrderRow::has_negative_profit))
    }

    async fn change_status(
        &self,
        target: &OrderTarget,
        status: ManualStatus,
    ) -> Result<MutationEnvelope, ServiceError> {
        self.mutate(RecordedMutation::ChangeStatus(target.clone(), status)).await
    }

    async fn resend(&self, target: &OrderTarget) -> Result<MutationEnvelope, ServiceError> {
        self.mutate(RecordedMutation::Resend(target.clone())).await
    }

    async fn cancel_and_refund(&self, target: &OrderTarget) -> Result<MutationEnvelope, ServiceError> {
        self.mutate(RecordedMutation::CancelAndRefund(target.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{FilterField, FilterState, PageSize, SortSpec};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn query(filter: &FilterState) -> OrderQuery {
        OrderQuery::from_filter(filter, &filter.search).unwrap()
    }

    fn filter() -> FilterState {
        FilterState::defaults(today(), 3, PageSize::try_from(10).unwrap())
    }

    #[tokio::test]
    async fn test_pages_and_counts() {
        let service = InMemoryOrderService::new(InMemoryOrderService::sample_rows(today(), 42));
        let mut filter = filter();

        let page = service.list_orders(&query(&filter), CancellationToken::new()).await.unwrap();
        assert_eq!(page.total_count, 42);
        assert_eq!(page.rows.len(), 10);

        filter.apply(FilterField::Page(5));
        let page = service.list_orders(&query(&filter), CancellationToken::new()).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(service.recorded_queries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_status_filter_and_sort() {
        let service = InMemoryOrderService::new(InMemoryOrderService::sample_rows(today(), 42));
        let mut filter = filter();
        filter.apply(FilterField::Status(Some(StatusCode::Fail)));
        filter.apply(FilterField::Sort(SortSpec::new(SortColumn::CreatedAt, SortDirection::Asc)));

        let page = service.list_orders(&query(&filter), CancellationToken::new()).await.unwrap();
        assert!(page.rows.iter().all(|row| row.status == StatusCode::Fail));
        assert!(page.rows.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_negative_profit_covers_whole_range() {
        // Only the newest row loses money; page 2 is empty
        let service = InMemoryOrderService::new(InMemoryOrderService::sample_rows(today(), 10));
        let mut second_page = filter();
        second_page.apply(FilterField::Page(2));

        let page = service
            .list_orders(&query(&second_page), CancellationToken::new())
            .await
            .unwrap();
        assert!(page.rows.is_empty());

        let flag = service
            .has_negative_profit_in_range(&query(&second_page), CancellationToken::new())
            .await
            .unwrap();
        assert!(flag);
    }

    #[tokio::test]
    async fn test_cancellation_short_circuits() {
        let service = InMemoryOrderService::new(vec![]).with_latency(Duration::from_secs(10));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service.list_orders(&query(&filter()), cancel).await;
        assert!(matches!(result, Err(ServiceError::Cancelled)));
    }

    #[tokio::test]
    async fn test_mutations_apply_and_record() {
        let rows = InMemoryOrderService::sample_rows(today(), 5);
        let id = rows[0].id;
        let service = InMemoryOrderService::new(rows);

        let reply = service.cancel_and_refund(&OrderTarget::One(id)).await.unwrap();
        assert!(reply.is_success());
        let rows = service.rows().await;
        assert_eq!(rows[0].status, StatusCode::Canceled);

        service.script_mutation_reply(MutationEnvelope::failed("provider down")).await;
        let reply = service.resend(&OrderTarget::One(id)).await.unwrap();
        assert_eq!(reply.message.as_deref(), Some("provider down"));
        assert_eq!(service.rows().await[0].status, StatusCode::Canceled);

        assert_eq!(service.recorded_mutations().await.len(), 2);
    }
}
