use actix::prelude::*;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::actors::core::ScopedStore;
use crate::domain::order::{
    can_change_status_all, can_resend_all, is_selectable, BatchAction, BatchWarning,
    FilterDefaults, FilterEffect, FilterState, SelectionSet,
};
use crate::metrics::ConsoleMetrics;
use crate::models::{OrderPage, OrderRow};
use crate::service::{OrderQuery, OrderService, ServiceError};
use crate::utils::{Debouncer, TaskSlot};

mod messages;
pub mod workflow;

pub use messages::*;
pub use workflow::{BatchOutcome, BatchPrompt, BatchWorkflow, PendingBatch, WorkflowPhase};

// ============================================================================
// Order List Controller
// ============================================================================
//
// One actor per mounted order list. It owns the filter, the debounced
// search term, the current result page, the selection and the batch
// workflow. The actor mailbox is the event loop: every state change happens
// in a handler, and network calls run as actor futures whose results are
// applied back on the actor.
//
// Fetch cycles:
//   refresh() -> TaskSlot::begin() cancels the previous token
//             -> list_orders + has_negative_profit_in_range run concurrently
//             -> each settlement is applied only if its token is current
//
// Collaborators are injected. Nothing is global.
//
// ============================================================================

const ROWS_QUERY: &str = "rows";
const FLAG_QUERY: &str = "negative_profit";

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub search_debounce: Duration,
    pub filter_defaults: FilterDefaults,
    pub default_failure_message: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(800),
            filter_defaults: FilterDefaults::default(),
            default_failure_message: "Something went wrong".to_string(),
        }
    }
}

pub struct OrderListController {
    service: Arc<dyn OrderService>,
    settings: ControllerSettings,
    today: Option<NaiveDate>,

    filter: FilterState,
    debounced_search: String,
    debouncer: Debouncer,

    fetches: TaskSlot,
    outstanding: u8,
    rows: Vec<OrderRow>,
    total_count: u64,
    is_loading: bool,
    is_stale: bool,
    has_negative_profit: bool,

    selection: SelectionSet,
    workflow: BatchWorkflow,
    notice: Option<Notice>,

    scoped: Vec<Arc<dyn ScopedStore>>,
    metrics: Option<Arc<ConsoleMetrics>>,
    torn_down: bool,
}

impl OrderListController {
    pub fn new(service: Arc<dyn OrderService>, settings: ControllerSettings) -> Self {
        let filter = settings.filter_defaults.build(Local::now().date_naive());

        Self {
            service,
            debouncer: Debouncer::new(settings.search_debounce),
            workflow: BatchWorkflow::new(settings.default_failure_message.clone()),
            settings,
            today: None,
            filter,
            debounced_search: String::new(),
            fetches: TaskSlot::new(),
            outstanding: 0,
            rows: Vec::new(),
            total_count: 0,
            is_loading: false,
            is_stale: true,
            has_negative_profit: false,
            selection: SelectionSet::new(),
            notice: None,
            scoped: Vec::new(),
            metrics: None,
            torn_down: false,
        }
    }

    /// Register a store to be reset on teardown and filter reset.
    pub fn with_scoped_store(mut self, store: Arc<dyn ScopedStore>) -> Self {
        self.scoped.push(store);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ConsoleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Pin the calendar date the default date range is computed from.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self.filter = self.settings.filter_defaults.build(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            filter: self.filter.clone(),
            debounced_search: self.debounced_search.clone(),
            rows: self.rows.clone(),
            total_count: self.total_count,
            is_loading: self.is_loading,
            is_stale: self.is_stale,
            has_negative_profit: self.has_negative_profit,
            selection: self.selection.clone(),
            can_resend_all: can_resend_all(&self.selection),
            can_change_status_all: can_change_status_all(&self.selection),
            workflow_phase: self.workflow.phase(),
            pending_action: self.workflow.pending().map(|batch| batch.action),
            busy: self.workflow.is_busy(),
            notice: self.notice.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------------

    /// Back to the mount state. Scoped stores are reset with it.
    fn reset_filter(&mut self) {
        self.debouncer.cancel();
        self.filter = self.settings.filter_defaults.build(self.today());
        self.debounced_search.clear();
        for store in &self.scoped {
            store.reset();
        }
    }

    fn schedule_search(&mut self, ctx: &mut Context<Self>) {
        let restarted = self.debouncer.is_pending();
        if restarted {
            if let Some(metrics) = &self.metrics {
                metrics.record_debounce_restart();
            }
        }

        let addr = ctx.address();
        let value = self.filter.search.clone();
        let generation = self
            .debouncer
            .call(move |generation| addr.do_send(SearchSettled { generation, value }));

        tracing::trace!(generation, restarted, "Search debounce armed");
    }

    // ------------------------------------------------------------------------
    // Fetch orchestration
    // ------------------------------------------------------------------------

    fn refresh(&mut self, ctx: &mut Context<Self>) {
        let Some(query) = OrderQuery::from_filter(&self.filter, &self.debounced_search) else {
            // Nothing in flight may land against a filter it no longer matches
            if let Some(previous) = self.fetches.cancel() {
                tracing::debug!(token = previous.id(), "Cancelled in-flight fetch");
            }
            self.outstanding = 0;
            self.is_loading = false;
            tracing::debug!("Date range incomplete, fetch skipped");
            return;
        };

        let (token, superseded) = self.fetches.begin();
        if let Some(previous) = &superseded {
            tracing::debug!(superseded = previous.id(), token = token.id(), "Superseding in-flight fetch");
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_fetch_started(superseded.is_some());
        }

        self.outstanding = 2;
        self.is_loading = true;

        tracing::debug!(
            token = token.id(),
            page = query.page,
            page_size = query.page_size,
            search = %query.search,
            statuses = query.statuses.len(),
            "Fetch cycle started"
        );

        let id = token.id();
        let started = Instant::now();

        let service = self.service.clone();
        let rows_query = query.clone();
        let signal = token.signal();
        ctx.spawn(
            async move { service.list_orders(&rows_query, signal).await }
                .into_actor(self)
                .map(move |result, act, _ctx| act.settle_rows(id, started, result)),
        );

        let service = self.service.clone();
        let signal = token.signal();
        ctx.spawn(
            async move { service.has_negative_profit_in_range(&query, signal).await }
                .into_actor(self)
                .map(move |result, act, _ctx| act.settle_flag(id, started, result)),
        );
    }

    fn discard_stale(&self, query: &str, id: u64, cancelled: bool) {
        tracing::debug!(token = id, query, cancelled, "Discarding stale response");
        if let Some(metrics) = &self.metrics {
            metrics.record_stale_response(query);
        }
    }

    fn record_query(&self, query: &str, started: Instant, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_query(query, started.elapsed().as_secs_f64(), success);
        }
    }

    fn settle_rows(&mut self, id: u64, started: Instant, result: Result<OrderPage, ServiceError>) {
        if !self.fetches.is_current(id) {
            self.discard_stale(ROWS_QUERY, id, matches!(result, Err(ServiceError::Cancelled)));
            return;
        }
        self.record_query(ROWS_QUERY, started, result.is_ok());

        self.is_loading = false;
        self.is_stale = false;

        match result {
            Ok(page) => {
                tracing::debug!(token = id, rows = page.rows.len(), total = page.total_count, "Rows loaded");
                self.rows = page.rows;
                self.total_count = page.total_count;
            }
            Err(e) => {
                tracing::warn!(token = id, error = %e, "Order listing failed, showing empty result");
                self.rows.clear();
                self.total_count = 0;
            }
        }

        self.finish_query(id);
    }

    fn settle_flag(&mut self, id: u64, started: Instant, result: Result<bool, ServiceError>) {
        if !self.fetches.is_current(id) {
            self.discard_stale(FLAG_QUERY, id, matches!(result, Err(ServiceError::Cancelled)));
            return;
        }
        self.record_query(FLAG_QUERY, started, result.is_ok());

        self.has_negative_profit = match result {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(token = id, error = %e, "Negative profit check failed");
                false
            }
        };

        self.finish_query(id);
    }

    fn finish_query(&mut self, id: u64) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding == 0 && self.fetches.complete(id) {
            tracing::trace!(token = id, "Fetch cycle settled");
        }
    }

    // ------------------------------------------------------------------------
    // Batch outcome
    // ------------------------------------------------------------------------

    fn apply_outcome(&mut self, action: BatchAction, outcome: &BatchOutcome, ctx: &mut Context<Self>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_batch_outcome(action.label(), outcome.is_success());
        }

        match outcome {
            BatchOutcome::Succeeded { count, message, .. } => {
                tracing::info!(action = action.label(), count, "Batch action succeeded");
                self.notice = Some(Notice::success(message.clone()));
                self.selection.clear();

                // Canceled rows leave the current filter context
                if matches!(action, BatchAction::CancelAndRefund) {
                    self.reset_filter();
                }
                self.refresh(ctx);
            }
            BatchOutcome::Failed { message, .. } => {
                tracing::warn!(action = action.label(), message = %message, "Batch action failed");
                self.notice = Some(Notice::error(message.clone()));
            }
        }
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let debounce_cancelled = self.debouncer.cancel();
        let fetch_cancelled = self.fetches.cancel().map(|token| token.id());

        self.reset_filter();
        self.selection.clear();
        self.workflow.dismiss();
        self.rows.clear();
        self.total_count = 0;
        self.outstanding = 0;
        self.is_loading = false;
        self.is_stale = true;
        self.has_negative_profit = false;
        self.notice = None;

        tracing::info!(
            ?fetch_cancelled,
            debounce_cancelled,
            stores = self.scoped.len(),
            "Order list controller torn down"
        );
    }
}

impl Actor for OrderListController {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            debounce_ms = self.debouncer.delay().as_millis() as u64,
            page_size = self.filter.page_size.get(),
            "OrderListController started"
        );
        self.refresh(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.teardown();
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<SetField> for OrderListController {
    type Result = ();

    fn handle(&mut self, msg: SetField, ctx: &mut Self::Context) {
        let field = msg.0.name();
        let effect = self.filter.apply(msg.0);

        self.selection.clear();
        self.workflow.dismiss();
        self.is_stale = true;

        tracing::debug!(field, ?effect, page = self.filter.page, "Filter updated");

        match effect {
            FilterEffect::Immediate => self.refresh(ctx),
            FilterEffect::Debounced => self.schedule_search(ctx),
        }
    }
}

impl Handler<SearchSettled> for OrderListController {
    type Result = ();

    fn handle(&mut self, msg: SearchSettled, ctx: &mut Self::Context) {
        if !self.debouncer.is_current(msg.generation) {
            tracing::trace!(generation = msg.generation, "Dropping superseded search tick");
            return;
        }

        tracing::debug!(search = %msg.value, "Search settled");
        self.debounced_search = msg.value;
        self.refresh(ctx);
    }
}

impl Handler<Refresh> for OrderListController {
    type Result = ();

    fn handle(&mut self, _msg: Refresh, ctx: &mut Self::Context) {
        self.refresh(ctx);
    }
}

impl Handler<ToggleRow> for OrderListController {
    type Result = MessageResult<ToggleRow>;

    fn handle(&mut self, msg: ToggleRow, _ctx: &mut Self::Context) -> Self::Result {
        let row = msg.0;

        if self.selection.remove(&row.id) {
            return MessageResult(SelectionChange::Removed);
        }

        if self.selection.try_insert(&row, &self.filter.statuses) {
            MessageResult(SelectionChange::Added)
        } else {
            tracing::debug!(order_id = %row.id, status = %row.status, selected = self.selection.len(), "Row not selectable");
            if let Some(metrics) = &self.metrics {
                metrics.record_rejection(row.status.as_str());
            }
            MessageResult(SelectionChange::Rejected)
        }
    }
}

impl Handler<SelectAllEligible> for OrderListController {
    type Result = usize;

    fn handle(&mut self, _msg: SelectAllEligible, _ctx: &mut Self::Context) -> usize {
        let mut added = 0;
        for row in &self.rows {
            if self.selection.contains(&row.id) {
                continue;
            }
            // Each addition narrows what the next row may join
            if self.selection.try_insert(row, &self.filter.statuses) {
                added += 1;
            }
        }

        tracing::debug!(added, selected = self.selection.len(), "Selected all eligible rows");
        added
    }
}

impl Handler<ClearSelection> for OrderListController {
    type Result = ();

    fn handle(&mut self, _msg: ClearSelection, _ctx: &mut Self::Context) {
        self.selection.clear();
    }
}

impl Handler<IsSelectable> for OrderListController {
    type Result = bool;

    fn handle(&mut self, msg: IsSelectable, _ctx: &mut Self::Context) -> bool {
        is_selectable(&msg.0, &self.selection, &self.filter.statuses)
    }
}

impl Handler<GetSnapshot> for OrderListController {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.snapshot())
    }
}

impl Handler<TriggerBatch> for OrderListController {
    type Result = Result<BatchPrompt, BatchWarning>;

    fn handle(&mut self, msg: TriggerBatch, _ctx: &mut Self::Context) -> Self::Result {
        match self.workflow.trigger(msg.0, &self.selection) {
            Ok(prompt) => {
                self.notice = None;
                Ok(prompt)
            }
            Err(warning) => {
                tracing::warn!(warning = %warning, "Batch action refused");
                self.notice = Some(Notice::warning(warning.to_string()));
                Err(warning)
            }
        }
    }
}

impl Handler<DeclineBatch> for OrderListController {
    type Result = Result<(), BatchWarning>;

    fn handle(&mut self, _msg: DeclineBatch, _ctx: &mut Self::Context) -> Self::Result {
        self.workflow.decline().map(|_| ())
    }
}

impl Handler<ConfirmBatch> for OrderListController {
    type Result = ResponseActFuture<Self, Result<BatchOutcome, BatchWarning>>;

    fn handle(&mut self, _msg: ConfirmBatch, _ctx: &mut Self::Context) -> Self::Result {
        let pending = match self.workflow.confirm() {
            Ok(pending) => pending,
            Err(warning) => {
                tracing::warn!(warning = %warning, "Nothing to submit");
                return Box::pin(actix::fut::ready(Err(warning)));
            }
        };

        let action = pending.action;
        let service = self.service.clone();

        let submit = async move {
            match pending.action {
                BatchAction::ChangeStatus(status) => service.change_status(&pending.target, status).await,
                BatchAction::Resend => service.resend(&pending.target).await,
                BatchAction::CancelAndRefund => service.cancel_and_refund(&pending.target).await,
            }
        };

        Box::pin(submit.into_actor(self).map(move |reply, act, ctx| {
            let outcome = act.workflow.settle(reply);
            act.apply_outcome(action, &outcome, ctx);
            Ok(outcome)
        }))
    }
}

impl Handler<Teardown> for OrderListController {
    type Result = ();

    fn handle(&mut self, _msg: Teardown, ctx: &mut Self::Context) {
        self.teardown();
        ctx.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
