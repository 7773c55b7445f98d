use actix::prelude::*;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_console::actors::core::LookupCache;
use order_console::actors::order_list::{
    ClearSelection, ConfirmBatch, ControllerSnapshot, GetSnapshot, SelectAllEligible, SetField,
    Teardown, TriggerBatch,
};
use order_console::actors::OrderListController;
use order_console::config::ConsoleConfig;
use order_console::domain::order::{BatchAction, BatchRequest, FilterField, StatusCode};
use order_console::metrics::{self, ConsoleMetrics};
use order_console::service::{HttpOrderService, InMemoryOrderService, OrderService};

async fn wait_idle(controller: &Addr<OrderListController>) -> anyhow::Result<ControllerSnapshot> {
    loop {
        let snapshot = controller.send(GetSnapshot).await?;
        if !snapshot.is_loading {
            return Ok(snapshot);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

fn log_page(label: &str, snapshot: &ControllerSnapshot) {
    tracing::info!(
        label,
        rows = snapshot.rows.len(),
        total = snapshot.total_count,
        page = snapshot.filter.page,
        negative_profit = snapshot.has_negative_profit,
        "Order page"
    );
}

#[actix::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Default to INFO with debug output for this crate; override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_console=debug")),
        )
        .init();

    let config = ConsoleConfig::from_env()?;
    tracing::info!(?config, "Starting order console");

    // === 1. Metrics ===
    let metrics = Arc::new(ConsoleMetrics::new()?);
    if let Some(port) = config.metrics_port {
        let server = metrics::start_metrics_server(Arc::new(metrics.registry().clone()), port)?;
        actix::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!(error = %e, "Metrics server error");
            }
        });
    }

    // === 2. Order service ===
    let service: Arc<dyn OrderService> = match &config.order_service_url {
        Some(url) => {
            tracing::info!(url = %url, "Using HTTP order service");
            Arc::new(HttpOrderService::new(url.clone(), config.order_service_timeout)?)
        }
        None => {
            tracing::info!("ORDER_SERVICE_URL not set, using sample orders");
            let rows = InMemoryOrderService::sample_rows(Local::now().date_naive(), 120);
            Arc::new(InMemoryOrderService::new(rows).with_latency(Duration::from_millis(120)))
        }
    };

    // === 3. Controller ===
    let providers = Arc::new(LookupCache::new("providers"));
    let controller = OrderListController::new(service, config.controller_settings())
        .with_scoped_store(providers.clone())
        .with_metrics(metrics.clone())
        .start();

    let snapshot = wait_idle(&controller).await?;
    log_page("initial", &snapshot);

    // === 4. Scripted session ===
    for term in ["p", "po", "post/1"] {
        controller.send(SetField(FilterField::Search(term.to_string()))).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(config.search_debounce + Duration::from_millis(50)).await;
    let snapshot = wait_idle(&controller).await?;
    log_page("search", &snapshot);

    controller.send(SetField(FilterField::Search(String::new()))).await?;
    controller.send(SetField(FilterField::Status(Some(StatusCode::Fail)))).await?;
    tokio::time::sleep(config.search_debounce + Duration::from_millis(50)).await;
    let snapshot = wait_idle(&controller).await?;
    log_page("failed orders", &snapshot);

    let selected = controller.send(SelectAllEligible).await?;
    tracing::info!(selected, "Selected failed orders");

    match controller.send(TriggerBatch(BatchRequest::selection(BatchAction::Resend))).await? {
        Ok(prompt) => {
            tracing::info!(action = %prompt.action, count = prompt.count(), "Confirming batch action");
            match controller.send(ConfirmBatch).await? {
                Ok(outcome) => tracing::info!(success = outcome.is_success(), message = outcome.message(), "Batch settled"),
                Err(warning) => tracing::warn!(warning = %warning, "Batch not submitted"),
            }
        }
        Err(warning) => {
            tracing::warn!(warning = %warning, "Batch refused");
            controller.send(ClearSelection).await?;
        }
    }

    let snapshot = wait_idle(&controller).await?;
    log_page("after batch", &snapshot);

    // === 5. Unmount ===
    controller.send(Teardown).await?;
    tracing::info!(
        fetches = metrics.fetch_cycles_started.get(),
        superseded = metrics.fetch_cycles_superseded.get(),
        "Demo complete"
    );

    Ok(())
}
