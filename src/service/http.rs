use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{MutationEnvelope, OrderQuery, OrderService, ServiceError};
use crate::domain::order::{ManualStatus, OrderTarget, StatusCode};
use crate::models::{OrderId, OrderPage};
use crate::utils::until_cancelled;

// ============================================================================
// HTTP Order Service
// ============================================================================
//
// REST client for the order backend:
//   GET  {base}/orders                  -> OrderPage
//   GET  {base}/orders/negative-profit  -> { hasNegativeProfit }
//   POST {base}/orders/status           -> MutationEnvelope
//   POST {base}/orders/resend           -> MutationEnvelope
//   POST {base}/orders/cancel-refund    -> MutationEnvelope
//
// Queries race against the caller's cancellation signal; mutations are
// never cancelled once sent.
//
// ============================================================================

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct NegativeProfitReply {
    has_negative_profit: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_ids: Option<Vec<OrderId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<StatusCode>,
}

impl MutationBody {
    fn new(target: &OrderTarget) -> Self {
        let (order_id, order_ids) = match target {
            OrderTarget::One(id) => (Some(*id), None),
            OrderTarget::Many(ids) => (None, Some(ids.clone())),
        };
        Self {
            order_id,
            order_ids,
            status: None,
        }
    }

    fn with_status(mut self, status: ManualStatus) -> Self {
        self.status = Some(status.into());
        self
    }
}

pub struct HttpOrderService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &OrderQuery,
        cancel: &CancellationToken,
    ) -> Result<T, ServiceError> {
        let request = async {
            let response = self
                .client
                .get(self.url(path))
                .query(&query.to_query_pairs())
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(ServiceError::HttpStatus(response.status().as_u16()));
            }

            Ok::<T, ServiceError>(response.json::<T>().await?)
        };

        until_cancelled(cancel, request)
            .await
            .unwrap_or(Err(ServiceError::Cancelled))
    }

    async fn post_mutation(
        &self,
        path: &str,
        body: &MutationBody,
    ) -> Result<MutationEnvelope, ServiceError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            let envelope = response.json::<MutationEnvelope>().await.ok();
            return rejection(status.as_u16(), envelope);
        }

        Ok(response.json::<MutationEnvelope>().await?)
    }
}

/// Rejections still carry the envelope with a message. A non-2xx reply is
/// never a success, whatever its body claims.
fn rejection(status: u16, envelope: Option<MutationEnvelope>) -> Result<MutationEnvelope, ServiceError> {
    match envelope {
        Some(envelope) if envelope.message.is_some() => Ok(MutationEnvelope {
            success: Some(false),
            ..envelope
        }),
        _ => Err(ServiceError::HttpStatus(status)),
    }
}

#[async_trait]
impl OrderService for HttpOrderService {
    async fn list_orders(
        &self,
        query: &OrderQuery,
        cancel: CancellationToken,
    ) -> Result<OrderPage, ServiceError> {
        tracing::debug!(page = query.page, page_size = query.page_size, "GET /orders");
        self.get_json("/orders", query, &cancel).await
    }

    async fn has_negative_profit_in_range(
        &self,
        query: &OrderQuery,
        cancel: CancellationToken,
    ) -> Result<bool, ServiceError> {
        let reply: NegativeProfitReply = self
            .get_json("/orders/negative-profit", query, &cancel)
            .await?;
        Ok(reply.has_negative_profit)
    }

    async fn change_status(
        &self,
        target: &OrderTarget,
        status: ManualStatus,
    ) -> Result<MutationEnvelope, ServiceError> {
        let body = MutationBody::new(target).with_status(status);
        self.post_mutation("/orders/status", &body).await
    }

    async fn resend(&self, target: &OrderTarget) -> Result<MutationEnvelope, ServiceError> {
        self.post_mutation("/orders/resend", &MutationBody::new(target)).await
    }

    async fn cancel_and_refund(&self, target: &OrderTarget) -> Result<MutationEnvelope, ServiceError> {
        self.post_mutation("/orders/cancel-refund", &MutationBody::new(target))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let service = HttpOrderService::new("http://localhost:8080/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(service.url("/orders"), "http://localhost:8080/api/orders");
    }

    #[test]
    fn test_mutation_body_shapes() {
        let id = OrderId::new();
        let single = serde_json::to_value(MutationBody::new(&OrderTarget::One(id))).unwrap();
        assert_eq!(single, serde_json::json!({ "orderId": id }));

        let many = MutationBody::new(&OrderTarget::Many(vec![id])).with_status(ManualStatus::Completed);
        let many = serde_json::to_value(many).unwrap();
        assert_eq!(many, serde_json::json!({ "orderIds": [id], "status": "COMPLETED" }));
    }

    #[test]
    fn test_error_status_is_never_success() {
        let claimed = MutationEnvelope {
            success: Some(true),
            message: Some("Refund ledger locked".to_string()),
        };
        let envelope = rejection(409, Some(claimed)).unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.message.as_deref(), Some("Refund ledger locked"));

        let failed = rejection(422, Some(MutationEnvelope::failed("Invalid status"))).unwrap();
        assert!(!failed.is_success());

        assert!(matches!(rejection(502, None), Err(ServiceError::HttpStatus(502))));
        assert!(matches!(
            rejection(500, Some(MutationEnvelope::default())),
            Err(ServiceError::HttpStatus(500))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_query_never_hits_network() {
        let service = HttpOrderService::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
        let query = OrderQuery::from_filter(
            &crate::domain::order::FilterState::defaults(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                3,
                Default::default(),
            ),
            "",
        )
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service.list_orders(&query, cancel).await;
        assert!(matches!(result, Err(ServiceError::Cancelled)));
    }
}
