//! 外部订单确认 API
//!
//! `ExternalApiAction` 对每条订单事件（Created/Updated）调用一次外部确认接口，
//! 失败由 Worker 的重试策略负责重试。
//!
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use orderbus_domain::domain_event::OrderMessage;
use orderbus_domain::error::ActionResult;
use orderbus_domain::eventing::{CancellationToken, EventAction, HandledEventType};
use orderbus_domain::value_object::OrderId;
use tracing::info;

pub const DEFAULT_API_LATENCY: Duration = Duration::from_millis(500);

#[async_trait]
pub trait ExternalApiClient: Send + Sync {
    async fn confirm_order(&self, order_id: OrderId, token: CancellationToken) -> anyhow::Result<()>;
}

/// 以固定延迟模拟远端调用的客户端
#[derive(Debug, Clone)]
pub struct SimulatedExternalApi {
    latency: Duration,
}

impl Default for SimulatedExternalApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_LATENCY)
    }
}

impl SimulatedExternalApi {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl ExternalApiClient for SimulatedExternalApi {
    async fn confirm_order(&self, order_id: OrderId, token: CancellationToken) -> anyhow::Result<()> {
        info!(order_id = %order_id, "calling external api");

        tokio::select! {
            biased;
            _ = token.cancelled() => bail!("external api call for order {order_id} cancelled"),
            _ = tokio::time::sleep(self.latency) => {}
        }

        info!(order_id = %order_id, "external api confirmed order");
        Ok(())
    }
}

pub struct ExternalApiAction {
    client: Arc<dyn ExternalApiClient>,
}

impl ExternalApiAction {
    pub fn new(client: Arc<dyn ExternalApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventAction<OrderMessage> for ExternalApiAction {
    fn action_name(&self) -> &str {
        "external-api"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::All
    }

    async fn execute(&self, event: &OrderMessage, token: CancellationToken) -> ActionResult {
        self.client
            .confirm_order(event.order_id(), token)
            .await
            .with_context(|| format!("confirm {} order {}", event.kind(), event.order_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use orderbus_domain::domain_event::OrderEventKind;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<OrderId>>,
        fail: bool,
    }

    #[async_trait]
    impl ExternalApiClient for Recorder {
        async fn confirm_order(&self, order_id: OrderId, _token: CancellationToken) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(order_id);
            if self.fail {
                return Err(anyhow!("503 service unavailable"));
            }
            Ok(())
        }
    }

    fn id(value: i64) -> OrderId {
        OrderId::new(value).unwrap()
    }

    #[tokio::test]
    async fn action_calls_client_for_every_event_kind() {
        let client = Arc::new(Recorder::default());
        let action = ExternalApiAction::new(client.clone());

        let created = OrderMessage::created(id(1), "Ana", "ana@example.com");
        let updated = OrderMessage::new(id(1), "Ana", "ana@example.com", OrderEventKind::Updated);
        action.execute(&created, CancellationToken::new()).await.unwrap();
        action.execute(&updated, CancellationToken::new()).await.unwrap();

        assert_eq!(*client.calls.lock().unwrap(), vec![id(1), id(1)]);
        assert!(action.handled_event_type().matches("Updated"));
    }

    #[tokio::test]
    async fn action_failure_carries_context() {
        let client = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let action = ExternalApiAction::new(client);
        let err = action
            .execute(&OrderMessage::created(id(7), "Ana", "ana@example.com"), CancellationToken::new())
            .await
            .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("confirm Created order 7"));
        assert!(chain.contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_api_waits_configured_latency() {
        let api = SimulatedExternalApi::default();
        let start = Instant::now();
        api.confirm_order(id(1), CancellationToken::new()).await.unwrap();
        assert!(start.elapsed() >= DEFAULT_API_LATENCY);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_api_stops_on_cancel() {
        let api = SimulatedExternalApi::new(Duration::from_secs(60));
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                token.cancel();
            })
        };

        let start = Instant::now();
        assert!(api.confirm_order(id(1), token).await.is_err());
        assert!(start.elapsed() < Duration::from_secs(60));
        canceller.await.unwrap();
    }
}
