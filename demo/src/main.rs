//! 订单事件扇出演示
//!
//! 创建 `api` 与 `email` 两条总线并注册到扇出总线，分别启动外部 API Worker 与邮件 Worker，
//! 下一张示例订单后等待 Ctrl-C，取消全局令牌并等待两个 Worker 退出。
//!
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use orderbus_application::email::{EmailConfirmationAction, LoggingSessionFactory, SmtpSettings};
use orderbus_application::external_api::{
    DEFAULT_API_LATENCY, ExternalApiAction, SimulatedExternalApi,
};
use orderbus_application::order::{OrderDraft, OrderItemDraft};
use orderbus_application::repository::InMemoryOrderRepository;
use orderbus_application::service::OrderService;
use orderbus_domain::domain_event::OrderMessage;
use orderbus_domain::eventing::{
    CancellationToken, CompositeBus, EventAction, MessageBus, RetryPolicy, TracingRetryObserver,
    Worker, WorkerHandle,
};
use tracing::{error, info};

fn api_latency() -> anyhow::Result<Duration> {
    match std::env::var("ORDERBUS_API_LATENCY_MS") {
        Ok(raw) => {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("ORDERBUS_API_LATENCY_MS={raw}"))?;
            Ok(Duration::from_millis(millis))
        }
        Err(_) => Ok(DEFAULT_API_LATENCY),
    }
}

/// 毫秒数，超出 u64 时饱和
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn spawn_worker(
    name: &str,
    bus: MessageBus<OrderMessage>,
    action: Arc<dyn EventAction<OrderMessage>>,
    token: &CancellationToken,
) -> WorkerHandle {
    let retry = RetryPolicy::default().with_observer(Arc::new(TracingRetryObserver::new(name)));
    Worker::builder()
        .name(name)
        .bus(bus)
        .action(action)
        .retry(retry)
        .build()
        .spawn(token.clone())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let smtp = SmtpSettings::from_env()?;
    let latency = api_latency()?;
    info!(host = %smtp.host, port = smtp.port, latency_ms = millis(latency), "configuration loaded");

    let api_bus = MessageBus::new("api");
    let email_bus = MessageBus::new("email");
    let mut composite = CompositeBus::new();
    composite.subscribe(api_bus.clone());
    composite.subscribe(email_bus.clone());

    let token = CancellationToken::new();
    let workers = vec![
        spawn_worker(
            "external-api",
            api_bus,
            Arc::new(ExternalApiAction::new(Arc::new(SimulatedExternalApi::new(latency)))),
            &token,
        ),
        spawn_worker(
            "email",
            email_bus,
            Arc::new(EmailConfirmationAction::new(Arc::new(LoggingSessionFactory::new(smtp)))),
            &token,
        ),
    ];

    let orders = OrderService::new(Arc::new(InMemoryOrderRepository::new()), Arc::new(composite));
    let order = orders
        .create(OrderDraft {
            customer_name: "Ana Souza".into(),
            customer_email: "ana.souza@example.com".into(),
            items: vec![
                OrderItemDraft {
                    product_id: 1,
                    quantity: 2,
                    unit_price_cents: 1_990,
                },
                OrderItemDraft {
                    product_id: 7,
                    quantity: 1,
                    unit_price_cents: 4_500,
                },
            ],
        })
        .await?;
    info!(order_id = %order.id, total_cents = order.total_cents, "sample order created, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("listen for Ctrl-C")?;
    info!("shutdown requested");
    token.cancel();

    let mut failed = false;
    for worker in workers {
        let name = worker.name().to_string();
        match worker.join().await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => {}
            Err(err) => {
                error!(worker = %name, error = %err, "worker failed");
                failed = true;
            }
        }
    }

    if failed {
        anyhow::bail!("one or more workers stopped with an error");
    }
    info!("all workers stopped");
    Ok(())
}
