use orderbus_application::email::{EmailConfirmationAction, LoggingSessionFactory, SmtpSettings};
use orderbus_application::external_api::{ExternalApiAction, SimulatedExternalApi};
use orderbus_application::order::{OrderChanges, OrderDraft, OrderItemDraft};
use orderbus_application::repository::InMemoryOrderRepository;
use orderbus_application::service::OrderService;
use orderbus_domain::domain_event::OrderMessage;
use orderbus_domain::eventing::{
    CancellationToken, CompositeBus, EventAction, MessageBus, Worker, WorkerStats,
};
use std::sync::Arc;
use std::time::Duration;

async fn wait_until(stats: &WorkerStats, done: impl Fn(&WorkerStats) -> bool) {
    while !done(stats) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn order_lifecycle_drives_both_workers() {
    let api_bus = MessageBus::new("api");
    let email_bus = MessageBus::new("email");
    let mut composite = CompositeBus::new();
    composite.subscribe(api_bus.clone());
    composite.subscribe(email_bus.clone());

    let settings = SmtpSettings::from_lookup(|_| None).unwrap();
    let token = CancellationToken::new();
    let api = Worker::builder()
        .name("external-api")
        .bus(api_bus)
        .action(Arc::new(ExternalApiAction::new(Arc::new(SimulatedExternalApi::default())))
            as Arc<dyn EventAction<OrderMessage>>)
        .build()
        .spawn(token.clone());
    let email = Worker::builder()
        .name("email")
        .bus(email_bus)
        .action(Arc::new(EmailConfirmationAction::new(Arc::new(
            LoggingSessionFactory::new(settings),
        ))) as Arc<dyn EventAction<OrderMessage>>)
        .build()
        .spawn(token.clone());

    let service = OrderService::new(Arc::new(InMemoryOrderRepository::new()), Arc::new(composite));
    let order = service
        .create(OrderDraft {
            customer_name: "Ana".into(),
            customer_email: "ana@example.com".into(),
            items: vec![OrderItemDraft {
                product_id: 1,
                quantity: 2,
                unit_price_cents: 1_999,
            }],
        })
        .await
        .unwrap();
    service
        .update(
            order.id,
            OrderChanges {
                status: Some("Confirmed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    wait_until(api.stats(), |s| s.succeeded() == 2).await;
    wait_until(email.stats(), |s| s.dequeued() == 2).await;

    // 邮件只针对 Created 发送
    assert_eq!(email.stats().succeeded(), 1);
    assert_eq!(email.stats().skipped(), 1);
    assert_eq!(api.stats().attempts(), 2);

    token.cancel();
    api.join().await.unwrap();
    email.join().await.unwrap();
}
