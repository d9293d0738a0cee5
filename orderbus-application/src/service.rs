//! 订单应用服务
//!
//! 订单的创建与修改在持久化成功之后，通过扇出总线发布 `OrderMessage`；
//! 发布只负责入队，副作用（调用外部 API、发送邮件）由各 Worker 异步完成。
//! 删除与明细维护不发布事件。
//!
use std::sync::Arc;

use chrono::Utc;
use orderbus_domain::domain_event::{OrderEventKind, OrderMessage};
use orderbus_domain::eventing::EventBus;
use orderbus_domain::value_object::OrderId;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::order::{
    Order, OrderChanges, OrderDraft, OrderItem, OrderItemDraft, STATUS_PENDING,
    validate_customer_email, validate_customer_name,
};
use crate::repository::OrderRepository;

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    events: Arc<dyn EventBus<OrderMessage>>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, events: Arc<dyn EventBus<OrderMessage>>) -> Self {
        Self { repo, events }
    }

    /// 全部订单，按下单时间倒序
    pub async fn list(&self) -> AppResult<Vec<Order>> {
        let mut orders = self.repo.list().await?;
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    pub async fn get(&self, id: OrderId) -> AppResult<Option<Order>> {
        self.repo.get(id).await
    }

    pub async fn create(&self, draft: OrderDraft) -> AppResult<Order> {
        let customer_name = validate_customer_name(&draft.customer_name)?;
        let customer_email = validate_customer_email(&draft.customer_email)?;
        for item in &draft.items {
            item.validate()?;
        }

        let id = self.repo.next_order_id().await?;
        let mut items = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            items.push(self.new_item(id, item).await?);
        }

        let mut order = Order {
            id,
            customer_name,
            customer_email,
            order_date: Utc::now(),
            status: STATUS_PENDING.to_string(),
            total_cents: 0,
            items,
        };
        order.recalculate_total()?;
        self.repo.save(&order).await?;
        info!(order_id = %order.id, total_cents = order.total_cents, "order created");

        self.publish(&order, OrderEventKind::Created).await?;
        Ok(order)
    }

    pub async fn update(&self, id: OrderId, changes: OrderChanges) -> AppResult<Order> {
        let mut order = self.require(id).await?;

        if let Some(name) = changes.customer_name {
            order.customer_name = validate_customer_name(&name)?;
        }
        if let Some(email) = changes.customer_email {
            order.customer_email = validate_customer_email(&email)?;
        }
        if let Some(status) = changes.status {
            order.status = status;
        }
        order.recalculate_total()?;
        self.repo.save(&order).await?;
        info!(order_id = %order.id, status = %order.status, "order updated");

        self.publish(&order, OrderEventKind::Updated).await?;
        Ok(order)
    }

    /// 删除订单及其明细；订单不存在时不做任何事
    pub async fn delete(&self, id: OrderId) -> AppResult<()> {
        if self.repo.delete(id).await? {
            info!(order_id = %id, "order deleted");
        }
        Ok(())
    }

    pub async fn add_item(&self, order_id: OrderId, draft: OrderItemDraft) -> AppResult<OrderItem> {
        draft.validate()?;
        let mut order = self.require(order_id).await?;

        let item = self.new_item(order_id, &draft).await?;
        order.items.push(item.clone());
        order.recalculate_total()?;
        self.repo.save(&order).await?;
        debug!(order_id = %order_id, item_id = item.id, "order item added");
        Ok(item)
    }

    pub async fn update_item(
        &self,
        order_id: OrderId,
        item_id: i64,
        draft: OrderItemDraft,
    ) -> AppResult<OrderItem> {
        draft.validate()?;
        let mut order = self.require(order_id).await?;

        let item = order
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("order item {item_id}")))?;
        item.product_id = draft.product_id;
        item.quantity = draft.quantity;
        item.unit_price_cents = draft.unit_price_cents;
        let updated = item.clone();

        order.recalculate_total()?;
        self.repo.save(&order).await?;
        debug!(order_id = %order_id, item_id, "order item updated");
        Ok(updated)
    }

    /// 删除明细；订单或明细不存在时不做任何事
    pub async fn remove_item(&self, order_id: OrderId, item_id: i64) -> AppResult<()> {
        let Some(mut order) = self.repo.get(order_id).await? else {
            return Ok(());
        };
        let before = order.items.len();
        order.items.retain(|item| item.id != item_id);
        if order.items.len() == before {
            return Ok(());
        }

        order.recalculate_total()?;
        self.repo.save(&order).await?;
        debug!(order_id = %order_id, item_id, "order item removed");
        Ok(())
    }

    /// 重新计算订单总额；订单不存在时不做任何事
    pub async fn recalculate_total(&self, order_id: OrderId) -> AppResult<()> {
        let Some(mut order) = self.repo.get(order_id).await? else {
            return Ok(());
        };
        order.recalculate_total()?;
        self.repo.save(&order).await
    }

    async fn require(&self, id: OrderId) -> AppResult<Order> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    async fn new_item(&self, order_id: OrderId, draft: &OrderItemDraft) -> AppResult<OrderItem> {
        Ok(OrderItem {
            id: self.repo.next_item_id().await?,
            order_id,
            product_id: draft.product_id,
            quantity: draft.quantity,
            unit_price_cents: draft.unit_price_cents,
        })
    }

    async fn publish(&self, order: &Order, kind: OrderEventKind) -> AppResult<()> {
        let message = OrderMessage::new(
            order.id,
            order.customer_name.clone(),
            order.customer_email.as_str(),
            kind,
        );
        self.events.publish(&message).await?;
        debug!(order_id = %order.id, event_type = kind.as_str(), "order event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryOrderRepository;
    use futures_util::StreamExt;
    use orderbus_domain::error::DomainError;
    use orderbus_domain::eventing::{CancellationToken, CompositeBus, MessageBus};

    struct Fixture {
        service: OrderService,
        repo: Arc<InMemoryOrderRepository>,
        bus: MessageBus<OrderMessage>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let bus = MessageBus::new("test");
        let service = OrderService::new(repo.clone(), Arc::new(bus.clone()));
        Fixture { service, repo, bus }
    }

    fn draft(items: Vec<OrderItemDraft>) -> OrderDraft {
        OrderDraft {
            customer_name: "Ana".into(),
            customer_email: "ana@example.com".into(),
            items,
        }
    }

    fn line(product_id: i64, quantity: i32, unit_price_cents: i64) -> OrderItemDraft {
        OrderItemDraft {
            product_id,
            quantity,
            unit_price_cents,
        }
    }

    async fn next_event(bus: &MessageBus<OrderMessage>) -> OrderMessage {
        bus.consume(CancellationToken::new())
            .next()
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn create_persists_then_publishes_created() {
        let f = fixture();
        let order = f
            .service
            .create(draft(vec![line(1, 2, 1_000), line(2, 1, 250)]))
            .await
            .unwrap();

        assert_eq!(order.id.value(), 1);
        assert_eq!(order.status, STATUS_PENDING);
        assert_eq!(order.total_cents, 2_250);
        assert!(order.items.iter().all(|item| item.order_id == order.id));
        assert_eq!(f.repo.len(), 1);

        let event = next_event(&f.bus).await;
        assert_eq!(event.order_id(), order.id);
        assert_eq!(event.kind(), OrderEventKind::Created);
        assert_eq!(event.customer_name(), "Ana");
        assert_eq!(event.customer_email(), "ana@example.com");
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_without_side_effects() {
        let f = fixture();
        let mut bad = draft(vec![line(1, 0, 100)]);
        assert!(matches!(
            f.service.create(bad.clone()).await,
            Err(AppError::Validation(_))
        ));
        bad.items.clear();
        bad.customer_email = "nope".into();
        assert!(f.service.create(bad).await.is_err());

        assert!(f.repo.is_empty());
        assert!(f.bus.is_empty());
    }

    #[tokio::test]
    async fn update_publishes_updated_and_missing_order_is_not_found() {
        let f = fixture();
        let order = f.service.create(draft(vec![])).await.unwrap();
        let _ = next_event(&f.bus).await;

        let updated = f
            .service
            .update(
                order.id,
                OrderChanges {
                    status: Some("Shipped".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, "Shipped");
        assert_eq!(next_event(&f.bus).await.kind(), OrderEventKind::Updated);

        let missing = OrderId::new(99).unwrap();
        assert!(matches!(
            f.service.update(missing, OrderChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(f.bus.is_empty());
    }

    #[tokio::test]
    async fn item_changes_recalculate_total_without_events() {
        let f = fixture();
        let order = f.service.create(draft(vec![line(1, 1, 500)])).await.unwrap();
        let _ = next_event(&f.bus).await;

        let added = f.service.add_item(order.id, line(2, 3, 100)).await.unwrap();
        assert_eq!(f.service.get(order.id).await.unwrap().unwrap().total_cents, 800);

        f.service
            .update_item(order.id, added.id, line(2, 1, 100))
            .await
            .unwrap();
        assert_eq!(f.service.get(order.id).await.unwrap().unwrap().total_cents, 600);

        f.service.remove_item(order.id, added.id).await.unwrap();
        f.service.remove_item(order.id, added.id).await.unwrap();
        let current = f.service.get(order.id).await.unwrap().unwrap();
        assert_eq!(current.total_cents, 500);
        assert_eq!(current.items.len(), 1);

        assert!(matches!(
            f.service.update_item(order.id, 999, line(1, 1, 1)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(f.bus.is_empty());
    }

    #[tokio::test]
    async fn overflowing_total_is_rejected_and_not_persisted() {
        let f = fixture();
        let big = line(1, 1, i64::MAX);
        assert!(matches!(
            f.service.create(draft(vec![big, line(2, 1, 1)])).await,
            Err(AppError::Validation(_))
        ));
        assert!(f.repo.is_empty());
        assert!(f.bus.is_empty());

        let order = f.service.create(draft(vec![big])).await.unwrap();
        assert!(matches!(
            f.service.add_item(order.id, line(2, 1, 1)).await,
            Err(AppError::Validation(_))
        ));
        let stored = f.service.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.total_cents, i64::MAX);
    }

    #[tokio::test]
    async fn delete_is_noop_for_missing_order() {
        let f = fixture();
        let order = f.service.create(draft(vec![])).await.unwrap();
        f.service.delete(order.id).await.unwrap();
        f.service.delete(order.id).await.unwrap();
        assert!(f.service.get(order.id).await.unwrap().is_none());
        f.service.recalculate_total(order.id).await.unwrap();
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let f = fixture();
        for name in ["first", "second", "third"] {
            let mut d = draft(vec![]);
            d.customer_name = name.into();
            f.service.create(d).await.unwrap();
        }
        let names: Vec<String> = f
            .service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|order| order.customer_name)
            .collect();
        assert_eq!(names, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn publish_failure_surfaces_after_persist() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let bus = MessageBus::with_capacity(
            "full",
            orderbus_domain::eventing::QueueCapacity::Bounded {
                capacity: 1,
                overflow: orderbus_domain::eventing::OverflowPolicy::Reject,
            },
        );
        let mut composite = CompositeBus::new();
        composite.subscribe(bus.clone());
        let service = OrderService::new(repo.clone(), Arc::new(composite));

        service.create(draft(vec![])).await.unwrap();
        let err = service.create(draft(vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::QueueFull { .. })));
        // 持久化先于发布
        assert_eq!(repo.len(), 2);
    }
}
