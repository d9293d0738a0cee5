//! 订单仓储
//!
//! 订单与其明细作为一个整体读写；id 由仓储分配。
//!
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use orderbus_domain::value_object::OrderId;

use crate::error::{AppError, AppResult};
use crate::order::Order;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Order>>;

    async fn get(&self, id: OrderId) -> AppResult<Option<Order>>;

    /// 新增或覆盖整张订单（含明细）
    async fn save(&self, order: &Order) -> AppResult<()>;

    /// 删除订单及其明细，返回是否存在
    async fn delete(&self, id: OrderId) -> AppResult<bool>;

    async fn next_order_id(&self) -> AppResult<OrderId>;

    async fn next_item_id(&self) -> AppResult<i64>;
}

/// 基于内存的订单仓储，id 从 1 开始单调递增
pub struct InMemoryOrderRepository {
    orders: DashMap<OrderId, Order>,
    order_seq: AtomicI64,
    item_seq: AtomicI64,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self {
            orders: DashMap::new(),
            order_seq: AtomicI64::new(0),
            item_seq: AtomicI64::new(0),
        }
    }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn list(&self) -> AppResult<Vec<Order>> {
        Ok(self.orders.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn get(&self, id: OrderId) -> AppResult<Option<Order>> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, order: &Order) -> AppResult<()> {
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> AppResult<bool> {
        Ok(self.orders.remove(&id).is_some())
    }

    async fn next_order_id(&self) -> AppResult<OrderId> {
        let next = self.order_seq.fetch_add(1, Ordering::AcqRel) + 1;
        OrderId::new(next).map_err(|err| AppError::Infra(err.to_string()))
    }

    async fn next_item_id(&self) -> AppResult<i64> {
        Ok(self.item_seq.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::STATUS_PENDING;
    use chrono::Utc;
    use orderbus_domain::value_object::EmailAddress;

    fn order(id: OrderId) -> Order {
        Order {
            id,
            customer_name: "Ana".into(),
            customer_email: EmailAddress::parse("ana@example.com").unwrap(),
            order_date: Utc::now(),
            status: STATUS_PENDING.into(),
            total_cents: 0,
            items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn ids_start_at_one_and_increase() {
        let repo = InMemoryOrderRepository::new();
        assert_eq!(repo.next_order_id().await.unwrap().value(), 1);
        assert_eq!(repo.next_order_id().await.unwrap().value(), 2);
        assert_eq!(repo.next_item_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn save_get_delete() {
        let repo = InMemoryOrderRepository::new();
        let id = repo.next_order_id().await.unwrap();
        repo.save(&order(id)).await.unwrap();

        assert_eq!(repo.get(id).await.unwrap().unwrap().customer_name, "Ana");
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert!(repo.get(id).await.unwrap().is_none());
        assert!(repo.is_empty());
    }
}
