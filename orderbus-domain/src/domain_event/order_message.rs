use std::fmt;

use serde::{Deserialize, Serialize};

use super::DomainEvent;
use crate::value_object::OrderId;

/// 订单事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderEventKind {
    Created,
    Updated,
}

impl OrderEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
        }
    }
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单事件：在订单状态变更持久化之后发布
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
    order_id: OrderId,
    customer_name: String,
    customer_email: String,
    kind: OrderEventKind,
}

impl OrderMessage {
    pub fn new(
        order_id: OrderId,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        kind: OrderEventKind,
    ) -> Self {
        Self {
            order_id,
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            kind,
        }
    }

    pub fn created(
        order_id: OrderId,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
    ) -> Self {
        Self::new(order_id, customer_name, customer_email, OrderEventKind::Created)
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn kind(&self) -> OrderEventKind {
        self.kind
    }
}

impl DomainEvent for OrderMessage {
    fn event_type(&self) -> &str {
        self.kind.as_str()
    }

    fn aggregate_id(&self) -> String {
        self.order_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kind_as_text() {
        let msg = OrderMessage::created(OrderId::new(42).unwrap(), "Ana", "ana@example.com");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["orderId"], 42);
        assert_eq!(json["kind"], "Created");
        assert_eq!(msg.event_type(), "Created");
        assert_eq!(msg.aggregate_id(), "42");
    }
}
