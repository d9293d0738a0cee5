//! 领域事件（Domain Event）
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`），以及订单领域发布的
//! 不可变事件 `OrderMessage` 与其事件类型 `OrderEventKind`。

mod domain_event_trait;
mod order_message;

pub use domain_event_trait::DomainEvent;
pub use order_message::{OrderEventKind, OrderMessage};
