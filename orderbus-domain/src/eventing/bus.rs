//! 事件总线（EventBus）协议
//!
//! 定义事件发布的统一抽象：单个订阅者总线（`MessageBus`）与扇出复制器
//! （`CompositeBus`）都实现该协议，生产者只依赖 `publish`。
//!
use crate::error::DomainResult as Result;
use async_trait::async_trait;

/// 事件总线：负责接收并分发事件
#[async_trait]
pub trait EventBus<E>: Send + Sync {
    async fn publish(&self, event: &E) -> Result<()>;

    /// 按顺序逐条发布，遇到首个失败即返回
    async fn publish_batch(&self, events: &[E]) -> Result<()>
    where
        E: Sync,
    {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
