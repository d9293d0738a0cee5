//! 扇出总线（CompositeBus）
//!
//! 持有一组按注册顺序排列的订阅者总线，`publish` 将同一事件复制到每一条总线：
//! - 复制而非分区：每个订阅者收到内容相同的事件；
//! - 按注册顺序逐个 `await`，全部入队后才返回给生产者；
//! - 订阅仅在启动阶段进行（`&mut self`），不支持取消订阅。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain_event::DomainEvent;
use crate::error::{DomainError, DomainResult as Result};
use crate::eventing::EventBus;

/// 某个订阅者发布失败时的扇出策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOutPolicy {
    /// 传播首个失败，不再尝试后续订阅者
    #[default]
    FailFast,
    /// 继续投递其余订阅者，最后以 `PartialFanOut` 汇总失败
    BestEffort,
}

pub struct CompositeBus<E> {
    subscribers: Vec<Arc<dyn EventBus<E>>>,
    policy: FanOutPolicy,
}

impl<E> Default for CompositeBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            policy: FanOutPolicy::default(),
        }
    }
}

impl<E> CompositeBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: FanOutPolicy) -> Self {
        Self {
            subscribers: Vec::new(),
            policy,
        }
    }

    /// 注册扇出目标；应在首次 `publish` 之前完成
    pub fn subscribe<B>(&mut self, bus: B)
    where
        B: EventBus<E> + 'static,
    {
        self.subscribers.push(Arc::new(bus));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn policy(&self) -> FanOutPolicy {
        self.policy
    }
}

#[async_trait]
impl<E> EventBus<E> for CompositeBus<E>
where
    E: DomainEvent,
{
    async fn publish(&self, event: &E) -> Result<()> {
        match self.policy {
            FanOutPolicy::FailFast => {
                for bus in &self.subscribers {
                    bus.publish(event).await?;
                }
                Ok(())
            }
            FanOutPolicy::BestEffort => {
                let mut failures = Vec::new();
                for (index, bus) in self.subscribers.iter().enumerate() {
                    if let Err(err) = bus.publish(event).await {
                        warn!(
                            subscriber = index,
                            event_type = event.event_type(),
                            aggregate_id = %event.aggregate_id(),
                            error = %err,
                            "fan-out to subscriber failed"
                        );
                        failures.push(format!("subscriber {index}: {err}"));
                    }
                }

                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(DomainError::PartialFanOut {
                        delivered: self.subscribers.len() - failures.len(),
                        failures,
                    })
                }
            }
        }
    }
}
