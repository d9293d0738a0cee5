//! 内存版订阅者总线（MessageBus）
//!
//! 包装一个 `ChannelQueue`，满足 `EventBus` 协议：
//! - `publish`：将事件克隆入队，无界队列下实际不阻塞；
//! - `consume`：返回 `'static` 生命周期的有序事件流，便于在 `tokio::spawn` 中消费；
//! - 典型用途：进程内每个消费组（Worker）独占一条总线。
//!
//! 注意：该实现不做持久化，进程退出时队列中的事件随之丢弃。

use std::sync::Arc;

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::stream;
use tokio_util::sync::CancellationToken;

use crate::domain_event::DomainEvent;
use crate::error::DomainResult as Result;
use crate::eventing::EventBus;
use crate::eventing::channel::{ChannelQueue, QueueCapacity};

/// 单消费组的 FIFO 事件总线
pub struct MessageBus<E> {
    name: Arc<str>,
    queue: Arc<ChannelQueue<E>>,
}

impl<E> Clone for MessageBus<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<E> MessageBus<E> {
    /// 创建一个无界总线，`name` 用于日志
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, QueueCapacity::Unbounded)
    }

    pub fn with_capacity(name: impl Into<String>, capacity: QueueCapacity) -> Self {
        Self {
            name: Arc::from(name.into()),
            queue: Arc::new(ChannelQueue::new(capacity)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 尚未被消费的事件数量
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<E> MessageBus<E>
where
    E: Send + 'static,
{
    /// 返回有序、惰性、可能无限的事件流
    ///
    /// - 请求下一条时若已取消：流正常结束；
    /// - 等待期间被取消：产出一次 `Err(Cancelled)` 后结束。
    pub fn consume(&self, token: CancellationToken) -> BoxStream<'static, Result<E>> {
        let queue = self.queue.clone();
        let stream = stream::unfold(Some((queue, token)), |state| async move {
            let (queue, token) = state?;
            if token.is_cancelled() {
                return None;
            }
            match queue.dequeue(&token).await {
                Ok(event) => Some((Ok(event), Some((queue, token)))),
                Err(err) => Some((Err(err), None)),
            }
        });
        Box::pin(stream)
    }
}

#[async_trait]
impl<E> EventBus<E> for MessageBus<E>
where
    E: DomainEvent,
{
    async fn publish(&self, event: &E) -> Result<()> {
        self.queue.enqueue(event.clone()).await
    }
}
