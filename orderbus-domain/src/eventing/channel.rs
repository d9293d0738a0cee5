//! 通道队列（ChannelQueue）
//!
//! 每个订阅者独占的 FIFO 队列：多生产者并发写入、单一逻辑消费者异步阻塞读取。
//! - 默认无界：`enqueue` 从不因消费者慢而挂起；
//! - 可选有界：满时挂起生产者（`OverflowPolicy::Wait`）或直接拒绝（`OverflowPolicy::Reject`）；
//! - 所有同步均封装在队列内部，生产者与消费者无需额外加锁。
//!
//! 注意：无界模式下慢消费者会让队列持续增长，生产者不受限时需改用有界容量。

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::{DomainError, DomainResult};

/// 队列容量策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueCapacity {
    #[default]
    Unbounded,
    Bounded {
        capacity: usize,
        overflow: OverflowPolicy,
    },
}

/// 有界队列已满时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// 挂起生产者直到有空位
    #[default]
    Wait,
    /// 立即以 `QueueFull` 失败
    Reject,
}

enum QueueSender<T> {
    Unbounded(mpsc::UnboundedSender<T>),
    Bounded(mpsc::Sender<T>, usize, OverflowPolicy),
}

enum QueueReceiver<T> {
    Unbounded(mpsc::UnboundedReceiver<T>),
    Bounded(mpsc::Receiver<T>),
}

impl<T> QueueReceiver<T> {
    async fn recv(&mut self) -> Option<T> {
        match self {
            Self::Unbounded(rx) => rx.recv().await,
            Self::Bounded(rx) => rx.recv().await,
        }
    }

    fn try_recv(&mut self) -> Option<T> {
        match self {
            Self::Unbounded(rx) => rx.try_recv().ok(),
            Self::Bounded(rx) => rx.try_recv().ok(),
        }
    }
}

/// 多生产者/单消费者的 FIFO 队列
pub struct ChannelQueue<T> {
    tx: QueueSender<T>,
    rx: Mutex<QueueReceiver<T>>,
    depth: AtomicUsize,
    capacity: QueueCapacity,
}

impl<T> Default for ChannelQueue<T> {
    fn default() -> Self {
        Self::new(QueueCapacity::Unbounded)
    }
}

impl<T> ChannelQueue<T> {
    /// 创建队列；有界容量为 0 时按 1 处理（tokio 通道不接受 0 容量）
    pub fn new(capacity: QueueCapacity) -> Self {
        let (tx, rx, capacity) = match capacity {
            QueueCapacity::Unbounded => {
                let (tx, rx) = mpsc::unbounded_channel();
                (
                    QueueSender::Unbounded(tx),
                    QueueReceiver::Unbounded(rx),
                    QueueCapacity::Unbounded,
                )
            }
            QueueCapacity::Bounded { capacity, overflow } => {
                let capacity = capacity.max(1);
                let (tx, rx) = mpsc::channel(capacity);
                (
                    QueueSender::Bounded(tx, capacity, overflow),
                    QueueReceiver::Bounded(rx),
                    QueueCapacity::Bounded { capacity, overflow },
                )
            }
        };

        Self {
            tx,
            rx: Mutex::new(rx),
            depth: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn capacity(&self) -> QueueCapacity {
        self.capacity
    }

    /// 当前排队（已入队、未出队）的元素数量
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 入队
    ///
    /// 无界模式下不会挂起；有界 + `Wait` 时挂起直到有空位。
    /// 挂起中的入队被丢弃（如超时）时不会留下任何痕迹。
    pub async fn enqueue(&self, item: T) -> DomainResult<()> {
        match &self.tx {
            QueueSender::Bounded(tx, _, OverflowPolicy::Wait) => {
                // 先占到空位再计数，挂起期间不计入 len
                let permit = tx
                    .reserve()
                    .await
                    .map_err(|_| DomainError::event_bus("queue closed"))?;
                self.depth.fetch_add(1, Ordering::AcqRel);
                permit.send(item);
                Ok(())
            }
            QueueSender::Unbounded(tx) => {
                // 先计数再发送，避免消费者在计数前取走元素导致下溢
                self.depth.fetch_add(1, Ordering::AcqRel);
                tx.send(item).map_err(|_| {
                    self.depth.fetch_sub(1, Ordering::AcqRel);
                    DomainError::event_bus("queue closed")
                })
            }
            QueueSender::Bounded(tx, capacity, OverflowPolicy::Reject) => {
                self.depth.fetch_add(1, Ordering::AcqRel);
                tx.try_send(item).map_err(|e| {
                    self.depth.fetch_sub(1, Ordering::AcqRel);
                    match e {
                        mpsc::error::TrySendError::Full(_) => DomainError::QueueFull {
                            capacity: *capacity,
                        },
                        mpsc::error::TrySendError::Closed(_) => {
                            DomainError::event_bus("queue closed")
                        }
                    }
                })
            }
        }
    }

    /// 出队：挂起直到有元素可取，或取消信号触发（返回 `Cancelled`）
    ///
    /// 取消优先于已就绪的元素。
    pub async fn dequeue(&self, token: &CancellationToken) -> DomainResult<T> {
        let mut rx = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DomainError::Cancelled),
            guard = self.rx.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(DomainError::Cancelled),
            item = rx.recv() => match item {
                Some(item) => {
                    self.depth.fetch_sub(1, Ordering::AcqRel);
                    Ok(item)
                }
                None => Err(DomainError::event_bus("queue closed")),
            },
        }
    }

    /// 非阻塞出队；消费者正在等待或队列为空时返回 `None`
    pub fn try_dequeue(&self) -> Option<T> {
        let mut rx = self.rx.try_lock().ok()?;
        let item = rx.try_recv()?;
        self.depth.fetch_sub(1, Ordering::AcqRel);
        Some(item)
    }
}
