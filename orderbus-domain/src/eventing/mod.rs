//! 事件子系统（eventing）
//!
//! 提供进程内事件扇出与可靠后台消费的基础抽象与运行时：
//! - `ChannelQueue`：每个订阅者独占的 FIFO 队列（默认无界，可配置背压）；
//! - `EventBus` / `MessageBus`：统一发布接口与单消费组总线；
//! - `CompositeBus`：把一次发布复制到所有已注册总线；
//! - `RetryPolicy`：有界次数的指数退避执行包装，附带重试观察者；
//! - `EventAction` / `Worker`：在重试策略下逐条执行领域动作的长驻消费循环。
//!
//! 不提供跨进程/持久化投递、恰好一次语义、死信与重放。
//!
pub mod bus;
pub mod bus_inmemory;
pub mod channel;
pub mod composite;
pub mod handler;
pub mod retry;
pub mod worker;

pub use bus::EventBus;
pub use bus_inmemory::MessageBus;
pub use channel::{ChannelQueue, OverflowPolicy, QueueCapacity};
pub use composite::{CompositeBus, FanOutPolicy};
pub use handler::{EventAction, HandledEventType};
pub use retry::{NoopRetryObserver, RetryEvent, RetryObserver, RetryPolicy, TracingRetryObserver};
pub use worker::{ExhaustionPolicy, Worker, WorkerHandle, WorkerStats};

// 重导出取消令牌，调用方无需直接依赖 tokio-util
pub use tokio_util::sync::CancellationToken;
