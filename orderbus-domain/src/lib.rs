//! 订单事件扇出总线基础库（orderbus-domain）
//!
//! 提供进程内事件扇出与弹性后台消费的通用构件：
//! - 领域事件（`domain_event`）：不可变的 `OrderMessage` 与 `DomainEvent` 接口
//! - 值对象（`value_object`）：`OrderId`、`EmailAddress` 等带校验的值
//! - 事件系统（`eventing`）：队列、总线、扇出、重试策略与 Worker
//! - 统一错误（`error`）：队列/总线、取消、重试耗尽等错误分类
//!
//! 本 crate 不涉及持久化与外部 I/O，领域动作（调用外部 API、发送邮件）以
//! `EventAction` 接口的形式由上层注入。
//!
//! 典型用法：
//! 1. 为每个消费组创建一条 `MessageBus`，并注册到同一个 `CompositeBus`；
//! 2. 为每条总线构建一个 `Worker`，注入 `EventAction` 与 `RetryPolicy`；
//! 3. 以同一个 `CancellationToken` 启动所有 Worker，生产者只调用 `CompositeBus::publish`；
//! 4. 关闭时取消令牌并等待各 `WorkerHandle` 结束。
//!
pub mod domain_event;
pub mod error;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod value_object;
