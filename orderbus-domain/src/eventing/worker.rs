//! 后台消费者（Worker）
//!
//! 绑定一条 `MessageBus` 的长驻消费循环：
//! - 按 FIFO 顺序逐条取出事件，严格单飞（上一条完成前不会处理下一条）；
//! - 对每条事件在 `RetryPolicy` 下执行领域动作；
//! - 空闲等待时收到取消信号则干净退出；
//! - 重试耗尽时按 `ExhaustionPolicy` 停止（默认）或跳过继续。
//!
//! 状态流转：`Idle → Waiting → Executing → Idle`，`Waiting → Stopped`（取消），
//! `Executing → Stopped(Faulted)`（重试耗尽且策略为 `Halt`）。
//!
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bon::Builder;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::handler::EventAction;
use super::retry::RetryPolicy;
use super::MessageBus;
use crate::domain_event::DomainEvent;
use crate::error::{DomainError, DomainResult};

/// 重试耗尽后的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// 传播 `RetryExhausted` 并终止消费循环；已入队的事件保持未处理
    #[default]
    Halt,
    /// 记录错误后继续处理下一条事件
    SkipAndContinue,
}

/// Worker 运行统计
#[derive(Debug, Default)]
pub struct WorkerStats {
    dequeued: AtomicU64,
    succeeded: AtomicU64,
    skipped: AtomicU64,
    attempts: AtomicU64,
    exhausted: AtomicU64,
}

impl WorkerStats {
    /// 已从总线取出的事件数
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Acquire)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Acquire)
    }

    /// 因动作不处理该事件类型而跳过的事件数
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Acquire)
    }

    /// 动作被调用的总次数（含重试）
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Acquire)
    }
}

/// 单总线、单飞的事件消费者
#[derive(Builder)]
pub struct Worker<E> {
    #[builder(into)]
    name: String,
    bus: MessageBus<E>,
    action: Arc<dyn EventAction<E>>,
    #[builder(default)]
    retry: RetryPolicy,
    #[builder(default)]
    on_exhausted: ExhaustionPolicy,
    #[builder(skip)]
    stats: Arc<WorkerStats>,
}

impl<E> Worker<E>
where
    E: DomainEvent,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// 在 tokio 任务中启动消费循环
    pub fn spawn(self, token: CancellationToken) -> WorkerHandle {
        let name = self.name.clone();
        let stats = self.stats.clone();
        let join = tokio::spawn(async move { self.run(token).await });

        WorkerHandle { name, stats, join }
    }

    /// 运行消费循环，直到取消（返回 `Ok`）或发生未处理的失败（返回 `Err`）
    pub async fn run(&self, token: CancellationToken) -> DomainResult<()> {
        info!(worker = %self.name, bus = self.bus.name(), "worker started");

        let mut events = self.bus.consume(token.clone());
        let outcome = loop {
            let event = match events.next().await {
                Some(Ok(event)) => event,
                Some(Err(DomainError::Cancelled)) | None => break Ok(()),
                Some(Err(err)) => break Err(err),
            };
            self.stats.dequeued.fetch_add(1, Ordering::AcqRel);

            match self.process(&event, &token).await {
                Ok(()) => {}
                Err(DomainError::Cancelled) => {
                    info!(
                        worker = %self.name,
                        aggregate_id = %event.aggregate_id(),
                        "cancelled while processing event"
                    );
                    break Ok(());
                }
                Err(err) => break Err(err),
            }
        };

        match &outcome {
            Ok(()) => info!(worker = %self.name, "worker stopped"),
            Err(err) => error!(worker = %self.name, error = %err, "worker stopped with error"),
        }
        outcome
    }

    async fn process(&self, event: &E, token: &CancellationToken) -> DomainResult<()> {
        let event_type = event.event_type();
        if !self.action.handled_event_type().matches(event_type) {
            self.stats.skipped.fetch_add(1, Ordering::AcqRel);
            debug!(worker = %self.name, event_type, "event type not handled, skipped");
            return Ok(());
        }

        debug!(
            worker = %self.name,
            action = self.action.action_name(),
            event_type,
            aggregate_id = %event.aggregate_id(),
            "processing event"
        );

        let action = &self.action;
        let stats = &self.stats;
        let result = self
            .retry
            .execute(token, move |ct| {
                stats.attempts.fetch_add(1, Ordering::AcqRel);
                action.execute(event, ct)
            })
            .await;

        match result {
            Ok(()) => {
                self.stats.succeeded.fetch_add(1, Ordering::AcqRel);
                debug!(worker = %self.name, event_type, "event processed");
                Ok(())
            }
            Err(err @ DomainError::RetryExhausted { .. }) => {
                self.stats.exhausted.fetch_add(1, Ordering::AcqRel);
                match self.on_exhausted {
                    ExhaustionPolicy::Halt => {
                        error!(
                            worker = %self.name,
                            event_type,
                            aggregate_id = %event.aggregate_id(),
                            error = %err,
                            "retries exhausted, halting worker"
                        );
                        Err(err)
                    }
                    ExhaustionPolicy::SkipAndContinue => {
                        error!(
                            worker = %self.name,
                            event_type,
                            aggregate_id = %event.aggregate_id(),
                            error = %err,
                            "retries exhausted, skipping event"
                        );
                        Ok(())
                    }
                }
            }
            Err(err) => Err(err),
        }
    }
}

/// Worker 运行句柄：用于查询统计与等待任务结束
pub struct WorkerHandle {
    name: String,
    stats: Arc<WorkerStats>,
    join: JoinHandle<DomainResult<()>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// 等待消费循环结束；任务 panic 时返回 `DomainError::Worker`
    pub async fn join(self) -> DomainResult<()> {
        match self.join.await {
            Ok(result) => result,
            Err(join_err) => Err(DomainError::Worker {
                worker: self.name,
                reason: join_err.to_string(),
            }),
        }
    }
}
