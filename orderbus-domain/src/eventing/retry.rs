//! 重试策略（RetryPolicy）
//!
//! 以指数退避包装一次领域动作：
//! - 首次执行失败后最多重试 `max_retries` 次（默认 3 次，共 4 次执行）；
//! - 第 n 次重试前等待 `base_delay × multiplier^(n-1)`（默认 2s、4s、8s，无抖动）；
//! - 每次重试前先 `await` 观察者钩子，再开始等待，保证日志顺序与实际重试顺序一致；
//! - 等待期间取消会中止整个重试序列并返回 `Cancelled`。
//!
//! 策略本身无状态，每次 `execute` 都从第 0 次开始计数。

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{DomainError, DomainResult};

/// 一次重试的结构化记录（在等待开始之前交给观察者）
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// 重试序号（从 1 开始）
    pub attempt: u32,
    /// 本次重试前的等待时长
    pub delay: Duration,
    /// 导致重试的失败原因
    pub error: &'a anyhow::Error,
}

/// 重试观察者：用于日志/指标，不改变控制流
///
/// 钩子返回的错误只会被记录，不会中止重试序列。
#[async_trait]
pub trait RetryObserver: Send + Sync {
    async fn on_retry(&self, event: &RetryEvent<'_>) -> anyhow::Result<()>;
}

/// 不做任何事的观察者
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRetryObserver;

#[async_trait]
impl RetryObserver for NoopRetryObserver {
    async fn on_retry(&self, _event: &RetryEvent<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 以 `warn!` 输出每次重试的观察者
#[derive(Debug, Clone)]
pub struct TracingRetryObserver {
    label: String,
}

impl TracingRetryObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl RetryObserver for TracingRetryObserver {
    async fn on_retry(&self, event: &RetryEvent<'_>) -> anyhow::Result<()> {
        warn!(
            label = %self.label,
            attempt = event.attempt,
            delay_secs = event.delay.as_secs_f64(),
            error = %event.error,
            "[{}] retry {} after {}s",
            self.label,
            event.attempt,
            event.delay.as_secs_f64(),
        );
        Ok(())
    }
}

/// 有界次数的指数退避重试策略
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
    observer: Arc<dyn RetryObserver>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: None,
            observer: Arc::new(NoopRetryObserver),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("multiplier", &self.multiplier)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// 不重试：失败一次即耗尽
    pub fn no_retry() -> Self {
        Self::default().with_max_retries(0)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// 退避倍数；小于 1 时按 1 处理（即固定间隔）
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// 总执行次数上限（首次 + 重试）
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 第 `retry_index` 次重试（从 0 开始）前的等待时长
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = i32::try_from(retry_index).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// 执行动作，失败时按策略重试
    ///
    /// - 成功立即返回；
    /// - 重试耗尽返回 `RetryExhausted`（携带最后一次失败的完整原因链）；
    /// - 等待期间取消，或动作失败时已取消，返回 `Cancelled`。
    pub async fn execute<T, F, Fut>(&self, token: &CancellationToken, mut action: F) -> DomainResult<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let err = match action(token.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if token.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            if attempt >= self.max_retries {
                return Err(DomainError::RetryExhausted {
                    attempts: attempt + 1,
                    reason: format!("{err:#}"),
                });
            }

            let delay = self.delay_for(attempt);
            let event = RetryEvent {
                attempt: attempt + 1,
                delay,
                error: &err,
            };
            if let Err(hook_err) = self.observer.on_retry(&event).await {
                warn!(error = %hook_err, "retry observer failed");
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(DomainError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
