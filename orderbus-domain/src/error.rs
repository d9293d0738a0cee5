//! 领域层统一错误定义
//!
//! 聚焦事件系统（队列、总线、扇出）、重试与取消、值校验等最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
//! 领域动作（调用外部 API、发送邮件）本身的失败以 `anyhow::Error` 表达，
//! 视为可重试的瞬时失败，由重试策略消化；耗尽后才会转换为 `RetryExhausted`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 事件系统 ---
    #[error("event bus error: {reason}")]
    EventBus { reason: String },
    #[error("queue full: capacity={capacity}")]
    QueueFull { capacity: usize },
    #[error("partial fan-out: delivered={delivered}, failures={failures:?}")]
    PartialFanOut {
        delivered: usize,
        failures: Vec<String>,
    },

    // --- 重试/取消 ---
    #[error("operation cancelled")]
    Cancelled,
    #[error("retry exhausted: attempts={attempts}, reason={reason}")]
    RetryExhausted { attempts: u32, reason: String },

    // --- 后台任务 ---
    #[error("worker error: worker={worker}, reason={reason}")]
    Worker { worker: String, reason: String },

    // --- 值校验 ---
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

impl DomainError {
    pub fn event_bus(reason: impl Into<String>) -> Self {
        Self::EventBus {
            reason: reason.into(),
        }
    }

    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }

    /// 协作式关闭产生的取消不属于应用错误
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

/// 领域动作的执行结果：任意 `Err` 均视为可重试的瞬时失败
pub type ActionResult = anyhow::Result<()>;
