//! 事件动作（EventAction）
//!
//! 定义 Worker 针对每条事件执行的领域动作与元信息（名称、处理的事件类型）。
//! 动作可能失败（网络错误、超时、下游拒绝），失败统一视为可重试。
//!
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ActionResult;

#[derive(Clone, Debug)]
pub enum HandledEventType {
    One(String),
    Many(Vec<String>),
    All,
}

impl HandledEventType {
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            Self::All => true,
            Self::One(t) => t == event_type,
            Self::Many(ts) => ts.iter().any(|t| t == event_type),
        }
    }
}

/// 事件动作：对单条事件执行一次副作用
#[async_trait]
pub trait EventAction<E>: Send + Sync {
    /// 动作名称（用于日志与统计）
    fn action_name(&self) -> &str;

    /// 返回该动作处理的事件类型
    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::All
    }

    /// 执行一次动作
    ///
    /// 执行中的动作不会被强制中断；涉及挂起 I/O 时应自行观察 `token` 并尽快退出。
    async fn execute(&self, event: &E, token: CancellationToken) -> ActionResult;
}
