use std::fmt;

/// 领域事件载荷需要满足的通用能力边界
///
/// 事件一经构造即不可变，按值克隆或以共享引用传递给各订阅者。
pub trait DomainEvent: Clone + fmt::Debug + Send + Sync + 'static {
    /// 事件类型（形如 `Created`，用于处理器匹配与日志）
    fn event_type(&self) -> &str;

    /// 事件所属聚合的标识（用于日志关联）
    fn aggregate_id(&self) -> String;
}
