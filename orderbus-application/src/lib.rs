//! 订单应用层（orderbus-application）
//!
//! 位于事件核心之外的协作者：
//! - 订单模型、仓储与应用服务：持久化成功后经扇出总线发布订单事件；
//! - 外部 API 确认动作与订单确认邮件动作：由 Worker 在重试策略下执行；
//! - SMTP 配置加载。
//!
pub mod email;
pub mod error;
pub mod external_api;
pub mod order;
pub mod repository;
pub mod service;

pub use email::{EmailConfirmationAction, LoggingSessionFactory, SmtpSettings};
pub use error::{AppError, AppResult};
pub use external_api::{ExternalApiAction, SimulatedExternalApi};
pub use repository::InMemoryOrderRepository;
pub use service::OrderService;
