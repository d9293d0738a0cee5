//! 订单确认邮件
//!
//! - `EmailSender`：发送一封 HTML 邮件；
//! - `EmailSessionFactory`：每次尝试打开一个独立会话，尝试结束（无论成败）即释放；
//! - `EmailConfirmationAction`：只处理 `Created` 事件的 Worker 动作。
//!
//! 本 crate 只提供记录日志的发送实现，真实的 SMTP 传输由上层接入。
//!
use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use orderbus_domain::domain_event::{OrderEventKind, OrderMessage};
use orderbus_domain::error::ActionResult;
use orderbus_domain::eventing::{CancellationToken, EventAction, HandledEventType};
use orderbus_domain::value_object::OrderId;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_FROM_NAME: &str = "Order System";

/// SMTP 连接与发件人配置
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_name: String,
    pub from_email: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("from_name", &self.from_name)
            .field("from_email", &self.from_email)
            .finish()
    }
}

impl SmtpSettings {
    /// 从 `ORDERBUS_SMTP_*` / `ORDERBUS_FROM_*` 环境变量读取
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("ORDERBUS_SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|err| AppError::Config(format!("ORDERBUS_SMTP_PORT={raw}: {err}")))?,
            None => DEFAULT_SMTP_PORT,
        };
        let user = get("ORDERBUS_SMTP_USER").unwrap_or_default();

        Ok(Self {
            host: get("ORDERBUS_SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port,
            password: get("ORDERBUS_SMTP_PASS").unwrap_or_default(),
            from_name: get("ORDERBUS_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            from_email: get("ORDERBUS_FROM_EMAIL").unwrap_or_else(|| user.clone()),
            user,
        })
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
        token: CancellationToken,
    ) -> anyhow::Result<()>;
}

/// 邮件会话工厂：会话在被 drop 时释放
#[async_trait]
pub trait EmailSessionFactory: Send + Sync {
    async fn open(&self) -> anyhow::Result<Box<dyn EmailSender>>;
}

/// 只记录日志、不真正投递的发送实现
#[derive(Debug, Clone)]
pub struct LoggingEmailSender {
    from_name: String,
    from_email: String,
}

impl LoggingEmailSender {
    pub fn new(from_name: impl Into<String>, from_email: impl Into<String>) -> Self {
        Self {
            from_name: from_name.into(),
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
        _token: CancellationToken,
    ) -> anyhow::Result<()> {
        info!(
            from = %format_args!("{} <{}>", self.from_name, self.from_email),
            to = %format_args!("{to_name} <{to_email}>"),
            subject,
            "email sent"
        );
        debug!(body_len = html_body.len(), "email body");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSessionFactory {
    settings: SmtpSettings,
}

impl LoggingSessionFactory {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl EmailSessionFactory for LoggingSessionFactory {
    async fn open(&self) -> anyhow::Result<Box<dyn EmailSender>> {
        debug!(host = %self.settings.host, port = self.settings.port, "email session opened");
        Ok(Box::new(LoggingEmailSender::new(
            self.settings.from_name.clone(),
            self.settings.from_email.clone(),
        )))
    }
}

pub fn confirmation_subject(order_id: OrderId) -> String {
    format!("Order #{order_id} - Confirmation")
}

pub fn confirmation_body(event: &OrderMessage) -> String {
    format!(
        "<html><body>\
         <h2>Order Confirmation</h2>\
         <p>Dear {name},</p>\
         <p>Thank you for your order! Your order <strong>#{id}</strong> has been received and is being processed.</p>\
         <p>We will notify you when your order ships.</p>\
         <p>Best regards,<br/>The Order Team</p>\
         </body></html>",
        name = escape_html(event.customer_name()),
        id = event.order_id(),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 向客户发送订单确认邮件
pub struct EmailConfirmationAction {
    sessions: Arc<dyn EmailSessionFactory>,
}

impl EmailConfirmationAction {
    pub fn new(sessions: Arc<dyn EmailSessionFactory>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl EventAction<OrderMessage> for EmailConfirmationAction {
    fn action_name(&self) -> &str {
        "email-confirmation"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::One(OrderEventKind::Created.as_str().to_string())
    }

    async fn execute(&self, event: &OrderMessage, token: CancellationToken) -> ActionResult {
        let subject = confirmation_subject(event.order_id());
        let body = confirmation_body(event);

        let session = self.sessions.open().await.context("open email session")?;
        session
            .send(
                event.customer_email(),
                event.customer_name(),
                &subject,
                &body,
                token,
            )
            .await
            .with_context(|| format!("send confirmation for order {}", event.order_id()))?;

        info!(order_id = %event.order_id(), to = event.customer_email(), "confirmation email sent");
        Ok(())
    }
}
