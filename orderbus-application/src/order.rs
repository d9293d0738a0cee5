//! 订单模型与输入校验
//!
//! 金额统一以分（cents）为单位保存，避免浮点误差。
//!
use chrono::{DateTime, Utc};
use orderbus_domain::value_object::{EmailAddress, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// 新建订单的默认状态
pub const STATUS_PENDING: &str = "Pending";

pub const CUSTOMER_NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: EmailAddress,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub total_cents: i64,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// 所有明细小计之和；溢出时返回 `Validation`
    pub fn items_total_cents(&self) -> AppResult<i64> {
        self.items.iter().try_fold(0i64, |total, item| {
            total
                .checked_add(item.line_total_cents()?)
                .ok_or_else(|| AppError::Validation("order total is out of range".into()))
        })
    }

    pub fn recalculate_total(&mut self) -> AppResult<()> {
        self.total_cents = self.items_total_cents()?;
        Ok(())
    }

    pub fn item(&self, item_id: i64) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl OrderItem {
    pub fn line_total_cents(&self) -> AppResult<i64> {
        line_total(self.quantity, self.unit_price_cents)
    }
}

fn line_total(quantity: i32, unit_price_cents: i64) -> AppResult<i64> {
    i64::from(quantity)
        .checked_mul(unit_price_cents)
        .ok_or_else(|| AppError::Validation("line total is out of range".into()))
}

/// 创建订单的输入
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub items: Vec<OrderItemDraft>,
}

/// 新增/修改明细的输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDraft {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// 修改订单头信息的输入；`None` 表示不修改
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderChanges {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: Option<String>,
}

/// 校验客户姓名，返回去除首尾空白后的值
pub fn validate_customer_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("customer name is required".into()));
    }
    if name.chars().count() > CUSTOMER_NAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "customer name must be at most {CUSTOMER_NAME_MAX_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn validate_customer_email(email: &str) -> AppResult<EmailAddress> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("customer email is required".into()));
    }
    EmailAddress::parse(email).map_err(|err| AppError::Validation(err.to_string()))
}

impl OrderItemDraft {
    pub fn validate(&self) -> AppResult<()> {
        if self.product_id <= 0 {
            return Err(AppError::Validation("product id must be positive".into()));
        }
        if self.quantity < 1 {
            return Err(AppError::Validation("quantity must be at least 1".into()));
        }
        if self.unit_price_cents < 0 {
            return Err(AppError::Validation("unit price must not be negative".into()));
        }
        line_total(self.quantity, self.unit_price_cents)?;
        Ok(())
    }
}
