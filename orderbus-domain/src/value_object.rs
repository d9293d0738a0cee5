//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑。
//!

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 订单标识（正整数）
///
/// 仅标识订单本身，不保证事件唯一：同一订单在不同时间可以产生多条事件。
///
/// # 示例
///
/// ```
/// use orderbus_domain::value_object::OrderId;
///
/// let id = OrderId::new(42).unwrap();
/// assert_eq!(id.value(), 42);
/// assert!(OrderId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct OrderId(i64);

impl OrderId {
    pub fn new(value: i64) -> DomainResult<Self> {
        let id = Self(value);
        id.validate()?;
        Ok(id)
    }

    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl ValueObject for OrderId {
    type Error = DomainError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.0 <= 0 {
            return Err(DomainError::invalid_value(format!(
                "order id must be positive, got {}",
                self.0
            )));
        }
        Ok(())
    }
}

impl TryFrom<i64> for OrderId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderId> for i64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 邮箱地址
///
/// 校验规则保持最小：非空、不超过 200 字符、恰好一个 `@` 且两侧非空。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub const MAX_LEN: usize = 200;

    pub fn parse(value: impl Into<String>) -> DomainResult<Self> {
        let email = Self(value.into().trim().to_string());
        email.validate()?;
        Ok(email)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for EmailAddress {
    type Error = DomainError;

    fn validate(&self) -> Result<(), Self::Error> {
        let value = self.0.as_str();
        if value.is_empty() {
            return Err(DomainError::invalid_value("email is required"));
        }
        if value.chars().count() > Self::MAX_LEN {
            return Err(DomainError::invalid_value(format!(
                "email must be at most {} characters",
                Self::MAX_LEN
            )));
        }

        let mut parts = value.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(DomainError::invalid_value(format!("invalid email: {value}"))),
        }
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_rejects_non_positive() {
        assert!(OrderId::new(1).is_ok());
        assert!(matches!(
            OrderId::new(0),
            Err(DomainError::InvalidValue { .. })
        ));
        assert!(OrderId::new(-7).is_err());
    }

    #[test]
    fn order_id_serde_is_transparent_and_validated() {
        let id = OrderId::new(42).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert!(serde_json::from_str::<OrderId>("0").is_err());
    }

    #[test]
    fn email_validation() {
        assert_eq!(
            EmailAddress::parse("  ana@example.com ").unwrap().as_str(),
            "ana@example.com"
        );
        for bad in ["", "ana", "@example.com", "ana@", "a@b@c"] {
            assert!(EmailAddress::parse(bad).is_err(), "{bad} should be rejected");
        }
        let long = format!("{}@example.com", "a".repeat(200));
        assert!(EmailAddress::parse(long).is_err());
    }
}
