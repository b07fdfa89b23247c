//! Receipt Model (票据号预留)

use serde::{Deserialize, Serialize};
use std::fmt;

/// 票据序列号: 小票 (boleta)
pub const BOLETA_SERIES: &str = "B001";
/// 票据序列号: 发票 (factura)
pub const FACTURA_SERIES: &str = "F001";

/// 票据号补零位数
pub const RECEIPT_NUMBER_WIDTH: usize = 7;

/// 票据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Boleta,
    Factura,
}

impl DocumentType {
    /// 调用方声明的类型 → 票据类型
    ///
    /// 仅做大小写无关的前缀判断: `f…` 为发票，其余一律为小票。
    pub fn from_declared(declared: &str) -> Self {
        match declared.trim().chars().next() {
            Some(c) if c.eq_ignore_ascii_case(&'f') => DocumentType::Factura,
            _ => DocumentType::Boleta,
        }
    }

    pub fn series(&self) -> &'static str {
        match self {
            DocumentType::Boleta => BOLETA_SERIES,
            DocumentType::Factura => FACTURA_SERIES,
        }
    }

    /// 序列号 → 票据类型 (未知序列返回 None)
    pub fn from_series(series: &str) -> Option<Self> {
        match series {
            BOLETA_SERIES => Some(DocumentType::Boleta),
            FACTURA_SERIES => Some(DocumentType::Factura),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Boleta => f.write_str("boleta"),
            DocumentType::Factura => f.write_str("factura"),
        }
    }
}

/// 计数器值格式化为 7 位补零票据号
pub fn format_receipt_number(n: u64) -> String {
    format!("{:0width$}", n, width = RECEIPT_NUMBER_WIDTH)
}

/// 预留状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Reserved,
    Used,
    Cancelled,
}

/// 票据号来源
///
/// `Fallback` 号码不是计数器发出的，对账时必须单独核对。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberOrigin {
    #[default]
    Sequential,
    Fallback,
}

/// 票据号预留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptReservation {
    pub id: String,
    pub series: String,
    /// 7 位补零
    pub number: String,
    pub order_id: Option<String>,
    pub reserved_by: String,
    pub status: ReservationStatus,
    #[serde(default)]
    pub origin: NumberOrigin,
    pub reserved_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<i64>,
    /// 关联的销售记录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

/// 预留请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequest {
    /// "boleta" / "factura" (前缀判断)
    pub document_type: String,
    pub order_id: Option<String>,
}

/// 取消预留请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelReservation {
    pub reason: Option<String>,
}

/// 序列计数器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesCounter {
    pub series: String,
    pub last: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_declared_prefix() {
        assert_eq!(DocumentType::from_declared("factura"), DocumentType::Factura);
        assert_eq!(DocumentType::from_declared("FACTURA"), DocumentType::Factura);
        assert_eq!(DocumentType::from_declared("f"), DocumentType::Factura);
        assert_eq!(DocumentType::from_declared("boleta"), DocumentType::Boleta);
        assert_eq!(DocumentType::from_declared(""), DocumentType::Boleta);
        // 不做语义推断
        assert_eq!(DocumentType::from_declared("invoice"), DocumentType::Boleta);
    }

    #[test]
    fn test_series_mapping() {
        assert_eq!(DocumentType::Boleta.series(), "B001");
        assert_eq!(DocumentType::Factura.series(), "F001");
        assert_eq!(DocumentType::from_series("F001"), Some(DocumentType::Factura));
        assert_eq!(DocumentType::from_series("X001"), None);
    }

    #[test]
    fn test_format_receipt_number() {
        assert_eq!(format_receipt_number(1), "0000001");
        assert_eq!(format_receipt_number(1234567), "1234567");
        assert_eq!(format_receipt_number(12345678), "12345678");
    }
}
