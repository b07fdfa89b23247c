//! Sales Record Model (销售历史)

use super::customer::Customer;
use super::order::OrderItem;
use super::receipt::DocumentType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Qr,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => f.write_str("cash"),
            PaymentMethod::Qr => f.write_str("qr"),
            PaymentMethod::Card => f.write_str("card"),
        }
    }
}

/// 一笔支付
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLine {
    pub method: PaymentMethod,
    pub amount: f64,
    /// 自由格式 (找零、二维码平台、卡号后四位等)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// 销售记录 (结账后不可变)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: String,
    pub order_id: String,
    pub table_id: String,
    pub table_number: u32,
    pub cashier_id: String,
    pub waiter_id: String,
    /// 结账时的订单行快照
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub document_type: Option<DocumentType>,
    pub series: Option<String>,
    pub number: Option<String>,
    pub payments: Vec<PaymentLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    pub created_at: i64,
}

/// 结账请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleRequest {
    pub payments: Vec<PaymentLine>,
    #[serde(default)]
    pub reservation_id: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
}

/// 销售记录查询
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesQuery {
    pub cashier_id: Option<String>,
    /// 起始时间 (毫秒, 含)
    pub from: Option<i64>,
    /// 截止时间 (毫秒, 不含)
    pub to: Option<i64>,
}

impl SalesQuery {
    pub fn matches(&self, record: &SalesRecord) -> bool {
        self.cashier_id
            .as_ref()
            .is_none_or(|c| c == &record.cashier_id)
            && self.from.is_none_or(|from| record.created_at >= from)
            && self.to.is_none_or(|to| record.created_at < to)
    }
}

/// 日结汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub day: chrono::NaiveDate,
    pub cashier_id: Option<String>,
    pub count: usize,
    pub total: f64,
    pub by_method: BTreeMap<PaymentMethod, f64>,
}
