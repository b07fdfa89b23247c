//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// 订单状态
///
/// ```text
/// pending ──deliver──▶ delivered ──settle──▶ settled
///    │
///    └──delete (staff, releases table)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Delivered,
    Settled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Settled => "settled",
        }
    }

    /// 订单仍占用桌台
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 菜单条目 (来自菜单服务，只读)
///
/// 价格在下单时定格，核心不校验菜单是否更新。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemRef {
    pub id: String,
    pub name: String,
    pub unit_price: f64,
}

/// 订单行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: f64,
    pub qty: u32,
    /// unit_price × qty (后端计算)
    pub line_total: f64,
}

/// 订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub table_id: String,
    pub table_number: u32,
    /// 负责的服务员
    pub owner_id: String,
    pub items: Vec<OrderItem>,
    /// Σ line_total，每次修改后从 items 重新计算
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 下单时的一行输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub item: MenuItemRef,
    pub qty: u32,
}

/// 创建订单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub table_id: String,
    pub items: Vec<OrderLineInput>,
}

/// 送达前的单行编辑
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ItemEdit {
    /// 添加菜品；同一菜品合并数量
    Add { item: MenuItemRef, qty: u32 },
    /// 删除整行
    Remove { menu_item_id: String },
    /// 数量增减；减到 0 即删除该行
    Adjust { menu_item_id: String, delta: i32 },
    /// 直接设置数量；0 即删除该行
    SetQuantity { menu_item_id: String, qty: u32 },
}

/// 订单列表过滤
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// 为空表示不按状态过滤
    #[serde(default)]
    pub statuses: Vec<OrderStatus>,
    pub owner_id: Option<String>,
    pub table_id: Option<String>,
}

impl OrderFilter {
    /// 服务员的进行中订单 (pending | delivered)
    pub fn active_for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            statuses: vec![OrderStatus::Pending, OrderStatus::Delivered],
            owner_id: Some(owner_id.into()),
            table_id: None,
        }
    }

    /// 厨房队列 (pending)
    pub fn kitchen_queue() -> Self {
        Self {
            statuses: vec![OrderStatus::Pending],
            ..Default::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && self.owner_id.as_ref().is_none_or(|o| o == &order.owner_id)
            && self.table_id.as_ref().is_none_or(|t| t == &order.table_id)
    }
}

/// 订单事件类型 (实时推送)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    ItemsUpdated,
    Delivered,
    Settled,
    Deleted,
}

/// 订单事件 (提交成功后广播)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order_id: String,
    pub table_id: String,
    pub status: Option<OrderStatus>,
    pub actor_id: String,
    pub timestamp: i64,
}
