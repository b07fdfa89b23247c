//! OrdersManager - order lifecycle transitions
//!
//! This module handles:
//! - Order creation with atomic table claim
//! - Item editing while the order is pending
//! - `pending -> delivered`
//! - Hard delete of pending orders (archive first, then release the table)
//! - Event broadcasting
//!
//! # Command Flow
//!
//! ```text
//! create_order(cmd)
//!     ├─ 1. Validate input (items, quantities, prices)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Re-read table, reject if occupied
//!     ├─ 4. Persist order + flip table to occupied
//!     ├─ 5. Commit transaction
//!     ├─ 6. Record audit (fire-and-forget)
//!     └─ 7. Broadcast event
//! ```
//!
//! Settlement (`delivered -> settled`) is owned by the checkout engine.

use shared::models::{
    Actor, CreateOrder, ItemEdit, Order, OrderEvent, OrderEventKind, OrderFilter, OrderItem,
    OrderStatus,
};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::money;
use crate::audit::{AuditRecord, AuditService, snapshot};
use crate::core::{PosError, PosResult};
use crate::db::PosStorage;
use crate::db::storage::ORDERS;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;

const RESOURCE: &str = "order";

/// OrdersManager for order lifecycle commands
///
/// Synchronous: every command is one redb write transaction. HTTP handlers
/// call it through `spawn_blocking`.
pub struct OrdersManager {
    storage: PosStorage,
    audit: Arc<AuditService>,
    event_tx: broadcast::Sender<OrderEvent>,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<PosStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

impl OrdersManager {
    pub fn new(storage: PosStorage, audit: Arc<AuditService>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            audit,
            event_tx,
        }
    }

    /// Subscribe to order events
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    /// Sender shared with the checkout engine so settle events reach the same subscribers
    pub fn event_sender(&self) -> broadcast::Sender<OrderEvent> {
        self.event_tx.clone()
    }

    // ========== Commands ==========

    /// 开单：校验并占用桌台
    ///
    /// 桌台可用性在事务内重新读取，选桌时看到的列表可能已过期。
    pub fn create_order(&self, cmd: CreateOrder, actor: &Actor) -> PosResult<Order> {
        if cmd.items.is_empty() {
            return Err(PosError::validation("an order needs at least one item"));
        }
        let mut items: Vec<OrderItem> = Vec::with_capacity(cmd.items.len());
        for line in &cmd.items {
            money::validate_menu_item(&line.item)?;
            money::validate_quantity(line.qty)?;
            add_line(&mut items, &line.item, line.qty)?;
        }

        let txn = self.storage.begin_write()?;
        let mut table = self
            .storage
            .get_table_txn(&txn, &cmd.table_id)?
            .ok_or_else(|| PosError::not_found("dining_table", &cmd.table_id))?;
        if !table.available {
            tracing::warn!(table_id = %table.id, number = table.number, "Table already claimed");
            return Err(PosError::TableUnavailable(table.id));
        }
        if let Some(open) = self.storage.find_open_order_for_table_txn(&txn, &table.id)? {
            tracing::warn!(
                table_id = %table.id,
                order_id = %open.id,
                "Table marked available but still holds an open order"
            );
            return Err(PosError::TableUnavailable(table.id));
        }

        let now = shared::util::now_millis();
        let mut order = Order {
            id: shared::util::generate_id(),
            table_id: table.id.clone(),
            table_number: table.number,
            owner_id: actor.id.clone(),
            items,
            total: 0.0,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        money::recalculate_totals(&mut order);

        table.available = false;
        self.storage.store_order(&txn, &order)?;
        self.storage.store_table(&txn, &table)?;
        txn.commit()?;

        tracing::info!(
            order_id = %order.id,
            table_number = order.table_number,
            total = order.total,
            "Order created"
        );
        self.audit.record(
            AuditRecord::create(actor, RESOURCE, &order.id, snapshot(&order))
                .with_name(format!("Table {}", order.table_number)),
        );
        self.emit(OrderEventKind::Created, &order, actor);
        Ok(order)
    }

    /// 批量修改菜品 (仅 pending)
    ///
    /// 任一编辑失败则整批放弃。合计每次都从 items 重新计算。
    pub fn update_items(
        &self,
        order_id: &str,
        edits: Vec<ItemEdit>,
        actor: &Actor,
    ) -> PosResult<Order> {
        if edits.is_empty() {
            return Err(PosError::validation("no item edits supplied"));
        }

        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(PosError::invalid_state(
                RESOURCE,
                order_id,
                format!("items cannot be edited once the order is {}", order.status),
            ));
        }

        let before = snapshot(&order);
        for edit in &edits {
            apply_edit(&mut order.items, edit)?;
        }
        money::recalculate_totals(&mut order);
        order.updated_at = shared::util::now_millis();

        self.storage.store_order(&txn, &order)?;
        txn.commit()?;

        tracing::debug!(
            order_id = %order_id,
            edits = edits.len(),
            total = order.total,
            "Order items updated"
        );
        self.audit.record(AuditRecord::update(
            actor,
            RESOURCE,
            order_id,
            &before,
            &snapshot(&order),
        ));
        self.emit(OrderEventKind::ItemsUpdated, &order, actor);
        Ok(order)
    }

    /// pending -> delivered
    pub fn deliver(&self, order_id: &str, actor: &Actor) -> PosResult<Order> {
        self.transition(order_id, OrderStatus::Delivered, actor)
    }

    /// 通用状态迁移入口
    ///
    /// 只允许 `pending -> delivered`。`settled` 只能经由结账引擎到达，
    /// 其余目标（包括回退到 pending）一律 `InvalidTransition`。
    pub fn transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        actor: &Actor,
    ) -> PosResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, order_id))?;

        if !(order.status == OrderStatus::Pending && target == OrderStatus::Delivered) {
            return Err(PosError::InvalidTransition {
                order_id: order_id.to_string(),
                from: order.status,
                to: target.as_str(),
            });
        }
        if order.items.is_empty() {
            return Err(PosError::OrderEmpty(order_id.to_string()));
        }

        let before = snapshot(&order);
        order.status = target;
        order.updated_at = shared::util::now_millis();
        self.storage.store_order(&txn, &order)?;
        txn.commit()?;

        tracing::info!(order_id = %order_id, status = %order.status, "Order status changed");
        self.audit.record(AuditRecord::update(
            actor,
            RESOURCE,
            order_id,
            &before,
            &snapshot(&order),
        ));
        self.emit(OrderEventKind::Delivered, &order, actor);
        Ok(order)
    }

    /// 删除 pending 订单并释放桌台
    ///
    /// 先归档快照（失败只记日志），再在一个事务里删除订单、释放桌台。
    pub fn delete_pending(
        &self,
        order_id: &str,
        actor: &Actor,
        reason: Option<&str>,
    ) -> PosResult<()> {
        let order = self.get_order(order_id)?;
        ensure_pending(&order)?;

        self.audit.archive(RESOURCE, order_id, &order, actor, reason);

        let txn = self.storage.begin_write()?;
        let current = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, order_id))?;
        ensure_pending(&current)?;

        self.storage.remove(&txn, ORDERS, order_id)?;
        match self.storage.get_table_txn(&txn, &current.table_id)? {
            Some(mut table) => {
                table.available = true;
                self.storage.store_table(&txn, &table)?;
            }
            None => {
                tracing::warn!(
                    order_id = %order_id,
                    table_id = %current.table_id,
                    "Table of deleted order no longer exists"
                );
            }
        }
        txn.commit()?;

        tracing::info!(order_id = %order_id, table_id = %current.table_id, "Pending order deleted");
        self.audit.record(
            AuditRecord::delete(actor, RESOURCE, order_id, snapshot(&current))
                .with_name(format!("Table {}", current.table_number)),
        );
        self.emit(OrderEventKind::Deleted, &current, actor);
        Ok(())
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: &str) -> PosResult<Order> {
        self.storage
            .read(ORDERS, order_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, order_id))
    }

    /// Orders matching the filter, oldest first
    pub fn list_orders(&self, filter: &OrderFilter) -> PosResult<Vec<Order>> {
        let mut orders: Vec<Order> = self.storage.read_all(ORDERS)?;
        orders.retain(|o| filter.matches(o));
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    fn emit(&self, kind: OrderEventKind, order: &Order, actor: &Actor) {
        // 没有订阅者时 send 返回 Err，忽略
        let _ = self.event_tx.send(OrderEvent {
            kind,
            order_id: order.id.clone(),
            table_id: order.table_id.clone(),
            status: (kind != OrderEventKind::Deleted).then_some(order.status),
            actor_id: actor.id.clone(),
            timestamp: shared::util::now_millis(),
        });
    }
}

fn ensure_pending(order: &Order) -> PosResult<()> {
    if order.status != OrderStatus::Pending {
        return Err(PosError::invalid_state(
            RESOURCE,
            &order.id,
            format!("only pending orders can be deleted, order is {}", order.status),
        ));
    }
    Ok(())
}

/// 同一菜品合并为一行
fn add_line(
    items: &mut Vec<OrderItem>,
    item: &shared::models::MenuItemRef,
    qty: u32,
) -> PosResult<()> {
    match items.iter_mut().find(|line| line.menu_item_id == item.id) {
        Some(line) => {
            let merged = line.qty.saturating_add(qty);
            money::validate_quantity(merged)?;
            line.qty = merged;
        }
        None => items.push(money::build_item(item, qty)),
    }
    Ok(())
}

fn find_line<'a>(items: &'a mut [OrderItem], menu_item_id: &str) -> PosResult<&'a mut OrderItem> {
    items
        .iter_mut()
        .find(|line| line.menu_item_id == menu_item_id)
        .ok_or_else(|| PosError::not_found("order_item", menu_item_id))
}

/// 应用单个编辑
fn apply_edit(items: &mut Vec<OrderItem>, edit: &ItemEdit) -> PosResult<()> {
    match edit {
        ItemEdit::Add { item, qty } => {
            money::validate_menu_item(item)?;
            money::validate_quantity(*qty)?;
            add_line(items, item, *qty)?;
        }
        ItemEdit::Remove { menu_item_id } => {
            find_line(items, menu_item_id)?.qty = 0;
        }
        ItemEdit::Adjust {
            menu_item_id,
            delta,
        } => {
            let line = find_line(items, menu_item_id)?;
            let next = (i64::from(line.qty) + i64::from(*delta)).max(0);
            if next > i64::from(money::MAX_QUANTITY) {
                return Err(PosError::validation(format!(
                    "quantity exceeds maximum allowed ({}), got {}",
                    money::MAX_QUANTITY,
                    next
                )));
            }
            line.qty = next as u32;
        }
        ItemEdit::SetQuantity { menu_item_id, qty } => {
            if *qty > money::MAX_QUANTITY {
                return Err(PosError::validation(format!(
                    "quantity exceeds maximum allowed ({}), got {}",
                    money::MAX_QUANTITY,
                    qty
                )));
            }
            find_line(items, menu_item_id)?.qty = *qty;
        }
    }
    // 数量为 0 的行立即移除，后续编辑看不到它
    items.retain(|line| line.qty > 0);
    Ok(())
}

#[cfg(test)]
mod tests;
