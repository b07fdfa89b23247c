//! Checkout Transaction Engine
//!
//! `settle` 在一个 redb 写事务中完成：
//!
//! ```text
//! settle(order_id, cashier, request)
//!     ├─ 1. 校验输入 (支付行、客户证件)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. 重新读取订单: 必须是 delivered
//!     ├─ 4. 从 items 重算合计, 与支付总额比对
//!     ├─ 5. 校验预留: 必须是 reserved
//!     ├─ 6. 写 SalesRecord / 预留 → used / 订单 → settled / 桌台 → available
//!     ├─ 7. Commit (全部生效或全部不生效)
//!     └─ 8. 审计 + 广播 (失败不影响结账结果)
//! ```

use shared::models::{
    Actor, Customer, CustomerDocType, DocumentType, OrderEvent, OrderEventKind, OrderStatus,
    ReceiptReservation, ReservationStatus, SalesRecord, SettleRequest,
};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::audit::{AuditRecord, AuditService, snapshot};
use crate::core::{PosError, PosResult};
use crate::customers;
use crate::db::PosStorage;
use crate::db::storage::{RESERVATIONS, SALES};
use crate::orders::money;

pub struct CheckoutEngine {
    storage: PosStorage,
    audit: Arc<AuditService>,
    event_tx: broadcast::Sender<OrderEvent>,
    /// 支付容差 (≤ 0.01)
    tolerance: f64,
}

impl std::fmt::Debug for CheckoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutEngine")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl CheckoutEngine {
    pub fn new(
        storage: PosStorage,
        audit: Arc<AuditService>,
        event_tx: broadcast::Sender<OrderEvent>,
        tolerance: f64,
    ) -> Self {
        Self {
            storage,
            audit,
            event_tx,
            tolerance,
        }
    }

    /// 结账
    ///
    /// 两个收银员同时结同一张单时，redb 串行化写事务，后到的一方
    /// 读到 `settled` 并得到 `InvalidState`。
    pub fn settle(
        &self,
        order_id: &str,
        cashier: &Actor,
        request: SettleRequest,
    ) -> PosResult<SalesRecord> {
        let SettleRequest {
            payments,
            reservation_id,
            customer,
        } = request;

        if payments.is_empty() {
            return Err(PosError::validation("at least one payment is required"));
        }
        for payment in &payments {
            money::validate_payment(payment)?;
        }
        if let Some(customer) = &customer {
            customers::validate_customer(customer)?;
        }

        let txn = self.storage.begin_write()?;

        // 1. 订单状态 (事务内的权威读取)
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| PosError::not_found("order", order_id))?;
        match order.status {
            OrderStatus::Delivered => {}
            OrderStatus::Pending => {
                return Err(PosError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from: OrderStatus::Pending,
                    to: OrderStatus::Settled.as_str(),
                });
            }
            OrderStatus::Settled => {
                tracing::warn!(order_id = %order_id, cashier_id = %cashier.id, "Order already settled");
                return Err(PosError::invalid_state(
                    "order",
                    order_id,
                    "order is already settled",
                ));
            }
        }

        // 2. 金额 (合计从 items 重算，不信任已存的 total)
        let before = snapshot(&order);
        money::recalculate_totals(&mut order);
        let paid = money::sum_payments(&payments);
        if !money::payments_match(order.total, paid, self.tolerance) {
            return Err(PosError::PaymentMismatch {
                expected: order.total,
                paid,
            });
        }

        // 3. 票据号预留
        let mut reservation = match &reservation_id {
            Some(id) => Some(self.load_reservation(&txn, id, order_id)?),
            None => None,
        };
        let document_type = reservation
            .as_ref()
            .and_then(|r| DocumentType::from_series(&r.series));
        if document_type == Some(DocumentType::Factura) {
            require_invoice_customer(customer.as_ref())?;
        }

        let customer = match customer {
            Some(c) => Some(customers::upsert_txn(&self.storage, &txn, c)?.1),
            None => None,
        };

        // 4. 写入
        let now = shared::util::now_millis();
        let record = SalesRecord {
            id: shared::util::generate_id(),
            order_id: order.id.clone(),
            table_id: order.table_id.clone(),
            table_number: order.table_number,
            cashier_id: cashier.id.clone(),
            waiter_id: order.owner_id.clone(),
            items: order.items.clone(),
            total: order.total,
            document_type,
            series: reservation.as_ref().map(|r| r.series.clone()),
            number: reservation.as_ref().map(|r| r.number.clone()),
            payments,
            customer,
            created_at: now,
        };
        self.storage.put(&txn, SALES, &record.id, &record)?;

        if let Some(reservation) = reservation.as_mut() {
            reservation.status = ReservationStatus::Used;
            reservation.used_at = Some(now);
            reservation.history_id = Some(record.id.clone());
            reservation.order_id = Some(order.id.clone());
            self.storage
                .put(&txn, RESERVATIONS, &reservation.id, &*reservation)?;
        }

        order.status = OrderStatus::Settled;
        order.updated_at = now;
        self.storage.store_order(&txn, &order)?;

        match self.storage.get_table_txn(&txn, &order.table_id)? {
            Some(mut table) => {
                table.available = true;
                self.storage.store_table(&txn, &table)?;
            }
            None => {
                tracing::warn!(
                    order_id = %order_id,
                    table_id = %order.table_id,
                    "Table of settled order no longer exists"
                );
            }
        }

        txn.commit()?;

        tracing::info!(
            order_id = %order_id,
            sale_id = %record.id,
            total = record.total,
            series = ?record.series,
            number = ?record.number,
            "Order settled"
        );

        // 审计在事务之外，失败不回滚
        self.audit.record(
            AuditRecord::create(cashier, "sales_record", &record.id, snapshot(&record))
                .with_name(format!("Table {}", record.table_number)),
        );
        self.audit.record(AuditRecord::update(
            cashier,
            "order",
            order_id,
            &before,
            &snapshot(&order),
        ));
        if let Some(reservation) = &reservation {
            self.audit.record(
                AuditRecord::update(
                    cashier,
                    "receipt_reservation",
                    &reservation.id,
                    &serde_json::json!({ "status": ReservationStatus::Reserved }),
                    &serde_json::json!({
                        "status": reservation.status,
                        "history_id": reservation.history_id,
                    }),
                )
                .with_name(format!("{}-{}", reservation.series, reservation.number)),
            );
        }

        let _ = self.event_tx.send(OrderEvent {
            kind: OrderEventKind::Settled,
            order_id: order.id.clone(),
            table_id: order.table_id.clone(),
            status: Some(OrderStatus::Settled),
            actor_id: cashier.id.clone(),
            timestamp: now,
        });

        Ok(record)
    }

    /// 预留必须存在且为 reserved；已绑定其它订单的预留也视为无效
    fn load_reservation(
        &self,
        txn: &redb::WriteTransaction,
        reservation_id: &str,
        order_id: &str,
    ) -> PosResult<ReceiptReservation> {
        let reservation: ReceiptReservation = self
            .storage
            .get_txn(txn, RESERVATIONS, reservation_id)?
            .ok_or_else(|| PosError::ReservationInvalid(reservation_id.to_string()))?;

        if reservation.status != ReservationStatus::Reserved {
            tracing::warn!(
                reservation_id = %reservation_id,
                status = ?reservation.status,
                "Reservation is not reserved"
            );
            return Err(PosError::ReservationInvalid(reservation_id.to_string()));
        }
        if reservation
            .order_id
            .as_deref()
            .is_some_and(|bound| bound != order_id)
        {
            return Err(PosError::ReservationInvalid(reservation_id.to_string()));
        }
        Ok(reservation)
    }
}

/// 发票需要 RUC、名称 (razón social) 和地址
fn require_invoice_customer(customer: Option<&Customer>) -> PosResult<()> {
    let Some(customer) = customer else {
        return Err(PosError::InvalidDocument(
            "an invoice requires a RUC customer".to_string(),
        ));
    };
    let has_address = customer
        .address
        .as_deref()
        .is_some_and(|a| !a.trim().is_empty());
    if customer.doc_type != CustomerDocType::Ruc || !has_address {
        return Err(PosError::InvalidDocument(customer.document.clone()));
    }
    Ok(())
}
