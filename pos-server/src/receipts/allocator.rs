//! Receipt Number Allocator
//!
//! 每个序列 (B001 / F001) 一个单调递增计数器。计数器 +1 与预留记录写入
//! 在同一个 redb 写事务中完成：两个并发的预留者不可能读到同一个旧值，
//! 未提交的事务也不会消耗号码。

use rand::Rng;
use shared::models::{
    Actor, DocumentType, NumberOrigin, ReceiptReservation, ReservationStatus,
    format_receipt_number,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::audit::{AuditRecord, AuditService, snapshot};
use crate::core::{PosError, PosResult};
use crate::db::storage::RESERVATIONS;
use crate::db::{PosStorage, StorageResult};

const RESOURCE: &str = "receipt_reservation";

/// 备用号码范围 (7 位)
const FALLBACK_RANGE: std::ops::RangeInclusive<u64> = 1_000_000..=9_999_999;
/// 备用号码与已有预留冲突时的重试次数
const FALLBACK_ATTEMPTS: usize = 8;

pub struct ReceiptAllocator {
    storage: PosStorage,
    audit: Arc<AuditService>,
    /// 计数器事务失败时是否退回随机号码
    fallback_enabled: bool,
    #[cfg(test)]
    fail_counter: std::sync::atomic::AtomicBool,
}

impl std::fmt::Debug for ReceiptAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptAllocator")
            .field("fallback_enabled", &self.fallback_enabled)
            .finish_non_exhaustive()
    }
}

impl ReceiptAllocator {
    pub fn new(storage: PosStorage, audit: Arc<AuditService>, fallback_enabled: bool) -> Self {
        Self {
            storage,
            audit,
            fallback_enabled,
            #[cfg(test)]
            fail_counter: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// 预留下一个票据号
    ///
    /// 计数器不可用时：
    /// - 默认直接返回 `NumberUnavailable`
    /// - 开启 `RECEIPT_FALLBACK` 时生成随机号码，标记为 `NumberOrigin::Fallback`
    pub fn reserve(
        &self,
        document_type: DocumentType,
        order_id: Option<String>,
        actor: &Actor,
    ) -> PosResult<ReceiptReservation> {
        let series = document_type.series();

        let reservation = match self.reserve_sequential(series, order_id.clone(), actor) {
            Ok(reservation) => reservation,
            Err(e) if self.fallback_enabled => {
                tracing::error!(
                    series = %series,
                    error = %e,
                    "Series counter unavailable, issuing non-sequential fallback number"
                );
                self.reserve_fallback(series, order_id, actor)
                    .map_err(PosError::NumberUnavailable)?
            }
            Err(e) => {
                tracing::error!(series = %series, error = %e, "Series counter unavailable");
                return Err(PosError::NumberUnavailable(e));
            }
        };

        tracing::info!(
            reservation_id = %reservation.id,
            series = %reservation.series,
            number = %reservation.number,
            origin = ?reservation.origin,
            "Receipt number reserved"
        );
        self.audit.record(
            AuditRecord::create(actor, RESOURCE, &reservation.id, snapshot(&reservation))
                .with_name(format!("{}-{}", reservation.series, reservation.number)),
        );
        Ok(reservation)
    }

    /// 按调用方声明的类型预留 ("boleta" / "factura"，前缀判断)
    pub fn reserve_declared(
        &self,
        declared: &str,
        order_id: Option<String>,
        actor: &Actor,
    ) -> PosResult<ReceiptReservation> {
        self.reserve(DocumentType::from_declared(declared), order_id, actor)
    }

    fn reserve_sequential(
        &self,
        series: &str,
        order_id: Option<String>,
        actor: &Actor,
    ) -> StorageResult<ReceiptReservation> {
        #[cfg(test)]
        {
            if self.fail_counter.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(std::io::Error::other("simulated counter failure").into());
            }
        }

        let txn = self.storage.begin_write()?;
        let next = self.storage.increment_counter(&txn, series)?;
        let reservation = new_reservation(
            series,
            format_receipt_number(next),
            order_id,
            actor,
            NumberOrigin::Sequential,
        );
        self.storage.put(&txn, RESERVATIONS, &reservation.id, &reservation)?;
        txn.commit()?;
        Ok(reservation)
    }

    /// 随机号码，避开同序列已存在的号码
    fn reserve_fallback(
        &self,
        series: &str,
        order_id: Option<String>,
        actor: &Actor,
    ) -> StorageResult<ReceiptReservation> {
        let txn = self.storage.begin_write()?;
        let taken: HashSet<String> = self
            .storage
            .all_txn::<ReceiptReservation>(&txn, RESERVATIONS)?
            .into_iter()
            .filter(|r| r.series == series)
            .map(|r| r.number)
            .collect();

        let number = pick_fallback_number(&mut rand::thread_rng(), &taken).ok_or_else(|| {
            std::io::Error::other(format!(
                "no free fallback number for {series} after {FALLBACK_ATTEMPTS} attempts"
            ))
        })?;

        let reservation = new_reservation(series, number, order_id, actor, NumberOrigin::Fallback);
        self.storage.put(&txn, RESERVATIONS, &reservation.id, &reservation)?;
        txn.commit()?;
        Ok(reservation)
    }

    /// 取消预留
    ///
    /// - `reserved` → `cancelled`
    /// - 已取消: 幂等，直接返回
    /// - 已使用 / 不存在: `NotFound`
    pub fn cancel(
        &self,
        reservation_id: &str,
        reason: Option<String>,
        actor: &Actor,
    ) -> PosResult<ReceiptReservation> {
        let txn = self.storage.begin_write()?;
        let mut reservation: ReceiptReservation = self
            .storage
            .get_txn(&txn, RESERVATIONS, reservation_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, reservation_id))?;

        match reservation.status {
            ReservationStatus::Cancelled => return Ok(reservation),
            ReservationStatus::Used => {
                tracing::warn!(reservation_id = %reservation_id, "Refusing to cancel a used reservation");
                return Err(PosError::not_found(RESOURCE, reservation_id));
            }
            ReservationStatus::Reserved => {}
        }

        let before = snapshot(&reservation);
        reservation.status = ReservationStatus::Cancelled;
        reservation.cancelled_at = Some(shared::util::now_millis());
        reservation.cancel_reason = reason;
        self.storage
            .put(&txn, RESERVATIONS, reservation_id, &reservation)?;
        txn.commit()?;

        tracing::info!(
            reservation_id = %reservation_id,
            number = %reservation.number,
            "Receipt reservation cancelled"
        );
        self.audit.record(AuditRecord::update(
            actor,
            RESOURCE,
            reservation_id,
            &before,
            &snapshot(&reservation),
        ));
        Ok(reservation)
    }

    pub fn get_reservation(&self, reservation_id: &str) -> PosResult<ReceiptReservation> {
        self.storage
            .read(RESERVATIONS, reservation_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, reservation_id))
    }

    /// 最后发出的号码 (未发出过为 0)
    pub fn current_counter(&self, document_type: DocumentType) -> PosResult<u64> {
        Ok(self.storage.current_counter(document_type.series())?)
    }

    /// 所有非顺序号码，用于对账
    pub fn list_fallback_reservations(&self) -> PosResult<Vec<ReceiptReservation>> {
        let mut list: Vec<ReceiptReservation> = self.storage.read_all(RESERVATIONS)?;
        list.retain(|r| r.origin == NumberOrigin::Fallback);
        list.sort_by_key(|r| r.reserved_at);
        Ok(list)
    }

    #[cfg(test)]
    pub(crate) fn set_fail_counter(&self, fail: bool) {
        self.fail_counter
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

/// 最多尝试 `FALLBACK_ATTEMPTS` 次，全部冲突时返回 None
fn pick_fallback_number<R: Rng>(rng: &mut R, taken: &HashSet<String>) -> Option<String> {
    (0..FALLBACK_ATTEMPTS)
        .map(|_| format_receipt_number(rng.gen_range(FALLBACK_RANGE)))
        .find(|number| !taken.contains(number))
}

fn new_reservation(
    series: &str,
    number: String,
    order_id: Option<String>,
    actor: &Actor,
    origin: NumberOrigin,
) -> ReceiptReservation {
    ReceiptReservation {
        id: shared::util::generate_id(),
        series: series.to_string(),
        number,
        order_id,
        reserved_by: actor.id.clone(),
        status: ReservationStatus::Reserved,
        origin,
        reserved_at: shared::util::now_millis(),
        used_at: None,
        history_id: None,
        cancelled_at: None,
        cancel_reason: None,
    }
}
