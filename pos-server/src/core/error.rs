//! 引擎错误
//!
//! 业务规则错误同步返回给调用方；存储错误只写日志，对外给出分类后的错误码。

use crate::db::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum PosError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Table number already exists: {0}")]
    DuplicateTable(u32),

    #[error("Table is not available: {0}")]
    TableUnavailable(String),

    #[error("Invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: &'static str,
    },

    #[error("Invalid state for {entity} {id}: {reason}")]
    InvalidState {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("Payment mismatch: order total {expected}, payments sum {paid}")]
    PaymentMismatch { expected: f64, paid: f64 },

    #[error("Reservation invalid: {0}")]
    ReservationInvalid(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Order has no items: {0}")]
    OrderEmpty(String),

    #[error("Invalid customer document: {0}")]
    InvalidDocument(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Receipt number unavailable: {0}")]
    NumberUnavailable(StorageError),
}

impl PosError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        PosError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PosError::InvalidState {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        PosError::Validation(msg.into())
    }
}

pub type PosResult<T> = Result<T, PosError>;

// `txn.commit()?` 直接出现在引擎方法里，`?` 只做一次 From 转换
impl From<redb::CommitError> for PosError {
    fn from(e: redb::CommitError) -> Self {
        PosError::Storage(e.into())
    }
}

/// 将存储错误转换为错误码
pub fn classify_storage_error(e: &StorageError) -> ErrorCode {
    // 先按枚举变体精确匹配
    if let StorageError::Serialization(_) = e {
        return ErrorCode::StorageCorrupted;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 内存不足
    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return ErrorCode::OutOfMemory;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙
    ErrorCode::SystemBusy
}

fn not_found_code(entity: &str) -> ErrorCode {
    match entity {
        "order" => ErrorCode::OrderNotFound,
        "order_item" => ErrorCode::OrderItemNotFound,
        "dining_table" => ErrorCode::TableNotFound,
        "receipt_reservation" => ErrorCode::ReservationNotFound,
        "customer" => ErrorCode::CustomerNotFound,
        _ => ErrorCode::NotFound,
    }
}

/// 对外只暴露错误码的固定文案，技术细节放在 details / 日志中
impl From<PosError> for AppError {
    fn from(err: PosError) -> Self {
        match err {
            PosError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = %code, "Storage error occurred");
                AppError::new(code)
            }
            PosError::NumberUnavailable(e) => {
                tracing::error!(error = %e, "Receipt counter unavailable");
                AppError::new(ErrorCode::ReceiptNumberUnavailable)
            }
            PosError::DuplicateTable(number) => {
                AppError::new(ErrorCode::TableNumberExists).with_detail("number", number)
            }
            PosError::TableUnavailable(table_id) => {
                AppError::new(ErrorCode::TableOccupied).with_detail("table_id", table_id)
            }
            PosError::InvalidTransition { order_id, from, to } => {
                AppError::new(ErrorCode::OrderInvalidTransition)
                    .with_detail("order_id", order_id)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to)
            }
            PosError::InvalidState { entity, id, .. } => {
                let code = if entity == "dining_table" {
                    ErrorCode::TableHasOrders
                } else {
                    ErrorCode::OrderInvalidState
                };
                AppError::new(code).with_detail("id", id)
            }
            PosError::PaymentMismatch { expected, paid } => {
                AppError::new(ErrorCode::PaymentMismatch)
                    .with_detail("expected", expected)
                    .with_detail("paid", paid)
            }
            PosError::ReservationInvalid(id) => {
                AppError::new(ErrorCode::ReservationInvalid).with_detail("reservation_id", id)
            }
            PosError::NotFound { entity, id } => {
                AppError::new(not_found_code(entity)).with_detail("id", id)
            }
            PosError::OrderEmpty(order_id) => {
                AppError::new(ErrorCode::OrderEmpty).with_detail("order_id", order_id)
            }
            PosError::InvalidDocument(document) => {
                AppError::new(ErrorCode::CustomerDocumentInvalid).with_detail("document", document)
            }
            PosError::Validation(msg) => AppError::validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_per_entity() {
        let err: AppError = PosError::not_found("order", "o1").into();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
        let err: AppError = PosError::not_found("receipt_reservation", "r1").into();
        assert_eq!(err.code, ErrorCode::ReservationNotFound);
        let err: AppError = PosError::not_found("backup", "b1").into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_message_is_user_facing() {
        let err: AppError = PosError::PaymentMismatch {
            expected: 60.0,
            paid: 59.5,
        }
        .into();
        assert_eq!(err.code, ErrorCode::PaymentMismatch);
        assert_eq!(err.message, ErrorCode::PaymentMismatch.message());
    }

    #[test]
    fn test_storage_error_is_classified() {
        let json_err = serde_json::from_str::<u32>("x").unwrap_err();
        let err: AppError = PosError::Storage(StorageError::Serialization(json_err)).into();
        assert_eq!(err.code, ErrorCode::StorageCorrupted);
        assert!(!err.message.contains("expected"));
    }

    #[test]
    fn test_commit_error_propagates_as_storage() {
        fn commit() -> PosResult<()> {
            Err(redb::CommitError::Storage(redb::StorageError::Io(
                std::io::Error::other("no space left on device"),
            )))?;
            Ok(())
        }

        let err = commit().unwrap_err();
        assert!(matches!(err, PosError::Storage(StorageError::Commit(_))));
        let err: AppError = err.into();
        assert_eq!(err.code, ErrorCode::StorageFull);
    }

    #[test]
    fn test_table_invalid_state_maps_to_has_orders() {
        let err: AppError = PosError::invalid_state("dining_table", "t1", "open order").into();
        assert_eq!(err.code, ErrorCode::TableHasOrders);
    }
}
