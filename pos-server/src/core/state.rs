use std::sync::Arc;

use crate::audit::{AuditService, AuditWorker};
use crate::backup::BackupService;
use crate::checkout::CheckoutEngine;
use crate::core::Config;
use crate::customers::CustomerDirectory;
use crate::db::{PosStorage, StorageResult};
use crate::orders::OrdersManager;
use crate::receipts::ReceiptAllocator;
use crate::sales::SalesHistory;
use crate::tables::TableRegistry;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，作为 axum 的 `State` 传给每个 handler。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | storage | redb 存储 |
/// | audit | 审计日志 / 删除前归档 |
/// | tables | 桌台 |
/// | orders | 订单生命周期 |
/// | receipts | 票据号分配 |
/// | checkout | 结账引擎 |
/// | customers | 客户目录 |
/// | sales | 销售历史 / 日结 |
/// | backups | JSON 备份 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: PosStorage,
    pub audit: Arc<AuditService>,
    pub tables: Arc<TableRegistry>,
    pub orders: Arc<OrdersManager>,
    pub receipts: Arc<ReceiptAllocator>,
    pub checkout: Arc<CheckoutEngine>,
    pub customers: Arc<CustomerDirectory>,
    pub sales: Arc<SalesHistory>,
    pub backups: Arc<BackupService>,
}

impl ServerState {
    /// 打开数据库并启动审计 worker
    pub async fn initialize(config: &Config) -> StorageResult<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let storage = PosStorage::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Database opened");

        let (state, worker) = Self::with_storage(config.clone(), storage);
        worker.spawn();
        Ok(state)
    }

    /// 基于已打开的存储组装服务；调用方负责运行返回的 worker
    pub fn with_storage(config: Config, storage: PosStorage) -> (Self, AuditWorker) {
        let (audit, worker) = AuditService::new(storage.clone(), config.audit_buffer_size);
        let orders = OrdersManager::new(storage.clone(), audit.clone());
        let checkout = CheckoutEngine::new(
            storage.clone(),
            audit.clone(),
            orders.event_sender(),
            config.payment_tolerance,
        );

        let state = Self {
            tables: Arc::new(TableRegistry::new(storage.clone(), audit.clone())),
            receipts: Arc::new(ReceiptAllocator::new(
                storage.clone(),
                audit.clone(),
                config.receipt_fallback,
            )),
            checkout: Arc::new(checkout),
            orders: Arc::new(orders),
            customers: Arc::new(CustomerDirectory::new(storage.clone(), audit.clone())),
            sales: Arc::new(SalesHistory::new(storage.clone())),
            backups: Arc::new(BackupService::new(storage.clone(), audit.clone())),
            audit,
            storage,
            config,
        };
        (state, worker)
    }
}
