//! 审计日志服务
//!
//! `AuditService` 提供：
//! - `record`: 通过 mpsc 通道异步追加 (fire-and-forget)
//! - `archive`: 硬删除前同步写入快照 (best-effort)
//! - 日志查询、链验证、归档列表

use serde::Serialize;
use shared::models::{
    Actor, ArchivedEntity, AuditAction, AuditChainVerification, AuditEntry, AuditQuery,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::diff::changed_values;
use super::storage::AuditStorage;
use super::worker::AuditWorker;
use crate::db::{PosStorage, StorageResult};

/// 发送到审计 worker 的日志请求
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub actor_id: String,
    pub actor_role: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub entity_name: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
}

impl AuditRecord {
    fn new(actor: &Actor, action: AuditAction, entity_type: &str, entity_id: &str) -> Self {
        Self {
            actor_id: actor.id.clone(),
            actor_role: actor.role.to_string(),
            action,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            entity_name: None,
            old_values: None,
            new_values: None,
        }
    }

    pub fn create(
        actor: &Actor,
        entity_type: &str,
        entity_id: &str,
        new_values: serde_json::Value,
    ) -> Self {
        let mut record = Self::new(actor, AuditAction::Create, entity_type, entity_id);
        record.new_values = Some(new_values);
        record
    }

    /// 只记录变化的字段
    pub fn update(
        actor: &Actor,
        entity_type: &str,
        entity_id: &str,
        old: &serde_json::Value,
        new: &serde_json::Value,
    ) -> Self {
        let mut record = Self::new(actor, AuditAction::Update, entity_type, entity_id);
        let (old_values, new_values) = changed_values(old, new);
        record.old_values = old_values;
        record.new_values = new_values;
        record
    }

    pub fn delete(
        actor: &Actor,
        entity_type: &str,
        entity_id: &str,
        old_values: serde_json::Value,
    ) -> Self {
        let mut record = Self::new(actor, AuditAction::Delete, entity_type, entity_id);
        record.old_values = Some(old_values);
        record
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }
}

/// 序列化为审计 JSON；失败时记录 null（审计不能影响业务）
pub fn snapshot<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize audit snapshot");
        serde_json::Value::Null
    })
}

/// 审计日志服务
///
/// 业务流程只调用 `record` / `archive`，两者都不返回错误：
/// 失败只写日志并计入 `failure_count`，永不回滚业务事务。
pub struct AuditService {
    storage: AuditStorage,
    tx: mpsc::Sender<AuditRecord>,
    failures: Arc<AtomicU64>,
    #[cfg(test)]
    fail_archive: std::sync::atomic::AtomicBool,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService")
            .field("failures", &self.failure_count())
            .finish_non_exhaustive()
    }
}

impl AuditService {
    /// 创建审计服务，返回服务和后台 worker（调用方负责 `worker.spawn()`）
    pub fn new(storage: PosStorage, buffer_size: usize) -> (Arc<Self>, AuditWorker) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let storage = AuditStorage::new(storage);
        let failures = Arc::new(AtomicU64::new(0));
        let worker = AuditWorker::new(storage.clone(), rx, failures.clone());
        let service = Arc::new(Self {
            storage,
            tx,
            failures,
            #[cfg(test)]
            fail_archive: std::sync::atomic::AtomicBool::new(false),
        });
        (service, worker)
    }

    /// 异步记录审计日志（非阻塞）
    ///
    /// 通道满或已关闭时丢弃该条目并记录错误。
    pub fn record(&self, record: AuditRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    action = %record.action,
                    entity_type = %record.entity_type,
                    entity_id = %record.entity_id,
                    "Audit channel full, audit entry dropped"
                );
            }
            Err(TrySendError::Closed(record)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    action = %record.action,
                    entity_type = %record.entity_type,
                    entity_id = %record.entity_id,
                    "Audit channel closed, audit entry lost"
                );
            }
        }
    }

    /// 硬删除前写入快照
    ///
    /// 必须在删除事务之前调用。失败只记录日志，删除照常进行。
    /// 返回快照是否写入成功。
    pub fn archive<T: Serialize>(
        &self,
        entity_type: &str,
        entity_id: &str,
        data: &T,
        actor: &Actor,
        reason: Option<&str>,
    ) -> bool {
        let archived = ArchivedEntity {
            id: shared::util::generate_id(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data: snapshot(data),
            deleted_by: actor.id.clone(),
            deleted_at: shared::util::now_millis(),
            reason: reason.map(str::to_string),
        };

        match self.write_archive(&archived) {
            Ok(()) => {
                tracing::debug!(
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    archive_id = %archived.id,
                    "Entity archived before delete"
                );
                true
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    error = %e,
                    "Failed to archive entity, delete proceeds without snapshot"
                );
                false
            }
        }
    }

    fn write_archive(&self, archived: &ArchivedEntity) -> StorageResult<()> {
        #[cfg(test)]
        {
            if self.fail_archive.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("simulated archive failure").into());
            }
        }
        self.storage.store_archive(archived)
    }

    /// 查询审计日志
    pub fn query(&self, q: &AuditQuery) -> StorageResult<(Vec<AuditEntry>, u64)> {
        self.storage.query(q)
    }

    /// 验证审计链完整性
    pub fn verify_chain(&self) -> StorageResult<AuditChainVerification> {
        self.storage.verify_chain()
    }

    /// 列出归档快照
    pub fn list_archived(&self, entity_type: Option<&str>) -> StorageResult<Vec<ArchivedEntity>> {
        self.storage.list_archived(entity_type)
    }

    /// 审计写入失败次数 (丢弃 + 写库失败 + 归档失败)
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn set_fail_archive(&self, fail: bool) {
        self.fail_archive.store(fail, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::models::Role;

    fn actor() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    #[tokio::test]
    async fn test_record_is_written_by_worker() {
        let storage = PosStorage::open_in_memory().unwrap();
        let audit = AuditStorage::new(storage.clone());
        let (service, worker) = AuditService::new(storage, 16);
        let handle = worker.spawn();

        service.record(
            AuditRecord::create(&actor(), "dining_table", "t1", json!({"number": 5}))
                .with_name("Mesa 5"),
        );
        // 关闭通道，worker 写完剩余条目后退出
        drop(service);
        handle.await.unwrap();

        let (items, total) = audit.query(&AuditQuery::default()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].entity_id, "t1");
        assert_eq!(items[0].entity_name.as_deref(), Some("Mesa 5"));
        assert_eq!(items[0].actor_role, "admin");
    }

    #[test]
    fn test_record_never_fails_when_worker_gone() {
        let storage = PosStorage::open_in_memory().unwrap();
        let (service, worker) = AuditService::new(storage, 1);
        drop(worker);

        service.record(AuditRecord::create(&actor(), "order", "o1", json!({})));
        assert_eq!(service.failure_count(), 1);
    }

    #[test]
    fn test_record_drops_when_channel_full() {
        let storage = PosStorage::open_in_memory().unwrap();
        let (service, _worker) = AuditService::new(storage, 1);

        service.record(AuditRecord::create(&actor(), "order", "o1", json!({})));
        service.record(AuditRecord::create(&actor(), "order", "o2", json!({})));
        assert_eq!(service.failure_count(), 1);
    }

    #[test]
    fn test_archive_stores_snapshot() {
        let storage = PosStorage::open_in_memory().unwrap();
        let (service, _worker) = AuditService::new(storage, 4);

        let archived = service.archive(
            "order",
            "o1",
            &json!({"id": "o1", "total": 60.0}),
            &actor(),
            Some("customer left"),
        );
        assert!(archived);

        let list = service.list_archived(Some("order")).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].entity_id, "o1");
        assert_eq!(list[0].deleted_by, "admin-1");
        assert_eq!(list[0].reason.as_deref(), Some("customer left"));
        assert_eq!(list[0].data["total"], 60.0);
    }

    #[test]
    fn test_archive_failure_is_swallowed() {
        let storage = PosStorage::open_in_memory().unwrap();
        let (service, _worker) = AuditService::new(storage, 4);
        service.set_fail_archive(true);

        assert!(!service.archive("order", "o1", &json!({}), &actor(), None));
        assert_eq!(service.failure_count(), 1);
        assert!(service.list_archived(None).unwrap().is_empty());
    }

    #[test]
    fn test_update_record_keeps_only_changes() {
        let old = json!({"available": true, "number": 5});
        let new = json!({"available": false, "number": 5});
        let record = AuditRecord::update(&actor(), "dining_table", "t5", &old, &new);

        assert_eq!(record.action, AuditAction::Update);
        assert_eq!(record.old_values, Some(json!({"available": true})));
        assert_eq!(record.new_values, Some(json!({"available": false})));
    }
}
