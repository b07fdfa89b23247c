//! JSON 备份
//!
//! 在一个读事务内导出所选集合，保证快照一致，然后写入 `backups` 表。

use redb::ReadableTable;
use shared::models::{Actor, Backup, DEFAULT_BACKUP_COLLECTIONS};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::audit::{AuditRecord, AuditService};
use crate::core::{PosError, PosResult};
use crate::db::storage::{BACKUPS, CUSTOMERS, JsonTable, ORDERS, RESERVATIONS, SALES, TABLES};
use crate::db::{PosStorage, StorageResult};

const RESOURCE: &str = "backup";

/// 可备份的集合
fn collection_table(name: &str) -> Option<JsonTable> {
    match name {
        "tables" => Some(TABLES),
        "orders" => Some(ORDERS),
        "sales_records" => Some(SALES),
        "customers" => Some(CUSTOMERS),
        "receipt_reservations" => Some(RESERVATIONS),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct BackupService {
    storage: PosStorage,
    audit: Arc<AuditService>,
}

impl BackupService {
    pub fn new(storage: PosStorage, audit: Arc<AuditService>) -> Self {
        Self { storage, audit }
    }

    /// 创建备份；`collections` 为空时备份默认集合
    pub fn create_backup(&self, actor: &Actor, collections: &[String]) -> PosResult<Backup> {
        let mut names: Vec<String> = if collections.is_empty() {
            DEFAULT_BACKUP_COLLECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            collections.iter().map(|s| s.trim().to_string()).collect()
        };
        names.sort();
        names.dedup();

        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            let table = collection_table(name)
                .ok_or_else(|| PosError::validation(format!("unknown collection: {name}")))?;
            tables.push((name.as_str(), table));
        }

        let backup = Backup {
            id: shared::util::generate_id(),
            created_by: actor.id.clone(),
            created_at: shared::util::now_millis(),
            collections: self.export(&tables)?,
        };

        let txn = self.storage.begin_write()?;
        self.storage.put(&txn, BACKUPS, &backup.id, &backup)?;
        txn.commit()?;

        tracing::info!(
            backup_id = %backup.id,
            collections = ?names,
            "Backup created"
        );
        self.audit.record(
            AuditRecord::create(
                actor,
                RESOURCE,
                &backup.id,
                serde_json::json!({ "collections": names }),
            )
            .with_name(format!("Backup {}", backup.created_at)),
        );
        Ok(backup)
    }

    pub fn get_backup(&self, backup_id: &str) -> PosResult<Backup> {
        self.storage
            .read(BACKUPS, backup_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, backup_id))
    }

    fn export(
        &self,
        tables: &[(&str, JsonTable)],
    ) -> StorageResult<BTreeMap<String, Vec<serde_json::Value>>> {
        let read_txn = self.storage.begin_read()?;
        let mut out = BTreeMap::new();
        for (name, def) in tables {
            let table = read_txn.open_table(*def)?;
            let mut rows = Vec::new();
            for result in table.iter()? {
                let (_key, value) = result?;
                rows.push(serde_json::from_slice(value.value())?);
            }
            out.insert(name.to_string(), rows);
        }
        Ok(out)
    }
}
