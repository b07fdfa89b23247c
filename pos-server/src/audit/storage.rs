//! 审计日志 redb 存储层
//!
//! Append-only 设计，没有任何删除/更新接口。
//! SHA256 哈希链确保防篡改。

use redb::ReadableTable;
use sha2::{Digest, Sha256};
use shared::models::{
    ArchivedEntity, AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, AuditQuery,
    ChainBreakKind,
};

use super::service::AuditRecord;
use crate::db::storage::{ARCHIVED, AUDIT_ENTRIES};
use crate::db::{PosStorage, StorageResult};

/// 链起点
const GENESIS_HASH: &str = "genesis";

/// 审计日志存储 (redb)
///
/// - 仅提供 `append` / `store_archive` 和查询方法
/// - 序列号与哈希在同一个写事务中读取并写入，redb 串行化写事务，无需额外锁
#[derive(Debug, Clone)]
pub struct AuditStorage {
    storage: PosStorage,
}

impl AuditStorage {
    pub fn new(storage: PosStorage) -> Self {
        Self { storage }
    }

    /// 追加一条审计日志
    ///
    /// 1. 读取当前最大序列号和 last_hash
    /// 2. 计算新条目的哈希
    /// 3. 写入条目
    pub fn append(&self, record: AuditRecord) -> StorageResult<AuditEntry> {
        let txn = self.storage.begin_write()?;
        let entry = {
            let mut table = txn.open_table(AUDIT_ENTRIES)?;

            let (id, prev_hash) = match table.last()? {
                Some((key, value)) => {
                    let last: AuditEntry = serde_json::from_slice(value.value())?;
                    (key.value() + 1, last.curr_hash)
                }
                None => (1, GENESIS_HASH.to_string()),
            };

            let mut entry = AuditEntry {
                id,
                actor_id: record.actor_id,
                actor_role: record.actor_role,
                action: record.action,
                entity_type: record.entity_type,
                entity_id: record.entity_id,
                entity_name: record.entity_name,
                old_values: record.old_values,
                new_values: record.new_values,
                created_at: shared::util::now_millis(),
                prev_hash,
                curr_hash: String::new(),
            };
            entry.curr_hash = compute_audit_hash(&entry);

            let bytes = serde_json::to_vec(&entry)?;
            table.insert(entry.id, bytes.as_slice())?;
            entry
        };
        txn.commit()?;
        Ok(entry)
    }

    /// 查询审计日志（新 → 旧），返回 (当前页, 匹配总数)
    pub fn query(&self, q: &AuditQuery) -> StorageResult<(Vec<AuditEntry>, u64)> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(AUDIT_ENTRIES)?;

        let mut items = Vec::new();
        let mut total = 0u64;
        for result in table.iter()?.rev() {
            let (_key, value) = result?;
            let entry: AuditEntry = serde_json::from_slice(value.value())?;
            if !q.matches(&entry) {
                continue;
            }
            if total as usize >= q.offset && items.len() < q.limit {
                items.push(entry);
            }
            total += 1;
        }

        Ok((items, total))
    }

    /// 验证哈希链完整性
    ///
    /// 每条记录的 `prev_hash` 必须等于前一条的 `curr_hash`，
    /// 且 `curr_hash` 必须与重新计算的结果一致。
    pub fn verify_chain(&self) -> StorageResult<AuditChainVerification> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(AUDIT_ENTRIES)?;

        let mut breaks = Vec::new();
        let mut expected_prev = GENESIS_HASH.to_string();
        let mut total_entries = 0u64;

        for result in table.iter()? {
            let (_key, value) = result?;
            let entry: AuditEntry = serde_json::from_slice(value.value())?;
            total_entries += 1;

            if entry.prev_hash != expected_prev {
                breaks.push(AuditChainBreak {
                    entry_id: entry.id,
                    kind: ChainBreakKind::PrevHashMismatch,
                    expected_hash: expected_prev.clone(),
                    actual_hash: entry.prev_hash.clone(),
                });
            }
            let recomputed = compute_audit_hash(&entry);
            if recomputed != entry.curr_hash {
                breaks.push(AuditChainBreak {
                    entry_id: entry.id,
                    kind: ChainBreakKind::ContentMismatch,
                    expected_hash: recomputed,
                    actual_hash: entry.curr_hash.clone(),
                });
            }
            expected_prev = entry.curr_hash;
        }

        Ok(AuditChainVerification {
            total_entries,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }

    // ========== Archive ==========

    /// 写入删除前快照
    pub fn store_archive(&self, archived: &ArchivedEntity) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.put(&txn, ARCHIVED, &archived.id, archived)?;
        txn.commit()?;
        Ok(())
    }

    /// 列出归档快照（按删除时间升序）
    pub fn list_archived(&self, entity_type: Option<&str>) -> StorageResult<Vec<ArchivedEntity>> {
        let mut archived: Vec<ArchivedEntity> = self.storage.read_all(ARCHIVED)?;
        if let Some(entity_type) = entity_type {
            archived.retain(|a| a.entity_type == entity_type);
        }
        archived.sort_by_key(|a| a.deleted_at);
        Ok(archived)
    }

    #[cfg(test)]
    pub(crate) fn overwrite_entry(&self, entry: &AuditEntry) -> StorageResult<()> {
        let txn = self.storage.begin_write()?;
        {
            let mut table = txn.open_table(AUDIT_ENTRIES)?;
            let bytes = serde_json::to_vec(entry)?;
            table.insert(entry.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

/// 计算审计条目的 SHA256 哈希
///
/// 所有存储字段（curr_hash 除外）参与哈希，任何修改都会导致不匹配。
/// - 变长字段间用 `\x00` 分隔，防止 `("ab","cd")` 与 `("abc","d")` 碰撞
/// - 定长字段（u64/i64）用 LE 字节序
/// - Optional 字段用 `\x00`=None / `\x01`+bytes=Some 区分
fn compute_audit_hash(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();

    // 链接前一条哈希
    hasher.update(entry.prev_hash.as_bytes());
    hasher.update(b"\x00");

    // 定长字段
    hasher.update(entry.id.to_le_bytes());
    hasher.update(entry.created_at.to_le_bytes());

    hasher.update(action_tag(entry.action).as_bytes());
    hasher.update(b"\x00");

    for field in [
        &entry.actor_id,
        &entry.actor_role,
        &entry.entity_type,
        &entry.entity_id,
    ] {
        hasher.update(field.as_bytes());
        hasher.update(b"\x00");
    }

    hash_optional(&mut hasher, entry.entity_name.as_deref());

    let old_values = entry.old_values.as_ref().map(|v| v.to_string());
    let new_values = entry.new_values.as_ref().map(|v| v.to_string());
    hash_optional(&mut hasher, old_values.as_deref());
    hash_optional(&mut hasher, new_values.as_deref());

    hex::encode(hasher.finalize())
}

fn action_tag(action: AuditAction) -> &'static str {
    match action {
        AuditAction::Create => "create",
        AuditAction::Update => "update",
        AuditAction::Delete => "delete",
    }
}

/// Optional 字段哈希：`\x00` = None, `\x01` + bytes + `\x00` = Some
fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");
}
