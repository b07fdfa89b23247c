//! Backup Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 未指定集合时的默认备份范围
pub const DEFAULT_BACKUP_COLLECTIONS: &[&str] = &["tables", "orders"];

/// JSON 备份 (集合名 → 行)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub id: String,
    pub created_by: String,
    pub created_at: i64,
    pub collections: BTreeMap<String, Vec<serde_json::Value>>,
}

/// 创建备份请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBackup {
    #[serde(default)]
    pub collections: Vec<String>,
}

/// 创建备份的结果 (不回传数据本身)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSummary {
    pub id: String,
    pub created_at: i64,
    /// 集合名 → 行数
    pub counts: BTreeMap<String, usize>,
}

impl From<&Backup> for BackupSummary {
    fn from(backup: &Backup) -> Self {
        Self {
            id: backup.id.clone(),
            created_at: backup.created_at,
            counts: backup
                .collections
                .iter()
                .map(|(name, rows)| (name.clone(), rows.len()))
                .collect(),
        }
    }
}
