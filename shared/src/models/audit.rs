//! 审计日志 / 归档类型
//!
//! 审计条目只追加、不修改，按序列号串成 SHA256 哈希链。
//! 归档快照在任何硬删除之前写入，用于恢复。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 审计操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Create => f.write_str("create"),
            AuditAction::Update => f.write_str("update"),
            AuditAction::Delete => f.write_str("delete"),
        }
    }
}

/// 审计日志条目（不可变）
///
/// - `prev_hash`: 前一条记录的哈希
/// - `curr_hash`: 当前记录的哈希（包含 prev_hash + 所有字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 全局递增序列号
    pub id: u64,
    pub actor_id: String,
    pub actor_role: String,
    pub action: AuditAction,
    /// 实体类型 ("order", "dining_table", "receipt_reservation", ...)
    pub entity_type: String,
    pub entity_id: String,
    pub entity_name: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    /// Unix 毫秒
    pub created_at: i64,
    pub prev_hash: String,
    pub curr_hash: String,
}

/// 删除前的实体快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedEntity {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    /// 删除前的完整数据
    pub data: serde_json::Value,
    pub deleted_by: String,
    pub deleted_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// 审计日志查询参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
    /// 分页偏移
    #[serde(default)]
    pub offset: usize,
    /// 分页大小（默认 50）
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            actor_id: None,
            entity_type: None,
            entity_id: None,
            action: None,
            offset: 0,
            limit: default_limit(),
        }
    }
}

impl AuditQuery {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.actor_id.as_ref().is_none_or(|a| a == &entry.actor_id)
            && self
                .entity_type
                .as_ref()
                .is_none_or(|t| t == &entry.entity_type)
            && self.entity_id.as_ref().is_none_or(|i| i == &entry.entity_id)
            && self.action.is_none_or(|a| a == entry.action)
    }
}

/// 审计日志列表响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditListResponse {
    pub items: Vec<AuditEntry>,
    pub total: u64,
}

/// 审计链验证结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditChainVerification {
    pub total_entries: u64,
    pub chain_intact: bool,
    pub breaks: Vec<AuditChainBreak>,
}

/// 断裂类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreakKind {
    /// prev_hash 与前一条的 curr_hash 不一致
    PrevHashMismatch,
    /// 内容被修改，curr_hash 无法复算
    ContentMismatch,
}

/// 审计链断裂点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditChainBreak {
    pub entry_id: u64,
    pub kind: ChainBreakKind,
    pub expected_hash: String,
    pub actual_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_default_limit() {
        let query: AuditQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_query_matches_action() {
        let entry = AuditEntry {
            id: 1,
            actor_id: "u1".into(),
            actor_role: "admin".into(),
            action: AuditAction::Delete,
            entity_type: "order".into(),
            entity_id: "o1".into(),
            entity_name: None,
            old_values: None,
            new_values: None,
            created_at: 0,
            prev_hash: String::new(),
            curr_hash: String::new(),
        };
        let query = AuditQuery {
            action: Some(AuditAction::Delete),
            entity_type: Some("order".into()),
            ..Default::default()
        };
        assert!(query.matches(&entry));
        let query = AuditQuery {
            action: Some(AuditAction::Create),
            ..Default::default()
        };
        assert!(!query.matches(&entry));
    }
}
