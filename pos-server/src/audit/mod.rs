//! 审计日志模块
//!
//! # 架构
//!
//! ```text
//! 业务事务提交成功
//!   ├─ AuditService::record()  → mpsc → AuditWorker → redb (audit_entries)
//!   └─ AuditService::archive() → redb (archived_entities)，在硬删除之前同步执行
//!
//! SHA256 哈希链: genesis → entry₁ → entry₂ → ... → entryₙ
//! ```
//!
//! 审计写入不在业务事务边界内：失败只记录日志和计数，不会回滚或阻塞业务。

pub mod diff;
pub mod service;
pub mod storage;
pub mod worker;

pub use service::{AuditRecord, AuditService, snapshot};
pub use storage::AuditStorage;
pub use worker::AuditWorker;
