//! 审计日志 API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/audit | GET | 分页查询审计条目 |
//! | /api/audit/verify | GET | 校验哈希链 |
//! | /api/audit/archived | GET | 删除前归档的快照 |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/audit", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/verify", get(handler::verify_chain))
        .route("/archived", get(handler::list_archived))
}
