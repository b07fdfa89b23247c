//! 审计日志 handlers

use axum::extract::{Query, State};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{ArchivedEntity, AuditChainVerification, AuditListResponse, AuditQuery};

use crate::api::blocking;
use crate::core::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct ArchivedQuery {
    pub entity_type: Option<String>,
}

/// GET /api/audit
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<AuditQuery>,
) -> AppResult<ApiResponse<AuditListResponse>> {
    let audit = state.audit.clone();
    let (items, total) = blocking(move || Ok(audit.query(&query)?)).await?;
    Ok(ApiResponse::success(AuditListResponse { items, total }))
}

/// GET /api/audit/verify
pub async fn verify_chain(
    State(state): State<ServerState>,
) -> AppResult<ApiResponse<AuditChainVerification>> {
    let audit = state.audit.clone();
    let verification = blocking(move || Ok(audit.verify_chain()?)).await?;
    if !verification.chain_intact {
        tracing::warn!(
            breaks = verification.breaks.len(),
            "Audit chain verification found breaks"
        );
    }
    Ok(ApiResponse::success(verification))
}

/// GET /api/audit/archived
pub async fn list_archived(
    State(state): State<ServerState>,
    Query(query): Query<ArchivedQuery>,
) -> AppResult<ApiResponse<Vec<ArchivedEntity>>> {
    let audit = state.audit.clone();
    let list = blocking(move || Ok(audit.list_archived(query.entity_type.as_deref())?)).await?;
    Ok(ApiResponse::success(list))
}
