//! Backup handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::{Backup, BackupSummary, CreateBackup};

use crate::api::{CurrentActor, blocking};
use crate::core::ServerState;

/// POST /api/backups - 创建备份，只返回摘要
pub async fn create(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<CreateBackup>,
) -> AppResult<ApiResponse<BackupSummary>> {
    let backups = state.backups.clone();
    let backup = blocking(move || backups.create_backup(&actor, &payload.collections)).await?;
    Ok(ApiResponse::success(BackupSummary::from(&backup)))
}

/// GET /api/backups/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Backup>> {
    let backups = state.backups.clone();
    let backup = blocking(move || backups.get_backup(&id)).await?;
    Ok(ApiResponse::success(backup))
}
