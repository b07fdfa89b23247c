//! Dining Table API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{DiningTable, DiningTableCreate, SetOccupied};

use crate::api::{CurrentActor, blocking};
use crate::core::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub reason: Option<String>,
}

/// GET /api/tables - 获取所有桌台 (按桌号排序)
pub async fn list(State(state): State<ServerState>) -> AppResult<ApiResponse<Vec<DiningTable>>> {
    let tables = state.tables.clone();
    let list = blocking(move || tables.list_tables()).await?;
    Ok(ApiResponse::success(list))
}

/// GET /api/tables/available - 空闲桌台
pub async fn list_available(
    State(state): State<ServerState>,
) -> AppResult<ApiResponse<Vec<DiningTable>>> {
    let tables = state.tables.clone();
    let list = blocking(move || tables.list_available()).await?;
    Ok(ApiResponse::success(list))
}

/// POST /api/tables - 创建桌台
pub async fn create(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<DiningTableCreate>,
) -> AppResult<ApiResponse<DiningTable>> {
    let tables = state.tables.clone();
    let table = blocking(move || tables.create_table(payload.number, &actor)).await?;
    Ok(ApiResponse::success(table))
}

/// PUT /api/tables/:id/occupied - 手动切换占用状态
pub async fn set_occupied(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(payload): Json<SetOccupied>,
) -> AppResult<ApiResponse<DiningTable>> {
    let tables = state.tables.clone();
    let table = blocking(move || tables.set_occupied(&id, payload.occupied, &actor)).await?;
    Ok(ApiResponse::success(table))
}

/// DELETE /api/tables/:id - 删除桌台 (先归档)
pub async fn delete(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> AppResult<ApiResponse<()>> {
    let tables = state.tables.clone();
    blocking(move || tables.delete_table(&id, &actor, params.reason.as_deref())).await?;
    Ok(ApiResponse::ok())
}
