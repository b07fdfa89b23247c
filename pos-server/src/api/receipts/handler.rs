//! Receipt reservation handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::{CancelReservation, ReceiptReservation, ReserveRequest};

use crate::api::{CurrentActor, blocking};
use crate::core::ServerState;

/// POST /api/receipts/reserve - 预留下一个票据号
pub async fn reserve(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<ReserveRequest>,
) -> AppResult<ApiResponse<ReceiptReservation>> {
    let receipts = state.receipts.clone();
    let reservation = blocking(move || {
        receipts.reserve_declared(&payload.document_type, payload.order_id, &actor)
    })
    .await?;
    Ok(ApiResponse::success(reservation))
}

/// POST /api/receipts/:id/cancel
pub async fn cancel(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(payload): Json<CancelReservation>,
) -> AppResult<ApiResponse<ReceiptReservation>> {
    let receipts = state.receipts.clone();
    let reservation = blocking(move || receipts.cancel(&id, payload.reason, &actor)).await?;
    Ok(ApiResponse::success(reservation))
}

/// GET /api/receipts/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReceiptReservation>> {
    let receipts = state.receipts.clone();
    let reservation = blocking(move || receipts.get_reservation(&id)).await?;
    Ok(ApiResponse::success(reservation))
}

/// GET /api/receipts/fallback - 需要对账的非连续票据号
pub async fn list_fallback(
    State(state): State<ServerState>,
) -> AppResult<ApiResponse<Vec<ReceiptReservation>>> {
    let receipts = state.receipts.clone();
    let list = blocking(move || receipts.list_fallback_reservations()).await?;
    Ok(ApiResponse::success(list))
}
