//! Customer directory handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::Customer;

use crate::api::{CurrentActor, blocking};
use crate::core::ServerState;

/// GET /api/customers/:document
pub async fn get_by_document(
    State(state): State<ServerState>,
    Path(document): Path<String>,
) -> AppResult<ApiResponse<Customer>> {
    let customers = state.customers.clone();
    let customer = blocking(move || customers.find_customer(&document)).await?;
    Ok(ApiResponse::success(customer))
}

/// PUT /api/customers/:document - 新建或合并
///
/// 路径中的证件号优先于请求体。
pub async fn upsert(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(document): Path<String>,
    Json(mut payload): Json<Customer>,
) -> AppResult<ApiResponse<Customer>> {
    payload.document = document;
    let customers = state.customers.clone();
    let customer = blocking(move || customers.upsert_customer(payload, &actor)).await?;
    Ok(ApiResponse::success(customer))
}
