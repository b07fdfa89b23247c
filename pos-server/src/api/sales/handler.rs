//! Sales history handlers

use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{DailyClose, SalesQuery, SalesRecord};

use crate::api::blocking;
use crate::core::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct DayCloseQuery {
    /// 默认当天 (UTC)
    pub day: Option<NaiveDate>,
    pub cashier_id: Option<String>,
}

/// GET /api/sales - 销售记录 (新的在前)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<SalesQuery>,
) -> AppResult<ApiResponse<Vec<SalesRecord>>> {
    let sales = state.sales.clone();
    let list = blocking(move || sales.list_sales(&query)).await?;
    Ok(ApiResponse::success(list))
}

/// GET /api/sales/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<SalesRecord>> {
    let sales = state.sales.clone();
    let record = blocking(move || sales.get_sale(&id)).await?;
    Ok(ApiResponse::success(record))
}

/// GET /api/sales/day-close - 日结
pub async fn day_close(
    State(state): State<ServerState>,
    Query(query): Query<DayCloseQuery>,
) -> AppResult<ApiResponse<DailyClose>> {
    let sales = state.sales.clone();
    let day = query
        .day
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let close = blocking(move || sales.day_close(query.cashier_id.as_deref(), day)).await?;
    Ok(ApiResponse::success(close))
}
