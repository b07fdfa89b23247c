//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{
    CreateOrder, ItemEdit, Order, OrderFilter, OrderStatus, SalesRecord, SettleRequest,
};

use crate::api::{CurrentActor, blocking};
use crate::core::ServerState;

/// GET /api/orders 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub owner_id: Option<String>,
    pub table_id: Option<String>,
}

impl From<OrderListQuery> for OrderFilter {
    fn from(q: OrderListQuery) -> Self {
        OrderFilter {
            statuses: q.status.into_iter().collect(),
            owner_id: q.owner_id,
            table_id: q.table_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateItems {
    pub edits: Vec<ItemEdit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub reason: Option<String>,
}

/// GET /api/orders - 订单列表 (按创建时间)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let orders = state.orders.clone();
    let filter = OrderFilter::from(query);
    let list = blocking(move || orders.list_orders(&filter)).await?;
    Ok(ApiResponse::success(list))
}

/// GET /api/orders/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let orders = state.orders.clone();
    let order = blocking(move || orders.get_order(&id)).await?;
    Ok(ApiResponse::success(order))
}

/// POST /api/orders - 开台下单
pub async fn create(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<CreateOrder>,
) -> AppResult<ApiResponse<Order>> {
    let orders = state.orders.clone();
    let order = blocking(move || orders.create_order(payload, &actor)).await?;
    Ok(ApiResponse::success(order))
}

/// PUT /api/orders/:id/items - 送达前改菜
pub async fn update_items(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(payload): Json<UpdateItems>,
) -> AppResult<ApiResponse<Order>> {
    let orders = state.orders.clone();
    let order = blocking(move || orders.update_items(&id, payload.edits, &actor)).await?;
    Ok(ApiResponse::success(order))
}

/// POST /api/orders/:id/deliver
pub async fn deliver(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let orders = state.orders.clone();
    let order = blocking(move || orders.deliver(&id, &actor)).await?;
    Ok(ApiResponse::success(order))
}

/// DELETE /api/orders/:id - 删除 pending 订单并释放桌台
pub async fn delete(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> AppResult<ApiResponse<()>> {
    let orders = state.orders.clone();
    blocking(move || orders.delete_pending(&id, &actor, params.reason.as_deref())).await?;
    Ok(ApiResponse::ok())
}

/// POST /api/orders/:id/settle - 结账
pub async fn settle(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(payload): Json<SettleRequest>,
) -> AppResult<ApiResponse<SalesRecord>> {
    let checkout = state.checkout.clone();
    let record = blocking(move || checkout.settle(&id, &actor, payload)).await?;
    Ok(ApiResponse::success(record))
}
