//! Order API Module
//!
//! 订单生命周期 (创建、改菜、送达、删除) 以及结账。

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id).delete(handler::delete))
        .route("/{id}/items", put(handler::update_items))
        .route("/{id}/deliver", post(handler::deliver))
        .route("/{id}/settle", post(handler::settle))
}
