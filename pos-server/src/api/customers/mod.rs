//! Customer directory API

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/customers/{document}",
        get(handler::get_by_document).put(handler::upsert),
    )
}
