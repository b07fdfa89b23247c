//! Backup API

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/backups", post(handler::create))
        .route("/api/backups/{id}", get(handler::get_by_id))
}
