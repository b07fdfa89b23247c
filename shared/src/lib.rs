//! Shared types for the restaurant POS
//!
//! Data model, unified error codes and small utilities used by the
//! engine, its HTTP surface and any client.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
