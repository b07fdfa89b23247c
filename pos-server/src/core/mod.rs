//! 核心模块 - 配置、状态、错误和 HTTP 服务器
//!
//! # 模块结构
//!
//! - [`Config`] - 服务器配置
//! - [`ServerState`] - 服务器状态
//! - [`Server`] - HTTP 服务器
//! - [`PosError`] - 引擎错误

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{PosError, PosResult, classify_storage_error};
pub use server::Server;
pub use state::ServerState;
