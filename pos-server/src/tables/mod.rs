//! 桌台管理

mod registry;

pub use registry::TableRegistry;
