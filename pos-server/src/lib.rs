//! 餐厅 POS 核心 - 桌台、订单生命周期与结账
//!
//! # 架构概述
//!
//! - **桌台** (`tables`): 桌号唯一，占用状态跟随开放订单
//! - **订单** (`orders`): pending → delivered → settled 状态机
//! - **票据号** (`receipts`): 按序列 (B001 / F001) 原子递增的预留
//! - **结账** (`checkout`): 单个 redb 写事务内完成销售记录、订单、桌台和预留的更新
//! - **审计** (`audit`): 事务提交后异步写入的哈希链审计日志，删除前同步归档
//! - **HTTP API** (`api`): axum 薄封装
//!
//! # 模块结构
//!
//! ```text
//! pos-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── db/            # redb 存储
//! ├── tables/        # 桌台
//! ├── orders/        # 订单生命周期、金额计算
//! ├── receipts/      # 票据号分配
//! ├── checkout/      # 结账事务
//! ├── customers/     # 客户目录
//! ├── sales/         # 销售历史、日结
//! ├── backup/        # JSON 备份
//! ├── audit/         # 审计日志、归档
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod audit;
pub mod backup;
pub mod checkout;
pub mod core;
pub mod customers;
pub mod db;
pub mod orders;
pub mod receipts;
pub mod sales;
pub mod tables;
pub mod utils;

// Re-export 公共类型
pub use audit::{AuditService, AuditWorker};
pub use checkout::CheckoutEngine;
pub use core::{Config, PosError, PosResult, Server, ServerState};
pub use db::PosStorage;
pub use orders::OrdersManager;
pub use receipts::ReceiptAllocator;
pub use tables::TableRegistry;

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ____  ____  _____
   / __ \/ __ \/ ___/
  / /_/ / / / /\__ \
 / ____/ /_/ /___/ /
/_/    \____//____/
    "#
    );
}

/// 加载 `.env` 并初始化日志
///
/// 必须在读取 [`Config`] 之前调用，`.env` 中的变量才会生效。
pub fn setup_environment() -> anyhow::Result<Config> {
    if let Err(e) = dotenv::dotenv() {
        // .env 不存在是正常情况
        if !e.not_found() {
            eprintln!("Failed to load .env: {e}");
        }
    }

    let config = Config::from_env();
    let log_dir = config.log_dir();
    // 生产环境始终输出 JSON
    let json = config.log_json || config.is_production();
    init_logger_with_file(&config.log_level, json, Some(&log_dir))?;
    Ok(config)
}
