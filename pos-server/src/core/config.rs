use std::path::PathBuf;

/// 结账金额允许的最大误差
pub const MAX_PAYMENT_TOLERANCE: f64 = 0.01;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 日志格式 |
/// | AUDIT_BUFFER_SIZE | 1024 | 审计通道容量 |
/// | RECEIPT_FALLBACK | false | 计数器不可用时发放非连续票据号 |
/// | PAYMENT_TOLERANCE | 0.01 | 结账金额误差 (上限 0.01) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/pos HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    /// 审计 mpsc 通道容量
    pub audit_buffer_size: usize,
    /// 票据号降级开关 (默认关闭：计数器失败即拒绝预留)
    pub receipt_fallback: bool,
    pub payment_tolerance: f64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            audit_buffer_size: std::env::var("AUDIT_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1024),
            receipt_fallback: std::env::var("RECEIPT_FALLBACK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            payment_tolerance: std::env::var("PAYMENT_TOLERANCE")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .map(clamp_tolerance)
                .unwrap_or(MAX_PAYMENT_TOLERANCE),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("pos.redb")
    }

    /// 日志目录
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn clamp_tolerance(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value.min(MAX_PAYMENT_TOLERANCE)
    } else {
        MAX_PAYMENT_TOLERANCE
    }
}
