use pos_server::{Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志) 并加载配置
    let config = setup_environment()?;

    print_banner();

    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        receipt_fallback = config.receipt_fallback,
        "🍗 POS server starting..."
    );

    // 2. 启动 HTTP 服务器 (Server::run 会打开数据库并启动审计 worker)
    let server = Server::new(config);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
