use crate::app::CliApp;
use anyhow::{Context, Result};
use tracing::{info, warn};
use updater_core::constants::webhook;
use updater_core::webhook::create_router;

/// 启动 Webhook 服务，Ctrl+C 后优雅退出
pub async fn run_serve(app: &CliApp, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| app.config().server.bind.clone());

    // 提前生成密钥，避免第一次投递时才创建
    app.context
        .settings()
        .webhook_secret_or_create()
        .context("初始化 Webhook 密钥失败")?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("无法监听地址 {bind}"))?;

    info!("🚀 Webhook 服务已启动: http://{}{}", bind, webhook::ROUTE);
    info!("   仓库: {}", app.context.repository());
    match app.context.tracked_branch() {
        Some(branch) => info!("   跟踪分支: {} (负载中的默认分支优先)", branch),
        None => info!("   跟踪分支: 使用负载中的默认分支"),
    }
    info!("   当前版本: {}", app.context.settings().current_version_or_fallback()?);

    let router = create_router(app.context.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook 服务异常退出")?;

    info!("👋 Webhook 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("监听退出信号失败: {}", e);
        std::future::pending::<()>().await;
    }
}
