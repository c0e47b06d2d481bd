use crate::app::CliApp;
use anyhow::Result;
use tracing::{info, warn};

// 密钥只写到标准输出，不进入日志

pub fn show_secret(app: &CliApp) -> Result<()> {
    let secret = app.context.settings().webhook_secret_or_create()?;
    info!("🔑 Webhook 密钥 (在仓库 Webhook 设置中填写):");
    println!("{}", secret.expose());
    Ok(())
}

/// 重新生成密钥，旧密钥签名的投递会被拒绝
pub fn regenerate_secret(app: &CliApp) -> Result<()> {
    let secret = app.context.settings().regenerate_webhook_secret()?;
    warn!("🔄 Webhook 密钥已重新生成，请同步更新仓库的 Webhook 设置");
    println!("{}", secret.expose());
    Ok(())
}
