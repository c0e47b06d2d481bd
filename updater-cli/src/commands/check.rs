use crate::app::CliApp;
use anyhow::{Result, bail};
use tracing::info;
use updater_core::release::CheckOutcome;

/// 检查上游最新发布
pub async fn run_check(app: &CliApp) -> Result<()> {
    let current_version = app.context.settings().current_version_or_fallback()?;
    info!("🔍 检查更新: {} (当前版本 {})", app.context.repository(), current_version);

    match app.context.check().await {
        CheckOutcome::UpdateAvailable(release) => {
            info!("🆕 发现新版本: {} -> {}", current_version, release.version);
            if let Some(published_at) = release.published_at {
                info!("   发布时间: {}", published_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            info!("   下载地址: {}", release.download_url);
            if !release.notes.trim().is_empty() {
                info!("   更新说明:");
                for line in release.notes.lines().take(20) {
                    info!("     {}", line);
                }
            }
            info!("💡 运行 updater-cli update 安装新版本");
        }
        CheckOutcome::NoUpdateAvailable { latest } => {
            info!("✅ 已是最新版本 (上游 {})", latest);
        }
        CheckOutcome::CheckFailed(reason) => {
            bail!("检查更新失败: {reason}");
        }
    }
    Ok(())
}
