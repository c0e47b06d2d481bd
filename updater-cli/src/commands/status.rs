use crate::app::CliApp;
use anyhow::Result;
use tracing::info;

/// 显示当前版本、最近检查与安装情况
pub fn run_status(app: &CliApp) -> Result<()> {
    let state = app.context.settings().update_state()?;
    let installer = app.context.installer();
    let tree = installer.tree();

    info!("📊 插件更新状态");
    info!("   仓库: {}", app.context.repository());
    info!("   插件目录: {}", tree.live_dir().display());
    info!("   当前版本: {}", state.current_version);
    if let Some(header_version) = tree.detect_version()? {
        if header_version != state.current_version {
            info!("   ⚠️  主文件头部版本为 {}，与记录不一致", header_version);
        }
    } else if !tree.exists() {
        info!("   ⚠️  插件目录不存在");
    }

    match state.last_checked_at {
        Some(at) => info!("   最近检查: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => info!("   最近检查: 从未检查"),
    }
    match &state.cached_release {
        Some(release) => info!("   可用更新: {}", release.version),
        None => info!("   可用更新: 无"),
    }

    if let Some(report) = &state.last_report {
        info!(
            "   最近安装: {} -> {} [{}] {}",
            report.from_version,
            report.to_version,
            report.status,
            report.at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !report.message.is_empty() {
            info!("     {}", report.message);
        }
    }

    let backups = installer.backups().list_backups()?;
    info!(
        "   备份: {} 个 (保留 {} 个)",
        backups.len(),
        app.context.retention().keep()
    );
    Ok(())
}
