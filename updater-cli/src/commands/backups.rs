use crate::app::CliApp;
use crate::utils::format_size;
use anyhow::{Result, bail};
use std::path::Path;
use tracing::{info, warn};
use updater_core::UpdaterError;

/// 列出所有备份（先与备份目录对账）
pub async fn run_list_backups(app: &CliApp) -> Result<()> {
    let backup_manager = app.context.installer().backups();
    let backups = backup_manager.reconcile().await?;

    if backups.is_empty() {
        info!("📦 暂无备份");
        return Ok(());
    }

    info!("📦 备份列表 ({}):", backup_manager.storage_dir().display());
    info!("{:<44} {:<12} {:<20} {:>10}", "文件", "版本", "创建时间", "大小");
    for record in &backups {
        let path = Path::new(&record.file_path);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| record.file_path.clone());
        let size = match tokio::fs::metadata(path).await {
            Ok(metadata) => format_size(metadata.len()),
            Err(_) => "-".to_string(),
        };
        let verified = backup_manager.verify_backup(record).await.unwrap_or(false);
        info!(
            "{:<44} {:<12} {:<20} {:>10}{}",
            file_name,
            record.version,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            size,
            if verified { "" } else { "  ⚠️ 校验失败" }
        );
    }
    Ok(())
}

/// 按保留策略清理旧备份，当前版本的最新备份始终保留
pub async fn run_prune_backups(app: &CliApp, keep: Option<usize>) -> Result<()> {
    let keep = keep.unwrap_or_else(|| app.context.retention().keep());
    info!("🧹 清理旧备份，保留最近 {} 个", keep);

    let report = match app.context.prune_backups(Some(keep)).await {
        Ok(report) => report,
        Err(UpdaterError::Busy) => {
            warn!("⏳ 已有更新任务正在执行");
            bail!("更新任务进行中，请稍后再试")
        }
        Err(e) => return Err(e.into()),
    };
    for record in &report.removed {
        info!("   已删除: {}", record.file_path);
    }
    info!(
        "✅ 清理完成: 删除 {} 个，保留 {} 个",
        report.removed.len(),
        report.kept.len()
    );
    Ok(())
}

/// 从备份恢复插件目录
pub async fn run_rollback(app: &CliApp, file: Option<&str>) -> Result<()> {
    match file {
        Some(file) => info!("↩️  从备份恢复: {}", file),
        None => info!("↩️  从最新备份恢复"),
    }

    match app.context.installer().restore_backup(file).await {
        Ok(record) => {
            let version = app.context.settings().current_version_or_fallback()?;
            info!("✅ 已恢复 {}，当前版本 {}", record.file_path, version);
            Ok(())
        }
        Err(UpdaterError::Busy) => {
            warn!("⏳ 已有更新任务正在执行");
            bail!("更新任务进行中，请稍后再试")
        }
        Err(e) => Err(e.into()),
    }
}
