use crate::app::CliApp;
use anyhow::{Result, bail};
use tracing::{error, info, warn};
use updater_core::installer::InstallOutcome;
use updater_core::release::CheckOutcome;

/// 完整更新周期，供 cron 等外部调度调用
pub async fn run_update(app: &CliApp) -> Result<()> {
    info!("🔄 开始更新周期");
    let summary = app.context.run_update_cycle().await;

    match (&summary.check, &summary.install) {
        (CheckOutcome::CheckFailed(reason), _) => bail!("检查更新失败: {reason}"),
        (CheckOutcome::NoUpdateAvailable { latest }, _) => {
            info!("✅ 已是最新版本 (上游 {})", latest);
        }
        (_, Some(InstallOutcome::Installed { version })) => {
            info!("🎉 已更新到版本 {}", version);
            if summary.pruned > 0 {
                info!("🧹 清理旧备份 {} 个", summary.pruned);
            }
        }
        (_, Some(InstallOutcome::Busy)) => {
            warn!("⏳ 已有更新任务正在执行，本次跳过");
        }
        (_, Some(outcome @ InstallOutcome::Failed { rolled_back, .. })) => {
            if *rolled_back {
                warn!("↩️  安装失败，已回滚到原版本");
            } else {
                error!("❌ 安装失败");
            }
            bail!("{}", outcome.message());
        }
        (CheckOutcome::UpdateAvailable(_), None) => {}
    }
    Ok(())
}
