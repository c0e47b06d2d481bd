use crate::backup::BackupManager;
use crate::constants::upgrade;
use crate::downloader::FileDownloader;
use crate::error::{Result, UpdaterError};
use crate::lock::InstallLock;
use crate::models::{BackupRecord, InstallReport, ReleaseInfo};
use crate::retention::{BackupRetention, PruneReport};
use crate::settings::SettingsManager;
use crate::tree::PluginTree;
use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// 安装失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    DownloadFailed,
    BackupFailed,
    InstallFailed,
    InstallFailedRollbackFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::DownloadFailed => "download_failed",
            FailureReason::BackupFailed => "backup_failed",
            FailureReason::InstallFailed => "install_failed",
            FailureReason::InstallFailedRollbackFailed => "install_failed_rollback_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 安装结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        version: String,
    },
    Failed {
        reason: FailureReason,
        rolled_back: bool,
        message: String,
    },
    /// 已有安装任务在执行
    Busy,
}

impl InstallOutcome {
    fn failed(reason: FailureReason, rolled_back: bool, message: impl Into<String>) -> Self {
        InstallOutcome::Failed {
            reason,
            rolled_back,
            message: message.into(),
        }
    }

    /// 对外展示的状态标识
    pub fn status_token(&self) -> &'static str {
        match self {
            InstallOutcome::Installed { .. } => "installed",
            InstallOutcome::Busy => "busy",
            InstallOutcome::Failed { reason, .. } => match reason {
                FailureReason::DownloadFailed => "download_failed",
                FailureReason::BackupFailed => "backup_failed",
                FailureReason::InstallFailed => "rolled_back",
                FailureReason::InstallFailedRollbackFailed => "rollback_failed",
            },
        }
    }

    pub fn message(&self) -> String {
        match self {
            InstallOutcome::Installed { version } => format!("installed version {version}"),
            InstallOutcome::Busy => "another update is already in progress".to_string(),
            InstallOutcome::Failed {
                reason, message, ..
            } => format!("{reason}: {message}"),
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. })
    }
}

/// 发布包安装器
///
/// 下载 → 备份 → 替换 → 失败回滚，同一时间只允许一个安装流程。
#[derive(Debug, Clone)]
pub struct ArtifactInstaller {
    tree: PluginTree,
    backups: BackupManager,
    downloader: FileDownloader,
    settings: SettingsManager,
    lock: InstallLock,
    temp_root: PathBuf,
}

impl ArtifactInstaller {
    pub fn new(
        tree: PluginTree,
        backups: BackupManager,
        downloader: FileDownloader,
        settings: SettingsManager,
        lock: InstallLock,
        temp_root: PathBuf,
    ) -> Self {
        Self {
            tree,
            backups,
            downloader,
            settings,
            lock,
            temp_root,
        }
    }

    pub fn tree(&self) -> &PluginTree {
        &self.tree
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// 安装指定发布
    pub async fn install(&self, release: &ReleaseInfo) -> InstallOutcome {
        self.run_install(release, None).await.0
    }

    /// 安装成功后在同一把锁内按保留策略清理旧备份
    pub async fn install_and_prune(
        &self,
        release: &ReleaseInfo,
        retention: &BackupRetention,
    ) -> (InstallOutcome, Option<PruneReport>) {
        self.run_install(release, Some(retention)).await
    }

    /// 手动清理旧备份，与安装流程共用安装锁
    pub async fn prune_backups(&self, retention: &BackupRetention) -> Result<PruneReport> {
        let Some(_guard) = self.lock.try_acquire()? else {
            return Err(UpdaterError::Busy);
        };
        let current_version = self.settings.current_version()?;
        retention.prune(current_version.as_deref()).await
    }

    async fn run_install(
        &self,
        release: &ReleaseInfo,
        retention: Option<&BackupRetention>,
    ) -> (InstallOutcome, Option<PruneReport>) {
        let guard = match self.lock.try_acquire() {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                warn!("已有更新任务正在执行，跳过本次安装");
                return (InstallOutcome::Busy, None);
            }
            Err(e) => {
                warn!("获取安装锁失败: {}", e);
                return (InstallOutcome::Busy, None);
            }
        };

        let from_version = match self.settings.current_version_or_fallback() {
            Ok(version) => version,
            Err(e) => {
                warn!("读取当前版本失败: {}", e);
                crate::constants::plugin::FALLBACK_VERSION.to_string()
            }
        };

        info!("开始安装: {} -> {}", from_version, release.version);
        let (outcome, note) = self.install_locked(release, &from_version).await;
        self.record_report(&from_version, &release.version, &outcome, note.as_deref());

        let pruned = match retention {
            Some(retention) if outcome.is_installed() => {
                match retention.prune(Some(&release.version)).await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        warn!("清理旧备份失败: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        drop(guard);
        (outcome, pruned)
    }

    /// 返回安装结果，以及需要写入安装报告的附加说明
    async fn install_locked(
        &self,
        release: &ReleaseInfo,
        from_version: &str,
    ) -> (InstallOutcome, Option<String>) {
        // 临时目录在离开作用域时删除
        let temp_dir = match self.create_temp_dir().await {
            Ok(dir) => dir,
            Err(e) => {
                let outcome = InstallOutcome::failed(
                    FailureReason::DownloadFailed,
                    false,
                    format!("创建临时目录失败: {e}"),
                );
                return (outcome, None);
            }
        };
        let package_path = temp_dir.path().join(upgrade::PACKAGE_FILE_NAME);

        info!("📥 [1/3] 下载更新包");
        if let Err(e) = self
            .downloader
            .download(&release.download_url, &package_path)
            .await
        {
            warn!("下载失败: {}", e);
            let outcome =
                InstallOutcome::failed(FailureReason::DownloadFailed, false, e.to_string());
            return (outcome, None);
        }

        info!("💾 [2/3] 备份当前代码树");
        let backup = match self
            .backups
            .create_backup(self.tree.live_dir(), from_version)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                warn!("备份失败，放弃安装: {}", e);
                let outcome =
                    InstallOutcome::failed(FailureReason::BackupFailed, false, e.to_string());
                return (outcome, None);
            }
        };

        info!("🔄 [3/3] 替换代码树");
        match self.tree.replace_from_archive(&package_path).await {
            Ok(()) => self.finalize(release),
            Err(e) => {
                warn!("替换代码树失败: {}. 正在尝试回滚...", e);
                (self.rollback(&backup, e).await, None)
            }
        }
    }

    async fn create_temp_dir(&self) -> Result<tempfile::TempDir> {
        tokio::fs::create_dir_all(&self.temp_root).await?;
        Ok(tempfile::Builder::new()
            .prefix("download-")
            .tempdir_in(&self.temp_root)?)
    }

    fn finalize(&self, release: &ReleaseInfo) -> (InstallOutcome, Option<String>) {
        match self.tree.detect_version() {
            Ok(Some(detected)) if detected != release.version => {
                warn!(
                    "代码树版本头 {} 与发布版本 {} 不一致",
                    detected, release.version
                );
            }
            Err(e) => warn!("读取代码树版本失败: {}", e),
            _ => {}
        }

        // 代码树已切换，版本号保存失败只能写进报告
        let note = match self.settings.set_current_version(&release.version) {
            Ok(()) => None,
            Err(e) => {
                error!("代码树已更新，但保存版本号失败: {}", e);
                Some(format!("failed to persist current_version: {e}"))
            }
        };
        if let Err(e) = self.settings.set_cached_release(None) {
            warn!("清除发布缓存失败: {}", e);
        }

        info!("✅ 更新完成: {}", release.version);
        let outcome = InstallOutcome::Installed {
            version: release.version.clone(),
        };
        (outcome, note)
    }

    async fn rollback(&self, backup: &BackupRecord, cause: UpdaterError) -> InstallOutcome {
        match self.backups.restore(backup, &self.tree).await {
            Ok(()) => {
                info!("回滚成功，代码树保持版本 {}", backup.version);
                InstallOutcome::failed(FailureReason::InstallFailed, true, cause.to_string())
            }
            Err(rollback_err) => {
                error!(
                    "❌ 安装失败且回滚失败，代码树可能处于不一致状态: {} / {}",
                    cause, rollback_err
                );
                InstallOutcome::failed(
                    FailureReason::InstallFailedRollbackFailed,
                    false,
                    format!("{cause}; rollback: {rollback_err}"),
                )
            }
        }
    }

    fn record_report(
        &self,
        from_version: &str,
        to_version: &str,
        outcome: &InstallOutcome,
        note: Option<&str>,
    ) {
        let message = match note {
            Some(note) => format!("{}; {}", outcome.message(), note),
            None => outcome.message(),
        };
        let report = InstallReport {
            from_version: from_version.to_string(),
            to_version: to_version.to_string(),
            status: outcome.status_token().to_string(),
            message,
            at: Utc::now(),
        };
        if let Err(e) = self.settings.set_last_report(&report) {
            warn!("保存安装报告失败: {}", e);
        }
    }

    /// 手动从备份恢复（默认最新备份），同样受安装锁保护
    pub async fn restore_backup(&self, file: Option<&str>) -> Result<BackupRecord> {
        let Some(_guard) = self.lock.try_acquire()? else {
            return Err(UpdaterError::Busy);
        };

        let record = match file {
            Some(file) => self.backups.find_backup(file)?.or_else(|| {
                let path = Path::new(file);
                path.is_file().then(|| BackupRecord {
                    file_path: file.to_string(),
                    version: String::new(),
                    created_at: Utc::now(),
                    sha256: String::new(),
                })
            }),
            None => self.backups.latest_backup()?,
        }
        .ok_or_else(|| UpdaterError::backup("没有可用的备份"))?;

        let from_version = self.settings.current_version_or_fallback()?;
        self.backups.restore(&record, &self.tree).await?;

        let restored_version = match self.tree.detect_version()? {
            Some(version) => version,
            None if !record.version.is_empty() => record.version.clone(),
            None => crate::constants::plugin::FALLBACK_VERSION.to_string(),
        };
        self.settings.set_current_version(&restored_version)?;
        self.settings.set_last_report(&InstallReport {
            from_version,
            to_version: restored_version.clone(),
            status: "rolled_back".to_string(),
            message: format!("manual restore from {}", record.file_path),
            at: Utc::now(),
        })?;

        info!("已手动恢复到版本 {}", restored_version);
        Ok(record)
    }
}
