use crate::backup::BackupManager;
use crate::config::AppConfig;
use crate::constants::{backup, plugin};
use crate::downloader::FileDownloader;
use crate::error::Result;
use crate::installer::{ArtifactInstaller, InstallOutcome};
use crate::lock::InstallLock;
use crate::release::{CheckOutcome, ReleaseChecker};
use crate::retention::{BackupRetention, PruneReport};
use crate::settings::{JsonFileStore, SettingsManager, SettingsStore};
use crate::tree::PluginTree;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 一次完整更新周期（检查 → 安装 → 清理）的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub check: CheckOutcome,
    pub install: Option<InstallOutcome>,
    pub pruned: usize,
}

impl UpdateSummary {
    pub fn status_token(&self) -> &'static str {
        match (&self.check, &self.install) {
            (_, Some(install)) => install.status_token(),
            (CheckOutcome::CheckFailed(_), None) => "check_failed",
            _ => "no_update",
        }
    }

    pub fn message(&self) -> String {
        match (&self.check, &self.install) {
            (_, Some(install)) => install.message(),
            (CheckOutcome::CheckFailed(reason), None) => format!("release check failed: {reason}"),
            (CheckOutcome::NoUpdateAvailable { latest }, None) => {
                format!("already up to date (latest {latest})")
            }
            (CheckOutcome::UpdateAvailable(release), None) => {
                format!("update {} available", release.version)
            }
        }
    }
}

/// 应用上下文
///
/// 启动时根据配置和设置存储构建一次，之后在进程内通过 `Arc` 共享。
#[derive(Debug)]
pub struct UpdaterContext {
    config: AppConfig,
    settings: SettingsManager,
    checker: ReleaseChecker,
    installer: ArtifactInstaller,
    retention: BackupRetention,
    repository: String,
    tracked_branch: Option<String>,
    auth_token: Option<String>,
}

impl UpdaterContext {
    /// 使用配置中的 JSON 设置文件构建上下文
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store = JsonFileStore::new(config.get_settings_path())?;
        Self::build(config, Arc::new(store))
    }

    /// 解析配置与设置，构建各组件
    pub fn build(config: AppConfig, store: Arc<dyn SettingsStore>) -> Result<Self> {
        config.validate()?;
        config.ensure_dirs()?;

        let settings = SettingsManager::new(store);

        // 设置存储中的值优先于配置文件
        let repository = settings
            .repository()?
            .unwrap_or_else(|| config.upstream.repository.clone());
        let tracked_branch = settings.tracked_branch()?.or_else(|| {
            config
                .upstream
                .tracked_branch
                .clone()
                .filter(|branch| !branch.trim().is_empty())
        });
        let auth_token = settings.auth_token()?.or_else(|| config.resolve_auth_token());

        let tree = PluginTree::new(config.get_live_dir(), config.plugin.main_file.clone());
        Self::seed_current_version(&settings, &tree)?;

        let checker = ReleaseChecker::new(
            &config.upstream.api_base_url,
            config.request_timeout(),
            settings.clone(),
        )?;
        let downloader = FileDownloader::new(
            config.download_timeout(),
            &config.upstream.api_base_url,
            auth_token.clone(),
        )?;
        let backups = BackupManager::new(
            config.get_backup_dir(),
            &config.plugin.slug,
            settings.clone(),
        )?;
        let lock = InstallLock::new(
            config.get_backup_dir().join(backup::LOCK_FILE_NAME),
            config.lock_stale_after(),
        );
        let installer = ArtifactInstaller::new(
            tree,
            backups,
            downloader,
            settings.clone(),
            lock,
            config.get_temp_dir(),
        );
        let retention = BackupRetention::new(settings.clone(), config.backup.keep);

        debug!(
            "上下文已构建: repository={}, tracked_branch={:?}",
            repository, tracked_branch
        );

        Ok(Self {
            config,
            settings,
            checker,
            installer,
            retention,
            repository,
            tracked_branch,
            auth_token,
        })
    }

    /// 设置中没有版本号时，从主文件头读取；读取不到则使用兜底版本
    fn seed_current_version(settings: &SettingsManager, tree: &PluginTree) -> Result<()> {
        if settings.current_version()?.is_some() {
            return Ok(());
        }
        let version = match tree.detect_version() {
            Ok(Some(version)) => version,
            Ok(None) => plugin::FALLBACK_VERSION.to_string(),
            Err(e) => {
                warn!("读取主文件版本失败: {}", e);
                plugin::FALLBACK_VERSION.to_string()
            }
        };
        info!("初始化当前版本: {}", version);
        settings.set_current_version(&version)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsManager {
        &self.settings
    }

    pub fn checker(&self) -> &ReleaseChecker {
        &self.checker
    }

    pub fn installer(&self) -> &ArtifactInstaller {
        &self.installer
    }

    pub fn retention(&self) -> &BackupRetention {
        &self.retention
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tracked_branch(&self) -> Option<&str> {
        self.tracked_branch.as_deref()
    }

    /// 检查上游发布
    pub async fn check(&self) -> CheckOutcome {
        let current_version = match self.settings.current_version_or_fallback() {
            Ok(version) => version,
            Err(e) => return CheckOutcome::CheckFailed(e.to_string()),
        };
        self.checker
            .check(&current_version, &self.repository, self.auth_token.as_deref())
            .await
    }

    /// 清理多余备份，保护当前版本的最新备份
    ///
    /// 需要持有安装锁，安装进行中返回 `UpdaterError::Busy`。
    pub async fn prune_backups(&self, keep: Option<usize>) -> Result<PruneReport> {
        match keep {
            Some(keep) => {
                let retention = BackupRetention::new(self.settings.clone(), keep.max(1));
                self.installer.prune_backups(&retention).await
            }
            None => self.installer.prune_backups(&self.retention).await,
        }
    }

    /// 完整更新周期
    pub async fn run_update_cycle(&self) -> UpdateSummary {
        let check = self.check().await;
        let CheckOutcome::UpdateAvailable(release) = &check else {
            return UpdateSummary {
                check,
                install: None,
                pruned: 0,
            };
        };

        let (install, report) = self
            .installer
            .install_and_prune(release, &self.retention)
            .await;
        let pruned = report.map_or(0, |report| report.removed.len());

        UpdateSummary {
            check,
            install: Some(install),
            pruned,
        }
    }
}
