use super::SettingsStore;
use crate::constants::{plugin, settings as keys, webhook};
use crate::models::{BackupRecord, InstallReport, ReleaseInfo, UpdateState, WebhookSecret};
use crate::{Result, UpdaterError};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;

/// 类型化的设置适配器
#[derive(Debug, Clone)]
pub struct SettingsManager {
    store: Arc<dyn SettingsStore>,
}

impl SettingsManager {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    // ========================================
    // 通用读写
    // ========================================

    fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get(key)?
            .filter(|value| !value.trim().is_empty()))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_string(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| UpdaterError::settings(format!("设置项 {key} 解析失败: {e}"))),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)?;
        Ok(())
    }

    // ========================================
    // 更新状态
    // ========================================

    /// 当前代码树版本
    pub fn current_version(&self) -> Result<Option<String>> {
        self.get_string(keys::CURRENT_VERSION)
    }

    pub fn current_version_or_fallback(&self) -> Result<String> {
        Ok(self
            .current_version()?
            .unwrap_or_else(|| plugin::FALLBACK_VERSION.to_string()))
    }

    pub fn set_current_version(&self, version: &str) -> Result<()> {
        self.store.set(keys::CURRENT_VERSION, version)?;
        Ok(())
    }

    pub fn last_checked_at(&self) -> Result<Option<DateTime<Utc>>> {
        match self.get_string(keys::LAST_CHECKED_AT)? {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|time| Some(time.with_timezone(&Utc)))
                .map_err(|e| UpdaterError::settings(format!("上次检查时间格式错误: {e}"))),
            None => Ok(None),
        }
    }

    pub fn set_last_checked_at(&self, at: DateTime<Utc>) -> Result<()> {
        self.store.set(keys::LAST_CHECKED_AT, &at.to_rfc3339())?;
        Ok(())
    }

    pub fn cached_release(&self) -> Result<Option<ReleaseInfo>> {
        self.get_json(keys::CACHED_RELEASE)
    }

    pub fn set_cached_release(&self, release: Option<&ReleaseInfo>) -> Result<()> {
        match release {
            Some(release) => self.set_json(keys::CACHED_RELEASE, release),
            None => {
                self.store.delete(keys::CACHED_RELEASE)?;
                Ok(())
            }
        }
    }

    pub fn last_report(&self) -> Result<Option<InstallReport>> {
        self.get_json(keys::LAST_INSTALL_REPORT)
    }

    pub fn set_last_report(&self, report: &InstallReport) -> Result<()> {
        self.set_json(keys::LAST_INSTALL_REPORT, report)
    }

    /// 汇总的更新状态
    pub fn update_state(&self) -> Result<UpdateState> {
        Ok(UpdateState {
            current_version: self.current_version_or_fallback()?,
            last_checked_at: self.last_checked_at()?,
            cached_release: self.cached_release()?,
            last_report: self.last_report()?,
        })
    }

    // ========================================
    // 备份清单
    // ========================================

    pub fn backups(&self) -> Result<Vec<BackupRecord>> {
        Ok(self.get_json(keys::BACKUPS)?.unwrap_or_default())
    }

    pub fn set_backups(&self, backups: &[BackupRecord]) -> Result<()> {
        self.set_json(keys::BACKUPS, &backups)
    }

    pub fn add_backup(&self, record: BackupRecord) -> Result<()> {
        let mut backups = self.backups()?;
        backups.push(record);
        self.set_backups(&backups)
    }

    // ========================================
    // 上游仓库设置
    // ========================================

    pub fn repository(&self) -> Result<Option<String>> {
        self.get_string(keys::REPOSITORY)
    }

    pub fn set_repository(&self, repository: &str) -> Result<()> {
        self.store.set(keys::REPOSITORY, repository)?;
        Ok(())
    }

    pub fn tracked_branch(&self) -> Result<Option<String>> {
        self.get_string(keys::TRACKED_BRANCH)
    }

    pub fn set_tracked_branch(&self, branch: &str) -> Result<()> {
        self.store.set(keys::TRACKED_BRANCH, branch)?;
        Ok(())
    }

    pub fn auth_token(&self) -> Result<Option<String>> {
        self.get_string(keys::AUTH_TOKEN)
    }

    // ========================================
    // Webhook 密钥
    // ========================================

    /// 读取已保存的密钥，不会生成新密钥
    pub fn webhook_secret(&self) -> Result<Option<WebhookSecret>> {
        Ok(self.get_string(keys::WEBHOOK_SECRET)?.map(WebhookSecret::new))
    }

    /// 读取密钥，首次访问时生成并保存
    pub fn webhook_secret_or_create(&self) -> Result<WebhookSecret> {
        if let Some(secret) = self.webhook_secret()? {
            return Ok(secret);
        }
        info!("首次访问，生成 Webhook 密钥");
        self.regenerate_webhook_secret()
    }

    /// 生成新密钥并立即替换旧密钥
    pub fn regenerate_webhook_secret(&self) -> Result<WebhookSecret> {
        let secret = generate_secret();
        self.store.set(keys::WEBHOOK_SECRET, secret.expose())?;
        info!("Webhook 密钥已更新");
        Ok(secret)
    }
}

/// 生成 URL 安全的随机密钥
pub fn generate_secret() -> WebhookSecret {
    let mut bytes = [0u8; webhook::SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    WebhookSecret::new(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn manager() -> SettingsManager {
        SettingsManager::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_secret_is_created_once_and_regenerated_on_demand() {
        let settings = manager();
        assert!(settings.webhook_secret().unwrap().is_none());

        let first = settings.webhook_secret_or_create().unwrap();
        let again = settings.webhook_secret_or_create().unwrap();
        assert_eq!(first, again);
        assert!(first.expose().len() >= 32);
        assert!(
            first
                .expose()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );

        let rotated = settings.regenerate_webhook_secret().unwrap();
        assert_ne!(first, rotated);
        assert_eq!(settings.webhook_secret().unwrap(), Some(rotated));
    }

    #[test]
    fn test_update_state_defaults() {
        let settings = manager();
        let state = settings.update_state().unwrap();
        assert_eq!(state.current_version, "0.0.0");
        assert!(state.last_checked_at.is_none());
        assert!(state.cached_release.is_none());
    }

    #[test]
    fn test_cached_release_set_and_clear() {
        let settings = manager();
        let release = ReleaseInfo {
            version: "2.0.0".to_string(),
            download_url: "https://example.com/pkg.zip".to_string(),
            published_at: None,
            notes: "notes".to_string(),
        };

        settings.set_cached_release(Some(&release)).unwrap();
        assert_eq!(settings.cached_release().unwrap(), Some(release));

        settings.set_cached_release(None).unwrap();
        assert!(settings.cached_release().unwrap().is_none());
    }

    #[test]
    fn test_backup_inventory_appends() {
        let settings = manager();
        for version in ["1.0.0", "1.1.0"] {
            settings
                .add_backup(BackupRecord {
                    file_path: format!("/b/demo-{version}.zip"),
                    version: version.to_string(),
                    created_at: Utc::now(),
                    sha256: String::new(),
                })
                .unwrap();
        }
        let backups = settings.backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[1].version, "1.1.0");
    }
}
