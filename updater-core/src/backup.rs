use crate::archive;
use crate::constants::backup;
use crate::downloader::{calculate_file_hash, verify_file_integrity};
use crate::error::{Result, UpdaterError};
use crate::models::BackupRecord;
use crate::settings::SettingsManager;
use crate::tree::PluginTree;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 备份管理器
///
/// 负责代码树的 zip 备份、按记录恢复，以及磁盘与设置清单的对账。
#[derive(Debug, Clone)]
pub struct BackupManager {
    storage_dir: PathBuf,
    slug: String,
    settings: SettingsManager,
}

impl BackupManager {
    /// 创建新的备份管理器
    pub fn new(storage_dir: PathBuf, slug: &str, settings: SettingsManager) -> Result<Self> {
        if !storage_dir.exists() {
            std::fs::create_dir_all(&storage_dir)?;
        }

        Ok(Self {
            storage_dir,
            slug: slug.to_string(),
            settings,
        })
    }

    /// 获取存储目录
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// 备份文件名：`<slug>-<version>-<timestamp>.zip`
    pub fn backup_file_name(&self, version: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}-{}-{}{}",
            self.slug,
            version,
            at.format(backup::TIMESTAMP_FORMAT),
            backup::BACKUP_EXTENSION
        )
    }

    /// 备份代码树并登记到清单
    pub async fn create_backup(&self, live_dir: &Path, version: &str) -> Result<BackupRecord> {
        if !live_dir.is_dir() {
            return Err(UpdaterError::backup(format!(
                "代码树目录不存在: {}",
                live_dir.display()
            )));
        }

        let created_at = Utc::now();
        let backup_path = self
            .storage_dir
            .join(self.backup_file_name(version, created_at));

        info!("开始创建备份: {}", backup_path.display());

        let result: Result<String> = async {
            archive::archive_dir(live_dir, &backup_path, &self.slug).await?;
            calculate_file_hash(&backup_path).await
        }
        .await;

        let sha256 = match result {
            Ok(sha256) => sha256,
            Err(e) => {
                if backup_path.exists() {
                    let _ = tokio::fs::remove_file(&backup_path).await;
                }
                return Err(UpdaterError::backup(format!("备份创建失败: {e}")));
            }
        };

        let record = BackupRecord {
            file_path: backup_path.to_string_lossy().to_string(),
            version: version.to_string(),
            created_at,
            sha256,
        };
        self.settings.add_backup(record.clone())?;

        info!("备份创建成功: {}", backup_path.display());
        Ok(record)
    }

    /// 校验备份文件存在、摘要一致且归档可读
    pub async fn verify_backup(&self, record: &BackupRecord) -> Result<bool> {
        let backup_path = PathBuf::from(&record.file_path);
        if !backup_path.is_file() {
            warn!("备份文件不存在: {}", backup_path.display());
            return Ok(false);
        }

        if !record.sha256.is_empty() && !verify_file_integrity(&backup_path, &record.sha256).await? {
            return Ok(false);
        }

        let readable = tokio::task::spawn_blocking(move || archive::validate_archive(&backup_path))
            .await?
            .is_ok();
        Ok(readable)
    }

    /// 从备份恢复代码树
    pub async fn restore(&self, record: &BackupRecord, tree: &PluginTree) -> Result<()> {
        if !self.verify_backup(record).await? {
            return Err(UpdaterError::backup(format!(
                "备份校验失败: {}",
                record.file_path
            )));
        }

        info!("开始从备份恢复: {}", record.file_path);
        tree.replace_from_archive(Path::new(&record.file_path))
            .await?;
        info!("已从备份恢复到版本 {}", record.version);
        Ok(())
    }

    /// 获取所有备份记录（最新在前）
    pub fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        let mut backups = self.settings.backups()?;
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// 最新的备份
    pub fn latest_backup(&self) -> Result<Option<BackupRecord>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    /// 按文件路径或文件名查找备份
    pub fn find_backup(&self, file: &str) -> Result<Option<BackupRecord>> {
        Ok(self.list_backups()?.into_iter().find(|record| {
            record.file_path == file
                || Path::new(&record.file_path)
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy() == file)
        }))
    }

    /// 从文件名解析版本号：`<slug>-<version>-<timestamp>.zip`
    fn parse_backup_file_name(&self, file_name: &str) -> Option<String> {
        let stem = file_name
            .strip_prefix(&format!("{}-", self.slug))?
            .strip_suffix(backup::BACKUP_EXTENSION)?;
        let (version, timestamp) = stem.rsplit_once('-')?;
        if version.is_empty() || !timestamp.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(version.to_string())
    }

    /// 对账：合并磁盘上存在但未登记的备份，丢弃文件已丢失的记录
    pub async fn reconcile(&self) -> Result<Vec<BackupRecord>> {
        let mut records: Vec<BackupRecord> = self
            .settings
            .backups()?
            .into_iter()
            .filter(|record| {
                let exists = Path::new(&record.file_path).is_file();
                if !exists {
                    warn!("备份文件已丢失，移出清单: {}", record.file_path);
                }
                exists
            })
            .collect();

        let mut entries = tokio::fs::read_dir(&self.storage_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(version) = self.parse_backup_file_name(&file_name) else {
                continue;
            };
            let file_path = path.to_string_lossy().to_string();
            if records.iter().any(|record| record.file_path == file_path) {
                continue;
            }

            let modified = entry.metadata().await?.modified()?;
            info!("登记未入清单的备份: {}", file_name);
            records.push(BackupRecord {
                file_path,
                version,
                created_at: DateTime::<Utc>::from(modified),
                sha256: String::new(),
            });
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.settings.set_backups(&records)?;
        Ok(records)
    }
}
