use crate::error::Result;
use crate::models::BackupRecord;
use crate::settings::SettingsManager;
use std::io::ErrorKind;
use tracing::{debug, info, warn};

/// 清理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: Vec<BackupRecord>,
    pub removed: Vec<BackupRecord>,
}

/// 计算保留与删除的备份
///
/// 按创建时间降序保留前 `keep` 个；`protected_version` 的最新备份无论排在哪里都保留。
pub fn plan(
    backups: &[BackupRecord],
    keep: usize,
    protected_version: Option<&str>,
) -> (Vec<BackupRecord>, Vec<BackupRecord>) {
    let mut ordered = backups.to_vec();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let protected_index =
        protected_version.and_then(|version| ordered.iter().position(|r| r.version == version));

    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for (i, record) in ordered.into_iter().enumerate() {
        if i < keep || Some(i) == protected_index {
            kept.push(record);
        } else {
            removed.push(record);
        }
    }
    (kept, removed)
}

/// 备份保留策略
#[derive(Debug, Clone)]
pub struct BackupRetention {
    settings: SettingsManager,
    keep: usize,
}

impl BackupRetention {
    pub fn new(settings: SettingsManager, keep: usize) -> Self {
        Self { settings, keep }
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    /// 按清单删除多余备份，并用保留下来的记录重写清单
    pub async fn prune(&self, protected_version: Option<&str>) -> Result<PruneReport> {
        let backups = self.settings.backups()?;
        let report = prune(&backups, self.keep, protected_version).await;
        self.settings.set_backups(&report.kept)?;
        Ok(report)
    }
}

/// 删除计划中多余的备份文件
///
/// 单个文件删除失败只记录警告，该记录继续保留；文件已不存在视为删除成功。
pub async fn prune(
    backups: &[BackupRecord],
    keep: usize,
    protected_version: Option<&str>,
) -> PruneReport {
    let (mut kept, candidates) = plan(backups, keep, protected_version);
    debug!("备份保留 {} 个，待删除 {} 个", kept.len(), candidates.len());

    let mut removed = Vec::new();
    for record in candidates {
        match tokio::fs::remove_file(&record.file_path).await {
            Ok(()) => {
                info!("已删除旧备份: {}", record.file_path);
                removed.push(record);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("备份文件已不存在: {}", record.file_path);
                removed.push(record);
            }
            Err(e) => {
                warn!("删除旧备份失败 {}: {}", record.file_path, e);
                kept.push(record);
            }
        }
    }

    kept.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    PruneReport { kept, removed }
}
