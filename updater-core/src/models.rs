use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 上游发布信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// 去掉前缀后的版本号，例如 `2.1.0`
    pub version: String,
    pub download_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub notes: String,
}

/// 备份记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub file_path: String,
    /// 备份时代码树的版本
    pub version: String,
    pub created_at: DateTime<Utc>,
    /// 归档文件的 SHA-256（hex），回滚前校验
    #[serde(default)]
    pub sha256: String,
}

/// 安装尝试的结果摘要，供状态页展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub from_version: String,
    pub to_version: String,
    pub status: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// 持久化的更新状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateState {
    pub current_version: String,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub cached_release: Option<ReleaseInfo>,
    pub last_report: Option<InstallReport>,
}

/// Webhook 密钥
///
/// `Debug` 输出会隐藏内容，避免被写进日志。
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = WebhookSecret::new("super-secret-value");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert_eq!(secret.expose(), "super-secret-value");
    }

    #[test]
    fn test_backup_record_without_digest_deserializes() {
        let json = r#"{
            "file_path": "/backups/demo-1.0.0.zip",
            "version": "1.0.0",
            "created_at": "2025-01-01T00:00:00Z"
        }"#;
        let record: BackupRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.version, "1.0.0");
        assert!(record.sha256.is_empty());
    }
}
