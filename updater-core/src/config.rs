use crate::constants::{backup, http, plugin, settings, upgrade, upstream, webhook};
use crate::error::{Result, UpdaterError};
use crate::release::normalize_repository;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub plugin: PluginConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub lock: LockConfig,
}

/// 插件代码树配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PluginConfig {
    pub slug: String,
    pub live_dir: String,
    pub main_file: String,
}

/// 上游仓库配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// `owner/repo` 形式的仓库标识
    pub repository: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// 私有仓库的访问令牌
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Webhook 负载中缺少默认分支时使用的分支
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_branch: Option<String>,
}

/// 备份相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackupConfig {
    pub storage_dir: String,
    pub keep: usize,
}

/// 临时文件配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    pub temp_dir: String,
}

/// 网络配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub download_timeout_secs: u64,
}

/// Webhook 服务配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// 设置存储配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SettingsConfig {
    pub path: String,
}

/// 安装锁配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockConfig {
    pub stale_after_secs: u64,
}

fn default_api_base_url() -> String {
    upstream::DEFAULT_API_BASE_URL.to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            storage_dir: backup::get_default_storage_dir()
                .to_string_lossy()
                .to_string(),
            keep: backup::DEFAULT_KEEP,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            temp_dir: upgrade::get_default_temp_dir()
                .to_string_lossy()
                .to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: http::DEFAULT_TIMEOUT,
            download_timeout_secs: http::DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: webhook::DEFAULT_BIND.to_string(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: settings::get_default_settings_path()
                .to_string_lossy()
                .to_string(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: backup::DEFAULT_LOCK_STALE_SECS,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plugin: PluginConfig {
                slug: plugin::DEFAULT_SLUG.to_string(),
                live_dir: plugin::get_default_live_dir()
                    .to_string_lossy()
                    .to_string(),
                main_file: plugin::DEFAULT_MAIN_FILE.to_string(),
            },
            upstream: UpstreamConfig {
                repository: "owner/repo".to_string(),
                api_base_url: default_api_base_url(),
                auth_token: None,
                tracked_branch: None,
            },
            backup: BackupConfig::default(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            server: ServerConfig::default(),
            settings: SettingsConfig::default(),
            lock: LockConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(UpdaterError::ConfigNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;

        tracing::debug!("已加载配置文件: {}", path.display());
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// 校验配置项
    pub fn validate(&self) -> Result<()> {
        if self.plugin.slug.trim().is_empty() {
            return Err(UpdaterError::config("plugin.slug 不能为空"));
        }
        if self.plugin.main_file.trim().is_empty() {
            return Err(UpdaterError::config("plugin.main_file 不能为空"));
        }
        if self.backup.keep == 0 {
            return Err(UpdaterError::config("backup.keep 至少为 1"));
        }
        let repository = normalize_repository(&self.upstream.repository);
        if repository.split('/').filter(|s| !s.is_empty()).count() != 2 {
            return Err(UpdaterError::config(format!(
                "upstream.repository 需要 owner/repo 格式: {repository}"
            )));
        }
        Ok(())
    }

    /// 获取插件代码树路径
    pub fn get_live_dir(&self) -> PathBuf {
        PathBuf::from(&self.plugin.live_dir)
    }

    /// 获取备份目录路径
    pub fn get_backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.backup.storage_dir)
    }

    /// 获取临时下载目录路径
    pub fn get_temp_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache.temp_dir)
    }

    /// 获取设置文件路径
    pub fn get_settings_path(&self) -> PathBuf {
        PathBuf::from(&self.settings.path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.http.download_timeout_secs)
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock.stale_after_secs)
    }

    /// 访问令牌：配置文件优先，其次环境变量
    pub fn resolve_auth_token(&self) -> Option<String> {
        self.upstream
            .auth_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| {
                std::env::var(upstream::AUTH_TOKEN_ENV)
                    .ok()
                    .filter(|token| !token.trim().is_empty())
            })
    }

    /// 确保运行所需目录存在
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.get_backup_dir())?;
        fs::create_dir_all(self.get_temp_dir())?;
        Ok(())
    }
}
