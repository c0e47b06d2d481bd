/// 插件代码树相关常量
pub mod plugin {
    use std::path::{Path, PathBuf};

    /// 默认插件标识（用于备份文件命名）
    pub const DEFAULT_SLUG: &str = "snippet-aggregator";

    /// 默认插件主文件名（包含 `Version:` 头信息）
    pub const DEFAULT_MAIN_FILE: &str = "snippet-aggregator.php";

    /// 插件代码树目录名
    pub const LIVE_DIR_NAME: &str = "plugin";

    /// 主文件头中的版本字段
    pub const VERSION_HEADER: &str = "Version:";

    /// 代码树版本无法识别时的兜底版本
    pub const FALLBACK_VERSION: &str = "0.0.0";

    /// 获取默认插件代码树路径（跨平台）
    pub fn get_default_live_dir() -> PathBuf {
        Path::new(".").join(LIVE_DIR_NAME)
    }
}

/// 上游发布 API 相关常量
pub mod upstream {
    /// 默认 GitHub API 地址
    pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

    /// 最新发布端点（包含占位符）
    pub const LATEST_RELEASE_PATH: &str = "/repos/{repository}/releases/latest";

    /// GitHub API Accept 头
    pub const ACCEPT_HEADER: &str = "application/vnd.github+json";

    /// 认证令牌环境变量
    pub const AUTH_TOKEN_ENV: &str = "UPDATER_AUTH_TOKEN";
}

/// HTTP相关常量
pub mod http {
    /// 默认网络超时时间（秒）
    pub const DEFAULT_TIMEOUT: u64 = 10;

    /// 默认下载超时时间（秒）
    pub const DEFAULT_DOWNLOAD_TIMEOUT: u64 = 10;

    /// User-Agent头
    pub fn user_agent() -> String {
        format!("updater-cli/{}", env!("CARGO_PKG_VERSION"))
    }
}

/// Webhook 相关常量
pub mod webhook {
    /// Webhook 路由
    pub const ROUTE: &str = "/webhook";

    /// 健康检查路由
    pub const HEALTH_ROUTE: &str = "/health";

    /// 签名请求头
    pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

    /// 事件类型请求头
    pub const EVENT_HEADER: &str = "x-github-event";

    /// 投递 ID 请求头
    pub const DELIVERY_HEADER: &str = "x-github-delivery";

    /// 签名前缀
    pub const SIGNATURE_PREFIX: &str = "sha256=";

    /// 分支引用前缀
    pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

    /// 密钥随机字节数（hex 编码后为 64 个字符）
    pub const SECRET_BYTES: usize = 32;

    /// 默认监听地址
    pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
}

/// 备份相关常量
pub mod backup {
    use std::path::{Path, PathBuf};

    /// 备份目录名
    pub const BACKUP_DIR_NAME: &str = "backups";

    /// 备份文件扩展名
    pub const BACKUP_EXTENSION: &str = ".zip";

    /// 备份文件名中的时间戳格式
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

    /// 默认保留的备份数量
    pub const DEFAULT_KEEP: usize = 3;

    /// 安装锁文件名
    pub const LOCK_FILE_NAME: &str = ".update.lock";

    /// 锁文件过期时间（秒）
    pub const DEFAULT_LOCK_STALE_SECS: u64 = 30 * 60;

    /// 获取默认备份存储目录（用于配置）
    pub fn get_default_storage_dir() -> PathBuf {
        Path::new(".").join(BACKUP_DIR_NAME)
    }
}

/// 更新升级相关常量
pub mod upgrade {
    use std::path::{Path, PathBuf};

    /// 临时目录名
    pub const TEMP_DIR_NAME: &str = "tmp";

    /// 下载的更新包文件名
    pub const PACKAGE_FILE_NAME: &str = "package.zip";

    /// 暂存目录后缀
    pub const STAGING_SUFFIX: &str = "staging";

    /// 旧代码树目录后缀
    pub const RETIRED_SUFFIX: &str = "old";

    /// 获取临时下载目录（跨平台）
    pub fn get_default_temp_dir() -> PathBuf {
        Path::new(".").join(TEMP_DIR_NAME)
    }
}

/// 设置存储的键名
pub mod settings {
    use std::path::{Path, PathBuf};

    pub const WEBHOOK_SECRET: &str = "webhook_secret";
    pub const TRACKED_BRANCH: &str = "tracked_branch";
    pub const REPOSITORY: &str = "repository";
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const CURRENT_VERSION: &str = "current_version";
    pub const LAST_CHECKED_AT: &str = "last_checked_at";
    pub const CACHED_RELEASE: &str = "cached_release";
    pub const BACKUPS: &str = "backups";
    pub const LAST_INSTALL_REPORT: &str = "last_install_report";

    /// 设置文件名
    pub const SETTINGS_FILE_NAME: &str = "settings.json";

    /// 获取默认设置文件路径（跨平台）
    pub fn get_default_settings_path() -> PathBuf {
        Path::new(".").join(SETTINGS_FILE_NAME)
    }
}

/// 应用配置相关常量
pub mod config {
    /// 配置文件名
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// 技术版本信息常量
pub mod version {
    /// 核心库版本（自动同步）
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
