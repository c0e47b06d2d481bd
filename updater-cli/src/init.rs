use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};
use updater_core::config::AppConfig;

/// 默认配置，相对路径放在配置文件所在目录下
fn default_config_for(config_path: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    let Some(base) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return config;
    };

    let rebase = |value: &str| base.join(value).to_string_lossy().to_string();
    config.plugin.live_dir = rebase(&config.plugin.live_dir);
    config.backup.storage_dir = rebase(&config.backup.storage_dir);
    config.cache.temp_dir = rebase(&config.cache.temp_dir);
    config.settings.path = rebase(&config.settings.path);
    config
}

/// 写入默认配置并创建运行目录
///
/// 返回 `false` 表示配置已存在且未指定 `--force`。
pub fn run_init(config_path: &Path, force: bool) -> Result<bool> {
    info!("🔧 Plugin Updater 初始化");
    info!("========================");

    if config_path.exists() && !force {
        warn!("⚠️  配置文件已存在: {}", config_path.display());
        info!("如果要重新初始化，请使用 --force 参数");
        return Ok(false);
    }

    let config = default_config_for(config_path);
    config
        .save_to_file(config_path)
        .with_context(|| format!("写入配置文件失败: {}", config_path.display()))?;
    info!("   ✅ 创建配置文件: {}", config_path.display());

    config.ensure_dirs().context("创建运行目录失败")?;
    info!("   ✅ 创建目录结构:");
    info!("      - {}  (备份存储目录)", config.backup.storage_dir);
    info!("      - {}  (临时下载目录)", config.cache.temp_dir);

    info!("📋 下一步:");
    info!(
        "   1. 编辑 {}，填写 [upstream] repository 和 [plugin] live_dir",
        config_path.display()
    );
    info!("   2. 运行 updater-cli secret show 获取 Webhook 密钥");
    info!("   3. 运行 updater-cli serve 启动 Webhook 服务");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_config_once() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        assert!(run_init(&path, false).unwrap());
        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.backup.keep, 3);
        assert!(temp_dir.path().join("backups").is_dir());
        assert!(temp_dir.path().join("tmp").is_dir());

        std::fs::write(&path, "# customised").unwrap();
        assert!(!run_init(&path, false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# customised");

        assert!(run_init(&path, true).unwrap());
        assert!(AppConfig::load_from_file(&path).is_ok());
    }
}
