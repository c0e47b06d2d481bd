use crate::archive;
use crate::constants::{plugin, upgrade};
use crate::error::{Result, UpdaterError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 主文件头只读取前 8KB
const HEADER_SCAN_BYTES: usize = 8 * 1024;

/// 暂存目录，未提交前离开作用域即删除
struct StagingDir {
    path: PathBuf,
    committed: bool,
}

impl StagingDir {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// 暂存目录已成为代码树
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("删除暂存目录失败 {}: {}", self.path.display(), e);
            }
        }
    }
}

/// 插件代码树
#[derive(Debug, Clone)]
pub struct PluginTree {
    live_dir: PathBuf,
    main_file: String,
}

impl PluginTree {
    pub fn new(live_dir: impl Into<PathBuf>, main_file: impl Into<String>) -> Self {
        Self {
            live_dir: live_dir.into(),
            main_file: main_file.into(),
        }
    }

    pub fn live_dir(&self) -> &Path {
        &self.live_dir
    }

    pub fn main_file(&self) -> &str {
        &self.main_file
    }

    pub fn main_file_path(&self) -> PathBuf {
        self.live_dir.join(&self.main_file)
    }

    pub fn exists(&self) -> bool {
        self.live_dir.is_dir()
    }

    /// 从主文件头读取 `Version:` 字段
    pub fn detect_version(&self) -> Result<Option<String>> {
        let path = self.main_file_path();
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let head = &bytes[..bytes.len().min(HEADER_SCAN_BYTES)];
        Ok(parse_version_header(&String::from_utf8_lossy(head)))
    }

    /// 同级目录下的辅助路径，保证 rename 在同一文件系统内完成
    fn sibling(&self, suffix: &str) -> Result<PathBuf> {
        let name = self
            .live_dir
            .file_name()
            .ok_or_else(|| UpdaterError::install("无法获取代码树目录名"))?
            .to_string_lossy()
            .to_string();
        Ok(self.live_dir.with_file_name(format!(".{name}.{suffix}")))
    }

    /// 用归档内容替换代码树
    ///
    /// 先解压到暂存目录并确认主文件存在，再通过两次 rename 切换。
    /// 任何一步失败时代码树保持原样。
    pub async fn replace_from_archive(&self, archive_path: &Path) -> Result<()> {
        let staging = self.sibling(upgrade::STAGING_SUFFIX)?;
        let retired = self.sibling(upgrade::RETIRED_SUFFIX)?;

        for leftover in [&staging, &retired] {
            if leftover.exists() {
                warn!("清理残留目录: {}", leftover.display());
                tokio::fs::remove_dir_all(leftover).await?;
            }
        }

        if let Some(parent) = self.live_dir.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        debug!("解压到暂存目录: {}", staging.display());
        let staging = StagingDir::new(staging);
        self.stage(archive_path, staging.path()).await?;

        let had_live = self.live_dir.exists();
        if had_live {
            tokio::fs::rename(&self.live_dir, &retired)
                .await
                .map_err(|e| UpdaterError::install(format!("移出原代码树失败: {e}")))?;
        }

        if let Err(e) = tokio::fs::rename(staging.path(), &self.live_dir).await {
            if had_live {
                if let Err(restore_err) = tokio::fs::rename(&retired, &self.live_dir).await {
                    warn!("恢复原代码树失败: {}", restore_err);
                }
            }
            return Err(UpdaterError::install(format!("切换代码树失败: {e}")));
        }
        staging.commit();

        if had_live {
            if let Err(e) = tokio::fs::remove_dir_all(&retired).await {
                warn!("删除旧代码树失败 {}: {}", retired.display(), e);
            }
        }

        info!("代码树已替换: {}", self.live_dir.display());
        Ok(())
    }

    async fn stage(&self, archive_path: &Path, staging: &Path) -> Result<()> {
        archive::extract(archive_path, staging).await?;
        if !staging.join(&self.main_file).is_file() {
            return Err(UpdaterError::install(format!(
                "更新包中缺少主文件 {}",
                self.main_file
            )));
        }
        Ok(())
    }
}

/// 解析文件头中的版本字段，兼容 ` * Version: 1.0.0` 这类注释格式
pub fn parse_version_header(content: &str) -> Option<String> {
    let header = plugin::VERSION_HEADER;
    content.lines().find_map(|line| {
        let line = line.trim_start_matches([' ', '\t', '/', '*', '#', '@']);
        let prefix = line.get(..header.len())?;
        if !prefix.eq_ignore_ascii_case(header) {
            return None;
        }
        let value = line[header.len()..].trim().trim_end_matches("*/").trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_package, write_live_tree};
    use tempfile::tempdir;

    #[test]
    fn test_parse_version_header() {
        let content = "<?php\n/**\n * Plugin Name: Demo\n * Version: 1.0.14\n */\n";
        assert_eq!(parse_version_header(content), Some("1.0.14".to_string()));
        assert_eq!(parse_version_header("# version:2.0"), Some("2.0".to_string()));
        assert_eq!(parse_version_header("<?php\n// nothing here"), None);
        assert_eq!(parse_version_header(" * Version:   "), None);
    }

    #[test]
    fn test_detect_version_from_tree() {
        let temp_dir = tempdir().unwrap();
        let live = temp_dir.path().join("demo");
        let tree = PluginTree::new(&live, "demo.php");
        assert_eq!(tree.detect_version().unwrap(), None);

        write_live_tree(&live, "demo.php", "2.9.0");
        assert_eq!(tree.detect_version().unwrap(), Some("2.9.0".to_string()));
    }

    #[tokio::test]
    async fn test_replace_swaps_tree() {
        let temp_dir = tempdir().unwrap();
        let live = temp_dir.path().join("demo");
        write_live_tree(&live, "demo.php", "2.9.0");
        std::fs::write(live.join("stale.txt"), "old").unwrap();

        let package = temp_dir.path().join("package.zip");
        std::fs::write(&package, build_package("acme-demo-abc123", "demo.php", "3.0.0")).unwrap();

        let tree = PluginTree::new(&live, "demo.php");
        tree.replace_from_archive(&package).await.unwrap();

        assert_eq!(tree.detect_version().unwrap(), Some("3.0.0".to_string()));
        assert!(!live.join("stale.txt").exists());
        assert!(!temp_dir.path().join(".demo.staging").exists());
        assert!(!temp_dir.path().join(".demo.old").exists());
    }

    #[tokio::test]
    async fn test_package_without_main_file_keeps_tree() {
        let temp_dir = tempdir().unwrap();
        let live = temp_dir.path().join("demo");
        write_live_tree(&live, "demo.php", "2.9.0");

        let package = temp_dir.path().join("package.zip");
        std::fs::write(&package, build_package("acme-demo-abc123", "other.php", "3.0.0")).unwrap();

        let tree = PluginTree::new(&live, "demo.php");
        let result = tree.replace_from_archive(&package).await;

        assert!(matches!(result, Err(UpdaterError::Install(_))));
        assert_eq!(tree.detect_version().unwrap(), Some("2.9.0".to_string()));
        assert!(!temp_dir.path().join(".demo.staging").exists());
    }

    #[tokio::test]
    async fn test_garbage_package_keeps_tree() {
        let temp_dir = tempdir().unwrap();
        let live = temp_dir.path().join("demo");
        write_live_tree(&live, "demo.php", "2.9.0");

        let package = temp_dir.path().join("package.zip");
        std::fs::write(&package, b"not a zip").unwrap();

        let tree = PluginTree::new(&live, "demo.php");
        assert!(tree.replace_from_archive(&package).await.is_err());
        assert_eq!(tree.detect_version().unwrap(), Some("2.9.0".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_retire_removes_staging() {
        let temp_dir = tempdir().unwrap();
        let live = temp_dir.path().join("demo");
        write_live_tree(&live, "demo.php", "2.9.0");

        // 悬空符号链接：exists() 为 false，目录无法 rename 到它上面
        std::os::unix::fs::symlink(
            temp_dir.path().join("nowhere"),
            temp_dir.path().join(".demo.old"),
        )
        .unwrap();

        let package = temp_dir.path().join("package.zip");
        std::fs::write(&package, build_package("acme-demo-abc123", "demo.php", "3.0.0")).unwrap();

        let tree = PluginTree::new(&live, "demo.php");
        let result = tree.replace_from_archive(&package).await;

        assert!(matches!(result, Err(UpdaterError::Install(_))));
        assert!(!temp_dir.path().join(".demo.staging").exists());
        assert_eq!(tree.detect_version().unwrap(), Some("2.9.0".to_string()));
    }

    #[test]
    fn test_staging_dir_removed_unless_committed() {
        let temp_dir = tempdir().unwrap();
        let dropped = temp_dir.path().join(".demo.staging");
        std::fs::create_dir_all(dropped.join("includes")).unwrap();
        drop(StagingDir::new(dropped.clone()));
        assert!(!dropped.exists());

        let committed = temp_dir.path().join(".other.staging");
        std::fs::create_dir_all(&committed).unwrap();
        StagingDir::new(committed.clone()).commit();
        assert!(committed.exists());
    }
}
