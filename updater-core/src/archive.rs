use crate::error::{Result, UpdaterError};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// 将目录打包为 zip，归档内所有条目位于 `{top_level}/` 之下
///
/// 阻塞操作，异步上下文请使用 [`archive_dir`]。
pub fn create_dir_archive(source_dir: &Path, archive_path: &Path, top_level: &str) -> Result<u64> {
    if !source_dir.is_dir() {
        return Err(UpdaterError::backup(format!(
            "源目录不存在: {}",
            source_dir.display()
        )));
    }
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(archive_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut file_count = 0u64;

    writer.add_directory(format!("{top_level}/"), options)?;

    for entry in WalkDir::new(source_dir).min_depth(1) {
        let entry = entry?;
        let path = entry.path();
        let relative_path = path.strip_prefix(source_dir)?;

        // zip 内部统一使用 `/` 分隔
        let name = format!(
            "{}/{}",
            top_level,
            relative_path.to_string_lossy().replace('\\', "/")
        );

        if entry.file_type().is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            let mut source = File::open(path)?;
            io::copy(&mut source, &mut writer)?;
            file_count += 1;
        } else {
            warn!("跳过非常规文件: {}", path.display());
        }
    }

    writer.finish()?;
    debug!("归档完成: {} ({} 个文件)", archive_path.display(), file_count);
    Ok(file_count)
}

/// 解压 zip 到目标目录，去掉唯一的顶层目录
pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(target_dir)?;
    let file = File::open(archive_path)?;
    zip_extract::extract(file, target_dir, true)
        .map_err(|e| UpdaterError::install(format!("解压失败: {e}")))
}

/// 遍历归档条目以确认归档可读，返回文件数量
pub fn validate_archive(archive_path: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut files = 0;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if !entry.is_dir() {
            files += 1;
        }
    }
    Ok(files)
}

/// 在后台线程中打包目录
pub async fn archive_dir(source_dir: &Path, archive_path: &Path, top_level: &str) -> Result<u64> {
    let source_dir = source_dir.to_path_buf();
    let archive_path = archive_path.to_path_buf();
    let top_level = top_level.to_string();
    tokio::task::spawn_blocking(move || create_dir_archive(&source_dir, &archive_path, &top_level))
        .await?
}

/// 在后台线程中解压归档
pub async fn extract(archive_path: &Path, target_dir: &Path) -> Result<()> {
    let archive_path: PathBuf = archive_path.to_path_buf();
    let target_dir: PathBuf = target_dir.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive(&archive_path, &target_dir)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_live_tree;
    use tempfile::tempdir;

    #[test]
    fn test_archive_has_single_top_level_dir() {
        let temp_dir = tempdir().unwrap();
        let live = temp_dir.path().join("live");
        write_live_tree(&live, "demo.php", "1.2.0");
        std::fs::create_dir_all(live.join("empty")).unwrap();

        let archive_path = temp_dir.path().join("out").join("demo.zip");
        let files = create_dir_archive(&live, &archive_path, "demo").unwrap();
        assert_eq!(files, 2);
        assert_eq!(validate_archive(&archive_path).unwrap(), 2);

        let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        for i in 0..archive.len() {
            let name = archive.by_index(i).unwrap().name().to_string();
            assert!(name.starts_with("demo/"), "unexpected entry {name}");
        }
    }

    #[tokio::test]
    async fn test_extract_strips_top_level_dir() {
        let temp_dir = tempdir().unwrap();
        let live = temp_dir.path().join("live");
        write_live_tree(&live, "demo.php", "1.2.0");

        let archive_path = temp_dir.path().join("demo.zip");
        archive_dir(&live, &archive_path, "demo").await.unwrap();

        let target = temp_dir.path().join("restored");
        extract(&archive_path, &target).await.unwrap();

        assert!(target.join("demo.php").is_file());
        assert_eq!(
            std::fs::read_to_string(target.join("includes").join("core.php")).unwrap(),
            std::fs::read_to_string(live.join("includes").join("core.php")).unwrap()
        );
    }

    #[test]
    fn test_garbage_archive_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("garbage.zip");
        std::fs::write(&path, b"this is not a zip").unwrap();

        assert!(validate_archive(&path).is_err());
        assert!(extract_archive(&path, &temp_dir.path().join("out")).is_err());
    }

    #[test]
    fn test_missing_source_dir() {
        let temp_dir = tempdir().unwrap();
        let result = create_dir_archive(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("x.zip"),
            "demo",
        );
        assert!(matches!(result, Err(UpdaterError::Backup(_))));
    }
}
