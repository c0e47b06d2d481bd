use crate::error::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// 安装锁：进程内互斥 + 备份目录下的锁文件
///
/// 获取失败时立即返回，不排队等待。
#[derive(Debug, Clone)]
pub struct InstallLock {
    inner: Arc<Mutex<()>>,
    lock_file: PathBuf,
    stale_after: Duration,
}

/// 持有期间独占安装流程，释放时删除锁文件
#[derive(Debug)]
pub struct InstallGuard {
    _guard: OwnedMutexGuard<()>,
    lock_file: PathBuf,
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_file) {
            if e.kind() != ErrorKind::NotFound {
                warn!("删除锁文件失败 {}: {}", self.lock_file.display(), e);
            }
        }
    }
}

impl InstallLock {
    pub fn new(lock_file: impl Into<PathBuf>, stale_after: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(())),
            lock_file: lock_file.into(),
            stale_after,
        }
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    /// 尝试获取锁，已被占用时返回 `None`
    pub fn try_acquire(&self) -> Result<Option<InstallGuard>> {
        let Ok(guard) = self.inner.clone().try_lock_owned() else {
            debug!("安装锁已被本进程占用");
            return Ok(None);
        };

        if !self.create_lock_file()? {
            if !self.is_stale()? {
                debug!("安装锁文件已存在: {}", self.lock_file.display());
                return Ok(None);
            }
            warn!("回收过期的安装锁文件: {}", self.lock_file.display());
            std::fs::remove_file(&self.lock_file)?;
            if !self.create_lock_file()? {
                return Ok(None);
            }
        }

        Ok(Some(InstallGuard {
            _guard: guard,
            lock_file: self.lock_file.clone(),
        }))
    }

    /// 以 create_new 创建锁文件，已存在时返回 `false`
    fn create_lock_file(&self) -> Result<bool> {
        if let Some(parent) = self.lock_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_file)
        {
            Ok(mut file) => {
                writeln!(file, "pid={}", std::process::id())?;
                writeln!(file, "acquired_at={}", Utc::now().to_rfc3339())?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn is_stale(&self) -> Result<bool> {
        let modified = match std::fs::metadata(&self.lock_file) {
            Ok(metadata) => metadata.modified()?,
            // 检查期间被其他进程释放
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        Ok(age > self.stale_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_is_busy_until_release() {
        let temp_dir = tempdir().unwrap();
        let lock = InstallLock::new(temp_dir.path().join(".update.lock"), Duration::from_secs(60));

        let guard = lock.try_acquire().unwrap().expect("first acquire");
        assert!(lock.lock_file().exists());
        assert!(lock.try_acquire().unwrap().is_none());

        drop(guard);
        assert!(!lock.lock_file().exists());
        assert!(lock.try_acquire().unwrap().is_some());
    }

    #[test]
    fn test_foreign_lock_file_blocks() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(".update.lock");
        std::fs::write(&path, "pid=1").unwrap();

        let lock = InstallLock::new(&path, Duration::from_secs(60));
        assert!(lock.try_acquire().unwrap().is_none());
        assert!(path.exists());
    }

    #[test]
    fn test_stale_lock_file_is_reclaimed() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(".update.lock");
        std::fs::write(&path, "pid=1").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let lock = InstallLock::new(&path, Duration::from_millis(1));
        let guard = lock.try_acquire().unwrap();
        assert!(guard.is_some());
        assert!(std::fs::read_to_string(&path).unwrap().contains("acquired_at="));
    }
}
