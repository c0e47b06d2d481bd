use super::SettingsStore;
use crate::{Result, UpdaterError};
use std::collections::HashMap;
use std::sync::RwLock;

/// 内存设置存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| UpdaterError::settings("内存存储锁已损坏"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<bool> {
        let mut values = self
            .values
            .write()
            .map_err(|_| UpdaterError::settings("内存存储锁已损坏"))?;
        let previous = values.insert(key.to_string(), value.to_string());
        Ok(previous.as_deref() != Some(value))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut values = self
            .values
            .write()
            .map_err(|_| UpdaterError::settings("内存存储锁已损坏"))?;
        Ok(values.remove(key).is_some())
    }
}
