// 设置存储模块
//
// 宿主环境提供一个持久化的键值存储，更新流程只通过 `SettingsStore`
// 这个窄接口访问它。`SettingsManager` 在其上提供类型化的读写。
//
// 主要组件：
// - SettingsStore: 键值存储接口
// - JsonFileStore: 基于 JSON 文件的持久化实现
// - MemoryStore: 内存实现，主要用于测试
// - SettingsManager: 类型化适配器

mod file_store;
mod manager;
mod memory_store;

use crate::Result;
use std::fmt::Debug;

pub use file_store::JsonFileStore;
pub use manager::SettingsManager;
pub use memory_store::MemoryStore;

/// 宿主提供的键值设置存储
pub trait SettingsStore: Send + Sync + Debug {
    /// 读取键值，不存在时返回 `None`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入键值，返回值表示存储内容是否发生变化
    fn set(&self, key: &str, value: &str) -> Result<bool>;

    /// 删除键，返回值表示键之前是否存在
    fn delete(&self, key: &str) -> Result<bool>;

    /// 读取键值，不存在时返回默认值
    fn get_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }
}
