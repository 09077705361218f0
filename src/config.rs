//! 应用配置模块

use crate::core::{SyncConfig, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// 配置文件名，位于日志目录下
pub const CONFIG_FILE: &str = "config.json";

/// 同步配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// 同步周期（秒）
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// 计算哈希时的读取块大小（字节）
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// 两侧快照相同时跳过该层的文件比较
    #[serde(default = "default_skip_unchanged_levels")]
    pub skip_unchanged_levels: bool,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_skip_unchanged_levels() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            chunk_size: default_chunk_size(),
            skip_unchanged_levels: default_skip_unchanged_levels(),
        }
    }
}

impl AppConfig {
    /// 从配置文件加载同步配置
    pub fn load(config_dir: &Path) -> Self {
        read_section(config_dir, "sync").unwrap_or_default()
    }

    /// 保存同步配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        write_section(config_dir, "sync", self)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            chunk_size: self.chunk_size.max(1),
            skip_unchanged_levels: self.skip_unchanged_levels,
        }
    }
}

/// 读取配置文件中的一个分区，文件不存在或内容无效时返回 None
pub(crate) fn read_section<T>(config_dir: &Path, key: &str) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(config_dir.join(CONFIG_FILE)).ok()?;
    let config = serde_json::from_str::<serde_json::Value>(&content).ok()?;
    serde_json::from_value(config.get(key)?.clone()).ok()
}

/// 更新配置文件中的一个分区，保留其他分区
pub(crate) fn write_section<T: Serialize>(config_dir: &Path, key: &str, value: &T) -> io::Result<()> {
    let config_file = config_dir.join(CONFIG_FILE);

    // 读取现有配置
    let mut config: serde_json::Value = if config_file.exists() {
        let content = fs::read_to_string(&config_file)?;
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };
    if !config.is_object() {
        config = serde_json::json!({});
    }

    config[key] = serde_json::to_value(value).map_err(io::Error::other)?;

    let content = serde_json::to_string_pretty(&config).map_err(io::Error::other)?;
    fs::write(&config_file, content)
}
