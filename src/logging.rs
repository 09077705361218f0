//! 日志模块 - 提供文件日志和大小管理功能

use crate::config::{read_section, write_section};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 日志文件名
pub const LOG_FILE: &str = "logs.txt";

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 是否写入日志文件
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 最大日志文件大小（MB）
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_enabled() -> bool {
    true
}

fn default_max_size_mb() -> u32 {
    5 // 默认 5MB
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_size_mb: default_max_size_mb(),
            level: default_level(),
        }
    }
}

impl LogConfig {
    /// 从配置文件加载日志配置
    pub fn load(config_dir: &Path) -> Self {
        read_section(config_dir, "log").unwrap_or_default()
    }

    /// 保存日志配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        write_section(config_dir, "log", self)
    }

    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        parse_level(&self.level).unwrap_or(tracing::Level::INFO)
    }
}

/// 解析日志级别，无法识别时返回 None
pub fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

/// 带大小限制的日志写入器
///
/// 超过大小限制时把当前文件重命名为 `logs.txt.old`，然后重新创建日志文件。
pub struct SizeRotatingWriter {
    file_path: PathBuf,
    max_size: u64,
    written: u64,
    writer: BufWriter<File>,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let file_path = log_dir.join(LOG_FILE);
        let max_size = (max_size_mb.max(1) as u64) * 1024 * 1024;

        Self::with_limit(file_path, max_size)
    }

    fn with_limit(file_path: PathBuf, max_size: u64) -> io::Result<Self> {
        // 检查现有文件大小，如果超过限制则轮转
        let existing = fs::metadata(&file_path).map(|m| m.len()).unwrap_or(0);
        if existing > max_size {
            Self::rotate_log(&file_path)?;
        }

        let (writer, written) = Self::open_file(&file_path)?;

        Ok(Self {
            file_path,
            max_size,
            written,
            writer,
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn open_file(file_path: &Path) -> io::Result<(BufWriter<File>, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let len = file.metadata()?.len();
        Ok((BufWriter::new(file), len))
    }

    /// 轮转日志文件
    fn rotate_log(file_path: &Path) -> io::Result<()> {
        let backup_path = Self::backup_path(file_path);

        // 如果备份已存在，删除它
        if backup_path.exists() {
            fs::remove_file(&backup_path)?;
        }

        fs::rename(file_path, &backup_path)
    }

    fn backup_path(file_path: &Path) -> PathBuf {
        let mut name = file_path.file_name().unwrap_or_default().to_os_string();
        name.push(".old");
        file_path.with_file_name(name)
    }

    fn check_and_rotate(&mut self) -> io::Result<()> {
        if self.written <= self.max_size {
            return Ok(());
        }

        self.writer.flush()?;
        Self::rotate_log(&self.file_path)?;
        let (writer, written) = Self::open_file(&self.file_path)?;
        self.writer = writer;
        self.written = written;
        Ok(())
    }
}

impl Write for SizeRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.writer.flush()?;
        self.written += n as u64;
        self.check_and_rotate()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_level_parsing() {
        let mut config = LogConfig::default();
        assert_eq!(config.tracing_level(), tracing::Level::INFO);

        config.level = "DEBUG".to_string();
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);

        config.level = "verbose".to_string();
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_log_config_round_trip_through_config_file() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(LogConfig::load(temp_dir.path()), LogConfig::default());

        let config = LogConfig {
            enabled: false,
            max_size_mb: 1,
            level: "warn".to_string(),
        };
        config.save(temp_dir.path()).unwrap();

        assert_eq!(LogConfig::load(temp_dir.path()), config);
    }

    #[test]
    fn test_writer_rotates_when_limit_exceeded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(LOG_FILE);
        let mut writer = SizeRotatingWriter::with_limit(path.clone(), 16).unwrap();

        writer.write_all(b"first line 0123456789\n").unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.flush().unwrap();

        let backup = SizeRotatingWriter::backup_path(&path);
        assert_eq!(backup, temp_dir.path().join("logs.txt.old"));
        assert_eq!(
            fs::read_to_string(&backup).unwrap(),
            "first line 0123456789\n"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
    }

    #[test]
    fn test_oversized_existing_log_is_rotated_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(LOG_FILE);
        fs::write(&path, vec![b'x'; 64]).unwrap();

        let writer = SizeRotatingWriter::with_limit(path.clone(), 32).unwrap();

        assert_eq!(writer.written, 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert!(SizeRotatingWriter::backup_path(&path).exists());
    }
}
