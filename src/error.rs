//! 同步错误类型

use std::io;
use std::path::{Path, PathBuf};

/// 同步过程中可能出现的错误
///
/// 单个文件或子目录的错误只会被上报并跳过，不会中断整次同步；
/// 根目录相关的错误（源目录不存在、副本根目录无法创建）会直接返回给调用方。
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("源目录不存在: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("无法读取目录 {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无法计算文件哈希 {}: {source}", path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无法复制文件 {} -> {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无法删除文件 {}: {source}", path.display())]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无法创建目录 {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("无法删除目录 {}: {source}", path.display())]
    RemoveDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// 出错的路径（复制错误返回目标路径）
    pub fn path(&self) -> &Path {
        match self {
            SyncError::SourceMissing(path) => path,
            SyncError::ListDir { path, .. }
            | SyncError::Hash { path, .. }
            | SyncError::RemoveFile { path, .. }
            | SyncError::CreateDir { path, .. }
            | SyncError::RemoveDir { path, .. } => path,
            SyncError::Copy { to, .. } => to,
        }
    }

    /// 底层 IO 错误
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            SyncError::SourceMissing(_) => None,
            SyncError::ListDir { source, .. }
            | SyncError::Hash { source, .. }
            | SyncError::Copy { source, .. }
            | SyncError::RemoveFile { source, .. }
            | SyncError::CreateDir { source, .. }
            | SyncError::RemoveDir { source, .. } => Some(source),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.io_error()
            .map(|e| e.kind() == io::ErrorKind::PermissionDenied)
            .unwrap_or(false)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
