pub mod local;
#[cfg(test)]
pub(crate) mod testing;

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;

pub use local::LocalStorage;

/// 目录项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// 符号链接、设备文件等，同步时忽略
    Other,
}

/// 单层目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: OsString,
    pub kind: EntryKind,
}

impl DirEntryInfo {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// 文件系统抽象接口
///
/// 所有操作都是阻塞的，路径均为完整路径。
pub trait Storage: Send + Sync {
    /// 列出目录下的直接子项（不递归），按名称排序
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// 路径是否为已存在的目录
    fn is_dir(&self, path: &Path) -> bool;

    /// 打开文件用于读取
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// 复制文件内容，覆盖已存在的目标文件，返回复制的字节数
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// 删除单个文件
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// 创建目录及缺失的父目录，已存在时不做任何改动
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// 递归删除目录及其全部内容
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}
