//! 测试用存储：包装本地存储，可对指定文件名注入权限错误并记录复制操作

use super::{DirEntryInfo, LocalStorage, Storage};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FaultyStorage {
    inner: LocalStorage,
    deny_open: HashSet<OsString>,
    deny_open_paths: HashSet<PathBuf>,
    deny_copy: HashSet<OsString>,
    deny_remove: HashSet<OsString>,
    deny_list: HashSet<OsString>,
    copies: Mutex<Vec<PathBuf>>,
}

fn denied() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "permission denied")
}

fn matches(set: &HashSet<OsString>, path: &Path) -> bool {
    path.file_name().map(|n| set.contains(n)).unwrap_or(false)
}

impl FaultyStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn deny_open(mut self, name: &str) -> Self {
        self.deny_open.insert(name.into());
        self
    }

    /// 只拒绝打开指定的完整路径
    pub(crate) fn deny_open_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.deny_open_paths.insert(path.into());
        self
    }

    pub(crate) fn deny_copy(mut self, name: &str) -> Self {
        self.deny_copy.insert(name.into());
        self
    }

    /// 同时作用于删除文件和删除目录
    pub(crate) fn deny_remove(mut self, name: &str) -> Self {
        self.deny_remove.insert(name.into());
        self
    }

    pub(crate) fn deny_list(mut self, name: &str) -> Self {
        self.deny_list.insert(name.into());
        self
    }

    /// 所有成功复制的目标路径
    pub(crate) fn copies(&self) -> Vec<PathBuf> {
        self.copies.lock().unwrap().clone()
    }
}

impl Storage for FaultyStorage {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        if matches(&self.deny_list, dir) {
            return Err(denied());
        }
        self.inner.list_dir(dir)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        if matches(&self.deny_open, path) || self.deny_open_paths.contains(path) {
            return Err(denied());
        }
        self.inner.open(path)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        if matches(&self.deny_copy, to) {
            return Err(denied());
        }
        let bytes = self.inner.copy_file(from, to)?;
        self.copies.lock().unwrap().push(to.to_path_buf());
        Ok(bytes)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if matches(&self.deny_remove, path) {
            return Err(denied());
        }
        self.inner.remove_file(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        if matches(&self.deny_remove, path) {
            return Err(denied());
        }
        self.inner.remove_dir_all(path)
    }

    fn name(&self) -> &str {
        "faulty"
    }
}
