//! 目录快照 - 计算单层目录内文件的内容哈希

use crate::core::reporter::{Reporter, SyncEvent};
use crate::error::{Result, SyncError};
use crate::storage::{DirEntryInfo, Storage};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 默认读取块大小（只影响 IO 缓冲，不影响哈希结果）
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// 文件内容摘要（BLAKE3，仅用于变化检测）
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileDigest([u8; 32]);

impl FileDigest {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 只取前 16 个十六进制字符，足够区分
        write!(f, "FileDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 按块读取并计算摘要
pub fn hash_reader<R: Read + ?Sized>(reader: &mut R, chunk_size: usize) -> io::Result<FileDigest> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(FileDigest(*hasher.finalize().as_bytes()))
}

/// 单层目录快照：文件名 -> 内容摘要
///
/// 只包含目录下的普通文件，不包含子目录。无法读取的文件不会出现在
/// `digests` 中，而是记录在 `unreadable` 里，下次同步时重试。
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    digests: BTreeMap<OsString, FileDigest>,
    unreadable: BTreeSet<OsString>,
}

impl DirectorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<OsString>, digest: FileDigest) {
        self.digests.insert(name.into(), digest);
    }

    pub fn mark_unreadable(&mut self, name: impl Into<OsString>) {
        self.unreadable.insert(name.into());
    }

    pub fn get(&self, name: &OsStr) -> Option<&FileDigest> {
        self.digests.get(name)
    }

    pub fn contains(&self, name: &OsStr) -> bool {
        self.digests.contains_key(name)
    }

    pub fn is_unreadable(&self, name: &OsStr) -> bool {
        self.unreadable.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsString, &FileDigest)> {
        self.digests.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &OsString> {
        self.digests.keys()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// 只比较文件名和摘要
impl PartialEq for DirectorySnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.digests == other.digests
    }
}

impl Eq for DirectorySnapshot {}

/// 目录哈希计算器
pub struct TreeHasher {
    storage: Arc<dyn Storage>,
    chunk_size: usize,
}

impl TreeHasher {
    pub fn new(storage: Arc<dyn Storage>, chunk_size: usize) -> Self {
        Self {
            storage,
            chunk_size: chunk_size.max(1),
        }
    }

    /// 计算单个文件的摘要
    pub fn hash_file(&self, path: &Path) -> Result<FileDigest> {
        let to_error = |source: io::Error| SyncError::Hash {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = self.storage.open(path).map_err(to_error)?;
        hash_reader(&mut reader, self.chunk_size).map_err(to_error)
    }

    /// 计算目录快照
    ///
    /// 目录不存在时返回空快照；单个文件读取失败会上报错误并跳过该文件。
    pub fn snapshot(&self, dir: &Path, reporter: &dyn Reporter) -> Result<DirectorySnapshot> {
        let entries = match self.storage.list_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("目录不存在，视为空目录: {}", dir.display());
                return Ok(DirectorySnapshot::new());
            }
            Err(source) => {
                return Err(SyncError::ListDir {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let (snapshot, errors) = self.hash_entries(dir, &entries);
        for err in &errors {
            reporter.report(SyncEvent::from_error(err));
        }

        Ok(snapshot)
    }

    /// 根据已列出的目录项计算快照，返回快照和读取失败的文件错误
    pub fn hash_entries(
        &self,
        dir: &Path,
        entries: &[DirEntryInfo],
    ) -> (DirectorySnapshot, Vec<SyncError>) {
        let mut snapshot = DirectorySnapshot::new();
        let mut errors = Vec::new();

        for entry in entries.iter().filter(|e| e.is_file()) {
            match self.hash_file(&dir.join(&entry.name)) {
                Ok(digest) => snapshot.insert(entry.name.clone(), digest),
                Err(e) => {
                    snapshot.mark_unreadable(entry.name.clone());
                    errors.push(e);
                }
            }
        }

        debug!(
            "快照完成: {} ({} 个文件, {} 个无法读取)",
            dir.display(),
            snapshot.len(),
            snapshot.unreadable.len()
        );

        (snapshot, errors)
    }
}
