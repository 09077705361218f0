use super::{DirEntryInfo, EntryKind, Storage};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// 本地文件系统存储
pub struct LocalStorage {
    name: String,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            name: "local".to_string(),
        }
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for LocalStorage {
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            let file_type = entry.file_type();

            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::Other
            };

            entries.push(DirEntryInfo {
                name: entry.file_name().to_os_string(),
                kind,
            });
        }

        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let dir = to
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // 在目标目录下创建随机命名的临时文件，写完后原子重命名；出错时临时文件随 drop 删除
        let mut reader = fs::File::open(from)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        let bytes = io::copy(&mut reader, &mut temp)?;
        temp.as_file().set_permissions(reader.metadata()?.permissions())?;
        temp.persist(to)?;

        Ok(bytes)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
