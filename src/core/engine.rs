use crate::core::comparator::{CopyKind, FileComparator, SyncAction};
use crate::core::hasher::{DirectorySnapshot, TreeHasher, DEFAULT_CHUNK_SIZE};
use crate::core::reporter::{Reporter, SyncEvent};
use crate::error::{Result, SyncError};
use crate::storage::{DirEntryInfo, Storage};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// 同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 计算哈希时的读取块大小（字节）
    pub chunk_size: usize,
    /// 两侧快照相同时跳过该层的文件比较
    pub skip_unchanged_levels: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            skip_unchanged_levels: true,
        }
    }
}

/// 同步结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    Completed,
    /// 同步完成，但部分文件或目录出错，下次同步时重试
    CompletedWithErrors,
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub start_time: i64,
    pub end_time: i64,
    /// 耗时（毫秒）
    pub duration: u64,
    pub status: SyncStatus,
    pub dirs_visited: u32,
    pub files_created: u32,
    pub files_updated: u32,
    pub files_deleted: u32,
    pub files_unchanged: u32,
    pub dirs_created: u32,
    pub dirs_removed: u32,
    pub bytes_copied: u64,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn begin() -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            start_time: now,
            end_time: now,
            duration: 0,
            status: SyncStatus::Completed,
            dirs_visited: 0,
            files_created: 0,
            files_updated: 0,
            files_deleted: 0,
            files_unchanged: 0,
            dirs_created: 0,
            dirs_removed: 0,
            bytes_copied: 0,
            errors: Vec::new(),
        }
    }

    fn finish(&mut self, started: Instant) {
        self.end_time = chrono::Utc::now().timestamp();
        self.duration = started.elapsed().as_millis() as u64;
        self.status = if self.errors.is_empty() {
            SyncStatus::Completed
        } else {
            SyncStatus::CompletedWithErrors
        };
    }

    pub fn files_copied(&self) -> u32 {
        self.files_created + self.files_updated
    }

    /// 本次同步是否修改了副本
    pub fn has_changes(&self) -> bool {
        self.files_copied() + self.files_deleted + self.dirs_created + self.dirs_removed > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// 同一相对位置上的源目录和副本目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub source: PathBuf,
    pub replica: PathBuf,
}

impl SyncTarget {
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
        }
    }

    fn child(&self, name: &OsString) -> Self {
        Self {
            source: self.source.join(name),
            replica: self.replica.join(name),
        }
    }
}

/// 待处理任务
enum Task {
    /// 同步一层目录的文件，并把子目录压栈
    Visit(SyncTarget),
    /// 删除副本中源目录已不存在的子目录，在该层所有子目录处理完之后执行
    Prune { replica: PathBuf, names: Vec<OsString> },
}

/// 同步引擎
pub struct SyncEngine {
    storage: Arc<dyn Storage>,
    reporter: Arc<dyn Reporter>,
    hasher: TreeHasher,
    comparator: FileComparator,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(storage: Arc<dyn Storage>, reporter: Arc<dyn Reporter>) -> Self {
        Self::with_config(storage, reporter, SyncConfig::default())
    }

    pub fn with_config(
        storage: Arc<dyn Storage>,
        reporter: Arc<dyn Reporter>,
        config: SyncConfig,
    ) -> Self {
        Self {
            hasher: TreeHasher::new(storage.clone(), config.chunk_size),
            storage,
            reporter,
            comparator: FileComparator::new(),
            config,
        }
    }

    /// 将副本目录同步为源目录的当前状态
    ///
    /// 可重复调用。源目录不存在时返回 `SyncError::SourceMissing`，不修改副本；
    /// 副本根目录不存在时自动创建。单个文件或子目录的错误会上报并记录在报告中，
    /// 不会中断同步。
    pub fn synchronize(&self, source: &Path, replica: &Path) -> Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::begin();

        if !self.storage.is_dir(source) {
            return Err(SyncError::SourceMissing(source.to_path_buf()));
        }

        if !self.storage.is_dir(replica) {
            self.storage
                .create_dir(replica)
                .map_err(|source| SyncError::CreateDir {
                    path: replica.to_path_buf(),
                    source,
                })?;
            self.reporter.report(SyncEvent::dir_created(replica));
            report.dirs_created += 1;
        }

        debug!(
            "开始同步: {} -> {} (存储: {})",
            source.display(),
            replica.display(),
            self.storage.name()
        );

        let mut stack = vec![Task::Visit(SyncTarget::new(source, replica))];

        while let Some(task) = stack.pop() {
            match task {
                Task::Visit(target) => self.visit(target, &mut stack, &mut report),
                Task::Prune { replica, names } => self.prune(&replica, &names, &mut report),
            }
        }

        report.finish(started);

        info!(
            "同步完成: {} 个目录, 新增 {}, 更新 {}, 删除 {}, 未变化 {}, 新建目录 {}, 删除目录 {}, 错误 {}",
            report.dirs_visited,
            report.files_created,
            report.files_updated,
            report.files_deleted,
            report.files_unchanged,
            report.dirs_created,
            report.dirs_removed,
            report.error_count()
        );

        Ok(report)
    }

    /// 处理一层目录
    fn visit(&self, target: SyncTarget, stack: &mut Vec<Task>, report: &mut SyncReport) {
        report.dirs_visited += 1;

        // 任一侧无法列出时跳过整层，不能当作空目录处理，否则会误删副本
        let Some(source_entries) = self.list(&target.source, report) else {
            return;
        };
        let Some(replica_entries) = self.list(&target.replica, report) else {
            return;
        };

        let source_snapshot = self.snapshot(&target.source, &source_entries, report);
        let replica_snapshot = self.snapshot(&target.replica, &replica_entries, report);

        if self.config.skip_unchanged_levels && source_snapshot == replica_snapshot {
            report.files_unchanged += source_snapshot.len() as u32;
        } else {
            self.reconcile_files(&target, &source_snapshot, &replica_snapshot, report);
        }

        let source_dirs: BTreeSet<&OsString> = source_entries
            .iter()
            .filter(|e| e.is_dir())
            .map(|e| &e.name)
            .collect();
        let replica_dirs: BTreeSet<&OsString> = replica_entries
            .iter()
            .filter(|e| e.is_dir())
            .map(|e| &e.name)
            .collect();

        // 先压入删除任务，保证在所有子目录同步完成后才执行
        let extinct: Vec<OsString> = replica_dirs
            .iter()
            .filter(|name| !source_dirs.contains(*name))
            .map(|name| (*name).clone())
            .collect();
        if !extinct.is_empty() {
            stack.push(Task::Prune {
                replica: target.replica.clone(),
                names: extinct,
            });
        }

        // 逆序压栈，出栈时按名称顺序处理
        for name in source_dirs.iter().rev() {
            let child = target.child(name);

            if !replica_dirs.contains(name) {
                if let Err(source) = self.storage.create_dir(&child.replica) {
                    self.fail(
                        report,
                        SyncError::CreateDir {
                            path: child.replica,
                            source,
                        },
                    );
                    continue;
                }
                self.reporter.report(SyncEvent::dir_created(&child.replica));
                report.dirs_created += 1;
            }

            stack.push(Task::Visit(child));
        }
    }

    fn list(&self, dir: &Path, report: &mut SyncReport) -> Option<Vec<DirEntryInfo>> {
        match self.storage.list_dir(dir) {
            Ok(entries) => Some(entries),
            Err(source) => {
                self.fail(
                    report,
                    SyncError::ListDir {
                        path: dir.to_path_buf(),
                        source,
                    },
                );
                None
            }
        }
    }

    fn snapshot(
        &self,
        dir: &Path,
        entries: &[DirEntryInfo],
        report: &mut SyncReport,
    ) -> DirectorySnapshot {
        let (snapshot, errors) = self.hasher.hash_entries(dir, entries);
        for err in errors {
            self.fail(report, err);
        }
        snapshot
    }

    /// 同步一层目录内的文件：先删除，再复制
    fn reconcile_files(
        &self,
        target: &SyncTarget,
        source: &DirectorySnapshot,
        replica: &DirectorySnapshot,
        report: &mut SyncReport,
    ) {
        let actions = self.comparator.compare_snapshots(source, replica);
        let summary = FileComparator::summarize_actions(&actions, source);
        report.files_unchanged += summary.unchanged_count as u32;

        if !summary.is_noop() {
            debug!(
                "{}: 新增 {}, 更新 {}, 删除 {}",
                target.replica.display(),
                summary.create_count,
                summary.update_count,
                summary.delete_count
            );
        }

        for action in actions {
            match action {
                SyncAction::Delete { name } => {
                    let path = target.replica.join(&name);
                    match self.storage.remove_file(&path) {
                        Ok(()) => {
                            self.reporter.report(SyncEvent::file_deleted(&path));
                            report.files_deleted += 1;
                        }
                        Err(source) => self.fail(report, SyncError::RemoveFile { path, source }),
                    }
                }
                SyncAction::Copy { name, kind } => {
                    let from = target.source.join(&name);
                    let to = target.replica.join(&name);
                    match self.storage.copy_file(&from, &to) {
                        Ok(bytes) => {
                            report.bytes_copied += bytes;
                            match kind {
                                CopyKind::Create => {
                                    self.reporter.report(SyncEvent::file_created(&to));
                                    report.files_created += 1;
                                }
                                CopyKind::Update => {
                                    self.reporter.report(SyncEvent::file_updated(&to));
                                    report.files_updated += 1;
                                }
                            }
                        }
                        Err(source) => self.fail(report, SyncError::Copy { from, to, source }),
                    }
                }
            }
        }
    }

    /// 删除副本中多余的子目录
    fn prune(&self, replica: &Path, names: &[OsString], report: &mut SyncReport) {
        for name in names {
            let path = replica.join(name);
            match self.storage.remove_dir_all(&path) {
                Ok(()) => {
                    self.reporter.report(SyncEvent::dir_removed(&path));
                    report.dirs_removed += 1;
                }
                Err(source) => self.fail(report, SyncError::RemoveDir { path, source }),
            }
        }
    }

    /// 上报错误并记录到报告
    fn fail(&self, report: &mut SyncReport, err: SyncError) {
        if err.is_permission_denied() {
            debug!("权限不足，下次同步时重试: {}", err.path().display());
        }
        self.reporter.report(SyncEvent::from_error(&err));
        report.errors.push(err.to_string());
    }
}
