//! 同步事件上报
//!
//! 同步引擎不直接依赖全局日志，而是把每个状态变更和错误作为事件交给
//! 调用方注入的 `Reporter`，由调用方决定输出位置。

use crate::error::SyncError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};

/// 事件级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Error,
}

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    FileCreated,
    FileUpdated,
    FileDeleted,
    DirCreated,
    DirRemoved,
    Error,
}

/// 同步事件
#[derive(Debug, Clone, Serialize)]
pub struct SyncEvent {
    pub level: EventLevel,
    pub kind: EventKind,
    pub path: PathBuf,
    pub message: String,
}

impl SyncEvent {
    fn info(kind: EventKind, path: &Path, message: String) -> Self {
        Self {
            level: EventLevel::Info,
            kind,
            path: path.to_path_buf(),
            message,
        }
    }

    pub fn file_created(path: &Path) -> Self {
        Self::info(
            EventKind::FileCreated,
            path,
            format!("已复制新文件: {}", path.display()),
        )
    }

    pub fn file_updated(path: &Path) -> Self {
        Self::info(
            EventKind::FileUpdated,
            path,
            format!("已更新文件: {}", path.display()),
        )
    }

    pub fn file_deleted(path: &Path) -> Self {
        Self::info(
            EventKind::FileDeleted,
            path,
            format!("已删除文件: {}", path.display()),
        )
    }

    pub fn dir_created(path: &Path) -> Self {
        Self::info(
            EventKind::DirCreated,
            path,
            format!("已创建目录: {}", path.display()),
        )
    }

    pub fn dir_removed(path: &Path) -> Self {
        Self::info(
            EventKind::DirRemoved,
            path,
            format!("已删除目录: {}", path.display()),
        )
    }

    pub fn from_error(err: &SyncError) -> Self {
        Self {
            level: EventLevel::Error,
            kind: EventKind::Error,
            path: err.path().to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == EventLevel::Error
    }
}

/// 事件接收方
pub trait Reporter: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// 转发到 tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: SyncEvent) {
        if event.is_error() {
            error!("{}", event.message);
        } else {
            info!("{}", event.message);
        }
    }
}

/// 在内存中收集事件
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前已收集事件的副本
    pub fn events(&self) -> Vec<SyncEvent> {
        self.lock().clone()
    }

    /// 取出并清空已收集的事件
    pub fn take(&self) -> Vec<SyncEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SyncEvent>> {
        // 事件列表不存在中间状态，锁中毒后继续使用
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: SyncEvent) {
        self.lock().push(event);
    }
}
