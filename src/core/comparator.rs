use crate::core::hasher::DirectorySnapshot;
use std::ffi::OsString;

/// 复制类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyKind {
    /// 副本中不存在该文件
    Create,
    /// 副本中存在但内容不同，或无法读取
    Update,
}

/// 单层目录内的同步动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// 删除副本中多余的文件
    Delete { name: OsString },
    /// 从源目录复制文件到副本
    Copy { name: OsString, kind: CopyKind },
}

/// 动作统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSummary {
    pub create_count: usize,
    pub update_count: usize,
    pub delete_count: usize,
    pub unchanged_count: usize,
}

impl ActionSummary {
    pub fn copy_count(&self) -> usize {
        self.create_count + self.update_count
    }

    pub fn is_noop(&self) -> bool {
        self.copy_count() == 0 && self.delete_count == 0
    }
}

/// 文件比较器
#[derive(Debug, Default)]
pub struct FileComparator;

impl FileComparator {
    pub fn new() -> Self {
        Self
    }

    /// 比较源目录和副本目录的快照，返回同步动作列表
    ///
    /// 删除动作排在复制动作之前，两组内部按文件名排序。
    /// 源目录中存在但无法读取的文件不会被删除，也不会被复制。
    pub fn compare_snapshots(
        &self,
        source: &DirectorySnapshot,
        replica: &DirectorySnapshot,
    ) -> Vec<SyncAction> {
        let mut actions: Vec<SyncAction> = replica
            .names()
            .filter(|name| !source.contains(name) && !source.is_unreadable(name))
            .map(|name| SyncAction::Delete { name: name.clone() })
            .collect();

        for (name, digest) in source.iter() {
            let kind = match replica.get(name) {
                // 副本文件存在但无法读取，覆盖它属于更新
                None if replica.is_unreadable(name) => CopyKind::Update,
                None => CopyKind::Create,
                Some(existing) if existing != digest => CopyKind::Update,
                Some(_) => continue,
            };
            actions.push(SyncAction::Copy {
                name: name.clone(),
                kind,
            });
        }

        actions
    }

    /// 统计同步动作
    pub fn summarize_actions(
        actions: &[SyncAction],
        source: &DirectorySnapshot,
    ) -> ActionSummary {
        let mut summary = ActionSummary::default();

        for action in actions {
            match action {
                SyncAction::Copy {
                    kind: CopyKind::Create,
                    ..
                } => summary.create_count += 1,
                SyncAction::Copy {
                    kind: CopyKind::Update,
                    ..
                } => summary.update_count += 1,
                SyncAction::Delete { .. } => summary.delete_count += 1,
            }
        }

        summary.unchanged_count = source.len().saturating_sub(summary.copy_count());
        summary
    }
}
