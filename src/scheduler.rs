//! 定时同步调度
//!
//! 每次同步前检查源目录、创建副本目录，然后在阻塞线程上执行一次完整同步。
//! 上一次同步返回之前不会开始下一次。

use crate::core::{SyncEngine, SyncReport};
use crate::error::SyncError;
use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 同步调度器
pub struct Scheduler {
    engine: Arc<SyncEngine>,
    source: PathBuf,
    replica: PathBuf,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            source: source.into(),
            replica: replica.into(),
            interval,
        }
    }

    /// 执行一次同步
    ///
    /// 源目录不存在时返回错误，调用方应停止调度。
    pub fn run_pass(&self) -> Result<SyncReport> {
        if !self.source.is_dir() {
            error!("源目录不存在: {}", self.source.display());
            return Err(SyncError::SourceMissing(self.source.clone()).into());
        }

        if !self.replica.exists() {
            std::fs::create_dir_all(&self.replica)
                .with_context(|| format!("无法创建副本目录: {}", self.replica.display()))?;
            info!("已创建副本目录: {}", self.replica.display());
        }

        info!("开始同步");
        let report = self.engine.synchronize(&self.source, &self.replica)?;
        if report.has_changes() {
            info!("同步结束");
        } else {
            info!("同步结束，副本无变化");
        }

        Ok(report)
    }

    /// 按固定周期反复同步，直到 `shutdown` 完成或出现致命错误
    ///
    /// `shutdown` 从第一次同步开始就被监听；同步进行中收到退出信号时，
    /// 等待本次同步结束后再返回。返回已完成的同步次数。
    pub async fn run<F>(self: Arc<Self>, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut passes = 0u64;

        loop {
            let scheduler = self.clone();
            let mut pass = tokio::task::spawn_blocking(move || scheduler.run_pass());

            let mut stopping = false;
            let result = tokio::select! {
                result = &mut pass => result,
                _ = &mut shutdown => {
                    info!("收到退出信号，等待本次同步结束");
                    stopping = true;
                    pass.await
                }
            };
            result.context("同步线程异常退出")??;
            passes += 1;

            if stopping {
                info!("停止同步 (共 {} 次)", passes);
                return Ok(passes);
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("收到退出信号，停止同步 (共 {} 次)", passes);
                    return Ok(passes);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventKind, MemoryReporter};
    use crate::storage::{DirEntryInfo, LocalStorage, Storage};
    use std::fs;
    use std::io::{self, Read};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;
    use tempfile::TempDir;

    /// 列目录前等待放行，超时则返回错误
    struct GatedStorage {
        inner: LocalStorage,
        open: Arc<AtomicBool>,
    }

    impl Storage for GatedStorage {
        fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !self.open.load(Ordering::SeqCst) {
                if Instant::now() > deadline {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "gate closed"));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            self.inner.list_dir(dir)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.inner.is_dir(path)
        }

        fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
            self.inner.open(path)
        }

        fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
            self.inner.copy_file(from, to)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.inner.remove_file(path)
        }

        fn create_dir(&self, path: &Path) -> io::Result<()> {
            self.inner.create_dir(path)
        }

        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            self.inner.remove_dir_all(path)
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    fn scheduler(source: PathBuf, replica: PathBuf, interval: Duration) -> Scheduler {
        let engine = SyncEngine::new(
            Arc::new(LocalStorage::new()),
            Arc::new(MemoryReporter::new()),
        );
        Scheduler::new(Arc::new(engine), source, replica, interval)
    }

    #[test]
    fn test_run_pass_creates_missing_replica() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("backups").join("replica");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), "hello").unwrap();

        let scheduler = scheduler(source, replica.clone(), Duration::from_secs(60));
        let report = scheduler.run_pass().unwrap();

        assert_eq!(report.files_created, 1);
        assert_eq!(fs::read_to_string(replica.join("a.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_run_pass_fails_without_source() {
        let temp_dir = TempDir::new().unwrap();
        let replica = temp_dir.path().join("replica");

        let scheduler = scheduler(
            temp_dir.path().join("missing"),
            replica.clone(),
            Duration::from_secs(60),
        );
        let err = scheduler.run_pass().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::SourceMissing(_))
        ));
        assert!(!replica.exists());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_after_pass() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), "hello").unwrap();

        let scheduler = Arc::new(scheduler(source, replica.clone(), Duration::from_secs(3600)));
        let passes = scheduler.run(async {}).await.unwrap();

        assert_eq!(passes, 1);
        assert!(replica.join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_run_repeats_until_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source).unwrap();

        let scheduler = Arc::new(scheduler(source, replica, Duration::from_millis(10)));
        let passes = scheduler
            .run(tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();

        assert!(passes >= 2);
    }

    #[tokio::test]
    async fn test_run_halts_when_source_disappears() {
        let temp_dir = TempDir::new().unwrap();
        let scheduler = Arc::new(scheduler(
            temp_dir.path().join("missing"),
            temp_dir.path().join("replica"),
            Duration::from_millis(10),
        ));

        let result = scheduler.run(std::future::pending()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_during_first_pass_waits_for_it() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), "hello").unwrap();

        let gate = Arc::new(AtomicBool::new(false));
        let storage = Arc::new(GatedStorage {
            inner: LocalStorage::new(),
            open: gate.clone(),
        });
        let reporter = Arc::new(MemoryReporter::new());
        let engine = SyncEngine::new(storage, reporter.clone());
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(engine),
            source,
            replica.clone(),
            Duration::from_secs(3600),
        ));

        // 退出信号在同步进行中被处理，并放行被阻塞的同步
        let passes = scheduler
            .run(async move {
                gate.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(passes, 1);
        assert_eq!(reporter.count(EventKind::Error), 0);
        assert_eq!(fs::read_to_string(replica.join("a.txt")).unwrap(), "hello");
    }
}
