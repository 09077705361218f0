use anyhow::{Context, Result};
use clap::Parser;
use foldersync_lib::config::AppConfig;
use foldersync_lib::core::{SyncEngine, TracingReporter};
use foldersync_lib::logging::{parse_level, LogConfig, SizeRotatingWriter};
use foldersync_lib::scheduler::Scheduler;
use foldersync_lib::storage::LocalStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

/// 单向定时同步文件夹：让副本目录与源目录保持一致
#[derive(Parser)]
#[command(name = "foldersync", version, about)]
struct Cli {
    /// 源目录路径
    source_dir: PathBuf,

    /// 副本目录路径，不存在时自动创建
    replica_dir: PathBuf,

    /// 日志目录路径，不存在时自动创建
    log_dir: PathBuf,

    /// 同步周期（秒），默认读取配置文件，未配置时为 60
    #[arg(short = 't', long = "time-interval")]
    time_interval: Option<u64>,

    /// 只同步一次然后退出
    #[arg(long)]
    once: bool,

    /// 日志级别: error, warn, info, debug, trace
    #[arg(long, value_parser = parse_level_arg)]
    log_level: Option<String>,
}

fn parse_level_arg(level: &str) -> std::result::Result<String, String> {
    parse_level(level)
        .map(|_| level.to_lowercase())
        .ok_or_else(|| format!("无效的日志级别: {}", level))
}

/// 初始化日志系统
///
/// 同时输出到控制台和日志目录下的日志文件，返回的 guard 必须在程序退出前保持存活。
fn init_logging(log_dir: &Path, level_override: Option<&str>) -> Result<Option<WorkerGuard>> {
    let mut config = LogConfig::load(log_dir);
    if let Some(level) = level_override {
        config.level = level.to_string();
    }

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(config.tracing_level().into())
        .from_env_lossy();

    if !config.enabled {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .context("初始化日志失败")?;
        return Ok(None);
    }

    let file_writer = SizeRotatingWriter::new(log_dir, config.max_size_mb)
        .with_context(|| format!("无法创建日志文件: {}", log_dir.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_writer);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("初始化日志失败")?;

    Ok(Some(guard))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("无法监听退出信号: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app_config = AppConfig::load(&cli.log_dir);
    let interval = cli
        .time_interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| app_config.interval());

    info!(
        "开始文件夹同步\n源目录: {}\n副本目录: {}\n日志目录: {}\n同步周期: 每 {} 秒",
        cli.source_dir.display(),
        cli.replica_dir.display(),
        cli.log_dir.display(),
        interval.as_secs()
    );

    let engine = SyncEngine::with_config(
        Arc::new(LocalStorage::new()),
        Arc::new(TracingReporter),
        app_config.sync_config(),
    );
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(engine),
        cli.source_dir,
        cli.replica_dir,
        interval,
    ));

    if cli.once {
        let report = tokio::task::spawn_blocking(move || scheduler.run_pass()).await??;
        info!(
            "同步报告: {}",
            serde_json::to_string(&report).unwrap_or_default()
        );
        return Ok(());
    }

    scheduler.run(shutdown_signal()).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = std::fs::create_dir_all(&cli.log_dir) {
        eprintln!("无法创建日志目录 {}: {}", cli.log_dir.display(), e);
        std::process::exit(1);
    }

    let _guard = match init_logging(&cli.log_dir, cli.log_level.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        error!("同步已停止: {:#}", e);
        drop(_guard);
        std::process::exit(1);
    }
}
