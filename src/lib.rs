pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod storage;

pub use config::AppConfig;
pub use core::{SyncConfig, SyncEngine, SyncReport, TreeHasher};
pub use error::{Result, SyncError};
pub use scheduler::Scheduler;
pub use storage::{LocalStorage, Storage};
