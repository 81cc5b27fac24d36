//! reload 模块 - 自动刷新
//!
//! 定时刷新和文件变化触发刷新

pub mod file_trigger;
pub mod scheduler;

pub use file_trigger::{FileWatchTrigger, FileWatchTriggerConfig};
pub use scheduler::{ReloadScheduler, ReloadSchedulerConfig};
