//! 定时刷新
//!
//! 后台线程按固定间隔调用 `Registry::refresh`，停止时等待进行中的刷新完成。

use crossbeam::channel::{self, Sender};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crate::cfg::serde_duration::{serde_as, HumanDur};
use crate::error::PropsError;
use crate::registry::Registry;

/// 定时刷新配置
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct ReloadSchedulerConfig {
    /// 刷新间隔，如 "30s"、"1m30s"
    #[default(Duration::from_secs(30))]
    #[serde_as(as = "HumanDur")]
    pub interval: Duration,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
    thread_id: ThreadId,
}

/// 定时刷新调度器
///
/// drop 时自动停止。
///
/// # 示例
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use layered_props::registry::Registry;
/// use layered_props::reload::ReloadScheduler;
///
/// let registry = Arc::new(Registry::default());
/// let scheduler = ReloadScheduler::new(registry);
/// scheduler.start(Duration::from_secs(30)).unwrap();
/// assert!(scheduler.is_running());
/// scheduler.stop();
/// ```
pub struct ReloadScheduler {
    registry: Arc<Registry>,
    worker: Mutex<Option<Worker>>,
}

impl ReloadScheduler {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            worker: Mutex::new(None),
        }
    }

    /// 按配置创建并立即启动
    pub fn from_config(
        registry: Arc<Registry>,
        config: ReloadSchedulerConfig,
    ) -> Result<Self, PropsError> {
        let scheduler = Self::new(registry);
        scheduler.start(config.interval)?;
        Ok(scheduler)
    }

    /// 启动定时刷新；已在运行时先停止再以新间隔启动
    pub fn start(&self, interval: Duration) -> Result<(), PropsError> {
        if interval.is_zero() {
            return Err(PropsError::Config(
                "reload interval must be positive".to_string(),
            ));
        }
        self.stop();

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let registry = self.registry.clone();
        let handle = thread::Builder::new()
            .name("props-reload".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    crossbeam::select! {
                        recv(stop_rx) -> _ => {
                            break;
                        }
                        recv(ticker) -> _ => {
                            let report = registry.refresh();
                            if !report.changed_keys.is_empty() {
                                log::info!(
                                    "reload changed {} keys: {:?}",
                                    report.changed_keys.len(),
                                    report.changed_keys
                                );
                            }
                        }
                    }
                }
            })
            .map_err(|e| PropsError::Config(format!("failed to spawn reload thread: {}", e)))?;

        let thread_id = handle.thread().id();
        let previous = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Worker {
                stop_tx,
                handle,
                thread_id,
            });
        // 并发调用 start 时只保留最后一个
        if let Some(previous) = previous {
            Self::shutdown(previous);
        }
        log::info!("reload scheduler started, interval {:?}", interval);
        Ok(())
    }

    /// 停止定时刷新，等待进行中的刷新完成；未运行时什么也不做
    pub fn stop(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            Self::shutdown(worker);
            log::info!("reload scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn shutdown(worker: Worker) {
        let _ = worker.stop_tx.send(());
        // 在刷新线程内（如变更回调中）停止时无法 join 自己
        if worker.thread_id != thread::current().id() {
            let _ = worker.handle.join();
        }
    }
}

impl Drop for ReloadScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
