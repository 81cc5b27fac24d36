//! 文件变化触发刷新
//!
//! 监听文件所在目录，目标文件被修改、创建或删除时，防抖后调用 `Registry::refresh`。
//! 监听目录而不是文件本身，编辑器先写临时文件再 rename 的保存方式也能被发现。

use crossbeam::channel::{self, Sender};
use notify::{recommended_watcher, Event, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::cfg::serde_duration::{serde_as, HumanDur};
use crate::error::PropsError;
use crate::observer::ErrorContext;
use crate::registry::Registry;

/// 文件监听配置
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct FileWatchTriggerConfig {
    /// 被监听的文件
    pub path: String,

    /// 防抖时间，期间的多次变化只触发一次刷新
    #[default(Duration::from_millis(100))]
    #[serde_as(as = "HumanDur")]
    pub debounce: Duration,
}

/// 文件变化触发器
///
/// drop 时停止监听并等待后台线程退出。
///
/// # 示例
/// ```no_run
/// use std::sync::Arc;
/// use layered_props::registry::Registry;
/// use layered_props::reload::{FileWatchTrigger, FileWatchTriggerConfig};
///
/// let registry = Arc::new(Registry::default());
/// let trigger = FileWatchTrigger::new(registry, FileWatchTriggerConfig {
///     path: "/etc/app/app.properties".to_string(),
///     ..Default::default()
/// }).unwrap();
/// ```
pub struct FileWatchTrigger {
    path: PathBuf,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FileWatchTrigger {
    pub fn new(registry: Arc<Registry>, config: FileWatchTriggerConfig) -> Result<Self, PropsError> {
        if config.path.is_empty() {
            return Err(PropsError::Config("watch path is empty".to_string()));
        }

        let path = PathBuf::from(&config.path);
        let (dir, file_name) = split_path(&path)?;
        let dir = dunce::canonicalize(&dir).map_err(|e| PropsError::Io {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })
        .map_err(|e| watch_error(&path, e))?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(&path, e))?;

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let debounce = config.debounce;
        let display_path = path.display().to_string();
        let thread = thread::Builder::new()
            .name("props-file-watch".to_string())
            .spawn(move || {
                loop {
                    crossbeam::select! {
                        recv(stop_rx) -> _ => {
                            break;
                        }
                        recv(event_rx) -> event => {
                            let event = match event {
                                Ok(event) => event,
                                Err(_) => break,
                            };
                            match event {
                                Ok(event) if touches(&event, &file_name) => {
                                    // 防抖：等待一段时间，丢弃期间的重复事件
                                    thread::sleep(debounce);
                                    while event_rx.try_recv().is_ok() {}

                                    log::debug!("{} changed, refreshing", display_path);
                                    registry.refresh();
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    registry.observe(
                                        &ErrorContext::Watch {
                                            path: display_path.clone(),
                                        },
                                        &PropsError::Io {
                                            path: display_path.clone(),
                                            reason: e.to_string(),
                                        },
                                    );
                                }
                            }
                        }
                    }
                }

                // 显式 drop watcher 以释放文件句柄
                drop(watcher);
            })
            .map_err(|e| PropsError::Config(format!("failed to spawn watch thread: {}", e)))?;

        log::info!("watching {} for changes", path.display());
        Ok(Self {
            path,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// 被监听的文件
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 停止监听并等待后台线程退出
    pub fn stop(&mut self) {
        if let Some(sender) = self.stop_tx.take() {
            let _ = sender.send(());
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FileWatchTrigger {
    fn drop(&mut self) {
        self.stop();
    }
}

fn split_path(path: &Path) -> Result<(PathBuf, std::ffi::OsString), PropsError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| PropsError::Config(format!("not a file path: {}", path.display())))?
        .to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

fn touches(event: &Event, file_name: &std::ffi::OsStr) -> bool {
    let relevant = event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove();
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

fn watch_error(path: &Path, err: notify::Error) -> PropsError {
    PropsError::Io {
        path: path.display().to_string(),
        reason: format!("failed to watch: {}", err),
    }
}
