//! 错误观察者
//!
//! Registry 在不向调用方抛出错误的路径上（refresh、降级解析、默认值兜底），
//! 通过注入的观察者上报错误，保证每个错误至少被观察一次。

use std::fmt;

use crate::error::PropsError;

/// 错误发生的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorContext {
    /// 解析 key 时数据源查询失败，本次按未找到处理
    Lookup { source_name: String, key: String },
    /// 刷新数据源快照失败，保留旧快照
    Refresh { source_name: String },
    /// 注册数据源失败
    Registration { source_name: String },
    /// 类型转换失败
    Conversion { key: String },
    /// 文件监听失败
    Watch { path: String },
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorContext::Lookup { source_name, key } => {
                write!(f, "lookup of {:?} in source {}", key, source_name)
            }
            ErrorContext::Refresh { source_name } => write!(f, "refresh of source {}", source_name),
            ErrorContext::Registration { source_name } => {
                write!(f, "registration of source {}", source_name)
            }
            ErrorContext::Conversion { key } => write!(f, "conversion of {:?}", key),
            ErrorContext::Watch { path } => write!(f, "watch of {}", path),
        }
    }
}

/// 错误观察者接口
///
/// 闭包 `Fn(&ErrorContext, &PropsError)` 自动实现此 trait。
///
/// # 示例
/// ```
/// use std::sync::Arc;
/// use layered_props::{ErrorContext, ErrorObserver, PropsError};
///
/// let observer: Arc<dyn ErrorObserver> = Arc::new(|ctx: &ErrorContext, err: &PropsError| {
///     eprintln!("{}: {}", ctx, err);
/// });
/// ```
pub trait ErrorObserver: Send + Sync {
    fn observe(&self, context: &ErrorContext, error: &PropsError);
}

impl<F> ErrorObserver for F
where
    F: Fn(&ErrorContext, &PropsError) + Send + Sync,
{
    fn observe(&self, context: &ErrorContext, error: &PropsError) {
        self(context, error)
    }
}

/// 默认观察者，写入 `log` 门面
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ErrorObserver for LogObserver {
    fn observe(&self, context: &ErrorContext, error: &PropsError) {
        log::warn!("{} failed: {}", context, error);
    }
}
