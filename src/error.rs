//! 错误类型
//!
//! 属性解析过程中所有可观测的错误。key 不存在不是错误，用 `None` 表示。

use thiserror::Error;

/// 属性管理相关错误
///
/// 所有字段都是拥有所有权的字符串，错误可以被克隆后同时分发给观察者和订阅者。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropsError {
    /// 原始值存在，但无法转换为目标类型
    #[error("cannot convert {raw:?} to {target}: {reason}")]
    Conversion {
        raw: String,
        target: &'static str,
        reason: String,
    },

    /// 数据源的文件或数据流格式错误
    #[error("parse error at {path}:{line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },

    /// 必需的属性在所有数据源中都不存在
    #[error("missing required property: {0}")]
    MissingProperty(String),

    /// 远程数据源在超时时间内不可达
    #[error("source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// 同一个 Registry 中出现重名数据源
    #[error("source already registered: {0}")]
    DuplicateSource(String),

    /// key 为空
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// 读取数据源失败
    #[error("io error at {path}: {reason}")]
    Io { path: String, reason: String },

    /// 模板渲染失败
    #[error("template error: {0}")]
    Template(String),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

impl PropsError {
    pub(crate) fn conversion(raw: &str, target: &'static str, reason: impl ToString) -> Self {
        PropsError::Conversion {
            raw: raw.to_string(),
            target,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unavailable(source_name: &str, reason: impl ToString) -> Self {
        PropsError::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// 是否为暂时性错误（重试可能成功）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PropsError::SourceUnavailable { .. } | PropsError::Io { .. }
        )
    }
}

impl From<anyhow::Error> for PropsError {
    fn from(err: anyhow::Error) -> Self {
        PropsError::Config(format!("{:#}", err))
    }
}
