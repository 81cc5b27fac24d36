//! 环境变量数据源
//!
//! 构造时读取一次进程环境变量，之后不再变化

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::{Snapshot, Source};
use crate::error::PropsError;
use crate::{impl_box_from, impl_from};

/// 环境变量数据源配置
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct EnvironmentSourceConfig {
    /// 数据源名称
    #[default = "env"]
    pub name: String,

    /// 只保留以此前缀开头的变量，并去掉前缀作为 key
    pub prefix: Option<String>,
}

/// 环境变量数据源
///
/// key 保持宿主系统原生的大小写。
///
/// # 示例
/// ```no_run
/// use layered_props::source::{EnvironmentSource, EnvironmentSourceConfig, Source};
///
/// let env = EnvironmentSource::new(EnvironmentSourceConfig::default());
/// let path = env.lookup("PATH").unwrap();
/// ```
pub struct EnvironmentSource {
    name: String,
    vars: Snapshot,
}

impl EnvironmentSource {
    pub fn new(config: EnvironmentSourceConfig) -> Self {
        // 非 UTF-8 的变量无法作为属性使用，直接跳过
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_vars(config, vars)
    }

    /// 从给定的变量集合构造（构造时的进程环境由 `new` 传入）
    pub fn from_vars<I>(config: EnvironmentSourceConfig, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = match config.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => vars
                .into_iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(prefix)
                        .filter(|rest| !rest.is_empty())
                        .map(|rest| (rest.to_string(), v))
                })
                .collect(),
            _ => vars.into_iter().collect(),
        };

        log::debug!(
            "environment source {} loaded {} variables",
            config.name,
            vars.len()
        );

        Self {
            name: config.name,
            vars: Arc::new(vars),
        }
    }
}

impl_from!(EnvironmentSourceConfig => EnvironmentSource);
impl_box_from!(EnvironmentSource => dyn Source);

impl Source for EnvironmentSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutable(&self) -> bool {
        false
    }

    fn lookup(&self, key: &str) -> Result<Option<String>, PropsError> {
        Ok(self.vars.get(key).cloned())
    }

    fn snapshot(&self) -> Result<Snapshot, PropsError> {
        Ok(self.vars.clone())
    }
}
