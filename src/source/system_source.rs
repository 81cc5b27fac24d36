//! 系统属性数据源
//!
//! 进程级的可变属性表，类似启动参数 `-Dkey=value` 注入的属性。
//! 数据源实时读取属性表，refresh 时比对快照发现变化。

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::core::{Snapshot, Source};
use crate::error::PropsError;
use crate::{impl_box_from, impl_from};

// 全局系统属性表
static SYSTEM_PROPERTIES: Lazy<RwLock<HashMap<String, String>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// 设置系统属性，返回旧值
pub fn set_system_property(key: &str, value: &str) -> Option<String> {
    SYSTEM_PROPERTIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key.to_string(), value.to_string())
}

/// 删除系统属性，返回旧值
pub fn remove_system_property(key: &str) -> Option<String> {
    SYSTEM_PROPERTIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(key)
}

/// 读取系统属性
pub fn system_property(key: &str) -> Option<String> {
    SYSTEM_PROPERTIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .cloned()
}

/// 清空全部系统属性
pub fn clear_system_properties() {
    SYSTEM_PROPERTIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// 解析 `key=value` 形式的参数并写入系统属性表
///
/// 例如命令行传入的 `-Dserver.port=8080` 去掉 `-D` 后的部分。
pub fn set_system_property_from_arg(arg: &str) -> Result<(), PropsError> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| PropsError::Config(format!("expected key=value, got {:?}", arg)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(PropsError::InvalidKey(arg.to_string()));
    }
    set_system_property(key, value);
    Ok(())
}

/// 系统属性数据源配置
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct SystemPropertySourceConfig {
    /// 数据源名称
    #[default = "system"]
    pub name: String,
}

/// 系统属性数据源
pub struct SystemPropertySource {
    name: String,
}

impl SystemPropertySource {
    pub fn new(config: SystemPropertySourceConfig) -> Self {
        Self { name: config.name }
    }
}

impl_from!(SystemPropertySourceConfig => SystemPropertySource);
impl_box_from!(SystemPropertySource => dyn Source);

impl Source for SystemPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutable(&self) -> bool {
        true
    }

    fn lookup(&self, key: &str) -> Result<Option<String>, PropsError> {
        Ok(system_property(key))
    }

    fn snapshot(&self) -> Result<Snapshot, PropsError> {
        let props = SYSTEM_PROPERTIES
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(Arc::new(props))
    }
}
