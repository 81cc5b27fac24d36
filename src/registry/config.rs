use anyhow::Result;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::cfg::TypeOptions;

/// 单层数据源配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LayerConfig {
    /// 优先级，数值越小越优先
    #[serde(default)]
    #[garde(skip)]
    pub priority: i32,

    /// 数据源的类型与配置
    #[garde(dive)]
    pub source: TypeOptions,
}

/// Registry 配置
///
/// ```yaml
/// sources:
///   - priority: 0
///     source:
///       type: EnvironmentSource
///   - priority: 10
///     source:
///       type: FileSource
///       options:
///         path: /etc/app/app.properties
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RegistryConfig {
    #[garde(dive)]
    pub sources: Vec<LayerConfig>,
}

impl RegistryConfig {
    /// 从 JSON 字符串创建（支持 JSON5 格式）
    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(json5::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}
