// TypeOptions：按类型名声明式地描述一个待构造对象

use anyhow::Result;
use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 类型选项结构
///
/// `type` 为注册到工厂中的类型名，`options` 为该类型的配置。
///
/// ```json
/// { "type": "FileSource", "options": { "path": "/etc/app.properties" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TypeOptions {
    #[serde(rename = "type")]
    #[garde(length(min = 1))]
    pub type_name: String,
    #[serde(default)]
    #[garde(skip)]
    pub options: JsonValue,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            type_name: String::new(),
            options: JsonValue::Object(Default::default()),
        }
    }
}

impl TypeOptions {
    /// 直接由类型名和可序列化的配置构造
    pub fn new<C: Serialize>(type_name: &str, options: C) -> Result<Self> {
        Ok(Self {
            type_name: type_name.to_string(),
            options: serde_json::to_value(options)?,
        })
    }

    /// 从 JSON 字符串创建 TypeOptions（支持 JSON5 格式）
    pub fn from_json(json_str: &str) -> Result<Self> {
        // 使用 json5 解析（支持注释、尾随逗号、未引用的键等）
        Ok(json5::from_str(json_str)?)
    }

    /// 从 YAML 字符串创建 TypeOptions
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    /// 从 TOML 字符串创建 TypeOptions
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}
