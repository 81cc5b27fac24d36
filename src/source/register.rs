//! 注册所有 Source 实现
//!
//! 提供统一的数据源注册接口，支持通过 TypeOptions 创建不同的 Source 实例

use anyhow::Result;

use crate::cfg::register_trait;

use super::{
    EnvironmentSource, EnvironmentSourceConfig, FileSource, FileSourceConfig, MapSource,
    MapSourceConfig, RemoteSource, RemoteSourceConfig, Source, SystemPropertySource,
    SystemPropertySourceConfig,
};

/// 注册所有内置 Source 实现
///
/// # 注册的类型
/// - `EnvironmentSource` - 环境变量
/// - `SystemPropertySource` - 系统属性
/// - `FileSource` - 属性文件 / JSON / YAML / TOML
/// - `MapSource` - 内存数据
/// - `RemoteSource` - HTTP 远程配置
///
/// # 示例
/// ```
/// use layered_props::cfg::{create_trait_from_type_options, TypeOptions};
/// use layered_props::source::{register_sources, Source};
///
/// register_sources().unwrap();
///
/// let opts = TypeOptions::from_json(r#"{
///     "type": "MapSource",
///     "options": { "name": "defaults", "values": { "PORT": "8080" } }
/// }"#).unwrap();
///
/// let source: Box<dyn Source> = create_trait_from_type_options(&opts).unwrap();
/// assert_eq!(source.name(), "defaults");
/// ```
pub fn register_sources() -> Result<()> {
    register_trait::<EnvironmentSource, dyn Source, EnvironmentSourceConfig>(
        "EnvironmentSource",
    )?;
    register_trait::<SystemPropertySource, dyn Source, SystemPropertySourceConfig>(
        "SystemPropertySource",
    )?;
    register_trait::<FileSource, dyn Source, FileSourceConfig>("FileSource")?;
    register_trait::<MapSource, dyn Source, MapSourceConfig>("MapSource")?;
    register_trait::<RemoteSource, dyn Source, RemoteSourceConfig>("RemoteSource")?;

    Ok(())
}
