//! source 模块 - 属性来源
//!
//! 每个数据源提供一组原始的 key/value，由 Registry 按优先级组合

pub mod core;
pub mod env_source;
pub mod file_source;
pub mod map_source;
pub mod register;
pub mod remote_source;
pub mod system_source;

pub use self::core::{empty_snapshot, Snapshot, Source};
pub use self::env_source::{EnvironmentSource, EnvironmentSourceConfig};
pub use self::file_source::{parse_properties, FileFormat, FileSource, FileSourceConfig};
pub use self::map_source::{MapSource, MapSourceConfig};
pub use self::register::register_sources;
pub use self::remote_source::{RemoteSource, RemoteSourceConfig};
pub use self::system_source::{
    clear_system_properties, remove_system_property, set_system_property,
    set_system_property_from_arg, system_property, SystemPropertySource,
    SystemPropertySourceConfig,
};
