//! layered-props - 分层属性解析
//!
//! 按优先级组合多个属性来源（环境变量、系统属性、属性文件、内存、远程配置），
//! 将 key 解析为类型化的值，并在来源变化时精确地刷新缓存。
//!
//! ## 模块
//!
//! - **converter**: 原始字符串与类型值之间的转换
//! - **source**: 属性来源
//! - **registry**: 分层解析、缓存与刷新
//! - **prop**: 类型化属性句柄、属性组和模板
//! - **reload**: 定时刷新和文件变化触发刷新
//! - **cfg**: 声明式配置（TypeOptions 工厂、时间长度解析）
//!
//! ## 示例
//!
//! ```
//! use std::sync::Arc;
//! use layered_props::converter::IntConverter;
//! use layered_props::registry::Registry;
//! use layered_props::source::{EnvironmentSource, EnvironmentSourceConfig, MapSource};
//!
//! let registry = Arc::new(Registry::default());
//! registry.register(Arc::new(EnvironmentSource::new(EnvironmentSourceConfig::default())), 0).unwrap();
//! registry.register(Arc::new(MapSource::with_values("defaults", [("LAYERED_PROPS_DOC_PORT", "8080")])), 10).unwrap();
//!
//! let port = registry.bind("LAYERED_PROPS_DOC_PORT", IntConverter::<u16>::new(), 80).unwrap();
//! assert_eq!(port.get().unwrap(), 8080);
//! ```

pub mod cfg;
pub mod converter;
pub mod error;
pub mod observer;
pub mod prop;
pub mod registry;
pub mod reload;
pub mod source;

// 重新导出主要的公共 API
pub use cfg::{create_trait_from_type_options, register_trait, TypeOptions};

pub use converter::{
    BoolConverter, Converter, CustomConverter, DurationConverter, FloatConverter, IntConverter,
    ListConverter, StringConverter,
};

pub use error::PropsError;
pub use observer::{ErrorContext, ErrorObserver, LogObserver};

pub use prop::{render_template, PropertyGroup, PropertyHandle};

pub use registry::{
    LayerConfig, RefreshReport, Registry, RegistryConfig, ResolvedValue, SourceInfo,
};

pub use reload::{FileWatchTrigger, FileWatchTriggerConfig, ReloadScheduler, ReloadSchedulerConfig};

pub use source::{
    register_sources, EnvironmentSource, FileSource, MapSource, RemoteSource, Snapshot, Source,
    SystemPropertySource,
};
