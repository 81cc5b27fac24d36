//! registry 模块 - 分层属性注册中心
//!
//! 组合多个数据源，按优先级解析 key，缓存解析结果并在数据源变化时精确失效

pub mod cache;
pub mod config;
pub mod core;
pub mod layer;

pub use self::cache::ResolvedValue;
pub use self::config::{LayerConfig, RegistryConfig};
pub use self::core::{Listener, RefreshReport, Registry};
pub use self::layer::SourceInfo;
