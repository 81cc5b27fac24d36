//! cfg 模块 - 声明式配置
//!
//! TypeOptions 工厂、时间长度解析和配置转换宏

pub mod macros;
pub mod registry;
pub mod serde_duration;
pub mod type_options;

// 重新导出公共 API
pub use registry::{create_trait_from_type_options, register_trait, registered_type_names};
pub use serde_duration::{format_duration, parse_duration, DurationError, HumanDur};
pub use type_options::TypeOptions;
