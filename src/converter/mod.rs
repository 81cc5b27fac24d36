//! converter 模块 - 原始字符串到类型值的转换

pub mod builtin;
pub mod core;

pub use self::builtin::{
    BoolConverter, DurationConverter, FloatConverter, IntConverter, ListConverter,
    StringConverter,
};
pub use self::core::{Converter, CustomConverter};
