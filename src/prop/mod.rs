//! prop 模块 - 类型化属性
//!
//! 属性句柄、一致读取的属性组和模板渲染

pub mod group;
pub mod handle;
pub mod template;

pub use group::PropertyGroup;
pub use handle::PropertyHandle;
pub use template::render_template;
