//! 配置类型到实现类型的转换宏
//!
//! 数据源统一通过 `XxxConfig -> Xxx` 的转换接入工厂，见 [`crate::cfg::register_trait`]。

/// 为配置类型实现 From trait，调用 `Type::new(config)`
#[macro_export]
macro_rules! impl_from {
    ($config_type:ty => $target_type:ty) => {
        impl From<$config_type> for $target_type {
            fn from(config: $config_type) -> Self {
                <$target_type>::new(config)
            }
        }
    };
}

/// 为配置类型实现 TryFrom trait，调用返回 Result 的 `Type::new(config)`
///
/// 用于构造时可能失败的类型（例如构造时就要读取文件的数据源）。
#[macro_export]
macro_rules! impl_try_from {
    ($config_type:ty => $target_type:ty, error: $error_type:ty) => {
        impl TryFrom<$config_type> for $target_type {
            type Error = $error_type;

            fn try_from(config: $config_type) -> Result<Self, Self::Error> {
                <$target_type>::new(config)
            }
        }
    };
}

/// 为 Box<T> 类型自动实现到 Box<dyn Trait> 的转换
///
/// 用法：`impl_box_from!(Type => dyn TraitName)`
#[macro_export]
macro_rules! impl_box_from {
    ($source_type:ty => dyn $trait_name:path) => {
        impl From<Box<$source_type>> for Box<dyn $trait_name> {
            fn from(source: Box<$source_type>) -> Self {
                source as Box<dyn $trait_name>
            }
        }
    };
}
