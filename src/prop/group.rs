//! 属性组
//!
//! 一组相关属性（如 host 和 port）需要来自同一次 refresh 的结果。
//! 读取与 register/refresh 重叠时会重试，直到读到一组不跨越变更的值。

use std::sync::Arc;

use super::handle::PropertyHandle;
use super::template::render_template;
use crate::error::PropsError;
use crate::registry::Registry;

const MAX_ATTEMPTS: usize = 100;

/// 一致读取的一组属性
///
/// 为 2 到 5 个 `&PropertyHandle` 组成的元组实现。
/// 一致性以第一个句柄的 Registry 为准。
///
/// # 示例
/// ```
/// use std::sync::Arc;
/// use layered_props::converter::{IntConverter, StringConverter};
/// use layered_props::prop::PropertyGroup;
/// use layered_props::registry::Registry;
/// use layered_props::source::MapSource;
///
/// let registry = Arc::new(Registry::default());
/// registry.register(Arc::new(MapSource::with_values("m", [("db.host", "10.0.0.1")])), 0).unwrap();
///
/// let host = registry.bind("db.host", StringConverter, "localhost".to_string()).unwrap();
/// let port = registry.bind("db.port", IntConverter::<u16>::new(), 3306).unwrap();
///
/// let (h, p) = (&host, &port).get().unwrap();
/// assert_eq!((h.as_str(), p), ("10.0.0.1", 3306));
/// assert_eq!((&host, &port).render("mysql://{}:{}").unwrap(), "mysql://10.0.0.1:3306");
/// ```
pub trait PropertyGroup {
    type Output;

    /// 一致地读取所有属性
    fn get(&self) -> Result<Self::Output, PropsError>;

    /// 读取所有属性，编码后填入模板
    fn render(&self, template: &str) -> Result<String, PropsError>;
}

/// 在没有 register/refresh 并发进行时执行 `read`
pub(crate) fn consistent_read<R>(
    registry: &Arc<Registry>,
    read: impl Fn() -> Result<R, PropsError>,
) -> Result<R, PropsError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let before = registry.change_seq();
        if before % 2 == 1 && attempt < MAX_ATTEMPTS {
            std::thread::yield_now();
            continue;
        }

        let result = read();
        if registry.change_seq() == before {
            return result;
        }
        if attempt >= MAX_ATTEMPTS {
            log::debug!("group read gave up after {} attempts", attempt);
            return result;
        }
        std::thread::yield_now();
    }
}

macro_rules! impl_property_group {
    ($($ty:ident $idx:tt),+) => {
        impl<'a, $($ty),+> PropertyGroup for ($(&'a PropertyHandle<$ty>,)+)
        where
            $($ty: Clone + Send + Sync + 'static),+
        {
            type Output = ($($ty,)+);

            fn get(&self) -> Result<Self::Output, PropsError> {
                consistent_read(self.0.registry(), || Ok(($(self.$idx.get()?,)+)))
            }

            fn render(&self, template: &str) -> Result<String, PropsError> {
                let values = self.get()?;
                let args = vec![$(self.$idx.encode(&values.$idx)),+];
                render_template(template, &args)
            }
        }
    };
}

impl_property_group!(A 0, B 1);
impl_property_group!(A 0, B 1, C 2);
impl_property_group!(A 0, B 1, C 2, D 3);
impl_property_group!(A 0, B 1, C 2, D 3, E 4);
