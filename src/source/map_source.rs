//! 内存数据源
//!
//! 主要用于测试和显式覆盖

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::core::{Snapshot, Source};
use crate::error::PropsError;
use crate::{impl_box_from, impl_from};

/// 内存数据源配置
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct MapSourceConfig {
    /// 数据源名称
    #[default = "map"]
    pub name: String,

    /// 初始数据
    pub values: HashMap<String, String>,

    /// 是否参与 refresh
    #[default = true]
    pub mutable: bool,
}

/// 内存数据源
///
/// 写入立即对 `lookup` 可见；已缓存的解析结果在下一次 refresh 时失效。
///
/// # 示例
/// ```
/// use layered_props::source::{MapSource, Source};
///
/// let source = MapSource::with_values("overrides", [("PORT", "8080")]);
/// source.put("HOST", "0.0.0.0");
/// assert_eq!(source.lookup("PORT").unwrap(), Some("8080".to_string()));
/// ```
pub struct MapSource {
    name: String,
    mutable: bool,
    values: ArcSwap<HashMap<String, String>>,
    // 串行化写入，读取走无锁快照
    write_lock: Mutex<()>,
}

impl MapSource {
    pub fn new(config: MapSourceConfig) -> Self {
        Self {
            name: config.name,
            mutable: config.mutable,
            values: ArcSwap::from_pointee(config.values),
            write_lock: Mutex::new(()),
        }
    }

    /// 以给定名称和初始数据构造可变的内存数据源
    pub fn with_values<K, V, I>(name: &str, values: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(MapSourceConfig {
            name: name.to_string(),
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            mutable: true,
        })
    }

    /// 写入一个 key，返回旧值
    pub fn put(&self, key: &str, value: &str) -> Option<String> {
        self.update(|map| map.insert(key.to_string(), value.to_string()))
    }

    /// 删除一个 key，返回旧值
    pub fn remove(&self, key: &str) -> Option<String> {
        self.update(|map| map.remove(key))
    }

    /// 批量写入
    pub fn extend<K, V, I>(&self, values: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.update(|map| map.extend(values.into_iter().map(|(k, v)| (k.into(), v.into()))))
    }

    fn update<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = HashMap::clone(&self.values.load());
        let result = f(&mut next);
        self.values.store(Arc::new(next));
        result
    }
}

impl_from!(MapSourceConfig => MapSource);
impl_box_from!(MapSource => dyn Source);

impl Source for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutable(&self) -> bool {
        self.mutable
    }

    fn lookup(&self, key: &str) -> Result<Option<String>, PropsError> {
        Ok(self.values.load().get(key).cloned())
    }

    fn snapshot(&self) -> Result<Snapshot, PropsError> {
        Ok(self.values.load_full())
    }
}
