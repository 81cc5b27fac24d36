//! 类型化属性句柄
//!
//! 句柄绑定 key、转换器和默认值，对同一个缓存条目只转换一次。

use std::sync::{Arc, PoisonError, RwLock};

use crate::converter::Converter;
use crate::error::PropsError;
use crate::observer::ErrorContext;
use crate::registry::{Registry, ResolvedValue};

#[derive(Clone)]
enum Outcome<T> {
    Found(T),
    NotFound,
    Failed(PropsError),
}

struct CachedValue<T> {
    generation: u64,
    outcome: Outcome<T>,
}

/// 类型化属性句柄
///
/// - key 不存在时返回默认值
/// - 原始值转换失败时返回错误；启用 `with_fallback_on_error` 后改为返回默认值
/// - 转换失败在每个缓存代数上报给观察者一次
///
/// # 示例
/// ```
/// use std::sync::Arc;
/// use layered_props::converter::IntConverter;
/// use layered_props::registry::Registry;
/// use layered_props::source::MapSource;
///
/// let registry = Arc::new(Registry::default());
/// registry.register(Arc::new(MapSource::with_values("m", [("port", "9090")])), 0).unwrap();
///
/// let port = registry.bind("port", IntConverter::<u16>::new(), 8080).unwrap();
/// assert_eq!(port.get().unwrap(), 9090);
///
/// let workers = registry.bind("workers", IntConverter::<u32>::new(), 4).unwrap();
/// assert_eq!(workers.get().unwrap(), 4);
/// ```
pub struct PropertyHandle<T> {
    key: String,
    registry: Arc<Registry>,
    converter: Arc<dyn Converter<T>>,
    default: T,
    fallback_on_error: bool,
    cached: RwLock<Option<CachedValue<T>>>,
}

impl<T> PropertyHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        registry: Arc<Registry>,
        key: &str,
        converter: Arc<dyn Converter<T>>,
        default: T,
    ) -> Result<Self, PropsError> {
        if key.is_empty() {
            return Err(PropsError::InvalidKey(key.to_string()));
        }
        Ok(Self {
            key: key.to_string(),
            registry,
            converter,
            default,
            fallback_on_error: false,
            cached: RwLock::new(None),
        })
    }

    /// 转换失败时返回默认值而不是错误
    pub fn with_fallback_on_error(mut self) -> Self {
        self.fallback_on_error = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// 当前值；key 不存在时为默认值
    pub fn get(&self) -> Result<T, PropsError> {
        match self.outcome() {
            Outcome::Found(value) => Ok(value),
            Outcome::NotFound => Ok(self.default.clone()),
            Outcome::Failed(_) if self.fallback_on_error => Ok(self.default.clone()),
            Outcome::Failed(err) => Err(err),
        }
    }

    /// 当前值，任何失败都返回默认值
    pub fn get_or_default(&self) -> T {
        match self.outcome() {
            Outcome::Found(value) => value,
            _ => self.default.clone(),
        }
    }

    /// 当前值；key 不存在时返回 `MissingProperty`
    pub fn get_required(&self) -> Result<T, PropsError> {
        match self.outcome() {
            Outcome::Found(value) => Ok(value),
            Outcome::NotFound => Err(PropsError::MissingProperty(self.key.clone())),
            Outcome::Failed(err) => Err(err),
        }
    }

    /// 当前值；key 不存在时为 None
    pub fn value(&self) -> Result<Option<T>, PropsError> {
        match self.outcome() {
            Outcome::Found(value) => Ok(Some(value)),
            Outcome::NotFound => Ok(None),
            Outcome::Failed(err) => Err(err),
        }
    }

    /// 原始解析结果
    pub fn resolved(&self) -> Option<ResolvedValue> {
        self.registry.resolve(&self.key)
    }

    /// 将值编码为原始字符串
    pub fn encode(&self, value: &T) -> String {
        self.converter.encode(value)
    }

    /// 订阅值变化
    ///
    /// key 被删除时 `on_update` 收到默认值；新值转换失败时调用 `on_error`。
    pub fn subscribe<U, E>(&self, on_update: U, on_error: E)
    where
        U: Fn(T) + Send + Sync + 'static,
        E: Fn(PropsError) + Send + Sync + 'static,
    {
        let converter = self.converter.clone();
        let default = self.default.clone();
        self.registry.subscribe(&self.key, move |resolved| match resolved {
            Some(resolved) => match converter.decode(resolved.value()) {
                Ok(value) => on_update(value),
                Err(err) => on_error(err),
            },
            None => on_update(default.clone()),
        });
    }

    fn outcome(&self) -> Outcome<T> {
        let entry = self.registry.entry(&self.key);

        if let Some(generation) = entry.generation {
            let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = cached.as_ref().filter(|c| c.generation == generation) {
                return cached.outcome.clone();
            }
        }

        let outcome = match entry.resolved {
            None => Outcome::NotFound,
            Some(resolved) => match self.converter.decode(resolved.value()) {
                Ok(value) => Outcome::Found(value),
                Err(err) => {
                    self.registry.observe(
                        &ErrorContext::Conversion {
                            key: self.key.clone(),
                        },
                        &err,
                    );
                    Outcome::Failed(err)
                }
            },
        };

        if let Some(generation) = entry.generation {
            let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
            let newer = cached
                .as_ref()
                .map(|c| c.generation < generation)
                .unwrap_or(true);
            if newer {
                *cached = Some(CachedValue {
                    generation,
                    outcome: outcome.clone(),
                });
            }
        }
        outcome
    }
}
