//! 分层属性注册中心
//!
//! 按优先级组合多个数据源，缓存解析结果，并在 refresh 时精确地失效变化的 key。

use arc_swap::ArcSwap;
use dashmap::DashMap;
use garde::Validate;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::cache::{Cache, CacheRead, ResolvedValue};
use super::config::RegistryConfig;
use super::layer::{diff_keys, Layer, SourceInfo, View};
use crate::cfg::create_trait_from_type_options;
use crate::converter::Converter;
use crate::error::PropsError;
use crate::observer::{ErrorContext, ErrorObserver, LogObserver};
use crate::prop::PropertyHandle;
use crate::source::{empty_snapshot, register_sources, Snapshot, Source};

/// 解析结果变化时的回调，参数为新的解析结果（None 表示 key 已不存在）
pub type Listener = Arc<dyn Fn(Option<&ResolvedValue>) + Send + Sync>;

static BUILTIN_SOURCES: Lazy<Result<(), String>> =
    Lazy::new(|| register_sources().map_err(|e| format!("{:#}", e)));

/// 一次 refresh 的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// 解析结果（值或来源）发生变化的 key
    pub changed_keys: Vec<String>,
    /// 被清除的缓存条目
    pub invalidated_keys: Vec<String>,
    /// 成功刷新的数据源
    pub refreshed_sources: Vec<String>,
    /// 刷新失败、保留旧快照的数据源
    pub failed_sources: Vec<String>,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.changed_keys.is_empty() && self.invalidated_keys.is_empty()
    }
}

/// 分层属性注册中心
///
/// - priority 数值越小越优先，相同时先注册的优先
/// - 解析结果（包括未找到）会被缓存，直到 `invalidate` 或 `refresh` 发现其变化
/// - 读路径不会阻塞在 refresh 上：数据源列表通过 `ArcSwap` 无锁读取
///
/// # 示例
/// ```
/// use std::sync::Arc;
/// use layered_props::registry::Registry;
/// use layered_props::source::MapSource;
///
/// let registry = Registry::default();
/// registry.register(Arc::new(MapSource::with_values("defaults", [("PORT", "8080")])), 10).unwrap();
/// registry.register(Arc::new(MapSource::with_values("overrides", [("PORT", "9090")])), 0).unwrap();
///
/// let resolved = registry.resolve("PORT").unwrap();
/// assert_eq!(resolved.value(), "9090");
/// assert_eq!(resolved.source_name(), "overrides");
/// ```
pub struct Registry {
    layers: ArcSwap<Vec<Arc<Layer>>>,
    cache: Cache,
    listeners: DashMap<String, Vec<Listener>>,
    observer: Arc<dyn ErrorObserver>,
    // register 与 refresh 互斥
    write_lock: Mutex<()>,
    // 奇数表示正在 register 或 refresh
    change_seq: AtomicU64,
    next_seq: AtomicU64,
}

struct ChangeGuard<'a>(&'a AtomicU64);

impl<'a> ChangeGuard<'a> {
    fn begin(seq: &'a AtomicU64) -> Self {
        seq.fetch_add(1, Ordering::SeqCst);
        Self(seq)
    }
}

impl Drop for ChangeGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::empty(Arc::new(LogObserver))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.sources())
            .field("cached_keys", &self.cache.len())
            .field("epoch", &self.cache.epoch())
            .finish()
    }
}

impl Registry {
    /// 按配置创建 Registry，错误上报到日志
    pub fn new(config: RegistryConfig) -> Result<Self, PropsError> {
        Self::with_observer(config, Arc::new(LogObserver))
    }

    /// 按配置创建 Registry，并指定错误观察者
    pub fn with_observer(
        config: RegistryConfig,
        observer: Arc<dyn ErrorObserver>,
    ) -> Result<Self, PropsError> {
        if let Err(errors) = config.validate() {
            return Err(PropsError::Config(format!(
                "configuration validation failed: {}",
                errors
            )));
        }
        BUILTIN_SOURCES
            .as_ref()
            .map_err(|e| PropsError::Config(e.clone()))?;

        let registry = Self::empty(observer);
        for layer in &config.sources {
            let source: Box<dyn Source> = create_trait_from_type_options(&layer.source)?;
            registry.register(Arc::from(source), layer.priority)?;
        }
        Ok(registry)
    }

    /// 没有任何数据源的 Registry
    pub fn empty(observer: Arc<dyn ErrorObserver>) -> Self {
        Self {
            layers: ArcSwap::from_pointee(Vec::new()),
            cache: Cache::new(),
            listeners: DashMap::new(),
            observer,
            write_lock: Mutex::new(()),
            change_seq: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    /// 注册数据源
    ///
    /// 名称重复时返回 `DuplicateSource`。新数据源定义的 key 中，
    /// 解析结果被它改变的缓存条目会被清除。
    pub fn register(&self, source: Arc<dyn Source>, priority: i32) -> Result<(), PropsError> {
        let name = source.name().to_string();

        let notifications = {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let old_layers = self.layers.load_full();

            if old_layers.iter().any(|layer| layer.name() == name) {
                let err = PropsError::DuplicateSource(name.clone());
                self.observe(
                    &ErrorContext::Registration {
                        source_name: name,
                    },
                    &err,
                );
                return Err(err);
            }
            let _change = ChangeGuard::begin(&self.change_seq);

            let (baseline, complete) = match source.snapshot() {
                Ok(snapshot) => (snapshot, true),
                Err(err) => {
                    self.observe(
                        &ErrorContext::Registration {
                            source_name: name.clone(),
                        },
                        &err,
                    );
                    (empty_snapshot(), false)
                }
            };

            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            let layer = Arc::new(Layer::new(source, priority, seq, baseline.clone()));

            // priority 升序，相同 priority 按注册顺序
            let mut new_layers = old_layers.as_ref().clone();
            let index = new_layers.partition_point(|l| l.priority <= priority);
            new_layers.insert(index, layer);
            let new_layers = Arc::new(new_layers);
            self.layers.store(new_layers.clone());

            let old_view = View::current(&old_layers);
            let new_view = View::current(&new_layers);
            let keys: BTreeSet<String> = baseline.keys().cloned().collect();
            let changed = self.apply_changes(keys, &old_view, &new_view);

            if !complete {
                // 无法得知该数据源定义了哪些 key
                self.cache.invalidate(None);
            }

            log::info!(
                "registered source {} with priority {}, {} keys",
                name,
                priority,
                baseline.len()
            );
            changed
        };

        self.notify(notifications);
        Ok(())
    }

    /// 已注册的数据源，按查询顺序排列
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.layers.load().iter().map(|layer| layer.info()).collect()
    }

    /// 解析 key，返回第一个定义它的数据源中的值
    ///
    /// 空 key 或所有数据源都未定义时返回 None。
    pub fn resolve(&self, key: &str) -> Option<ResolvedValue> {
        self.entry(key).resolved
    }

    /// 解析必需的 key
    pub fn resolve_required(&self, key: &str) -> Result<ResolvedValue, PropsError> {
        if key.is_empty() {
            return Err(PropsError::InvalidKey(key.to_string()));
        }
        self.resolve(key)
            .ok_or_else(|| PropsError::MissingProperty(key.to_string()))
    }

    /// 解析 key 并转换为目标类型
    pub fn get<T>(&self, key: &str, converter: &dyn Converter<T>) -> Result<Option<T>, PropsError> {
        self.resolve(key)
            .map(|resolved| converter.decode(resolved.value()))
            .transpose()
    }

    /// 解析 key 的原始字符串值
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.resolve(key).map(ResolvedValue::into_value)
    }

    /// 将 key 绑定为类型化的属性句柄
    pub fn bind<T, C>(
        self: &Arc<Self>,
        key: &str,
        converter: C,
        default: T,
    ) -> Result<PropertyHandle<T>, PropsError>
    where
        T: Clone + Send + Sync + 'static,
        C: Converter<T> + 'static,
    {
        PropertyHandle::new(self.clone(), key, Arc::new(converter), default)
    }

    /// 订阅 key 的解析结果变化
    ///
    /// 回调在执行 refresh 或 register 的线程上同步调用。
    pub fn subscribe<F>(&self, key: &str, listener: F)
    where
        F: Fn(Option<&ResolvedValue>) + Send + Sync + 'static,
    {
        self.listeners
            .entry(key.to_string())
            .or_default()
            .push(Arc::new(listener));
    }

    /// 清除单个 key 的缓存，或在 key 为 None 时清空缓存
    pub fn invalidate(&self, key: Option<&str>) {
        self.cache.invalidate(key);
    }

    /// 重新读取所有可变数据源，清除与新快照不一致的缓存条目
    ///
    /// 数据源刷新失败时保留其旧快照，错误交给观察者，其他数据源照常刷新。
    /// `changed_keys` 为新旧快照间解析结果不同的 key；`invalidated_keys` 为被清除的缓存条目，
    /// 包括在两次 refresh 之间从实时查询回填、与新快照不一致的条目。
    pub fn refresh(&self) -> RefreshReport {
        let (report, notifications) = {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let _change = ChangeGuard::begin(&self.change_seq);
            let layers = self.layers.load_full();

            let mut report = RefreshReport::default();
            let mut snapshots: HashMap<u64, Snapshot> = HashMap::new();
            let mut keys = BTreeSet::new();

            for layer in layers.iter().filter(|layer| layer.source.is_mutable()) {
                match layer.source.snapshot() {
                    Ok(snapshot) => {
                        keys.extend(diff_keys(&layer.baseline(), &snapshot));
                        snapshots.insert(layer.seq, snapshot);
                        report.refreshed_sources.push(layer.name().to_string());
                    }
                    Err(err) => {
                        self.observe(
                            &ErrorContext::Refresh {
                                source_name: layer.name().to_string(),
                            },
                            &err,
                        );
                        report.failed_sources.push(layer.name().to_string());
                    }
                }
            }

            let old_view = View::current(&layers);
            let new_view = View::with_overrides(&layers, &snapshots);
            for layer in layers.iter() {
                if let Some(snapshot) = snapshots.remove(&layer.seq) {
                    layer.set_baseline(snapshot);
                }
            }

            let changed = changed_between(keys, &old_view, &new_view);
            // 缓存可能来自数据源的实时查询，逐条与新视图核对
            report.invalidated_keys = self.cache.evict_stale(|key| new_view.resolve(key));
            report.changed_keys = changed.iter().map(|(key, _)| key.clone()).collect();
            (report, changed)
        };

        if !report.is_empty() || !report.failed_sources.is_empty() {
            log::debug!(
                "refresh: {} changed, {} invalidated, {} failed",
                report.changed_keys.len(),
                report.invalidated_keys.len(),
                report.failed_sources.len()
            );
        }

        self.notify(notifications);
        report
    }

    /// 当前缓存的 epoch，每次失效都会增加
    pub fn epoch(&self) -> u64 {
        self.cache.epoch()
    }

    /// register 与 refresh 的序号，奇数表示正在进行
    pub(crate) fn change_seq(&self) -> u64 {
        self.change_seq.load(Ordering::SeqCst)
    }

    /// 已缓存的 key 数量
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn observe(&self, context: &ErrorContext, error: &PropsError) {
        self.observer.observe(context, error);
    }

    /// 带缓存代数的解析；代数为 None 表示结果未被缓存（降级或与失效并发）
    pub(crate) fn entry(&self, key: &str) -> CacheRead {
        if key.is_empty() {
            return CacheRead {
                resolved: None,
                generation: None,
            };
        }
        if let Some(hit) = self.cache.get(key) {
            return hit;
        }

        let epoch = self.cache.epoch();
        let (resolved, degraded) = self.resolve_uncached(key);
        if degraded {
            return CacheRead {
                resolved,
                generation: None,
            };
        }
        self.cache.fill(key, resolved, epoch)
    }

    /// 依次查询数据源；查询失败的数据源按未找到处理，并标记结果为降级
    fn resolve_uncached(&self, key: &str) -> (Option<ResolvedValue>, bool) {
        let layers = self.layers.load();
        let mut degraded = false;
        for layer in layers.iter() {
            match layer.source.lookup(key) {
                Ok(Some(value)) => return (Some(ResolvedValue::new(value, layer.name())), degraded),
                Ok(None) => {}
                Err(err) => {
                    degraded = true;
                    self.observe(
                        &ErrorContext::Lookup {
                            source_name: layer.name().to_string(),
                            key: key.to_string(),
                        },
                        &err,
                    );
                }
            }
        }
        (None, degraded)
    }

    /// 对比新旧视图，清除 `keys` 中过期的缓存，返回解析结果变化的 key 及其新值
    fn apply_changes(
        &self,
        keys: BTreeSet<String>,
        old_view: &View,
        new_view: &View,
    ) -> Vec<(String, Option<ResolvedValue>)> {
        if keys.is_empty() {
            return Vec::new();
        }

        let updates: Vec<(String, Option<ResolvedValue>)> = keys
            .into_iter()
            .map(|key| {
                let resolved = new_view.resolve(&key);
                (key, resolved)
            })
            .collect();
        self.cache.evict_changed(&updates);

        updates
            .into_iter()
            .filter(|(key, resolved)| old_view.resolve(key) != *resolved)
            .collect()
    }

    fn notify(&self, changes: Vec<(String, Option<ResolvedValue>)>) {
        for (key, resolved) in changes {
            // 复制出回调列表，避免回调中订阅时死锁
            let listeners = match self.listeners.get(&key) {
                Some(listeners) => listeners.value().clone(),
                None => continue,
            };
            for listener in listeners {
                listener(resolved.as_ref());
            }
        }
    }
}

/// 新旧视图中解析结果不同的 key 及其新值
fn changed_between(
    keys: BTreeSet<String>,
    old_view: &View,
    new_view: &View,
) -> Vec<(String, Option<ResolvedValue>)> {
    keys.into_iter()
        .filter_map(|key| {
            let resolved = new_view.resolve(&key);
            if old_view.resolve(&key) == resolved {
                None
            } else {
                Some((key, resolved))
            }
        })
        .collect()
}
