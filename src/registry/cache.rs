//! 解析结果缓存
//!
//! 读多写少：命中只需读锁；未命中时在锁外查询数据源，再用写锁回填。
//! 每次失效都会推进 epoch，回填前检查 epoch，保证失效之后不会写回过期值。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// 解析结果：原始值以及提供该值的数据源
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedValue {
    value: String,
    source_name: String,
}

impl ResolvedValue {
    pub fn new(value: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source_name: source_name.into(),
        }
    }

    /// 原始字符串值
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 提供该值的数据源名称
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn into_value(self) -> String {
        self.value
    }
}

struct CacheEntry {
    resolved: Option<ResolvedValue>,
    generation: u64,
}

/// 一次缓存读取的结果；`generation` 为 None 表示结果没有进入缓存
pub(crate) struct CacheRead {
    pub resolved: Option<ResolvedValue>,
    pub generation: Option<u64>,
}

pub(crate) struct Cache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    epoch: AtomicU64,
    next_generation: AtomicU64,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn get(&self, key: &str) -> Option<CacheRead> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|entry| CacheRead {
                resolved: entry.resolved.clone(),
                generation: Some(entry.generation),
            })
    }

    /// 回填解析结果
    ///
    /// `epoch` 为开始查询数据源之前读到的值；期间发生过失效则不回填。
    /// 其他线程抢先回填时返回已有的条目。
    pub fn fill(&self, key: &str, resolved: Option<ResolvedValue>, epoch: u64) -> CacheRead {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(key) {
            return CacheRead {
                resolved: entry.resolved.clone(),
                generation: Some(entry.generation),
            };
        }
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return CacheRead {
                resolved,
                generation: None,
            };
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        entries.insert(
            key.to_string(),
            CacheEntry {
                resolved: resolved.clone(),
                generation,
            },
        );
        CacheRead {
            resolved,
            generation: Some(generation),
        }
    }

    /// 清除单个 key，或在 key 为 None 时清空缓存
    pub fn invalidate(&self, key: Option<&str>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    /// 按新的解析结果清除过期条目，返回被清除的 key
    ///
    /// 值相同但来源不同的条目同样视为过期。
    pub fn evict_changed(&self, updates: &[(String, Option<ResolvedValue>)]) -> Vec<String> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let mut evicted = Vec::new();
        for (key, resolved) in updates {
            let stale = entries
                .get(key)
                .map(|entry| entry.resolved != *resolved)
                .unwrap_or(false);
            if stale {
                entries.remove(key);
                evicted.push(key.clone());
            }
        }
        evicted
    }

    /// 用 `resolve` 重新核对所有条目，清除与之不一致的条目，返回被清除的 key（已排序）
    ///
    /// 缓存可能是从数据源的实时查询回填的，其值不一定出现在任何快照中，
    /// 因此 refresh 需要核对全部条目而不只是快照间有差异的 key。
    pub fn evict_stale<F>(&self, resolve: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<ResolvedValue>,
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let mut evicted = Vec::new();
        entries.retain(|key, entry| {
            let keep = entry.resolved == resolve(key.as_str());
            if !keep {
                evicted.push(key.clone());
            }
            keep
        });
        evicted.sort();
        evicted
    }
}
