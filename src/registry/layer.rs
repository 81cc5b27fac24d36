//! 数据源层
//!
//! Registry 中的每个数据源都是一层，记录优先级、注册顺序以及最近一次成功的快照。
//! refresh 时用新旧快照比对出变化的 key。

use arc_swap::ArcSwap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::cache::ResolvedValue;
use crate::source::{Snapshot, Source};

/// 已注册数据源的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub priority: i32,
    pub mutable: bool,
}

pub(crate) struct Layer {
    pub source: Arc<dyn Source>,
    pub priority: i32,
    pub seq: u64,
    baseline: ArcSwap<HashMap<String, String>>,
}

impl Layer {
    pub fn new(source: Arc<dyn Source>, priority: i32, seq: u64, baseline: Snapshot) -> Self {
        Self {
            source,
            priority,
            seq,
            baseline: ArcSwap::new(baseline),
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn baseline(&self) -> Snapshot {
        self.baseline.load_full()
    }

    pub fn set_baseline(&self, snapshot: Snapshot) {
        self.baseline.store(snapshot);
    }

    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name().to_string(),
            priority: self.priority,
            mutable: self.source.is_mutable(),
        }
    }
}

/// 新增、删除或修改过的 key
pub(crate) fn diff_keys(old: &HashMap<String, String>, new: &HashMap<String, String>) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    for (key, value) in new {
        if old.get(key) != Some(value) {
            changed.insert(key.clone());
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            changed.insert(key.clone());
        }
    }
    changed
}

/// 按层顺序固定下来的一组快照，用于在不访问数据源的情况下解析 key
pub(crate) struct View {
    layers: Vec<(String, Snapshot)>,
}

impl View {
    /// 各层当前的快照
    pub fn current(layers: &[Arc<Layer>]) -> Self {
        Self::with_overrides(layers, &HashMap::new())
    }

    /// 各层当前的快照，`overrides` 中给出的层使用新快照
    pub fn with_overrides(layers: &[Arc<Layer>], overrides: &HashMap<u64, Snapshot>) -> Self {
        let layers = layers
            .iter()
            .map(|layer| {
                let snapshot = overrides
                    .get(&layer.seq)
                    .cloned()
                    .unwrap_or_else(|| layer.baseline());
                (layer.name().to_string(), snapshot)
            })
            .collect();
        Self { layers }
    }

    pub fn resolve(&self, key: &str) -> Option<ResolvedValue> {
        self.layers.iter().find_map(|(name, snapshot)| {
            snapshot
                .get(key)
                .map(|value| ResolvedValue::new(value.clone(), name.clone()))
        })
    }
}
