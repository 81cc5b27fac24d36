//! 数据源抽象
//!
//! 提供统一的属性来源接口，支持环境变量、系统属性、文件、内存、远程配置等多种来源

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PropsError;

/// 数据源在某一时刻定义的全部 key/value
pub type Snapshot = Arc<HashMap<String, String>>;

/// 空快照
pub fn empty_snapshot() -> Snapshot {
    Arc::new(HashMap::new())
}

/// 属性来源抽象
///
/// 所有数据源都实现此 trait，Registry 按优先级依次查询。
///
/// # 约定
/// - `lookup` 对同一份快照是幂等的
/// - 可变数据源的 `snapshot` 会重新读取来源并提交为当前状态；
///   读取失败时返回错误，并保留之前的状态
/// - 不可变数据源的 `snapshot` 总是返回构造时的数据
pub trait Source: Send + Sync {
    /// 数据源名称，在同一个 Registry 中唯一
    fn name(&self) -> &str;

    /// 是否支持重新加载
    fn is_mutable(&self) -> bool;

    /// 查询单个 key，`Ok(None)` 表示该来源未定义此 key
    fn lookup(&self, key: &str) -> Result<Option<String>, PropsError>;

    /// 当前定义的全部 key/value，供 refresh 比对变化
    fn snapshot(&self) -> Result<Snapshot, PropsError>;
}

/// 将结构化的配置展开成扁平的 key/value
///
/// - 嵌套对象以 `.` 连接：`{"db": {"port": 3306}}` -> `db.port=3306`
/// - 标量数组以 `,` 连接：`{"hosts": ["a", "b"]}` -> `hosts=a,b`
/// - 对象数组按下标展开：`servers.0.host`
/// - null 被忽略
pub(crate) fn flatten_json(value: &JsonValue) -> HashMap<String, String> {
    let mut out = HashMap::new();
    flatten_into(String::new(), value, &mut out);
    out
}

fn flatten_into(prefix: String, value: &JsonValue, out: &mut HashMap<String, String>) {
    match value {
        JsonValue::Null => {}
        JsonValue::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten_into(key, v, out);
            }
        }
        JsonValue::Array(items) if items.iter().all(is_scalar) => {
            if !prefix.is_empty() {
                let joined = items
                    .iter()
                    .filter_map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                out.insert(prefix, joined);
            }
        }
        JsonValue::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                let key = if prefix.is_empty() {
                    i.to_string()
                } else {
                    format!("{}.{}", prefix, i)
                };
                flatten_into(key, v, out);
            }
        }
        scalar => {
            if let Some(s) = scalar_to_string(scalar) {
                if !prefix.is_empty() {
                    out.insert(prefix, s);
                }
            }
        }
    }
}

fn is_scalar(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Object(_) | JsonValue::Array(_))
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
