//! 远程数据源
//!
//! 通过 HTTP GET 拉取一个 JSON 对象作为属性集合，结构化的值会被展开成 `a.b.c` 形式的 key。
//! 请求有超时限制，超时或不可达时返回 `SourceUnavailable`，由 Registry 降级为未找到。

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::core::{flatten_json, Snapshot, Source};
use crate::cfg::serde_duration::{serde_as, HumanDur};
use crate::error::PropsError;
use crate::{impl_box_from, impl_try_from};

/// 远程数据源配置
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct RemoteSourceConfig {
    /// 配置地址，如 "http://config-server:8080/configs/my-app"
    pub url: String,

    /// 数据源名称
    #[default = "remote"]
    pub name: String,

    /// 单次请求超时
    #[default(Duration::from_secs(5))]
    #[serde_as(as = "HumanDur")]
    pub timeout: Duration,

    /// 属性对象在响应中的位置（JSON Pointer），如 Apollo 的 "/configurations"
    pub pointer: Option<String>,

    /// 附加请求头
    pub headers: HashMap<String, String>,
}

/// 远程数据源
///
/// 第一次 `lookup` 时拉取，之后使用最近一次拉取的结果；`snapshot` 每次都会重新拉取。
///
/// # 示例
/// ```no_run
/// use layered_props::source::{RemoteSource, RemoteSourceConfig, Source};
///
/// let source = RemoteSource::new(RemoteSourceConfig {
///     url: "http://localhost:8080/configs/my-app".to_string(),
///     ..Default::default()
/// }).unwrap();
///
/// let value = source.lookup("database.host");
/// ```
pub struct RemoteSource {
    name: String,
    url: String,
    pointer: Option<String>,
    headers: HashMap<String, String>,
    client: reqwest::blocking::Client,
    data: ArcSwapOption<HashMap<String, String>>,
    fetch_lock: Mutex<()>,
}

impl RemoteSource {
    pub fn new(config: RemoteSourceConfig) -> Result<Self, PropsError> {
        if config.url.is_empty() {
            return Err(PropsError::Config("remote source url is empty".to_string()));
        }
        if config.timeout.is_zero() {
            return Err(PropsError::Config(
                "remote source timeout must be positive".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| PropsError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            name: config.name,
            url: config.url,
            pointer: config.pointer,
            headers: config.headers,
            client,
            data: ArcSwapOption::empty(),
            fetch_lock: Mutex::new(()),
        })
    }

    /// 拉取远程属性
    fn fetch(&self) -> Result<Snapshot, PropsError> {
        let mut request = self.client.get(&self.url);
        for (k, v) in &self.headers {
            request = request.header(k, v);
        }

        let resp = request
            .send()
            .map_err(|e| PropsError::unavailable(&self.name, e))?;

        if !resp.status().is_success() {
            return Err(PropsError::unavailable(
                &self.name,
                format!("unexpected status {}", resp.status()),
            ));
        }

        let body: JsonValue = resp.json().map_err(|e| PropsError::Parse {
            path: self.url.clone(),
            line: 0,
            reason: e.to_string(),
        })?;

        let object = match self.pointer.as_deref() {
            Some(pointer) => body.pointer(pointer).ok_or_else(|| PropsError::Parse {
                path: self.url.clone(),
                line: 0,
                reason: format!("pointer {} not found in response", pointer),
            })?,
            None => &body,
        };
        if !object.is_object() {
            return Err(PropsError::Parse {
                path: self.url.clone(),
                line: 0,
                reason: "expected a JSON object".to_string(),
            });
        }

        let data = Arc::new(flatten_json(object));
        log::debug!("remote source {} fetched {} keys", self.name, data.len());
        Ok(data)
    }

    /// 拉取并提交为当前数据
    fn fetch_and_store(&self) -> Result<Snapshot, PropsError> {
        let data = self.fetch()?;
        self.data.store(Some(data.clone()));
        Ok(data)
    }
}

impl_try_from!(RemoteSourceConfig => RemoteSource, error: PropsError);
impl_box_from!(RemoteSource => dyn Source);

impl Source for RemoteSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutable(&self) -> bool {
        true
    }

    fn lookup(&self, key: &str) -> Result<Option<String>, PropsError> {
        if let Some(data) = self.data.load_full() {
            return Ok(data.get(key).cloned());
        }

        let _guard = self.fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // 等锁期间可能已被其他线程拉取
        let data = match self.data.load_full() {
            Some(data) => data,
            None => self.fetch_and_store()?,
        };
        Ok(data.get(key).cloned())
    }

    fn snapshot(&self) -> Result<Snapshot, PropsError> {
        let _guard = self.fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.fetch_and_store()
    }
}
