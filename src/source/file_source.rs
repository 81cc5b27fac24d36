//! 文件数据源
//!
//! 支持 `key=value` 属性文件，以及 JSON/YAML/TOML 结构化文件（展开为 `a.b.c` 形式的 key）。
//! 构造时解析一次，refresh 时重新解析；解析失败时保留上一次成功的快照。

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::core::{flatten_json, Snapshot, Source};
use crate::error::PropsError;
use crate::{impl_box_from, impl_try_from};

/// 文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// 根据扩展名选择，未知扩展名按属性文件处理
    #[default]
    Auto,
    Properties,
    Json,
    Yaml,
    Toml,
}

impl FileFormat {
    fn detect(path: &Path) -> FileFormat {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => FileFormat::Json,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Properties,
        }
    }
}

/// 文件数据源配置
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct FileSourceConfig {
    /// 文件路径
    pub path: String,

    /// 数据源名称，默认使用文件路径
    pub name: Option<String>,

    /// 文件格式
    pub format: FileFormat,

    /// 是否参与 refresh
    #[default = true]
    pub mutable: bool,

    /// 文件不存在时视为空数据源，而不是报错
    pub optional: bool,
}

/// 文件数据源
///
/// # 示例
/// ```no_run
/// use layered_props::source::{FileSource, FileSourceConfig, Source};
///
/// let source = FileSource::new(FileSourceConfig {
///     path: "/etc/app/app.properties".to_string(),
///     ..Default::default()
/// }).unwrap();
///
/// let port = source.lookup("server.port").unwrap();
/// ```
pub struct FileSource {
    name: String,
    path: PathBuf,
    format: FileFormat,
    mutable: bool,
    optional: bool,
    data: ArcSwap<HashMap<String, String>>,
    reload_lock: Mutex<()>,
}

impl FileSource {
    /// 创建文件数据源并立即解析文件
    ///
    /// # 错误
    /// - 文件格式错误返回 `PropsError::Parse`，包含路径和行号
    /// - 文件不存在且非 optional 时返回 `PropsError::Io`
    pub fn new(config: FileSourceConfig) -> Result<Self, PropsError> {
        if config.path.is_empty() {
            return Err(PropsError::Config("file source path is empty".to_string()));
        }

        let path = PathBuf::from(&config.path);
        let format = match config.format {
            FileFormat::Auto => FileFormat::detect(&path),
            explicit => explicit,
        };
        let data = load_file(&path, format, config.optional)?;
        log::debug!(
            "file source {} loaded {} keys as {:?}",
            config.path,
            data.len(),
            format
        );

        Ok(Self {
            name: config.name.unwrap_or_else(|| config.path.clone()),
            path,
            format,
            mutable: config.mutable,
            optional: config.optional,
            data: ArcSwap::from_pointee(data),
            reload_lock: Mutex::new(()),
        })
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 实际使用的文件格式
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// 重新解析文件，成功后原子替换当前数据
    fn reload(&self) -> Result<Snapshot, PropsError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let data = Arc::new(load_file(&self.path, self.format, self.optional)?);
        self.data.store(data.clone());
        Ok(data)
    }
}

impl_try_from!(FileSourceConfig => FileSource, error: PropsError);
impl_box_from!(FileSource => dyn Source);

impl Source for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_mutable(&self) -> bool {
        self.mutable
    }

    fn lookup(&self, key: &str) -> Result<Option<String>, PropsError> {
        Ok(self.data.load().get(key).cloned())
    }

    fn snapshot(&self) -> Result<Snapshot, PropsError> {
        if !self.mutable {
            return Ok(self.data.load_full());
        }
        self.reload()
    }
}

fn load_file(
    path: &Path,
    format: FileFormat,
    optional: bool,
) -> Result<HashMap<String, String>, PropsError> {
    let display = path.display().to_string();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if optional && e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(PropsError::Io {
                path: display,
                reason: e.to_string(),
            })
        }
    };
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    match format {
        FileFormat::Auto | FileFormat::Properties => parse_properties(content, &display),
        FileFormat::Json => serde_json::from_str::<JsonValue>(content)
            .map(|v| flatten_json(&v))
            .map_err(|e| PropsError::Parse {
                path: display,
                line: e.line(),
                reason: e.to_string(),
            }),
        FileFormat::Yaml => serde_yaml::from_str::<JsonValue>(content)
            .map(|v| flatten_json(&v))
            .map_err(|e| PropsError::Parse {
                path: display,
                line: e.location().map(|l| l.line()).unwrap_or(0),
                reason: e.to_string(),
            }),
        FileFormat::Toml => toml::from_str::<JsonValue>(content)
            .map(|v| flatten_json(&v))
            .map_err(|e| PropsError::Parse {
                path: display,
                line: e
                    .span()
                    .map(|span| line_of_offset(content, span.start))
                    .unwrap_or(0),
                reason: e.message().to_string(),
            }),
    }
}

fn line_of_offset(content: &str, offset: usize) -> usize {
    content
        .get(..offset)
        .map(|prefix| prefix.matches('\n').count() + 1)
        .unwrap_or(0)
}

/// 解析 `key=value` 属性文件
///
/// - 空行和以 `#` 开头的行被忽略
/// - key 去掉首尾空白，value 为第一个 `=` 之后的原样文本
/// - 同一个 key 出现多次时以最后一次为准
pub fn parse_properties(content: &str, path: &str) -> Result<HashMap<String, String>, PropsError> {
    let mut out = HashMap::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| PropsError::Parse {
            path: path.to_string(),
            line: idx + 1,
            reason: "expected key=value".to_string(),
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(PropsError::Parse {
                path: path.to_string(),
                line: idx + 1,
                reason: "empty key".to_string(),
            });
        }

        out.insert(key.to_string(), value.to_string());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file_source(path: &Path) -> Result<FileSource, PropsError> {
        FileSource::new(FileSourceConfig {
            path: path.to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_parse_properties() -> Result<(), PropsError> {
        let data = parse_properties(
            "# comment\n\n  server.port = 8080\nurl=jdbc:x?a=b\nempty=\n  # indented comment\n",
            "app.properties",
        )?;
        assert_eq!(data["server.port"], " 8080");
        assert_eq!(data["url"], "jdbc:x?a=b");
        assert_eq!(data["empty"], "");
        assert_eq!(data.len(), 3);
        Ok(())
    }

    #[test]
    fn test_parse_properties_errors() {
        let err = parse_properties("a=1\nbroken\n", "app.properties").unwrap_err();
        assert_eq!(
            err,
            PropsError::Parse {
                path: "app.properties".to_string(),
                line: 2,
                reason: "expected key=value".to_string(),
            }
        );

        let err = parse_properties(" = 1", "x").unwrap_err();
        assert!(matches!(err, PropsError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_file_source_load_properties() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("app.properties");
        fs::write(&path, "port=8080\nhost=localhost\n")?;

        let source = file_source(&path)?;
        assert_eq!(source.format(), FileFormat::Properties);
        assert_eq!(source.name(), path.to_string_lossy());
        assert_eq!(source.lookup("port")?, Some("8080".to_string()));
        assert_eq!(source.lookup("missing")?, None);
        Ok(())
    }

    #[test]
    fn test_file_source_load_structured() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;

        let json = temp_dir.path().join("app.json");
        fs::write(&json, r#"{"db": {"host": "localhost", "port": 3306}}"#)?;
        let yaml = temp_dir.path().join("app.yaml");
        fs::write(&yaml, "db:\n  host: localhost\n  port: 3306\n")?;
        let toml = temp_dir.path().join("app.toml");
        fs::write(&toml, "[db]\nhost = \"localhost\"\nport = 3306\n")?;

        for path in [json, yaml, toml] {
            let source = file_source(&path)?;
            assert_eq!(source.lookup("db.host")?, Some("localhost".to_string()));
            assert_eq!(source.lookup("db.port")?, Some("3306".to_string()));
        }
        Ok(())
    }

    #[test]
    fn test_file_source_parse_error_location() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("bad.properties");
        fs::write(&path, "a=1\nb=2\nnot a pair\n")?;

        match file_source(&path) {
            Err(PropsError::Parse { path: p, line, .. }) => {
                assert_eq!(line, 3);
                assert!(p.ends_with("bad.properties"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("malformed file should not load"),
        }

        let json = temp_dir.path().join("bad.json");
        fs::write(&json, "{\n  \"a\": 1,\n  \"b\": \n}")?;
        assert!(matches!(
            file_source(&json),
            Err(PropsError::Parse { line: 4, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_file_source_missing() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("missing.properties");

        assert!(matches!(file_source(&path), Err(PropsError::Io { .. })));

        let source = FileSource::new(FileSourceConfig {
            path: path.to_string_lossy().to_string(),
            optional: true,
            ..Default::default()
        })?;
        assert!(source.snapshot()?.is_empty());

        fs::write(&path, "late=1\n")?;
        assert_eq!(source.snapshot()?.get("late").map(String::as_str), Some("1"));
        assert_eq!(source.lookup("late")?, Some("1".to_string()));
        Ok(())
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("app.properties");
        fs::write(&path, "port=5\n")?;

        let source = file_source(&path)?;
        fs::write(&path, "port=6\n???\n")?;

        assert!(matches!(
            source.snapshot(),
            Err(PropsError::Parse { line: 2, .. })
        ));
        assert_eq!(source.lookup("port")?, Some("5".to_string()));

        fs::write(&path, "port=6\n")?;
        assert_eq!(source.snapshot()?.get("port").map(String::as_str), Some("6"));
        assert_eq!(source.lookup("port")?, Some("6".to_string()));
        Ok(())
    }

    #[test]
    fn test_immutable_file_is_not_reread() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("static.properties");
        fs::write(&path, "k=v1\n")?;

        let source = FileSource::new(FileSourceConfig {
            path: path.to_string_lossy().to_string(),
            name: Some("static".to_string()),
            mutable: false,
            ..Default::default()
        })?;
        fs::write(&path, "k=v2\n")?;

        assert_eq!(source.name(), "static");
        assert_eq!(source.snapshot()?.get("k").map(String::as_str), Some("v1"));
        Ok(())
    }
}
