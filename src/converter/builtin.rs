//! 内置转换器

use std::fmt::Display;
use std::marker::PhantomData;
use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::core::Converter;
use crate::cfg::serde_duration::{format_duration, parse_duration};
use crate::error::PropsError;

/// 字符串（恒等转换）
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn decode(&self, raw: &str) -> Result<String, PropsError> {
        Ok(raw.to_string())
    }

    fn encode(&self, value: &String) -> String {
        value.clone()
    }

    fn type_name(&self) -> &'static str {
        "String"
    }
}

/// 十进制整数，可带 `+`/`-` 符号
///
/// 溢出、空串、空白字符、非数字字符都会转换失败。
#[derive(Debug, Clone, Copy)]
pub struct IntConverter<N> {
    _marker: PhantomData<fn() -> N>,
}

impl<N> IntConverter<N> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<N> Default for IntConverter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Converter<N> for IntConverter<N>
where
    N: FromStr<Err = ParseIntError> + Display,
{
    fn decode(&self, raw: &str) -> Result<N, PropsError> {
        raw.parse::<N>()
            .map_err(|e| PropsError::conversion(raw, self.type_name(), e))
    }

    fn encode(&self, value: &N) -> String {
        value.to_string()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<N>()
    }
}

/// 浮点数
#[derive(Debug, Clone, Copy)]
pub struct FloatConverter<F> {
    _marker: PhantomData<fn() -> F>,
}

impl<F> FloatConverter<F> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<F> Default for FloatConverter<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Converter<F> for FloatConverter<F>
where
    F: FromStr<Err = ParseFloatError> + Display,
{
    fn decode(&self, raw: &str) -> Result<F, PropsError> {
        raw.parse::<F>()
            .map_err(|e| PropsError::conversion(raw, self.type_name(), e))
    }

    fn encode(&self, value: &F) -> String {
        value.to_string()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<F>()
    }
}

/// 布尔值：忽略大小写的 "true"/"false"，以及 "1"/"0"
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolConverter;

impl Converter<bool> for BoolConverter {
    fn decode(&self, raw: &str) -> Result<bool, PropsError> {
        if raw.eq_ignore_ascii_case("true") || raw == "1" {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
            Ok(false)
        } else {
            Err(PropsError::conversion(
                raw,
                self.type_name(),
                "expected true, false, 1 or 0",
            ))
        }
    }

    fn encode(&self, value: &bool) -> String {
        value.to_string()
    }

    fn type_name(&self) -> &'static str {
        "bool"
    }
}

/// 时间长度："500ms"、"30s"、"1h30m"
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationConverter;

impl Converter<Duration> for DurationConverter {
    fn decode(&self, raw: &str) -> Result<Duration, PropsError> {
        parse_duration(raw).map_err(|e| PropsError::conversion(raw, self.type_name(), e))
    }

    fn encode(&self, value: &Duration) -> String {
        format_duration(*value)
    }

    fn type_name(&self) -> &'static str {
        "Duration"
    }
}

/// 列表：按分隔符切分，每个元素去掉首尾空白后交给元素转换器
///
/// 空字符串（或只有空白）得到空列表。
pub struct ListConverter<T> {
    delimiter: String,
    element: Arc<dyn Converter<T>>,
}

impl ListConverter<String> {
    /// 逗号分隔的字符串列表
    pub fn strings() -> Self {
        Self::new(",", StringConverter)
    }
}

impl<T> ListConverter<T> {
    pub fn new<C>(delimiter: &str, element: C) -> Self
    where
        C: Converter<T> + 'static,
    {
        Self {
            delimiter: delimiter.to_string(),
            element: Arc::new(element),
        }
    }
}

impl<T> Converter<Vec<T>> for ListConverter<T> {
    fn decode(&self, raw: &str) -> Result<Vec<T>, PropsError> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.delimiter.is_empty() {
            return Ok(vec![self.element.decode(raw.trim())?]);
        }

        raw.split(self.delimiter.as_str())
            .map(|item| {
                self.element.decode(item.trim()).map_err(|e| match e {
                    PropsError::Conversion { target, reason, .. } => PropsError::Conversion {
                        raw: raw.to_string(),
                        target,
                        reason: format!("element {:?}: {}", item.trim(), reason),
                    },
                    other => other,
                })
            })
            .collect()
    }

    fn encode(&self, value: &Vec<T>) -> String {
        value
            .iter()
            .map(|v| self.element.encode(v))
            .collect::<Vec<_>>()
            .join(&self.delimiter)
    }

    fn type_name(&self) -> &'static str {
        "Vec"
    }
}
