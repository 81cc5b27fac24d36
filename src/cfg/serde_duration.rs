use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;
use thiserror::Error;

// 重新导出serde_with
pub use serde_with::{serde_as, DeserializeAs, SerializeAs};

/// 时间字符串解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,
    #[error("expected a number at offset {0}")]
    ExpectedNumber(usize),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("missing unit after {0}")]
    MissingUnit(String),
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
    #[error("duration overflow")]
    Overflow,
}

/// Duration的人性化格式化器
///
/// 支持格式: "3s", "100ms", "2m", "1h", "1h30m45s", "2d"
pub struct HumanDur;

impl SerializeAs<Duration> for HumanDur {
    fn serialize_as<S>(source: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*source))
    }
}

impl<'de> DeserializeAs<'de, Duration> for HumanDur {
    fn deserialize_as<D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// 每个单位对应的纳秒数
fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        "h" => 3600.0 * 1e9,
        "d" => 86400.0 * 1e9,
        _ => return None,
    };
    Some(nanos)
}

/// 解析时间字符串: "1h30m45s" -> Duration
///
/// 每一段都必须是数字（可带小数）加单位，不带单位的纯数字视为错误。
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let mut total: u128 = 0;
    let mut rest = s.as_str();
    let mut offset = 0;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(DurationError::ExpectedNumber(offset));
        }
        let (num_str, after_num) = rest.split_at(num_len);
        let value: f64 = num_str
            .parse()
            .map_err(|_| DurationError::InvalidNumber(num_str.to_string()))?;

        let unit_len = after_num
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_num.len());
        if unit_len == 0 {
            return Err(DurationError::MissingUnit(num_str.to_string()));
        }
        let (unit, after_unit) = after_num.split_at(unit_len);
        let per_unit = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))?;

        let nanos = value * per_unit;
        if !nanos.is_finite() || nanos > u64::MAX as f64 {
            return Err(DurationError::Overflow);
        }
        total = total
            .checked_add(nanos.round() as u128)
            .ok_or(DurationError::Overflow)?;

        offset += num_len + unit_len;
        rest = after_unit;
    }

    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| DurationError::Overflow)?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

/// Duration格式化为字符串: Duration -> "1h30m45s"
///
/// 输出可以被 [`parse_duration`] 无损解析。
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    let mut parts = Vec::new();
    let mut secs = duration.as_secs();
    for (unit, size) in [("d", 86400), ("h", 3600), ("m", 60), ("s", 1)] {
        if secs >= size {
            parts.push(format!("{}{}", secs / size, unit));
            secs %= size;
        }
    }

    let mut nanos = duration.subsec_nanos();
    for (unit, size) in [("ms", 1_000_000), ("us", 1_000), ("ns", 1)] {
        if nanos >= size {
            parts.push(format!("{}{}", nanos / size, unit));
            nanos %= size;
        }
    }

    parts.join("")
}
