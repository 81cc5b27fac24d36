//! 转换器接口
//!
//! 原始字符串与类型值之间的双向转换，以及基于闭包的自定义转换器。

use std::fmt::Display;
use std::sync::Arc;

use crate::error::PropsError;

/// 类型转换器：原始字符串 <-> 类型值
///
/// 实现必须是纯函数：不做 I/O，不依赖共享状态。
/// 对同一个输入，`decode` 总是返回相同结果。
pub trait Converter<T>: Send + Sync {
    /// 将原始字符串转换为目标类型
    fn decode(&self, raw: &str) -> Result<T, PropsError>;

    /// 将值编码为可以被 `decode` 解析回来的字符串
    fn encode(&self, value: &T) -> String;

    /// 目标类型名，用于错误信息
    fn type_name(&self) -> &'static str;
}

impl<T, C> Converter<T> for Arc<C>
where
    C: Converter<T> + ?Sized,
{
    fn decode(&self, raw: &str) -> Result<T, PropsError> {
        (**self).decode(raw)
    }

    fn encode(&self, value: &T) -> String {
        (**self).encode(value)
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

type DecodeFn<T> = Box<dyn Fn(&str) -> Result<T, String> + Send + Sync>;
type EncodeFn<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// 调用方自定义的转换器
///
/// # 示例
/// ```
/// use layered_props::converter::{Converter, CustomConverter};
///
/// let upper = CustomConverter::new(
///     "Uppercase",
///     |raw: &str| -> Result<String, String> { Ok(raw.to_uppercase()) },
///     |value: &String| value.clone(),
/// );
/// assert_eq!(upper.decode("abc").unwrap(), "ABC");
/// ```
pub struct CustomConverter<T> {
    type_name: &'static str,
    decode: DecodeFn<T>,
    encode: EncodeFn<T>,
}

impl<T> CustomConverter<T> {
    pub fn new<D, E, Err>(type_name: &'static str, decode: D, encode: E) -> Self
    where
        D: Fn(&str) -> Result<T, Err> + Send + Sync + 'static,
        E: Fn(&T) -> String + Send + Sync + 'static,
        Err: Display,
    {
        Self {
            type_name,
            decode: Box::new(move |raw| decode(raw).map_err(|e| e.to_string())),
            encode: Box::new(encode),
        }
    }
}

impl<T> Converter<T> for CustomConverter<T> {
    fn decode(&self, raw: &str) -> Result<T, PropsError> {
        (self.decode)(raw).map_err(|reason| PropsError::conversion(raw, self.type_name, reason))
    }

    fn encode(&self, value: &T) -> String {
        (self.encode)(value)
    }

    fn type_name(&self) -> &'static str {
        self.type_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn socket_addr() -> CustomConverter<SocketAddr> {
        CustomConverter::new(
            "SocketAddr",
            |raw: &str| raw.parse::<SocketAddr>(),
            |value: &SocketAddr| value.to_string(),
        )
    }

    #[test]
    fn test_custom_converter_decode() {
        let converter = socket_addr();
        let addr = converter.decode("127.0.0.1:8080").unwrap();
        assert_eq!(addr.port(), 8080);
        assert_eq!(converter.encode(&addr), "127.0.0.1:8080");
    }

    #[test]
    fn test_custom_converter_error() {
        let err = socket_addr().decode("localhost").unwrap_err();
        match err {
            PropsError::Conversion { raw, target, .. } => {
                assert_eq!(raw, "localhost");
                assert_eq!(target, "SocketAddr");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_shared_converter() {
        let shared: Arc<dyn Converter<SocketAddr>> = Arc::new(socket_addr());
        assert_eq!(shared.type_name(), "SocketAddr");
        assert!(shared.decode("10.0.0.1:53").is_ok());
    }
}
