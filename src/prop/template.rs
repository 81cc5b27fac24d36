use crate::error::PropsError;

/// 用参数渲染模板
///
/// - `{}` 按顺序取下一个参数
/// - `{N}` 取第 N 个参数（从 0 开始）
/// - `{{` 和 `}}` 输出字面量花括号
///
/// # 示例
/// ```
/// use layered_props::prop::render_template;
///
/// let args = vec!["db".to_string(), "3306".to_string()];
/// assert_eq!(render_template("{}:{}", &args).unwrap(), "db:3306");
/// assert_eq!(render_template("{1}@{0} {{x}}", &args).unwrap(), "3306@db {x}");
/// ```
pub fn render_template(template: &str, args: &[String]) -> Result<String, PropsError> {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, c)| c) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().map(|&(_, c)| c) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut index = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    index.push(c);
                }
                if !closed {
                    return Err(PropsError::Template(format!(
                        "unclosed '{{' at offset {}",
                        pos
                    )));
                }

                let i = if index.is_empty() {
                    next += 1;
                    next - 1
                } else {
                    index.trim().parse::<usize>().map_err(|_| {
                        PropsError::Template(format!("invalid placeholder {{{}}}", index))
                    })?
                };
                let arg = args.get(i).ok_or_else(|| {
                    PropsError::Template(format!(
                        "placeholder {} out of range, {} arguments",
                        i,
                        args.len()
                    ))
                })?;
                out.push_str(arg);
            }
            '}' => {
                return Err(PropsError::Template(format!(
                    "unmatched '}}' at offset {}",
                    pos
                )));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sequential_and_positional() {
        let a = args(&["localhost", "5432", "app"]);
        assert_eq!(
            render_template("postgres://{}:{}/{}", &a).unwrap(),
            "postgres://localhost:5432/app"
        );
        assert_eq!(render_template("{2}/{0}/{2}", &a).unwrap(), "app/localhost/app");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(render_template("{{}}", &[]).unwrap(), "{}");
        assert_eq!(render_template("{{{0}}}", &args(&["x"])).unwrap(), "{x}");
    }

    #[test]
    fn test_errors() {
        let a = args(&["x"]);
        assert!(matches!(render_template("{", &a), Err(PropsError::Template(_))));
        assert!(matches!(render_template("}", &a), Err(PropsError::Template(_))));
        assert!(matches!(render_template("{}{}", &a), Err(PropsError::Template(_))));
        assert!(matches!(render_template("{a}", &a), Err(PropsError::Template(_))));
        assert!(matches!(render_template("{3}", &a), Err(PropsError::Template(_))));
    }

    #[test]
    fn test_unicode() {
        assert_eq!(render_template("名称：{}", &args(&["服务"])).unwrap(), "名称：服务");
    }
}
