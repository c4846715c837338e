//! Graphviz DOT helpers for CFG dumps.

/// Escapes text for use inside a double-quoted DOT label.
///
/// Record-label metacharacters (`<`, `>`, `{`, `}`, `|`) are escaped as well, so instruction
/// dumps such as `v1 = phi [L2: v1.1]` render verbatim.
///
/// # Examples
///
/// ```rust
/// use tacscope::utils::escape_dot;
///
/// assert_eq!(escape_dot("call @f<T>"), "call @f\\<T\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '"' | '<' | '>' | '{' | '}' | '|' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\l"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}
