//! Positional placeholder formatting.
//!
//! Raw strings use `{0}`, `{1}`, ... to refer to parameters by position.
//! A raw string is first compiled into a [`Template`] of literal and
//! positional segments, which is then rendered against a parameter slice.
//! Anything that isn't a `{digits}` token is literal text, and positions
//! beyond the supplied parameters are kept verbatim.

use std::fmt;
use std::fmt::Write as _;

/// A translation parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Str(s) => f.write_str(s),
            ArgValue::Int(i) => write!(f, "{i}"),
            ArgValue::Float(v) => {
                let mut s = v.to_string();
                if s.contains('.') {
                    while s.ends_with('0') {
                        s.pop();
                    }
                    if s.ends_with('.') {
                        s.pop();
                    }
                }
                f.write_str(&s)
            }
            ArgValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<&String> for ArgValue {
    fn from(v: &String) -> Self {
        Self::Str(v.clone())
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<usize> for ArgValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for ArgValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Positional(usize),
}

/// A raw string compiled into literal and positional segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let index = (digits > 0 && after[digits..].starts_with('}'))
                .then(|| after[..digits].parse::<usize>().ok())
                .flatten();

            match index {
                Some(index) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Positional(index));
                    rest = &after[digits + 1..];
                }
                None => {
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Number of distinct parameter positions the template refers to.
    pub fn arity(&self) -> usize {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Positional(i) => Some(i + 1),
                Segment::Literal(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn render(&self, params: &[ArgValue]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Positional(i) => match params.get(*i) {
                    Some(v) => {
                        let _ = write!(out, "{v}");
                    }
                    None => {
                        let _ = write!(out, "{{{i}}}");
                    }
                },
            }
        }
        out
    }
}

/// Compile `raw` and substitute `params` by position.
pub fn format_positional(raw: &str, params: &[ArgValue]) -> String {
    if params.is_empty() || !raw.contains('{') {
        return raw.to_string();
    }
    Template::parse(raw).render(params)
}

/// Build a `[ArgValue; N]` from heterogeneous values.
///
/// Examples:
/// - `args![]`
/// - `args!["Bob", 3, true]`
#[macro_export]
macro_rules! args {
    () => {{
        let empty: [$crate::ArgValue; 0] = [];
        empty
    }};
    ($($value:expr),+ $(,)?) => {
        [$($crate::ArgValue::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn substitutes_by_position() {
        let params = [ArgValue::from("Bob"), ArgValue::from(3)];
        assert_eq!(
            format_positional("Hello, {0}! You have {1} messages.", &params),
            "Hello, Bob! You have 3 messages."
        );
        assert_eq!(format_positional("{1} {0} {1}", &params), "3 Bob 3");
    }

    #[test]
    fn missing_params_stay_literal() {
        let params = [ArgValue::from("Bob")];
        assert_eq!(format_positional("{0} and {1}", &params), "Bob and {1}");
        assert_eq!(format_positional("{2}", &[]), "{2}");
    }

    #[test]
    fn non_positional_braces_are_literal() {
        let params = [ArgValue::from("x")];
        assert_eq!(format_positional("{name} {0}", &params), "{name} x");
        assert_eq!(format_positional("{ 0 } {0", &params), "{ 0 } {0");
        assert_eq!(format_positional("{{0}}", &params), "{x}");
        assert_eq!(format_positional("}{", &params), "}{");
    }

    #[test]
    fn oversized_index_is_literal() {
        let params = [ArgValue::from("x")];
        let raw = "{99999999999999999999999}";
        assert_eq!(format_positional(raw, &params), raw);
    }

    #[test]
    fn template_reports_arity() {
        assert_eq!(Template::parse("plain").arity(), 0);
        assert_eq!(Template::parse("{0} {3} {1}").arity(), 4);
    }

    #[test]
    fn values_render_compactly() {
        let params = args![1.50, 2.0, false, -7];
        assert_eq!(format_positional("{0}|{1}|{2}|{3}", &params), "1.5|2|false|-7");
    }

    #[test]
    fn large_parameters_are_kept_whole() {
        let big = "a".repeat(100 * 1024);
        let s = format_positional("<{0}|{0}|{0}>", &[ArgValue::from(big.as_str())]);
        assert_eq!(s.len(), 3 * big.len() + 4);
        assert!(s.ends_with("a>"));
    }
}
