//! Parsed literal values.
//!
//! An [`Input`] is the untyped result of reading one value from a command line: a scalar, a
//! list, a map, or nothing at all. Every node carries the byte span it was read from so that
//! failures can point back into the source line.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// SPANS
// ============================================================================

/// Represents a byte range in the parsed line.
///
/// # Examples
///
/// ```rust
/// use conch::syntax::Span;
/// let span = Span::new(2, 5);
/// assert_eq!(span.len(), 3);
/// assert!(span.contains(4));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `position`.
    pub const fn point(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn encloses(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::from(span.start..span.end)
    }
}

// ============================================================================
// INPUT TREE
// ============================================================================

/// Structural shape of an [`Input`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Empty,
    Single,
    List,
    Map,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputKind::Empty => "nothing",
            InputKind::Single => "a single value",
            InputKind::List => "a list",
            InputKind::Map => "a map",
        };
        f.write_str(name)
    }
}

/// A parsed literal.
///
/// Equality is structural: two inputs are equal when their shapes and scalar texts agree,
/// whatever spans they were read from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Input {
    Empty { span: Span },
    Single { value: String, span: Span },
    List { items: Vec<Input>, span: Span },
    Map { entries: Vec<(Input, Input)>, span: Span },
}

impl Input {
    /// Scalar with an empty span, for building trees by hand.
    pub fn single(value: impl Into<String>) -> Self {
        Input::Single {
            value: value.into(),
            span: Span::default(),
        }
    }

    pub fn list(items: Vec<Input>) -> Self {
        Input::List {
            items,
            span: Span::default(),
        }
    }

    pub fn map(entries: Vec<(Input, Input)>) -> Self {
        Input::Map {
            entries,
            span: Span::default(),
        }
    }

    pub fn empty(span: Span) -> Self {
        Input::Empty { span }
    }

    pub fn span(&self) -> Span {
        match self {
            Input::Empty { span }
            | Input::Single { span, .. }
            | Input::List { span, .. }
            | Input::Map { span, .. } => *span,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            Input::Empty { .. } => InputKind::Empty,
            Input::Single { .. } => InputKind::Single,
            Input::List { .. } => InputKind::List,
            Input::Map { .. } => InputKind::Map,
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            Input::Single { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Input::Empty { .. })
    }

    /// Renders the literal form of this input. For trees without `Empty` nodes, parsing
    /// the result yields an equal tree.
    ///
    /// `Empty` only marks an argument that received no input. The grammar has no literal
    /// for it, so it renders as `""` and reads back as an empty scalar.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Input::Empty { .. } => out.push_str("\"\""),
            Input::Single { value, .. } => render_scalar(value, out),
            Input::List { items, .. } => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(out);
                }
                out.push(']');
            }
            Input::Map { entries, .. } => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.render_into(out);
                    out.push('=');
                    value.render_into(out);
                }
                out.push('}');
            }
        }
    }
}

impl PartialEq for Input {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Input::Empty { .. }, Input::Empty { .. }) => true,
            (Input::Single { value: a, .. }, Input::Single { value: b, .. }) => a == b,
            (Input::List { items: a, .. }, Input::List { items: b, .. }) => a == b,
            (Input::Map { entries: a, .. }, Input::Map { entries: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Input {}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Characters that force a scalar to be rendered inside quotes.
const STRUCTURAL: &[char] = &[',', '=', '{', '}', '[', ']', '"', '\\', '&'];

pub(crate) fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('-')
        || value
            .chars()
            .any(|c| c.is_whitespace() || STRUCTURAL.contains(&c))
}

fn render_scalar(value: &str, out: &mut String) {
    if needs_quotes(value) {
        out.push_str(&quote(value));
    } else {
        out.push_str(value);
    }
}

/// `value` as a quoted string literal.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_spans() {
        let a = Input::Single {
            value: "x".into(),
            span: Span::new(0, 1),
        };
        let b = Input::Single {
            value: "x".into(),
            span: Span::new(7, 8),
        };
        assert_eq!(a, b);
        assert_ne!(a, Input::list(vec![Input::single("x")]));
    }

    #[test]
    fn test_render_quotes_structural_scalars() {
        let input = Input::map(vec![
            (Input::single("a"), Input::single("1")),
            (Input::single("b c"), Input::single("x\"y")),
        ]);
        assert_eq!(input.render(), r#"{a=1, "b c"="x\"y"}"#);
    }

    #[test]
    fn test_render_nested_list() {
        let input = Input::list(vec![Input::list(vec![]), Input::single("")]);
        assert_eq!(input.render(), r#"[[], ""]"#);
    }

    #[test]
    fn test_span_cover() {
        assert_eq!(Span::new(3, 4).cover(Span::new(1, 2)), Span::new(1, 4));
        assert!(Span::new(0, 10).encloses(&Span::new(2, 3)));
    }
}
