//! Input validation and conversion.
//!
//! Conversion first checks the structural kind of the input, then converts scalars or walks
//! composite inputs element by element. The first failing element aborts the whole value and
//! is reported with the path leading to it.

use std::fmt;

use serde::Serialize;

use super::{ArgumentType, RecordField, TypeKind, Value};
use crate::syntax::{Input, Span};

/// One step from a composite input down to a nested element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Key(k) => write!(f, ".{}", k),
        }
    }
}

/// Why an input was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMismatch {
    /// Path from the top-level input to the rejected element.
    pub path: Vec<PathSegment>,
    /// Span of the rejected element.
    pub span: Span,
    /// Literal form of the rejected element.
    pub input: String,
    /// Name of the type the element had to satisfy.
    pub expected: String,
    pub reason: Option<String>,
}

impl TypeMismatch {
    fn new(ty: &ArgumentType, input: &Input) -> Self {
        Self {
            path: Vec::new(),
            span: input.span(),
            input: input.render(),
            expected: ty.name(),
            reason: None,
        }
    }

    fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn under(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }
}

/// Validates `input` against `ty` and converts it.
pub fn convert(ty: &ArgumentType, input: &Input) -> Result<Value, TypeMismatch> {
    let kind = ty.kind();
    if !kind.accepts(input.kind()) {
        return Err(TypeMismatch::new(ty, input)
            .with_reason(format!("expected {}, found {}", describe(kind), input.kind())));
    }

    match (ty, input) {
        (ArgumentType::Any, _) => Ok(convert_any(input)),
        (_, Input::Single { value, .. }) => convert_scalar(ty, input, value),
        (ArgumentType::List(element), Input::List { items, .. }) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                convert(element, item).map_err(|e| e.under(PathSegment::Index(i)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (ArgumentType::ExactList(elements), Input::List { items, .. }) => {
            if elements.len() != items.len() {
                return Err(TypeMismatch::new(ty, input).with_reason(format!(
                    "expected {} elements, found {}",
                    elements.len(),
                    items.len()
                )));
            }
            elements
                .iter()
                .zip(items)
                .enumerate()
                .map(|(i, (element, item))| {
                    convert(element, item).map_err(|e| e.under(PathSegment::Index(i)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        (ArgumentType::Map { key, value }, Input::Map { entries, .. }) => entries
            .iter()
            .map(|(k, v)| {
                let segment = PathSegment::Key(key_text(k));
                let key = convert(key, k).map_err(|e| e.under(segment.clone()))?;
                let value = convert(value, v).map_err(|e| e.under(segment))?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Map),
        (ArgumentType::Record(fields), Input::Map { entries, .. }) => {
            convert_record(ty, fields, input, entries)
        }
        (ArgumentType::Custom(custom), _) => custom
            .convert(input)
            .map_err(|reason| TypeMismatch::new(ty, input).with_reason(reason)),
        _ => Err(TypeMismatch::new(ty, input)),
    }
}

fn describe(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Single => "a single value",
        TypeKind::List => "a list",
        TypeKind::Map => "a map",
        TypeKind::Any => "any value",
    }
}

fn key_text(key: &Input) -> String {
    key.as_single()
        .map(str::to_owned)
        .unwrap_or_else(|| key.render())
}

fn convert_scalar(ty: &ArgumentType, input: &Input, text: &str) -> Result<Value, TypeMismatch> {
    let fail = || TypeMismatch::new(ty, input);
    match ty {
        ArgumentType::String => Ok(Value::String(text.to_owned())),
        ArgumentType::Int => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| fail().with_reason(e.to_string())),
        ArgumentType::Float => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| fail().with_reason(e.to_string())),
        ArgumentType::Bool => {
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(fail())
            }
        }
        ArgumentType::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(fail().with_reason("expected exactly one character")),
            }
        }
        ArgumentType::Enum { members, .. } => {
            if members.iter().any(|m| m == text) {
                Ok(Value::Enum(text.to_owned()))
            } else {
                Err(fail().with_reason(format!("expected one of: {}", members.join(", "))))
            }
        }
        ArgumentType::Exact(expected) => {
            if expected == text {
                Ok(Value::String(text.to_owned()))
            } else {
                Err(fail())
            }
        }
        ArgumentType::Custom(custom) => custom
            .convert(input)
            .map_err(|reason| fail().with_reason(reason)),
        _ => Err(fail()),
    }
}

fn convert_record(
    ty: &ArgumentType,
    fields: &[RecordField],
    input: &Input,
    entries: &[(Input, Input)],
) -> Result<Value, TypeMismatch> {
    let mut seen: Vec<&str> = Vec::with_capacity(entries.len());
    let mut out = Vec::with_capacity(entries.len());

    for (k, v) in entries {
        let Some(name) = k.as_single() else {
            return Err(TypeMismatch::new(ty, k).with_reason("record keys must be names"));
        };
        let segment = PathSegment::Key(name.to_owned());
        let Some(field) = fields.iter().find(|f| f.key == name) else {
            let expected = ArgumentType::enumeration("field", fields.iter().map(|f| f.key.clone()));
            return Err(TypeMismatch::new(&expected, k)
                .with_reason(format!("unknown field '{}'", name))
                .under(segment));
        };
        if seen.contains(&name) {
            return Err(TypeMismatch::new(ty, k)
                .with_reason(format!("field '{}' given twice", name))
                .under(segment));
        }
        seen.push(name);
        let value = convert(&field.ty, v).map_err(|e| e.under(segment))?;
        out.push((Value::String(name.to_owned()), value));
    }

    if let Some(missing) = fields
        .iter()
        .find(|f| !f.optional && !seen.contains(&f.key.as_str()))
    {
        return Err(TypeMismatch::new(ty, input)
            .with_reason(format!("missing field '{}'", missing.key))
            .under(PathSegment::Key(missing.key.clone())));
    }

    Ok(Value::Map(out))
}

fn convert_any(input: &Input) -> Value {
    match input {
        Input::Empty { .. } => Value::Unit,
        Input::Single { value, .. } => Value::String(value.clone()),
        Input::List { items, .. } => Value::List(items.iter().map(convert_any).collect()),
        Input::Map { entries, .. } => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (convert_any(k), convert_any(v)))
                .collect(),
        ),
    }
}
