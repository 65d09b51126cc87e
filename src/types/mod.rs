//! Argument types.
//!
//! An [`ArgumentType`] validates an [`Input`] and converts it into a [`Value`]. Composite
//! types hold their element, key and value types, so the type tree mirrors the nesting of the
//! literal it expects. Completion walks the same tree with [`ArgumentType::element_type`],
//! [`ArgumentType::key_type`] and [`ArgumentType::value_type`].

pub mod convert;
pub mod value;

use std::fmt;
use std::sync::Arc;

use crate::syntax::{Input, InputKind};

pub use convert::{PathSegment, TypeMismatch};
pub use value::{CustomValue, FromValue, Value};

/// Structural kind an argument type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Single,
    List,
    Map,
    /// Any shape, including nothing.
    Any,
}

impl TypeKind {
    pub fn accepts(self, kind: InputKind) -> bool {
        match self {
            TypeKind::Any => true,
            TypeKind::Single => kind == InputKind::Single,
            TypeKind::List => kind == InputKind::List,
            TypeKind::Map => kind == InputKind::Map,
        }
    }
}

/// A user-supplied argument type.
pub trait CustomType: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> TypeKind;

    /// Converts an input whose structural kind already matched [`kind`](Self::kind).
    /// The error is a short reason shown in diagnostics.
    fn convert(&self, input: &Input) -> Result<Value, String>;

    fn possibilities(&self) -> Vec<String> {
        Vec::new()
    }
}

/// One keyed field of a record type.
#[derive(Debug, Clone)]
pub struct RecordField {
    pub key: String,
    pub ty: ArgumentType,
    pub optional: bool,
}

impl RecordField {
    pub fn required(key: impl Into<String>, ty: ArgumentType) -> Self {
        Self {
            key: key.into(),
            ty,
            optional: false,
        }
    }

    pub fn optional(key: impl Into<String>, ty: ArgumentType) -> Self {
        Self {
            key: key.into(),
            ty,
            optional: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ArgumentType {
    Any,
    String,
    Int,
    Float,
    Bool,
    Char,
    /// Named, case-sensitive members.
    Enum { name: String, members: Vec<String> },
    /// Exactly this text.
    Exact(String),
    List(Box<ArgumentType>),
    /// A list whose elements have per-position types; the length must match.
    ExactList(Vec<ArgumentType>),
    Map {
        key: Box<ArgumentType>,
        value: Box<ArgumentType>,
    },
    /// A map with known keys, each with its own value type.
    Record(Vec<RecordField>),
    Custom(Arc<dyn CustomType>),
}

impl ArgumentType {
    pub fn enumeration<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArgumentType::Enum {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn list(element: ArgumentType) -> Self {
        ArgumentType::List(Box::new(element))
    }

    pub fn map(key: ArgumentType, value: ArgumentType) -> Self {
        ArgumentType::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn custom(ty: impl CustomType + 'static) -> Self {
        ArgumentType::Custom(Arc::new(ty))
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            ArgumentType::Any => TypeKind::Any,
            ArgumentType::String
            | ArgumentType::Int
            | ArgumentType::Float
            | ArgumentType::Bool
            | ArgumentType::Char
            | ArgumentType::Enum { .. }
            | ArgumentType::Exact(_) => TypeKind::Single,
            ArgumentType::List(_) | ArgumentType::ExactList(_) => TypeKind::List,
            ArgumentType::Map { .. } | ArgumentType::Record(_) => TypeKind::Map,
            ArgumentType::Custom(custom) => custom.kind(),
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ArgumentType::Bool)
    }

    /// Display name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            ArgumentType::Any => "any".into(),
            ArgumentType::String => "string".into(),
            ArgumentType::Int => "int".into(),
            ArgumentType::Float => "float".into(),
            ArgumentType::Bool => "bool".into(),
            ArgumentType::Char => "char".into(),
            ArgumentType::Enum { name, .. } => name.clone(),
            ArgumentType::Exact(text) => format!("'{}'", text),
            ArgumentType::List(element) => format!("list<{}>", element.name()),
            ArgumentType::ExactList(elements) => {
                let names: Vec<String> = elements.iter().map(ArgumentType::name).collect();
                format!("[{}]", names.join(", "))
            }
            ArgumentType::Map { key, value } => format!("map<{}, {}>", key.name(), value.name()),
            ArgumentType::Record(fields) => {
                let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
                format!("{{{}}}", keys.join(", "))
            }
            ArgumentType::Custom(custom) => custom.name().to_owned(),
        }
    }

    /// Literal scalar values this type accepts, when it has a closed set of them.
    pub fn possibilities(&self) -> Vec<String> {
        match self {
            ArgumentType::Bool => vec!["true".into(), "false".into()],
            ArgumentType::Enum { members, .. } => members.clone(),
            ArgumentType::Exact(text) => vec![text.clone()],
            ArgumentType::Custom(custom) => custom.possibilities(),
            _ => Vec::new(),
        }
    }

    /// Completion candidates for a value of this type that has not been started yet.
    pub fn fresh_candidates(&self) -> Vec<String> {
        match self.kind() {
            TypeKind::Single => self.possibilities(),
            TypeKind::List => vec!["[".into()],
            TypeKind::Map => vec!["{".into()],
            TypeKind::Any => Vec::new(),
        }
    }

    /// Type of the element at `index` of a list of this type.
    pub fn element_type(&self, index: usize) -> Option<ArgumentType> {
        match self {
            ArgumentType::List(element) => Some((**element).clone()),
            ArgumentType::ExactList(elements) => elements.get(index).cloned(),
            ArgumentType::Any => Some(ArgumentType::Any),
            _ => None,
        }
    }

    /// Type of the key of entry `index` of a map of this type. Records expose their field
    /// names as an enum.
    pub fn key_type(&self, _index: usize) -> Option<ArgumentType> {
        match self {
            ArgumentType::Map { key, .. } => Some((**key).clone()),
            ArgumentType::Record(fields) => Some(ArgumentType::enumeration(
                "field",
                fields.iter().map(|f| f.key.clone()),
            )),
            ArgumentType::Any => Some(ArgumentType::Any),
            _ => None,
        }
    }

    /// Type of the value stored under `key` in entry `index` of a map of this type.
    pub fn value_type(&self, _index: usize, key: &str) -> Option<ArgumentType> {
        match self {
            ArgumentType::Map { value, .. } => Some((**value).clone()),
            ArgumentType::Record(fields) => fields
                .iter()
                .find(|f| f.key == key)
                .map(|f| f.ty.clone()),
            ArgumentType::Any => Some(ArgumentType::Any),
            _ => None,
        }
    }

    /// Validates `input` and converts it. See [`convert`].
    pub fn convert(&self, input: &Input) -> Result<Value, TypeMismatch> {
        convert::convert(self, input)
    }
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> ArgumentType {
        ArgumentType::Record(vec![
            RecordField::required("age", ArgumentType::Int),
            RecordField::optional(
                "languages",
                ArgumentType::list(ArgumentType::enumeration("Language", ["EN", "PT"])),
            ),
        ])
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ArgumentType::Int.kind(), TypeKind::Single);
        assert_eq!(person().kind(), TypeKind::Map);
        assert!(TypeKind::Any.accepts(InputKind::Empty));
        assert!(!TypeKind::Single.accepts(InputKind::List));
    }

    #[test]
    fn test_navigation() {
        let ty = person();
        assert_eq!(ty.key_type(0).unwrap().possibilities(), vec!["age", "languages"]);
        let languages = ty.value_type(1, "languages").unwrap();
        assert_eq!(languages.fresh_candidates(), vec!["["]);
        assert_eq!(
            languages.element_type(3).unwrap().fresh_candidates(),
            vec!["EN", "PT"]
        );
        assert!(ty.value_type(0, "missing").is_none());
    }

    #[test]
    fn test_names() {
        assert_eq!(
            ArgumentType::map(ArgumentType::String, ArgumentType::list(ArgumentType::Int)).name(),
            "map<string, list<int>>"
        );
        assert_eq!(person().name(), "{age, languages}");
    }
}
