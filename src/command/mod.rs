//! Command and argument declarations.
//!
//! Declarations are plain data built with small builder methods and handed to the
//! [`CommandRegistry`]. After registration they are immutable and shared behind `Arc`s.

pub mod registry;
pub mod requirement;

use std::fmt;
use std::sync::Arc;

use crate::binder::BoundArgument;
use crate::dispatch::Handler;
use crate::types::{ArgumentType, TypeKind, Value};

pub use registry::{CommandId, CommandRegistry, ResolveError};
pub use requirement::{Information, InformationId, ParseContext, Requirement};

// ============================================================================
// ARGUMENTS
// ============================================================================

/// How many inputs an argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    #[default]
    Single,
    /// A list or map typed argument. Takes one literal, or for lists a run of bare values.
    Multiple,
    /// Takes a run of values, each converted with the argument's type.
    Vararg,
}

impl Multiplicity {
    pub fn is_multi(self) -> bool {
        !matches!(self, Multiplicity::Single)
    }
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub id: String,
    pub ty: ArgumentType,
    pub optional: bool,
    pub multiplicity: Multiplicity,
    /// Long names; the first is the primary name shown in completion.
    pub names: Vec<String>,
    pub short: Option<char>,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub requirements: Vec<Requirement>,
}

impl Argument {
    pub fn new(id: impl Into<String>, ty: ArgumentType) -> Self {
        let id = id.into();
        Self {
            names: vec![id.clone()],
            id,
            ty,
            optional: false,
            multiplicity: Multiplicity::Single,
            short: None,
            default: None,
            description: None,
            requirements: Vec::new(),
        }
    }

    /// A boolean flag: optional, defaulting to false.
    pub fn flag(id: impl Into<String>, short: char) -> Self {
        Self::new(id, ArgumentType::Bool)
            .short(short)
            .default_value(Value::Bool(false))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiplicity = Multiplicity::Multiple;
        self
    }

    pub fn vararg(mut self) -> Self {
        self.multiplicity = Multiplicity::Vararg;
        self
    }

    /// Replaces the primary long name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        match self.names.first_mut() {
            Some(first) => *first = name.into(),
            None => self.names.push(name.into()),
        }
        self
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn short(mut self, flag: char) -> Self {
        self.short = Some(flag);
        self
    }

    /// Sets a default; the argument becomes optional.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.optional = true;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn long_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.id)
    }

    /// Type of each individual value this argument takes from the line.
    pub fn value_type(&self) -> &ArgumentType {
        &self.ty
    }

    /// Whether a bare `--name` with no value binds `true`.
    pub fn is_switch(&self) -> bool {
        self.ty.is_bool() && self.multiplicity == Multiplicity::Single
    }

    /// Value bound when an optional multi-valued argument receives nothing.
    pub(crate) fn empty_multi_value(&self) -> Value {
        match (self.multiplicity, self.ty.kind()) {
            (Multiplicity::Multiple, TypeKind::Map) => Value::Map(Vec::new()),
            _ => Value::List(Vec::new()),
        }
    }
}

// ============================================================================
// ARGUMENT SOURCES
// ============================================================================

/// Supplies arguments that depend on what has been bound so far.
pub trait ArgumentSupplier: Send + Sync + fmt::Debug {
    /// Every argument this supplier can ever produce.
    fn all(&self) -> Vec<Arc<Argument>>;

    /// Arguments still to bind, given the ones bound so far, in positional order.
    fn remaining(&self, bound: &[BoundArgument]) -> Vec<Arc<Argument>>;
}

#[derive(Debug, Clone)]
pub enum ArgumentSource {
    Static(Vec<Arc<Argument>>),
    Dynamic(Arc<dyn ArgumentSupplier>),
}

impl Default for ArgumentSource {
    fn default() -> Self {
        ArgumentSource::Static(Vec::new())
    }
}

impl ArgumentSource {
    pub fn all(&self) -> Vec<Arc<Argument>> {
        match self {
            ArgumentSource::Static(arguments) => arguments.clone(),
            ArgumentSource::Dynamic(supplier) => supplier.all(),
        }
    }

    /// Unbound arguments, in positional order.
    pub fn remaining(&self, bound: &[BoundArgument]) -> Vec<Arc<Argument>> {
        let candidates = match self {
            ArgumentSource::Static(arguments) => arguments.clone(),
            ArgumentSource::Dynamic(supplier) => supplier.remaining(bound),
        };
        candidates
            .into_iter()
            .filter(|arg| !bound.iter().any(|b| b.id == arg.id))
            .collect()
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    /// Full name of the parent command, for sub-commands.
    pub parent: Option<String>,
    pub arguments: ArgumentSource,
    pub requirements: Vec<Requirement>,
    pub required_information: Vec<InformationId>,
    pub handler: Option<Arc<dyn Handler>>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            parent: None,
            arguments: ArgumentSource::default(),
            requirements: Vec::new(),
            required_information: Vec::new(),
            handler: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn parent(mut self, full_name: impl Into<String>) -> Self {
        self.parent = Some(full_name.into());
        self
    }

    /// Appends a static argument. Replaces a dynamic source.
    pub fn argument(mut self, argument: Argument) -> Self {
        let argument = Arc::new(argument);
        if let ArgumentSource::Static(arguments) = &mut self.arguments {
            arguments.push(argument);
        } else {
            self.arguments = ArgumentSource::Static(vec![argument]);
        }
        self
    }

    pub fn dynamic_arguments(mut self, supplier: impl ArgumentSupplier + 'static) -> Self {
        self.arguments = ArgumentSource::Dynamic(Arc::new(supplier));
        self
    }

    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn requires_information(mut self, id: InformationId) -> Self {
        self.required_information.push(id);
        self
    }

    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Name and aliases, without localized names.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parent", &self.parent)
            .field("arguments", &self.arguments)
            .field("requirements", &self.requirements)
            .field("required_information", &self.required_information)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
