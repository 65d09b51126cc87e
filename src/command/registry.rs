//! Command forest.
//!
//! Commands are registered once at setup and validated as they arrive; a registry that
//! accepted a command can always parse it. Resolution walks the forest from the roots,
//! matching one token per level, exactly and case-sensitively, and descends as deep as the
//! tokens allow.
//!
//! ## Usage Workflow
//! ```rust
//! use conch::command::{Argument, Command, CommandRegistry};
//! use conch::types::ArgumentType;
//!
//! let mut registry = CommandRegistry::new();
//! registry.register(Command::new("user")).unwrap();
//! registry
//!     .register(Command::new("add").parent("user").argument(Argument::new("name", ArgumentType::String)))
//!     .unwrap();
//! let (id, rest) = registry.resolve(&["user", "add", "ana"], None).unwrap();
//! assert_eq!(registry.full_name(id), "user add");
//! assert_eq!(rest, &["ana"]);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, trace};

use super::{Argument, Command, Multiplicity};
use crate::diagnostics::RegistrationError;
use crate::locale::{argument_key, command_key, Localizer};
use crate::types::TypeKind;

/// Handle to a registered command. Only meaningful for the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

#[derive(Debug)]
struct Node {
    command: Arc<Command>,
    full_name: String,
    parent: Option<CommandId>,
    children: Vec<CommandId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ResolveError {
    #[error("no tokens to resolve")]
    #[diagnostic(code(conch::resolve::empty))]
    Empty,

    #[error("command not found: '{token}'")]
    #[diagnostic(code(conch::resolve::not_found))]
    NotFound { token: String },

    #[error("ambiguous command '{token}'")]
    #[diagnostic(code(conch::resolve::ambiguous))]
    Ambiguous {
        token: String,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    nodes: Vec<Node>,
    roots: Vec<CommandId>,
    by_name: im::HashMap<String, CommandId>,
}

// ============================================================================
// REGISTRATION
// ============================================================================

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers `command`. Its parent, if any, must already be registered.
    pub fn register(&mut self, command: Command) -> Result<CommandId, RegistrationError> {
        for name in command.declared_names() {
            if !is_word(name) {
                return Err(RegistrationError::InvalidName { name: name.into() });
            }
        }

        let parent = match &command.parent {
            Some(parent) => Some(self.find(parent).ok_or_else(|| {
                RegistrationError::UnknownParent {
                    parent: parent.clone(),
                }
            })?),
            None => None,
        };
        let full_name = match parent {
            Some(parent) => format!("{} {}", self.full_name(parent), command.name),
            None => command.name.clone(),
        };

        for &sibling in self.children_of(parent) {
            let sibling = &self.nodes[sibling.0].command;
            if let Some(clash) = command
                .declared_names()
                .find(|name| sibling.declared_names().any(|other| other == *name))
            {
                return Err(RegistrationError::DuplicateCommand {
                    command: full_name,
                    name: clash.into(),
                });
            }
        }

        validate_arguments(&full_name, &command.arguments.all())?;

        let id = CommandId(self.nodes.len());
        debug!(command = %full_name, "registered command");
        self.by_name.insert(full_name.clone(), id);
        self.nodes.push(Node {
            command: Arc::new(command),
            full_name,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }
}

fn is_word(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

fn validate_arguments(command: &str, arguments: &[Arc<Argument>]) -> Result<(), RegistrationError> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    let mut shorts = HashSet::new();
    if arguments.iter().filter(|a| a.multiplicity.is_multi()).count() > 1 {
        return Err(RegistrationError::MultipleVarargs {
            command: command.into(),
        });
    }

    for (position, argument) in arguments.iter().enumerate() {
        if !ids.insert(argument.id.as_str()) {
            return Err(RegistrationError::DuplicateArgument {
                command: command.into(),
                name: argument.id.clone(),
            });
        }
        for name in &argument.names {
            if !is_word(name) {
                return Err(RegistrationError::InvalidName { name: name.clone() });
            }
            if !names.insert(name.as_str()) {
                return Err(RegistrationError::DuplicateArgument {
                    command: command.into(),
                    name: name.clone(),
                });
            }
        }
        if let Some(flag) = argument.short {
            if argument.multiplicity.is_multi() || flag.is_whitespace() || flag == '-' {
                return Err(RegistrationError::InvalidShortFlag {
                    command: command.into(),
                    argument: argument.id.clone(),
                });
            }
            if !shorts.insert(flag) {
                return Err(RegistrationError::DuplicateShortFlag {
                    command: command.into(),
                    flag,
                });
            }
        }
        if argument.multiplicity == Multiplicity::Multiple
            && !matches!(argument.ty.kind(), TypeKind::List | TypeKind::Map)
        {
            return Err(RegistrationError::InvalidMultiple {
                command: command.into(),
                argument: argument.id.clone(),
                ty: argument.ty.name(),
            });
        }
        if argument.multiplicity.is_multi() && position + 1 != arguments.len() {
            return Err(RegistrationError::VarargNotLast {
                command: command.into(),
                argument: argument.id.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// LOOKUP AND RESOLUTION
// ============================================================================

impl CommandRegistry {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: CommandId) -> Option<&Arc<Command>> {
        self.nodes.get(id.0).map(|node| &node.command)
    }

    /// Looks a command up by its full, space-separated name.
    pub fn find(&self, full_name: &str) -> Option<CommandId> {
        self.by_name.get(full_name).copied()
    }

    pub fn full_name(&self, id: CommandId) -> &str {
        self.nodes
            .get(id.0)
            .map(|node| node.full_name.as_str())
            .unwrap_or("")
    }

    pub fn roots(&self) -> &[CommandId] {
        &self.roots
    }

    /// Children of `parent`, or the roots for `None`, in registration order.
    pub fn children_of(&self, parent: Option<CommandId>) -> &[CommandId] {
        match parent {
            Some(id) => self
                .nodes
                .get(id.0)
                .map(|node| node.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// All registered commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (CommandId, &Arc<Command>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (CommandId(i), &node.command))
    }

    /// Every name `id` can be typed as: its name, aliases, then localized names.
    pub fn names_of(&self, id: CommandId, localizer: Option<&dyn Localizer>) -> Vec<String> {
        let Some(node) = self.nodes.get(id.0) else {
            return Vec::new();
        };
        let mut names: Vec<String> = node.command.declared_names().map(String::from).collect();
        if let Some(localizer) = localizer {
            names.extend(localizer.names(&command_key(&node.full_name)));
        }
        names
    }

    /// Every long name `argument` of command `id` can be typed as.
    pub fn argument_names(
        &self,
        id: CommandId,
        argument: &Argument,
        localizer: Option<&dyn Localizer>,
    ) -> Vec<String> {
        let mut names = argument.names.clone();
        if let Some(localizer) = localizer {
            names.extend(localizer.names(&argument_key(self.full_name(id), argument.long_name())));
        }
        names
    }

    /// Matches `token` against the children of `parent`. More than one match (possible only
    /// through localized names) is returned as the error.
    pub fn match_child(
        &self,
        parent: Option<CommandId>,
        token: &str,
        localizer: Option<&dyn Localizer>,
    ) -> Result<Option<CommandId>, Vec<CommandId>> {
        let matches: Vec<CommandId> = self
            .children_of(parent)
            .iter()
            .copied()
            .filter(|&child| self.names_of(child, localizer).iter().any(|n| n == token))
            .collect();
        trace!(token, matches = matches.len(), "matching command token");
        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(matches),
        }
    }

    /// Greedy-deepest resolution of leading `tokens`. Returns the deepest matched command and
    /// the tokens left for its arguments.
    pub fn resolve<'t>(
        &self,
        tokens: &'t [&'t str],
        localizer: Option<&dyn Localizer>,
    ) -> Result<(CommandId, &'t [&'t str]), ResolveError> {
        let (first, mut rest) = tokens.split_first().ok_or(ResolveError::Empty)?;
        let mut current = self
            .match_child(None, first, localizer)
            .map_err(|candidates| self.ambiguous(first, &candidates))?
            .ok_or_else(|| ResolveError::NotFound {
                token: (*first).to_owned(),
            })?;

        while let Some((next, tail)) = rest.split_first() {
            match self
                .match_child(Some(current), next, localizer)
                .map_err(|candidates| self.ambiguous(next, &candidates))?
            {
                Some(child) => {
                    current = child;
                    rest = tail;
                }
                None => break,
            }
        }
        Ok((current, rest))
    }

    pub(crate) fn ambiguous(&self, token: &str, candidates: &[CommandId]) -> ResolveError {
        ResolveError::Ambiguous {
            token: token.to_owned(),
            candidates: candidates
                .iter()
                .map(|&id| self.full_name(id).to_owned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::TableLocalizer;
    use crate::types::ArgumentType;

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("user").alias("u")).unwrap();
        registry.register(Command::new("add").parent("user")).unwrap();
        registry.register(Command::new("remove").parent("user")).unwrap();
        registry
    }

    #[test]
    fn test_resolve_greedy_deepest() {
        let registry = registry();
        let (id, rest) = registry.resolve(&["u", "add", "add"], None).unwrap();
        assert_eq!(registry.full_name(id), "user add");
        assert_eq!(rest, &["add"]);
    }

    #[test]
    fn test_resolve_is_exact() {
        let registry = registry();
        assert_eq!(
            registry.resolve(&["use"], None),
            Err(ResolveError::NotFound {
                token: "use".into()
            })
        );
        assert_eq!(
            registry.resolve(&["User"], None),
            Err(ResolveError::NotFound {
                token: "User".into()
            })
        );
    }

    #[test]
    fn test_localized_collision_is_ambiguous() {
        let registry = registry();
        let locale = TableLocalizer::new()
            .with_names("command.user add", ["x"])
            .with_names("command.user remove", ["x"]);
        let err = registry.resolve(&["user", "x"], Some(&locale)).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Ambiguous {
                token: "x".into(),
                candidates: vec!["user add".into(), "user remove".into()],
            }
        );
    }

    #[test]
    fn test_duplicate_sibling_alias() {
        let mut registry = registry();
        let err = registry
            .register(Command::new("add2").alias("add").parent("user"))
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateCommand {
                command: "user add2".into(),
                name: "add".into()
            }
        );
    }

    #[test]
    fn test_vararg_must_be_last() {
        let mut registry = CommandRegistry::new();
        let err = registry
            .register(
                Command::new("cp")
                    .argument(Argument::new("files", ArgumentType::String).vararg())
                    .argument(Argument::new("target", ArgumentType::String)),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::VarargNotLast {
                command: "cp".into(),
                argument: "files".into()
            }
        );
    }

    #[test]
    fn test_registration_rejects_bad_arguments() {
        let mut registry = CommandRegistry::new();
        assert!(matches!(
            registry.register(Command::new("")),
            Err(RegistrationError::InvalidName { .. })
        ));
        assert!(matches!(
            registry.register(Command::new("x").parent("nope")),
            Err(RegistrationError::UnknownParent { .. })
        ));
        assert!(matches!(
            registry.register(
                Command::new("f")
                    .argument(Argument::flag("force", 'f'))
                    .argument(Argument::flag("fast", 'f'))
            ),
            Err(RegistrationError::DuplicateShortFlag { flag: 'f', .. })
        ));
        assert!(matches!(
            registry.register(
                Command::new("m").argument(Argument::new("n", ArgumentType::Int).multiple())
            ),
            Err(RegistrationError::InvalidMultiple { .. })
        ));
        assert!(matches!(
            registry.register(
                Command::new("v").argument(
                    Argument::new("all", ArgumentType::String).vararg().short('a')
                )
            ),
            Err(RegistrationError::InvalidShortFlag { .. })
        ));
        assert!(registry.is_empty());
    }
}
