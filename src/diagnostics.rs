//! Failure types and their rendering.
//!
//! A parse never panics on malformed input: it returns a [`ParseFail`], which owns the parsed
//! line and the offending span so it can be rendered with `miette` long after the parse that
//! produced it is gone. Mistakes made while declaring commands are [`RegistrationError`]s and
//! are reported by [`CommandRegistry::register`](crate::command::CommandRegistry::register),
//! before any parsing can happen.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource};
use serde::Serialize;
use thiserror::Error;

use crate::syntax::{ExpectedTokens, LiteralFailKind, LiteralFailure, Span};
use crate::types::PathSegment;

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// The line a failure was produced from, plus the primary span inside it.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub span: Span,
}

impl SourceInfo {
    pub fn new(name: &str, text: &str, span: Span) -> Self {
        Self {
            source: Arc::new(NamedSource::new(name, text.to_owned())),
            span,
        }
    }

    pub fn text(&self) -> &str {
        self.source.inner()
    }

    /// Source text covered by the primary span.
    pub fn snippet(&self) -> &str {
        let text = self.text();
        let end = self.span.end.min(text.len());
        let start = self.span.start.min(end);
        text.get(start..end).unwrap_or("")
    }
}

// ============================================================================
// PARSE FAILURES
// ============================================================================

/// Why a command line could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailKind {
    /// A structural character (or a value) was expected at `position`.
    TokenExpected {
        expected: ExpectedTokens,
        position: usize,
    },
    InvalidInputForType {
        argument: String,
        argument_type: String,
        input: String,
        path: Vec<PathSegment>,
        reason: Option<String>,
    },
    CommandNotFound {
        token: String,
    },
    MissingRequiredArgument {
        command: String,
        argument: String,
    },
    AmbiguousCommand {
        token: String,
        candidates: Vec<String>,
    },
    RequirementNotSatisfied {
        command: String,
        requirement: String,
    },
    UnknownArgument {
        command: String,
        name: String,
    },
    NoInputForArgument {
        command: String,
        argument: String,
    },
    NestingLimitExceeded {
        limit: usize,
    },
}

impl FailKind {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::TokenExpected { .. } => "token_expected",
            Self::InvalidInputForType { .. } => "invalid_input_for_type",
            Self::CommandNotFound { .. } => "command_not_found",
            Self::MissingRequiredArgument { .. } => "missing_required_argument",
            Self::AmbiguousCommand { .. } => "ambiguous_command",
            Self::RequirementNotSatisfied { .. } => "requirement_not_satisfied",
            Self::UnknownArgument { .. } => "unknown_argument",
            Self::NoInputForArgument { .. } => "no_input_for_argument",
            Self::NestingLimitExceeded { .. } => "nesting_limit_exceeded",
        }
    }

    fn primary_label(&self) -> String {
        match self {
            Self::TokenExpected { expected, .. } => format!("expected {}", expected),
            Self::InvalidInputForType { argument_type, .. } => {
                format!("not a valid {}", argument_type)
            }
            Self::CommandNotFound { .. } => "unknown command".into(),
            Self::MissingRequiredArgument { argument, .. } => format!("'{}' missing", argument),
            Self::AmbiguousCommand { .. } => "ambiguous".into(),
            Self::RequirementNotSatisfied { .. } => "requirement not met".into(),
            Self::UnknownArgument { .. } => "unknown argument".into(),
            Self::NoInputForArgument { .. } => "needs a value".into(),
            Self::NestingLimitExceeded { .. } => "nested too deeply".into(),
        }
    }
}

/// A terminal parse failure with its source context.
#[derive(Debug, Clone)]
pub struct ParseFail {
    pub kind: FailKind,
    pub source: SourceInfo,
}

impl ParseFail {
    pub fn new(kind: FailKind, text: &str, span: Span) -> Self {
        Self {
            kind,
            source: SourceInfo::new("input", text, span),
        }
    }

    /// Converts a grammar failure into a parse failure against `text`.
    pub fn from_literal(failure: &LiteralFailure, text: &str) -> Self {
        let span = point_span(text, failure.position);
        let kind = match &failure.kind {
            LiteralFailKind::TokenExpected(expected) => FailKind::TokenExpected {
                expected: expected.clone(),
                position: failure.position,
            },
            LiteralFailKind::NestingLimitExceeded { limit } => {
                FailKind::NestingLimitExceeded { limit: *limit }
            }
        };
        Self::new(kind, text, span)
    }

    pub fn span(&self) -> Span {
        self.source.span
    }

    /// Stable diagnostic code, `conch::parse::<kind>`.
    pub fn error_code(&self) -> String {
        format!("conch::parse::{}", self.kind.code_suffix())
    }

    fn help_text(&self) -> Option<String> {
        match &self.kind {
            FailKind::AmbiguousCommand { candidates, .. } => {
                Some(format!("could be any of: {}", candidates.join(", ")))
            }
            FailKind::InvalidInputForType { reason, path, .. } => {
                let at = if path.is_empty() {
                    String::new()
                } else {
                    let path: String = path.iter().map(ToString::to_string).collect();
                    format!("at {}: ", path)
                };
                reason.as_ref().map(|r| format!("{}{}", at, r))
            }
            FailKind::TokenExpected { expected, .. } if expected.chars.contains(&'"') => {
                Some("close the quoted string".into())
            }
            _ => None,
        }
    }
}

/// One-character span at `position`, or a zero-width one at end of input.
fn point_span(text: &str, position: usize) -> Span {
    match text.get(position..).and_then(|rest| rest.chars().next()) {
        Some(ch) => Span::new(position, position + ch.len_utf8()),
        None => Span::point(position.min(text.len())),
    }
}

impl std::error::Error for ParseFail {}

impl fmt::Display for ParseFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailKind::TokenExpected { expected, position } => {
                write!(f, "expected {} at position {}", expected, position)
            }
            FailKind::InvalidInputForType {
                argument,
                argument_type,
                input,
                ..
            } => write!(
                f,
                "invalid input '{}' for argument '{}' of type {}",
                input, argument, argument_type
            ),
            FailKind::CommandNotFound { token } => write!(f, "command not found: '{}'", token),
            FailKind::MissingRequiredArgument { command, argument } => write!(
                f,
                "missing required argument '{}' for command '{}'",
                argument, command
            ),
            FailKind::AmbiguousCommand { token, .. } => {
                write!(f, "ambiguous command '{}'", token)
            }
            FailKind::RequirementNotSatisfied {
                command,
                requirement,
            } => write!(
                f,
                "requirement not satisfied for command '{}': {}",
                command, requirement
            ),
            FailKind::UnknownArgument { command, name } => {
                write!(f, "unknown argument '--{}' for command '{}'", name, command)
            }
            FailKind::NoInputForArgument { command, argument } => write!(
                f,
                "no input given for argument '{}' of command '{}'",
                argument, command
            ),
            FailKind::NestingLimitExceeded { limit } => {
                write!(f, "literal nested deeper than {} levels", limit)
            }
        }
    }
}

impl Diagnostic for ParseFail {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.error_code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help_text()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.kind.primary_label()),
            self.source.span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source.source)
    }
}

// ============================================================================
// REGISTRATION AND HANDLER ERRORS
// ============================================================================

/// A command declaration that can never be parsed correctly.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RegistrationError {
    #[error("'{name}' is not a valid name: names are non-empty and contain no whitespace")]
    #[diagnostic(code(conch::register::invalid_name))]
    InvalidName { name: String },

    #[error("'{name}' is already used by a sibling of command '{command}'")]
    #[diagnostic(code(conch::register::duplicate_command))]
    DuplicateCommand { command: String, name: String },

    #[error("parent command '{parent}' is not registered")]
    #[diagnostic(code(conch::register::unknown_parent))]
    UnknownParent { parent: String },

    #[error("command '{command}' declares '{name}' twice")]
    #[diagnostic(code(conch::register::duplicate_argument))]
    DuplicateArgument { command: String, name: String },

    #[error("command '{command}' declares short flag '-{flag}' twice")]
    #[diagnostic(code(conch::register::duplicate_short_flag))]
    DuplicateShortFlag { command: String, flag: char },

    #[error("command '{command}' declares more than one multi-valued argument")]
    #[diagnostic(code(conch::register::multiple_varargs))]
    MultipleVarargs { command: String },

    #[error("multi-valued argument '{argument}' of command '{command}' must be declared last")]
    #[diagnostic(code(conch::register::vararg_not_last))]
    VarargNotLast { command: String, argument: String },

    #[error("argument '{argument}' of command '{command}' cannot have a short flag")]
    #[diagnostic(
        code(conch::register::invalid_short_flag),
        help("short flags are for single-valued arguments")
    )]
    InvalidShortFlag { command: String, argument: String },

    #[error("argument '{argument}' of command '{command}' is multi-valued but its type is {ty}")]
    #[diagnostic(code(conch::register::invalid_multiple))]
    InvalidMultiple {
        command: String,
        argument: String,
        ty: String,
    },
}

/// A handler refused or failed to run a bound command.
#[derive(Debug, Error, Diagnostic)]
pub enum HandlerError {
    #[error("command '{command}' failed: {message}")]
    #[diagnostic(code(conch::dispatch::failed))]
    Failed { command: String, message: String },

    #[error("argument '{argument}' of command '{command}' has no usable value")]
    #[diagnostic(code(conch::dispatch::bad_argument))]
    BadArgument { command: String, argument: String },
}

impl HandlerError {
    pub fn failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Failed {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn bad_argument(command: impl Into<String>, argument: impl Into<String>) -> Self {
        HandlerError::BadArgument {
            command: command.into(),
            argument: argument.into(),
        }
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a diagnostic with source snippet and labels to stderr.
pub fn print_error<E>(error: E)
where
    E: Diagnostic + Send + Sync + 'static,
{
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_and_label() {
        let fail = ParseFail::new(
            FailKind::CommandNotFound {
                token: "nope".into(),
            },
            "nope 1",
            Span::new(0, 4),
        );
        assert_eq!(fail.error_code(), "conch::parse::command_not_found");
        assert_eq!(fail.source.snippet(), "nope");
        assert_eq!(fail.to_string(), "command not found: 'nope'");
        let labels: Vec<_> = fail.labels().unwrap().collect();
        assert_eq!(labels[0].label(), Some("unknown command"));
    }

    #[test]
    fn test_point_span_at_end() {
        assert_eq!(point_span("ab", 2), Span::point(2));
        assert_eq!(point_span("a}", 1), Span::new(1, 2));
    }

    #[test]
    fn test_invalid_input_help_includes_path() {
        let fail = ParseFail::new(
            FailKind::InvalidInputForType {
                argument: "values".into(),
                argument_type: "map<string, int>".into(),
                input: "x".into(),
                path: vec![PathSegment::Key("a".into())],
                reason: Some("invalid digit found in string".into()),
            },
            "cmd {a=x}",
            Span::new(7, 8),
        );
        assert_eq!(
            fail.help_text().as_deref(),
            Some("at .a: invalid digit found in string")
        );
    }
}
