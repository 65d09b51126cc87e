//! Completion of partially typed command lines.
//!
//! The text before the cursor is split into the part that must already parse (`consumed`)
//! and the token being typed. The consumed part is replayed through the command parser in
//! prefix mode, which reports which command is open, what it has bound and whether a value
//! is still owed. The token being typed then decides what is offered:
//!
//! - an unfinished literal (`{a=[1,`) offers what the grammar expected at its failure point,
//!   plus fresh values of the nested type found by walking the open frames;
//! - a plain word is a filter over command names, argument names and value candidates;
//! - `--name=` offers values of the named argument.
//!
//! A line that fails anywhere before the cursor gets no suggestions.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::binder::{BoundArgument, Pending};
use crate::command::{Argument, CommandId, Multiplicity, ParseContext};
use crate::engine::{CommandParser, PrefixState};
use crate::syntax::input::quote;
use crate::syntax::{Frame, LiteralFailKind, LiteralFailure, TokenKind, TokenReader};
use crate::types::{ArgumentType, TypeKind};

/// What the cursor is in.
#[derive(Debug)]
enum CursorToken<'t> {
    /// An unfinished literal starting at `token`.
    Literal {
        consumed: &'t str,
        token: &'t str,
        failure: LiteralFailure,
    },
    /// A word, possibly empty when the cursor follows whitespace.
    Word { consumed: &'t str, partial: &'t str },
    /// The value part of `--name=value`.
    Assignment {
        consumed: &'t str,
        name: String,
        partial: &'t str,
    },
}

/// Suggests continuations for partial command lines.
#[derive(Debug, Clone)]
pub struct CompletionEngine {
    parser: CommandParser,
}

impl CompletionEngine {
    pub fn new(parser: CommandParser) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// Suggestions for the text before `cursor`, in display order.
    pub fn complete(&self, text: &str, cursor: usize, ctx: &ParseContext) -> Vec<String> {
        let mut cursor = cursor.min(text.len());
        while !text.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let prefix = &text[..cursor];

        let Some(token) = self.locate(prefix) else {
            return Vec::new();
        };
        trace!(?token, "classified completion cursor");
        let suggestions = match token {
            CursorToken::Literal {
                consumed,
                token,
                failure,
            } => self.complete_literal(prefix, consumed, token, &failure, ctx),
            CursorToken::Word { consumed, partial } => self.complete_word(consumed, partial, ctx),
            CursorToken::Assignment {
                consumed,
                name,
                partial,
            } => self.complete_assignment(consumed, &name, partial, ctx),
        };
        let suggestions = dedup(suggestions);
        debug!(prefix, count = suggestions.len(), "completion suggestions");
        suggestions
    }

    /// Suggestions with the cursor at the end of `text`.
    pub fn complete_line(&self, text: &str, ctx: &ParseContext) -> Vec<String> {
        self.complete(text, text.len(), ctx)
    }

    fn locate<'t>(&self, prefix: &'t str) -> Option<CursorToken<'t>> {
        let mut reader = TokenReader::new(prefix, self.parser.config().token_rules());
        let mut last = None;
        loop {
            let rest = &prefix[reader.position()..];
            let start = prefix.len() - rest.trim_start().len();
            match reader.next_token() {
                Ok(Some(token)) => last = Some(token),
                Ok(None) => break,
                Err(failure) if failure.position >= prefix.len() => {
                    return Some(CursorToken::Literal {
                        consumed: &prefix[..start],
                        token: &prefix[start..],
                        failure,
                    });
                }
                Err(failure) => {
                    trace!(position = failure.position, "prefix fails before the cursor");
                    return None;
                }
            }
        }

        let Some(last) = last.filter(|_| !prefix.ends_with(char::is_whitespace)) else {
            return Some(CursorToken::Word {
                consumed: prefix,
                partial: "",
            });
        };
        let consumed = &prefix[..last.span.start];
        match &last.kind {
            TokenKind::Named {
                name,
                assigned: Some(_),
            } => Some(CursorToken::Assignment {
                consumed,
                name: name.clone(),
                partial: last.raw.split_once('=').map_or("", |(_, value)| value),
            }),
            _ => Some(CursorToken::Word {
                consumed,
                partial: last.raw,
            }),
        }
    }

    fn prefix_state(&self, consumed: &str, ctx: &ParseContext) -> Option<PrefixState> {
        match self.parser.parse_prefix(consumed, ctx) {
            Ok(state) => Some(state),
            Err(fail) => {
                trace!(code = %fail.error_code(), "consumed text does not parse");
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // words
    // ------------------------------------------------------------------------

    fn complete_word(&self, consumed: &str, partial: &str, ctx: &ParseContext) -> Vec<String> {
        let Some(state) = self.prefix_state(consumed, ctx) else {
            return Vec::new();
        };
        let registry = self.parser.registry();
        let localizer = ctx.localizer();

        let (names, values) = match state {
            PrefixState::Root => (self.command_names(None, ctx), Vec::new()),
            PrefixState::Command {
                pending: Pending::Value(argument),
                ..
            } => (Vec::new(), argument.ty.fresh_candidates()),
            PrefixState::Command { id, bound, pending } => {
                let Some(command) = registry.get(id) else {
                    return Vec::new();
                };
                let remaining = command.arguments.remaining(&bound);

                let mut names = Vec::new();
                if bound.is_empty() {
                    names.extend(self.command_names(Some(id), ctx));
                }
                names.extend(remaining.iter().map(|a| format!("--{}", a.long_name())));
                if let Some(localizer) = localizer {
                    for argument in &remaining {
                        names.extend(
                            registry
                                .argument_names(id, argument, Some(localizer))
                                .into_iter()
                                .skip(argument.names.len())
                                .map(|name| format!("--{}", name)),
                        );
                    }
                }

                let mut values = Vec::new();
                if let Pending::Run { argument, count } = &pending {
                    values.extend(run_candidates(argument, *count));
                }
                values.extend(positional_candidates(&remaining));

                let mut tail = Vec::new();
                if matches!(pending, Pending::None) && remaining.iter().all(|a| a.optional) {
                    tail = self.command_names(None, ctx);
                }
                let exact = is_exact(partial, &names) || is_exact(partial, &tail);
                let mut out = Vec::new();
                if exact && self.parser.config().space_continuation {
                    out.push(" ".to_owned());
                }
                out.extend(filter(names, partial));
                out.extend(filter(values, partial));
                out.extend(filter(tail, partial));
                return out;
            }
        };

        let mut out = Vec::new();
        if is_exact(partial, &names) && self.parser.config().space_continuation {
            out.push(" ".to_owned());
        }
        out.extend(filter(names, partial));
        out.extend(filter(values, partial));
        out
    }

    fn complete_assignment(&self, consumed: &str, name: &str, partial: &str, ctx: &ParseContext) -> Vec<String> {
        let Some(PrefixState::Command { id, bound, .. }) = self.prefix_state(consumed, ctx) else {
            return Vec::new();
        };
        match self.named_argument(id, &bound, name, ctx) {
            Some(argument) => filter(argument.ty.fresh_candidates(), partial),
            None => Vec::new(),
        }
    }

    /// Names, aliases and localized names of the children of `parent` (roots for `None`).
    fn command_names(&self, parent: Option<CommandId>, ctx: &ParseContext) -> Vec<String> {
        let registry = self.parser.registry();
        registry
            .children_of(parent)
            .iter()
            .flat_map(|&child| registry.names_of(child, ctx.localizer()))
            .collect()
    }

    fn named_argument(
        &self,
        id: CommandId,
        bound: &[BoundArgument],
        name: &str,
        ctx: &ParseContext,
    ) -> Option<Arc<Argument>> {
        let registry = self.parser.registry();
        registry
            .get(id)?
            .arguments
            .remaining(bound)
            .into_iter()
            .find(|argument| {
                registry
                    .argument_names(id, argument, ctx.localizer())
                    .iter()
                    .any(|n| n == name)
            })
    }

    // ------------------------------------------------------------------------
    // literals
    // ------------------------------------------------------------------------

    fn complete_literal(
        &self,
        prefix: &str,
        consumed: &str,
        token: &str,
        failure: &LiteralFailure,
        ctx: &ParseContext,
    ) -> Vec<String> {
        let LiteralFailKind::TokenExpected(expected) = &failure.kind else {
            return Vec::new();
        };
        let Some(PrefixState::Command { id, bound, pending }) = self.prefix_state(consumed, ctx) else {
            return Vec::new();
        };

        let assigned = self
            .parser
            .config()
            .assign_syntax
            .then(|| token.strip_prefix("--"))
            .flatten()
            .and_then(|named| named.split_once('='));
        let target = match (assigned, &pending) {
            (Some((name, _)), _) => self.named_argument(id, &bound, name, ctx).map(|a| a.ty.clone()),
            (None, Pending::Value(argument)) => Some(argument.ty.clone()),
            (None, Pending::Run { argument, count }) => run_type(argument, *count),
            (None, Pending::None) => self
                .parser
                .registry()
                .get(id)
                .and_then(|command| positional_target(&command.arguments.remaining(&bound), token)),
        };
        let nested = target.and_then(|ty| navigate(ty, &failure.frames));
        trace!(frames = failure.frames.len(), nested = ?nested.as_ref().map(ArgumentType::name), "literal completion target");

        let present_keys: &[String] = match failure.frames.last() {
            Some(Frame::MapKey { keys, .. }) => keys,
            _ => &[],
        };
        let fresh = |ty: &ArgumentType| -> Vec<String> {
            ty.fresh_candidates()
                .into_iter()
                .filter(|candidate| !present_keys.contains(candidate))
                .collect()
        };

        let closers = || expected.chars.iter().map(char::to_string);
        if let Some(scalar) = &failure.last_scalar {
            let at_cursor = scalar.span.end == prefix.len() && scalar.depth == failure.frames.len();
            if at_cursor && scalar.open_quote {
                let candidates = nested.as_ref().map(&fresh).unwrap_or_default();
                return complete_quoted(candidates, &scalar.text, &prefix[scalar.span.start..]);
            }
            if at_cursor && !prefix[scalar.span.start..].starts_with('"') {
                let candidates = nested.as_ref().map(&fresh).unwrap_or_default();
                let mut out = Vec::new();
                if candidates.iter().any(|c| *c == scalar.text) {
                    out.extend(closers());
                }
                out.extend(filter(candidates, &scalar.text));
                return out;
            }
        }

        let mut out: Vec<String> = closers().collect();
        if expected.value {
            if let Some(ty) = &nested {
                out.extend(fresh(ty));
            }
        }
        out
    }
}

/// Candidates for a quoted string still open at the cursor, as closed quoted literals so
/// each one extends what was typed. A free-text type only offers closing the quote.
fn complete_quoted(candidates: Vec<String>, partial: &str, typed: &str) -> Vec<String> {
    let quoted = if candidates.is_empty() {
        vec![quote(partial)]
    } else {
        candidates
            .into_iter()
            .filter(|c| c.starts_with(partial))
            .map(|c| quote(&c))
            .collect()
    };
    // A lone backslash is kept as typed but rendered escaped.
    quoted.into_iter().filter(|q| q.starts_with(typed)).collect()
}

/// Candidates for the next value of a run that reached the cursor.
fn run_candidates(argument: &Argument, count: usize) -> Vec<String> {
    run_type(argument, count)
        .map(|ty| ty.fresh_candidates())
        .unwrap_or_default()
}

fn run_type(argument: &Argument, count: usize) -> Option<ArgumentType> {
    match argument.multiplicity {
        Multiplicity::Vararg => Some(argument.ty.clone()),
        Multiplicity::Multiple => argument.ty.element_type(count),
        Multiplicity::Single => None,
    }
}

/// Value candidates for the next unnamed input: each remaining argument in order, up to and
/// including the first required one.
fn positional_candidates(remaining: &[Arc<Argument>]) -> Vec<String> {
    let mut out = Vec::new();
    for argument in remaining {
        out.extend(argument.ty.fresh_candidates());
        if !argument.optional {
            break;
        }
    }
    out
}

/// The argument an unfinished top-level literal is being typed for: the first remaining
/// argument whose type accepts the literal's shape, skipping optional ones that do not.
fn positional_target(remaining: &[Arc<Argument>], token: &str) -> Option<ArgumentType> {
    let kind = match token.chars().next() {
        Some('{') => TypeKind::Map,
        Some('[') => TypeKind::List,
        _ => TypeKind::Single,
    };
    for argument in remaining {
        let accepts = match argument.ty.kind() {
            TypeKind::Any => true,
            other => other == kind,
        };
        if accepts {
            return Some(argument.ty.clone());
        }
        if !argument.optional {
            return None;
        }
    }
    None
}

/// Walks the open frames of a failed literal down to the type expected at the failure.
fn navigate(mut ty: ArgumentType, frames: &[Frame]) -> Option<ArgumentType> {
    for frame in frames {
        ty = match frame {
            Frame::List { index } => ty.element_type(*index)?,
            Frame::MapKey { index, .. } => ty.key_type(*index)?,
            Frame::MapValue { index, key } => ty.value_type(*index, key)?,
        };
    }
    Some(ty)
}

fn is_exact(partial: &str, names: &[String]) -> bool {
    !partial.is_empty() && names.iter().any(|name| name == partial)
}

fn filter(candidates: Vec<String>, partial: &str) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|c| c.starts_with(partial) && c != partial)
        .collect()
}

fn dedup(candidates: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
