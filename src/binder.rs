//! Argument binding.
//!
//! The binder reads tokens after a resolved command name and assigns them to the command's
//! declared arguments:
//!
//! - `--name value`, `--name=value` and bundled short flags (`-rf`) bind by name.
//! - Unnamed values fill the remaining arguments left to right. An optional argument that
//!   rejects a value is skipped and the value is offered to the next one.
//! - A multi-valued argument takes a run of unnamed values. A vararg run picks up again
//!   after flags and named arguments: `cp a -v b` binds both files.
//! - The first value no remaining argument accepts ends the command; it is left unread so
//!   the next command can start with it.
//!
//! Remaining arguments are re-queried from the command's [`ArgumentSource`] after every
//! bind, so dynamic sources see what has been bound so far.
//!
//! [`ArgumentSource`]: crate::command::ArgumentSource

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::command::{Argument, Command, CommandId, CommandRegistry, Multiplicity, ParseContext};
use crate::config::{ParserConfig, ShortFlagPolicy};
use crate::diagnostics::{FailKind, ParseFail};
use crate::syntax::{Input, Span, Token, TokenKind, TokenReader};
use crate::types::{ArgumentType, FromValue, PathSegment, TypeKind, TypeMismatch, Value};

// ============================================================================
// BOUND RESULTS
// ============================================================================

/// How an argument received its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindOrigin {
    Positional,
    Named,
    Flag,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundArgument {
    pub id: String,
    pub input: Input,
    pub value: Value,
    pub origin: BindOrigin,
}

/// A resolved command with its bound arguments, ready to be handed to a handler.
#[derive(Debug, Clone, Serialize)]
pub struct BoundCommand {
    /// Full, space-separated command name.
    pub name: String,
    #[serde(skip)]
    pub id: CommandId,
    #[serde(skip)]
    pub command: Arc<Command>,
    pub arguments: Vec<BoundArgument>,
    pub span: Span,
}

impl BoundCommand {
    pub fn argument(&self, id: &str) -> Option<&BoundArgument> {
        self.arguments.iter().find(|a| a.id == id)
    }

    pub fn is_bound(&self, id: &str) -> bool {
        self.argument(id).is_some()
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.argument(id).map(|a| &a.value)
    }

    pub fn input(&self, id: &str) -> Option<&Input> {
        self.argument(id).map(|a| &a.input)
    }

    /// Typed access to a bound value.
    pub fn get<T: FromValue>(&self, id: &str) -> Option<T> {
        self.value(id).and_then(T::from_value)
    }
}

// ============================================================================
// BINDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    /// A whole line: missing required arguments fail, defaults are applied.
    Complete,
    /// The text before a completion cursor: binding stops quietly at end of input.
    Prefix,
}

/// What was still open when a prefix ran out.
#[derive(Debug, Clone, Default)]
pub(crate) enum Pending {
    #[default]
    None,
    /// A named argument or trailing short flag whose value has not been typed yet.
    Value(Arc<Argument>),
    /// A multi-valued argument whose run of values reached the end of input.
    Run { argument: Arc<Argument>, count: usize },
}

#[derive(Debug)]
pub(crate) struct Binding {
    pub bound: Vec<BoundArgument>,
    /// Byte offset just past the last token that belongs to the command.
    pub end: usize,
    pub ended_by_separator: bool,
    pub pending: Pending,
}

pub(crate) struct ArgumentBinder<'p, 'a> {
    reader: &'p mut TokenReader<'a>,
    registry: &'p CommandRegistry,
    config: &'p ParserConfig,
    ctx: &'p ParseContext,
    id: CommandId,
    command: Arc<Command>,
    mode: BindMode,
    bound: Vec<BoundArgument>,
    pending: Pending,
    /// The vararg argument whose run was bound last, if no positional has bound since.
    open_run: Option<Arc<Argument>>,
    end: usize,
}

impl<'p, 'a> ArgumentBinder<'p, 'a> {
    pub(crate) fn new(
        reader: &'p mut TokenReader<'a>,
        registry: &'p CommandRegistry,
        config: &'p ParserConfig,
        ctx: &'p ParseContext,
        id: CommandId,
        mode: BindMode,
    ) -> Option<Self> {
        let command = registry.get(id)?.clone();
        let end = reader.position();
        Some(Self {
            reader,
            registry,
            config,
            ctx,
            id,
            command,
            mode,
            bound: Vec::new(),
            pending: Pending::None,
            open_run: None,
            end,
        })
    }

    pub(crate) fn bind(mut self) -> Result<Binding, ParseFail> {
        let mut ended_by_separator = false;
        loop {
            let remaining = self.remaining();
            let before = self.reader.mark();
            let Some(token) = self.next_token()? else {
                break;
            };
            match &token.kind {
                TokenKind::Separator => {
                    ended_by_separator = true;
                    break;
                }
                TokenKind::Named { name, assigned } => {
                    self.bind_named(&remaining, &token, name, assigned.clone())?;
                }
                TokenKind::Value(input) => {
                    if let Some(arguments) = self.flag_bundle(&remaining, &token) {
                        self.bind_flags(arguments, &token)?;
                    } else if !self.bind_positional(&remaining, input)? && !self.extend_run(input)? {
                        trace!(token = token.raw, "token ends the command");
                        self.reader.restore(before);
                        break;
                    }
                }
            }
            self.end = self.reader.position();
        }
        self.finish(ended_by_separator)
    }

    fn full_name(&self) -> String {
        self.registry.full_name(self.id).to_owned()
    }

    fn remaining(&self) -> Vec<Arc<Argument>> {
        self.command.arguments.remaining(&self.bound)
    }

    fn fail(&self, kind: FailKind, span: Span) -> ParseFail {
        ParseFail::new(kind, self.reader.source(), span)
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseFail> {
        let source = self.reader.source();
        self.reader
            .next_token()
            .map_err(|failure| ParseFail::from_literal(&failure, source))
    }

    fn push(&mut self, bound: BoundArgument) {
        debug!(
            command = %self.registry.full_name(self.id),
            argument = %bound.id,
            origin = ?bound.origin,
            "bound argument"
        );
        self.bound.push(bound);
    }

    // ------------------------------------------------------------------------
    // named arguments and flags
    // ------------------------------------------------------------------------

    fn find_named(&self, remaining: &[Arc<Argument>], name: &str) -> Option<Arc<Argument>> {
        let localizer = self.ctx.localizer();
        remaining
            .iter()
            .find(|argument| {
                self.registry
                    .argument_names(self.id, argument, localizer)
                    .iter()
                    .any(|n| n == name)
            })
            .cloned()
    }

    fn bind_named(
        &mut self,
        remaining: &[Arc<Argument>],
        token: &Token<'a>,
        name: &str,
        assigned: Option<Input>,
    ) -> Result<(), ParseFail> {
        let Some(argument) = self.find_named(remaining, name) else {
            return Err(self.fail(
                FailKind::UnknownArgument {
                    command: self.full_name(),
                    name: name.to_owned(),
                },
                token.span,
            ));
        };

        match assigned {
            Some(input) if input.is_empty() => Err(self.no_input(&argument, token.span)),
            Some(input) => {
                let bound = self.bind_assigned(&argument, input)?;
                self.push(bound);
                Ok(())
            }
            None if argument.is_switch() => {
                self.bind_switch(&argument, token, BindOrigin::Named);
                Ok(())
            }
            None => self.bind_following_value(&argument, token, BindOrigin::Named),
        }
    }

    /// A switch takes an explicit `true`/`false` if one follows, and is `true` otherwise.
    fn bind_switch(&mut self, argument: &Argument, token: &Token<'a>, origin: BindOrigin) {
        let before = self.reader.mark();
        let explicit = match self.reader.next_token() {
            Ok(Some(next)) => next
                .word()
                .and_then(|word| parse_bool(word).map(|value| (value, word.to_owned(), next.span))),
            _ => None,
        };
        let bound = match explicit {
            Some((value, text, span)) => BoundArgument {
                id: argument.id.clone(),
                input: Input::Single { value: text, span },
                value: Value::Bool(value),
                origin,
            },
            None => {
                self.reader.restore(before);
                BoundArgument {
                    id: argument.id.clone(),
                    input: Input::empty(token.span),
                    value: Value::Bool(true),
                    origin,
                }
            }
        };
        self.push(bound);
    }

    fn bind_following_value(
        &mut self,
        argument: &Arc<Argument>,
        token: &Token<'a>,
        origin: BindOrigin,
    ) -> Result<(), ParseFail> {
        let before = self.reader.mark();
        match self.next_token()? {
            Some(Token {
                kind: TokenKind::Value(input),
                ..
            }) => {
                let bound = self.bind_value(argument, input, origin)?;
                self.push(bound);
                Ok(())
            }
            _ => {
                self.reader.restore(before);
                if self.mode == BindMode::Prefix && self.reader.at_end() {
                    self.pending = Pending::Value(argument.clone());
                    return Ok(());
                }
                Err(self.no_input(argument, token.span))
            }
        }
    }

    fn no_input(&self, argument: &Argument, span: Span) -> ParseFail {
        self.fail(
            FailKind::NoInputForArgument {
                command: self.full_name(),
                argument: argument.id.clone(),
            },
            span,
        )
    }

    /// Arguments named by a `-xyz` token, if every letter is a declared short flag and the
    /// bundle is allowed by the short-flag policy.
    fn flag_bundle(&self, remaining: &[Arc<Argument>], token: &Token<'_>) -> Option<Vec<Arc<Argument>>> {
        let flags = token.short_flags()?;
        let mut arguments: Vec<Arc<Argument>> = Vec::with_capacity(flags.len());
        for flag in flags {
            let argument = remaining.iter().find(|a| a.short == Some(flag))?;
            if arguments.iter().any(|a| a.id == argument.id) {
                return None;
            }
            arguments.push(argument.clone());
        }
        let (last, init) = arguments.split_last()?;
        if init.iter().any(|a| !a.is_switch()) {
            return None;
        }
        if !last.is_switch() && self.config.short_flags == ShortFlagPolicy::BooleanOnly {
            return None;
        }
        Some(arguments)
    }

    fn bind_flags(&mut self, arguments: Vec<Arc<Argument>>, token: &Token<'a>) -> Result<(), ParseFail> {
        for argument in arguments {
            if argument.is_switch() {
                self.push(BoundArgument {
                    id: argument.id.clone(),
                    input: Input::empty(token.span),
                    value: Value::Bool(true),
                    origin: BindOrigin::Flag,
                });
            } else {
                self.bind_following_value(&argument, token, BindOrigin::Flag)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // values
    // ------------------------------------------------------------------------

    /// Offers an unnamed value to the remaining arguments in order. Returns false when no
    /// argument took it.
    fn bind_positional(&mut self, remaining: &[Arc<Argument>], input: &Input) -> Result<bool, ParseFail> {
        let after = self.reader.mark();
        for argument in remaining {
            match self.bind_value(argument, input.clone(), BindOrigin::Positional) {
                Ok(bound) => {
                    self.push(bound);
                    return Ok(true);
                }
                Err(fail) if argument.optional && rejects_first_value(argument, &fail) => {
                    trace!(argument = %argument.id, "optional argument rejected value, skipping");
                    self.reader.restore(after);
                    self.pending = Pending::None;
                }
                Err(fail) => return Err(fail),
            }
        }
        Ok(false)
    }

    /// Converts `first` (and, for multi-valued arguments, the run of values after it).
    fn bind_value(
        &mut self,
        argument: &Arc<Argument>,
        first: Input,
        origin: BindOrigin,
    ) -> Result<BoundArgument, ParseFail> {
        let (input, value) = match argument.multiplicity {
            Multiplicity::Single => {
                let value = self.convert(argument, &argument.ty, &first)?;
                (first, value)
            }
            Multiplicity::Multiple => {
                let input = if matches!(first, Input::Single { .. })
                    && argument.ty.kind() == TypeKind::List
                {
                    list_input(self.collect_run(argument, first)?)
                } else {
                    first
                };
                let value = self.convert(argument, &argument.ty, &input)?;
                (input, value)
            }
            Multiplicity::Vararg => {
                let items = self.collect_run(argument, first)?;
                self.convert_each(argument, items, 0)?
            }
        };
        if argument.multiplicity == Multiplicity::Vararg {
            self.open_run = Some(argument.clone());
        } else if origin == BindOrigin::Positional {
            self.open_run = None;
        }
        Ok(BoundArgument {
            id: argument.id.clone(),
            input,
            value,
            origin,
        })
    }

    /// Appends an unnamed value, and the run after it, to the open vararg run. Returns false
    /// when there is no open run or its type rejects the value.
    fn extend_run(&mut self, input: &Input) -> Result<bool, ParseFail> {
        let Some(argument) = self.open_run.clone() else {
            return Ok(false);
        };
        let Some(index) = self.bound.iter().rposition(|b| b.id == argument.id) else {
            return Ok(false);
        };
        if argument.ty.convert(input).is_err() {
            return Ok(false);
        }

        let offset = match &self.bound[index].input {
            Input::List { items, .. } => items.len(),
            _ => 1,
        };
        let items = self.collect_run(&argument, input.clone())?;
        if let Pending::Run { count, .. } = &mut self.pending {
            *count += offset;
        }
        let (more_input, more_value) = self.convert_each(&argument, items, offset)?;

        let bound = &mut self.bound[index];
        if let (Input::List { items, span }, Input::List { items: more, span: more_span }) =
            (&mut bound.input, more_input)
        {
            items.extend(more);
            *span = span.cover(more_span);
        }
        if let (Value::List(values), Value::List(more)) = (&mut bound.value, more_value) {
            values.extend(more);
        }
        debug!(argument = %argument.id, "vararg run continued");
        Ok(true)
    }

    /// `--name=value`: one literal, never a run.
    fn bind_assigned(&mut self, argument: &Argument, input: Input) -> Result<BoundArgument, ParseFail> {
        let (input, value) = match argument.multiplicity {
            Multiplicity::Single => {
                let value = self.convert(argument, &argument.ty, &input)?;
                (input, value)
            }
            Multiplicity::Multiple => {
                let input = match input {
                    single @ Input::Single { .. } if argument.ty.kind() == TypeKind::List => {
                        list_input(vec![single])
                    }
                    other => other,
                };
                let value = self.convert(argument, &argument.ty, &input)?;
                (input, value)
            }
            Multiplicity::Vararg => {
                let items = match input {
                    Input::List { items, .. } => items,
                    other => vec![other],
                };
                self.convert_each(argument, items, 0)?
            }
        };
        Ok(BoundArgument {
            id: argument.id.clone(),
            input,
            value,
            origin: BindOrigin::Named,
        })
    }

    /// `first` plus every following unnamed value that is not a flag bundle.
    fn collect_run(&mut self, argument: &Arc<Argument>, first: Input) -> Result<Vec<Input>, ParseFail> {
        let mut items = vec![first];
        loop {
            let before = self.reader.mark();
            match self.next_token()? {
                Some(token) if token.is_value() => {
                    if self.flag_bundle(&self.remaining(), &token).is_some() {
                        self.reader.restore(before);
                        break;
                    }
                    if let TokenKind::Value(input) = token.kind {
                        items.push(input);
                    }
                }
                Some(_) => {
                    self.reader.restore(before);
                    break;
                }
                None => {
                    if self.mode == BindMode::Prefix {
                        self.pending = Pending::Run {
                            argument: argument.clone(),
                            count: items.len(),
                        };
                    }
                    break;
                }
            }
        }
        Ok(items)
    }

    /// Converts each item of a run. `offset` is the index of the first item in the whole run.
    fn convert_each(&self, argument: &Argument, items: Vec<Input>, offset: usize) -> Result<(Input, Value), ParseFail> {
        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                argument.ty.convert(item).map_err(|mut mismatch| {
                    mismatch.path.insert(0, PathSegment::Index(offset + i));
                    self.mismatch(argument, mismatch)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((list_input(items), Value::List(values)))
    }

    fn convert(&self, argument: &Argument, ty: &ArgumentType, input: &Input) -> Result<Value, ParseFail> {
        ty.convert(input)
            .map_err(|mismatch| self.mismatch(argument, mismatch))
    }

    fn mismatch(&self, argument: &Argument, mismatch: TypeMismatch) -> ParseFail {
        self.fail(
            FailKind::InvalidInputForType {
                argument: argument.id.clone(),
                argument_type: mismatch.expected,
                input: mismatch.input,
                path: mismatch.path,
                reason: mismatch.reason,
            },
            mismatch.span,
        )
    }

    // ------------------------------------------------------------------------
    // end of command
    // ------------------------------------------------------------------------

    fn finish(mut self, ended_by_separator: bool) -> Result<Binding, ParseFail> {
        if self.mode == BindMode::Complete {
            let remaining = self.remaining();
            if let Some(missing) = remaining.iter().find(|a| !a.optional) {
                return Err(self.fail(
                    FailKind::MissingRequiredArgument {
                        command: self.full_name(),
                        argument: missing.id.clone(),
                    },
                    Span::point(self.end),
                ));
            }
            for argument in remaining {
                let value = match (&argument.default, argument.multiplicity.is_multi()) {
                    (Some(default), _) => default.clone(),
                    (None, true) => argument.empty_multi_value(),
                    (None, false) => continue,
                };
                self.push(BoundArgument {
                    id: argument.id.clone(),
                    input: Input::empty(Span::point(self.end)),
                    value,
                    origin: BindOrigin::Default,
                });
            }
        }
        Ok(Binding {
            bound: self.bound,
            end: self.end,
            ended_by_separator,
            pending: self.pending,
        })
    }
}

/// Whether a conversion failure means the argument does not take the value at all, as
/// opposed to a run that started binding and then met a bad element.
fn rejects_first_value(argument: &Argument, fail: &ParseFail) -> bool {
    match &fail.kind {
        FailKind::InvalidInputForType { path, .. } => {
            !argument.multiplicity.is_multi()
                || path.first().map_or(true, |segment| *segment == PathSegment::Index(0))
        }
        _ => false,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Wraps a run of values as one list input spanning them all.
fn list_input(items: Vec<Input>) -> Input {
    let span = items
        .iter()
        .map(Input::span)
        .reduce(Span::cover)
        .unwrap_or_default();
    Input::List { items, span }
}
