//! Command-line parsing.
//!
//! [`CommandParser`] runs the whole pipeline over one line: read a token, resolve it to the
//! deepest matching command, bind the command's arguments, check its requirements, and start
//! over from the root with whatever is left. A line may therefore hold several commands,
//! either separated by the configured separator or simply following each other.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::binder::{ArgumentBinder, BindMode, BindOrigin, BoundArgument, BoundCommand, Pending};
use crate::command::{Command, CommandId, CommandRegistry, ParseContext};
use crate::config::ParserConfig;
use crate::diagnostics::{FailKind, ParseFail};
use crate::syntax::input::quote;
use crate::syntax::{Input, InputParser, Span, Token, TokenKind, TokenReader};

/// Where a prefix of a line leaves the parser, for completion.
#[derive(Debug)]
pub(crate) enum PrefixState {
    /// The next token starts a new command.
    Root,
    /// The last command is still open.
    Command {
        id: CommandId,
        bound: Vec<BoundArgument>,
        pending: Pending,
    },
}

/// Parses command lines against a registry. Cheap to clone and safe to share.
#[derive(Debug, Clone)]
pub struct CommandParser {
    registry: Arc<CommandRegistry>,
    config: ParserConfig,
}

impl CommandParser {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self::with_config(registry, ParserConfig::default())
    }

    pub fn with_config(registry: Arc<CommandRegistry>, config: ParserConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses a single literal value, with this parser's nesting limit.
    pub fn parse_literal(&self, text: &str) -> Result<Input, ParseFail> {
        InputParser::new(self.config.max_depth)
            .parse_literal(text)
            .map_err(|failure| ParseFail::from_literal(&failure, text))
    }

    /// Parses a line into one bound command per command it contains.
    ///
    /// A blank line yields no commands.
    pub fn parse(&self, text: &str, ctx: &ParseContext) -> Result<Vec<BoundCommand>, ParseFail> {
        debug!(text, "parsing command line");
        self.run(text, ctx, BindMode::Complete)
            .map(|(commands, _)| commands)
    }

    /// Parses a pre-split line. Each element is one token; elements that would not survive
    /// re-reading as a single token are quoted.
    pub fn parse_tokens(&self, tokens: &[&str], ctx: &ParseContext) -> Result<Vec<BoundCommand>, ParseFail> {
        let line = tokens
            .iter()
            .map(|token| quote_token(token))
            .collect::<Vec<_>>()
            .join(" ");
        self.parse(&line, ctx)
    }

    pub(crate) fn parse_prefix(&self, text: &str, ctx: &ParseContext) -> Result<PrefixState, ParseFail> {
        self.run(text, ctx, BindMode::Prefix).map(|(_, state)| state)
    }

    fn run(
        &self,
        text: &str,
        ctx: &ParseContext,
        mode: BindMode,
    ) -> Result<(Vec<BoundCommand>, PrefixState), ParseFail> {
        let mut reader = TokenReader::new(text, self.config.token_rules());
        let mut commands = Vec::new();
        let mut state = PrefixState::Root;

        loop {
            let token = match reader.next_token() {
                Ok(Some(token)) => token,
                Ok(None) => break,
                Err(failure) => {
                    debug!(position = failure.position, "literal failed to parse");
                    return Err(ParseFail::from_literal(&failure, text));
                }
            };
            if token.kind == TokenKind::Separator {
                state = PrefixState::Root;
                continue;
            }

            let (id, name_span) = self.resolve(&mut reader, &token, ctx)?;
            let Some(binder) = ArgumentBinder::new(&mut reader, &self.registry, &self.config, ctx, id, mode)
            else {
                return Err(not_found(&token, text));
            };
            let binding = binder.bind()?;

            match mode {
                BindMode::Complete => {
                    let Some(command) = self.registry.get(id).cloned() else {
                        return Err(not_found(&token, text));
                    };
                    self.check_requirements(id, &command, &binding.bound, ctx, name_span, text)?;
                    commands.push(BoundCommand {
                        name: self.registry.full_name(id).to_owned(),
                        id,
                        command,
                        arguments: binding.bound,
                        span: Span::new(name_span.start, binding.end.max(name_span.end)),
                    });
                }
                BindMode::Prefix => {
                    state = if binding.ended_by_separator || !reader.at_end() {
                        PrefixState::Root
                    } else {
                        PrefixState::Command {
                            id,
                            bound: binding.bound,
                            pending: binding.pending,
                        }
                    };
                }
            }
        }
        Ok((commands, state))
    }

    /// Greedy-deepest resolution over the token stream. Returns the command and the span of
    /// the tokens that named it.
    fn resolve(
        &self,
        reader: &mut TokenReader<'_>,
        first: &Token<'_>,
        ctx: &ParseContext,
    ) -> Result<(CommandId, Span), ParseFail> {
        let text = reader.source();
        let localizer = ctx.localizer();
        let Some(word) = first.word() else {
            return Err(not_found(first, text));
        };
        let mut current = match self.registry.match_child(None, word, localizer) {
            Ok(Some(id)) => id,
            Ok(None) => return Err(not_found(first, text)),
            Err(candidates) => return Err(self.ambiguous(first, &candidates, text)),
        };
        let mut span = first.span;

        loop {
            let before = reader.mark();
            let next = match reader.next_token() {
                Ok(Some(next)) => next,
                _ => {
                    reader.restore(before);
                    break;
                }
            };
            let child = match next.word() {
                Some(word) => self.registry.match_child(Some(current), word, localizer),
                None => Ok(None),
            };
            match child {
                Ok(Some(child)) => {
                    trace!(token = next.raw, "descending into sub-command");
                    current = child;
                    span = span.cover(next.span);
                }
                Ok(None) => {
                    reader.restore(before);
                    break;
                }
                Err(candidates) => return Err(self.ambiguous(&next, &candidates, text)),
            }
        }
        debug!(command = %self.registry.full_name(current), "resolved command");
        Ok((current, span))
    }

    fn ambiguous(&self, token: &Token<'_>, candidates: &[CommandId], text: &str) -> ParseFail {
        ParseFail::new(
            FailKind::AmbiguousCommand {
                token: token.raw.to_owned(),
                candidates: candidates
                    .iter()
                    .map(|&id| self.registry.full_name(id).to_owned())
                    .collect(),
            },
            text,
            token.span,
        )
    }

    fn check_requirements(
        &self,
        id: CommandId,
        command: &Command,
        bound: &[BoundArgument],
        ctx: &ParseContext,
        name_span: Span,
        text: &str,
    ) -> Result<(), ParseFail> {
        let unsatisfied = |requirement: String, span: Span| {
            debug!(command = %self.registry.full_name(id), %requirement, "requirement not satisfied");
            ParseFail::new(
                FailKind::RequirementNotSatisfied {
                    command: self.registry.full_name(id).to_owned(),
                    requirement,
                },
                text,
                span,
            )
        };

        if let Some(missing) = command
            .required_information
            .iter()
            .find(|info| ctx.information(info).is_none())
        {
            return Err(unsatisfied(format!("requires {}", missing), name_span));
        }
        if let Some(failed) = command.requirements.iter().find(|r| !r.is_satisfied(ctx)) {
            return Err(unsatisfied(failed.description.clone(), name_span));
        }

        let declared = command.arguments.all();
        for binding in bound.iter().filter(|b| b.origin != BindOrigin::Default) {
            let Some(argument) = declared.iter().find(|a| a.id == binding.id) else {
                continue;
            };
            if let Some(failed) = argument.requirements.iter().find(|r| !r.is_satisfied(ctx)) {
                return Err(unsatisfied(failed.description.clone(), binding.input.span()));
            }
        }
        Ok(())
    }
}

fn not_found(token: &Token<'_>, text: &str) -> ParseFail {
    ParseFail::new(
        FailKind::CommandNotFound {
            token: token.raw.to_owned(),
        },
        text,
        token.span,
    )
}

/// Quotes a pre-split token unless it reads back as itself.
fn quote_token(token: &str) -> Cow<'_, str> {
    let needs_quotes = token.is_empty()
        || token.starts_with('"')
        || token.contains('\\')
        || token.chars().any(char::is_whitespace);
    if token.starts_with(['{', '[']) || !needs_quotes {
        return Cow::Borrowed(token);
    }
    Cow::Owned(quote(token))
}
