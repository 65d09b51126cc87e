//! Command-line token reader.
//!
//! Splits a line into top-level tokens: literal values, `--name` / `--name=value` argument
//! names, and the command separator. Bundled short flags (`-rf`) are not recognised here;
//! whether `-rf` is a flag bundle or a value depends on the arguments declared by the command
//! being bound, so the binder inspects [`Token::raw`] for that.

use super::input::{Input, Span};
use super::parser::{InputParser, LiteralFailure};
use super::stream::{Mark, SourceCharStream};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// The configured command separator, unquoted.
    Separator,
    /// `--name`, or `--name=value` when assignment syntax is enabled. `--name=` with nothing
    /// after it carries an `Empty` input.
    Named {
        name: String,
        assigned: Option<Input>,
    },
    Value(Input),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub span: Span,
    /// Source text of the whole token, before unescaping.
    pub raw: &'a str,
}

impl<'a> Token<'a> {
    /// The text of an unquoted scalar token, the only kind that can name a command.
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Value(input @ Input::Single { .. }) if !self.raw.starts_with('"') => {
                input.as_single()
            }
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self.kind, TokenKind::Value(_))
    }

    /// Letters of a `-xyz` token, if it has that shape.
    pub fn short_flags(&self) -> Option<Vec<char>> {
        self.word()?;
        let rest = self.raw.strip_prefix('-')?;
        if rest.is_empty() || rest.starts_with('-') {
            return None;
        }
        Some(rest.chars().collect())
    }
}

/// Options the reader needs from the parser configuration.
#[derive(Debug, Clone)]
pub struct TokenRules {
    pub separator: String,
    pub assign_syntax: bool,
    pub max_depth: usize,
}

impl Default for TokenRules {
    fn default() -> Self {
        Self {
            separator: "&".into(),
            assign_syntax: true,
            max_depth: super::parser::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Backtrackable reader producing [`Token`]s.
#[derive(Debug, Clone)]
pub struct TokenReader<'a> {
    stream: SourceCharStream<'a>,
    parser: InputParser,
    rules: TokenRules,
}

impl<'a> TokenReader<'a> {
    pub fn new(text: &'a str, rules: TokenRules) -> Self {
        Self {
            stream: SourceCharStream::new(text),
            parser: InputParser::new(rules.max_depth),
            rules,
        }
    }

    pub fn source(&self) -> &'a str {
        self.stream.source()
    }

    pub fn position(&self) -> usize {
        self.stream.position()
    }

    pub fn mark(&self) -> Mark {
        self.stream.mark()
    }

    pub fn restore(&mut self, mark: Mark) {
        self.stream.restore(mark);
    }

    /// True when only whitespace is left.
    pub fn at_end(&self) -> bool {
        self.stream.remaining().trim_start().is_empty()
    }

    /// Reads the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, LiteralFailure> {
        self.stream.skip_whitespace();
        if self.stream.is_at_end() {
            return Ok(None);
        }
        let start = self.stream.position();

        if self.stream.peek() == Some('-') && self.stream.peek_second() == Some('-') {
            if let Some(token) = self.named(start)? {
                return Ok(Some(token));
            }
        }

        let input = self.parser.parse_value(&mut self.stream)?;
        let span = Span::new(start, self.stream.position());
        let raw = &self.stream.source()[span.start..span.end];
        let kind = if raw == self.rules.separator {
            TokenKind::Separator
        } else {
            TokenKind::Value(input)
        };
        Ok(Some(Token { kind, span, raw }))
    }

    /// Peeks the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Option<Token<'a>>, LiteralFailure> {
        let mark = self.mark();
        let token = self.next_token();
        self.restore(mark);
        token
    }

    fn named(&mut self, start: usize) -> Result<Option<Token<'a>>, LiteralFailure> {
        let mark = self.stream.mark();
        self.stream.next();
        self.stream.next();
        let name_start = self.stream.position();
        while let Some(ch) = self.stream.peek() {
            if ch.is_whitespace() || (ch == '=' && self.rules.assign_syntax) {
                break;
            }
            self.stream.next();
        }
        let name = self.stream.slice_from(name_start).to_owned();
        if name.is_empty() {
            // A bare `--` is an ordinary value.
            self.stream.restore(mark);
            return Ok(None);
        }

        let assigned = if self.rules.assign_syntax && self.stream.eat('=') {
            match self.stream.peek() {
                None => Some(Input::empty(Span::point(self.stream.position()))),
                Some(c) if c.is_whitespace() => {
                    Some(Input::empty(Span::point(self.stream.position())))
                }
                Some(_) => Some(self.parser.parse_value(&mut self.stream)?),
            }
        } else {
            None
        };

        let span = Span::new(start, self.stream.position());
        Ok(Some(Token {
            kind: TokenKind::Named { name, assigned },
            span,
            raw: &self.stream.source()[span.start..span.end],
        }))
    }
}
