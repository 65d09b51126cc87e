//! Literal grammar.
//!
//! ```text
//! input    := map | list | string
//! map      := '{' (pair (',' pair)*)? '}'
//! pair     := input '=' input
//! list     := '[' (input (',' input)*)? ']'
//! string   := quoted | bareword
//! ```
//!
//! The parser is recursive descent over a [`SourceCharStream`]. It never throws away a
//! half-built node: a failure is returned by value together with the container frames that
//! were open when it happened, which is what completion replays to decide what may come next.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use super::input::{Input, Span};
use super::stream::SourceCharStream;

// ============================================================================
// FAILURES
// ============================================================================

/// The exact set of tokens acceptable at a failure point.
///
/// `chars` are structural characters (closers, separators, `=`, a closing quote). `value`
/// is set when a fresh value may also start at that point. An empty set with `value ==
/// false` means only the end of input is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedTokens {
    pub chars: Vec<char>,
    pub value: bool,
}

impl ExpectedTokens {
    pub fn chars(chars: &[char]) -> Self {
        Self {
            chars: chars.to_vec(),
            value: false,
        }
    }

    /// `chars` or the start of a value.
    pub fn chars_or_value(chars: &[char]) -> Self {
        Self {
            chars: chars.to_vec(),
            value: true,
        }
    }

    pub fn end_of_input() -> Self {
        Self::chars(&[])
    }
}

impl fmt::Display for ExpectedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.chars.iter().map(|c| format!("'{c}'")).collect();
        if self.value {
            parts.push("a value".into());
        }
        match parts.len() {
            0 => f.write_str("end of input"),
            1 => f.write_str(&parts[0]),
            n => write!(f, "{} or {}", parts[..n - 1].join(", "), parts[n - 1]),
        }
    }
}

/// An open container at the moment of a failure, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Inside a list, at element `index`.
    List { index: usize },
    /// Inside a map, at the key of entry `index`; `keys` holds the keys already read.
    MapKey { index: usize, keys: Vec<String> },
    /// Inside a map, at the value for `key`.
    MapValue { index: usize, key: String },
}

/// The last scalar read before a failure, with the number of frames open around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarTrace {
    /// Unescaped text.
    pub text: String,
    pub span: Span,
    pub depth: usize,
    /// The scalar is a quoted string whose closing quote never came.
    pub open_quote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralFailKind {
    TokenExpected(ExpectedTokens),
    NestingLimitExceeded { limit: usize },
}

/// A grammar failure with enough context for diagnostics and completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralFailure {
    pub kind: LiteralFailKind,
    pub position: usize,
    pub frames: Vec<Frame>,
    pub last_scalar: Option<ScalarTrace>,
}

impl LiteralFailure {
    pub fn expected(&self) -> Option<&ExpectedTokens> {
        match &self.kind {
            LiteralFailKind::TokenExpected(expected) => Some(expected),
            LiteralFailKind::NestingLimitExceeded { .. } => None,
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Reads literals from a character stream.
#[derive(Debug, Clone, Copy)]
pub struct InputParser {
    max_depth: usize,
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl InputParser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parses `text` as exactly one literal, surrounded by optional whitespace.
    pub fn parse_literal(&self, text: &str) -> Result<Input, LiteralFailure> {
        let mut stream = SourceCharStream::new(text);
        stream.skip_whitespace();
        let input = self.parse_value(&mut stream)?;
        stream.skip_whitespace();
        if !stream.is_at_end() {
            return Err(LiteralFailure {
                kind: LiteralFailKind::TokenExpected(ExpectedTokens::end_of_input()),
                position: stream.position(),
                frames: Vec::new(),
                last_scalar: None,
            });
        }
        Ok(input)
    }

    /// Parses one top-level value starting at the cursor. A top-level bareword runs until
    /// whitespace; containers and quoted strings run until their closing character.
    pub fn parse_value(&self, stream: &mut SourceCharStream<'_>) -> Result<Input, LiteralFailure> {
        let mut state = GrammarState::new(self.max_depth);
        let result = state.value(stream, Context::TopLevel);
        result.map_err(|(kind, position)| state.failure(kind, position))
    }
}

// ============================================================================
// GRAMMAR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    TopLevel,
    Nested,
}

type Step<T> = Result<T, (LiteralFailKind, usize)>;

struct GrammarState {
    max_depth: usize,
    frames: Vec<Frame>,
    last_scalar: Option<ScalarTrace>,
}

impl GrammarState {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            frames: Vec::new(),
            last_scalar: None,
        }
    }

    fn failure(self, kind: LiteralFailKind, position: usize) -> LiteralFailure {
        trace!(?kind, position, depth = self.frames.len(), "literal grammar failed");
        LiteralFailure {
            kind,
            position,
            frames: self.frames,
            last_scalar: self.last_scalar,
        }
    }

    fn value(&mut self, stream: &mut SourceCharStream<'_>, context: Context) -> Step<Input> {
        match stream.peek() {
            Some('{') => self.map(stream),
            Some('[') => self.list(stream),
            Some('"') => self.quoted(stream),
            _ => Ok(self.bareword(stream, context)),
        }
    }

    fn enter(&mut self, stream: &SourceCharStream<'_>, frame: Frame) -> Step<()> {
        if self.frames.len() >= self.max_depth {
            return Err((
                LiteralFailKind::NestingLimitExceeded {
                    limit: self.max_depth,
                },
                stream.position(),
            ));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn set_frame(&mut self, frame: Frame) {
        if let Some(top) = self.frames.last_mut() {
            *top = frame;
        }
    }

    fn list(&mut self, stream: &mut SourceCharStream<'_>) -> Step<Input> {
        let start = stream.position();
        self.enter(stream, Frame::List { index: 0 })?;
        stream.next();
        stream.skip_whitespace();

        let mut items = Vec::new();
        if stream.eat(']') {
            self.frames.pop();
            return Ok(Input::List {
                items,
                span: Span::new(start, stream.position()),
            });
        }

        loop {
            let index = items.len();
            self.set_frame(Frame::List { index });
            let closers: &[char] = if index == 0 { &[']'] } else { &[] };
            self.require_value_start(stream, closers)?;
            items.push(self.value(stream, Context::Nested)?);
            stream.skip_whitespace();

            if stream.eat(',') {
                stream.skip_whitespace();
                continue;
            }
            if stream.eat(']') {
                break;
            }
            return Err(expected(&[',', ']'], false, stream));
        }

        self.frames.pop();
        Ok(Input::List {
            items,
            span: Span::new(start, stream.position()),
        })
    }

    fn map(&mut self, stream: &mut SourceCharStream<'_>) -> Step<Input> {
        let start = stream.position();
        self.enter(
            stream,
            Frame::MapKey {
                index: 0,
                keys: Vec::new(),
            },
        )?;
        stream.next();
        stream.skip_whitespace();

        let mut entries: Vec<(Input, Input)> = Vec::new();
        let mut keys: Vec<String> = Vec::new();
        if stream.eat('}') {
            self.frames.pop();
            return Ok(Input::Map {
                entries,
                span: Span::new(start, stream.position()),
            });
        }

        loop {
            let index = entries.len();
            self.set_frame(Frame::MapKey {
                index,
                keys: keys.clone(),
            });
            let closers: &[char] = if index == 0 { &['}'] } else { &[] };
            self.require_value_start(stream, closers)?;
            let key = self.value(stream, Context::Nested)?;
            stream.skip_whitespace();
            if !stream.eat('=') {
                return Err(expected(&['='], false, stream));
            }
            stream.skip_whitespace();

            let key_text = key.as_single().map(str::to_owned).unwrap_or_else(|| key.render());
            self.set_frame(Frame::MapValue {
                index,
                key: key_text.clone(),
            });
            self.require_value_start(stream, &[])?;
            let value = self.value(stream, Context::Nested)?;
            keys.push(key_text);
            entries.push((key, value));
            stream.skip_whitespace();

            if stream.eat(',') {
                stream.skip_whitespace();
                continue;
            }
            if stream.eat('}') {
                break;
            }
            return Err(expected(&[',', '}'], false, stream));
        }

        self.frames.pop();
        Ok(Input::Map {
            entries,
            span: Span::new(start, stream.position()),
        })
    }

    /// Fails unless a value can start at the cursor. `closers` are the structural characters
    /// that would also be accepted here (handled by the caller).
    fn require_value_start(&self, stream: &SourceCharStream<'_>, closers: &[char]) -> Step<()> {
        match stream.peek() {
            None | Some(',' | '=' | '}' | ']') => Err(expected(closers, true, stream)),
            Some(_) => Ok(()),
        }
    }

    fn quoted(&mut self, stream: &mut SourceCharStream<'_>) -> Step<Input> {
        let start = stream.position();
        stream.next();
        let mut value = String::new();
        loop {
            match stream.next() {
                None => {
                    self.record_scalar(&value, Span::new(start, stream.position()));
                    if let Some(trace) = &mut self.last_scalar {
                        trace.open_quote = true;
                    }
                    return Err(expected(&['"'], false, stream));
                }
                Some('"') => break,
                Some('\\') => match stream.peek() {
                    Some(c @ ('"' | '\\')) => {
                        stream.next();
                        value.push(c);
                    }
                    _ => value.push('\\'),
                },
                Some(c) => value.push(c),
            }
        }
        let span = Span::new(start, stream.position());
        self.record_scalar(&value, span);
        Ok(Input::Single { value, span })
    }

    fn bareword(&mut self, stream: &mut SourceCharStream<'_>, context: Context) -> Input {
        let start = stream.position();
        let mut value = String::new();
        // Byte length of `value` up to its last non-whitespace character, and the matching
        // stream offset, so trailing whitespace inside containers can be dropped.
        let mut kept = 0;
        let mut end = start;

        while let Some(ch) = stream.peek() {
            let stop = match context {
                Context::TopLevel => ch.is_whitespace(),
                Context::Nested => matches!(ch, ',' | '=' | '}' | ']'),
            };
            if stop {
                break;
            }
            match ch {
                '\\' => {
                    stream.next();
                    match stream.next() {
                        Some(escaped) => value.push(escaped),
                        None => value.push('\\'),
                    }
                }
                '{' | '[' | '"' if stream.position() > start => {
                    let mark = stream.mark();
                    let group_start = stream.position();
                    if scan_group(stream) {
                        value.push_str(stream.slice_from(group_start));
                    } else {
                        stream.restore(mark);
                        stream.next();
                        value.push(ch);
                    }
                }
                _ => {
                    stream.next();
                    value.push(ch);
                }
            }
            if !ch.is_whitespace() || context == Context::TopLevel {
                kept = value.len();
                end = stream.position();
            }
        }

        value.truncate(kept);
        let span = Span::new(start, end);
        self.record_scalar(&value, span);
        Input::Single { value, span }
    }

    fn record_scalar(&mut self, text: &str, span: Span) {
        self.last_scalar = Some(ScalarTrace {
            text: text.to_owned(),
            span,
            depth: self.frames.len(),
            open_quote: false,
        });
    }
}

fn expected(chars: &[char], value: bool, stream: &SourceCharStream<'_>) -> (LiteralFailKind, usize) {
    (
        LiteralFailKind::TokenExpected(ExpectedTokens {
            chars: chars.to_vec(),
            value,
        }),
        stream.position(),
    )
}

/// Scans a balanced `{...}` / `[...]` group or a closed `"..."` section starting at the
/// cursor. Returns false (cursor left wherever the scan stopped) when it never closes.
fn scan_group(stream: &mut SourceCharStream<'_>) -> bool {
    let mut closers: Vec<char> = Vec::new();
    let mut in_quotes = false;
    while let Some(ch) = stream.next() {
        if in_quotes {
            match ch {
                '\\' => {
                    stream.next();
                }
                '"' => {
                    in_quotes = false;
                    if closers.is_empty() {
                        return true;
                    }
                }
                _ => {}
            }
            continue;
        }
        match ch {
            '\\' => {
                stream.next();
            }
            '"' => in_quotes = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(ch) {
                    return false;
                }
                if closers.is_empty() {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
