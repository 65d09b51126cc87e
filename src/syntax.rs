//! Syntax layer: character stream, literal grammar and command-line tokens.
//!
//! Nothing here knows about commands or argument types. The grammar turns text into
//! [`Input`] trees and reports failures with the exact set of tokens it would have accepted.

pub mod input;
pub mod parser;
pub mod stream;
pub mod tokens;

pub use input::{Input, InputKind, Span};
pub use parser::{
    ExpectedTokens, Frame, InputParser, LiteralFailKind, LiteralFailure, ScalarTrace,
    DEFAULT_MAX_DEPTH,
};
pub use stream::{Mark, SourceCharStream};
pub use tokens::{Token, TokenKind, TokenReader, TokenRules};
