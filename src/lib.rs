//! Conch: typed command-line parsing, argument binding and completion for embedded text
//! consoles.
//!
//! ```rust
//! use std::sync::Arc;
//! use conch::{Argument, ArgumentType, Command, CommandParser, CommandRegistry, CompletionEngine, ParseContext};
//!
//! let mut registry = CommandRegistry::new();
//! registry
//!     .register(
//!         Command::new("rm")
//!             .argument(Argument::flag("recursive", 'r'))
//!             .argument(Argument::flag("force", 'f'))
//!             .argument(Argument::new("path", ArgumentType::String)),
//!     )
//!     .unwrap();
//! let parser = CommandParser::new(Arc::new(registry));
//! let ctx = ParseContext::new();
//!
//! let commands = parser.parse("rm -rf build", &ctx).unwrap();
//! assert_eq!(commands[0].get::<bool>("force"), Some(true));
//! assert_eq!(commands[0].get::<String>("path").as_deref(), Some("build"));
//!
//! let completion = CompletionEngine::new(parser);
//! assert!(completion.complete_line("rm -rf ", &ctx).contains(&"--path".to_string()));
//! ```

pub use crate::binder::{BindOrigin, BoundArgument, BoundCommand};
pub use crate::command::{
    Argument, ArgumentSource, ArgumentSupplier, Command, CommandId, CommandRegistry, Information,
    InformationId, Multiplicity, ParseContext, Requirement,
};
pub use crate::completion::CompletionEngine;
pub use crate::config::{ConfigError, ParserConfig, ShortFlagPolicy};
pub use crate::diagnostics::{print_error, FailKind, HandlerError, ParseFail, RegistrationError};
pub use crate::dispatch::{CommandResult, DispatchError, Dispatcher, Handler, Interceptor};
pub use crate::engine::CommandParser;
pub use crate::locale::{Localizer, TableLocalizer};
pub use crate::syntax::{Input, InputKind, InputParser, Span};
pub use crate::types::{ArgumentType, CustomType, FromValue, RecordField, TypeKind, Value};

pub mod binder;
pub mod cli;
pub mod command;
pub mod completion;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod locale;
pub mod repl;
pub mod syntax;
pub mod types;
