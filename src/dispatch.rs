//! Handler invocation.
//!
//! Parsing produces [`BoundCommand`]s; the [`Dispatcher`] hands each one to its command's
//! [`Handler`] in textual order and stops at the first failure.
//!
//! [`Interceptor`]s registered on the dispatcher see every command before its handler runs
//! and may rewrite or veto it, then observe the result.

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::binder::BoundCommand;
use crate::command::ParseContext;
use crate::diagnostics::{HandlerError, ParseFail};
use crate::engine::CommandParser;
use crate::types::Value;

/// Runs a bound command.
pub trait Handler: Send + Sync {
    fn handle(&self, command: &BoundCommand, ctx: &ParseContext) -> Result<Value, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&BoundCommand, &ParseContext) -> Result<Value, HandlerError> + Send + Sync,
{
    fn handle(&self, command: &BoundCommand, ctx: &ParseContext) -> Result<Value, HandlerError> {
        self(command, ctx)
    }
}

/// Hooks around handler invocation, run in registration order.
pub trait Interceptor: Send + Sync {
    /// Called before the handler with the command as parsed and as left by earlier
    /// interceptors. `None` vetoes the command: its handler and the remaining interceptors
    /// do not run.
    fn pre(&self, original: &BoundCommand, current: BoundCommand) -> Option<BoundCommand> {
        let _ = original;
        Some(current)
    }

    /// Called after the handler succeeded, with the command it actually ran.
    fn post(&self, original: &BoundCommand, current: &BoundCommand, result: &CommandResult) {
        let _ = (original, current, result);
    }
}

impl<T: Interceptor + ?Sized> Interceptor for Arc<T> {
    fn pre(&self, original: &BoundCommand, current: BoundCommand) -> Option<BoundCommand> {
        (**self).pre(original, current)
    }

    fn post(&self, original: &BoundCommand, current: &BoundCommand, result: &CommandResult) {
        (**self).post(original, current, result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub command: String,
    pub value: Value,
}

#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseFail),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Handler(#[from] HandlerError),
}

#[derive(Clone)]
pub struct Dispatcher {
    parser: CommandParser,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("parser", &self.parser)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(parser: CommandParser) -> Self {
        Self {
            parser,
            interceptors: Vec::new(),
        }
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Parses `text` and runs every command in it. Nothing runs if the line fails to parse.
    /// Vetoed commands produce no result.
    pub fn dispatch(&self, text: &str, ctx: &ParseContext) -> Result<Vec<CommandResult>, DispatchError> {
        let commands = self.parser.parse(text, ctx)?;
        let mut results = Vec::with_capacity(commands.len());
        for command in &commands {
            if let Some(result) = self.run(command, ctx)? {
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Runs one already bound command through the interceptors and its handler. Returns
    /// `None` when an interceptor vetoed it.
    pub fn run(&self, original: &BoundCommand, ctx: &ParseContext) -> Result<Option<CommandResult>, HandlerError> {
        let mut current = original.clone();
        for interceptor in &self.interceptors {
            match interceptor.pre(original, current) {
                Some(next) => current = next,
                None => {
                    debug!(command = %original.name, "command vetoed by interceptor");
                    return Ok(None);
                }
            }
        }

        debug!(command = %current.name, "dispatching command");
        let value = match &current.command.handler {
            Some(handler) => handler.handle(&current, ctx)?,
            None => Value::Unit,
        };
        let result = CommandResult {
            command: current.name.clone(),
            value,
        };
        for interceptor in &self.interceptors {
            interceptor.post(original, &current, &result);
        }
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::binder::BoundArgument;
    use crate::command::{Argument, Command, CommandRegistry};
    use crate::types::ArgumentType;

    fn dispatcher() -> Dispatcher {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                Command::new("add")
                    .argument(Argument::new("numbers", ArgumentType::Int).vararg())
                    .handler(|command: &BoundCommand, _: &ParseContext| -> Result<Value, HandlerError> {
                        let numbers: Vec<i64> = command.get("numbers").unwrap_or_default();
                        Ok(Value::Int(numbers.iter().sum()))
                    }),
            )
            .unwrap();
        registry
            .register(Command::new("fail").handler(
                |command: &BoundCommand, _: &ParseContext| -> Result<Value, HandlerError> {
                    Err(HandlerError::failed(&command.name, "always fails"))
                },
            ))
            .unwrap();
        registry.register(Command::new("noop")).unwrap();
        Dispatcher::new(CommandParser::new(Arc::new(registry)))
    }

    #[test]
    fn test_dispatch_in_order() {
        let results = dispatcher()
            .dispatch("add 1 2 3 & noop", &ParseContext::new())
            .unwrap();
        assert_eq!(
            results,
            vec![
                CommandResult {
                    command: "add".into(),
                    value: Value::Int(6)
                },
                CommandResult {
                    command: "noop".into(),
                    value: Value::Unit
                },
            ]
        );
    }

    #[test]
    fn test_handler_failure() {
        let err = dispatcher().dispatch("fail", &ParseContext::new()).unwrap_err();
        assert!(matches!(err, DispatchError::Handler(HandlerError::Failed { .. })));
    }

    #[test]
    fn test_parse_failure_runs_nothing() {
        let err = dispatcher().dispatch("add 1 x", &ParseContext::new()).unwrap_err();
        assert!(matches!(err, DispatchError::Parse(_)));
    }

    /// Vetoes `fail`, doubles every number given to `add` and records what ran.
    #[derive(Default)]
    struct Audit {
        seen: Mutex<Vec<String>>,
    }

    impl Interceptor for Audit {
        fn pre(&self, _: &BoundCommand, mut current: BoundCommand) -> Option<BoundCommand> {
            if current.name == "fail" {
                return None;
            }
            for argument in &mut current.arguments {
                if let Value::List(items) = &mut argument.value {
                    for item in items.iter_mut() {
                        if let Value::Int(n) = item {
                            *n *= 2;
                        }
                    }
                }
            }
            Some(current)
        }

        fn post(&self, original: &BoundCommand, _: &BoundCommand, result: &CommandResult) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(format!("{} => {}", original.name, result.value));
            }
        }
    }

    #[test]
    fn test_interceptor_vetoes_and_rewrites() {
        let audit = Arc::new(Audit::default());
        let dispatcher = dispatcher().with_interceptor(audit.clone());
        let results = dispatcher
            .dispatch("add 1 2 & fail & noop", &ParseContext::new())
            .unwrap();
        assert_eq!(
            results,
            vec![
                CommandResult {
                    command: "add".into(),
                    value: Value::Int(6)
                },
                CommandResult {
                    command: "noop".into(),
                    value: Value::Unit
                },
            ]
        );
        assert_eq!(*audit.seen.lock().unwrap(), vec!["add => 6", "noop => ()"]);
    }

    #[test]
    fn test_pre_sees_the_original_command() {
        struct StripNumbers;
        impl Interceptor for StripNumbers {
            fn pre(&self, original: &BoundCommand, mut current: BoundCommand) -> Option<BoundCommand> {
                assert_eq!(original.arguments.len(), current.arguments.len());
                current.arguments.retain(|a: &BoundArgument| a.id != "numbers");
                Some(current)
            }
        }
        let results = dispatcher()
            .with_interceptor(StripNumbers)
            .dispatch("add 5", &ParseContext::new())
            .unwrap();
        assert_eq!(results[0].value, Value::Int(0));
    }
}
