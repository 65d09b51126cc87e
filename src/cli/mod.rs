//! The `conch` command-line interface.
//!
//! Serves the demo command set from [`demo`]: parse, complete, run, inspect literals, or
//! open an interactive console.

use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, Level};

use crate::cli::args::{Command, ConchArgs};
use crate::command::ParseContext;
use crate::completion::CompletionEngine;
use crate::config::{ConfigError, ParserConfig};
use crate::diagnostics::{print_error, RegistrationError};
use crate::dispatch::Dispatcher;
use crate::engine::CommandParser;

pub mod args;
pub mod demo;
pub mod output;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registration(#[from] RegistrationError),

    #[error("could not write JSON output")]
    #[diagnostic(code(conch::cli::json))]
    Json(#[from] serde_json::Error),
}

/// Everything a CLI command needs: the demo commands behind a parser, completion and
/// dispatch, plus the context they run in.
#[derive(Debug, Clone)]
pub struct Session {
    pub parser: CommandParser,
    pub completion: CompletionEngine,
    pub dispatcher: Dispatcher,
    pub ctx: ParseContext,
}

impl Session {
    pub fn load(config: Option<&Path>, operator: bool) -> Result<Self, CliError> {
        let config = match config {
            Some(path) => ParserConfig::load(path)?,
            None => ParserConfig::default(),
        };
        let mut ctx = demo::context(operator);
        if let Some(locale) = config.locale.clone() {
            ctx = ctx.with_localizer(Arc::new(locale));
        }
        let parser = CommandParser::with_config(Arc::new(demo::registry()?), config);
        debug!(commands = parser.registry().len(), "demo session ready");
        Ok(Self {
            completion: CompletionEngine::new(parser.clone()),
            dispatcher: Dispatcher::new(parser.clone()),
            parser,
            ctx,
        })
    }
}

/// The main entry point for the CLI.
pub fn run() {
    let args = ConchArgs::parse();
    init_tracing(args.verbose);

    let code = match execute(&args) {
        Ok(code) => code,
        Err(e) => {
            print_error(e);
            2
        }
    };
    process::exit(code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs one subcommand and returns the process exit code.
fn execute(args: &ConchArgs) -> Result<i32, CliError> {
    let session = Session::load(args.config.as_deref(), args.operator)?;

    match &args.command {
        Command::Parse { line } => match session.parser.parse(line, &session.ctx) {
            Ok(commands) => {
                output::print_json(&commands)?;
                Ok(0)
            }
            Err(fail) => {
                print_error(fail);
                Ok(1)
            }
        },
        Command::Complete { line, cursor } => {
            let cursor = cursor.unwrap_or(line.len());
            let suggestions = session.completion.complete(line, cursor, &session.ctx);
            output::print_suggestions(&suggestions);
            Ok(0)
        }
        Command::Literal { text } => match session.parser.parse_literal(text) {
            Ok(input) => {
                output::print_json(&input)?;
                Ok(0)
            }
            Err(fail) => {
                print_error(fail);
                Ok(1)
            }
        },
        Command::Run { line } => match session.dispatcher.dispatch(line, &session.ctx) {
            Ok(results) => {
                output::print_results(&results);
                Ok(0)
            }
            Err(e) => {
                print_error(e);
                Ok(1)
            }
        },
        Command::Repl => {
            crate::repl::run_repl(session);
            Ok(0)
        }
    }
}
