//! Conch REPL
//!
//! An interactive console over a [`Session`]: each line is parsed and dispatched, and a line
//! with an unclosed literal continues on the next one.

use std::io::{self, Write};

use crate::cli::output::{print_results, print_suggestions, print_table};
use crate::cli::Session;
use crate::diagnostics::{print_error, FailKind};
use crate::dispatch::{CommandResult, DispatchError};
use crate::locale::command_key;

/// REPL state that persists across lines.
pub struct ReplState {
    session: Session,
    line_number: usize,
}

impl ReplState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            line_number: 1,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Parses and runs one line.
    pub fn eval_line(&mut self, input: &str) -> Result<Vec<CommandResult>, DispatchError> {
        self.line_number += 1;
        self.session.dispatcher.dispatch(input, &self.session.ctx)
    }

    /// True when `input` only fails because a literal is still open at its end.
    pub fn needs_more(&self, input: &str) -> bool {
        match self.session.parser.parse(input, &self.session.ctx) {
            Err(fail) => matches!(
                fail.kind,
                FailKind::TokenExpected { position, .. } if position >= input.len()
            ),
            Ok(_) => false,
        }
    }

    pub fn complete(&self, input: &str) -> Vec<String> {
        self.session.completion.complete_line(input, &self.session.ctx)
    }

    /// Command names with their descriptions, localized where available.
    pub fn command_table(&self) -> Vec<(String, String)> {
        let registry = self.session.parser.registry();
        let localizer = self.session.ctx.localizer();
        registry
            .iter()
            .map(|(id, command)| {
                let name = registry.full_name(id).to_owned();
                let description = localizer
                    .and_then(|l| l.description(&command_key(&name)))
                    .or_else(|| command.description.clone())
                    .unwrap_or_default();
                (name, description)
            })
            .collect()
    }
}

/// Main REPL entry point
pub fn run_repl(session: Session) {
    println!("Conch REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type :help for help, :quit to exit");
    println!();

    let mut repl_state = ReplState::new(session);
    let mut input_buffer = String::new();

    loop {
        if input_buffer.is_empty() {
            print!("conch> ");
        } else {
            print!("    -> ");
        }
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl+D)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim_end_matches(['\n', '\r']);

                if input_buffer.is_empty() && line.trim_start().starts_with(':') {
                    match handle_repl_command(line.trim_start(), &repl_state) {
                        ReplCommand::Continue => continue,
                        ReplCommand::Quit => break,
                    }
                }

                if !input_buffer.is_empty() {
                    input_buffer.push(' ');
                }
                input_buffer.push_str(line);

                // An empty line gives up on an unfinished literal and reports it.
                if line.trim().is_empty() || !repl_state.needs_more(&input_buffer) {
                    match repl_state.eval_line(&input_buffer) {
                        Ok(results) => print_results(&results),
                        Err(e) => print_error(e),
                    }
                    input_buffer.clear();
                }
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
    }
}

enum ReplCommand {
    Continue,
    Quit,
}

fn handle_repl_command(command: &str, state: &ReplState) -> ReplCommand {
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        ":help" | ":h" => {
            println!("Conch REPL Commands:");
            println!("  :help, :h            Show this help");
            println!("  :quit, :q            Exit the REPL");
            println!("  :complete, :c TEXT   Suggest continuations of TEXT");
            println!();
            println!("Commands:");
            print_table(&state.command_table());
            ReplCommand::Continue
        }
        ":quit" | ":q" => ReplCommand::Quit,
        ":complete" | ":c" => {
            print_suggestions(&state.complete(rest));
            ReplCommand::Continue
        }
        _ => {
            println!("Unknown command: {}. Type :help for available commands.", name);
            ReplCommand::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ReplState {
        ReplState::new(Session::load(None, false).unwrap())
    }

    #[test]
    fn test_needs_more() {
        let state = state();
        assert!(state.needs_more("setmap {age=1, languages=[EN"));
        assert!(state.needs_more("say \"open"));
        assert!(!state.needs_more("say hi"));
        assert!(!state.needs_more("mapcmd 1 {A=1}}"));
        assert!(!state.needs_more("nope"));
    }

    #[test]
    fn test_command_table_lists_sub_commands() {
        let table = state().command_table();
        assert!(table.iter().any(|(name, _)| name == "user add"));
        assert!(table
            .iter()
            .any(|(name, description)| name == "rm" && description == "Remove a path"));
    }

    #[test]
    fn test_eval_line_returns_results() {
        let mut state = state();
        let results = state.eval_line("sum 1 2 & say hi").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].value.to_string(), "hi");
        assert!(state.eval_line("nope").is_err());
        assert_eq!(state.line_number(), 3);
    }

    #[test]
    fn test_complete_from_repl() {
        assert_eq!(state().complete("testE --value AX"), vec!["AXD"]);
    }
}
