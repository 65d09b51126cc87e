//! Handles all user-facing output for the CLI.
//!
//! JSON for machine-readable results, colored text for the console, and miette reports for
//! failures.

use std::io::Write;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use unicode_width::UnicodeWidthStr;

use crate::dispatch::CommandResult;

fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Pretty-prints `value` as JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One suggestion per line.
pub fn print_suggestions(suggestions: &[String]) {
    for suggestion in suggestions {
        println!("{}", suggestion);
    }
}

/// Prints dispatch results, command names highlighted.
pub fn print_results(results: &[CommandResult]) {
    let mut stdout = StandardStream::stdout(color_choice());
    for result in results {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = write!(stdout, "{}", result.command);
        let _ = stdout.reset();
        let _ = writeln!(stdout, " => {}", result.value);
    }
}

/// Two aligned columns; widths are measured in terminal cells.
pub fn print_table(rows: &[(String, String)]) {
    let width = rows
        .iter()
        .map(|(left, _)| UnicodeWidthStr::width(left.as_str()))
        .max()
        .unwrap_or(0);
    let mut stdout = StandardStream::stdout(color_choice());
    for (left, right) in rows {
        let padding = width - UnicodeWidthStr::width(left.as_str());
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(stdout, "  {}", left);
        let _ = stdout.reset();
        let _ = writeln!(stdout, "{}  {}", " ".repeat(padding), right);
    }
}
