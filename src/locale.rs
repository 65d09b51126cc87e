//! Localized names and descriptions.
//!
//! Localization is an explicit capability handed to the parser through
//! [`ParseContext`](crate::command::ParseContext); there is no process-wide locale.
//!
//! Keys are `command.<full name>` for commands (the full name joins the path from the root
//! with spaces) and `argument.<full command name>.<argument name>` for arguments.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub trait Localizer: Send + Sync + fmt::Debug {
    /// Extra names under which the keyed item may be typed.
    fn names(&self, key: &str) -> Vec<String>;

    fn description(&self, key: &str) -> Option<String>;
}

pub fn command_key(full_name: &str) -> String {
    format!("command.{}", full_name)
}

pub fn argument_key(command_full_name: &str, argument: &str) -> String {
    format!("argument.{}.{}", command_full_name, argument)
}

/// A localizer backed by in-memory tables, usually loaded from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLocalizer {
    pub names: BTreeMap<String, Vec<String>>,
    pub descriptions: BTreeMap<String, String>,
}

impl TableLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(mut self, key: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names
            .entry(key.into())
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.descriptions.insert(key.into(), text.into());
        self
    }
}

impl Localizer for TableLocalizer {
    fn names(&self, key: &str) -> Vec<String> {
        self.names.get(key).cloned().unwrap_or_default()
    }

    fn description(&self, key: &str) -> Option<String> {
        self.descriptions.get(key).cloned()
    }
}
