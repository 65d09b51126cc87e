//! Parser configuration.
//!
//! Loaded from YAML; every field has a default so an empty document is a valid config.
//!
//! ```yaml
//! max_depth: 16
//! chain_separator: "&&"
//! short_flags: boolean_only
//! locale:
//!   names:
//!     command.remove: [apagar]
//!   descriptions:
//!     command.remove: Remove a file
//! ```

use std::fs;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::TableLocalizer;
use crate::syntax::{TokenRules, DEFAULT_MAX_DEPTH};

/// How a bundle of short flags such as `-rfo` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortFlagPolicy {
    /// Every flag in a bundle must name a boolean argument.
    BooleanOnly,
    /// The last flag of a bundle may name an argument that takes a value; the value is the
    /// next token.
    #[default]
    TrailingValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Deepest literal nesting accepted before failing.
    pub max_depth: usize,
    /// Bare token that ends one command and starts the next.
    pub chain_separator: String,
    /// Accept `--name=value`.
    pub assign_syntax: bool,
    pub short_flags: ShortFlagPolicy,
    /// Offer a single space when the word under the cursor is already a complete name.
    pub space_continuation: bool,
    /// Localized names and descriptions.
    pub locale: Option<TableLocalizer>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            chain_separator: "&".into(),
            assign_syntax: true,
            short_flags: ShortFlagPolicy::default(),
            space_continuation: true,
            locale: None,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not read config file '{path}'")]
    #[diagnostic(code(conch::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    #[diagnostic(code(conch::config::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    #[diagnostic(code(conch::config::invalid))]
    Invalid(String),
}

impl ParserConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ParserConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        let separator = self.chain_separator.as_str();
        if separator.is_empty()
            || separator.chars().any(char::is_whitespace)
            || separator.starts_with(['{', '[', '"', '-'])
        {
            return Err(ConfigError::Invalid(format!(
                "chain_separator '{}' must be a non-empty bare word",
                separator
            )));
        }
        Ok(())
    }

    pub(crate) fn token_rules(&self) -> TokenRules {
        TokenRules {
            separator: self.chain_separator.clone(),
            assign_syntax: self.assign_syntax,
            max_depth: self.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Localizer;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(ParserConfig::from_yaml_str("").unwrap(), ParserConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = ParserConfig::from_yaml_str(
            "max_depth: 3\nshort_flags: boolean_only\nlocale:\n  names:\n    command.rm: [apagar]\n",
        )
        .unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.short_flags, ShortFlagPolicy::BooleanOnly);
        assert_eq!(config.chain_separator, "&");
        let locale = config.locale.unwrap();
        assert_eq!(locale.names("command.rm"), vec!["apagar".to_string()]);
    }

    #[test]
    fn test_rejects_bad_separator() {
        assert!(matches!(
            ParserConfig::from_yaml_str("chain_separator: \"a b\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ParserConfig::from_yaml_str("max_depth: nope"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
