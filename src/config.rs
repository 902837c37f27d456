//! Render configuration: directive syntax and indentation style
//!
//! Every key is optional when loading from TOML:
//!
//! ```toml
//! template = "make_rtt"
//!
//! [syntax]
//! directive_prefix = "//#"
//! placeholder = "$"
//!
//! [indent]
//! columns = 4
//! use_tab = true
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::indent::IndentConfig;

/// Errors that can occur when loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Markers that distinguish engine syntax from literal output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    /// Lines starting with this prefix are directives
    pub directive_prefix: String,
    /// Introduces `$name` / `${expr}` substitutions in text lines
    pub placeholder: char,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            directive_prefix: "#".to_string(),
            placeholder: '$',
        }
    }
}

impl SyntaxConfig {
    pub fn with_directive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.directive_prefix = prefix.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Reject settings the line parser cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directive_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "directive prefix must not be empty".to_string(),
            ));
        }
        if self.placeholder.is_whitespace() || matches!(self.placeholder, '{' | '}' | '\\') {
            return Err(ConfigError::Invalid(format!(
                "placeholder {:?} is not allowed",
                self.placeholder
            )));
        }
        Ok(())
    }
}

/// Configuration options for rendering
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub syntax: SyntaxConfig,
    pub indent: IndentConfig,
    /// Template to render when none is named explicitly
    pub template: Option<String>,
}

impl RenderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = toml::from_str(content)?;
        config.syntax.validate()?;
        Ok(config)
    }

    /// Set the directive line prefix
    pub fn with_directive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.syntax.directive_prefix = prefix.into();
        self
    }

    /// Set the substitution placeholder character
    pub fn with_placeholder(mut self, placeholder: char) -> Self {
        self.syntax.placeholder = placeholder;
        self
    }

    /// Set the indentation style used by the indent builtins
    pub fn with_indent(mut self, indent: IndentConfig) -> Self {
        self.indent = indent;
        self
    }

    /// Set the template rendered by default
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.syntax.directive_prefix, "#");
        assert_eq!(config.syntax.placeholder, '$');
        assert_eq!(config.indent, IndentConfig::new(4, true));
        assert_eq!(config.template, None);
    }

    #[test]
    fn test_builder_methods() {
        let config = RenderConfig::new()
            .with_directive_prefix("//#")
            .with_placeholder('@')
            .with_indent(IndentConfig::new(2, false))
            .with_template("make_rtt");
        assert_eq!(config.syntax.directive_prefix, "//#");
        assert_eq!(config.syntax.placeholder, '@');
        assert!(!config.indent.use_tab);
        assert_eq!(config.template.as_deref(), Some("make_rtt"));
    }

    #[test]
    fn test_partial_toml() {
        let config = RenderConfig::from_str(
            r#"
[syntax]
directive_prefix = "//#"

[indent]
use_tab = false
"#,
        )
        .expect("Should parse");
        assert_eq!(config.syntax.directive_prefix, "//#");
        assert_eq!(config.syntax.placeholder, '$');
        assert_eq!(config.indent.columns, 4);
        assert!(!config.indent.use_tab);
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let result = RenderConfig::from_str("[syntax]\ndirective_prefix = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = RenderConfig::from_str("[indent]\ncolumns = \"four\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
