//! Template module storing the parsed template definitions

use std::collections::HashMap;
use thiserror::Error;

use crate::parser::ast::{Expr, Identifier, Segment, Spanned};

/// Errors that can occur while assembling a template module
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    /// Duplicate template definition
    #[error("template {name} already defined")]
    Duplicate { name: String },
}

/// Parameter list of a template definition
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// `#template name(a, b)`: bindings must supply exactly these names
    Declared(Vec<Identifier>),
    /// `#template name`: any bindings are accepted
    Open,
}

impl Parameters {
    /// Declared parameter names, or `None` for an open parameter list
    pub fn names(&self) -> Option<Vec<&str>> {
        match self {
            Parameters::Declared(ids) => Some(ids.iter().map(|id| id.as_str()).collect()),
            Parameters::Open => None,
        }
    }
}

/// A stored template definition
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDefinition {
    /// Template name
    pub name: String,
    pub parameters: Parameters,
    /// Parsed body segments in source order
    pub body: Vec<Segment>,
    /// Line of the `template` directive
    pub line: usize,
}

/// Module-level `attribute NAME = EXPR` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Identifier,
    pub value: Spanned<Expr>,
    pub line: usize,
}

/// Parsed template file: its templates in definition order plus module attributes
///
/// Immutable once parsed, so a single module can be rendered from many
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct TemplateModule {
    templates: Vec<TemplateDefinition>,
    index: HashMap<String, usize>,
    attributes: Vec<Attribute>,
}

impl TemplateModule {
    /// Create a new empty module
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template definition
    pub fn register(&mut self, def: TemplateDefinition) -> Result<(), TemplateError> {
        if self.index.contains_key(&def.name) {
            return Err(TemplateError::Duplicate { name: def.name });
        }
        self.index.insert(def.name.clone(), self.templates.len());
        self.templates.push(def);
        Ok(())
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&TemplateDefinition> {
        self.index.get(name).map(|&i| &self.templates[i])
    }

    /// Template rendered when no name is given: the first one defined
    pub fn first(&self) -> Option<&TemplateDefinition> {
        self.templates.first()
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get all template names in definition order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    /// Module attributes in declaration order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
