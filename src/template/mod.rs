//! Template modules
//!
//! A template file defines one or more named templates. Each definition
//! carries its parameter list and a parsed body; the module also records
//! file-level attributes that every render evaluates before the body.
//!
//! # Example
//!
//! ```text
//! #template header(name, types)
//! namespace $name {
//! #{for type in types:
//! struct ${type.name};
//! #}
//! }
//! #end template
//! ```

mod registry;

pub use registry::{Attribute, Parameters, TemplateDefinition, TemplateError, TemplateModule};
