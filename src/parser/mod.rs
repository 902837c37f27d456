//! Parser for directive-annotated template files

pub mod ast;
mod document;
pub mod grammar;
pub mod lexer;

pub use ast::*;
pub use document::parse_module;
