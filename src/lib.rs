//! textforge - a directive-driven text template engine
//!
//! Template files mix literal output lines with directive lines that start
//! with a configurable prefix. Directives define named templates, assign
//! variables, and open loop and conditional blocks; literal lines splice in
//! values with `$name` or `${expr}`.
//!
//! # Example
//!
//! ```rust
//! use textforge::{render, Bindings, Value};
//!
//! let source = "\
//! #template greet(names)
//! #{for name in names:
//! hello $name
//! #}
//! #end template
//! ";
//!
//! let mut bindings = Bindings::new();
//! bindings.insert("names".to_string(), Value::from(vec!["ann", "bob"]));
//!
//! let text = render(source, &bindings).unwrap();
//! assert_eq!(text, "hello ann\nhello bob\n");
//! ```

pub mod config;
pub mod error;
pub mod indent;
pub mod model;
pub mod parser;
pub mod renderer;
pub mod template;
pub mod value;

pub use config::{ConfigError, RenderConfig, SyntaxConfig};
pub use error::{EvalError, RenderError, TemplateSyntaxError};
pub use indent::IndentConfig;
pub use model::{load_bindings, DataModel, ModelError};
pub use parser::parse_module;
pub use renderer::Renderer;
pub use template::{TemplateDefinition, TemplateModule};
pub use value::{Bindings, Value};

/// Parse and render template source with default configuration
///
/// Renders the first template the source defines.
pub fn render(source: &str, bindings: &Bindings) -> Result<String, RenderError> {
    render_with_config(source, bindings, &RenderConfig::default())
}

/// Parse and render template source with custom configuration
///
/// # Example
///
/// ```rust
/// use textforge::{render_with_config, Bindings, RenderConfig, Value};
///
/// let config = RenderConfig::new().with_directive_prefix("//#");
/// let source = "//#template id(n)\n#define ID $n\n//#end template\n";
///
/// let mut bindings = Bindings::new();
/// bindings.insert("n".to_string(), Value::Int(3));
///
/// let text = render_with_config(source, &bindings, &config).unwrap();
/// assert_eq!(text, "#define ID 3\n");
/// ```
pub fn render_with_config(
    source: &str,
    bindings: &Bindings,
    config: &RenderConfig,
) -> Result<String, RenderError> {
    let module = parse_module(source, &config.syntax)?;
    let renderer = Renderer::new(&module).with_indent(config.indent.clone());

    match &config.template {
        Some(name) => renderer.render_template(name, bindings),
        None => renderer.render(bindings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, Value)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let text = render(
            "#template t(x)\nvalue: $x\n#end template\n",
            &bindings(&[("x", Value::Int(5))]),
        )
        .unwrap();
        assert_eq!(text, "value: 5\n");
    }

    #[test]
    fn test_render_selects_configured_template() {
        let config = RenderConfig::new().with_template("second");
        let text = render_with_config(
            "#template first()\n1\n#end template\n#template second()\n2\n#end template\n",
            &Bindings::new(),
            &config,
        )
        .unwrap();
        assert_eq!(text, "2\n");
    }

    #[test]
    fn test_render_syntax_error() {
        let result = render("#template t()\n#}\n#end template\n", &Bindings::new());
        assert!(matches!(result, Err(RenderError::Syntax(e)) if e.line == 2));
    }

    #[test]
    fn test_custom_placeholder() {
        let config = RenderConfig::new().with_placeholder('@');
        let text = render_with_config(
            "#template t(x)\n$x @x @{x + 1}\n#end template\n",
            &bindings(&[("x", Value::Int(1))]),
            &config,
        )
        .unwrap();
        assert_eq!(text, "$x 1 2\n");
    }
}
