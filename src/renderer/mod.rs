//! Renderer executing parsed template modules against bindings
//!
//! Each render owns a fresh scope stack and output buffer. The root frame
//! holds module attributes, a second frame the template parameters, and
//! every loop iteration or chosen conditional branch pushes one more.

mod eval;
mod executor;
mod scope;

pub use eval::Evaluator;
pub use scope::Scope;

use tracing::debug;

use crate::error::RenderError;
use crate::indent::IndentConfig;
use crate::template::{Parameters, TemplateDefinition, TemplateModule};
use crate::value::Bindings;

use executor::Executor;

/// Renders templates of one parsed module
#[derive(Debug, Clone)]
pub struct Renderer<'m> {
    module: &'m TemplateModule,
    indent: IndentConfig,
}

impl<'m> Renderer<'m> {
    pub fn new(module: &'m TemplateModule) -> Self {
        Self {
            module,
            indent: IndentConfig::default(),
        }
    }

    /// Set the indentation style used by the indent builtins
    pub fn with_indent(mut self, indent: IndentConfig) -> Self {
        self.indent = indent;
        self
    }

    /// Render the first template defined in the module
    pub fn render(&self, bindings: &Bindings) -> Result<String, RenderError> {
        let template = self.module.first().ok_or(RenderError::NoTemplates)?;
        self.render_definition(template, bindings)
    }

    /// Render the template called `name`
    pub fn render_template(&self, name: &str, bindings: &Bindings) -> Result<String, RenderError> {
        let template = self
            .module
            .get(name)
            .ok_or_else(|| RenderError::TemplateNotFound {
                name: name.to_string(),
            })?;
        self.render_definition(template, bindings)
    }

    fn render_definition(
        &self,
        template: &TemplateDefinition,
        bindings: &Bindings,
    ) -> Result<String, RenderError> {
        check_parameters(template, bindings)?;
        debug!(
            template = %template.name,
            bindings = bindings.len(),
            "rendering template"
        );

        let mut executor = Executor::new(Scope::new(), &self.indent);
        for attribute in self.module.attributes() {
            let value = executor
                .evaluate(&attribute.value)
                .map_err(|e| RenderError::eval(attribute.line, e))?;
            executor.scope_mut().assign(attribute.name.as_str(), value);
        }

        executor.scope_mut().push();
        for (name, value) in bindings {
            executor.scope_mut().bind(name, value.clone());
        }
        executor.execute_all(&template.body)?;

        let output = executor.into_output();
        debug!(template = %template.name, bytes = output.len(), "rendered template");
        Ok(output)
    }
}

/// Bindings must supply exactly the declared parameter names
fn check_parameters(template: &TemplateDefinition, bindings: &Bindings) -> Result<(), RenderError> {
    let Parameters::Declared(params) = &template.parameters else {
        return Ok(());
    };

    let mut expected: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    expected.sort();
    let found: Vec<String> = bindings.keys().cloned().collect();
    if expected != found {
        return Err(RenderError::ParameterMismatch {
            template: template.name.clone(),
            expected,
            found,
        });
    }
    Ok(())
}
