//! Tree-walking execution of template body segments

use tracing::trace;

use crate::error::{EvalError, RenderError};
use crate::indent::IndentConfig;
use crate::parser::ast::{
    BinaryOp, Branch, Expr, Identifier, Segment, SegmentKind, Span, Spanned, Statement, Target,
    TextPart,
};
use crate::value::Value;

use super::eval::Evaluator;
use super::scope::Scope;

/// Per-render state: scope stack and output buffer
pub struct Executor<'a> {
    scope: Scope,
    output: String,
    indent: &'a IndentConfig,
}

impl<'a> Executor<'a> {
    pub fn new(scope: Scope, indent: &'a IndentConfig) -> Self {
        Self {
            scope,
            output: String::new(),
            indent,
        }
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn evaluate(&self, expr: &Spanned<Expr>) -> Result<Value, EvalError> {
        Evaluator::new(&self.scope, self.indent).eval(expr)
    }

    pub fn execute_all(&mut self, segments: &[Segment]) -> Result<(), RenderError> {
        for segment in segments {
            self.execute(segment)?;
        }
        Ok(())
    }

    fn execute(&mut self, segment: &Segment) -> Result<(), RenderError> {
        let line = segment.line;
        match &segment.kind {
            SegmentKind::Text(parts) => self.emit_text(parts, line),
            SegmentKind::Statement(stmt) => self.run_statement(stmt, line),
            SegmentKind::For {
                target,
                iterable,
                body,
            } => self.run_loop(target, iterable, body, line),
            SegmentKind::If {
                branches,
                otherwise,
            } => self.run_conditional(branches, otherwise.as_deref(), line),
        }
    }

    fn emit_text(&mut self, parts: &[TextPart], line: usize) -> Result<(), RenderError> {
        for part in parts {
            match part {
                TextPart::Literal(text) => self.output.push_str(text),
                TextPart::Substitution(expr) => {
                    let value = self
                        .evaluate(expr)
                        .map_err(|e| RenderError::eval(line, e))?;
                    let text = value.to_text().ok_or_else(|| {
                        RenderError::eval(
                            line,
                            EvalError::NonScalarInterpolation {
                                kind: value.kind(),
                                span: expr.span.clone(),
                            },
                        )
                    })?;
                    self.output.push_str(&text);
                }
            }
        }
        Ok(())
    }

    fn run_statement(&mut self, stmt: &Statement, line: usize) -> Result<(), RenderError> {
        match stmt {
            Statement::Assign { target, value } => {
                let value = self
                    .evaluate(value)
                    .map_err(|e| RenderError::eval(line, e))?;
                trace!(line, target = ?target.names(), "assign");
                self.bind_target(target, value, false)
                    .map_err(|e| RenderError::eval(line, e))
            }
            Statement::AddAssign { name, value } => {
                let sum = Spanned::new(
                    Expr::Binary {
                        op: BinaryOp::Add,
                        lhs: Box::new(Spanned::new(
                            Expr::Name(name.node.clone()),
                            name.span.clone(),
                        )),
                        rhs: Box::new(value.clone()),
                    },
                    name.span.start..value.span.end,
                );
                let result = self.evaluate(&sum).map_err(|e| RenderError::eval(line, e))?;
                trace!(line, name = %name.node, "add-assign");
                self.scope.assign(name.node.as_str(), result);
                Ok(())
            }
        }
    }

    fn run_loop(
        &mut self,
        target: &Target,
        iterable: &Spanned<Expr>,
        body: &[Segment],
        line: usize,
    ) -> Result<(), RenderError> {
        let items = match self.evaluate(iterable) {
            Ok(Value::Seq(items)) => items,
            Ok(other) => {
                return Err(RenderError::eval(
                    line,
                    EvalError::type_error(
                        format!("cannot iterate over a {}", other.kind()),
                        iterable.span.clone(),
                    ),
                ))
            }
            Err(e) => return Err(RenderError::eval(line, e)),
        };
        trace!(line, count = items.len(), "loop");

        for item in items {
            self.scope.push();
            let result = self
                .bind_target(target, item, true)
                .map_err(|e| RenderError::eval(line, e))
                .and_then(|()| self.execute_all(body));
            self.scope.pop();
            result?;
        }
        Ok(())
    }

    fn run_conditional(
        &mut self,
        branches: &[Branch],
        otherwise: Option<&[Segment]>,
        line: usize,
    ) -> Result<(), RenderError> {
        let mut chosen = otherwise;
        for (index, branch) in branches.iter().enumerate() {
            let condition = self
                .evaluate(&branch.condition)
                .map_err(|e| RenderError::eval(line, e))?;
            if condition.is_truthy() {
                trace!(line, branch = index, "conditional");
                chosen = Some(branch.body.as_slice());
                break;
            }
        }

        let Some(body) = chosen else {
            return Ok(());
        };
        self.scope.push();
        let result = self.execute_all(body);
        self.scope.pop();
        result
    }

    /// Bind loop variables (`fresh`) or perform assignment
    fn bind_target(&mut self, target: &Target, value: Value, fresh: bool) -> Result<(), EvalError> {
        match target {
            Target::Name(id) => {
                self.store(id.node.as_str(), value, fresh);
                Ok(())
            }
            Target::Tuple(ids) => {
                let items = match value {
                    Value::Seq(items) if items.len() == ids.len() => items,
                    Value::Seq(items) => {
                        return Err(EvalError::type_error(
                            format!(
                                "cannot unpack {} values into {} names",
                                items.len(),
                                ids.len()
                            ),
                            tuple_span(ids),
                        ))
                    }
                    other => {
                        return Err(EvalError::type_error(
                            format!("cannot unpack a {}", other.kind()),
                            tuple_span(ids),
                        ))
                    }
                };
                for (id, item) in ids.iter().zip(items) {
                    self.store(id.node.as_str(), item, fresh);
                }
                Ok(())
            }
        }
    }

    fn store(&mut self, name: &str, value: Value, fresh: bool) {
        if fresh {
            self.scope.bind(name, value);
        } else {
            self.scope.assign(name, value);
        }
    }
}

fn tuple_span(ids: &[Spanned<Identifier>]) -> Span {
    match (ids.first(), ids.last()) {
        (Some(first), Some(last)) => first.span.start..last.span.end,
        _ => 0..0,
    }
}
