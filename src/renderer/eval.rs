//! Expression evaluation against a scope

use crate::error::EvalError;
use crate::indent::IndentConfig;
use crate::parser::ast::{BinaryOp, Expr, Span, Spanned};
use crate::value::Value;

use super::scope::Scope;

/// Largest sequence `range()` will materialise
pub const MAX_RANGE_LEN: i64 = 1 << 20;

/// Evaluates directive expressions; never mutates the scope
pub struct Evaluator<'a> {
    scope: &'a Scope,
    indent: &'a IndentConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a Scope, indent: &'a IndentConfig) -> Self {
        Self { scope, indent }
    }

    pub fn eval(&self, expr: &Spanned<Expr>) -> Result<Value, EvalError> {
        let span = &expr.span;
        match &expr.node {
            Expr::Name(id) => {
                self.scope
                    .lookup(id.as_str())
                    .cloned()
                    .ok_or_else(|| EvalError::UnboundName {
                        name: id.to_string(),
                        span: span.clone(),
                    })
            }
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::type_error("integer overflow", span.clone())),
                other => Err(EvalError::type_error(
                    format!("cannot negate a {}", other.kind()),
                    span.clone(),
                )),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs, span)
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let key = self.eval(index)?;
                subscript(target, key, &index.span)
            }
            Expr::Attribute { target, field } => match self.eval(target)? {
                Value::Record(mut fields) => {
                    fields
                        .remove(field.node.as_str())
                        .ok_or_else(|| EvalError::MissingField {
                            field: field.node.to_string(),
                            span: field.span.clone(),
                        })
                }
                other => Err(EvalError::type_error(
                    format!("a {} has no field '{}'", other.kind(), field.node),
                    field.span.clone(),
                )),
            },
            Expr::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(function.node.as_str(), values, span, &function.span)
            }
        }
    }

    fn call(
        &self,
        name: &str,
        args: Vec<Value>,
        span: &Span,
        name_span: &Span,
    ) -> Result<Value, EvalError> {
        match name {
            "len" => {
                let [value] = arity::<1>(name, args, span)?;
                match value {
                    Value::Seq(items) => Ok(Value::Int(items.len() as i64)),
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    Value::Record(fields) => Ok(Value::Int(fields.len() as i64)),
                    other => Err(EvalError::type_error(
                        format!("len() of a {}", other.kind()),
                        span.clone(),
                    )),
                }
            }
            "str" => {
                let [value] = arity::<1>(name, args, span)?;
                let kind = value.kind();
                value.to_text().map(Value::Str).ok_or_else(|| {
                    EvalError::type_error(format!("str() of a {}", kind), span.clone())
                })
            }
            "range" => {
                let bounds = match args.len() {
                    1 => {
                        let [end] = arity::<1>(name, args, span)?;
                        (0, int_arg(name, end, span)?)
                    }
                    _ => {
                        let [start, end] = arity::<2>(name, args, span)?;
                        (int_arg(name, start, span)?, int_arg(name, end, span)?)
                    }
                };
                let (start, end) = bounds;
                if end.saturating_sub(start) > MAX_RANGE_LEN {
                    return Err(EvalError::type_error(
                        format!("range() is limited to {} elements", MAX_RANGE_LEN),
                        span.clone(),
                    ));
                }
                Ok(Value::Seq((start..end).map(Value::Int).collect()))
            }
            "normalize" => {
                let [text] = arity::<1>(name, args, span)?;
                Ok(Value::Str(self.indent.normalize(&text_arg(name, text, span)?)))
            }
            "indent" | "deindent" => {
                let (text, level) = match args.len() {
                    1 => {
                        let [text] = arity::<1>(name, args, span)?;
                        (text, 1)
                    }
                    _ => {
                        let [text, level] = arity::<2>(name, args, span)?;
                        (text, level_arg(name, level, span)?)
                    }
                };
                let text = text_arg(name, text, span)?;
                Ok(Value::Str(if name == "indent" {
                    self.indent.indent(&text, level)
                } else {
                    self.indent.deindent(&text, level)
                }))
            }
            _ => Err(EvalError::UnknownFunction {
                name: name.to_string(),
                span: name_span.clone(),
            }),
        }
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value, span: &Span) -> Result<Value, EvalError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::type_error("integer overflow", span.clone())),
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => a
            .checked_sub(b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::type_error("integer overflow", span.clone())),
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinaryOp::Add, Value::Seq(mut a), Value::Seq(b)) => {
            a.extend(b);
            Ok(Value::Seq(a))
        }
        (op, lhs, rhs) => Err(EvalError::type_error(
            format!(
                "unsupported operand types for {}: {} and {}",
                op,
                lhs.kind(),
                rhs.kind()
            ),
            span.clone(),
        )),
    }
}

fn subscript(target: Value, key: Value, span: &Span) -> Result<Value, EvalError> {
    match (target, key) {
        (Value::Seq(mut items), Value::Int(index)) => {
            let len = items.len();
            match usize::try_from(index) {
                Ok(i) if i < len => Ok(items.swap_remove(i)),
                _ => Err(EvalError::IndexOutOfRange {
                    index,
                    len,
                    span: span.clone(),
                }),
            }
        }
        (Value::Record(mut fields), Value::Str(key)) => {
            fields.remove(&key).ok_or_else(|| EvalError::MissingField {
                field: key,
                span: span.clone(),
            })
        }
        (target, key) => Err(EvalError::type_error(
            format!("cannot index a {} with a {}", target.kind(), key.kind()),
            span.clone(),
        )),
    }
}

fn arity<const N: usize>(name: &str, args: Vec<Value>, span: &Span) -> Result<[Value; N], EvalError> {
    let count = args.len();
    args.try_into().map_err(|_| {
        EvalError::type_error(
            format!("{}() takes {} argument(s), {} given", name, N, count),
            span.clone(),
        )
    })
}

fn int_arg(name: &str, value: Value, span: &Span) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(EvalError::type_error(
            format!("{}() expects an integer, got a {}", name, other.kind()),
            span.clone(),
        )),
    }
}

fn level_arg(name: &str, value: Value, span: &Span) -> Result<usize, EvalError> {
    let n = int_arg(name, value, span)?;
    usize::try_from(n).map_err(|_| {
        EvalError::type_error(
            format!("{}() level must not be negative", name),
            span.clone(),
        )
    })
}

fn text_arg(name: &str, value: Value, span: &Span) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::type_error(
            format!("{}() expects a string, got a {}", name, other.kind()),
            span.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grammar::parse_expression;

    fn scope() -> Scope {
        let mut scope = Scope::new();
        scope.assign(
            "types",
            Value::from(vec![
                Value::record([
                    ("name", Value::from("int")),
                    ("id", Value::Int(0)),
                    ("members", Value::Seq(vec![])),
                ]),
                Value::record([
                    ("name", Value::from("vector")),
                    ("id", Value::Int(1)),
                    (
                        "members",
                        Value::from(vec![Value::from(vec!["float", "x"])]),
                    ),
                ]),
            ]),
        );
        scope.assign("index", Value::Int(2));
        scope
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        let scope = scope();
        let indent = IndentConfig::default();
        let expr = parse_expression(source, 0, 1).expect("Should parse");
        Evaluator::new(&scope, &indent).eval(&expr)
    }

    #[test]
    fn test_record_subscript_and_attribute() {
        assert_eq!(eval("types[1][\"name\"]"), Ok(Value::from("vector")));
        assert_eq!(eval("types[1].name"), Ok(Value::from("vector")));
        assert_eq!(eval("types[1].members[0][1]"), Ok(Value::from("x")));
    }

    #[test]
    fn test_len_builtin() {
        assert_eq!(eval("len(types)"), Ok(Value::Int(2)));
        assert_eq!(eval("len(\"abc\")"), Ok(Value::Int(3)));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("index + 1"), Ok(Value::Int(3)));
        assert_eq!(eval("index - 5"), Ok(Value::Int(-3)));
        assert_eq!(eval("-index"), Ok(Value::Int(-2)));
        assert_eq!(eval("\"a\" + \"b\""), Ok(Value::from("ab")));
    }

    #[test]
    fn test_unbound_name() {
        assert!(matches!(
            eval("missing"),
            Err(EvalError::UnboundName { name, span }) if name == "missing" && span == (0..7)
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        assert!(matches!(
            eval("types[2]"),
            Err(EvalError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
        assert!(matches!(
            eval("types[-1]"),
            Err(EvalError::IndexOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn test_missing_field() {
        assert!(matches!(
            eval("types[0][\"size\"]"),
            Err(EvalError::MissingField { field, .. }) if field == "size"
        ));
        assert!(matches!(
            eval("types[0].size"),
            Err(EvalError::MissingField { field, .. }) if field == "size"
        ));
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(eval("index + \"x\""), Err(EvalError::Type { .. })));
        assert!(matches!(eval("index[0]"), Err(EvalError::Type { .. })));
        assert!(matches!(eval("len(index)"), Err(EvalError::Type { .. })));
        assert!(matches!(eval("len()"), Err(EvalError::Type { .. })));
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(
            eval("upper(\"x\")"),
            Err(EvalError::UnknownFunction { name, .. }) if name == "upper"
        ));
    }

    #[test]
    fn test_range_and_str() {
        assert_eq!(
            eval("range(3)"),
            Ok(Value::from(vec![0i64, 1, 2]))
        );
        assert_eq!(eval("range(2, 4)"), Ok(Value::from(vec![2i64, 3])));
        assert_eq!(eval("str(index) + \"!\""), Ok(Value::from("2!")));
    }

    #[test]
    fn test_range_length_is_capped() {
        assert!(matches!(eval("range(10000000000)"), Err(EvalError::Type { .. })));
        assert!(matches!(
            eval("range(-9223372036854775807, 9223372036854775807)"),
            Err(EvalError::Type { .. })
        ));
        assert_eq!(eval("range(5, 2)"), Ok(Value::Seq(vec![])));
    }

    #[test]
    fn test_indent_builtins() {
        assert_eq!(eval("indent(\"a\\nb\\n\")"), Ok(Value::from("\ta\n\tb\n")));
        assert_eq!(eval("deindent(\"\\t\\ta\", 1)"), Ok(Value::from("\ta")));
        assert_eq!(eval("normalize(\"    a\")"), Ok(Value::from("\ta")));
    }
}
