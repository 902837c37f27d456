//! Error types for parsing, evaluation and rendering

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern, RichReason};
use thiserror::Error;

use crate::parser::lexer::{describe, Token};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Malformed template structure or directive
#[derive(Error, Debug, Clone, PartialEq)]
#[error("template syntax error at line {line}: {message}")]
pub struct TemplateSyntaxError {
    /// 1-based line of the offending directive
    pub line: usize,
    pub span: Span,
    pub message: String,
    pub expected: Vec<String>,
}

impl TemplateSyntaxError {
    pub fn new(line: usize, span: Span, message: impl Into<String>) -> Self {
        Self {
            line,
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    /// Convert a chumsky error produced while parsing a directive on `line`
    pub(crate) fn from_rich(err: Rich<'_, Token>, line: usize) -> Self {
        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("unexpected {}", describe(tok)),
                None => "unexpected end of directive".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(describe(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of directive".to_string()),
                _ => None,
            })
            .collect();

        Self {
            line,
            span: err.span().into_range(),
            message,
            expected,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let detail = if self.expected.is_empty() {
            self.message.clone()
        } else {
            format!("{}\nExpected: {}", self.message, self.expected.join(", "))
        };
        report(source, filename, &self.span, "template syntax error", &detail)
            .unwrap_or_else(|| self.to_string())
    }
}

/// Failure while evaluating a directive expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unbound name '{name}'")]
    UnboundName { name: String, span: Span },

    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: i64, len: usize, span: Span },

    #[error("missing field '{field}'")]
    MissingField { field: String, span: Span },

    #[error("cannot interpolate a {kind} into text")]
    NonScalarInterpolation { kind: &'static str, span: Span },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, span: Span },

    #[error("{message}")]
    Type { message: String, span: Span },
}

impl EvalError {
    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        EvalError::Type {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            EvalError::UnboundName { span, .. }
            | EvalError::IndexOutOfRange { span, .. }
            | EvalError::MissingField { span, .. }
            | EvalError::NonScalarInterpolation { span, .. }
            | EvalError::UnknownFunction { span, .. }
            | EvalError::Type { span, .. } => span,
        }
    }
}

/// Errors that can occur while rendering a template
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Syntax(#[from] TemplateSyntaxError),

    #[error("evaluation error at line {line}: {source}")]
    Eval {
        line: usize,
        #[source]
        source: EvalError,
    },

    #[error(
        "parameter mismatch for template '{template}': expected ({}), got ({})",
        .expected.join(", "),
        .found.join(", ")
    )]
    ParameterMismatch {
        template: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("template module defines no templates")]
    NoTemplates,
}

impl RenderError {
    pub(crate) fn eval(line: usize, source: EvalError) -> Self {
        RenderError::Eval { line, source }
    }

    /// Format the error with source context using ariadne
    ///
    /// Errors without a source position fall back to their display text.
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            RenderError::Syntax(err) => err.format(source, filename),
            RenderError::Eval { source: err, .. } => report(
                source,
                filename,
                err.span(),
                "evaluation error",
                &err.to_string(),
            )
            .unwrap_or_else(|| self.to_string()),
            other => other.to_string(),
        }
    }
}

fn report(source: &str, filename: &str, span: &Span, title: &str, detail: &str) -> Option<String> {
    // ariadne counts characters, spans count bytes
    let span = char_span(source, span);
    let mut buf = Vec::new();
    Report::build(ReportKind::Error, filename, span.start)
        .with_message(title)
        .with_label(
            Label::new((filename, span))
                .with_message(detail)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf)
        .ok()?;
    String::from_utf8(buf).ok()
}

fn char_span(source: &str, span: &Span) -> Span {
    let to_char = |byte: usize| {
        let byte = byte.min(source.len());
        source
            .char_indices()
            .take_while(|(i, _)| *i < byte)
            .count()
    };
    to_char(span.start)..to_char(span.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = TemplateSyntaxError::new(7, 40..41, "unmatched block close");
        assert_eq!(
            err.to_string(),
            "template syntax error at line 7: unmatched block close"
        );
    }

    #[test]
    fn test_parameter_mismatch_display() {
        let err = RenderError::ParameterMismatch {
            template: "make_rtt".to_string(),
            expected: vec!["name".to_string(), "types".to_string()],
            found: vec!["types".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "parameter mismatch for template 'make_rtt': expected (name, types), got (types)"
        );
    }

    #[test]
    fn test_format_includes_filename_and_message() {
        let source = "#template t()\n$missing\n#end template\n";
        let err = RenderError::eval(
            2,
            EvalError::UnboundName {
                name: "missing".to_string(),
                span: 15..22,
            },
        );
        let formatted = err.format(source, "t.tmpl");
        assert!(formatted.contains("t.tmpl"));
        assert!(formatted.contains("unbound name 'missing'"));
    }

    #[test]
    fn test_char_span_skips_multibyte_text() {
        let source = "#template t()\nprix: €$missing\n";
        let start = source.find("$missing").expect("Should find placeholder");
        assert_eq!(start, 23);
        assert_eq!(char_span(source, &(start..start + 8)), 21..29);
        assert_eq!(char_span("abc", &(1..2)), 1..2);
    }
}
