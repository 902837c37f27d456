//! Line-oriented parser for template modules
//!
//! A template file is read line by line. Lines starting with the directive
//! prefix carry engine syntax; every other line inside a template definition
//! is literal output text with inline `$name` / `${expr}` substitutions.
//! Lines outside any template definition are ignored.

use tracing::{debug, trace, warn};

use crate::config::SyntaxConfig;
use crate::error::TemplateSyntaxError;
use crate::parser::ast::*;
use crate::parser::grammar::{self, TemplateHeader};
use crate::template::{Attribute, Parameters, TemplateDefinition, TemplateModule};

/// Parse template source into a module of named templates
pub fn parse_module(
    source: &str,
    syntax: &SyntaxConfig,
) -> Result<TemplateModule, TemplateSyntaxError> {
    let mut parser = ModuleParser::new(syntax);
    let mut offset = 0;

    for (index, raw) in source.split_inclusive('\n').enumerate() {
        parser.parse_line(raw, offset, index + 1)?;
        offset += raw.len();
    }

    let line_count = source.split_inclusive('\n').count();
    parser.finish(line_count, source.len())
}

/// Template definition currently being collected
struct OpenTemplate {
    header: TemplateHeader,
    line: usize,
    body: Vec<Segment>,
    blocks: Vec<OpenBlock>,
}

/// Block directive waiting for its closing `}`
struct OpenBlock {
    kind: OpenBlockKind,
    line: usize,
    span: Span,
    body: Vec<Segment>,
}

enum OpenBlockKind {
    For {
        target: Target,
        iterable: Spanned<Expr>,
    },
    If {
        /// Arms completed so far
        branches: Vec<Branch>,
        /// Guard of the arm being collected; `None` once inside `else`
        condition: Option<Spanned<Expr>>,
    },
}

struct ModuleParser<'c> {
    syntax: &'c SyntaxConfig,
    module: TemplateModule,
    current: Option<OpenTemplate>,
}

impl<'c> ModuleParser<'c> {
    fn new(syntax: &'c SyntaxConfig) -> Self {
        Self {
            syntax,
            module: TemplateModule::new(),
            current: None,
        }
    }

    fn parse_line(
        &mut self,
        raw: &str,
        offset: usize,
        line: usize,
    ) -> Result<(), TemplateSyntaxError> {
        let prefix = self.syntax.directive_prefix.as_str();
        if let Some(rest) = raw.strip_prefix(prefix) {
            let rest = rest.trim_end_matches(['\n', '\r']);
            let body = rest.trim_start();
            let body_offset = offset + prefix.len() + (rest.len() - body.len());
            return self.parse_directive(body, body_offset, line, offset..offset + raw.len());
        }

        // Text outside a template definition is ignored
        if self.current.is_none() {
            return Ok(());
        }

        let parts = parse_text_line(raw, offset, line, self.syntax.placeholder)?;
        if !parts.is_empty() {
            let span = offset..offset + raw.len();
            self.push_segment(Segment::new(SegmentKind::Text(parts), line, span));
        }
        Ok(())
    }

    fn parse_directive(
        &mut self,
        body: &str,
        offset: usize,
        line: usize,
        line_span: Span,
    ) -> Result<(), TemplateSyntaxError> {
        let Some(marker) = body.chars().next() else {
            return Err(TemplateSyntaxError::new(line, line_span, "malformed directive"));
        };

        match marker {
            '!' | '{' | '}' if self.current.is_none() => Err(TemplateSyntaxError::new(
                line,
                line_span,
                "execution statement outside of template definition is not allowed",
            )),
            '!' => {
                trace!(line, "statement directive");
                let stmt = grammar::parse_statement(&body[1..], offset + 1, line)?;
                self.push_segment(Segment::new(SegmentKind::Statement(stmt), line, line_span));
                Ok(())
            }
            '{' => {
                let open = grammar::parse_block_open(&body[1..], offset + 1, line)?;
                self.open_block(open, line, line_span)
            }
            '}' => {
                if !body[1..].trim().is_empty() {
                    return Err(TemplateSyntaxError::new(
                        line,
                        line_span,
                        "unexpected text after block close",
                    ));
                }
                self.close_block(line, line_span)
            }
            '*' => {
                trace!(line, comment = body[1..].trim_end(), "comment directive");
                Ok(())
            }
            _ => {
                let keyword_len = body
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(body.len());
                let (keyword, rest) = body.split_at(keyword_len);
                let rest_offset = offset + keyword_len;
                match keyword {
                    "template" => self.open_template(rest, rest_offset, line),
                    "end" => self.end_directive(rest, line, line_span),
                    "attribute" => self.attribute(rest, rest_offset, line),
                    "" => Err(TemplateSyntaxError::new(line, line_span, "malformed directive")),
                    other => Err(TemplateSyntaxError::new(
                        line,
                        offset..offset + keyword_len,
                        format!("unknown directive keyword: {}", other),
                    )),
                }
            }
        }
    }

    fn open_template(
        &mut self,
        rest: &str,
        offset: usize,
        line: usize,
    ) -> Result<(), TemplateSyntaxError> {
        let header = grammar::parse_template_header(rest, offset, line)?;

        if let Some(open) = &self.current {
            return Err(TemplateSyntaxError::new(
                line,
                header.name.span.clone(),
                format!(
                    "can't nest template declarations ('{}' is open since line {})",
                    open.header.name.node, open.line
                ),
            ));
        }
        if self.module.contains(header.name.node.as_str()) {
            return Err(TemplateSyntaxError::new(
                line,
                header.name.span.clone(),
                format!("template {} already defined", header.name.node),
            ));
        }
        if let Some(params) = &header.params {
            for (i, param) in params.iter().enumerate() {
                if params[..i].iter().any(|p| p.node == param.node) {
                    return Err(TemplateSyntaxError::new(
                        line,
                        param.span.clone(),
                        format!("duplicate parameter {}", param.node),
                    ));
                }
            }
        }

        trace!(line, template = %header.name.node, "template directive");
        self.current = Some(OpenTemplate {
            header,
            line,
            body: Vec::new(),
            blocks: Vec::new(),
        });
        Ok(())
    }

    fn end_directive(
        &mut self,
        rest: &str,
        line: usize,
        line_span: Span,
    ) -> Result<(), TemplateSyntaxError> {
        let scope = rest.trim();
        if scope != "template" {
            return Err(TemplateSyntaxError::new(
                line,
                line_span,
                format!(
                    "mismatched end directive, expected: template, actual: {}",
                    scope
                ),
            ));
        }

        let Some(open) = self.current.take() else {
            return Err(TemplateSyntaxError::new(
                line,
                line_span,
                "end directive without matching opening",
            ));
        };
        if let Some(block) = open.blocks.last() {
            return Err(TemplateSyntaxError::new(
                block.line,
                block.span.clone(),
                format!("missing end bracket for block opened at line {}", block.line),
            ));
        }

        let parameters = match open.header.params {
            Some(params) => Parameters::Declared(params.into_iter().map(|p| p.node).collect()),
            None => Parameters::Open,
        };
        let definition = TemplateDefinition {
            name: open.header.name.node.0,
            parameters,
            body: open.body,
            line: open.line,
        };
        debug!(
            template = %definition.name,
            segments = definition.body.len(),
            "parsed template"
        );
        self.module
            .register(definition)
            .map_err(|e| TemplateSyntaxError::new(line, line_span, e.to_string()))
    }

    fn attribute(
        &mut self,
        rest: &str,
        offset: usize,
        line: usize,
    ) -> Result<(), TemplateSyntaxError> {
        if self.current.is_some() {
            warn!(line, "attribute directives are not expected inside template definitions");
        }
        let decl = grammar::parse_attribute(rest, offset, line)?;
        trace!(line, attribute = %decl.name.node, "attribute directive");
        self.module.add_attribute(Attribute {
            name: decl.name.node,
            value: decl.value,
            line,
        });
        Ok(())
    }

    fn open_block(
        &mut self,
        open: BlockOpen,
        line: usize,
        span: Span,
    ) -> Result<(), TemplateSyntaxError> {
        let Some(template) = self.current.as_mut() else {
            return Err(TemplateSyntaxError::new(line, span, "block outside of template"));
        };

        let kind = match open {
            BlockOpen::For { target, iterable } => {
                trace!(line, "for directive");
                OpenBlockKind::For { target, iterable }
            }
            BlockOpen::If(condition) => {
                trace!(line, "if directive");
                OpenBlockKind::If {
                    branches: Vec::new(),
                    condition: Some(condition),
                }
            }
            BlockOpen::Elif(condition) => {
                trace!(line, "elif directive");
                return template.continue_conditional(Some(condition), line, span);
            }
            BlockOpen::Else => {
                trace!(line, "else directive");
                return template.continue_conditional(None, line, span);
            }
        };

        template.blocks.push(OpenBlock {
            kind,
            line,
            span,
            body: Vec::new(),
        });
        Ok(())
    }

    fn close_block(&mut self, line: usize, span: Span) -> Result<(), TemplateSyntaxError> {
        let Some(template) = self.current.as_mut() else {
            return Err(TemplateSyntaxError::new(line, span, "block close outside of template"));
        };
        let Some(block) = template.blocks.pop() else {
            return Err(TemplateSyntaxError::new(line, span, "mismatched end bracket"));
        };

        let kind = match block.kind {
            OpenBlockKind::For { target, iterable } => SegmentKind::For {
                target,
                iterable,
                body: block.body,
            },
            OpenBlockKind::If {
                mut branches,
                condition,
            } => match condition {
                Some(condition) => {
                    branches.push(Branch {
                        condition,
                        body: block.body,
                    });
                    SegmentKind::If {
                        branches,
                        otherwise: None,
                    }
                }
                None => SegmentKind::If {
                    branches,
                    otherwise: Some(block.body),
                },
            },
        };
        template.push_segment(Segment::new(kind, block.line, block.span));
        Ok(())
    }

    fn push_segment(&mut self, segment: Segment) {
        if let Some(template) = self.current.as_mut() {
            template.push_segment(segment);
        }
    }

    fn finish(self, line: usize, len: usize) -> Result<TemplateModule, TemplateSyntaxError> {
        if let Some(open) = self.current {
            return Err(TemplateSyntaxError::new(
                line,
                len..len,
                format!(
                    "missing end directive for template '{}' opened at line {}",
                    open.header.name.node, open.line
                ),
            ));
        }
        Ok(self.module)
    }
}

impl OpenTemplate {
    fn push_segment(&mut self, segment: Segment) {
        match self.blocks.last_mut() {
            Some(block) => block.body.push(segment),
            None => self.body.push(segment),
        }
    }

    fn current_body(&mut self) -> &mut Vec<Segment> {
        match self.blocks.last_mut() {
            Some(block) => &mut block.body,
            None => &mut self.body,
        }
    }

    /// Handle `{elif` / `{else` (`condition == None`)
    ///
    /// Attaches to an `{if` closed by the immediately preceding `}` when
    /// there is one, otherwise to the innermost open `{if`.
    fn continue_conditional(
        &mut self,
        condition: Option<Spanned<Expr>>,
        line: usize,
        span: Span,
    ) -> Result<(), TemplateSyntaxError> {
        let body = self.current_body();
        match body.pop() {
            Some(Segment {
                kind:
                    SegmentKind::If {
                        branches,
                        otherwise: None,
                    },
                line: if_line,
                span: if_span,
            }) => {
                self.blocks.push(OpenBlock {
                    kind: OpenBlockKind::If {
                        branches,
                        condition,
                    },
                    line: if_line,
                    span: if_span,
                    body: Vec::new(),
                });
                return Ok(());
            }
            Some(other) => body.push(other),
            None => {}
        }

        if let Some(block) = self.blocks.last_mut() {
            if let OpenBlockKind::If {
                branches,
                condition: current,
            } = &mut block.kind
            {
                if let Some(finished) = current.take() {
                    branches.push(Branch {
                        condition: finished,
                        body: std::mem::take(&mut block.body),
                    });
                    *current = condition;
                    return Ok(());
                }
            }
        }

        let message = if condition.is_some() {
            "elif without a preceding if"
        } else {
            "else without a preceding if"
        };
        Err(TemplateSyntaxError::new(line, span, message))
    }
}

/// Split one literal text line into literal runs and substitutions
///
/// Handles, in order: backslash escapes at the start of the line, the
/// `$<` line-begin slurp, `$$` escapes, `$>` line-end slurp, `${expr}`
/// and `$identifier`.
pub(crate) fn parse_text_line(
    raw: &str,
    offset: usize,
    line: usize,
    placeholder: char,
) -> Result<Vec<TextPart>, TemplateSyntaxError> {
    // Leading escapes: "\#x" -> "#x"
    let mut escaped = String::new();
    let mut cursor = 0;
    loop {
        let mut rest = raw[cursor..].chars();
        match (rest.next(), rest.next()) {
            (Some('\\'), Some(ch)) => {
                escaped.push(ch);
                cursor += 1 + ch.len_utf8();
            }
            _ => break,
        }
    }
    let text = if escaped.is_empty() {
        raw.to_string()
    } else {
        format!("{}{}", escaped, &raw[cursor..])
    };
    // Byte offset in the template of text[i], exact past the escaped prefix
    let base = (offset + cursor).saturating_sub(escaped.len());

    let chars: Vec<(usize, char)> = text.char_indices().collect();

    // Line-begin slurp: everything up to and including "$<" is dropped
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        if chars[i].1 == placeholder {
            i += 1;
            if i < chars.len() && chars[i].1 == '<' {
                start = i + 1;
                break;
            }
        }
        i += 1;
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut pending = false;
    let mut i = start;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        if !pending {
            if ch == placeholder {
                pending = true;
            } else {
                literal.push(ch);
            }
            i += 1;
            continue;
        }

        pending = false;
        if ch == placeholder {
            literal.push(placeholder);
            i += 1;
        } else if ch == '>' {
            // Line-end slurp: the rest of the line, newline included, is dropped
            literal_flush(&mut parts, &mut literal);
            return Ok(parts);
        } else if ch == '{' {
            let close = find_close_brace(&chars, i + 1).ok_or_else(|| {
                TemplateSyntaxError::new(
                    line,
                    base + pos..base + text.len(),
                    "could not find end delimiter }",
                )
            })?;
            let content: String = unescape_braced(&chars[i + 1..close]);
            literal_flush(&mut parts, &mut literal);
            let expr = grammar::parse_expression(&content, base + pos + 1, line)?;
            parts.push(TextPart::Substitution(expr));
            i = close + 1;
        } else if ch.is_alphabetic() || ch == '_' {
            let mut end = i;
            while end < chars.len() && (chars[end].1.is_alphanumeric() || chars[end].1 == '_') {
                end += 1;
            }
            let end_pos = chars.get(end).map_or(text.len(), |(p, _)| *p);
            literal_flush(&mut parts, &mut literal);
            let name = Identifier::new(&text[pos..end_pos]);
            parts.push(TextPart::Substitution(Spanned::new(
                Expr::Name(name),
                base + pos..base + end_pos,
            )));
            i = end;
        } else {
            // Not a substitution: keep the placeholder and reprocess `ch`
            literal.push(placeholder);
        }
    }

    if pending {
        literal.push(placeholder);
    }
    literal_flush(&mut parts, &mut literal);
    Ok(parts)
}

fn literal_flush(parts: &mut Vec<TextPart>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(TextPart::Literal(std::mem::take(literal)));
    }
}

/// Index of the first `}` not preceded by a backslash escape
fn find_close_brace(chars: &[(usize, char)], from: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        match chars[i].1 {
            '\\' if i + 1 < chars.len() => i += 2,
            '}' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn unescape_braced(chars: &[(usize, char)]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].1 == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1].1);
            i += 2;
        } else {
            out.push(chars[i].1);
            i += 1;
        }
    }
    out
}
