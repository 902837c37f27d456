//! Directive grammar implementation using chumsky
//!
//! Each directive line is parsed on its own: the document parser slices the
//! text after the directive marker and hands it here together with its byte
//! offset, so every span in the resulting tree points into the template source.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::TemplateSyntaxError;
use crate::parser::ast::*;
use crate::parser::lexer::{lex, Token};

type Extra<'a> = extra::Err<Rich<'a, Token>>;

/// Parsed `template NAME(PARAM, ...)` header
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateHeader {
    pub name: Spanned<Identifier>,
    /// `None` when no parameter list is given (any bindings accepted)
    pub params: Option<Vec<Spanned<Identifier>>>,
}

/// Parsed `attribute NAME = EXPR` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    pub name: Spanned<Identifier>,
    pub value: Spanned<Expr>,
}

/// Postfix operator applied while folding `a[i].b[j]`
#[derive(Debug, Clone)]
enum Postfix {
    Index(Spanned<Expr>, usize),
    Attribute(Spanned<Identifier>),
}

/// Lex `$input` (which starts at byte `$offset` of the template) and run
/// `$parser` over the whole of it.
macro_rules! run_parser {
    ($parser:expr, $input:expr, $offset:expr, $line:expr) => {{
        let input: &str = $input;
        let offset: usize = $offset;
        let line: usize = $line;
        let tokens = lex(input).map_err(|(span, err)| {
            TemplateSyntaxError::new(
                line,
                span.start + offset..span.end + offset,
                err.message(),
            )
        })?;
        let eoi = offset + input.len();
        let token_iter = tokens.into_iter().map(move |(tok, span)| {
            let span: SimpleSpan = (span.start + offset..span.end + offset).into();
            (tok, span)
        });
        let token_stream =
            Stream::from_iter(token_iter).map((eoi..eoi).into(), |(t, s): (_, _)| (t, s));

        $parser
            .then_ignore(end())
            .parse(token_stream)
            .into_result()
            .map_err(|errs| {
                errs.into_iter()
                    .next()
                    .map(|e| TemplateSyntaxError::from_rich(e, line))
                    .unwrap_or_else(|| {
                        TemplateSyntaxError::new(line, offset..eoi, "malformed directive")
                    })
            })
    }};
}

/// Parse a standalone expression (the inside of `${...}`)
pub fn parse_expression(
    input: &str,
    offset: usize,
    line: usize,
) -> Result<Spanned<Expr>, TemplateSyntaxError> {
    run_parser!(expr_parser(), input, offset, line)
}

/// Parse the body of a `!` statement line
pub fn parse_statement(
    input: &str,
    offset: usize,
    line: usize,
) -> Result<Statement, TemplateSyntaxError> {
    run_parser!(statement_parser(), input, offset, line)
}

/// Parse the body of a `{` block-open line (`for`, `if`, `elif`, `else`)
pub fn parse_block_open(
    input: &str,
    offset: usize,
    line: usize,
) -> Result<BlockOpen, TemplateSyntaxError> {
    run_parser!(block_open_parser(), input, offset, line)
}

/// Parse what follows the `template` keyword
pub fn parse_template_header(
    input: &str,
    offset: usize,
    line: usize,
) -> Result<TemplateHeader, TemplateSyntaxError> {
    run_parser!(template_header_parser(), input, offset, line)
}

/// Parse what follows the `attribute` keyword
pub fn parse_attribute(
    input: &str,
    offset: usize,
    line: usize,
) -> Result<AttributeDecl, TemplateSyntaxError> {
    run_parser!(attribute_parser(), input, offset, line)
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn ident_parser<'a, I>() -> impl Parser<'a, I, Spanned<Identifier>, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())))
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Spanned<Expr>, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = ident_parser();

        let literal = select! {
            Token::Int(n) => Expr::Int(n),
            Token::Str(s) => Expr::Str(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
        }
        .map_with(|node, e| Spanned::new(node, span_range(&e.span())));

        // Builtin call: len(types)
        let call = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .allow_trailing()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .map_with(|(function, args), e| {
                Spanned::new(Expr::Call { function, args }, span_range(&e.span()))
            });

        let name = ident
            .clone()
            .map(|id| Spanned::new(Expr::Name(id.node), id.span));

        let group = expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        // Order matters: a call must be tried before a bare name
        let atom = choice((literal, call, name, group));

        let postfix = choice((
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map_with(|index, e| Postfix::Index(index, span_range(&e.span()).end)),
            just(Token::Dot).ignore_then(ident).map(Postfix::Attribute),
        ));

        let access = atom.foldl(postfix.repeated(), |target, op| match op {
            Postfix::Index(index, end) => {
                let span = target.span.start..end;
                Spanned::new(
                    Expr::Index {
                        target: Box::new(target),
                        index: Box::new(index),
                    },
                    span,
                )
            }
            Postfix::Attribute(field) => {
                let span = target.span.start..field.span.end;
                Spanned::new(
                    Expr::Attribute {
                        target: Box::new(target),
                        field,
                    },
                    span,
                )
            }
        });

        let unary = just(Token::Minus)
            .map_with(|_, e| span_range(&e.span()))
            .or_not()
            .then(access)
            .map(|(minus, operand)| match minus {
                Some(minus) => {
                    let span = minus.start..operand.span.end;
                    Spanned::new(Expr::Neg(Box::new(operand)), span)
                }
                None => operand,
            });

        let op = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));

        unary
            .clone()
            .foldl(op.then(unary).repeated(), |lhs, (op, rhs)| {
                let span = lhs.span.start..rhs.span.end;
                Spanned::new(
                    Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    span,
                )
            })
            .boxed()
    })
}

fn target_parser<'a, I>() -> impl Parser<'a, I, Target, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let names = ident_parser()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    choice((
        names
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        names,
    ))
    .map(|mut names: Vec<Spanned<Identifier>>| {
        if names.len() == 1 {
            Target::Name(names.remove(0))
        } else {
            Target::Tuple(names)
        }
    })
}

fn statement_parser<'a, I>() -> impl Parser<'a, I, Statement, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let add_assign = ident_parser()
        .then_ignore(just(Token::PlusEquals))
        .then(expr_parser())
        .map(|(name, value)| Statement::AddAssign { name, value });

    let assign = target_parser()
        .then_ignore(just(Token::Equals))
        .then(expr_parser())
        .map(|(target, value)| Statement::Assign { target, value });

    // A trailing semicolon is tolerated: `!index = 0;`
    choice((add_assign, assign)).then_ignore(just(Token::Semicolon).or_not())
}

fn block_open_parser<'a, I>() -> impl Parser<'a, I, BlockOpen, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let for_header = just(Token::For)
        .ignore_then(target_parser())
        .then_ignore(just(Token::In))
        .then(expr_parser())
        .map(|(target, iterable)| BlockOpen::For { target, iterable });

    let if_header = just(Token::If).ignore_then(expr_parser()).map(BlockOpen::If);
    let elif_header = just(Token::Elif)
        .ignore_then(expr_parser())
        .map(BlockOpen::Elif);
    let else_header = just(Token::Else).to(BlockOpen::Else);

    choice((for_header, if_header, elif_header, else_header)).then_ignore(just(Token::Colon))
}

fn template_header_parser<'a, I>() -> impl Parser<'a, I, TemplateHeader, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let params = ident_parser()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

    ident_parser()
        .then(params.or_not())
        .then_ignore(just(Token::Colon).or_not())
        .map(|(name, params)| TemplateHeader { name, params })
}

fn attribute_parser<'a, I>() -> impl Parser<'a, I, AttributeDecl, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    ident_parser()
        .then_ignore(just(Token::Equals))
        .then(expr_parser())
        .map(|(name, value)| AttributeDecl { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(input: &str) -> Expr {
        parse_expression(input, 0, 1).expect("Should parse").node
    }

    fn name(s: &str) -> Expr {
        Expr::Name(Identifier::new(s))
    }

    #[test]
    fn test_parse_index_chain() {
        match expr(r#"type["members"][0]"#) {
            Expr::Index { target, index } => {
                assert_eq!(index.node, Expr::Int(0));
                match target.node {
                    Expr::Index { target, index } => {
                        assert_eq!(target.node, name("type"));
                        assert_eq!(index.node, Expr::Str("members".to_string()));
                    }
                    other => panic!("Expected Index, got {:?}", other),
                }
            }
            other => panic!("Expected Index, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_attribute_access() {
        match expr("member.name") {
            Expr::Attribute { target, field } => {
                assert_eq!(target.node, name("member"));
                assert_eq!(field.node.as_str(), "name");
            }
            other => panic!("Expected Attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_call() {
        match expr("len(types)") {
            Expr::Call { function, args } => {
                assert_eq!(function.node.as_str(), "len");
                assert_eq!(args.len(), 1);
                assert_eq!(args[0].node, name("types"));
            }
            other => panic!("Expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_addition_is_left_associative() {
        match expr("a - b + 1") {
            Expr::Binary { op, lhs, rhs } => {
                assert_eq!(op, BinaryOp::Add);
                assert_eq!(rhs.node, Expr::Int(1));
                assert!(matches!(
                    lhs.node,
                    Expr::Binary {
                        op: BinaryOp::Sub,
                        ..
                    }
                ));
            }
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_spans_are_offset() {
        let parsed = parse_expression("count", 100, 4).expect("Should parse");
        assert_eq!(parsed.span, 100..105);
    }

    #[test]
    fn test_parse_tuple_assignment() {
        let stmt = parse_statement("(member_type, member_name) = member", 0, 1)
            .expect("Should parse");
        match stmt {
            Statement::Assign {
                target: Target::Tuple(names),
                value,
            } => {
                assert_eq!(names.len(), 2);
                assert_eq!(names[1].node.as_str(), "member_name");
                assert_eq!(value.node, name("member"));
            }
            other => panic!("Expected tuple assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_assign_with_semicolon() {
        let stmt = parse_statement("index += 1;", 0, 1).expect("Should parse");
        assert!(matches!(stmt, Statement::AddAssign { .. }));
    }

    #[test]
    fn test_parse_for_header() {
        let open = parse_block_open("for (t, n) in pairs:", 0, 1).expect("Should parse");
        match open {
            BlockOpen::For { target, iterable } => {
                assert_eq!(target.names(), vec!["t", "n"]);
                assert_eq!(iterable.node, name("pairs"));
            }
            other => panic!("Expected For, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_else_header() {
        assert_eq!(
            parse_block_open("else:", 0, 1).expect("Should parse"),
            BlockOpen::Else
        );
    }

    #[test]
    fn test_block_header_requires_colon() {
        let err = parse_block_open("if field_count", 0, 9).unwrap_err();
        assert_eq!(err.line, 9);
    }

    #[test]
    fn test_parse_template_header() {
        let header = parse_template_header("make_rtt(name, types)", 0, 1).expect("Should parse");
        assert_eq!(header.name.node.as_str(), "make_rtt");
        let params: Vec<_> = header
            .params
            .expect("Should have params")
            .into_iter()
            .map(|p| p.node.0)
            .collect();
        assert_eq!(params, vec!["name", "types"]);
    }

    #[test]
    fn test_parse_template_header_without_params() {
        let header = parse_template_header("page:", 0, 1).expect("Should parse");
        assert!(header.params.is_none());
    }

    #[test]
    fn test_unrecognised_character_is_syntax_error() {
        let err = parse_expression("a ? b", 10, 3).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.span, 12..13);
    }

    #[test]
    fn test_oversized_integer_literal_is_syntax_error() {
        let err = parse_statement("n = 99999999999999999999", 2, 4).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.span, 6..26);
        assert_eq!(err.message, "integer literal out of range");
    }
}
