//! Lexer for the directive expression language using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Why a directive failed to lex
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LexError {
    #[default]
    UnrecognisedCharacter,
    IntegerOutOfRange,
}

impl LexError {
    pub fn message(&self) -> &'static str {
        match self {
            LexError::UnrecognisedCharacter => "unrecognised character in directive",
            LexError::IntegerOutOfRange => "integer literal out of range",
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(error = LexError)]
pub enum Token {
    // Block keywords
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,

    #[token("true")]
    #[token("True")]
    True,
    #[token("false")]
    #[token("False")]
    False,

    // Operators (longer patterns first)
    #[token("+=")]
    PlusEquals,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("=")]
    Equals,

    // Delimiters
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().map_err(|_| LexError::IntegerOutOfRange))]
    Int(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    Str(String),
}

/// Strip the quotes from a string literal and resolve backslash escapes
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans
///
/// Returns the span of the first bad token and the reason on failure.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, (Span, LexError)> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(t) => Ok((t, span)),
            Err(e) => Err((span, e)),
        })
        .collect()
}

/// Human-readable token description for error messages
pub fn describe(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Int(n) => format!("integer {}", n),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::For => "keyword 'for'".to_string(),
        Token::In => "keyword 'in'".to_string(),
        Token::If => "keyword 'if'".to_string(),
        Token::Elif => "keyword 'elif'".to_string(),
        Token::Else => "keyword 'else'".to_string(),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::PlusEquals => "'+='".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Semicolon => "';'".to_string(),
        Token::Dot => "'.'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).expect("should lex").into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_loop_header() {
        assert_eq!(
            tokens("for member in type[\"members\"]:"),
            vec![
                Token::For,
                Token::Ident("member".to_string()),
                Token::In,
                Token::Ident("type".to_string()),
                Token::BracketOpen,
                Token::Str("members".to_string()),
                Token::BracketClose,
                Token::Colon,
            ]
        );
    }

    #[test]
    fn test_keywords_inside_identifiers() {
        assert_eq!(
            tokens("format index iffy"),
            vec![
                Token::Ident("format".to_string()),
                Token::Ident("index".to_string()),
                Token::Ident("iffy".to_string()),
            ]
        );
    }

    #[test]
    fn test_assignment_operators() {
        assert_eq!(
            tokens("index += 1;"),
            vec![
                Token::Ident("index".to_string()),
                Token::PlusEquals,
                Token::Int(1),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "a\tb""#),
            vec![Token::Str("it's".to_string()), Token::Str("a\tb".to_string())]
        );
    }

    #[test]
    fn test_bool_spellings() {
        assert_eq!(
            tokens("true True false False"),
            vec![Token::True, Token::True, Token::False, Token::False]
        );
    }

    #[test]
    fn test_unrecognised_character() {
        assert_eq!(lex("a ? b"), Err((2..3, LexError::UnrecognisedCharacter)));
    }

    #[test]
    fn test_integer_out_of_range() {
        assert_eq!(
            lex("x = 99999999999999999999"),
            Err((4..24, LexError::IntegerOutOfRange))
        );
        assert_eq!(tokens("9223372036854775807"), vec![Token::Int(i64::MAX)]);
    }
}
