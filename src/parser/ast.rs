//! Syntax tree types for template modules and the directive expression language

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
        }
    }
}

/// Expression in the directive language
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(Identifier),
    Int(i64),
    Str(String),
    Bool(bool),
    Neg(Box<Spanned<Expr>>),
    Binary {
        op: BinaryOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    /// `target[index]`
    Index {
        target: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    /// `target.field`
    Attribute {
        target: Box<Spanned<Expr>>,
        field: Spanned<Identifier>,
    },
    /// Builtin call such as `len(types)`
    Call {
        function: Spanned<Identifier>,
        args: Vec<Spanned<Expr>>,
    },
}

/// Left-hand side of an assignment or loop header
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(Spanned<Identifier>),
    /// `(a, b)` or `a, b`: destructures a sequence of the same length
    Tuple(Vec<Spanned<Identifier>>),
}

impl Target {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Target::Name(id) => vec![id.node.as_str()],
            Target::Tuple(ids) => ids.iter().map(|id| id.node.as_str()).collect(),
        }
    }
}

/// Single-line `!` statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `target = value`
    Assign { target: Target, value: Spanned<Expr> },
    /// `name += value`
    AddAssign {
        name: Spanned<Identifier>,
        value: Spanned<Expr>,
    },
}

/// Header of a `{` directive line
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOpen {
    For {
        target: Target,
        iterable: Spanned<Expr>,
    },
    If(Spanned<Expr>),
    Elif(Spanned<Expr>),
    Else,
}

/// Piece of a literal text line
#[derive(Debug, Clone, PartialEq)]
pub enum TextPart {
    Literal(String),
    /// `$name` or `${expr}`
    Substitution(Spanned<Expr>),
}

/// One guarded arm of a conditional
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Spanned<Expr>,
    pub body: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentKind {
    Text(Vec<TextPart>),
    Statement(Statement),
    For {
        target: Target,
        iterable: Spanned<Expr>,
        body: Vec<Segment>,
    },
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Segment>>,
    },
}

/// Node of a template body, tagged with the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// 1-based line number in the template source
    pub line: usize,
    /// Byte range of the line (or opening directive) in the template source
    pub span: Span,
}

impl Segment {
    pub fn new(kind: SegmentKind, line: usize, span: Span) -> Self {
        Self { kind, line, span }
    }
}
