//! Token types for the SQL lexer.

use super::Span;
use crate::datum::DatumType;

/// SQL keywords recognised by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // DDL
    Create,
    Table,
    Model,
    Drop,
    If,
    Exists,
    Describe,
    Primary,
    Key,
    Unique,
    Nulls,

    // Data types
    Int8,
    Float4,
    Text,
    Bool,
    Bytea,
    Timestamp,

    // DML
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,

    // DQL
    Select,
    From,
    Where,
    Group,
    Having,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Distinct,
    As,
    Cast,

    // Joins
    Cross,
    Join,
    Inner,
    Left,
    Right,
    Full,
    On,

    // Operators and predicates
    And,
    Or,
    Not,
    Is,
    Null,
    Like,
    Similar,
    To,
    True,
    False,

    // Aggregates
    Avg,
    Count,
    Max,
    Min,
    Sum,

    // Transactions
    Begin,
    Commit,
    Rollback,
}

impl Keyword {
    /// Matches a lowercased identifier against the keyword table.
    #[must_use]
    pub fn from_str(text: &str) -> Option<Self> {
        Some(match text.to_ascii_lowercase().as_str() {
            "create" => Self::Create,
            "table" => Self::Table,
            "model" => Self::Model,
            "drop" => Self::Drop,
            "if" => Self::If,
            "exists" => Self::Exists,
            "describe" => Self::Describe,
            "primary" => Self::Primary,
            "key" => Self::Key,
            "unique" => Self::Unique,
            "nulls" => Self::Nulls,
            "int8" => Self::Int8,
            "float4" => Self::Float4,
            "text" => Self::Text,
            "bool" => Self::Bool,
            "bytea" => Self::Bytea,
            "timestamp" => Self::Timestamp,
            "insert" => Self::Insert,
            "into" => Self::Into,
            "values" => Self::Values,
            "update" => Self::Update,
            "set" => Self::Set,
            "delete" => Self::Delete,
            "select" => Self::Select,
            "from" => Self::From,
            "where" => Self::Where,
            "group" => Self::Group,
            "having" => Self::Having,
            "order" => Self::Order,
            "by" => Self::By,
            "asc" => Self::Asc,
            "desc" => Self::Desc,
            "limit" => Self::Limit,
            "distinct" => Self::Distinct,
            "as" => Self::As,
            "cast" => Self::Cast,
            "cross" => Self::Cross,
            "join" => Self::Join,
            "inner" => Self::Inner,
            "left" => Self::Left,
            "right" => Self::Right,
            "full" => Self::Full,
            "on" => Self::On,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "is" => Self::Is,
            "null" => Self::Null,
            "like" => Self::Like,
            "similar" => Self::Similar,
            "to" => Self::To,
            "true" => Self::True,
            "false" => Self::False,
            "avg" => Self::Avg,
            "count" => Self::Count,
            "max" => Self::Max,
            "min" => Self::Min,
            "sum" => Self::Sum,
            "begin" => Self::Begin,
            "commit" => Self::Commit,
            "rollback" => Self::Rollback,
            _ => return None,
        })
    }

    /// The datum type named by this keyword, if it is a type name.
    #[must_use]
    pub const fn datum_type(self) -> Option<DatumType> {
        Some(match self {
            Self::Int8 => DatumType::Int8,
            Self::Float4 => DatumType::Float4,
            Self::Text => DatumType::Text,
            Self::Bool => DatumType::Bool,
            Self::Bytea => DatumType::Bytea,
            Self::Timestamp => DatumType::Timestamp,
            _ => return None,
        })
    }

    /// True for the aggregate function keywords.
    #[must_use]
    pub const fn is_aggregate(self) -> bool {
        matches!(self, Self::Avg | Self::Count | Self::Max | Self::Min | Self::Sum)
    }
}

/// The kind of a token, carrying literal payloads where applicable.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A keyword from the fixed table.
    Keyword(Keyword),
    /// A user identifier.
    Identifier(String),
    /// An integer literal.
    Integer(i64),
    /// A float literal.
    Float(f32),
    /// A string literal (single quotes, no escapes).
    String(String),
    /// A bytea literal (`\x` hex pairs).
    Bytea(Vec<u8>),

    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Dot,

    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,

    /// An unrecognised character or malformed literal.
    Error(String),
    /// End of input.
    Eof,
}

impl TokenKind {
    /// A short rendering for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Keyword(k) => format!("keyword '{k:?}'").to_lowercase(),
            Self::Identifier(name) => format!("identifier '{name}'"),
            Self::Integer(v) => format!("integer {v}"),
            Self::Float(v) => format!("float {v}"),
            Self::String(_) => "string literal".into(),
            Self::Bytea(_) => "bytea literal".into(),
            Self::LeftParen => "'('".into(),
            Self::RightParen => "')'".into(),
            Self::Comma => "','".into(),
            Self::Semicolon => "';'".into(),
            Self::Dot => "'.'".into(),
            Self::Eq => "'='".into(),
            Self::NotEq => "'<>'".into(),
            Self::Lt => "'<'".into(),
            Self::LtEq => "'<='".into(),
            Self::Gt => "'>'".into(),
            Self::GtEq => "'>='".into(),
            Self::Plus => "'+'".into(),
            Self::Minus => "'-'".into(),
            Self::Star => "'*'".into(),
            Self::Slash => "'/'".into(),
            Self::Error(msg) => format!("invalid input ({msg})"),
            Self::Eof => "end of input".into(),
        }
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True if this is the end-of-input token.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
