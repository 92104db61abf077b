//! Expression AST types.
//!
//! Expressions start life unresolved out of the parser; the analyzer fills
//! in the [`Resolved`] annotation on every column reference and the column
//! type on every assignment before the executor sees them.

use crate::datum::DatumType;
use crate::lexer::Span;

/// A literal value as written in the query.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f32),
    String(String),
    Bytea(Vec<u8>),
    Boolean(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,

    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    And,
    Or,

    Like,
    SimilarTo,
}

impl BinaryOp {
    /// True for the four comparison-producing relational/equality groups.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// True for `+ - * /`.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    /// True for `and`/`or`.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// True for the pattern-match operators.
    #[must_use]
    pub const fn is_pattern(self) -> bool {
        matches!(self, Self::Like | Self::SimilarTo)
    }

    /// The SQL spelling, used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Like => "like",
            Self::SimilarTo => "similar to",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical NOT.
    Not,
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggFunc {
    /// The SQL name of the function.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Count => "count",
            Self::Max => "max",
            Self::Min => "min",
            Self::Sum => "sum",
        }
    }
}

/// Where a column reference lands once the analyzer has resolved it:
/// `scope` is the distance from the innermost scope (0 = current row),
/// `index` the column position within that scope's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub scope: usize,
    pub index: usize,
    pub ty: DatumType,
}

/// A (possibly qualified) column reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table name or alias qualifier, if written.
    pub table: Option<String>,
    /// Column name.
    pub column: String,
    /// Source span for error reporting.
    pub span: Span,
    /// Filled in by the analyzer.
    pub resolved: Option<Resolved>,
}

impl ColumnRef {
    /// Creates an unresolved reference.
    #[must_use]
    pub const fn new(table: Option<String>, column: String, span: Span) -> Self {
        Self {
            table,
            column,
            span,
            resolved: None,
        }
    }

    /// Renders the reference for error messages.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.table {
            Some(t) => format!("{t}.{}", self.column),
            None => self.column.clone(),
        }
    }
}

/// An SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal),

    /// A column reference.
    Column(ColumnRef),

    /// An assignment of a value into a column, produced by rewriting
    /// INSERT value tuples and UPDATE SET clauses at parse time.
    Assign {
        target: ColumnRef,
        value: Box<Expr>,
        /// Declared type of the target column, filled by the analyzer so
        /// the executor can cast the evaluated value if needed.
        column_type: Option<DatumType>,
    },

    /// A binary expression.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// A unary expression.
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// IS NULL / IS NOT NULL.
    IsNull { operand: Box<Expr>, negated: bool },

    /// An aggregate function call.
    Aggregate { func: AggFunc, arg: Box<Expr> },

    /// A user-named function call, routed to the inference adapter.
    Predict { model: String, arg: Box<Expr> },

    /// CAST(expr AS type).
    Cast {
        operand: Box<Expr>,
        target: DatumType,
    },

    /// A scalar subquery.
    Subquery(Box<super::SelectStmt>),

    /// `*` in a projection; expanded by the analyzer.
    Wildcard,
}

impl Expr {
    /// True if any node in the tree is an aggregate call. Computed by the
    /// analyzer per projection column so the executor can pick its
    /// evaluation strategy statically.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate { .. } => true,
            Self::Literal(_) | Self::Column(_) | Self::Wildcard | Self::Subquery(_) => false,
            Self::Assign { value, .. } => value.contains_aggregate(),
            Self::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Self::Unary { operand, .. } | Self::IsNull { operand, .. } => {
                operand.contains_aggregate()
            }
            Self::Predict { arg, .. } => arg.contains_aggregate(),
            Self::Cast { operand, .. } => operand.contains_aggregate(),
        }
    }

    /// A compact rendering used for output column names and for matching
    /// ORDER BY columns against projection columns.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Literal(Literal::Integer(v)) => v.to_string(),
            Self::Literal(Literal::Float(v)) => v.to_string(),
            Self::Literal(Literal::String(s)) => format!("'{s}'"),
            Self::Literal(Literal::Bytea(_)) => "bytea".into(),
            Self::Literal(Literal::Boolean(v)) => v.to_string(),
            Self::Literal(Literal::Null) => "null".into(),
            Self::Column(c) => c.display(),
            Self::Assign { target, value, .. } => {
                format!("{} = {}", target.display(), value.display_name())
            }
            Self::Binary { op, left, right } => format!(
                "({} {} {})",
                left.display_name(),
                op.as_str(),
                right.display_name()
            ),
            Self::Unary { op, operand } => match op {
                UnaryOp::Neg => format!("(- {})", operand.display_name()),
                UnaryOp::Not => format!("(not {})", operand.display_name()),
            },
            Self::IsNull { operand, negated } => {
                if *negated {
                    format!("({} is not null)", operand.display_name())
                } else {
                    format!("({} is null)", operand.display_name())
                }
            }
            Self::Aggregate { func, arg } => format!("{}({})", func.name(), arg.display_name()),
            Self::Predict { model, arg } => format!("{model}({})", arg.display_name()),
            Self::Cast { operand, target } => {
                format!("cast({} as {})", operand.display_name(), target.name())
            }
            Self::Subquery(_) => "subquery".into(),
            Self::Wildcard => "*".into(),
        }
    }
}

/// One ORDER BY column with its direction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub expr: Expr,
    pub asc: bool,
}
