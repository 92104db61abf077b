//! Error types for the silt engine.

/// Errors surfaced by the query pipeline.
///
/// Each variant corresponds to a pipeline phase; the rendered message is
/// prefixed with that phase so clients can tell where a statement failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Lexical error: unrecognised character, unterminated literal.
    #[error("Lex Error: {0}")]
    Lex(String),

    /// Syntactic error: missing expected token, bad keyword sequence.
    #[error("Parse Error: {0}")]
    Parse(String),

    /// Semantic error: unknown column/table, type mismatch, cardinality,
    /// duplicate name.
    #[error("Analysis Error: {0}")]
    Analysis(String),

    /// Runtime constraint violation: not-null, invalid cast, unique key.
    #[error("Constraint Error: {0}")]
    Constraint(String),

    /// Transaction misuse: begin-in-txn, commit/rollback outside one,
    /// statement on an aborted transaction.
    #[error("Transaction Error: {0}")]
    Txn(String),

    /// Underlying key-value store failure.
    #[error("Storage Error: {0}")]
    Storage(String),

    /// Wire protocol failure: truncated frame, disconnect.
    #[error("Protocol Error: {0}")]
    Protocol(String),
}

impl Error {
    /// Convenience constructor for parse errors carrying a byte position.
    pub fn parse_at(message: impl Into<String>, offset: usize) -> Self {
        Self::Parse(format!("{} (at byte {offset})", message.into()))
    }
}

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
