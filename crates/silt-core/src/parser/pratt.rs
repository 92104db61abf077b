//! Operator binding powers for Pratt expression parsing.

use crate::ast::BinaryOp;
use crate::lexer::{Keyword, TokenKind};

/// Binding power of the unary operators (`-`, `not`).
pub const UNARY_BP: u8 = 13;

/// Returns `(left_bp, right_bp)` for an infix token; higher binds tighter,
/// left associative throughout. The equality tier also covers the keyword
/// predicates (`is`, `like`, `similar to`) handled specially by the parser.
#[must_use]
pub const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Keyword(Keyword::Or) => Some((1, 2)),
        TokenKind::Keyword(Keyword::And) => Some((3, 4)),

        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Keyword(Keyword::Is | Keyword::Like | Keyword::Similar) => Some((5, 6)),

        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => Some((7, 8)),

        TokenKind::Plus | TokenKind::Minus => Some((9, 10)),

        TokenKind::Star | TokenKind::Slash => Some((11, 12)),

        _ => None,
    }
}

/// Converts an infix token to its binary operator.
#[must_use]
pub const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        TokenKind::Keyword(Keyword::Like) => Some(BinaryOp::Like),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        let or_bp = infix_binding_power(&TokenKind::Keyword(Keyword::Or)).unwrap();
        let and_bp = infix_binding_power(&TokenKind::Keyword(Keyword::And)).unwrap();
        let eq_bp = infix_binding_power(&TokenKind::Eq).unwrap();
        let lt_bp = infix_binding_power(&TokenKind::Lt).unwrap();
        let add_bp = infix_binding_power(&TokenKind::Plus).unwrap();
        let mul_bp = infix_binding_power(&TokenKind::Star).unwrap();

        assert!(and_bp.0 > or_bp.0);
        assert!(eq_bp.0 > and_bp.0);
        assert!(lt_bp.0 > eq_bp.0);
        assert!(add_bp.0 > lt_bp.0);
        assert!(mul_bp.0 > add_bp.0);
        assert!(UNARY_BP > mul_bp.0);
    }

    #[test]
    fn test_left_associativity() {
        let (left, right) = infix_binding_power(&TokenKind::Plus).unwrap();
        assert!(left < right);
    }
}
