//! Recursive-descent statement parser with Pratt expression parsing.

use super::pratt::{infix_binding_power, token_to_binary_op, UNARY_BP};
use crate::ast::{
    ColumnDef, ColumnRef, CreateTableStmt, DeleteStmt, Expr, InsertStmt, Literal, OrderSpec, Scan,
    SelectStmt, Statement, TxnOp, UnaryOp, UpdateStmt,
};
use crate::ast::{AggFunc, BinaryOp};
use crate::datum::DatumType;
use crate::error::{Error, Result};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};

/// SQL parser over a pre-lexed token stream. One token of lookahead, plus
/// a second peek to disambiguate `NOT LIKE` / `NOT SIMILAR TO` from the
/// unary `NOT`.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Creates a parser from a token stream ending in `Eof`.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Tokenizes and parses a complete query text.
    pub fn parse_text(input: &str) -> Result<Vec<Statement>> {
        let tokens = Lexer::new(input).tokenize()?;
        Self::new(tokens).parse_statements()
    }

    /// Parses every statement in the stream.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>> {
        let mut stmts = Vec::new();
        while !self.peek().is_eof() {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// The token after the next one.
    fn peek_two(&self) -> &TokenKind {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn advance_if(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance_if_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_here(&self, expected: &str) -> Error {
        Error::parse_at(
            format!("expected {expected}, found {}", self.peek_kind().describe()),
            self.peek().span.start,
        )
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, expected: &str) -> Result<()> {
        if self.advance_if_keyword(kw) {
            Ok(())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String> {
        match self.peek_kind() {
            TokenKind::Identifier(_) => {
                let token = self.advance();
                match token.kind {
                    TokenKind::Identifier(name) => Ok(name),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.error_here(expected)),
        }
    }

    fn expect_semicolon(&mut self) -> Result<()> {
        self.expect(&TokenKind::Semicolon, "';' at end of statement")?;
        Ok(())
    }

    fn expect_data_type(&mut self) -> Result<DatumType> {
        if let TokenKind::Keyword(kw) = self.peek_kind() {
            if let Some(ty) = kw.datum_type() {
                self.advance();
                return Ok(ty);
            }
        }
        Err(self.error_here("a data type (int8, float4, text, bool, bytea, timestamp)"))
    }

    /* --- statements --- */

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek_kind() {
            TokenKind::Keyword(Keyword::Create) => self.parse_create(),
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert(),
            TokenKind::Keyword(Keyword::Select) => {
                let stmt = self.parse_select()?;
                self.advance_if(&TokenKind::Semicolon);
                Ok(Statement::Select(stmt))
            }
            TokenKind::Keyword(Keyword::Update) => self.parse_update(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(),
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop(),
            TokenKind::Keyword(Keyword::Describe) => self.parse_describe(),
            TokenKind::Keyword(Keyword::Begin) => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Txn(TxnOp::Begin))
            }
            TokenKind::Keyword(Keyword::Commit) => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Txn(TxnOp::Commit))
            }
            TokenKind::Keyword(Keyword::Rollback) => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Txn(TxnOp::Rollback))
            }
            _ => Err(self.error_here("a statement")),
        }
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Create, "'create'")?;

        if self.advance_if_keyword(Keyword::Table) {
            return self.parse_create_table();
        }

        self.expect_keyword(Keyword::Model, "'table' or 'model' after 'create'")?;
        let name = self.expect_identifier("a model name")?;
        self.expect(&TokenKind::LeftParen, "'(' before the model path")?;
        let path = match self.peek_kind() {
            TokenKind::String(_) => match self.advance().kind {
                TokenKind::String(s) => s,
                _ => unreachable!(),
            },
            _ => return Err(self.error_here("a quoted path to the model artifact")),
        };
        self.expect(&TokenKind::RightParen, "')' after the model path")?;
        self.expect_semicolon()?;
        Ok(Statement::CreateModel { name, path })
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        let table = self.expect_identifier("a table name")?;
        self.expect(&TokenKind::LeftParen, "'(' after the table name")?;

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut primary_key: Vec<String> = Vec::new();
        let mut uniques: Vec<(Vec<String>, bool)> = Vec::new();

        while !self.advance_if(&TokenKind::RightParen) {
            if self.advance_if_keyword(Keyword::Primary) {
                if !primary_key.is_empty() {
                    return Err(self.error_here("at most one primary key constraint"));
                }
                self.expect_keyword(Keyword::Key, "'key' after 'primary'")?;
                self.expect(&TokenKind::LeftParen, "'(' before the primary key columns")?;
                while !self.advance_if(&TokenKind::RightParen) {
                    primary_key.push(self.expect_identifier("a primary key column name")?);
                    self.advance_if(&TokenKind::Comma);
                }
            } else if self.advance_if_keyword(Keyword::Unique) {
                self.expect(&TokenKind::LeftParen, "'(' before the unique columns")?;
                let mut cols = Vec::new();
                while !self.advance_if(&TokenKind::RightParen) {
                    cols.push(self.expect_identifier("a unique column name")?);
                    self.advance_if(&TokenKind::Comma);
                }
                self.expect_keyword(
                    Keyword::Nulls,
                    "'nulls distinct' or 'nulls not distinct' after the unique columns",
                )?;
                let nulls_distinct = if self.advance_if_keyword(Keyword::Not) {
                    self.expect_keyword(Keyword::Distinct, "'distinct' after 'not'")?;
                    false
                } else {
                    self.expect_keyword(Keyword::Distinct, "'distinct' or 'not distinct'")?;
                    true
                };
                uniques.push((cols, nulls_distinct));
            } else {
                let name = self.expect_identifier("a column name")?;
                let ty = self.expect_data_type()?;
                let not_null = if self.advance_if_keyword(Keyword::Not) {
                    self.expect_keyword(Keyword::Null, "'null' after 'not'")?;
                    true
                } else {
                    false
                };
                // Inline `primary key` on a single column.
                if self.advance_if_keyword(Keyword::Primary) {
                    self.expect_keyword(Keyword::Key, "'key' after 'primary'")?;
                    if !primary_key.is_empty() {
                        return Err(self.error_here("at most one primary key constraint"));
                    }
                    primary_key.push(name.clone());
                }
                columns.push(ColumnDef { name, ty, not_null });
            }
            self.advance_if(&TokenKind::Comma);
        }

        self.expect_semicolon()?;
        Ok(Statement::CreateTable(CreateTableStmt::new(
            table,
            columns,
            primary_key,
            uniques,
        )))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Insert, "'insert'")?;
        self.expect_keyword(Keyword::Into, "'into' after 'insert'")?;
        let target = self.parse_scan()?;

        self.expect(&TokenKind::LeftParen, "'(' and column names")?;
        let mut cols: Vec<ColumnRef> = Vec::new();
        while !self.advance_if(&TokenKind::RightParen) {
            cols.push(self.parse_column_ref()?);
            self.advance_if(&TokenKind::Comma);
        }

        self.expect_keyword(Keyword::Values, "'values'")?;
        let mut assigns: Vec<Vec<Expr>> = Vec::new();
        while self.advance_if(&TokenKind::LeftParen) {
            let mut tuple = Vec::new();
            while !self.advance_if(&TokenKind::RightParen) {
                let target_col = cols.get(tuple.len()).cloned().ok_or_else(|| {
                    self.error_here("a value tuple no wider than the column list")
                })?;
                let value = self.parse_expr(0)?;
                tuple.push(Expr::Assign {
                    target: target_col,
                    value: Box::new(value),
                    column_type: None,
                });
                self.advance_if(&TokenKind::Comma);
            }
            if tuple.len() != cols.len() {
                return Err(self.error_here("a value for every listed column"));
            }
            assigns.push(tuple);
            self.advance_if(&TokenKind::Comma);
        }
        self.expect_semicolon()?;

        Ok(Statement::Insert(InsertStmt { target, assigns }))
    }

    /// Parses a SELECT without its trailing semicolon, so the same path
    /// serves statements and scalar subqueries.
    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.expect_keyword(Keyword::Select, "'select'")?;
        let distinct = self.advance_if_keyword(Keyword::Distinct);

        let mut projections = vec![self.parse_expr(0)?];
        while self.advance_if(&TokenKind::Comma) {
            projections.push(self.parse_expr(0)?);
        }

        let mut scan = if self.advance_if_keyword(Keyword::From) {
            self.parse_scan()?
        } else {
            Scan::Constant {
                exprs: projections.clone(),
                attrs: None,
            }
        };

        if self.advance_if_keyword(Keyword::Where) {
            let predicate = self.parse_expr(0)?;
            scan = Scan::Select {
                input: Box::new(scan),
                predicate,
                attrs: None,
            };
        }

        let mut group_by = Vec::new();
        if self.advance_if_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By, "'by' after 'group'")?;
            group_by.push(self.parse_expr(0)?);
            while self.advance_if(&TokenKind::Comma) {
                group_by.push(self.parse_expr(0)?);
            }
        }

        let having = if self.advance_if_keyword(Keyword::Having) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.advance_if_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By, "'by' after 'order'")?;
            loop {
                let expr = self.parse_expr(0)?;
                let asc = if self.advance_if_keyword(Keyword::Asc) {
                    true
                } else if self.advance_if_keyword(Keyword::Desc) {
                    false
                } else {
                    return Err(self.error_here("'asc' or 'desc' after the order column"));
                };
                order_by.push(OrderSpec { expr, asc });
                if !self.advance_if(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let limit = if self.advance_if_keyword(Keyword::Limit) {
            self.parse_expr(0)?
        } else {
            Expr::Literal(Literal::Integer(-1))
        };

        Ok(SelectStmt {
            scan: Scan::Project {
                input: Box::new(scan),
                projections,
                group_by,
                having,
                order_by,
                limit,
                distinct,
                ghost_cols: 0,
                agg_cols: Vec::new(),
                attrs: None,
            },
        })
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Update, "'update'")?;
        let target = self.parse_scan()?;
        self.expect_keyword(Keyword::Set, "'set' after the table name")?;

        let mut assigns = Vec::new();
        while !(self.check(&TokenKind::Semicolon) || self.check_keyword(Keyword::Where)) {
            let target_col = self.parse_column_ref()?;
            self.expect(&TokenKind::Eq, "'=' after the column name")?;
            let value = self.parse_expr(0)?;
            assigns.push(Expr::Assign {
                target: target_col,
                value: Box::new(value),
                column_type: None,
            });
            self.advance_if(&TokenKind::Comma);
        }

        let scan = if self.advance_if_keyword(Keyword::Where) {
            let predicate = self.parse_expr(0)?;
            Scan::Select {
                input: Box::new(target),
                predicate,
                attrs: None,
            }
        } else {
            target
        };
        self.expect_semicolon()?;

        Ok(Statement::Update(UpdateStmt { scan, assigns }))
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Delete, "'delete'")?;
        self.expect_keyword(Keyword::From, "'from' after 'delete'")?;
        let name = self.expect_identifier("a table name")?;
        let table = Scan::Table {
            name,
            alias: None,
            schema: None,
            attrs: None,
        };

        let scan = if self.advance_if_keyword(Keyword::Where) {
            let predicate = self.parse_expr(0)?;
            Scan::Select {
                input: Box::new(table),
                predicate,
                attrs: None,
            }
        } else {
            table
        };
        self.expect_semicolon()?;

        Ok(Statement::Delete(DeleteStmt { scan }))
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Drop, "'drop'")?;
        let is_table = if self.advance_if_keyword(Keyword::Table) {
            true
        } else {
            self.expect_keyword(Keyword::Model, "'table' or 'model' after 'drop'")?;
            false
        };

        let if_exists = if self.advance_if_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Exists, "'exists' after 'if'")?;
            true
        } else {
            false
        };

        let name = self.expect_identifier(if is_table {
            "a table name"
        } else {
            "a model name"
        })?;
        self.expect_semicolon()?;

        Ok(if is_table {
            Statement::DropTable {
                table: name,
                if_exists,
            }
        } else {
            Statement::DropModel { name, if_exists }
        })
    }

    fn parse_describe(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Describe, "'describe'")?;
        self.expect_keyword(Keyword::Table, "'table' after 'describe'")?;
        let table = self.expect_identifier("a table name")?;
        self.expect_semicolon()?;
        Ok(Statement::DescribeTable { table })
    }

    /* --- scans --- */

    fn parse_scan(&mut self) -> Result<Scan> {
        let mut left = self.parse_scan_primary()?;

        loop {
            let join = match self.peek_kind() {
                TokenKind::Keyword(
                    kw @ (Keyword::Cross
                    | Keyword::Inner
                    | Keyword::Left
                    | Keyword::Right
                    | Keyword::Full),
                ) => *kw,
                _ => break,
            };
            self.advance();
            self.expect_keyword(Keyword::Join, "'join' after the join kind")?;
            let right = self.parse_scan_primary()?;

            left = match join {
                Keyword::Cross => Scan::Product {
                    left: Box::new(left),
                    right: Box::new(right),
                    attrs: None,
                },
                Keyword::Inner => {
                    self.expect_keyword(Keyword::On, "'on' and a join predicate")?;
                    let on = self.parse_expr(0)?;
                    Scan::Select {
                        input: Box::new(Scan::Product {
                            left: Box::new(left),
                            right: Box::new(right),
                            attrs: None,
                        }),
                        predicate: on,
                        attrs: None,
                    }
                }
                kw => {
                    self.expect_keyword(Keyword::On, "'on' and a join predicate")?;
                    let on = self.parse_expr(0)?;
                    Scan::OuterSelect {
                        left: Box::new(left),
                        right: Box::new(right),
                        predicate: on,
                        include_left: matches!(kw, Keyword::Left | Keyword::Full),
                        include_right: matches!(kw, Keyword::Right | Keyword::Full),
                        attrs: None,
                    }
                }
            };
        }

        Ok(left)
    }

    fn parse_scan_primary(&mut self) -> Result<Scan> {
        let name = self.expect_identifier("a table name")?;
        let alias = if self.advance_if_keyword(Keyword::As) {
            Some(self.expect_identifier("an alias after 'as'")?)
        } else {
            None
        };
        Ok(Scan::Table {
            name,
            alias,
            schema: None,
            attrs: None,
        })
    }

    /* --- expressions --- */

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let span = self.peek().span;
        let first = self.expect_identifier("a column name")?;
        if self.advance_if(&TokenKind::Dot) {
            let column = self.expect_identifier("a column name after '.'")?;
            Ok(ColumnRef::new(Some(first), column, span))
        } else {
            Ok(ColumnRef::new(None, first, span))
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // NOT at infix position introduces NOT LIKE / NOT SIMILAR TO.
            let negated_pattern = self.check_keyword(Keyword::Not)
                && matches!(
                    self.peek_two(),
                    TokenKind::Keyword(Keyword::Like | Keyword::Similar)
                );

            let kind = if negated_pattern {
                TokenKind::Keyword(Keyword::Like)
            } else {
                self.peek_kind().clone()
            };

            let Some((left_bp, right_bp)) = infix_binding_power(&kind) else {
                break;
            };
            if left_bp < min_bp {
                break;
            }

            if negated_pattern {
                self.advance(); // not
                let op = self.parse_pattern_op()?;
                let rhs = self.parse_expr(right_bp)?;
                lhs = Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(Expr::Binary {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    }),
                };
                continue;
            }

            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Is) => {
                    self.advance();
                    let negated = self.advance_if_keyword(Keyword::Not);
                    self.expect_keyword(Keyword::Null, "'null' after 'is'")?;
                    lhs = Expr::IsNull {
                        operand: Box::new(lhs),
                        negated,
                    };
                }
                TokenKind::Keyword(Keyword::Like | Keyword::Similar) => {
                    let op = self.parse_pattern_op()?;
                    let rhs = self.parse_expr(right_bp)?;
                    lhs = Expr::Binary {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    };
                }
                _ => {
                    let op = token_to_binary_op(self.peek_kind())
                        .ok_or_else(|| self.error_here("a binary operator"))?;
                    self.advance();
                    let rhs = self.parse_expr(right_bp)?;
                    lhs = Expr::Binary {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    };
                }
            }
        }

        Ok(lhs)
    }

    /// Consumes `like` or `similar to`, returning the operator.
    fn parse_pattern_op(&mut self) -> Result<BinaryOp> {
        if self.advance_if_keyword(Keyword::Like) {
            Ok(BinaryOp::Like)
        } else {
            self.expect_keyword(Keyword::Similar, "'like' or 'similar'")?;
            self.expect_keyword(Keyword::To, "'to' after 'similar'")?;
            Ok(BinaryOp::SimilarTo)
        }
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_expr(UNARY_BP)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                let operand = self.parse_expr(UNARY_BP)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek_kind().clone() {
            TokenKind::Integer(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(v)))
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(v)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Bytea(b) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bytea(b)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Star => {
                self.advance();
                Ok(Expr::Wildcard)
            }
            TokenKind::Keyword(Keyword::Cast) => {
                self.advance();
                self.expect(&TokenKind::LeftParen, "'(' after 'cast'")?;
                let operand = self.parse_expr(0)?;
                self.expect_keyword(Keyword::As, "'as' after the expression to cast")?;
                let target = self.expect_data_type()?;
                self.expect(&TokenKind::RightParen, "')' after the cast type")?;
                Ok(Expr::Cast {
                    operand: Box::new(operand),
                    target,
                })
            }
            TokenKind::Keyword(kw) if kw.is_aggregate() => {
                self.advance();
                self.expect(&TokenKind::LeftParen, "'(' after the function name")?;
                let arg = self.parse_expr(0)?;
                self.expect(&TokenKind::RightParen, "')' after the function argument")?;
                let func = match kw {
                    Keyword::Avg => AggFunc::Avg,
                    Keyword::Count => AggFunc::Count,
                    Keyword::Max => AggFunc::Max,
                    Keyword::Min => AggFunc::Min,
                    _ => AggFunc::Sum,
                };
                Ok(Expr::Aggregate {
                    func,
                    arg: Box::new(arg),
                })
            }
            TokenKind::Keyword(Keyword::Select) => {
                let stmt = self.parse_select()?;
                Ok(Expr::Subquery(Box::new(stmt)))
            }
            TokenKind::Identifier(_) => {
                // Either a column reference or a user-named function call
                // routed to the inference adapter.
                if matches!(self.peek_two(), TokenKind::LeftParen) {
                    let model = self.expect_identifier("a function name")?;
                    self.advance(); // (
                    let arg = self.parse_expr(0)?;
                    self.expect(&TokenKind::RightParen, "')' after the function argument")?;
                    Ok(Expr::Predict {
                        model,
                        arg: Box::new(arg),
                    })
                } else {
                    Ok(Expr::Column(self.parse_column_ref()?))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = if self.check_keyword(Keyword::Select) {
                    let stmt = self.parse_select()?;
                    Expr::Subquery(Box::new(stmt))
                } else {
                    self.parse_expr(0)?
                };
                self.expect(&TokenKind::RightParen, "')' after the expression")?;
                Ok(expr)
            }
            _ => Err(self.error_here("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(sql: &str) -> Statement {
        let mut stmts = Parser::parse_text(sql).unwrap();
        assert_eq!(stmts.len(), 1, "expected one statement in {sql:?}");
        stmts.pop().unwrap()
    }

    fn parse_err(sql: &str) -> Error {
        Parser::parse_text(sql).expect_err(&format!("expected parse error for {sql:?}"))
    }

    fn select_scan(sql: &str) -> Scan {
        match parse_one(sql) {
            Statement::Select(s) => s.scan,
            other => panic!("expected SELECT, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence_shapes_tree() {
        let scan = select_scan("SELECT 1 + 2 * 3;");
        let Scan::Project { projections, .. } = scan else {
            panic!()
        };
        let Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } = &projections[0]
        else {
            panic!("expected + at the root: {:?}", projections[0])
        };
        assert!(matches!(
            **right,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let scan = select_scan("SELECT true or false and false;");
        let Scan::Project { projections, .. } = scan else {
            panic!()
        };
        assert!(matches!(
            &projections[0],
            Expr::Binary {
                op: BinaryOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_is_null_and_negation() {
        let scan = select_scan("SELECT a FROM t WHERE a IS NOT NULL;");
        let Scan::Project { input, .. } = scan else {
            panic!()
        };
        let Scan::Select { predicate, .. } = *input else {
            panic!()
        };
        assert!(matches!(
            predicate,
            Expr::IsNull { negated: true, .. }
        ));
    }

    #[test]
    fn test_not_like_wraps_in_not() {
        let scan = select_scan("SELECT a FROM t WHERE a NOT LIKE 'x%';");
        let Scan::Project { input, .. } = scan else {
            panic!()
        };
        let Scan::Select { predicate, .. } = *input else {
            panic!()
        };
        let Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } = predicate
        else {
            panic!("expected not(...): {predicate:?}")
        };
        assert!(matches!(
            *operand,
            Expr::Binary {
                op: BinaryOp::Like,
                ..
            }
        ));
    }

    #[test]
    fn test_similar_to_requires_to() {
        assert!(matches!(
            parse_err("SELECT a FROM t WHERE a SIMILAR 'x';"),
            Error::Parse(_)
        ));
    }

    #[test]
    fn test_create_table_with_constraints() {
        let stmt = parse_one(
            "CREATE TABLE t (a int8, b text not null, PRIMARY KEY (a), UNIQUE (b) NULLS DISTINCT);",
        );
        let Statement::CreateTable(create) = stmt else {
            panic!()
        };
        assert_eq!(create.table, "t");
        // _rowid, a, b
        assert_eq!(create.columns.len(), 3);
        assert_eq!(create.uniques[0], vec!["a".to_string()]);
        assert_eq!(create.uniques[1], vec!["b".to_string(), "_rowid".to_string()]);
    }

    #[test]
    fn test_insert_rewrites_to_assignments() {
        let stmt = parse_one("INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y');");
        let Statement::Insert(insert) = stmt else {
            panic!()
        };
        assert_eq!(insert.assigns.len(), 2);
        assert!(matches!(insert.assigns[0][0], Expr::Assign { .. }));
    }

    #[test]
    fn test_insert_arity_mismatch_is_rejected() {
        assert!(matches!(
            parse_err("INSERT INTO t (a, b) VALUES (1);"),
            Error::Parse(_)
        ));
        assert!(matches!(
            parse_err("INSERT INTO t (a) VALUES (1, 2);"),
            Error::Parse(_)
        ));
    }

    #[test]
    fn test_select_clauses() {
        let scan = select_scan(
            "SELECT DISTINCT a, b FROM t WHERE a > 1 ORDER BY a ASC, b DESC LIMIT 10;",
        );
        let Scan::Project {
            order_by,
            distinct,
            limit,
            ..
        } = scan
        else {
            panic!()
        };
        assert!(distinct);
        assert_eq!(order_by.len(), 2);
        assert!(order_by[0].asc);
        assert!(!order_by[1].asc);
        assert_eq!(limit, Expr::Literal(Literal::Integer(10)));
    }

    #[test]
    fn test_order_by_requires_direction() {
        assert!(matches!(
            parse_err("SELECT a FROM t ORDER BY a;"),
            Error::Parse(_)
        ));
    }

    #[test]
    fn test_join_forms() {
        let scan = select_scan("SELECT * FROM a CROSS JOIN b;");
        let Scan::Project { input, .. } = scan else {
            panic!()
        };
        assert!(matches!(*input, Scan::Product { .. }));

        let scan = select_scan("SELECT * FROM a INNER JOIN b ON a.x = b.x;");
        let Scan::Project { input, .. } = scan else {
            panic!()
        };
        let Scan::Select { input, .. } = *input else {
            panic!()
        };
        assert!(matches!(*input, Scan::Product { .. }));

        let scan = select_scan("SELECT * FROM a LEFT JOIN b ON a.x = b.x;");
        let Scan::Project { input, .. } = scan else {
            panic!()
        };
        assert!(matches!(
            *input,
            Scan::OuterSelect {
                include_left: true,
                include_right: false,
                ..
            }
        ));

        let scan = select_scan("SELECT * FROM a FULL JOIN b ON a.x = b.x;");
        let Scan::Project { input, .. } = scan else {
            panic!()
        };
        assert!(matches!(
            *input,
            Scan::OuterSelect {
                include_left: true,
                include_right: true,
                ..
            }
        ));
    }

    #[test]
    fn test_update_and_delete_where_wraps_scan() {
        let Statement::Update(update) = parse_one("UPDATE t SET a = 2 WHERE a = 1;") else {
            panic!()
        };
        assert!(matches!(update.scan, Scan::Select { .. }));
        assert_eq!(update.assigns.len(), 1);

        let Statement::Delete(delete) = parse_one("DELETE FROM t;") else {
            panic!()
        };
        assert!(matches!(delete.scan, Scan::Table { .. }));
    }

    #[test]
    fn test_scalar_subquery_in_where() {
        let scan = select_scan("SELECT a FROM t WHERE a = (SELECT max(b) FROM u);");
        let Scan::Project { input, .. } = scan else {
            panic!()
        };
        let Scan::Select { predicate, .. } = *input else {
            panic!()
        };
        let Expr::Binary { right, .. } = predicate else {
            panic!()
        };
        assert!(matches!(*right, Expr::Subquery(_)));
    }

    #[test]
    fn test_cast_and_predict() {
        let scan = select_scan("SELECT cast(a AS float4), classify(b) FROM t;");
        let Scan::Project { projections, .. } = scan else {
            panic!()
        };
        assert!(matches!(
            projections[0],
            Expr::Cast {
                target: DatumType::Float4,
                ..
            }
        ));
        assert!(matches!(projections[1], Expr::Predict { .. }));
    }

    #[test]
    fn test_txn_control_and_ddl() {
        assert_eq!(parse_one("BEGIN;"), Statement::Txn(TxnOp::Begin));
        assert_eq!(parse_one("COMMIT;"), Statement::Txn(TxnOp::Commit));
        assert_eq!(parse_one("ROLLBACK;"), Statement::Txn(TxnOp::Rollback));
        assert_eq!(
            parse_one("DROP TABLE IF EXISTS t;"),
            Statement::DropTable {
                table: "t".into(),
                if_exists: true
            }
        );
        assert_eq!(
            parse_one("DROP MODEL m;"),
            Statement::DropModel {
                name: "m".into(),
                if_exists: false
            }
        );
        assert_eq!(
            parse_one("DESCRIBE TABLE t;"),
            Statement::DescribeTable { table: "t".into() }
        );
    }

    #[test]
    fn test_multiple_statements() {
        let stmts = Parser::parse_text("BEGIN; SELECT 1; COMMIT;").unwrap();
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_missing_semicolon_fails_fast() {
        assert!(matches!(parse_err("DELETE FROM t"), Error::Parse(_)));
    }
}
