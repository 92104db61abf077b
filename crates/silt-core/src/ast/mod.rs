//! Abstract syntax tree: statements containing scans and expressions.

mod expression;
mod statement;

pub use expression::{
    AggFunc, BinaryOp, ColumnRef, Expr, Literal, OrderSpec, Resolved, UnaryOp,
};
pub use statement::{
    ColumnDef, CreateTableStmt, DeleteStmt, InsertStmt, Scan, SelectStmt, Statement, TxnOp,
    UpdateStmt,
};
