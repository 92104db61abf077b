//! Statement and scan AST types.

use crate::catalog::{AttributeSet, TableSchema};
use crate::datum::DatumType;

use super::{Expr, OrderSpec};

/// An operator that produces rows on demand. Scans come out of the parser
/// unannotated; the analyzer fills in each node's output attribute set
/// (and, for table scans, the loaded schema).
#[derive(Debug, Clone, PartialEq)]
pub enum Scan {
    /// Emits a single synthetic row built from literal expressions. Used
    /// for FROM-less SELECT.
    Constant {
        exprs: Vec<Expr>,
        attrs: Option<AttributeSet>,
    },

    /// Full scan of a table's primary index.
    Table {
        name: String,
        alias: Option<String>,
        schema: Option<TableSchema>,
        attrs: Option<AttributeSet>,
    },

    /// Filters the child by a predicate.
    Select {
        input: Box<Scan>,
        predicate: Expr,
        attrs: Option<AttributeSet>,
    },

    /// Nested-loop cross product.
    Product {
        left: Box<Scan>,
        right: Box<Scan>,
        attrs: Option<AttributeSet>,
    },

    /// Left/right/full outer join over the product of two children.
    OuterSelect {
        left: Box<Scan>,
        right: Box<Scan>,
        predicate: Expr,
        include_left: bool,
        include_right: bool,
        attrs: Option<AttributeSet>,
    },

    /// Materializing projection: sort, project, distinct, limit.
    Project {
        input: Box<Scan>,
        projections: Vec<Expr>,
        group_by: Vec<Expr>,
        having: Option<Expr>,
        order_by: Vec<OrderSpec>,
        limit: Expr,
        distinct: bool,
        /// Number of trailing projection columns appended by the analyzer
        /// solely for ORDER BY, stripped before output.
        ghost_cols: usize,
        /// Per projection column: whether it contains an aggregate call.
        /// Filled by the analyzer.
        agg_cols: Vec<bool>,
        attrs: Option<AttributeSet>,
    },
}

impl Scan {
    /// The analyzer-computed output attribute set. Panics if called before
    /// analysis; statements reach the executor only through the analyzer.
    #[must_use]
    pub fn output_attrs(&self) -> &AttributeSet {
        let attrs = match self {
            Self::Constant { attrs, .. }
            | Self::Table { attrs, .. }
            | Self::Select { attrs, .. }
            | Self::Product { attrs, .. }
            | Self::OuterSelect { attrs, .. }
            | Self::Project { attrs, .. } => attrs,
        };
        attrs.as_ref().expect("scan has not been analyzed")
    }

    /// True if rows scanned from this node can be written back: a table
    /// scan, possibly behind filters.
    #[must_use]
    pub fn is_updatable(&self) -> bool {
        match self {
            Self::Table { .. } => true,
            Self::Select { input, .. } => input.is_updatable(),
            _ => false,
        }
    }

    /// The schema of the single underlying table of an updatable scan.
    #[must_use]
    pub fn base_schema(&self) -> Option<&TableSchema> {
        match self {
            Self::Table { schema, .. } => schema.as_ref(),
            Self::Select { input, .. } => input.base_schema(),
            _ => None,
        }
    }
}

/// One column declaration in CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: DatumType,
    pub not_null: bool,
}

/// CREATE TABLE, normalized at parse time: `_rowid` is prepended, the
/// primary key (defaulting to `_rowid`) becomes the zeroth unique column
/// group, its columns are promoted to not-null, and `NULLS DISTINCT`
/// unique groups get `_rowid` appended so null-bearing rows stay distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table: String,
    pub columns: Vec<ColumnDef>,
    /// Unique column groups; index 0 is the primary key.
    pub uniques: Vec<Vec<String>>,
}

impl CreateTableStmt {
    /// Applies create-table normalization to the raw parsed parts.
    #[must_use]
    pub fn new(
        table: String,
        mut columns: Vec<ColumnDef>,
        mut primary_key: Vec<String>,
        uniques: Vec<(Vec<String>, bool)>,
    ) -> Self {
        columns.insert(
            0,
            ColumnDef {
                name: "_rowid".into(),
                ty: DatumType::Int8,
                not_null: true,
            },
        );

        if primary_key.is_empty() {
            primary_key.push("_rowid".into());
        }

        for col in &mut columns {
            if primary_key.contains(&col.name) {
                col.not_null = true;
            }
        }

        let mut groups = vec![primary_key];
        for (mut cols, nulls_distinct) in uniques {
            if nulls_distinct {
                cols.push("_rowid".into());
            }
            groups.push(cols);
        }

        Self {
            table,
            columns,
            uniques: groups,
        }
    }
}

/// INSERT, rewritten at parse time: the VALUES tuples become lists of
/// column assignments against the target scan's row shape.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub target: Scan,
    /// One inner vector of `Expr::Assign` per VALUES tuple.
    pub assigns: Vec<Vec<Expr>>,
}

/// UPDATE … SET … [WHERE].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub scan: Scan,
    /// `Expr::Assign` per SET clause.
    pub assigns: Vec<Expr>,
}

/// DELETE FROM … [WHERE].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub scan: Scan,
}

/// SELECT; the scan is always a `Scan::Project`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub scan: Scan,
}

/// BEGIN / COMMIT / ROLLBACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnOp {
    Begin,
    Commit,
    Rollback,
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTableStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Select(SelectStmt),
    DescribeTable {
        table: String,
    },
    DropTable {
        table: String,
        if_exists: bool,
    },
    CreateModel {
        name: String,
        path: String,
    },
    DropModel {
        name: String,
        if_exists: bool,
    },
    Txn(TxnOp),
}
