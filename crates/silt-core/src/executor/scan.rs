//! Runtime scan operators.
//!
//! The analyzer annotates the plan tree; the executor instantiates this
//! mirror tree to hold per-statement iteration state. Operators are
//! pull-based: `Executor::begin_scan` positions an operator, and
//! `Executor::next_row` produces rows until it returns `None`. All state
//! lives in the operator, so a scan is torn down by dropping it at the
//! statement boundary.

use crate::ast::{Expr, OrderSpec, Scan};
use crate::catalog::{AttributeSet, TableSchema};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::storage::KeyValue;

/// A runtime scan operator tree.
pub enum ScanOp {
    Constant(ConstantScan),
    Table(TableScan),
    Select(SelectScan),
    Product(ProductScan),
    OuterSelect(OuterSelectScan),
    Project(ProjectScan),
}

impl ScanOp {
    /// Builds the operator tree for an analyzed plan scan.
    pub fn from_plan(scan: &Scan) -> Result<Self> {
        let internal =
            || Error::Analysis("statement reached the executor without analysis".into());
        Ok(match scan {
            Scan::Constant { exprs, attrs } => Self::Constant(ConstantScan {
                exprs: exprs.clone(),
                attrs: attrs.clone().ok_or_else(internal)?,
                done: false,
            }),
            Scan::Table { schema, .. } => Self::Table(TableScan {
                schema: schema.clone().ok_or_else(internal)?,
                iter: None,
            }),
            Scan::Select {
                input, predicate, ..
            } => Self::Select(SelectScan {
                input: Box::new(Self::from_plan(input)?),
                predicate: predicate.clone(),
            }),
            Scan::Product { left, right, .. } => Self::Product(ProductScan {
                left: Box::new(Self::from_plan(left)?),
                right: Box::new(Self::from_plan(right)?),
                left_row: None,
            }),
            Scan::OuterSelect {
                left,
                right,
                predicate,
                include_left,
                include_right,
                ..
            } => {
                let left_width = left.output_attrs().len();
                let right_width = right.output_attrs().len();
                Self::OuterSelect(OuterSelectScan {
                    left: Box::new(Self::from_plan(left)?),
                    right: Box::new(Self::from_plan(right)?),
                    predicate: predicate.clone(),
                    include_left: *include_left,
                    include_right: *include_right,
                    left_width,
                    right_width,
                    left_rows: Vec::new(),
                    right_rows: Vec::new(),
                    matched_left: Vec::new(),
                    matched_right: Vec::new(),
                    li: 0,
                    ri: 0,
                    pad_left: 0,
                    pad_right: 0,
                })
            }
            Scan::Project {
                input,
                projections,
                order_by,
                limit,
                distinct,
                ghost_cols,
                agg_cols,
                attrs,
                ..
            } => Self::Project(ProjectScan {
                input: Box::new(Self::from_plan(input)?),
                projections: projections.clone(),
                order_by: order_by.clone(),
                limit: limit.clone(),
                distinct: *distinct,
                ghost_cols: *ghost_cols,
                agg_cols: agg_cols.clone(),
                attrs: attrs.clone().ok_or_else(internal)?,
                output: Vec::new(),
                cursor: 0,
            }),
        })
    }
}

/// Emits one synthetic row built from literal expressions.
pub struct ConstantScan {
    pub exprs: Vec<Expr>,
    pub attrs: AttributeSet,
    pub done: bool,
}

/// Walks a table's primary index in key order.
pub struct TableScan {
    pub schema: TableSchema,
    pub iter: Option<Box<dyn Iterator<Item = KeyValue> + Send>>,
}

/// Filters its child by a predicate.
pub struct SelectScan {
    pub input: Box<ScanOp>,
    pub predicate: Expr,
}

/// Nested-loop cross product: holds the current left row and re-begins
/// the right child each time it is exhausted.
pub struct ProductScan {
    pub left: Box<ScanOp>,
    pub right: Box<ScanOp>,
    pub left_row: Option<Row>,
}

/// Two-phase outer join. Phase one walks the full product, emitting
/// combined rows that pass the predicate and marking each side's matches
/// in a position-indexed bitmap. Phase two emits the unmatched rows of the
/// included sides, padded with nulls. Rows with identical bytes are
/// tracked independently because bookkeeping is by position, not by
/// content.
pub struct OuterSelectScan {
    pub left: Box<ScanOp>,
    pub right: Box<ScanOp>,
    pub predicate: Expr,
    pub include_left: bool,
    pub include_right: bool,
    pub left_width: usize,
    pub right_width: usize,
    pub left_rows: Vec<Row>,
    pub right_rows: Vec<Row>,
    pub matched_left: Vec<bool>,
    pub matched_right: Vec<bool>,
    pub li: usize,
    pub ri: usize,
    pub pad_left: usize,
    pub pad_right: usize,
}

/// Materializing projection: sort, project, ghost-strip, distinct, limit,
/// all performed in `begin`; `next` walks the buffered output.
pub struct ProjectScan {
    pub input: Box<ScanOp>,
    pub projections: Vec<Expr>,
    pub order_by: Vec<OrderSpec>,
    pub limit: Expr,
    pub distinct: bool,
    pub ghost_cols: usize,
    pub agg_cols: Vec<bool>,
    /// Output attributes including ghost columns.
    pub attrs: AttributeSet,
    pub output: Vec<Row>,
    pub cursor: usize,
}

impl ProjectScan {
    /// The attributes visible to the client, with ghost columns stripped.
    #[must_use]
    pub fn visible_attrs(&self) -> Vec<crate::catalog::Attribute> {
        let visible = self.attrs.len() - self.ghost_cols;
        self.attrs.attributes()[..visible].to_vec()
    }
}
