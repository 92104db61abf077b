//! Statement execution.
//!
//! The executor owns a connection's whole session: the storage engine
//! handle, the single active transaction, the scope stack of rows under
//! evaluation, and the aggregate accumulators. Every statement runs
//! inside a transaction: the one opened by an explicit `BEGIN`, or an
//! auto-opened one that commits on success and rolls back on failure.

mod scan;

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, warn};

use crate::analyzer::Analyzer;
use crate::ast::{
    AggFunc, BinaryOp, CreateTableStmt, DeleteStmt, Expr, InsertStmt, Literal, SelectStmt,
    Statement, TxnOp, UnaryOp, UpdateStmt,
};
use crate::catalog::{Attribute, TableSchema};
use crate::datum::{ArithOp, Datum, DatumType};
use crate::error::{Error, Result};
use crate::inference::Predictor;
use crate::parser::Parser;
use crate::row::{Row, RowSet};
use crate::storage::{KvEngine, KvTxn, CATALOG, MODELS};

pub use scan::ScanOp;

use scan::{
    ConstantScan, OuterSelectScan, ProductScan, ProjectScan, SelectScan, TableScan,
};

/// The result of one successfully executed statement: a completion
/// message plus zero or more result sets (DESCRIBE TABLE returns two).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    pub message: String,
    pub sets: Vec<RowSet>,
}

impl ExecOutcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sets: Vec::new(),
        }
    }
}

/// Accumulator state for aggregate evaluation, reset per projection
/// column. Null arguments are skipped; `count` counts non-null values.
struct AggState {
    sum: Datum,
    count: i64,
    min: Datum,
    max: Datum,
}

impl AggState {
    fn new() -> Self {
        Self {
            sum: Datum::Int8(0),
            count: 0,
            min: Datum::Null,
            max: Datum::Null,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Per-connection query pipeline: tokenize, parse, analyze, execute.
pub struct Executor<E: KvEngine, P: Predictor> {
    engine: E,
    predictor: P,
    txn: Option<E::Txn>,
    /// True while an explicit BEGIN block is open.
    explicit_txn: bool,
    /// Set on the first failure inside an explicit transaction; cleared by
    /// COMMIT (which then rolls back) or ROLLBACK.
    aborted: bool,
    /// Rows currently in scope for column references; scalar subqueries
    /// and nested scans push and pop.
    scopes: Vec<Row>,
    agg: AggState,
}

impl<E: KvEngine, P: Predictor> Executor<E, P> {
    /// Creates an executor for one connection.
    pub fn new(engine: E, predictor: P) -> Self {
        Self {
            engine,
            predictor,
            txn: None,
            explicit_txn: false,
            aborted: false,
            scopes: Vec::new(),
            agg: AggState::new(),
        }
    }

    /// Runs a query string, returning one outcome per statement. Lex and
    /// parse failures produce a single error for the whole text.
    pub fn execute_query(&mut self, query: &str) -> Vec<Result<ExecOutcome>> {
        let stmts = match Parser::parse_text(query) {
            Ok(stmts) => stmts,
            Err(e) => return vec![Err(e)],
        };

        stmts
            .into_iter()
            .map(|stmt| self.execute_statement(stmt))
            .collect()
    }

    fn txn(&self) -> Result<&E::Txn> {
        self.txn
            .as_ref()
            .ok_or_else(|| Error::Txn("no active transaction".into()))
    }

    fn txn_mut(&mut self) -> Result<&mut E::Txn> {
        self.txn
            .as_mut()
            .ok_or_else(|| Error::Txn("no active transaction".into()))
    }

    /// Verifies and executes one statement under its transaction.
    fn execute_statement(&mut self, mut stmt: Statement) -> Result<ExecOutcome> {
        if let Statement::Txn(op) = &stmt {
            return self.exec_txn_control(*op);
        }

        if self.explicit_txn && self.aborted {
            return Err(Error::Txn(
                "transaction has aborted; statements are ignored until commit or rollback".into(),
            ));
        }

        let auto_commit = self.txn.is_none();
        if auto_commit {
            self.txn = Some(self.engine.begin()?);
        }

        let result = self.verify_and_execute(&mut stmt);

        if auto_commit {
            let txn = self.txn.take().expect("auto transaction present");
            match &result {
                Ok(_) => txn.commit()?,
                Err(_) => {
                    // Keep the statement's error even if rollback fails.
                    if let Err(e) = txn.rollback() {
                        warn!(error = %e, "auto rollback failed");
                    }
                }
            }
        } else if result.is_err() {
            self.aborted = true;
        }

        result
    }

    fn verify_and_execute(&mut self, stmt: &mut Statement) -> Result<ExecOutcome> {
        Analyzer::new(self.txn()?).verify(stmt)?;

        debug!(statement = ?std::mem::discriminant(stmt), "executing statement");
        match stmt {
            Statement::CreateTable(create) => self.exec_create_table(create),
            Statement::Insert(insert) => self.exec_insert(insert),
            Statement::Update(update) => self.exec_update(update),
            Statement::Delete(delete) => self.exec_delete(delete),
            Statement::Select(select) => self.exec_select(select),
            Statement::DescribeTable { table } => self.exec_describe(table),
            Statement::DropTable { table, .. } => self.exec_drop_table(table),
            Statement::CreateModel { name, path } => self.exec_create_model(name, path),
            Statement::DropModel { name, .. } => self.exec_drop_model(name),
            Statement::Txn(_) => unreachable!("transaction control handled above"),
        }
    }

    /* --- transaction control --- */

    fn exec_txn_control(&mut self, op: TxnOp) -> Result<ExecOutcome> {
        match op {
            TxnOp::Begin => {
                if self.explicit_txn {
                    return Err(Error::Txn(
                        "cannot use 'begin' inside a transaction".into(),
                    ));
                }
                self.txn = Some(self.engine.begin()?);
                self.explicit_txn = true;
                self.aborted = false;
                debug!("transaction started");
                Ok(ExecOutcome::message("BEGIN"))
            }
            TxnOp::Commit => {
                if !self.explicit_txn {
                    return Err(Error::Txn(
                        "cannot use 'commit' outside of a transaction".into(),
                    ));
                }
                let txn = self.txn.take().expect("explicit transaction present");
                let aborted = self.aborted;
                self.explicit_txn = false;
                self.aborted = false;
                if aborted {
                    txn.rollback()?;
                    debug!("aborted transaction rolled back at commit");
                    Ok(ExecOutcome::message("ROLLBACK"))
                } else {
                    txn.commit()?;
                    debug!("transaction committed");
                    Ok(ExecOutcome::message("COMMIT"))
                }
            }
            TxnOp::Rollback => {
                if !self.explicit_txn {
                    return Err(Error::Txn(
                        "cannot use 'rollback' outside of a transaction".into(),
                    ));
                }
                let txn = self.txn.take().expect("explicit transaction present");
                self.explicit_txn = false;
                self.aborted = false;
                txn.rollback()?;
                debug!("transaction rolled back");
                Ok(ExecOutcome::message("ROLLBACK"))
            }
        }
    }

    /* --- DDL --- */

    fn exec_create_table(&mut self, create: &CreateTableStmt) -> Result<ExecOutcome> {
        let schema = TableSchema::from_create(create)?;
        self.txn_mut()?
            .put(CATALOG, schema.table.as_bytes(), &schema.serialize())?;
        for index in &schema.indexes {
            self.engine.create_column_family(&index.name)?;
        }
        Ok(ExecOutcome::message(format!(
            "(table '{}' created)",
            schema.table
        )))
    }

    fn exec_drop_table(&mut self, table: &str) -> Result<ExecOutcome> {
        let Some(schema) = self.load_schema(table)? else {
            return Ok(ExecOutcome::message(format!(
                "(table '{table}' doesn't exist and not dropped)"
            )));
        };
        self.txn_mut()?.delete(CATALOG, table.as_bytes())?;
        for index in &schema.indexes {
            self.engine.drop_column_family(&index.name)?;
        }
        Ok(ExecOutcome::message(format!("(table '{table}' dropped)")))
    }

    fn exec_describe(&mut self, table: &str) -> Result<ExecOutcome> {
        let schema = self
            .load_schema(table)?
            .ok_or_else(|| Error::Analysis(format!("table '{table}' does not exist")))?;

        let mut columns = RowSet::new(vec![
            Attribute::computed("name", DatumType::Text),
            Attribute::computed("type", DatumType::Text),
            Attribute::computed("not null", DatumType::Bool),
        ]);
        for attr in &schema.attrs {
            columns.rows.push(Row::new(vec![
                Datum::Text(attr.name.clone()),
                Datum::Text(attr.ty.name().into()),
                Datum::Bool(attr.not_null),
            ]));
        }

        let mut indexes = RowSet::new(vec![
            Attribute::computed("type", DatumType::Text),
            Attribute::computed("name", DatumType::Text),
        ]);
        for index in &schema.indexes {
            indexes.rows.push(Row::new(vec![
                Datum::Text("lsm tree".into()),
                Datum::Text(index.name.clone()),
            ]));
        }

        Ok(ExecOutcome {
            message: format!("table '{table}'"),
            sets: vec![columns, indexes],
        })
    }

    fn exec_create_model(&mut self, name: &str, path: &str) -> Result<ExecOutcome> {
        let artifact = std::fs::read(path).map_err(|e| {
            Error::Storage(format!("cannot read model artifact '{path}': {e}"))
        })?;
        self.txn_mut()?.put(MODELS, name.as_bytes(), &artifact)?;
        Ok(ExecOutcome::message(format!("(model '{name}' created)")))
    }

    fn exec_drop_model(&mut self, name: &str) -> Result<ExecOutcome> {
        if self.txn()?.get(MODELS, name.as_bytes())?.is_none() {
            return Ok(ExecOutcome::message(format!(
                "(model '{name}' doesn't exist and not dropped)"
            )));
        }
        self.txn_mut()?.delete(MODELS, name.as_bytes())?;
        Ok(ExecOutcome::message(format!("(model '{name}' dropped)")))
    }

    fn load_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        match self.txn()?.get(CATALOG, table.as_bytes())? {
            Some(bytes) => Ok(Some(TableSchema::deserialize(table, &bytes)?)),
            None => Ok(None),
        }
    }

    /* --- DML --- */

    fn exec_insert(&mut self, insert: &InsertStmt) -> Result<ExecOutcome> {
        let mut schema = insert
            .target
            .base_schema()
            .cloned()
            .ok_or_else(|| Error::Analysis("insert target is not a table".into()))?;

        let mut count = 0usize;
        for tuple in &insert.assigns {
            let mut row = Row::nulls(schema.attrs.len());
            for assign in tuple {
                self.apply_assign(assign, &mut row)?;
            }
            row.data[0] = Datum::Int8(schema.next_rowid());
            self.check_not_null(&schema, &row)?;
            self.write_row(&schema, &row)?;
            count += 1;
        }

        // The rowid counter advanced; the catalog entry must follow.
        self.txn_mut()?
            .put(CATALOG, schema.table.as_bytes(), &schema.serialize())?;

        Ok(ExecOutcome::message(format!("({count} rows inserted)")))
    }

    /// Writes a fresh row into the primary and every secondary index,
    /// enforcing uniqueness with a pre-write lookup on each key.
    fn write_row(&mut self, schema: &TableSchema, row: &Row) -> Result<()> {
        let primary = schema.primary_index();
        let primary_key = primary.key_from_row(row)?;
        if self.txn()?.get(&primary.name, &primary_key)?.is_some() {
            return Err(Error::Constraint(format!(
                "duplicate primary key in table '{}'",
                schema.table
            )));
        }
        self.txn_mut()?
            .put(&primary.name, &primary_key, &row.serialize())?;

        for index in schema.secondary_indexes() {
            let key = index.key_from_row(row)?;
            if self.txn()?.get(&index.name, &key)?.is_some() {
                return Err(Error::Constraint(format!(
                    "duplicate unique key in index '{}'",
                    index.name
                )));
            }
            self.txn_mut()?.put(&index.name, &key, &primary_key)?;
        }
        Ok(())
    }

    fn check_not_null(&self, schema: &TableSchema, row: &Row) -> Result<()> {
        for (attr, datum) in schema.attrs.iter().zip(&row.data) {
            if attr.not_null && datum.is_null() {
                return Err(Error::Constraint(format!(
                    "null value in column '{}' violates its not-null constraint",
                    attr.name
                )));
            }
        }
        Ok(())
    }

    fn exec_update(&mut self, update: &UpdateStmt) -> Result<ExecOutcome> {
        let schema = update
            .scan
            .base_schema()
            .cloned()
            .ok_or_else(|| Error::Analysis("update target is not a table".into()))?;

        let mut op = ScanOp::from_plan(&update.scan)?;
        self.begin_scan(&mut op)?;

        let mut count = 0usize;
        while let Some(row) = self.next_row(&mut op)? {
            let mut updated = row.clone();
            for assign in &update.assigns {
                self.apply_assign(assign, &mut updated)?;
            }
            self.check_not_null(&schema, &updated)?;

            let primary = schema.primary_index();
            let old_key = primary.key_from_row(&row)?;
            let new_key = primary.key_from_row(&updated)?;
            if old_key != new_key {
                if self.txn()?.get(&primary.name, &new_key)?.is_some() {
                    return Err(Error::Constraint(format!(
                        "duplicate primary key in table '{}'",
                        schema.table
                    )));
                }
                self.txn_mut()?.delete(&primary.name, &old_key)?;
            }
            self.txn_mut()?
                .put(&primary.name, &new_key, &updated.serialize())?;

            for index in schema.secondary_indexes() {
                let old_idx_key = index.key_from_row(&row)?;
                let new_idx_key = index.key_from_row(&updated)?;
                if old_idx_key != new_idx_key {
                    if self.txn()?.get(&index.name, &new_idx_key)?.is_some() {
                        return Err(Error::Constraint(format!(
                            "duplicate unique key in index '{}'",
                            index.name
                        )));
                    }
                    self.txn_mut()?.delete(&index.name, &old_idx_key)?;
                }
                // The value always tracks the (possibly new) primary key.
                self.txn_mut()?.put(&index.name, &new_idx_key, &new_key)?;
            }

            count += 1;
        }

        Ok(ExecOutcome::message(format!("({count} rows updated)")))
    }

    fn exec_delete(&mut self, delete: &DeleteStmt) -> Result<ExecOutcome> {
        let schema = delete
            .scan
            .base_schema()
            .cloned()
            .ok_or_else(|| Error::Analysis("delete target is not a table".into()))?;

        let mut op = ScanOp::from_plan(&delete.scan)?;
        self.begin_scan(&mut op)?;

        let mut count = 0usize;
        while let Some(row) = self.next_row(&mut op)? {
            let primary_key = schema.primary_index().key_from_row(&row)?;
            self.txn_mut()?
                .delete(&schema.primary_index().name, &primary_key)?;
            for index in schema.secondary_indexes() {
                let key = index.key_from_row(&row)?;
                self.txn_mut()?.delete(&index.name, &key)?;
            }
            count += 1;
        }

        Ok(ExecOutcome::message(format!("({count} rows deleted)")))
    }

    fn exec_select(&mut self, select: &SelectStmt) -> Result<ExecOutcome> {
        let mut op = ScanOp::from_plan(&select.scan)?;
        self.begin_scan(&mut op)?;

        let ScanOp::Project(project) = &op else {
            return Err(Error::Analysis("select plan is not a projection".into()));
        };
        let mut set = RowSet::new(project.visible_attrs());

        while let Some(row) = self.next_row(&mut op)? {
            set.rows.push(row);
        }

        let message = format!("({} rows)", set.rows.len());
        Ok(ExecOutcome {
            message,
            sets: vec![set],
        })
    }

    /* --- scan iteration --- */

    fn begin_scan(&mut self, op: &mut ScanOp) -> Result<()> {
        match op {
            ScanOp::Constant(scan) => {
                scan.done = false;
                Ok(())
            }
            ScanOp::Table(scan) => self.begin_table(scan),
            ScanOp::Select(scan) => self.begin_scan(&mut scan.input),
            ScanOp::Product(scan) => {
                self.begin_scan(&mut scan.left)?;
                self.begin_scan(&mut scan.right)?;
                scan.left_row = None;
                Ok(())
            }
            ScanOp::OuterSelect(scan) => self.begin_outer_select(scan),
            ScanOp::Project(scan) => self.begin_project(scan),
        }
    }

    fn next_row(&mut self, op: &mut ScanOp) -> Result<Option<Row>> {
        match op {
            ScanOp::Constant(scan) => self.next_constant(scan),
            ScanOp::Table(scan) => Self::next_table(scan),
            ScanOp::Select(scan) => self.next_select(scan),
            ScanOp::Product(scan) => self.next_product(scan),
            ScanOp::OuterSelect(scan) => self.next_outer_select(scan),
            ScanOp::Project(scan) => {
                if scan.cursor < scan.output.len() {
                    scan.cursor += 1;
                    Ok(Some(scan.output[scan.cursor - 1].clone()))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn next_constant(&mut self, scan: &mut ConstantScan) -> Result<Option<Row>> {
        if scan.done {
            return Ok(None);
        }
        scan.done = true;
        let exprs = scan.exprs.clone();
        let mut data = Vec::with_capacity(exprs.len());
        for expr in &exprs {
            data.push(self.eval(expr)?);
        }
        Ok(Some(Row::new(data)))
    }

    fn begin_table(&mut self, scan: &mut TableScan) -> Result<()> {
        let cf = &scan.schema.primary_index().name;
        scan.iter = Some(self.txn()?.scan(cf)?);
        Ok(())
    }

    fn next_table(scan: &mut TableScan) -> Result<Option<Row>> {
        let iter = scan
            .iter
            .as_mut()
            .ok_or_else(|| Error::Storage("table scan was not begun".into()))?;
        match iter.next() {
            Some((_, value)) => Ok(Some(Row::deserialize(&scan.schema.attrs, &value)?)),
            None => Ok(None),
        }
    }

    fn next_select(&mut self, scan: &mut SelectScan) -> Result<Option<Row>> {
        loop {
            let Some(row) = self.next_row(&mut scan.input)? else {
                return Ok(None);
            };
            if self.eval_predicate(&scan.predicate, &row)? {
                return Ok(Some(row));
            }
        }
    }

    fn next_product(&mut self, scan: &mut ProductScan) -> Result<Option<Row>> {
        if scan.left_row.is_none() {
            scan.left_row = self.next_row(&mut scan.left)?;
            if scan.left_row.is_none() {
                return Ok(None);
            }
        }

        let right_row = match self.next_row(&mut scan.right)? {
            Some(row) => row,
            None => {
                // Right side exhausted: rewind it and advance the left.
                self.begin_scan(&mut scan.right)?;
                scan.left_row = self.next_row(&mut scan.left)?;
                if scan.left_row.is_none() {
                    return Ok(None);
                }
                match self.next_row(&mut scan.right)? {
                    Some(row) => row,
                    None => return Ok(None),
                }
            }
        };

        let mut data = scan.left_row.as_ref().expect("left row present").data.clone();
        data.extend(right_row.data);
        Ok(Some(Row::new(data)))
    }

    fn begin_outer_select(&mut self, scan: &mut OuterSelectScan) -> Result<()> {
        self.begin_scan(&mut scan.left)?;
        scan.left_rows.clear();
        while let Some(row) = self.next_row(&mut scan.left)? {
            scan.left_rows.push(row);
        }

        self.begin_scan(&mut scan.right)?;
        scan.right_rows.clear();
        while let Some(row) = self.next_row(&mut scan.right)? {
            scan.right_rows.push(row);
        }

        scan.matched_left = vec![false; scan.left_rows.len()];
        scan.matched_right = vec![false; scan.right_rows.len()];
        scan.li = 0;
        scan.ri = 0;
        scan.pad_left = 0;
        scan.pad_right = 0;
        Ok(())
    }

    fn next_outer_select(&mut self, scan: &mut OuterSelectScan) -> Result<Option<Row>> {
        // Phase one: the full product, predicate-filtered.
        while scan.li < scan.left_rows.len() {
            while scan.ri < scan.right_rows.len() {
                let (li, ri) = (scan.li, scan.ri);
                scan.ri += 1;

                let mut data = scan.left_rows[li].data.clone();
                data.extend(scan.right_rows[ri].data.iter().cloned());
                let combined = Row::new(data);

                if self.eval_predicate(&scan.predicate, &combined)? {
                    scan.matched_left[li] = true;
                    scan.matched_right[ri] = true;
                    return Ok(Some(combined));
                }
            }
            scan.ri = 0;
            scan.li += 1;
        }

        // Phase two: unmatched rows of the included sides, null-padded.
        if scan.include_left {
            while scan.pad_left < scan.left_rows.len() {
                let i = scan.pad_left;
                scan.pad_left += 1;
                if !scan.matched_left[i] {
                    let mut data = scan.left_rows[i].data.clone();
                    data.extend(vec![Datum::Null; scan.right_width]);
                    return Ok(Some(Row::new(data)));
                }
            }
        }
        if scan.include_right {
            while scan.pad_right < scan.right_rows.len() {
                let i = scan.pad_right;
                scan.pad_right += 1;
                if !scan.matched_right[i] {
                    let mut data = vec![Datum::Null; scan.left_width];
                    data.extend(scan.right_rows[i].data.iter().cloned());
                    return Ok(Some(Row::new(data)));
                }
            }
        }

        Ok(None)
    }

    fn begin_project(&mut self, scan: &mut ProjectScan) -> Result<()> {
        self.begin_scan(&mut scan.input)?;
        let mut rows = Vec::new();
        while let Some(row) = self.next_row(&mut scan.input)? {
            rows.push(row);
        }

        // Sort the input rows by the order columns. Keys are computed up
        // front; Vec::sort_by is stable, so rows equal under the key keep
        // their input order.
        if !scan.order_by.is_empty() {
            let mut keyed: Vec<(Vec<Datum>, Row)> = Vec::with_capacity(rows.len());
            for row in rows {
                let mut key = Vec::with_capacity(scan.order_by.len());
                for spec in &scan.order_by {
                    self.scopes.push(row.clone());
                    let result = self.eval(&spec.expr);
                    self.scopes.pop();
                    key.push(result?);
                }
                keyed.push((key, row));
            }
            let order = scan.order_by.clone();
            keyed.sort_by(|a, b| {
                for (i, spec) in order.iter().enumerate() {
                    let ord = a.0[i].sort_cmp(&b.0[i]);
                    if ord != std::cmp::Ordering::Equal {
                        return if spec.asc { ord } else { ord.reverse() };
                    }
                }
                std::cmp::Ordering::Equal
            });
            rows = keyed.into_iter().map(|(_, row)| row).collect();
        }

        // Evaluate each projection column over all input rows. Aggregate
        // columns collapse to the accumulator's final value.
        let mut columns: Vec<Vec<Datum>> = Vec::with_capacity(scan.projections.len());
        for (i, expr) in scan.projections.iter().enumerate() {
            self.agg.reset();
            let is_agg = scan.agg_cols.get(i).copied().unwrap_or(false);
            let mut column = Vec::new();
            let mut last = Datum::Null;
            for row in &rows {
                self.scopes.push(row.clone());
                let result = self.eval(expr);
                self.scopes.pop();
                let value = result?;
                if is_agg {
                    last = value;
                } else {
                    column.push(value);
                }
            }
            if is_agg && !rows.is_empty() {
                column.push(last);
            }
            columns.push(column);
        }

        // Mixed aggregate and per-row columns only line up when the
        // shorter column prefix is taken, exactly like the widths check on
        // a per-column basis.
        let mut out_len = rows.len();
        for column in &columns {
            if column.len() < out_len {
                out_len = column.len();
            } else if column.len() > out_len {
                return Err(Error::Analysis(
                    "mixing aggregate and per-row projection columns".into(),
                ));
            }
        }

        let visible = scan.projections.len() - scan.ghost_cols;
        let mut output = Vec::with_capacity(out_len);
        for r in 0..out_len {
            let data: Vec<Datum> = columns[..visible].iter().map(|c| c[r].clone()).collect();
            output.push(Row::new(data));
        }

        if scan.distinct {
            let mut seen = HashSet::new();
            output.retain(|row| seen.insert(row.serialize()));
        }

        let limit = self.eval(&scan.limit)?;
        if let Datum::Int8(n) = limit {
            if n >= 0 && (n as usize) < output.len() {
                output.truncate(n as usize);
            }
        }

        scan.output = output;
        scan.cursor = 0;
        Ok(())
    }

    /* --- expression evaluation --- */

    /// Evaluates a predicate against a row: the row is pushed as the
    /// innermost scope, and a null result is false.
    fn eval_predicate(&mut self, predicate: &Expr, row: &Row) -> Result<bool> {
        self.scopes.push(row.clone());
        let result = self.eval(predicate);
        self.scopes.pop();
        Ok(matches!(result?, Datum::Bool(true)))
    }

    /// Evaluates an assignment: the RHS is evaluated with the row in
    /// scope, cast to the column type if necessary, and written into the
    /// row at the resolved position.
    fn apply_assign(&mut self, assign: &Expr, row: &mut Row) -> Result<()> {
        let Expr::Assign {
            target,
            value,
            column_type,
        } = assign
        else {
            return Err(Error::Analysis("expected a column assignment".into()));
        };

        self.scopes.push(row.clone());
        let result = self.eval(value);
        self.scopes.pop();
        let mut datum = result?;

        let resolved = target
            .resolved
            .ok_or_else(|| Error::Analysis("assignment target was not resolved".into()))?;
        let ty = column_type
            .ok_or_else(|| Error::Analysis("assignment type was not resolved".into()))?;

        if !datum.is_null() && datum.datum_type() != ty {
            datum = datum.cast(ty)?;
        }
        row.data[resolved.index] = datum;
        Ok(())
    }

    /// Postorder expression evaluation against the scope stack.
    fn eval(&mut self, expr: &Expr) -> Result<Datum> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Integer(v) => Datum::Int8(*v),
                Literal::Float(v) => Datum::Float4(*v),
                Literal::String(s) => Datum::Text(s.clone()),
                Literal::Bytea(b) => Datum::Bytea(b.clone()),
                Literal::Boolean(v) => Datum::Bool(*v),
                Literal::Null => Datum::Null,
            }),

            Expr::Column(col) => {
                let resolved = col
                    .resolved
                    .ok_or_else(|| Error::Analysis("column reference was not resolved".into()))?;
                let scope = self
                    .scopes
                    .len()
                    .checked_sub(1 + resolved.scope)
                    .and_then(|i| self.scopes.get(i))
                    .ok_or_else(|| {
                        Error::Analysis(format!(
                            "column '{}' referenced outside its scope",
                            col.display()
                        ))
                    })?;
                Ok(scope.data[resolved.index].clone())
            }

            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                // Three-valued null propagation, short-circuited before
                // operator dispatch.
                if l.is_null() || r.is_null() {
                    return Ok(Datum::Null);
                }
                self.eval_binary(*op, &l, &r)
            }

            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                if v.is_null() {
                    return Ok(Datum::Null);
                }
                match (op, v) {
                    (UnaryOp::Neg, Datum::Int8(v)) => Ok(Datum::Int8(-v)),
                    (UnaryOp::Neg, Datum::Float4(v)) => Ok(Datum::Float4(-v)),
                    (UnaryOp::Not, Datum::Bool(v)) => Ok(Datum::Bool(!v)),
                    (op, v) => Err(Error::Constraint(format!(
                        "invalid operand type {} for unary {:?}",
                        v.datum_type().name(),
                        op
                    ))),
                }
            }

            Expr::IsNull { operand, negated } => {
                let v = self.eval(operand)?;
                Ok(Datum::Bool(v.is_null() != *negated))
            }

            Expr::Aggregate { func, arg } => {
                let value = self.eval(arg)?;
                self.eval_aggregate(*func, value)
            }

            Expr::Predict { model, arg } => {
                let input = self.eval(arg)?;
                let artifact = self
                    .txn()?
                    .get(MODELS, model.as_bytes())?
                    .ok_or_else(|| Error::Analysis(format!("model '{model}' does not exist")))?;
                let classes = self.predictor.predict(&artifact, &input.payload())?;
                let first = classes.first().copied().ok_or_else(|| {
                    Error::Storage("inference backend returned no classes".into())
                })?;
                Ok(Datum::Int8(first))
            }

            Expr::Cast { operand, target } => {
                let v = self.eval(operand)?;
                v.cast(*target)
            }

            Expr::Subquery(select) => {
                // The subquery's projection runs its own accumulators;
                // shield the enclosing query's aggregate state.
                let saved = std::mem::replace(&mut self.agg, AggState::new());
                let outcome = self.exec_select(select);
                self.agg = saved;
                let outcome = outcome?;
                let set = &outcome.sets[0];
                if set.rows.len() != 1 {
                    return Err(Error::Analysis(
                        "scalar subquery must produce a single row".into(),
                    ));
                }
                if set.rows[0].data.len() != 1 {
                    return Err(Error::Analysis(
                        "scalar subquery must produce a single column".into(),
                    ));
                }
                Ok(set.rows[0].data[0].clone())
            }

            Expr::Assign { .. } => Err(Error::Analysis(
                "column assignment evaluated outside insert or update".into(),
            )),
            Expr::Wildcard => Err(Error::Analysis(
                "'*' evaluated outside a projection".into(),
            )),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, l: &Datum, r: &Datum) -> Result<Datum> {
        use std::cmp::Ordering;

        if op.is_comparison() {
            let ord = l.compare(r)?;
            let result = match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::GtEq => ord != Ordering::Less,
                _ => unreachable!(),
            };
            return Ok(Datum::Bool(result));
        }

        if op.is_logical() {
            let (Datum::Bool(lb), Datum::Bool(rb)) = (l, r) else {
                return Err(Error::Constraint(
                    "logical operator applied to non-boolean values".into(),
                ));
            };
            return Ok(Datum::Bool(match op {
                BinaryOp::And => *lb && *rb,
                BinaryOp::Or => *lb || *rb,
                _ => unreachable!(),
            }));
        }

        if op.is_pattern() {
            return self.eval_pattern(op, l, r);
        }

        let arith = match op {
            BinaryOp::Add => ArithOp::Add,
            BinaryOp::Sub => ArithOp::Sub,
            BinaryOp::Mul => ArithOp::Mul,
            BinaryOp::Div => ArithOp::Div,
            _ => unreachable!(),
        };
        l.arith(arith, r)
    }

    /// LIKE translates `%`/`_` wildcards into an anchored regex; SIMILAR
    /// TO passes the rest of the pattern through as a regex body.
    fn eval_pattern(&self, op: BinaryOp, l: &Datum, r: &Datum) -> Result<Datum> {
        let (Datum::Text(subject), Datum::Text(pattern)) = (l, r) else {
            return Err(Error::Constraint(format!(
                "'{}' operands must be text",
                op.as_str()
            )));
        };

        let mut source = String::from("^");
        for c in pattern.chars() {
            match c {
                '%' => source.push_str(".*"),
                '_' => source.push('.'),
                c if op == BinaryOp::Like => source.push_str(&regex::escape(&c.to_string())),
                c => source.push(c),
            }
        }
        source.push('$');

        let re = Regex::new(&source).map_err(|e| {
            Error::Constraint(format!("invalid pattern '{pattern}': {e}"))
        })?;
        Ok(Datum::Bool(re.is_match(subject)))
    }

    fn eval_aggregate(&mut self, func: AggFunc, value: Datum) -> Result<Datum> {
        let agg = &mut self.agg;
        match func {
            AggFunc::Count => {
                if !value.is_null() {
                    agg.count += 1;
                }
                Ok(Datum::Int8(agg.count))
            }
            AggFunc::Sum => {
                if !value.is_null() {
                    agg.sum = agg.sum.arith(ArithOp::Add, &value)?;
                }
                Ok(agg.sum.clone())
            }
            AggFunc::Avg => {
                if !value.is_null() {
                    agg.sum = agg.sum.arith(ArithOp::Add, &value)?;
                    agg.count += 1;
                }
                if agg.count == 0 {
                    return Ok(Datum::Null);
                }
                agg.sum.arith(ArithOp::Div, &Datum::Int8(agg.count))
            }
            AggFunc::Max => {
                if !value.is_null()
                    && (agg.max.is_null()
                        || value.compare(&agg.max)? == std::cmp::Ordering::Greater)
                {
                    agg.max = value;
                }
                Ok(agg.max.clone())
            }
            AggFunc::Min => {
                if !value.is_null()
                    && (agg.min.is_null()
                        || value.compare(&agg.min)? == std::cmp::Ordering::Less)
                {
                    agg.min = value;
                }
                Ok(agg.min.clone())
            }
        }
    }
}

impl<E: KvEngine, P: Predictor> Drop for Executor<E, P> {
    /// A dropped session rolls back whatever transaction is still open,
    /// covering client disconnects mid-block.
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            if let Err(e) = txn.rollback() {
                warn!(error = %e, "rollback on session teardown failed");
            }
        }
    }
}
