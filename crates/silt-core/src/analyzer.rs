//! Semantic analysis.
//!
//! The analyzer walks a parsed statement against the catalog, annotating
//! every scan with its output attribute set and every column reference
//! with its resolved `(scope, position, type)`. Name resolution searches a
//! scope stack from the innermost scope outward; scalar subqueries push a
//! scope on entry and pop it on exit. Analysis is also where wildcards are
//! expanded, ORDER BY ghost columns are appended, and each projection
//! column is classified as aggregate or per-row.

use crate::ast::{
    ColumnRef, CreateTableStmt, Expr, Literal, Resolved, Scan, Statement, UnaryOp,
};
use crate::catalog::{Attribute, AttributeSet, TableSchema};
use crate::datum::{Datum, DatumType};
use crate::error::{Error, Result};
use crate::storage::{KvTxn, CATALOG, MODELS};

/// Statement verifier. One instance per statement; holds the scope stack.
pub struct Analyzer<'a, T: KvTxn> {
    txn: &'a T,
    scopes: Vec<AttributeSet>,
    allow_aggregates: bool,
}

impl<'a, T: KvTxn> Analyzer<'a, T> {
    /// Creates an analyzer reading the catalog through `txn`.
    pub fn new(txn: &'a T) -> Self {
        Self {
            txn,
            scopes: Vec::new(),
            allow_aggregates: false,
        }
    }

    /// Loads a table's schema from the catalog, `None` if absent.
    fn load_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        match self.txn.get(CATALOG, table.as_bytes())? {
            Some(bytes) => Ok(Some(TableSchema::deserialize(table, &bytes)?)),
            None => Ok(None),
        }
    }

    fn with_scope<R>(
        &mut self,
        attrs: AttributeSet,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        self.scopes.push(attrs);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Verifies and annotates one statement.
    pub fn verify(&mut self, stmt: &mut Statement) -> Result<()> {
        match stmt {
            Statement::CreateTable(create) => self.verify_create_table(create),
            Statement::Insert(insert) => {
                let attrs = self.verify_scan(&mut insert.target)?;
                if !insert.target.is_updatable() {
                    return Err(Error::Analysis(
                        "insert target must be a single table".into(),
                    ));
                }
                let assigns = &mut insert.assigns;
                self.with_scope(attrs, |a| {
                    for tuple in assigns.iter_mut() {
                        for assign in tuple.iter_mut() {
                            a.verify_expr(assign)?;
                        }
                    }
                    Ok(())
                })
            }
            Statement::Update(update) => {
                let attrs = self.verify_scan(&mut update.scan)?;
                let assigns = &mut update.assigns;
                self.with_scope(attrs, |a| {
                    for assign in assigns.iter_mut() {
                        a.verify_expr(assign)?;
                    }
                    Ok(())
                })
            }
            Statement::Delete(delete) => {
                self.verify_scan(&mut delete.scan)?;
                Ok(())
            }
            Statement::Select(select) => {
                self.verify_scan(&mut select.scan)?;
                Ok(())
            }
            Statement::DescribeTable { table } => match self.load_schema(table)? {
                Some(_) => Ok(()),
                None => Err(Error::Analysis(format!("table '{table}' does not exist"))),
            },
            Statement::DropTable { table, if_exists } => {
                if self.load_schema(table)?.is_none() && !*if_exists {
                    return Err(Error::Analysis(format!("table '{table}' does not exist")));
                }
                Ok(())
            }
            Statement::CreateModel { name, .. } => {
                if self.txn.get(MODELS, name.as_bytes())?.is_some() {
                    return Err(Error::Analysis(format!("model '{name}' already exists")));
                }
                Ok(())
            }
            Statement::DropModel { name, if_exists } => {
                if self.txn.get(MODELS, name.as_bytes())?.is_none() && !*if_exists {
                    return Err(Error::Analysis(format!("model '{name}' does not exist")));
                }
                Ok(())
            }
            // Transaction control is validated by the executor, which owns
            // the transaction state.
            Statement::Txn(_) => Ok(()),
        }
    }

    fn verify_create_table(&mut self, create: &CreateTableStmt) -> Result<()> {
        if self.load_schema(&create.table)?.is_some() {
            return Err(Error::Analysis(format!(
                "table '{}' already exists",
                create.table
            )));
        }

        for (i, col) in create.columns.iter().enumerate() {
            if create.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::Analysis(format!(
                    "duplicate column '{}' in table '{}'",
                    col.name, create.table
                )));
            }
        }

        for group in &create.uniques {
            for col in group {
                if !create.columns.iter().any(|c| &c.name == col) {
                    return Err(Error::Analysis(format!(
                        "unique column '{col}' is not declared in table '{}'",
                        create.table
                    )));
                }
            }
        }

        Ok(())
    }

    /* --- scans --- */

    /// Verifies a scan and records its output attribute set on the node.
    fn verify_scan(&mut self, scan: &mut Scan) -> Result<AttributeSet> {
        match scan {
            Scan::Constant { exprs, attrs } => {
                // A constant scan is the row source of a FROM-less SELECT,
                // so its expressions are projection expressions.
                let saved = self.allow_aggregates;
                self.allow_aggregates = true;
                let mut out = Vec::with_capacity(exprs.len());
                let mut failed = None;
                for expr in exprs.iter_mut() {
                    match self.verify_expr(expr) {
                        Ok(attr) => out.push(attr),
                        Err(e) => {
                            failed = Some(e);
                            break;
                        }
                    }
                }
                self.allow_aggregates = saved;
                if let Some(e) = failed {
                    return Err(e);
                }
                let set = AttributeSet::new(out);
                *attrs = Some(set.clone());
                Ok(set)
            }
            Scan::Table {
                name,
                alias,
                schema,
                attrs,
            } => {
                let loaded = self
                    .load_schema(name)?
                    .ok_or_else(|| Error::Analysis(format!("table '{name}' does not exist")))?;
                let ref_name = alias.as_deref().unwrap_or(name.as_str());
                let set = loaded.attribute_set(ref_name);
                *schema = Some(loaded);
                *attrs = Some(set.clone());
                Ok(set)
            }
            Scan::Select {
                input,
                predicate,
                attrs,
            } => {
                let set = self.verify_scan(input)?;
                self.with_scope(set.clone(), |a| {
                    let attr = a.verify_expr(predicate)?;
                    if attr.ty != DatumType::Bool {
                        return Err(Error::Analysis(
                            "where clause must evaluate to true or false".into(),
                        ));
                    }
                    Ok(())
                })?;
                *attrs = Some(set.clone());
                Ok(set)
            }
            Scan::Product { left, right, attrs } => {
                let left_set = self.verify_scan(left)?;
                let right_set = self.verify_scan(right)?;
                let set = AttributeSet::concat(&left_set, &right_set)?;
                *attrs = Some(set.clone());
                Ok(set)
            }
            Scan::OuterSelect {
                left,
                right,
                predicate,
                attrs,
                ..
            } => {
                let left_set = self.verify_scan(left)?;
                let right_set = self.verify_scan(right)?;
                let set = AttributeSet::concat(&left_set, &right_set)?;
                self.with_scope(set.clone(), |a| {
                    let attr = a.verify_expr(predicate)?;
                    if attr.ty != DatumType::Bool {
                        return Err(Error::Analysis(
                            "join predicate must evaluate to true or false".into(),
                        ));
                    }
                    Ok(())
                })?;
                *attrs = Some(set.clone());
                Ok(set)
            }
            Scan::Project {
                input,
                projections,
                group_by,
                having,
                order_by,
                limit,
                ghost_cols,
                agg_cols,
                attrs,
                ..
            } => {
                let input_set = self.verify_scan(input)?;

                // Expand wildcards against the input attributes; several
                // may appear in one projection list.
                while let Some(pos) = projections.iter().position(|e| matches!(e, Expr::Wildcard))
                {
                    let expanded: Vec<Expr> = input_set
                        .attributes()
                        .iter()
                        .map(|a| {
                            Expr::Column(ColumnRef::new(
                                Some(a.rel.clone()),
                                a.name.clone(),
                                Default::default(),
                            ))
                        })
                        .collect();
                    projections.splice(pos..=pos, expanded);
                }

                // Append ORDER BY columns missing from the projection as
                // ghost columns so sorting can see them; they are stripped
                // again after the sort.
                *ghost_cols = 0;
                for spec in order_by.iter() {
                    let name = spec.expr.display_name();
                    if !projections.iter().any(|p| p.display_name() == name) {
                        projections.push(spec.expr.clone());
                        *ghost_cols += 1;
                    }
                }

                let (set, flags) = self.with_scope(input_set, |a| {
                    for spec in order_by.iter_mut() {
                        a.verify_expr(&mut spec.expr)?;
                    }

                    let mut out = Vec::with_capacity(projections.len());
                    let mut flags = Vec::with_capacity(projections.len());
                    for expr in projections.iter_mut() {
                        a.allow_aggregates = true;
                        let attr = a.verify_expr(expr);
                        a.allow_aggregates = false;
                        out.push(attr?);
                        flags.push(expr.contains_aggregate());
                    }

                    // GROUP BY and HAVING are carried through the plan but
                    // have no executor semantics yet; names and types are
                    // still checked.
                    for expr in group_by.iter_mut() {
                        a.verify_expr(expr)?;
                    }
                    if let Some(h) = having.as_mut() {
                        let attr = a.verify_expr(h)?;
                        if attr.ty != DatumType::Bool {
                            return Err(Error::Analysis(
                                "having clause must evaluate to true or false".into(),
                            ));
                        }
                    }

                    let attr = a.verify_expr(limit)?;
                    if !attr.ty.is_integer() {
                        return Err(Error::Analysis(
                            "limit must be an expression that evaluates to an integer".into(),
                        ));
                    }

                    Ok((AttributeSet::new(out), flags))
                })?;

                *agg_cols = flags;
                *attrs = Some(set.clone());
                Ok(set)
            }
        }
    }

    /* --- expressions --- */

    /// Verifies an expression, resolving column references, and returns
    /// the attribute describing its result.
    fn verify_expr(&mut self, expr: &mut Expr) -> Result<Attribute> {
        let name = expr.display_name();
        match expr {
            Expr::Literal(lit) => {
                let ty = match lit {
                    Literal::Integer(_) => DatumType::Int8,
                    Literal::Float(_) => DatumType::Float4,
                    Literal::String(_) => DatumType::Text,
                    Literal::Bytea(_) => DatumType::Bytea,
                    Literal::Boolean(_) => DatumType::Bool,
                    Literal::Null => DatumType::Null,
                };
                Ok(Attribute::computed(name, ty))
            }
            Expr::Column(col) => self.resolve_column(col),
            Expr::Assign {
                target,
                value,
                column_type,
            } => {
                let value_attr = self.verify_expr(value)?;
                let attr = self.resolve_column(target)?;

                if value_attr.ty != DatumType::Null
                    && value_attr.ty != attr.ty
                    && !Datum::can_cast(value_attr.ty, attr.ty)
                {
                    return Err(Error::Analysis(format!(
                        "cannot assign {} to column '{}' of type {}",
                        value_attr.ty.name(),
                        target.display(),
                        attr.ty.name()
                    )));
                }

                *column_type = Some(attr.ty);
                Ok(attr)
            }
            Expr::Binary { op, left, right } => {
                let op = *op;
                let left_attr = self.verify_expr(left)?;
                let right_attr = self.verify_expr(right)?;

                // A null operand nulls the whole expression at plan time.
                if left_attr.ty == DatumType::Null || right_attr.ty == DatumType::Null {
                    return Ok(Attribute::computed(name, DatumType::Null));
                }

                let ty = if op.is_comparison() {
                    let numeric = left_attr.ty.is_numeric() && right_attr.ty.is_numeric();
                    if !numeric && left_attr.ty != right_attr.ty {
                        return Err(Error::Analysis(
                            "equality and relational operands must share a data type".into(),
                        ));
                    }
                    DatumType::Bool
                } else if op.is_logical() {
                    if left_attr.ty != DatumType::Bool || right_attr.ty != DatumType::Bool {
                        return Err(Error::Analysis(
                            "logical operator operands must be boolean".into(),
                        ));
                    }
                    DatumType::Bool
                } else if op.is_pattern() {
                    if left_attr.ty != DatumType::Text || right_attr.ty != DatumType::Text {
                        return Err(Error::Analysis(format!(
                            "'{}' operands must be text",
                            op.as_str()
                        )));
                    }
                    DatumType::Bool
                } else {
                    if !left_attr.ty.is_numeric() || !right_attr.ty.is_numeric() {
                        return Err(Error::Analysis(format!(
                            "'{}' operands must both be numeric",
                            op.as_str()
                        )));
                    }
                    if left_attr.ty == DatumType::Float4 || right_attr.ty == DatumType::Float4 {
                        DatumType::Float4
                    } else {
                        DatumType::Int8
                    }
                };

                Ok(Attribute::computed(name, ty))
            }
            Expr::Unary { op, operand } => {
                let op = *op;
                let attr = self.verify_expr(operand)?;
                if attr.ty == DatumType::Null {
                    return Ok(Attribute::computed(name, DatumType::Null));
                }
                let ty = match op {
                    UnaryOp::Not => {
                        if attr.ty != DatumType::Bool {
                            return Err(Error::Analysis(
                                "'not' operand must be boolean".into(),
                            ));
                        }
                        DatumType::Bool
                    }
                    UnaryOp::Neg => {
                        if !attr.ty.is_numeric() {
                            return Err(Error::Analysis(
                                "'-' operand must be numeric".into(),
                            ));
                        }
                        attr.ty
                    }
                };
                Ok(Attribute::computed(name, ty))
            }
            Expr::IsNull { operand, .. } => {
                self.verify_expr(operand)?;
                Ok(Attribute::computed(name, DatumType::Bool))
            }
            Expr::Aggregate { func, arg } => {
                if !self.allow_aggregates {
                    return Err(Error::Analysis(format!(
                        "aggregate function '{}' is only allowed in a projection",
                        func.name()
                    )));
                }
                let func = *func;
                // No nested aggregates.
                self.allow_aggregates = false;
                let arg_attr = self.verify_expr(arg);
                self.allow_aggregates = true;
                let arg_attr = arg_attr?;

                let ty = match func {
                    crate::ast::AggFunc::Count => DatumType::Int8,
                    _ => arg_attr.ty,
                };
                Ok(Attribute::computed(name, ty))
            }
            Expr::Predict { model, arg } => {
                let model = model.clone();
                self.verify_expr(arg)?;
                if self.txn.get(MODELS, model.as_bytes())?.is_none() {
                    return Err(Error::Analysis(format!("model '{model}' does not exist")));
                }
                Ok(Attribute::computed(name, DatumType::Int8))
            }
            Expr::Cast { operand, target } => {
                let target = *target;
                let attr = self.verify_expr(operand)?;
                if !Datum::can_cast(attr.ty, target) {
                    return Err(Error::Analysis(format!(
                        "cannot cast {} to {}",
                        attr.ty.name(),
                        target.name()
                    )));
                }
                Ok(Attribute::computed(name, target))
            }
            Expr::Subquery(select) => {
                let set = self.verify_scan(&mut select.scan)?;
                let visible = match &select.scan {
                    Scan::Project { ghost_cols, .. } => set.len() - ghost_cols,
                    _ => set.len(),
                };
                if visible != 1 {
                    return Err(Error::Analysis(
                        "scalar subquery must return a single column".into(),
                    ));
                }
                Ok(set.attributes()[0].clone())
            }
            Expr::Wildcard => Err(Error::Analysis(
                "'*' is only allowed in a projection list".into(),
            )),
        }
    }

    /// Resolves a column reference against the scope stack, innermost
    /// scope first, and records the resolution on the node.
    fn resolve_column(&mut self, col: &mut ColumnRef) -> Result<Attribute> {
        for depth in 0..self.scopes.len() {
            let set = &self.scopes[self.scopes.len() - 1 - depth];

            let rel = match &col.table {
                Some(t) => t.clone(),
                None => match set.resolve_relation(&col.column)? {
                    Some(rel) => rel,
                    None => continue,
                },
            };

            if let Some((index, attr)) = set.position(&rel, &col.column) {
                let attr = attr.clone();
                col.resolved = Some(Resolved {
                    scope: depth,
                    index,
                    ty: attr.ty,
                });
                return Ok(attr);
            }
        }

        Err(Error::Analysis(format!(
            "column '{}' does not exist",
            col.display()
        )))
    }
}
