//! Statement-level tests: table lifecycle, insert, update, delete,
//! describe.

mod common;
use common::*;

use silt_core::datum::Datum;
use silt_core::error::Error;

#[test]
fn create_insert_select_ordered() {
    let mut s = session();
    run(
        &mut s,
        "CREATE TABLE t (a int8 primary key, b text not null);",
    );
    run(&mut s, "INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y');");

    let out = run(&mut s, "SELECT a, b FROM t ORDER BY a DESC;");
    assert_eq!(
        rows(&out),
        vec![vec![int(2), text("y")], vec![int(1), text("x")]]
    );
    assert_eq!(out.message, "(2 rows)");
}

#[test]
fn insert_reports_row_count() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8);");
    let out = run(&mut s, "INSERT INTO t (a) VALUES (1), (2), (3);");
    assert_eq!(out.message, "(3 rows inserted)");
}

#[test]
fn table_scan_returns_rows_in_primary_key_order() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8 primary key);");
    run(&mut s, "INSERT INTO t (a) VALUES (10), (-3), (7), (0);");

    let out = run(&mut s, "SELECT a FROM t;");
    assert_eq!(
        rows(&out),
        vec![vec![int(-3)], vec![int(0)], vec![int(7)], vec![int(10)]]
    );
}

#[test]
fn update_rewrites_rows() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8 primary key, b text);");
    run(&mut s, "INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y');");

    let out = run(&mut s, "UPDATE t SET b = 'z' WHERE a = 2;");
    assert_eq!(out.message, "(1 rows updated)");

    let out = run(&mut s, "SELECT b FROM t ORDER BY a ASC;");
    assert_eq!(rows(&out), vec![vec![text("x")], vec![text("z")]]);
}

#[test]
fn update_can_change_the_primary_key() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8 primary key, b text);");
    run(&mut s, "INSERT INTO t (a, b) VALUES (1, 'x');");
    run(&mut s, "UPDATE t SET a = 5 WHERE a = 1;");

    let out = run(&mut s, "SELECT a, b FROM t;");
    assert_eq!(rows(&out), vec![vec![int(5), text("x")]]);
}

#[test]
fn update_to_an_existing_primary_key_is_a_constraint_error() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8 primary key);");
    run(&mut s, "INSERT INTO t (a) VALUES (1), (2);");
    assert!(matches!(
        run_err(&mut s, "UPDATE t SET a = 2 WHERE a = 1;"),
        Error::Constraint(_)
    ));
}

#[test]
fn delete_with_and_without_predicate() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8);");
    run(&mut s, "INSERT INTO t (a) VALUES (1), (2), (3);");

    let out = run(&mut s, "DELETE FROM t WHERE a = 2;");
    assert_eq!(out.message, "(1 rows deleted)");
    assert_eq!(rows(&run(&mut s, "SELECT a FROM t;")).len(), 2);

    let out = run(&mut s, "DELETE FROM t;");
    assert_eq!(out.message, "(2 rows deleted)");
    assert!(rows(&run(&mut s, "SELECT a FROM t;")).is_empty());
}

#[test]
fn rowids_are_not_reused_after_delete() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8);");
    run(&mut s, "INSERT INTO t (a) VALUES (1), (2);");
    run(&mut s, "DELETE FROM t;");
    run(&mut s, "INSERT INTO t (a) VALUES (3);");

    let out = run(&mut s, "SELECT _rowid FROM t;");
    assert_eq!(rows(&out), vec![vec![int(2)]]);
}

#[test]
fn describe_table_returns_columns_and_indexes() {
    let mut s = session();
    run(
        &mut s,
        "CREATE TABLE t (a int8 primary key, b text not null, UNIQUE (b) NULLS NOT DISTINCT);",
    );

    let out = run(&mut s, "DESCRIBE TABLE t;");
    assert_eq!(out.sets.len(), 2);

    let columns: Vec<Vec<Datum>> = out.sets[0].rows.iter().map(|r| r.data.clone()).collect();
    assert_eq!(
        columns,
        vec![
            vec![text("_rowid"), text("int8"), Datum::Bool(true)],
            vec![text("a"), text("int8"), Datum::Bool(true)],
            vec![text("b"), text("text"), Datum::Bool(true)],
        ]
    );

    let indexes: Vec<Vec<Datum>> = out.sets[1].rows.iter().map(|r| r.data.clone()).collect();
    assert_eq!(
        indexes,
        vec![
            vec![text("lsm tree"), text("t_a")],
            vec![text("lsm tree"), text("t_b")],
        ]
    );
}

#[test]
fn drop_table_removes_it_from_the_catalog() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8);");
    let out = run(&mut s, "DROP TABLE t;");
    assert_eq!(out.message, "(table 't' dropped)");

    assert!(matches!(
        run_err(&mut s, "SELECT a FROM t;"),
        Error::Analysis(_)
    ));
    // The name is free again.
    run(&mut s, "CREATE TABLE t (a int8);");
}

#[test]
fn drop_missing_table_needs_if_exists() {
    let mut s = session();
    assert!(matches!(
        run_err(&mut s, "DROP TABLE missing;"),
        Error::Analysis(_)
    ));
    let out = run(&mut s, "DROP TABLE IF EXISTS missing;");
    assert_eq!(out.message, "(table 'missing' doesn't exist and not dropped)");
}

#[test]
fn duplicate_table_is_rejected() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8);");
    assert!(matches!(
        run_err(&mut s, "CREATE TABLE t (a int8);"),
        Error::Analysis(_)
    ));
}

#[test]
fn not_null_violation_is_a_constraint_error() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8, b text not null);");
    assert!(matches!(
        run_err(&mut s, "INSERT INTO t (a, b) VALUES (1, null);"),
        Error::Constraint(_)
    ));
    // Leaving a not-null column unassigned is the same violation.
    assert!(matches!(
        run_err(&mut s, "INSERT INTO t (a) VALUES (1);"),
        Error::Constraint(_)
    ));
}

#[test]
fn insert_casts_value_to_column_type() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a float4);");
    run(&mut s, "INSERT INTO t (a) VALUES (2);");
    let out = run(&mut s, "SELECT a FROM t;");
    assert_eq!(rows(&out), vec![vec![Datum::Float4(2.0)]]);
}

#[test]
fn unknown_column_and_table_are_analysis_errors() {
    let mut s = session();
    run(&mut s, "CREATE TABLE t (a int8);");
    assert!(matches!(
        run_err(&mut s, "SELECT nope FROM t;"),
        Error::Analysis(_)
    ));
    assert!(matches!(
        run_err(&mut s, "SELECT a FROM nope;"),
        Error::Analysis(_)
    ));
}
