//! Transaction semantics: explicit blocks, auto-commit, aborts, unique
//! constraints under one transaction.

mod common;
use common::*;

use silt_core::error::Error;

fn seeded() -> Session {
    let mut s = session();
    run(
        &mut s,
        "CREATE TABLE t (a int8 primary key, b text not null);",
    );
    run(&mut s, "INSERT INTO t (a, b) VALUES (1, 'x'), (2, 'y');");
    s
}

#[test]
fn rollback_discards_an_insert() {
    let mut s = seeded();
    run(&mut s, "BEGIN;");
    run(&mut s, "INSERT INTO t (a, b) VALUES (3, 'z');");
    run(&mut s, "ROLLBACK;");

    let out = run(&mut s, "SELECT count(a) FROM t;");
    assert_eq!(rows(&out), vec![vec![int(2)]]);
}

#[test]
fn commit_makes_writes_visible_to_other_sessions() {
    let engine = silt_core::storage::MemoryEngine::new();
    let mut a = session_on(&engine);
    let mut b = session_on(&engine);

    run(&mut a, "CREATE TABLE t (a int8);");
    run(&mut a, "BEGIN;");
    run(&mut a, "INSERT INTO t (a) VALUES (1);");
    // Uncommitted writes are not visible elsewhere.
    assert!(rows(&run(&mut b, "SELECT a FROM t;")).is_empty());

    run(&mut a, "COMMIT;");
    assert_eq!(rows(&run(&mut b, "SELECT a FROM t;")), vec![vec![int(1)]]);
}

#[test]
fn a_transaction_reads_its_own_writes() {
    let mut s = seeded();
    run(&mut s, "BEGIN;");
    run(&mut s, "INSERT INTO t (a, b) VALUES (3, 'z');");
    let out = run(&mut s, "SELECT count(a) FROM t;");
    assert_eq!(rows(&out), vec![vec![int(3)]]);
    run(&mut s, "COMMIT;");
}

#[test]
fn begin_inside_a_transaction_is_rejected() {
    let mut s = session();
    run(&mut s, "BEGIN;");
    assert!(matches!(run_err(&mut s, "BEGIN;"), Error::Txn(_)));
}

#[test]
fn commit_and_rollback_outside_a_transaction_are_rejected() {
    let mut s = session();
    assert!(matches!(run_err(&mut s, "COMMIT;"), Error::Txn(_)));
    assert!(matches!(run_err(&mut s, "ROLLBACK;"), Error::Txn(_)));
}

#[test]
fn failure_aborts_the_explicit_transaction() {
    let mut s = seeded();
    run(&mut s, "BEGIN;");
    run(&mut s, "INSERT INTO t (a, b) VALUES (3, 'z');");
    assert!(matches!(
        run_err(&mut s, "SELECT nope FROM t;"),
        Error::Analysis(_)
    ));

    // Every statement but COMMIT/ROLLBACK is now rejected.
    assert!(matches!(
        run_err(&mut s, "SELECT a FROM t;"),
        Error::Txn(_)
    ));

    // COMMIT on an aborted transaction rolls back.
    let out = run(&mut s, "COMMIT;");
    assert_eq!(out.message, "ROLLBACK");
    let out = run(&mut s, "SELECT count(a) FROM t;");
    assert_eq!(rows(&out), vec![vec![int(2)]]);
}

#[test]
fn failed_auto_statement_rolls_back_entirely() {
    let mut s = session();
    run(&mut s, "CREATE TABLE u (a int8, UNIQUE (a) NULLS NOT DISTINCT);");
    run(&mut s, "INSERT INTO u (a) VALUES (1);");
    // The second tuple collides, so the first tuple must not survive.
    assert!(matches!(
        run_err(&mut s, "INSERT INTO u (a) VALUES (5), (1);"),
        Error::Constraint(_)
    ));
    let out = run(&mut s, "SELECT a FROM u;");
    assert_eq!(rows(&out), vec![vec![int(1)]]);
}

#[test]
fn unique_constraint_with_nulls_not_distinct() {
    let mut s = session();
    run(
        &mut s,
        "CREATE TABLE u (a int8, b int8, UNIQUE (a) NULLS NOT DISTINCT);",
    );
    run(&mut s, "INSERT INTO u (a, b) VALUES (1, 2);");
    let err = run_err(&mut s, "INSERT INTO u (a, b) VALUES (1, 3);");
    assert!(matches!(err, Error::Constraint(_)));
    assert!(err.to_string().contains("duplicate unique key"));
}

#[test]
fn unique_constraint_with_nulls_distinct_allows_repeated_nulls() {
    let mut s = session();
    run(
        &mut s,
        "CREATE TABLE u (a int8, UNIQUE (a) NULLS DISTINCT);",
    );
    // The rowid extension keeps every null-bearing key distinct.
    run(&mut s, "INSERT INTO u (a) VALUES (null);");
    run(&mut s, "INSERT INTO u (a) VALUES (null);");

    let out = run(&mut s, "SELECT count(_rowid) FROM u;");
    assert_eq!(rows(&out), vec![vec![int(2)]]);
}

#[test]
fn statements_in_one_query_string_report_individually() {
    let mut s = session();
    let outcomes = s.execute_query(
        "CREATE TABLE t (a int8); INSERT INTO t (a) VALUES (1); SELECT nope FROM t; SELECT a FROM t;",
    );
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_ok());
    assert!(outcomes[2].is_err());
    // Outside an explicit block, later statements still run.
    assert!(outcomes[3].is_ok());
}
