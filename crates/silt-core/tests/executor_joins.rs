//! Join tests: cross, inner, and the outer join family.

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
fn cross_join_is_the_full_product() {
    let mut s = seeded();
    let out = run(
        &mut s,
        "SELECT l.a, r.a FROM t AS l CROSS JOIN t AS r ORDER BY l.a ASC, r.a ASC;",
    );
    assert_eq!(
        rows(&out),
        vec![
            vec![int(1), int(1)],
            vec![int(1), int(2)],
            vec![int(2), int(1)],
            vec![int(2), int(2)],
        ]
    );
}

#[test]
fn inner_join_filters_the_product() {
    let mut s = seeded();
    let out = run(
        &mut s,
        "SELECT l.a, r.a FROM t AS l INNER JOIN t AS r ON l.a = r.a + 1;",
    );
    assert_eq!(rows(&out), vec![vec![int(2), int(1)]]);
}

#[test]
fn left_join_pads_unmatched_left_rows() {
    let mut s = seeded();
    let out = run(
        &mut s,
        "SELECT l.a, r.a FROM t AS l LEFT JOIN t AS r ON l.a = r.a + 1 ORDER BY l.a ASC;",
    );
    assert_eq!(
        rows(&out),
        vec![vec![int(1), null()], vec![int(2), int(1)]]
    );
}

#[test]
fn right_join_pads_unmatched_right_rows() {
    let mut s = seeded();
    let out = run(
        &mut s,
        "SELECT l.a, r.a FROM t AS l RIGHT JOIN t AS r ON l.a = r.a + 1 ORDER BY r.a ASC;",
    );
    assert_eq!(
        rows(&out),
        vec![vec![int(2), int(1)], vec![null(), int(2)]]
    );
}

#[test]
fn full_join_pads_both_sides() {
    let mut s = seeded();
    let out = run(
        &mut s,
        "SELECT l.a, r.a FROM t AS l FULL JOIN t AS r ON l.a = r.a + 1;",
    );
    let mut result = rows(&out);
    result.sort_by_key(|r| format!("{r:?}"));
    let mut expected = vec![
        vec![int(2), int(1)],
        vec![int(1), null()],
        vec![null(), int(2)],
    ];
    expected.sort_by_key(|r| format!("{r:?}"));
    assert_eq!(result, expected);
}

#[test]
fn outer_join_tracks_identical_rows_independently() {
    // Two identical left rows must both be padded when unmatched; keying
    // by position rather than row bytes keeps them apart.
    let mut s = session();
    run(&mut s, "CREATE TABLE l (a int8);");
    run(&mut s, "CREATE TABLE r (a int8);");
    run(&mut s, "INSERT INTO l (a) VALUES (1), (1);");
    run(&mut s, "INSERT INTO r (a) VALUES (9);");

    let out = run(
        &mut s,
        "SELECT l.a, r.a FROM l LEFT JOIN r ON l.a = r.a;",
    );
    assert_eq!(
        rows(&out),
        vec![vec![int(1), null()], vec![int(1), null()]]
    );
}

#[test]
fn duplicate_relation_names_need_an_alias() {
    let mut s = seeded();
    assert!(matches!(
        run_err(&mut s, "SELECT a FROM t CROSS JOIN t;"),
        Error::Analysis(_)
    ));
}

#[test]
fn join_predicate_must_be_boolean() {
    let mut s = seeded();
    assert!(matches!(
        run_err(
            &mut s,
            "SELECT l.a FROM t AS l LEFT JOIN t AS r ON l.a + r.a;"
        ),
        Error::Analysis(_)
    ));
}
