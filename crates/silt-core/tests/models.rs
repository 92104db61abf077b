//! Model lifecycle and prediction through the inference boundary.

mod common;
use common::*;

use std::io::Write;

use silt_core::error::Error;
use silt_core::executor::Executor;
use silt_core::storage::MemoryEngine;

fn artifact() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"opaque model bytes").unwrap();
    file
}

#[test]
fn create_and_drop_model() {
    let mut s = session();
    let file = artifact();
    let path = file.path().display().to_string();

    let out = run(&mut s, &format!("CREATE MODEL digits ('{path}');"));
    assert_eq!(out.message, "(model 'digits' created)");

    // Duplicate names are rejected at analysis.
    assert!(matches!(
        run_err(&mut s, &format!("CREATE MODEL digits ('{path}');")),
        Error::Analysis(_)
    ));

    let out = run(&mut s, "DROP MODEL digits;");
    assert_eq!(out.message, "(model 'digits' dropped)");

    assert!(matches!(
        run_err(&mut s, "DROP MODEL digits;"),
        Error::Analysis(_)
    ));
    let out = run(&mut s, "DROP MODEL IF EXISTS digits;");
    assert_eq!(
        out.message,
        "(model 'digits' doesn't exist and not dropped)"
    );
}

#[test]
fn create_model_with_a_bad_path_fails() {
    let mut s = session();
    assert!(matches!(
        run_err(&mut s, "CREATE MODEL m ('/definitely/not/here');"),
        Error::Storage(_)
    ));
}

#[test]
fn predict_returns_the_first_class_as_int8() {
    let engine = MemoryEngine::new();
    let mut s = Executor::new(engine, FixedPredictor(7));
    let file = artifact();
    let path = file.path().display().to_string();

    let outcomes = s.execute_query(&format!(
        "CREATE MODEL classify ('{path}'); \
         CREATE TABLE img (pixels bytea); \
         INSERT INTO img (pixels) VALUES (\\x0102); \
         SELECT classify(pixels) FROM img;"
    ));
    for outcome in &outcomes {
        assert!(outcome.is_ok(), "failed: {outcome:?}");
    }
    let last = outcomes.last().unwrap().as_ref().unwrap();
    assert_eq!(last.sets[0].rows[0].data, vec![int(7)]);
}

#[test]
fn calling_a_missing_model_is_an_analysis_error() {
    let mut s = session();
    run(&mut s, "CREATE TABLE img (pixels bytea);");
    assert!(matches!(
        run_err(&mut s, "SELECT nothere(pixels) FROM img;"),
        Error::Analysis(_)
    ));
}
