#![allow(dead_code)]

use silt_core::datum::Datum;
use silt_core::error::Error;
use silt_core::executor::{ExecOutcome, Executor};
use silt_core::inference::{DisabledPredictor, Predictor};
use silt_core::storage::MemoryEngine;

pub type Session = Executor<MemoryEngine, DisabledPredictor>;

/// A fresh session over its own in-memory engine.
pub fn session() -> Session {
    Executor::new(MemoryEngine::new(), DisabledPredictor)
}

/// A session sharing `engine`, so tests can open several connections or
/// inspect storage directly.
pub fn session_on(engine: &MemoryEngine) -> Session {
    Executor::new(engine.clone(), DisabledPredictor)
}

/// Runs a query expected to succeed completely, returning the last
/// statement's outcome.
pub fn run(session: &mut Session, sql: &str) -> ExecOutcome {
    let outcomes = session.execute_query(sql);
    assert!(!outcomes.is_empty(), "no statements in {sql:?}");
    let mut last = None;
    for outcome in outcomes {
        last = Some(outcome.unwrap_or_else(|e| panic!("query failed: {sql}\nerror: {e}")));
    }
    last.unwrap()
}

/// Runs a query expected to fail on its final statement.
pub fn run_err(session: &mut Session, sql: &str) -> Error {
    let outcomes = session.execute_query(sql);
    outcomes
        .into_iter()
        .last()
        .expect("no statements")
        .expect_err(&format!("expected an error from: {sql}"))
}

/// The rows of a single-result-set outcome as plain datum vectors.
pub fn rows(outcome: &ExecOutcome) -> Vec<Vec<Datum>> {
    assert_eq!(outcome.sets.len(), 1, "expected one result set");
    outcome.sets[0]
        .rows
        .iter()
        .map(|r| r.data.clone())
        .collect()
}

/// Shorthand constructors for expected values.
pub fn int(v: i64) -> Datum {
    Datum::Int8(v)
}

pub fn text(s: &str) -> Datum {
    Datum::Text(s.into())
}

pub fn null() -> Datum {
    Datum::Null
}

/// A predictor that always answers with a fixed class.
pub struct FixedPredictor(pub i64);

impl Predictor for FixedPredictor {
    fn predict(&self, _model: &[u8], _input: &[u8]) -> silt_core::Result<Vec<i64>> {
        Ok(vec![self.0])
    }
}
