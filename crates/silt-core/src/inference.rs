//! The ML inference boundary.
//!
//! Models are opaque byte artifacts stored in the models column family;
//! the engine never interprets them. A [`Predictor`] turns a model
//! artifact plus an input byte buffer into class indices; `classify`-style
//! function calls in queries return the first index.

use crate::error::{Error, Result};

/// An inference backend.
pub trait Predictor: Send + 'static {
    /// Runs `input` through the model serialized in `model` and returns
    /// the predicted class indices, one per input sample.
    fn predict(&self, model: &[u8], input: &[u8]) -> Result<Vec<i64>>;
}

/// Backend used when no inference runtime is wired in; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPredictor;

impl Predictor for DisabledPredictor {
    fn predict(&self, _model: &[u8], _input: &[u8]) -> Result<Vec<i64>> {
        Err(Error::Storage("no inference backend configured".into()))
    }
}
