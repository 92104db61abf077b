//! # silt-core
//!
//! The query pipeline and storage engine behind the silt database: an
//! SQL-like language parsed by a hand-written recursive descent parser,
//! verified against a persistent catalog, and executed against an ordered
//! transactional key-value store.
//!
//! The pipeline, leaves first:
//!
//! - [`datum`] — typed values and the bytewise value codec
//! - [`lexer`] — query text to tokens
//! - [`parser`] — tokens to statements, scans, and expressions
//! - [`catalog`] — table schemas, attribute sets, index key layout
//! - [`storage`] — the `KvEngine`/`KvTxn` boundary and the bundled
//!   in-memory engine
//! - [`analyzer`] — name resolution and type checking over a scope stack
//! - [`executor`] — statement dispatch, the pull-based scan operator
//!   tree, and expression evaluation
//! - [`wire`] — the length-prefixed TCP message codec
//! - [`inference`] — the opaque model prediction boundary
//!
//! ```
//! use silt_core::executor::Executor;
//! use silt_core::inference::DisabledPredictor;
//! use silt_core::storage::MemoryEngine;
//!
//! let mut session = Executor::new(MemoryEngine::new(), DisabledPredictor);
//! let outcomes = session.execute_query(
//!     "CREATE TABLE t (a int8 primary key); \
//!      INSERT INTO t (a) VALUES (1), (2); \
//!      SELECT a FROM t ORDER BY a DESC;",
//! );
//! assert!(outcomes.iter().all(Result::is_ok));
//! ```

pub mod analyzer;
pub mod ast;
pub mod catalog;
pub mod datum;
pub mod error;
pub mod executor;
pub mod inference;
pub mod lexer;
pub mod parser;
pub mod row;
pub mod storage;
pub mod wire;

pub use error::{Error, Result};
