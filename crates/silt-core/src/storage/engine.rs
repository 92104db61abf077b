//! The ordered key-value store boundary.
//!
//! The engine is an external collaborator: the executor only ever talks to
//! these traits. An engine provides named column families (one per index,
//! plus the catalog and model families) and transactions with
//! read-your-own-writes semantics; cross-transaction isolation is the
//! engine's business.

use crate::error::Result;

/// Column family holding serialized table schemas, keyed by table name.
pub const CATALOG: &str = "__catalog__";

/// Column family holding model artifacts, keyed by model name.
pub const MODELS: &str = "__models__";

/// A key-value pair yielded by a scan.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// An ordered KV store with column families and transactions.
pub trait KvEngine: Clone + Send + 'static {
    /// The transaction type this engine hands out.
    type Txn: KvTxn;

    /// Begins a transaction.
    fn begin(&self) -> Result<Self::Txn>;

    /// Creates an empty column family. Fails if it already exists.
    fn create_column_family(&self, name: &str) -> Result<()>;

    /// Drops a column family and everything in it.
    fn drop_column_family(&self, name: &str) -> Result<()>;
}

/// A transaction over the engine. Reads observe the transaction's own
/// uncommitted writes. Commit and rollback consume the transaction, so a
/// transaction cannot outlive its resolution.
pub trait KvTxn {
    /// Point lookup.
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Writes a key-value pair.
    fn put(&mut self, cf: &str, key: &[u8], value: &[u8]) -> Result<()>;

    /// Deletes a key.
    fn delete(&mut self, cf: &str, key: &[u8]) -> Result<()>;

    /// Iterates a column family in ascending key order, merged with this
    /// transaction's uncommitted writes. The iterator is a stable snapshot:
    /// writes issued after the call do not appear in it.
    fn scan(&self, cf: &str) -> Result<Box<dyn Iterator<Item = KeyValue> + Send>>;

    /// Atomically applies all writes.
    fn commit(self) -> Result<()>;

    /// Discards all writes.
    fn rollback(self) -> Result<()>;
}
