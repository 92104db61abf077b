//! In-memory ordered engine.
//!
//! One `BTreeMap` per column family behind an `RwLock`. Transactions
//! buffer their writes in an overlay (`None` marks a deletion) and apply
//! them on commit under the write lock. This gives single-node
//! read-committed behavior with read-your-own-writes, which is what the
//! executor requires of an engine; it does not detect write-write
//! conflicts between concurrent transactions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

use super::engine::{KeyValue, KvEngine, KvTxn};

type ColumnFamily = BTreeMap<Vec<u8>, Vec<u8>>;
type Families = HashMap<String, ColumnFamily>;

/// An ordered KV store living entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    families: Arc<RwLock<Families>>,
}

impl MemoryEngine {
    /// Creates an empty engine with the catalog and model families.
    #[must_use]
    pub fn new() -> Self {
        let engine = Self {
            families: Arc::new(RwLock::new(HashMap::new())),
        };
        {
            let mut families = engine.families.write().unwrap();
            families.insert(super::engine::CATALOG.into(), BTreeMap::new());
            families.insert(super::engine::MODELS.into(), BTreeMap::new());
        }
        engine
    }
}

impl KvEngine for MemoryEngine {
    type Txn = MemoryTxn;

    fn begin(&self) -> Result<MemoryTxn> {
        Ok(MemoryTxn {
            families: Arc::clone(&self.families),
            overlay: HashMap::new(),
        })
    }

    fn create_column_family(&self, name: &str) -> Result<()> {
        let mut families = self.families.write().unwrap();
        if families.contains_key(name) {
            return Err(Error::Storage(format!(
                "column family '{name}' already exists"
            )));
        }
        families.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    fn drop_column_family(&self, name: &str) -> Result<()> {
        let mut families = self.families.write().unwrap();
        families
            .remove(name)
            .ok_or_else(|| Error::Storage(format!("no column family '{name}'")))?;
        Ok(())
    }
}

/// Buffered writes for one transaction: key to value, `None` = tombstone.
type Overlay = HashMap<String, BTreeMap<Vec<u8>, Option<Vec<u8>>>>;

/// A transaction over [`MemoryEngine`].
pub struct MemoryTxn {
    families: Arc<RwLock<Families>>,
    overlay: Overlay,
}

impl MemoryTxn {
    fn check_family(&self, cf: &str) -> Result<()> {
        if self.families.read().unwrap().contains_key(cf) {
            Ok(())
        } else {
            Err(Error::Storage(format!("no column family '{cf}'")))
        }
    }
}

impl KvTxn for MemoryTxn {
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(pending) = self.overlay.get(cf).and_then(|o| o.get(key)) {
            return Ok(pending.clone());
        }
        let families = self.families.read().unwrap();
        let family = families
            .get(cf)
            .ok_or_else(|| Error::Storage(format!("no column family '{cf}'")))?;
        Ok(family.get(key).cloned())
    }

    fn put(&mut self, cf: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_family(cf)?;
        self.overlay
            .entry(cf.to_string())
            .or_default()
            .insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, cf: &str, key: &[u8]) -> Result<()> {
        self.check_family(cf)?;
        self.overlay
            .entry(cf.to_string())
            .or_default()
            .insert(key.to_vec(), None);
        Ok(())
    }

    fn scan(&self, cf: &str) -> Result<Box<dyn Iterator<Item = KeyValue> + Send>> {
        let families = self.families.read().unwrap();
        let family = families
            .get(cf)
            .ok_or_else(|| Error::Storage(format!("no column family '{cf}'")))?;

        // Merge committed state with this transaction's overlay into a
        // snapshot. Materializing keeps the iterator independent of locks
        // and of writes issued while the scan is open.
        let mut merged = family.clone();
        if let Some(overlay) = self.overlay.get(cf) {
            for (key, pending) in overlay {
                match pending {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }
        Ok(Box::new(merged.into_iter()))
    }

    fn commit(self) -> Result<()> {
        let Self {
            families, overlay, ..
        } = self;
        let mut families = families.write().unwrap();
        for (cf, overlay) in overlay {
            // A family dropped mid-transaction loses its pending writes.
            let Some(family) = families.get_mut(&cf) else {
                continue;
            };
            for (key, pending) in overlay {
                match pending {
                    Some(value) => {
                        family.insert(key, value);
                    }
                    None => {
                        family.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        Ok(())
    }
}
