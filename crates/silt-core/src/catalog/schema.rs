//! Persistent table metadata.
//!
//! A [`TableSchema`] is the catalog entry for one table: its attribute
//! list (with the auto-prepended `_rowid`), the rowid allocation counter,
//! and its index definitions. The serialized form written under the
//! table's name in the catalog column family is: rowid counter (8 bytes
//! LE), attribute count (4 LE), then per attribute a type tag byte, a
//! length-prefixed name, and a not-null byte; then the index count (4 LE)
//! and per index a length-prefixed name, a column count, and the column
//! positions (4 LE each).

use crate::ast::CreateTableStmt;
use crate::datum::{take, DatumType};
use crate::error::{Error, Result};

use super::{Attribute, AttributeSet, Index};

/// Catalog entry for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table: String,
    /// Monotonically increasing allocator for `_rowid`; persisted so ids
    /// are never reused.
    pub rowid_counter: i64,
    pub attrs: Vec<Attribute>,
    /// Index definitions; the first is the primary index.
    pub indexes: Vec<Index>,
}

impl TableSchema {
    /// Builds a schema from a normalized CREATE TABLE statement. One index
    /// is created per unique column group, the primary key group first.
    pub fn from_create(stmt: &CreateTableStmt) -> Result<Self> {
        let attrs: Vec<Attribute> = stmt
            .columns
            .iter()
            .map(|c| Attribute::new(stmt.table.clone(), c.name.clone(), c.ty, c.not_null))
            .collect();

        let mut indexes = Vec::with_capacity(stmt.uniques.len());
        for group in &stmt.uniques {
            let mut key_cols = Vec::with_capacity(group.len());
            for col in group {
                let pos = attrs.iter().position(|a| &a.name == col).ok_or_else(|| {
                    Error::Analysis(format!(
                        "unique column '{col}' is not declared in table '{}'",
                        stmt.table
                    ))
                })?;
                key_cols.push(pos);
            }
            let names: Vec<&str> = group.iter().map(String::as_str).collect();
            indexes.push(Index::new(&stmt.table, &names, key_cols));
        }

        Ok(Self {
            table: stmt.table.clone(),
            rowid_counter: 0,
            attrs,
            indexes,
        })
    }

    /// Allocates the next rowid, advancing the counter. The schema must be
    /// rewritten to the catalog afterwards or ids would be reused.
    pub fn next_rowid(&mut self) -> i64 {
        let id = self.rowid_counter;
        self.rowid_counter += 1;
        id
    }

    /// The primary index.
    #[must_use]
    pub fn primary_index(&self) -> &Index {
        &self.indexes[0]
    }

    /// The secondary indexes, possibly empty.
    #[must_use]
    pub fn secondary_indexes(&self) -> &[Index] {
        &self.indexes[1..]
    }

    /// The attribute set this table contributes to a scan, under the given
    /// reference name (the table name or its alias).
    #[must_use]
    pub fn attribute_set(&self, ref_name: &str) -> AttributeSet {
        AttributeSet::new(
            self.attrs
                .iter()
                .map(|a| Attribute::new(ref_name, a.name.clone(), a.ty, a.not_null))
                .collect(),
        )
    }

    /// Serializes the schema for the catalog column family.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.rowid_counter.to_le_bytes());

        buf.extend_from_slice(&(self.attrs.len() as u32).to_le_bytes());
        for attr in &self.attrs {
            buf.push(attr.ty.tag());
            buf.extend_from_slice(&(attr.name.len() as u32).to_le_bytes());
            buf.extend_from_slice(attr.name.as_bytes());
            buf.push(u8::from(attr.not_null));
        }

        buf.extend_from_slice(&(self.indexes.len() as u32).to_le_bytes());
        for index in &self.indexes {
            buf.extend_from_slice(&(index.name.len() as u32).to_le_bytes());
            buf.extend_from_slice(index.name.as_bytes());
            buf.extend_from_slice(&(index.key_cols.len() as u32).to_le_bytes());
            for &col in &index.key_cols {
                buf.extend_from_slice(&(col as u32).to_le_bytes());
            }
        }

        buf
    }

    /// Deserializes a catalog entry.
    pub fn deserialize(table: &str, buf: &[u8]) -> Result<Self> {
        let mut off = 0usize;
        let truncated = || Error::Storage(format!("truncated catalog entry for '{table}'"));

        let rowid_counter = i64::from_le_bytes(
            take(buf, &mut off, 8)
                .ok_or_else(truncated)?
                .try_into()
                .unwrap(),
        );

        let read_u32 = |off: &mut usize| -> Result<u32> {
            Ok(u32::from_le_bytes(
                take(buf, off, 4).ok_or_else(truncated)?.try_into().unwrap(),
            ))
        };

        let attr_count = read_u32(&mut off)? as usize;
        let mut attrs = Vec::with_capacity(attr_count);
        for _ in 0..attr_count {
            let ty = DatumType::from_tag(take(buf, &mut off, 1).ok_or_else(truncated)?[0])?;
            let name_len = read_u32(&mut off)? as usize;
            let name =
                String::from_utf8(take(buf, &mut off, name_len).ok_or_else(truncated)?.to_vec())
                    .map_err(|_| truncated())?;
            let not_null = take(buf, &mut off, 1).ok_or_else(truncated)?[0] != 0;
            attrs.push(Attribute::new(table, name, ty, not_null));
        }

        let idx_count = read_u32(&mut off)? as usize;
        let mut indexes = Vec::with_capacity(idx_count);
        for _ in 0..idx_count {
            let name_len = read_u32(&mut off)? as usize;
            let name =
                String::from_utf8(take(buf, &mut off, name_len).ok_or_else(truncated)?.to_vec())
                    .map_err(|_| truncated())?;
            let col_count = read_u32(&mut off)? as usize;
            let mut key_cols = Vec::with_capacity(col_count);
            for _ in 0..col_count {
                key_cols.push(read_u32(&mut off)? as usize);
            }
            indexes.push(Index { name, key_cols });
        }

        if indexes.is_empty() {
            return Err(Error::Storage(format!(
                "catalog entry for '{table}' has no primary index"
            )));
        }

        Ok(Self {
            table: table.to_string(),
            rowid_counter,
            attrs,
            indexes,
        })
    }
}
