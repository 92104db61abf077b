//! Index definitions and order-preserving key construction.
//!
//! Each index owns one column family whose keys are the concatenated
//! encodings of the index columns. The encoding must sort bytewise the way
//! the values sort logically, because table scans walk the primary column
//! family in key order: integers and timestamps are sign-flipped and
//! written big-endian, floats get the usual IEEE order-flip, and
//! variable-length values carry a big-endian length prefix.

use crate::datum::Datum;
use crate::error::{Error, Result};
use crate::row::Row;

/// An index over a subset of a table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Column family name, derived as `table_col1_col2…`.
    pub name: String,
    /// Positions of the key columns in the table's attribute list.
    pub key_cols: Vec<usize>,
}

impl Index {
    /// Creates an index named after the table and its key columns.
    #[must_use]
    pub fn new(table: &str, col_names: &[&str], key_cols: Vec<usize>) -> Self {
        let mut name = table.to_string();
        for col in col_names {
            name.push('_');
            name.push_str(col);
        }
        Self { name, key_cols }
    }

    /// Builds the storage key for a row.
    pub fn key_from_row(&self, row: &Row) -> Result<Vec<u8>> {
        let mut key = Vec::new();
        for &i in &self.key_cols {
            let datum = row
                .data
                .get(i)
                .ok_or_else(|| Error::Storage("row is narrower than its index".into()))?;
            encode_key_datum(datum, &mut key);
        }
        Ok(key)
    }
}

/// Appends the order-preserving encoding of one key column.
fn encode_key_datum(datum: &Datum, key: &mut Vec<u8>) {
    match datum {
        Datum::Int8(v) | Datum::Timestamp(v) => {
            key.extend_from_slice(&((*v as u64) ^ (1 << 63)).to_be_bytes());
        }
        Datum::Float4(v) => {
            let bits = v.to_bits();
            let flipped = if bits & (1 << 31) != 0 {
                !bits
            } else {
                bits | (1 << 31)
            };
            key.extend_from_slice(&flipped.to_be_bytes());
        }
        Datum::Bool(v) => key.push(u8::from(*v)),
        Datum::Text(s) => {
            key.extend_from_slice(&(s.len() as u32).to_be_bytes());
            key.extend_from_slice(s.as_bytes());
        }
        Datum::Bytea(b) => {
            key.extend_from_slice(&(b.len() as u32).to_be_bytes());
            key.extend_from_slice(b);
        }
        // Nulls encode as nothing; unique groups that admit nulls carry a
        // trailing _rowid column, which keeps such keys distinct.
        Datum::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_key(v: i64) -> Vec<u8> {
        let idx = Index {
            name: "t__rowid".into(),
            key_cols: vec![0],
        };
        idx.key_from_row(&Row::new(vec![Datum::Int8(v)])).unwrap()
    }

    #[test]
    fn test_integer_keys_sort_like_integers() {
        let values = [-5i64, -1, 0, 1, 100, i64::MIN, i64::MAX];
        let mut pairs: Vec<(Vec<u8>, i64)> = values.iter().map(|&v| (int_key(v), v)).collect();
        pairs.sort();
        let sorted: Vec<i64> = pairs.into_iter().map(|(_, v)| v).collect();
        let mut expected = values.to_vec();
        expected.sort_unstable();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_float_keys_sort_like_floats() {
        let idx = Index {
            name: "t_f".into(),
            key_cols: vec![0],
        };
        let values = [-2.5f32, -0.5, 0.0, 0.5, 3.25];
        let mut keys: Vec<(Vec<u8>, usize)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                (
                    idx.key_from_row(&Row::new(vec![Datum::Float4(v)])).unwrap(),
                    i,
                )
            })
            .collect();
        keys.sort();
        let order: Vec<usize> = keys.into_iter().map(|(_, i)| i).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_index_name_derivation() {
        let idx = Index::new("orders", &["customer", "day"], vec![1, 2]);
        assert_eq!(idx.name, "orders_customer_day");
    }

    #[test]
    fn test_composite_key_concatenates() {
        let idx = Index {
            name: "t_a_b".into(),
            key_cols: vec![0, 1],
        };
        let key = idx
            .key_from_row(&Row::new(vec![Datum::Int8(1), Datum::Text("x".into())]))
            .unwrap();
        assert_eq!(key.len(), 8 + 4 + 1);
    }
}
