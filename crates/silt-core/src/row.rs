//! Rows and result sets.

use crate::catalog::Attribute;
use crate::datum::Datum;
use crate::error::Result;

/// An ordered list of datums matching a schema's attributes in position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub data: Vec<Datum>,
}

impl Row {
    /// Creates a row.
    #[must_use]
    pub fn new(data: Vec<Datum>) -> Self {
        Self { data }
    }

    /// A row of `n` nulls, the starting shape for INSERT.
    #[must_use]
    pub fn nulls(n: usize) -> Self {
        Self {
            data: vec![Datum::Null; n],
        }
    }

    /// Concatenated value serializations of the row's columns.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for d in &self.data {
            d.write_to(&mut buf);
        }
        buf
    }

    /// Reads a row shaped by `attrs` from `buf`.
    pub fn deserialize(attrs: &[Attribute], buf: &[u8]) -> Result<Self> {
        let mut off = 0;
        let mut data = Vec::with_capacity(attrs.len());
        for attr in attrs {
            data.push(Datum::read_from(buf, &mut off, attr.ty)?);
        }
        Ok(Self { data })
    }
}

/// A materialized query result: a row description plus the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub attrs: Vec<Attribute>,
    pub rows: Vec<Row>,
}

impl RowSet {
    /// Creates an empty set with the given description.
    #[must_use]
    pub fn new(attrs: Vec<Attribute>) -> Self {
        Self {
            attrs,
            rows: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::DatumType;

    #[test]
    fn test_row_round_trip() {
        let attrs = vec![
            Attribute::new("t", "_rowid", DatumType::Int8, true),
            Attribute::new("t", "name", DatumType::Text, false),
            Attribute::new("t", "score", DatumType::Float4, false),
        ];
        let row = Row::new(vec![
            Datum::Int8(7),
            Datum::Text("ada".into()),
            Datum::Null,
        ]);
        let back = Row::deserialize(&attrs, &row.serialize()).unwrap();
        assert_eq!(back, row);
    }
}
