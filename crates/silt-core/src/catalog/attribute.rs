//! Attributes and attribute sets: the column shapes of rows and scans.

use crate::datum::DatumType;
use crate::error::{Error, Result};

/// A named, typed column within a row shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The relation (table name or alias) the column belongs to. Empty for
    /// computed columns.
    pub rel: String,
    /// Column name.
    pub name: String,
    /// Declared type.
    pub ty: DatumType,
    /// Whether null values are rejected.
    pub not_null: bool,
}

impl Attribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(rel: impl Into<String>, name: impl Into<String>, ty: DatumType, not_null: bool) -> Self {
        Self {
            rel: rel.into(),
            name: name.into(),
            ty,
            not_null,
        }
    }

    /// An anonymous computed-column attribute (expression results).
    #[must_use]
    pub fn computed(name: impl Into<String>, ty: DatumType) -> Self {
        Self::new("", name, ty, false)
    }
}

/// An ordered list of attributes describing the columns a scan produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    attrs: Vec<Attribute>,
}

impl AttributeSet {
    /// Creates a set from a list of attributes.
    #[must_use]
    pub fn new(attrs: Vec<Attribute>) -> Self {
        Self { attrs }
    }

    /// Composes two sets by concatenation (left then right). Rejects
    /// overlapping relation references within the same scope.
    pub fn concat(left: &Self, right: &Self) -> Result<Self> {
        for attr in &right.attrs {
            if !attr.rel.is_empty() && left.attrs.iter().any(|a| a.rel == attr.rel) {
                return Err(Error::Analysis(format!(
                    "two scans cannot share the relation name '{}'; use an alias to rename one",
                    attr.rel
                )));
            }
        }
        let mut attrs = left.attrs.clone();
        attrs.extend(right.attrs.iter().cloned());
        Ok(Self { attrs })
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// True when the set has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// The attributes in order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Resolves an unqualified column name to its relation by scanning for
    /// a unique match. `Ok(None)` means the name is absent from this set;
    /// a name matching columns in more than one relation is an error.
    pub fn resolve_relation(&self, column: &str) -> Result<Option<String>> {
        let mut rels: Vec<&str> = Vec::new();
        for attr in &self.attrs {
            if attr.name == column && !rels.contains(&attr.rel.as_str()) {
                rels.push(&attr.rel);
            }
        }
        match rels.as_slice() {
            [] => Ok(None),
            [rel] => Ok(Some((*rel).to_string())),
            _ => Err(Error::Analysis(format!(
                "column '{column}' is ambiguous across multiple tables"
            ))),
        }
    }

    /// The position and attribute of a qualified `(relation, column)` pair.
    #[must_use]
    pub fn position(&self, rel: &str, column: &str) -> Option<(usize, &Attribute)> {
        self.attrs
            .iter()
            .enumerate()
            .find(|(_, a)| a.rel == rel && a.name == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttributeSet {
        AttributeSet::new(vec![
            Attribute::new("t", "a", DatumType::Int8, true),
            Attribute::new("t", "b", DatumType::Text, false),
            Attribute::new("u", "b", DatumType::Text, false),
        ])
    }

    #[test]
    fn test_resolve_unqualified() {
        let s = sample();
        assert_eq!(s.resolve_relation("a").unwrap(), Some("t".into()));
        assert!(s.resolve_relation("b").is_err()); // ambiguous
        assert_eq!(s.resolve_relation("missing").unwrap(), None);
    }

    #[test]
    fn test_position() {
        let s = sample();
        assert_eq!(s.position("u", "b").unwrap().0, 2);
        assert!(s.position("t", "c").is_none());
    }

    #[test]
    fn test_concat_rejects_duplicate_relations() {
        let s = sample();
        let other = AttributeSet::new(vec![Attribute::new("t", "c", DatumType::Bool, false)]);
        assert!(AttributeSet::concat(&s, &other).is_err());

        let ok = AttributeSet::new(vec![Attribute::new("v", "c", DatumType::Bool, false)]);
        let merged = AttributeSet::concat(&s, &ok).unwrap();
        assert_eq!(merged.len(), 4);
    }
}
