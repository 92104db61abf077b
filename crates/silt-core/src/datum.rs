//! Typed values and their bytewise serialization.
//!
//! A [`Datum`] is the unit of data the engine moves around: every table
//! cell, every literal, every intermediate expression result. The value
//! codec here is the single source of truth for the on-disk row format and
//! the wire `'D'` payload format: one `is_null` byte, then a fixed-width
//! little-endian payload for numeric/bool/timestamp values or a 4-byte
//! length prefix plus raw bytes for text/bytea.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime};

use crate::error::{Error, Result};

/// Format accepted when casting text to a timestamp.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reads `n` bytes at `*off`, advancing the offset. `None` past the end.
pub(crate) fn take<'a>(buf: &'a [u8], off: &mut usize, n: usize) -> Option<&'a [u8]> {
    let bytes = buf.get(*off..*off + n)?;
    *off += n;
    Some(bytes)
}

/// The data types a datum can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatumType {
    /// 64-bit signed integer.
    Int8,
    /// 32-bit IEEE float.
    Float4,
    /// UTF-8 byte string.
    Text,
    /// Boolean.
    Bool,
    /// Opaque byte string.
    Bytea,
    /// Seconds since the Unix epoch.
    Timestamp,
    /// The null type; also the type of an untyped null value.
    Null,
}

impl DatumType {
    /// Returns the SQL name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Float4 => "float4",
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Bytea => "bytea",
            Self::Timestamp => "timestamp",
            Self::Null => "null",
        }
    }

    /// True for the arithmetic types.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int8 | Self::Float4)
    }

    /// True for types stored as a 64-bit signed integer.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int8)
    }

    /// Single-byte tag used in the catalog and the wire row description.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Int8 => 0,
            Self::Float4 => 1,
            Self::Text => 2,
            Self::Bool => 3,
            Self::Bytea => 4,
            Self::Timestamp => 5,
            Self::Null => 6,
        }
    }

    /// Inverse of [`DatumType::tag`].
    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::Int8,
            1 => Self::Float4,
            2 => Self::Text,
            3 => Self::Bool,
            4 => Self::Bytea,
            5 => Self::Timestamp,
            6 => Self::Null,
            other => return Err(Error::Storage(format!("unknown type tag {other}"))),
        })
    }
}

/// A tagged runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Int8(i64),
    Float4(f32),
    Text(String),
    Bool(bool),
    Bytea(Vec<u8>),
    Timestamp(i64),
    Null,
}

impl Datum {
    /// Returns the type of this value.
    #[must_use]
    pub const fn datum_type(&self) -> DatumType {
        match self {
            Self::Int8(_) => DatumType::Int8,
            Self::Float4(_) => DatumType::Float4,
            Self::Text(_) => DatumType::Text,
            Self::Bool(_) => DatumType::Bool,
            Self::Bytea(_) => DatumType::Bytea,
            Self::Timestamp(_) => DatumType::Timestamp,
            Self::Null => DatumType::Null,
        }
    }

    /// True if the value is the SQL null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Constructs a timestamp datum from its textual form.
    pub fn parse_timestamp(lexeme: &str) -> Result<Self> {
        let dt = NaiveDateTime::parse_from_str(lexeme, TIMESTAMP_FORMAT).map_err(|_| {
            Error::Constraint(format!(
                "'{lexeme}' is not a valid timestamp (expected YYYY-MM-DD HH:MM:SS)"
            ))
        })?;
        Ok(Self::Timestamp(dt.and_utc().timestamp()))
    }

    /// Widens to f32 for mixed-type arithmetic. Callers must have checked
    /// that the value is numeric.
    fn as_f32(&self) -> f32 {
        match self {
            Self::Int8(v) => *v as f32,
            Self::Float4(v) => *v,
            _ => 0.0,
        }
    }

    /// Appends the value serialization to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        if self.is_null() {
            buf.push(1);
            return;
        }
        buf.push(0);
        match self {
            Self::Int8(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::Float4(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::Bool(v) => buf.push(u8::from(*v)),
            Self::Timestamp(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Self::Text(s) => {
                buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Self::Bytea(b) => {
                buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
                buf.extend_from_slice(b);
            }
            Self::Null => unreachable!(),
        }
    }

    /// Returns the value serialization as an owned buffer.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    /// Reads a value of the expected type from `buf` at `*off`, advancing
    /// the offset past the consumed bytes. The stored value may be null
    /// regardless of the expected type.
    pub fn read_from(buf: &[u8], off: &mut usize, ty: DatumType) -> Result<Self> {
        let truncated = || Error::Storage("truncated datum".into());

        let is_null = take(buf, off, 1).ok_or_else(truncated)?[0];
        if is_null != 0 {
            return Ok(Self::Null);
        }

        Ok(match ty {
            DatumType::Int8 => Self::Int8(i64::from_le_bytes(
                take(buf, off, 8).ok_or_else(truncated)?.try_into().unwrap(),
            )),
            DatumType::Float4 => Self::Float4(f32::from_le_bytes(
                take(buf, off, 4).ok_or_else(truncated)?.try_into().unwrap(),
            )),
            DatumType::Bool => Self::Bool(take(buf, off, 1).ok_or_else(truncated)?[0] != 0),
            DatumType::Timestamp => Self::Timestamp(i64::from_le_bytes(
                take(buf, off, 8).ok_or_else(truncated)?.try_into().unwrap(),
            )),
            DatumType::Text => {
                let len = u32::from_le_bytes(
                    take(buf, off, 4).ok_or_else(truncated)?.try_into().unwrap(),
                ) as usize;
                let bytes = take(buf, off, len).ok_or_else(truncated)?;
                Self::Text(
                    String::from_utf8(bytes.to_vec())
                        .map_err(|_| Error::Storage("stored text is not UTF-8".into()))?,
                )
            }
            DatumType::Bytea => {
                let len = u32::from_le_bytes(
                    take(buf, off, 4).ok_or_else(truncated)?.try_into().unwrap(),
                ) as usize;
                Self::Bytea(take(buf, off, len).ok_or_else(truncated)?.to_vec())
            }
            DatumType::Null => Self::Null,
        })
    }

    /// The raw payload bytes of the value, without the codec framing.
    /// Used to hand column data to the inference adapter.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::Int8(v) | Self::Timestamp(v) => v.to_le_bytes().to_vec(),
            Self::Float4(v) => v.to_le_bytes().to_vec(),
            Self::Bool(v) => vec![u8::from(*v)],
            Self::Text(s) => s.as_bytes().to_vec(),
            Self::Bytea(b) => b.clone(),
            Self::Null => Vec::new(),
        }
    }

    /// Arithmetic. Two integers yield an integer; any float operand widens
    /// the computation to f32. Callers must have screened out nulls and
    /// non-numeric operands.
    pub fn arith(&self, op: ArithOp, other: &Self) -> Result<Self> {
        if let (Self::Int8(l), Self::Int8(r)) = (self, other) {
            return Ok(Self::Int8(match op {
                ArithOp::Add => l.wrapping_add(*r),
                ArithOp::Sub => l.wrapping_sub(*r),
                ArithOp::Mul => l.wrapping_mul(*r),
                ArithOp::Div => {
                    if *r == 0 {
                        return Err(Error::Constraint("division by zero".into()));
                    }
                    l.wrapping_div(*r)
                }
            }));
        }

        if !self.datum_type().is_numeric() || !other.datum_type().is_numeric() {
            return Err(Error::Constraint(format!(
                "cannot apply arithmetic to {} and {}",
                self.datum_type().name(),
                other.datum_type().name()
            )));
        }

        let (l, r) = (self.as_f32(), other.as_f32());
        Ok(Self::Float4(match op {
            ArithOp::Add => l + r,
            ArithOp::Sub => l - r,
            ArithOp::Mul => l * r,
            ArithOp::Div => l / r,
        }))
    }

    /// Three-way comparison between non-null values. Mixed numeric types
    /// coerce through f32; text and bytea compare bytewise.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        let incomparable = || {
            Error::Constraint(format!(
                "cannot compare {} with {}",
                self.datum_type().name(),
                other.datum_type().name()
            ))
        };
        match (self, other) {
            (Self::Int8(l), Self::Int8(r)) => Ok(l.cmp(r)),
            (Self::Timestamp(l), Self::Timestamp(r)) => Ok(l.cmp(r)),
            (Self::Bool(l), Self::Bool(r)) => Ok(l.cmp(r)),
            (Self::Text(l), Self::Text(r)) => Ok(l.as_bytes().cmp(r.as_bytes())),
            (Self::Bytea(l), Self::Bytea(r)) => Ok(l.cmp(r)),
            _ if self.datum_type().is_numeric() && other.datum_type().is_numeric() => Ok(self
                .as_f32()
                .partial_cmp(&other.as_f32())
                .unwrap_or(Ordering::Equal)),
            _ => Err(incomparable()),
        }
    }

    /// Total ordering used by ORDER BY: nulls sort before everything,
    /// incomparable values compare equal (the analyzer rejects such plans).
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    /// Whether a value of type `from` may be cast to `to`.
    #[must_use]
    pub fn can_cast(from: DatumType, to: DatumType) -> bool {
        use DatumType::{Bool, Bytea, Float4, Int8, Null, Text, Timestamp};
        matches!(
            (from, to),
            (Int8, Int8 | Float4 | Text | Bool)
                | (Float4, Int8 | Float4 | Text)
                | (Text, Text | Timestamp)
                | (Bool, Bool | Int8)
                | (Bytea, Bytea)
                | (Timestamp, Timestamp)
                | (Null, _)
        )
    }

    /// Casts the value to `to`. Null casts to null; any pair outside the
    /// cast table is a constraint error.
    pub fn cast(&self, to: DatumType) -> Result<Self> {
        if self.is_null() {
            return Ok(Self::Null);
        }
        let invalid = || {
            Error::Constraint(format!(
                "cannot cast {} to {}",
                self.datum_type().name(),
                to.name()
            ))
        };
        Ok(match (self, to) {
            (Self::Int8(v), DatumType::Int8) => Self::Int8(*v),
            (Self::Int8(v), DatumType::Float4) => Self::Float4(*v as f32),
            (Self::Int8(v), DatumType::Text) => Self::Text(v.to_string()),
            (Self::Int8(v), DatumType::Bool) => Self::Bool(*v != 0),
            (Self::Float4(v), DatumType::Int8) => Self::Int8(*v as i64),
            (Self::Float4(v), DatumType::Float4) => Self::Float4(*v),
            (Self::Float4(v), DatumType::Text) => Self::Text(v.to_string()),
            (Self::Text(s), DatumType::Text) => Self::Text(s.clone()),
            (Self::Text(s), DatumType::Timestamp) => Self::parse_timestamp(s)?,
            (Self::Bool(v), DatumType::Bool) => Self::Bool(*v),
            (Self::Bool(v), DatumType::Int8) => Self::Int8(i64::from(*v)),
            (Self::Bytea(b), DatumType::Bytea) => Self::Bytea(b.clone()),
            (Self::Timestamp(v), DatumType::Timestamp) => Self::Timestamp(*v),
            _ => return Err(invalid()),
        })
    }
}

/// The four arithmetic operations on datums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8(v) => write!(f, "{v}"),
            Self::Float4(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Bytea(b) => {
                write!(f, "\\x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Timestamp(v) => match DateTime::from_timestamp(*v, 0) {
                Some(dt) => write!(f, "{}", dt.format(TIMESTAMP_FORMAT)),
                None => write!(f, "{v}"),
            },
            Self::Null => write!(f, "null"),
        }
    }
}
