//! Length-prefixed wire protocol.
//!
//! Every message is `{u8 type, i32 length, payload}` where `length`
//! counts itself plus the payload, little-endian like the value codec.
//! The client sends `'Q'` query frames; the server answers with `'T'` row
//! description, `'D'` data rows, `'C'` command complete or `'E'` error,
//! and `'Z'` ready-for-query after every completed command sequence.

use std::io::{Read, Write};

use crate::catalog::Attribute;
use crate::datum::{take, Datum, DatumType};
use crate::error::{Error, Result};
use crate::row::Row;

pub const MSG_QUERY: u8 = b'Q';
pub const MSG_ROW_DESCRIPTION: u8 = b'T';
pub const MSG_DATA_ROW: u8 = b'D';
pub const MSG_COMMAND_COMPLETE: u8 = b'C';
pub const MSG_ERROR: u8 = b'E';
pub const MSG_READY: u8 = b'Z';

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub tag: u8,
    pub payload: Vec<u8>,
}

/// Writes one frame.
pub fn write_frame<W: Write>(writer: &mut W, tag: u8, payload: &[u8]) -> Result<()> {
    let mut buf = Vec::with_capacity(5 + payload.len());
    buf.push(tag);
    buf.extend_from_slice(&((payload.len() + 4) as i32).to_le_bytes());
    buf.extend_from_slice(payload);
    writer
        .write_all(&buf)
        .map_err(|e| Error::Protocol(format!("write failed: {e}")))
}

/// Reads one frame. `Ok(None)` is a clean disconnect at a frame boundary;
/// anything truncated mid-frame is a protocol error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Frame>> {
    let mut tag = [0u8; 1];
    match reader.read_exact(&mut tag) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::Protocol(format!("read failed: {e}"))),
    }

    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .map_err(|e| Error::Protocol(format!("truncated frame header: {e}")))?;
    let length = i32::from_le_bytes(len_bytes);
    if length < 4 {
        return Err(Error::Protocol(format!("bad frame length {length}")));
    }

    let mut payload = vec![0u8; (length - 4) as usize];
    reader
        .read_exact(&mut payload)
        .map_err(|e| Error::Protocol(format!("truncated frame payload: {e}")))?;

    Ok(Some(Frame {
        tag: tag[0],
        payload,
    }))
}

/// Encodes a `'T'` payload: column count, then per column a type tag and
/// a length-prefixed name.
#[must_use]
pub fn encode_row_description(attrs: &[Attribute]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(attrs.len() as i32).to_le_bytes());
    for attr in attrs {
        buf.push(attr.ty.tag());
        buf.extend_from_slice(&(attr.name.len() as i32).to_le_bytes());
        buf.extend_from_slice(attr.name.as_bytes());
    }
    buf
}

/// Decodes a `'T'` payload into `(type, name)` pairs.
pub fn decode_row_description(payload: &[u8]) -> Result<Vec<(DatumType, String)>> {
    let truncated = || Error::Protocol("truncated row description".into());
    let mut off = 0usize;

    let count = i32::from_le_bytes(
        take(payload, &mut off, 4)
            .ok_or_else(truncated)?
            .try_into()
            .unwrap(),
    );
    let mut columns = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let ty = DatumType::from_tag(take(payload, &mut off, 1).ok_or_else(truncated)?[0])
            .map_err(|_| Error::Protocol("unknown column type tag".into()))?;
        let name_len = i32::from_le_bytes(
            take(payload, &mut off, 4)
                .ok_or_else(truncated)?
                .try_into()
                .unwrap(),
        );
        let name = String::from_utf8(
            take(payload, &mut off, name_len.max(0) as usize)
                .ok_or_else(truncated)?
                .to_vec(),
        )
        .map_err(|_| truncated())?;
        columns.push((ty, name));
    }
    Ok(columns)
}

/// Encodes a `'D'` payload: the row's value serialization in description
/// order.
#[must_use]
pub fn encode_data_row(row: &Row) -> Vec<u8> {
    row.serialize()
}

/// Decodes a `'D'` payload against the preceding row description.
pub fn decode_data_row(payload: &[u8], columns: &[(DatumType, String)]) -> Result<Vec<Datum>> {
    let mut off = 0usize;
    let mut data = Vec::with_capacity(columns.len());
    for (ty, _) in columns {
        data.push(
            Datum::read_from(payload, &mut off, *ty)
                .map_err(|_| Error::Protocol("truncated data row".into()))?,
        );
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_round_trip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, MSG_QUERY, b"select 1;").unwrap();
        let frame = read_frame(&mut Cursor::new(buf)).unwrap().unwrap();
        assert_eq!(frame.tag, MSG_QUERY);
        assert_eq!(frame.payload, b"select 1;");
    }

    #[test]
    fn test_clean_disconnect_is_none() {
        assert_eq!(read_frame(&mut Cursor::new(Vec::new())).unwrap(), None);
    }

    #[test]
    fn test_truncated_frame_is_protocol_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, MSG_QUERY, b"select 1;").unwrap();
        buf.truncate(buf.len() - 3);
        assert!(matches!(
            read_frame(&mut Cursor::new(buf)),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_row_description_round_trip() {
        let attrs = vec![
            Attribute::new("t", "a", DatumType::Int8, true),
            Attribute::new("t", "b", DatumType::Text, false),
        ];
        let decoded = decode_row_description(&encode_row_description(&attrs)).unwrap();
        assert_eq!(
            decoded,
            vec![
                (DatumType::Int8, "a".to_string()),
                (DatumType::Text, "b".to_string())
            ]
        );
    }

    #[test]
    fn test_data_row_round_trip() {
        let columns = vec![
            (DatumType::Int8, "a".to_string()),
            (DatumType::Text, "b".to_string()),
        ];
        let row = Row::new(vec![Datum::Int8(5), Datum::Null]);
        let decoded = decode_data_row(&encode_data_row(&row), &columns).unwrap();
        assert_eq!(decoded, vec![Datum::Int8(5), Datum::Null]);
    }
}
