//! Streaming row pipeline (component S): turns an HTTP response body into
//! rows, either all at once ([`decode_buffered`]) or incrementally as chunks
//! arrive ([`RowStream`]).
//!
//! Both paths share the same header/row parsers so that a buffered fetch and
//! a streamed fetch of the same response produce identical rows.
use bytes::{Buf, Bytes, BytesMut};
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use crate::{
    Error,
    common::ByteStr,
    decode::decode_value,
    error::ErrorKind,
    row::{ColumnSchema, LazyRow, Row, RowView, Schema},
};

/// Read a VarUInt out of `data` without consuming it, returning `None` if
/// `data` does not yet hold a complete one.
fn peek_varuint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate().take(10) {
        value |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Try to parse the `RowBinaryWithNamesAndTypes` header (column count, then
/// that many length-prefixed names, then that many length-prefixed type
/// expressions) out of `data`.
///
/// Returns `Ok(None)` when `data` does not yet hold a complete header.
fn try_parse_header(data: &[u8]) -> Result<Option<(Schema, usize)>, Error> {
    let mut pos = 0;

    let Some((count, n)) = peek_varuint(&data[pos..]) else { return Ok(None) };
    pos += n;
    let count = count as usize;

    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        let Some((len, n)) = peek_varuint(&data[pos..]) else { return Ok(None) };
        pos += n;
        let len = len as usize;
        if data.len() < pos + len {
            return Ok(None);
        }
        names.push(std::str::from_utf8(&data[pos..pos + len])?.to_string());
        pos += len;
    }

    let mut types = Vec::with_capacity(count);
    for _ in 0..count {
        let Some((len, n)) = peek_varuint(&data[pos..]) else { return Ok(None) };
        pos += n;
        let len = len as usize;
        if data.len() < pos + len {
            return Ok(None);
        }
        types.push(std::str::from_utf8(&data[pos..pos + len])?.to_string());
        pos += len;
    }

    let columns = names
        .into_iter()
        .zip(types)
        .map(|(name, ty)| {
            Ok(ColumnSchema { name: ByteStr::copy_from_str(&name), ty: crate::types::parse(&ty)? })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(Some((Schema::new(columns), pos)))
}

/// Try to decode one full row out of `data` against `schema`.
///
/// Returns `Ok(None)` when `data` does not yet hold every column of a
/// complete row; `data` is left untouched in that case since decoding runs
/// against a borrowed slice, never the caller's buffer directly.
fn try_parse_row(data: &[u8], schema: &Schema) -> Result<Option<(Row, usize)>, Error> {
    let mut cursor = data;
    let start_len = cursor.len();
    let mut values = Vec::with_capacity(schema.len());
    for col in schema.columns() {
        match decode_value(&mut cursor, &col.ty) {
            Ok(v) => values.push(v),
            Err(e) if matches!(e.kind(), ErrorKind::UnexpectedEof) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
    let consumed = start_len - cursor.len();
    Ok(Some((Row::new(schema.clone(), values), consumed)))
}

/// Decode an entire `RowBinaryWithNamesAndTypes` body already held in
/// memory.
pub(crate) fn decode_buffered(mut data: Bytes) -> Result<(Schema, Vec<Row>), Error> {
    let (schema, consumed) = try_parse_header(&data).and_then(|h| h.ok_or_else(Error::unexpected_eof))?;
    data.advance(consumed);

    let mut rows = Vec::new();
    while data.has_remaining() {
        let (row, consumed) = try_parse_row(&data, &schema)?.ok_or_else(Error::unexpected_eof)?;
        data.advance(consumed);
        rows.push(row);
    }
    Ok((schema, rows))
}

/// Same as [`decode_buffered`], but each row retains its raw bytes and
/// decodes fields on first access rather than up front. The row boundary
/// still has to be found by decoding once, matching [`LazyRow::offset_of`]'s
/// own decode-and-discard approach to measuring column width.
pub(crate) fn decode_buffered_lazy(mut data: Bytes) -> Result<(Schema, Vec<LazyRow>), Error> {
    let (schema, consumed) = try_parse_header(&data).and_then(|h| h.ok_or_else(Error::unexpected_eof))?;
    data.advance(consumed);

    let mut rows = Vec::new();
    while data.has_remaining() {
        let (_, consumed) = try_parse_row(&data, &schema)?.ok_or_else(Error::unexpected_eof)?;
        rows.push(LazyRow::new(schema.clone(), data.split_to(consumed)));
    }
    Ok((schema, rows))
}

/// Decode a full response body, picking the eager or lazy row
/// representation per `lazy`.
pub(crate) fn decode_buffered_rows(data: Bytes, lazy: bool) -> Result<(Schema, Vec<RowView>), Error> {
    match lazy {
        true => {
            let (schema, rows) = decode_buffered_lazy(data)?;
            Ok((schema, rows.into_iter().map(RowView::Lazy).collect()))
        }
        false => {
            let (schema, rows) = decode_buffered(data)?;
            Ok((schema, rows.into_iter().map(RowView::Eager).collect()))
        }
    }
}

type BodyStream = futures_util::stream::BoxStream<'static, Result<Bytes, reqwest::Error>>;

enum Phase {
    Header,
    Rows(Schema),
    Done,
}

/// A `RowBinaryWithNamesAndTypes` response decoded incrementally as HTTP
/// chunks arrive, rather than buffered up front.
///
/// Yields [`RowView::Eager`] rows by default, or [`RowView::Lazy`] rows when
/// constructed with `lazy: true` — see
/// [`Config::lazy_decode`][crate::config::Config::lazy_decode].
#[must_use = "streams do nothing unless polled"]
pub struct RowStream {
    body: BodyStream,
    buf: BytesMut,
    phase: Phase,
    exhausted: bool,
    lazy: bool,
}

impl RowStream {
    pub(crate) fn new(body: BodyStream, lazy: bool) -> Self {
        Self { body, buf: BytesMut::new(), phase: Phase::Header, exhausted: false, lazy }
    }

    /// The result set's column schema, once the header has been parsed.
    pub fn schema(&self) -> Option<&Schema> {
        match &self.phase {
            Phase::Rows(schema) => Some(schema),
            _ => None,
        }
    }
}

impl Stream for RowStream {
    type Item = Result<RowView, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();

        loop {
            match &me.phase {
                Phase::Header => match try_parse_header(&me.buf) {
                    Ok(Some((schema, consumed))) => {
                        me.buf.advance(consumed);
                        me.phase = Phase::Rows(schema);
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        me.phase = Phase::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                Phase::Rows(schema) => {
                    let schema = schema.clone();
                    match try_parse_row(&me.buf, &schema) {
                        Ok(Some((row, consumed))) => {
                            let view = match me.lazy {
                                true => RowView::Lazy(LazyRow::new(schema, me.buf.split_to(consumed).freeze())),
                                false => {
                                    me.buf.advance(consumed);
                                    RowView::Eager(row)
                                }
                            };
                            return Poll::Ready(Some(Ok(view)));
                        }
                        Ok(None) if me.exhausted => {
                            me.phase = Phase::Done;
                            if me.buf.is_empty() {
                                return Poll::Ready(None);
                            }
                            return Poll::Ready(Some(Err(Error::trailing_garbage(me.buf.len()))));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            me.phase = Phase::Done;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
                Phase::Done => return Poll::Ready(None),
            }

            if me.exhausted {
                me.phase = Phase::Done;
                return Poll::Ready(Some(Err(Error::unexpected_eof())));
            }

            match ready!(me.body.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => me.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    me.phase = Phase::Done;
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => me.exhausted = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample_body() -> Bytes {
        let mut buf = BytesMut::new();
        crate::varint::write_varuint(&mut buf, 2);
        for name in ["id", "name"] {
            crate::varint::write_varuint(&mut buf, name.len() as u64);
            buf.extend_from_slice(name.as_bytes());
        }
        for ty in ["UInt32", "String"] {
            crate::varint::write_varuint(&mut buf, ty.len() as u64);
            buf.extend_from_slice(ty.as_bytes());
        }
        // two rows
        for (id, name) in [(1u32, "a"), (2, "bb")] {
            buf.extend_from_slice(&id.to_le_bytes());
            crate::varint::write_varuint(&mut buf, name.len() as u64);
            buf.extend_from_slice(name.as_bytes());
        }
        buf.freeze()
    }

    #[test]
    fn buffered_decodes_all_rows() {
        let (schema, rows) = decode_buffered(sample_body()).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].schema().columns()[0].name.as_str(), "id");
    }

    #[test]
    fn buffered_rejects_truncated_body() {
        let mut body = sample_body();
        body.truncate(body.len() - 1);
        let err = decode_buffered(body).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn streaming_matches_buffered_chunked_byte_by_byte() {
        use futures_util::StreamExt;

        let body = sample_body();
        let (_, rows) = decode_buffered(body.clone()).unwrap();

        let chunks: Vec<Result<Bytes, reqwest::Error>> =
            body.iter().map(|&b| Ok(Bytes::copy_from_slice(&[b]))).collect();
        let boxed: BodyStream = Box::pin(futures_util::stream::iter(chunks));
        let mut stream = RowStream::new(boxed, false);

        let mut streamed = Vec::new();
        while let Some(row) = stream.next().await {
            streamed.push(row.unwrap());
        }

        assert_eq!(streamed.len(), rows.len());
        for (mut a, b) in streamed.into_iter().zip(rows) {
            let av: u32 = a.try_get(0usize).unwrap();
            let bv: u32 = b.try_get(0usize).unwrap();
            assert_eq!(av, bv);
        }
    }

    #[test]
    fn lazy_rows_match_eager_rows() {
        let (_, eager) = decode_buffered(sample_body()).unwrap();
        let (_, lazy) = decode_buffered_lazy(sample_body()).unwrap();

        assert_eq!(eager.len(), lazy.len());
        for (row, mut lazy_row) in eager.into_iter().zip(lazy) {
            let id: u32 = row.try_get(0usize).unwrap();
            let name: String = row.try_get(1usize).unwrap();
            assert_eq!(lazy_row.get(0).unwrap(), &Value::UInt32(id));
            assert_eq!(lazy_row.get(1).unwrap(), &Value::String(name));
        }
    }
}
