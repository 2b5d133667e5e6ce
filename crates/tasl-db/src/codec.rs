//! Streaming, chunk-respecting binary codec (spec.md §4.3).
//!
//! [`Decoder`] is pull-based: it wraps a `Stream` of byte chunks arriving
//! from wherever an `import` caller sources them, and exposes `readVarint`
//! /`skip`/`collect`/`flush` primitives that never assume a whole chunk,
//! let alone a whole element, is buffered at once. [`Encoder`] is the
//! mirror push side used by `export`: it accumulates writes into a
//! fixed-capacity buffer and reports completed chunks as they fill.

use crate::compile::Table;
use crate::shred;
use crate::{Error, Result};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use std::collections::VecDeque;
use tasl_schema::{Schema, Type};

/// The smallest chunk size `Encoder` accepts: large enough to hold one
/// maximally-shifted (10-byte) LEB128 varint without splitting it, since
/// tasl lifts the spec's host-safe-integer ceiling to a full `u64`
/// (SPEC_FULL.md, resolved Open Question).
pub const MIN_CHUNK_SIZE: usize = 10;

/// LEB128-unsigned-varint-encodes `value` onto the end of `out`.
pub fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decodes one LEB128 varint from `bytes` starting at `*pos`, advancing it.
pub fn read_varint_slice(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut shift = 0u32;
    let mut result = 0u64;
    loop {
        if shift >= 64 {
            return Err(Error::Decode("varint exceeds the maximum encodable width".into()));
        }
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| Error::Decode("unexpected end of buffer while reading a varint".into()))?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(result)
}

/// A pull-based decoder over a stream of arbitrarily-sized byte chunks.
///
/// Internally it keeps every chunk it has seen but not yet `flush`ed in a
/// deque, a `start` offset marking where the not-yet-flushed window begins
/// in the first chunk, and a scan cursor (`cursor_chunk`, `cursor_off`)
/// that `readVarint`/`skip` advance without copying bytes. `collect` is the
/// only place that allocates, and `flush` drops fully-scanned chunks.
pub struct Decoder<S> {
    stream: S,
    chunks: VecDeque<Bytes>,
    start: usize,
    cursor_chunk: usize,
    cursor_off: usize,
    scanned_len: usize,
}

impl<S> Decoder<S>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Decoder {
            stream,
            chunks: VecDeque::new(),
            start: 0,
            cursor_chunk: 0,
            cursor_off: 0,
            scanned_len: 0,
        }
    }

    async fn demand_chunk(&mut self) -> Result<()> {
        match self.stream.next().await {
            Some(Ok(bytes)) => {
                if bytes.is_empty() {
                    return Err(Error::Decode("received an empty chunk".into()));
                }
                self.chunks.push_back(bytes);
                Ok(())
            }
            Some(Err(e)) => Err(Error::Decode(format!("chunk stream error: {e}"))),
            None => Err(Error::Decode("unexpected end of chunk stream".into())),
        }
    }

    async fn next_byte(&mut self) -> Result<u8> {
        loop {
            if self.cursor_chunk >= self.chunks.len() {
                self.demand_chunk().await?;
                continue;
            }
            let off = if self.cursor_chunk == 0 { self.cursor_off.max(self.start) } else { self.cursor_off };
            let chunk_len = self.chunks[self.cursor_chunk].len();
            if off < chunk_len {
                let b = self.chunks[self.cursor_chunk][off];
                self.cursor_off = off + 1;
                self.scanned_len += 1;
                return Ok(b);
            }
            self.cursor_chunk += 1;
            self.cursor_off = 0;
        }
    }

    /// Reads one LEB128 varint without flushing the scanned bytes.
    pub async fn read_varint(&mut self) -> Result<u64> {
        let mut shift = 0u32;
        let mut result = 0u64;
        loop {
            if shift >= 64 {
                return Err(Error::Decode("varint exceeds the maximum encodable width".into()));
            }
            let byte = self.next_byte().await?;
            result |= ((byte & 0x7f) as u64) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok(result)
    }

    /// Advances the scan cursor past `n` bytes without copying them.
    pub async fn skip(&mut self, mut n: usize) -> Result<()> {
        while n > 0 {
            if self.cursor_chunk >= self.chunks.len() {
                self.demand_chunk().await?;
                continue;
            }
            let off = if self.cursor_chunk == 0 { self.cursor_off.max(self.start) } else { self.cursor_off };
            let chunk_len = self.chunks[self.cursor_chunk].len();
            let avail = chunk_len - off;
            let take = avail.min(n);
            self.cursor_off = off + take;
            self.scanned_len += take;
            n -= take;
            if self.cursor_off == chunk_len {
                self.cursor_chunk += 1;
                self.cursor_off = 0;
            }
        }
        Ok(())
    }

    /// Copies out everything scanned since the last `flush`.
    pub fn collect(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.scanned_len);
        if self.chunks.is_empty() {
            return out;
        }
        if self.cursor_chunk == 0 {
            out.extend_from_slice(&self.chunks[0][self.start..self.cursor_off]);
            return out;
        }
        out.extend_from_slice(&self.chunks[0][self.start..]);
        for chunk in self.chunks.iter().take(self.cursor_chunk).skip(1) {
            out.extend_from_slice(chunk);
        }
        if self.cursor_chunk < self.chunks.len() {
            out.extend_from_slice(&self.chunks[self.cursor_chunk][..self.cursor_off]);
        }
        out
    }

    /// Drops fully-scanned chunks and rebases the live window onto the
    /// scan cursor, ready for the next `readVarint`/`skip`/`collect` run.
    pub fn flush(&mut self) {
        for _ in 0..self.cursor_chunk {
            self.chunks.pop_front();
        }
        self.start = self.cursor_off;
        self.cursor_chunk = 0;
        self.scanned_len = 0;
    }

    /// Reads one varint and flushes immediately (used for length/count
    /// prefixes that aren't part of a larger element).
    pub async fn decode_varint(&mut self) -> Result<u64> {
        let v = self.read_varint().await?;
        self.flush();
        Ok(v)
    }

    fn walk_type<'a>(&'a mut self, ty: &'a Type) -> BoxFuture<'a, Result<()>> {
        async move {
            match ty {
                Type::Uri => {
                    let len = self.read_varint().await?;
                    self.skip(len as usize).await
                }
                Type::Literal(dt) => {
                    if let Some(width) = dt.fixed_width() {
                        self.skip(width).await
                    } else {
                        let len = self.read_varint().await?;
                        self.skip(len as usize).await
                    }
                }
                Type::Product(fields) => {
                    for (_key, child) in fields {
                        self.walk_type(child).await?;
                    }
                    Ok(())
                }
                Type::Coproduct(fields) => {
                    let idx = self.read_varint().await? as usize;
                    let (_key, child) = fields
                        .get_index(idx)
                        .ok_or_else(|| Error::Decode(format!("coproduct option index {idx} out of range")))?;
                    self.walk_type(child).await
                }
                Type::Reference(_) => {
                    self.read_varint().await?;
                    Ok(())
                }
            }
        }
        .boxed()
    }

    /// Scans one value of type `ty`, collects its raw bytes, and flushes.
    pub async fn decode_element(&mut self, ty: &Type) -> Result<Vec<u8>> {
        self.walk_type(ty).await?;
        let bytes = self.collect();
        self.flush();
        Ok(bytes)
    }

    /// `decode_element` followed by type-directed parsing into a `Row`.
    pub async fn decode_row(&mut self, table: &Table, ty: &Type) -> Result<shred::Row> {
        let bytes = self.decode_element(ty).await?;
        shred::bytes_to_row(table, ty, &bytes)
    }

    /// Asserts the underlying stream has nothing left to yield.
    pub async fn expect_exhausted(&mut self) -> Result<()> {
        if !self.chunks.is_empty() && self.start >= self.chunks[0].len() {
            self.chunks.pop_front();
            self.start = 0;
        }
        if !self.chunks.is_empty() {
            return Err(Error::Decode("stream was not closed when expected".into()));
        }
        match self.stream.next().await {
            None => Ok(()),
            Some(Ok(_)) => Err(Error::Decode("stream was not closed when expected".into())),
            Some(Err(e)) => Err(Error::Decode(format!("chunk stream error: {e}"))),
        }
    }
}

/// A push-based encoder that accumulates writes and reports completed
/// chunks of exactly `chunk_size` bytes (the final chunk may be shorter).
pub struct Encoder {
    buf: Vec<u8>,
    chunk_size: usize,
    closed: bool,
}

impl Encoder {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::Type(format!(
                "chunk_size must be at least {MIN_CHUNK_SIZE} bytes"
            )));
        }
        Ok(Encoder { buf: Vec::with_capacity(chunk_size), chunk_size, closed: false })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Decode("encoder is closed".into()));
        }
        Ok(())
    }

    /// Writes an arbitrary byte slice, possibly straddling several chunks:
    /// each time the buffer fills to capacity it's pushed onto `out`.
    pub fn write_bytes(&mut self, mut data: &[u8], out: &mut Vec<Bytes>) -> Result<()> {
        self.check_open()?;
        while !data.is_empty() {
            if self.buf.len() == self.chunk_size {
                out.push(Bytes::from(std::mem::replace(&mut self.buf, Vec::with_capacity(self.chunk_size))));
            }
            let space = self.chunk_size - self.buf.len();
            let take = space.min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
        }
        Ok(())
    }

    pub fn write_varint(&mut self, value: u64, out: &mut Vec<Bytes>) -> Result<()> {
        let mut tmp = Vec::with_capacity(10);
        push_varint(&mut tmp, value);
        self.write_bytes(&tmp, out)
    }

    /// Flushes any residual buffered bytes as a final (possibly short or
    /// empty) chunk and forbids further writes.
    pub fn close(&mut self, out: &mut Vec<Bytes>) -> Result<()> {
        self.check_open()?;
        self.closed = true;
        if !self.buf.is_empty() {
            out.push(Bytes::from(std::mem::take(&mut self.buf)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::stream;

    fn byte_stream(chunks: Vec<&'static [u8]>) -> impl Stream<Item = std::io::Result<Bytes>> + Unpin {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    #[tokio::test]
    async fn read_varint_splits_across_chunk_boundaries() {
        // 300 encodes as [0xAC, 0x02]; split the two bytes into separate chunks.
        let mut decoder = Decoder::new(byte_stream(vec![&[0xAC], &[0x02]]));
        assert_eq!(decoder.read_varint().await.unwrap(), 300);
    }

    #[tokio::test]
    async fn skip_and_collect_respect_chunk_boundaries() {
        let mut decoder = Decoder::new(byte_stream(vec![b"hel", b"lo!"]));
        decoder.skip(2).await.unwrap();
        let collected = decoder.collect();
        assert_eq!(collected, b"he");
        decoder.flush();
        decoder.skip(4).await.unwrap();
        assert_eq!(decoder.collect(), b"llo!");
    }

    #[tokio::test]
    async fn varint_wider_than_64_bits_is_a_decode_error() {
        // A full u64 varint never needs more than 10 continuation-marked
        // bytes; an 11th still-continuing byte pushes past the 64-bit
        // ceiling and must be rejected.
        let bytes: Vec<u8> = std::iter::repeat(0x80u8).take(10).collect();
        let mut decoder = Decoder::new(byte_stream(vec![Box::leak(bytes.into_boxed_slice())]));
        assert!(decoder.read_varint().await.is_err());
    }

    #[tokio::test]
    async fn a_full_width_u64_varint_decodes() {
        let mut bytes = Vec::new();
        push_varint(&mut bytes, u64::MAX);
        assert_eq!(bytes.len(), 10);
        let mut decoder = Decoder::new(byte_stream(vec![Box::leak(bytes.into_boxed_slice())]));
        assert_eq!(decoder.read_varint().await.unwrap(), u64::MAX);
    }

    #[test]
    fn encoder_emits_full_chunks_and_a_short_final_chunk() {
        let mut encoder = Encoder::new(MIN_CHUNK_SIZE).unwrap();
        let mut out = Vec::new();
        encoder.write_bytes(&[1; 25], &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), MIN_CHUNK_SIZE);
        assert_eq!(out[1].len(), MIN_CHUNK_SIZE);
        encoder.close(&mut out).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].len(), 5);
    }

    #[test]
    fn encoder_rejects_chunk_size_below_minimum() {
        assert!(Encoder::new(1).is_err());
    }

    #[test]
    fn encoder_rejects_writes_after_close() {
        let mut encoder = Encoder::new(MIN_CHUNK_SIZE).unwrap();
        let mut out = Vec::new();
        encoder.close(&mut out).unwrap();
        assert!(encoder.write_bytes(&[1], &mut out).is_err());
    }
}
