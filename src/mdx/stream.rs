//! MDX primitive codec and chunk header protocol.
//!
//! [`MdxReader`] and [`MdxWriter`] wrap a seekable stream and track the
//! cursor themselves, so every read can be bounds-checked before it happens
//! and every size field can be backpatched once its payload is written.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, warn};

use super::format::DEFAULT_VERSION;
use crate::util::{Error, Extent, Result, Tag};

// ============================================================================
// Fixed-width primitives
// ============================================================================

/// A fixed-width little-endian value.
pub trait Primitive: Copy + Sized {
    /// Serialized width in bytes.
    const SIZE: u64;
    /// Name used in truncation diagnostics.
    const NAME: &'static str;

    fn read_le<R: Read>(r: &mut R) -> io::Result<Self>;
    fn write_le<W: Write>(self, w: &mut W) -> io::Result<()>;
}

macro_rules! primitive {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl Primitive for $ty {
            const SIZE: u64 = $size;
            const NAME: &'static str = stringify!($ty);

            #[inline]
            fn read_le<R: Read>(r: &mut R) -> io::Result<Self> {
                r.$read::<LittleEndian>()
            }

            #[inline]
            fn write_le<W: Write>(self, w: &mut W) -> io::Result<()> {
                w.$write::<LittleEndian>(self)
            }
        }
    };
}

primitive!(u16, 2, read_u16, write_u16);
primitive!(u32, 4, read_u32, write_u32);
primitive!(i32, 4, read_i32, write_i32);
primitive!(f32, 4, read_f32, write_f32);

impl Primitive for u8 {
    const SIZE: u64 = 1;
    const NAME: &'static str = "u8";

    #[inline]
    fn read_le<R: Read>(r: &mut R) -> io::Result<Self> {
        r.read_u8()
    }

    #[inline]
    fn write_le<W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_u8(self)
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Bounds-checked little-endian reader over a seekable byte source.
pub struct MdxReader<R> {
    inner: R,
    pos: u64,
    len: u64,
    version: u32,
    /// End of the size-delimited group member being read, if any.
    member_end: Option<u64>,
}

impl<R: Read + Seek> MdxReader<R> {
    /// Wrap a stream positioned at the start of the data.
    pub fn new(mut inner: R) -> Result<Self> {
        let pos = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(pos))?;
        Ok(Self { inner, pos, len, version: DEFAULT_VERSION, member_end: None })
    }

    /// Current cursor position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Total stream length.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when the stream holds no bytes at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes left before end-of-stream.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Offset a record may not read past: the end of the enclosing group's
    /// budget, or the end of the stream outside any group.
    #[inline]
    pub fn member_end(&self) -> u64 {
        self.member_end.map_or(self.len, |end| end.min(self.len))
    }

    /// Bound the next record to `end`, returning the previous bound for
    /// [`restore_member_end`](Self::restore_member_end).
    pub fn limit_member(&mut self, end: u64) -> Option<u64> {
        self.member_end.replace(end)
    }

    pub fn restore_member_end(&mut self, previous: Option<u64>) {
        self.member_end = previous;
    }

    /// Format version gating optional fields.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Set the format version once `VERS` has been read.
    #[inline]
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Give back the wrapped stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Move the cursor to an absolute position.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len {
            return Err(Error::TruncatedInput { offset: self.len, context: "seek" });
        }
        self.inner.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.ensure(n, "skipped bytes")?;
        self.seek(self.pos + n)
    }

    /// Fail with `TruncatedInput` unless `n` more bytes are available.
    #[inline]
    pub fn ensure(&self, n: u64, context: &'static str) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::TruncatedInput { offset: self.pos, context });
        }
        Ok(())
    }

    fn map_io(&self, e: io::Error, context: &'static str) -> Error {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedInput { offset: self.pos, context }
        } else {
            Error::Io(e)
        }
    }

    /// Read one fixed-width value.
    pub fn read_fixed<T: Primitive>(&mut self) -> Result<T> {
        self.ensure(T::SIZE, T::NAME)?;
        let v = T::read_le(&mut self.inner).map_err(|e| self.map_io(e, T::NAME))?;
        self.pos += T::SIZE;
        Ok(v)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_fixed()
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_fixed()
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_fixed()
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_fixed()
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_fixed()
    }

    /// Read an id where `-1` means "none".
    pub fn read_optional_id(&mut self) -> Result<Option<u32>> {
        let v = self.read_i32()?;
        Ok(if v < 0 { None } else { Some(v as u32) })
    }

    /// Read `N` consecutive fixed-width values.
    pub fn read_array<T: Primitive + Default, const N: usize>(&mut self) -> Result<[T; N]> {
        self.ensure(T::SIZE * N as u64, T::NAME)?;
        let mut out = [T::default(); N];
        for slot in out.iter_mut() {
            *slot = self.read_fixed()?;
        }
        Ok(out)
    }

    /// Read an N-dimensional float vector.
    #[inline]
    pub fn read_vector<const N: usize>(&mut self) -> Result<[f32; N]> {
        self.read_array::<f32, N>()
    }

    /// Read exactly `len` raw bytes.
    pub fn read_buffer(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure(len as u64, "byte buffer")?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| self.map_io(e, "byte buffer"))?;
        self.pos += len as u64;
        Ok(buf)
    }

    /// Read a zero-padded fixed-size name buffer.
    ///
    /// The text ends at the first NUL or at the buffer end. Bytes that are
    /// not valid UTF-8 are decoded as Latin-1.
    pub fn read_name(&mut self, len: usize) -> Result<String> {
        let buf = self.read_buffer(len)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let bytes = &buf[..end];
        Ok(match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        })
    }

    /// Read a bounding volume.
    pub fn read_extent(&mut self) -> Result<Extent> {
        self.ensure(Extent::SIZE, "extent")?;
        let bounds_radius = self.read_f32()?;
        let min = self.read_vector()?;
        let max = self.read_vector()?;
        Ok(Extent { bounds_radius, min, max })
    }

    // ------------------------------------------------------------------------
    // Chunk header protocol
    // ------------------------------------------------------------------------

    /// Read a 4-byte tag.
    pub fn read_tag(&mut self) -> Result<Tag> {
        self.ensure(4, "chunk tag")?;
        let mut b = [0u8; 4];
        self.inner.read_exact(&mut b).map_err(|e| self.map_io(e, "chunk tag"))?;
        self.pos += 4;
        Ok(Tag(b))
    }

    /// Look at the next tag without consuming it. `None` near end-of-stream.
    pub fn peek_tag(&mut self) -> Result<Option<Tag>> {
        if self.remaining() < 4 {
            return Ok(None);
        }
        let start = self.pos;
        let tag = self.read_tag()?;
        self.seek(start)?;
        Ok(Some(tag))
    }

    /// Read a mandatory tag, failing with `UnexpectedTag` on mismatch.
    pub fn expect_tag(&mut self, expected: Tag) -> Result<()> {
        let offset = self.pos;
        let found = self.read_tag()?;
        if found != expected {
            return Err(Error::UnexpectedTag { expected, found, offset });
        }
        Ok(())
    }

    /// Consume `tag` if it is next and lies before `end`.
    ///
    /// On mismatch the stream is rewound and `false` is returned.
    pub fn probe_tag(&mut self, tag: Tag, end: u64) -> Result<bool> {
        if self.pos + 4 > end.min(self.len) {
            return Ok(false);
        }
        match self.peek_tag()? {
            Some(found) if found == tag => {
                self.skip(4)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Read an optional tagged sub-chunk, yielding `default` when absent.
    ///
    /// This is the single probe-then-rewind combinator; `read` runs with the
    /// tag already consumed.
    pub fn read_optional_chunk<T>(
        &mut self,
        tag: Tag,
        end: u64,
        default: T,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.probe_tag(tag, end)? {
            read(self)
        } else {
            Ok(default)
        }
    }

    /// Read a top-level chunk header: tag plus exclusive byte count.
    pub fn read_sized_header(&mut self) -> Result<(Tag, u32)> {
        let tag = self.read_tag()?;
        let size = self.read_u32()?;
        Ok((tag, size))
    }

    /// Consume whatever declared bytes of a record were left unparsed.
    ///
    /// Unknown trailing fields inside a known record are skipped rather than
    /// treated as corruption; overrunning the declaration is a hard error.
    pub fn skip_to_declared_end(&mut self, tag: Tag, start: u64, declared: u64) -> Result<()> {
        let consumed = self.pos - start;
        if consumed > declared {
            return Err(Error::SizeMismatch { tag, declared, consumed });
        }
        if consumed < declared {
            let extra = declared - consumed;
            warn!(%tag, offset = self.pos, extra, "skipping unparsed trailing bytes");
            self.skip(extra)?;
        }
        Ok(())
    }

    /// Read an inclusive byte count and return `(start, declared)` for a
    /// later [`skip_to_declared_end`](Self::skip_to_declared_end).
    pub fn read_inclusive_size(&mut self, tag: Tag) -> Result<(u64, u64)> {
        let start = self.pos;
        let declared = self.read_u32()? as u64;
        if declared < 4 {
            return Err(Error::SizeMismatch { tag, declared, consumed: 4 });
        }
        Ok((start, declared))
    }

    /// Scan forward one byte at a time until `accept` matches a tag.
    ///
    /// Returns `false` when end-of-stream (or `limit` bytes) is reached first,
    /// leaving the cursor at the stop position.
    pub fn resync(&mut self, limit: Option<u64>, accept: impl Fn(Tag) -> bool) -> Result<bool> {
        let origin = self.pos;
        loop {
            if let Some(limit) = limit {
                if self.pos - origin > limit {
                    return Ok(false);
                }
            }
            match self.peek_tag()? {
                Some(tag) if accept(tag) => {
                    debug!(%tag, from = origin, to = self.pos, "resynchronized");
                    return Ok(true);
                }
                Some(_) => self.skip(1)?,
                None => {
                    let end = self.len;
                    self.seek(end)?;
                    return Ok(false);
                }
            }
        }
    }
}

// ============================================================================
// Writer
// ============================================================================

/// How a backpatched size field relates to its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeKind {
    /// Counts only the bytes after the field (top-level chunks).
    Exclusive,
    /// Counts the field itself plus the payload (records).
    Inclusive,
}

/// Placeholder left by [`MdxWriter::reserve_size`].
#[derive(Clone, Copy, Debug)]
#[must_use = "a reserved size must be patched"]
pub struct SizeMark {
    field_pos: u64,
    kind: SizeKind,
}

/// Little-endian writer with reserve/backpatch support.
pub struct MdxWriter<W> {
    inner: W,
    pos: u64,
    version: u32,
}

impl<W: Write + Seek> MdxWriter<W> {
    /// Wrap a stream positioned where the data should start.
    pub fn new(mut inner: W, version: u32) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self { inner, pos, version })
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Format version gating optional fields.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Give back the wrapped stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write one fixed-width value.
    pub fn write_fixed<T: Primitive>(&mut self, value: T) -> Result<()> {
        value.write_le(&mut self.inner)?;
        self.pos += T::SIZE;
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_fixed(value)
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_fixed(value)
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_fixed(value)
    }

    #[inline]
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_fixed(value)
    }

    #[inline]
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_fixed(value)
    }

    /// Write an id where `None` is stored as `-1`.
    pub fn write_optional_id(&mut self, id: Option<u32>) -> Result<()> {
        self.write_i32(id.map_or(-1, |v| v as i32))
    }

    /// Write consecutive fixed-width values.
    pub fn write_array<T: Primitive>(&mut self, values: &[T]) -> Result<()> {
        for &v in values {
            self.write_fixed(v)?;
        }
        Ok(())
    }

    /// Write an N-dimensional float vector.
    #[inline]
    pub fn write_vector<const N: usize>(&mut self, v: &[f32; N]) -> Result<()> {
        self.write_array(v)
    }

    /// Write raw bytes.
    pub fn write_buffer(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write `s` into a zero-padded buffer of `len` bytes, truncating at a
    /// character boundary when it does not fit.
    pub fn write_name(&mut self, s: &str, len: usize) -> Result<()> {
        let mut end = s.len().min(len);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        if end < s.len() {
            warn!(name = s, len, "name truncated to fixed buffer");
        }
        let mut buf = vec![0u8; len];
        buf[..end].copy_from_slice(&s.as_bytes()[..end]);
        self.write_buffer(&buf)
    }

    /// Write a bounding volume.
    pub fn write_extent(&mut self, e: &Extent) -> Result<()> {
        self.write_f32(e.bounds_radius)?;
        self.write_vector(&e.min)?;
        self.write_vector(&e.max)
    }

    /// Write a 4-byte tag.
    #[inline]
    pub fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.write_buffer(&tag.0)
    }

    /// Write a top-level chunk header with a known size.
    pub fn write_sized_header(&mut self, tag: Tag, size: u32) -> Result<()> {
        self.write_tag(tag)?;
        self.write_u32(size)
    }

    // ------------------------------------------------------------------------
    // Backpatching
    // ------------------------------------------------------------------------

    /// Write a placeholder size field.
    pub fn reserve_size(&mut self, kind: SizeKind) -> Result<SizeMark> {
        let mark = SizeMark { field_pos: self.pos, kind };
        self.write_u32(0)?;
        Ok(mark)
    }

    /// Fill in a reserved size field now that the payload is written, then
    /// return to the end of the payload.
    pub fn patch_size(&mut self, mark: SizeMark) -> Result<u32> {
        let end = self.pos;
        let size = match mark.kind {
            SizeKind::Exclusive => end - mark.field_pos - 4,
            SizeKind::Inclusive => end - mark.field_pos,
        };
        let size = u32::try_from(size)
            .map_err(|_| Error::invalid("chunk size", size as i64))?;
        self.inner.seek(SeekFrom::Start(mark.field_pos))?;
        self.inner.write_u32::<LittleEndian>(size)?;
        self.inner.seek(SeekFrom::Start(end))?;
        Ok(size)
    }

    /// Reserve a size field, write the payload, backpatch the size.
    pub fn sized(
        &mut self,
        kind: SizeKind,
        payload: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<u32> {
        let mark = self.reserve_size(kind)?;
        payload(self)?;
        self.patch_size(mark)
    }

    /// Write a tagged top-level chunk with a backpatched exclusive size.
    pub fn chunk(&mut self, tag: Tag, payload: impl FnOnce(&mut Self) -> Result<()>) -> Result<u32> {
        self.write_tag(tag)?;
        let size = self.sized(SizeKind::Exclusive, payload)?;
        debug!(%tag, size, "wrote chunk");
        Ok(size)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bytes: Vec<u8>) -> MdxReader<Cursor<Vec<u8>>> {
        MdxReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_primitives_little_endian() {
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        w.write_u32(0x0403_0201).unwrap();
        w.write_f32(1.5).unwrap();
        w.write_u16(0xBEEF).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);

        let mut r = reader(bytes);
        assert_eq!(r.read_u32().unwrap(), 0x0403_0201);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_u16().unwrap(), 0xBEEF);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let mut r = reader(vec![1, 2, 3, 4, 5, 6]);
        r.read_u32().unwrap();
        match r.read_u32() {
            Err(Error::TruncatedInput { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("expected truncation, got {:?}", other),
        }
        // Nothing was consumed by the failed read.
        assert_eq!(r.pos(), 4);
    }

    #[test]
    fn test_name_buffer() {
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        w.write_name("root", 80).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(bytes.len(), 80);
        assert!(bytes[4..].iter().all(|&b| b == 0));

        let mut r = reader(bytes);
        assert_eq!(r.read_name(80).unwrap(), "root");
    }

    #[test]
    fn test_name_without_terminator() {
        let mut r = reader(b"ABCD".to_vec());
        assert_eq!(r.read_name(4).unwrap(), "ABCD");
    }

    #[test]
    fn test_name_truncated_on_char_boundary() {
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        w.write_name("aé", 2).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(bytes, vec![b'a', 0]);
    }

    #[test]
    fn test_expect_and_probe_tag() {
        let mut r = reader(b"VERSxxxx".to_vec());
        assert!(!r.probe_tag(Tag::new(b"MODL"), 8).unwrap());
        assert_eq!(r.pos(), 0);
        assert!(r.probe_tag(Tag::new(b"VERS"), 8).unwrap());
        assert_eq!(r.pos(), 4);
        match r.expect_tag(Tag::new(b"MODL")) {
            Err(Error::UnexpectedTag { found, offset, .. }) => {
                assert_eq!(found, Tag::new(b"xxxx"));
                assert_eq!(offset, 4);
            }
            other => panic!("expected tag mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_probe_respects_end() {
        let mut r = reader(b"KGTR".to_vec());
        assert!(!r.probe_tag(Tag::new(b"KGTR"), 2).unwrap());
        assert_eq!(r.pos(), 0);
    }

    #[test]
    fn test_optional_chunk_default() {
        let mut r = reader(b"KMTA\x07\x00\x00\x00".to_vec());
        let v = r.read_optional_chunk(Tag::new(b"KMTF"), 8, 42u32, |r| r.read_u32()).unwrap();
        assert_eq!(v, 42);
        let v = r.read_optional_chunk(Tag::new(b"KMTA"), 8, 42u32, |r| r.read_u32()).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn test_backpatch_exclusive_and_inclusive() {
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        let size = w
            .chunk(Tag::new(b"TEST"), |w| {
                w.write_u32(1)?;
                w.sized(SizeKind::Inclusive, |w| w.write_u16(2)).map(|_| ())
            })
            .unwrap();
        assert_eq!(size, 4 + 6);
        let bytes = w.into_inner().into_inner();
        assert_eq!(&bytes[..4], b"TEST");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 10);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 6);
        assert_eq!(bytes.len(), 18);
    }

    #[test]
    fn test_skip_to_declared_end() {
        let mut r = reader(vec![0u8; 16]);
        r.read_u32().unwrap();
        r.skip_to_declared_end(Tag::new(b"TEST"), 0, 12).unwrap();
        assert_eq!(r.pos(), 12);
        r.read_u32().unwrap();
        let err = r.skip_to_declared_end(Tag::new(b"TEST"), 12, 2).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { declared: 2, consumed: 4, .. }));
    }

    #[test]
    fn test_resync_finds_next_tag() {
        let mut bytes = vec![0xAAu8; 7];
        bytes.extend_from_slice(b"GEOS");
        let mut r = reader(bytes);
        assert!(r.resync(None, |t| t == Tag::new(b"GEOS")).unwrap());
        assert_eq!(r.pos(), 7);

        let mut r = reader(vec![0u8; 9]);
        assert!(!r.resync(None, |_| false).unwrap());
        assert_eq!(r.pos(), 9);
    }
}
