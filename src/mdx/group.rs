//! Group blocks: homogeneous record lists, counted or size-delimited.
//!
//! Every repeated structure in the format (sequences, bones, geoset vertex
//! arrays, layers, ...) is a [`GroupBlock`] of some [`MdxRecord`]. Reading
//! returns a populated block; writing borrows one. Neither can be resumed or
//! re-entered.

use std::io::{Read, Seek, Write};

use tracing::trace;

use super::stream::{MdxReader, MdxWriter, Primitive};
use crate::util::{Error, Extent, Result, Tag};

/// One record inside a group block.
pub trait MdxRecord: Sized {
    /// Serialized size when every record of this type has the same size.
    const FIXED_SIZE: Option<u64> = None;

    /// Records that open with an inclusive byte count.
    const SIZE_PREFIXED: bool = false;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self>;

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()>;
}

impl<T: Primitive + Default> MdxRecord for T {
    const FIXED_SIZE: Option<u64> = Some(T::SIZE);

    #[inline]
    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        r.read_fixed()
    }

    #[inline]
    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.write_fixed(*self)
    }
}

/// Fixed-length vectors (`[f32; 3]` vertices, `[u32; 3]` intervals, ...).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector<T, const N: usize>(pub [T; N]);

impl<T: Primitive + Default, const N: usize> MdxRecord for Vector<T, N> {
    const FIXED_SIZE: Option<u64> = Some(T::SIZE * N as u64);

    #[inline]
    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        r.read_array().map(Vector)
    }

    #[inline]
    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.write_array(&self.0)
    }
}

impl MdxRecord for Extent {
    const FIXED_SIZE: Option<u64> = Some(Extent::SIZE);

    #[inline]
    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        r.read_extent()
    }

    #[inline]
    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.write_extent(self)
    }
}

/// How the member count of a group block is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counting {
    /// An explicit `count` precedes the members.
    Counted,
    /// A byte budget precedes the members; members are read until it is spent.
    SizeDelimited,
}

/// A homogeneous list of records read from or written to one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupBlock<M> {
    tag: Tag,
    counting: Counting,
    members: Vec<M>,
}

impl<M> GroupBlock<M> {
    /// Wrap existing members for writing.
    pub fn new(tag: Tag, counting: Counting, members: Vec<M>) -> Self {
        Self { tag, counting, members }
    }

    /// Chunk tag this block is stored under.
    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Counting flavor.
    #[inline]
    pub fn counting(&self) -> Counting {
        self.counting
    }

    /// Member records.
    #[inline]
    pub fn members(&self) -> &[M] {
        &self.members
    }

    /// Take the members out of the block.
    #[inline]
    pub fn into_members(self) -> Vec<M> {
        self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<M: MdxRecord> GroupBlock<M> {
    /// Read a counted block whose tag has already been consumed: `count`
    /// followed by exactly that many members.
    pub fn read_counted_body<R: Read + Seek>(r: &mut MdxReader<R>, tag: Tag) -> Result<Self> {
        let count = r.read_u32()? as u64;
        if let Some(size) = M::FIXED_SIZE {
            // Refuse counts the stream cannot possibly satisfy before allocating.
            r.ensure(count.saturating_mul(size), "counted block")?;
        }
        let mut members = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            members.push(M::read_record(r)?);
        }
        trace!(%tag, count, "read counted block");
        Ok(Self { tag, counting: Counting::Counted, members })
    }

    /// Read a mandatory counted block: `tag`, `count`, members.
    pub fn read_counted<R: Read + Seek>(r: &mut MdxReader<R>, tag: Tag) -> Result<Self> {
        r.expect_tag(tag)?;
        Self::read_counted_body(r, tag)
    }

    /// Read members until a byte budget is spent exactly.
    ///
    /// A member that overruns the remaining budget is corruption and fails
    /// with `OversizedMember`; a fixed-size remainder too small for one more
    /// member fails with `SizeMismatch`.
    pub fn read_size_delimited<R: Read + Seek>(
        r: &mut MdxReader<R>,
        tag: Tag,
        bytes: u64,
    ) -> Result<Self> {
        let mut remaining = bytes;
        let mut members = Vec::new();
        while remaining > 0 {
            if let Some(size) = M::FIXED_SIZE {
                if remaining < size {
                    return Err(Error::SizeMismatch { tag, declared: bytes, consumed: bytes - remaining });
                }
            }
            if M::SIZE_PREFIXED && remaining >= 4 {
                let start = r.pos();
                let declared = r.read_u32()? as u64;
                r.seek(start)?;
                if declared > remaining {
                    return Err(Error::OversizedMember { tag, remaining, consumed: declared });
                }
            }

            let start = r.pos();
            let outer = r.limit_member(start + remaining);
            let member = M::read_record(r);
            r.restore_member_end(outer);
            let member = member?;
            let consumed = r.pos() - start;
            if consumed > remaining {
                return Err(Error::OversizedMember { tag, remaining, consumed });
            }
            remaining -= consumed;
            members.push(member);
        }
        trace!(%tag, count = members.len(), bytes, "read size-delimited block");
        Ok(Self { tag, counting: Counting::SizeDelimited, members })
    }

    /// Write the block body.
    ///
    /// Counted blocks write their tag, the literal count and the members.
    /// Size-delimited blocks become a top-level chunk with a backpatched
    /// byte count.
    pub fn write<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        match self.counting {
            Counting::Counted => write_counted_records(w, self.tag, &self.members),
            Counting::SizeDelimited => write_size_delimited(w, self.tag, &self.members),
        }
    }

    /// Write the block only when it has members; an empty optional block
    /// leaves no trace, not even a header.
    pub fn write_optional<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        if self.members.is_empty() {
            return Ok(());
        }
        self.write(w)
    }
}

// ============================================================================
// Helpers for record fields that are counted arrays
// ============================================================================

/// Read a mandatory counted array of fixed-width values.
pub fn read_counted_array<T, R>(r: &mut MdxReader<R>, tag: Tag) -> Result<Vec<T>>
where
    T: Primitive + Default,
    R: Read + Seek,
{
    GroupBlock::<T>::read_counted(r, tag).map(GroupBlock::into_members)
}

/// Read a mandatory counted array of fixed-length vectors.
pub fn read_counted_vectors<T, R, const N: usize>(r: &mut MdxReader<R>, tag: Tag) -> Result<Vec<[T; N]>>
where
    T: Primitive + Default,
    R: Read + Seek,
{
    let block = GroupBlock::<Vector<T, N>>::read_counted(r, tag)?;
    Ok(block.into_members().into_iter().map(|v| v.0).collect())
}

/// Read a mandatory counted list of records into a plain vector.
pub fn read_counted_records<M, R>(r: &mut MdxReader<R>, tag: Tag) -> Result<Vec<M>>
where
    M: MdxRecord,
    R: Read + Seek,
{
    GroupBlock::<M>::read_counted(r, tag).map(GroupBlock::into_members)
}

/// Write members as a top-level chunk whose exclusive size is backpatched.
pub fn write_size_delimited<M, W>(w: &mut MdxWriter<W>, tag: Tag, members: &[M]) -> Result<()>
where
    M: MdxRecord,
    W: Write + Seek,
{
    w.chunk(tag, |w| {
        for m in members {
            m.write_record(w)?;
        }
        Ok(())
    })?;
    Ok(())
}

/// Write `tag`, the member count and every member.
pub fn write_counted_records<M, W>(w: &mut MdxWriter<W>, tag: Tag, members: &[M]) -> Result<()>
where
    M: MdxRecord,
    W: Write + Seek,
{
    w.write_tag(tag)?;
    w.write_u32(members.len() as u32)?;
    for m in members {
        m.write_record(w)?;
    }
    Ok(())
}

/// Write a counted array of fixed-width values.
pub fn write_counted_array<T, W>(w: &mut MdxWriter<W>, tag: Tag, values: &[T]) -> Result<()>
where
    T: Primitive,
    W: Write + Seek,
{
    w.write_tag(tag)?;
    w.write_u32(values.len() as u32)?;
    w.write_array(values)
}

/// Write a counted array of fixed-length vectors.
pub fn write_counted_vectors<T, W, const N: usize>(
    w: &mut MdxWriter<W>,
    tag: Tag,
    values: &[[T; N]],
) -> Result<()>
where
    T: Primitive,
    W: Write + Seek,
{
    w.write_tag(tag)?;
    w.write_u32(values.len() as u32)?;
    for v in values {
        w.write_array(v)?;
    }
    Ok(())
}
