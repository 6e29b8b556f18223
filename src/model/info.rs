//! Model header and animation sequences.

use std::io::{Read, Seek, Write};

use crate::mdx::{MdxReader, MdxRecord, MdxWriter, FILE_PATH_LEN, NAME_LEN};
use crate::util::{Extent, Frame, Result};

/// Model header (`MODL`).
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub animation_file: String,
    pub extent: Extent,
    pub blend_time: u32,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self { name: String::new(), animation_file: String::new(), extent: Extent::default(), blend_time: 150 }
    }
}

impl ModelInfo {
    /// Serialized size of the `MODL` payload.
    pub const SIZE: u64 = NAME_LEN as u64 + FILE_PATH_LEN as u64 + Extent::SIZE + 4;

    pub fn read<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        r.ensure(Self::SIZE, "model header")?;
        Ok(Self {
            name: r.read_name(NAME_LEN)?,
            animation_file: r.read_name(FILE_PATH_LEN)?,
            extent: r.read_extent()?,
            blend_time: r.read_u32()?,
        })
    }

    pub fn write<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.write_name(&self.name, NAME_LEN)?;
        w.write_name(&self.animation_file, FILE_PATH_LEN)?;
        w.write_extent(&self.extent)?;
        w.write_u32(self.blend_time)
    }
}

/// Named animation interval.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sequence {
    pub name: String,
    /// `[start, end)` in frames.
    pub interval: [u32; 2],
    pub move_speed: f32,
    /// Raw flag word; bits other than [`FLAG_NON_LOOPING`](Self::FLAG_NON_LOOPING) are kept as read.
    pub flags: u32,
    pub rarity: f32,
    pub sync_point: u32,
    pub extent: Extent,
}

impl Sequence {
    pub const FLAG_NON_LOOPING: u32 = 0x1;

    pub fn new(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self { name: name.into(), interval: [start, end], ..Default::default() }
    }

    #[inline]
    pub fn non_looping(&self) -> bool {
        self.flags & Self::FLAG_NON_LOOPING != 0
    }

    pub fn set_non_looping(&mut self, on: bool) {
        if on {
            self.flags |= Self::FLAG_NON_LOOPING;
        } else {
            self.flags &= !Self::FLAG_NON_LOOPING;
        }
    }

    /// Frame count covered by the interval.
    #[inline]
    pub fn length(&self) -> u32 {
        self.interval[1].saturating_sub(self.interval[0])
    }

    /// Whether `frame` falls inside the interval.
    #[inline]
    pub fn contains(&self, frame: Frame) -> bool {
        frame >= self.interval[0] as Frame && frame < self.interval[1] as Frame
    }
}

impl MdxRecord for Sequence {
    const FIXED_SIZE: Option<u64> = Some(NAME_LEN as u64 + 24 + Extent::SIZE);

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let name = r.read_name(NAME_LEN)?;
        let interval = r.read_array()?;
        let move_speed = r.read_f32()?;
        let flags = r.read_u32()?;
        let rarity = r.read_f32()?;
        let sync_point = r.read_u32()?;
        let extent = r.read_extent()?;
        Ok(Self {
            name,
            interval,
            move_speed,
            flags,
            rarity,
            sync_point,
            extent,
        })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.write_name(&self.name, NAME_LEN)?;
        w.write_array(&self.interval)?;
        w.write_f32(self.move_speed)?;
        w.write_u32(self.flags)?;
        w.write_f32(self.rarity)?;
        w.write_u32(self.sync_point)?;
        w.write_extent(&self.extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sequence_record_size() {
        let mut s = Sequence::new("Walk", 100, 300);
        s.set_non_looping(true);
        s.extent = Extent::new(2.0, [-1.0; 3], [1.0; 3]);
        assert_eq!(s.length(), 200);
        assert!(s.contains(100) && !s.contains(300));

        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        s.write_record(&mut w).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(Some(bytes.len() as u64), Sequence::FIXED_SIZE);
        assert_eq!(bytes.len(), 132);

        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(Sequence::read_record(&mut r).unwrap(), s);
    }

    #[test]
    fn test_unknown_sequence_flags_survive() {
        let mut s = Sequence::new("Spell", 0, 10);
        s.flags = 0x3;
        assert!(s.non_looping());

        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        s.write_record(&mut w).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(&bytes[NAME_LEN + 12..NAME_LEN + 16], &3u32.to_le_bytes());

        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        let back = Sequence::read_record(&mut r).unwrap();
        assert_eq!(back.flags, 0x3);

        let mut s = back;
        s.set_non_looping(false);
        assert_eq!(s.flags, 0x2);
    }

    #[test]
    fn test_model_info_size() {
        let info = ModelInfo { name: "Footman".into(), ..Default::default() };
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        info.write(&mut w).unwrap();
        assert_eq!(w.pos(), ModelInfo::SIZE);
        assert_eq!(ModelInfo::SIZE, 372);
    }
}
