//! Textures, texture animations and sound tracks.

use std::io::{Read, Seek, Write};

use crate::core::{QuatCurve, Vec3Curve};
use crate::mdx::{MdxReader, MdxRecord, MdxWriter, SizeKind, FILE_PATH_LEN, KTAR, KTAS, KTAT, TXAN};
use crate::util::Result;

/// Texture wrap flag bits.
pub mod texture_flags {
    pub const WRAP_WIDTH: u32 = 0x1;
    pub const WRAP_HEIGHT: u32 = 0x2;

    pub const KEYWORDS: [(u32, &str); 2] = [(WRAP_WIDTH, "WrapWidth"), (WRAP_HEIGHT, "WrapHeight")];
}

/// Image reference, either a file path or a replaceable slot (team color,
/// team glow, ...).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
    pub replaceable_id: u32,
    pub path: String,
    pub flags: u32,
}

impl Texture {
    pub fn from_path(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    pub fn replaceable(replaceable_id: u32) -> Self {
        Self { replaceable_id, ..Default::default() }
    }
}

impl MdxRecord for Texture {
    const FIXED_SIZE: Option<u64> = Some(4 + FILE_PATH_LEN as u64 + 4);

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        Ok(Self { replaceable_id: r.read_u32()?, path: r.read_name(FILE_PATH_LEN)?, flags: r.read_u32()? })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.write_u32(self.replaceable_id)?;
        w.write_name(&self.path, FILE_PATH_LEN)?;
        w.write_u32(self.flags)
    }
}

/// Sound file played by event objects.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundTrack {
    pub path: String,
    pub volume: f32,
    pub pitch: f32,
    pub flags: u32,
}

impl Default for SoundTrack {
    fn default() -> Self {
        Self { path: String::new(), volume: 1.0, pitch: 1.0, flags: 0 }
    }
}

impl MdxRecord for SoundTrack {
    const FIXED_SIZE: Option<u64> = Some(FILE_PATH_LEN as u64 + 12);

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        Ok(Self {
            path: r.read_name(FILE_PATH_LEN)?,
            volume: r.read_f32()?,
            pitch: r.read_f32()?,
            flags: r.read_u32()?,
        })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.write_name(&self.path, FILE_PATH_LEN)?;
        w.write_f32(self.volume)?;
        w.write_f32(self.pitch)?;
        w.write_u32(self.flags)
    }
}

/// Animated texture-coordinate transform.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureAnimation {
    pub translation: Vec3Curve,
    pub rotation: QuatCurve,
    pub scaling: Vec3Curve,
}

impl MdxRecord for TextureAnimation {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(TXAN)?;
        let end = start + declared;
        let anim = Self {
            translation: r.read_optional_chunk(KTAT, end, Vec3Curve::default(), Vec3Curve::read_body)?,
            rotation: r.read_optional_chunk(KTAR, end, QuatCurve::default(), QuatCurve::read_body)?,
            scaling: r.read_optional_chunk(KTAS, end, Vec3Curve::default(), Vec3Curve::read_body)?,
        };
        r.skip_to_declared_end(TXAN, start, declared)?;
        Ok(anim)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            self.translation.write_optional(w, KTAT)?;
            self.rotation.write_optional(w, KTAR)?;
            self.scaling.write_optional(w, KTAS)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interpolation;
    use std::io::Cursor;

    fn encode<M: MdxRecord>(m: &M) -> Vec<u8> {
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        m.write_record(&mut w).unwrap();
        w.into_inner().into_inner()
    }

    fn decode<M: MdxRecord>(bytes: Vec<u8>) -> M {
        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        M::read_record(&mut r).unwrap()
    }

    #[test]
    fn test_fixed_record_sizes() {
        let t = Texture { flags: texture_flags::WRAP_WIDTH, ..Texture::from_path("Textures\\Footman.blp") };
        let bytes = encode(&t);
        assert_eq!(bytes.len(), 268);
        assert_eq!(decode::<Texture>(bytes), t);

        let s = SoundTrack { path: "Sound\\Hit.wav".into(), volume: 0.5, ..Default::default() };
        let bytes = encode(&s);
        assert_eq!(bytes.len(), 272);
        assert_eq!(decode::<SoundTrack>(bytes), s);
    }

    #[test]
    fn test_empty_texture_animation_is_just_a_size() {
        let bytes = encode(&TextureAnimation::default());
        assert_eq!(bytes, 4u32.to_le_bytes().to_vec());
        assert_eq!(decode::<TextureAnimation>(bytes), TextureAnimation::default());
    }

    #[test]
    fn test_texture_animation_scaling_only() {
        let mut anim = TextureAnimation::default();
        anim.scaling = Vec3Curve::new(Interpolation::DontInterpolate);
        anim.scaling.push(0, [1.0; 3]).push(50, [2.0; 3]);
        let bytes = encode(&anim);
        assert_eq!(&bytes[4..8], b"KTAS");
        assert_eq!(decode::<TextureAnimation>(bytes), anim);
    }
}
