//! Cameras.
//!
//! Cameras carry their own name and position rather than a node block, so
//! they take no part in the node hierarchy.

use std::io::{Read, Seek, Write};

use crate::core::{FloatCurve, Vec3Curve};
use crate::mdx::{MdxReader, MdxRecord, MdxWriter, SizeKind, CAMS, KCRL, KCTR, KTTR, NAME_LEN};
use crate::util::Result;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Camera {
    pub name: String,
    pub position: [f32; 3],
    pub field_of_view: f32,
    pub far_clip: f32,
    pub near_clip: f32,
    pub target_position: [f32; 3],

    pub translation: Vec3Curve,
    pub target_translation: Vec3Curve,
    pub rotation: FloatCurve,
}

impl MdxRecord for Camera {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(CAMS)?;
        let end = start + declared;
        let c = Self {
            name: r.read_name(NAME_LEN)?,
            position: r.read_vector()?,
            field_of_view: r.read_f32()?,
            far_clip: r.read_f32()?,
            near_clip: r.read_f32()?,
            target_position: r.read_vector()?,
            translation: r.read_optional_chunk(KCTR, end, Vec3Curve::default(), Vec3Curve::read_body)?,
            target_translation: r.read_optional_chunk(KTTR, end, Vec3Curve::default(), Vec3Curve::read_body)?,
            rotation: r.read_optional_chunk(KCRL, end, FloatCurve::default(), FloatCurve::read_body)?,
        };
        r.skip_to_declared_end(CAMS, start, declared)?;
        Ok(c)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            w.write_name(&self.name, NAME_LEN)?;
            w.write_vector(&self.position)?;
            w.write_f32(self.field_of_view)?;
            w.write_f32(self.far_clip)?;
            w.write_f32(self.near_clip)?;
            w.write_vector(&self.target_position)?;
            self.translation.write_optional(w, KCTR)?;
            self.target_translation.write_optional(w, KTTR)?;
            self.rotation.write_optional(w, KCRL)
        })?;
        Ok(())
    }
}
