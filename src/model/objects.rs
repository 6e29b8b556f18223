//! Node-based objects: bones, helpers, attachments, lights, event objects
//! and collision shapes.

use std::io::{Read, Seek, Write};

use crate::core::{FloatCurve, Node, NodeFlags, Vec3Curve};
use crate::mdx::{
    MdxReader, MdxRecord, MdxWriter, SizeKind, ATCH, KATV, KEVT, KLAC, KLAE, KLAI, KLAS, KLAV,
    KLBC, KLBI, LITE, OBJECT_PATH_LEN,
};
use crate::util::{Error, Result};

/// Skinning joint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bone {
    pub node: Node,
    pub geoset_id: Option<u32>,
    pub geoset_animation_id: Option<u32>,
}

impl Bone {
    pub fn new(name: impl Into<String>, object_id: u32) -> Self {
        Self { node: Node::new(name, object_id, NodeFlags::BONE), ..Default::default() }
    }
}

impl MdxRecord for Bone {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        Ok(Self { node: Node::read(r)?, geoset_id: r.read_optional_id()?, geoset_animation_id: r.read_optional_id()? })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        self.node.write(w)?;
        w.write_optional_id(self.geoset_id)?;
        w.write_optional_id(self.geoset_animation_id)
    }
}

/// Transform-only node used to group other nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Helper {
    pub node: Node,
}

impl MdxRecord for Helper {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        Ok(Self { node: Node::read(r)? })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        self.node.write(w)
    }
}

/// Named mount point for other models.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attachment {
    pub node: Node,
    pub path: String,
    pub attachment_id: u32,
    pub visibility: FloatCurve,
}

impl MdxRecord for Attachment {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(ATCH)?;
        let end = start + declared;
        let a = Self {
            node: Node::read(r)?,
            path: r.read_name(OBJECT_PATH_LEN)?,
            attachment_id: r.read_u32()?,
            visibility: r.read_optional_chunk(KATV, end, FloatCurve::default(), FloatCurve::read_body)?,
        };
        r.skip_to_declared_end(ATCH, start, declared)?;
        Ok(a)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            self.node.write(w)?;
            w.write_name(&self.path, OBJECT_PATH_LEN)?;
            w.write_u32(self.attachment_id)?;
            self.visibility.write_optional(w, KATV)
        })?;
        Ok(())
    }
}

/// Light source kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightKind {
    #[default]
    Omnidirectional,
    Directional,
    Ambient,
}

impl LightKind {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Omnidirectional),
            1 => Some(Self::Directional),
            2 => Some(Self::Ambient),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Omnidirectional => "Omnidirectional",
            Self::Directional => "Directional",
            Self::Ambient => "Ambient",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        [Self::Omnidirectional, Self::Directional, Self::Ambient].into_iter().find(|k| k.keyword() == s)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Light {
    pub node: Node,
    pub kind: LightKind,
    pub attenuation: [f32; 2],
    pub color: [f32; 3],
    pub intensity: f32,
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,

    pub attenuation_start_track: FloatCurve,
    pub attenuation_end_track: FloatCurve,
    pub color_track: Vec3Curve,
    pub intensity_track: FloatCurve,
    pub ambient_intensity_track: FloatCurve,
    pub ambient_color_track: Vec3Curve,
    pub visibility: FloatCurve,
}

impl MdxRecord for Light {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(LITE)?;
        let end = start + declared;
        let node = Node::read(r)?;
        let raw = r.read_u32()?;
        let kind = LightKind::from_u32(raw).ok_or_else(|| Error::invalid("light type", raw))?;
        let light = Self {
            node,
            kind,
            attenuation: r.read_vector()?,
            color: r.read_vector()?,
            intensity: r.read_f32()?,
            ambient_color: r.read_vector()?,
            ambient_intensity: r.read_f32()?,
            attenuation_start_track: r.read_optional_chunk(KLAS, end, FloatCurve::default(), FloatCurve::read_body)?,
            attenuation_end_track: r.read_optional_chunk(KLAE, end, FloatCurve::default(), FloatCurve::read_body)?,
            color_track: r.read_optional_chunk(KLAC, end, Vec3Curve::default(), Vec3Curve::read_body)?,
            intensity_track: r.read_optional_chunk(KLAI, end, FloatCurve::default(), FloatCurve::read_body)?,
            ambient_intensity_track: r.read_optional_chunk(KLBI, end, FloatCurve::default(), FloatCurve::read_body)?,
            ambient_color_track: r.read_optional_chunk(KLBC, end, Vec3Curve::default(), Vec3Curve::read_body)?,
            visibility: r.read_optional_chunk(KLAV, end, FloatCurve::default(), FloatCurve::read_body)?,
        };
        r.skip_to_declared_end(LITE, start, declared)?;
        Ok(light)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            self.node.write(w)?;
            w.write_u32(self.kind.as_u32())?;
            w.write_vector(&self.attenuation)?;
            w.write_vector(&self.color)?;
            w.write_f32(self.intensity)?;
            w.write_vector(&self.ambient_color)?;
            w.write_f32(self.ambient_intensity)?;
            self.attenuation_start_track.write_optional(w, KLAS)?;
            self.attenuation_end_track.write_optional(w, KLAE)?;
            self.color_track.write_optional(w, KLAC)?;
            self.intensity_track.write_optional(w, KLAI)?;
            self.ambient_intensity_track.write_optional(w, KLBI)?;
            self.ambient_color_track.write_optional(w, KLBC)?;
            self.visibility.write_optional(w, KLAV)
        })?;
        Ok(())
    }
}

/// Frames at which an event object fires.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventTrack {
    pub global_sequence_id: Option<u32>,
    pub frames: Vec<u32>,
}

/// Sound, splat or spawn event keyed to frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventObject {
    pub node: Node,
    /// `None` when the object carries no `KEVT` block at all.
    pub track: Option<EventTrack>,
}

impl MdxRecord for EventObject {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let node = Node::read(r)?;
        let end = r.member_end();
        let track = r.read_optional_chunk(KEVT, end, None, |r| {
            let count = r.read_u32()? as u64;
            let global_sequence_id = r.read_optional_id()?;
            let frames_end = r.pos().saturating_add(count.saturating_mul(4));
            if frames_end > end {
                let remaining = end.saturating_sub(r.pos());
                return Err(Error::OversizedMember { tag: KEVT, remaining, consumed: count * 4 });
            }
            let frames = (0..count).map(|_| r.read_u32()).collect::<Result<_>>()?;
            Ok(Some(EventTrack { global_sequence_id, frames }))
        })?;
        Ok(Self { node, track })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        self.node.write(w)?;
        if let Some(track) = &self.track {
            w.write_tag(KEVT)?;
            w.write_u32(track.frames.len() as u32)?;
            w.write_optional_id(track.global_sequence_id)?;
            w.write_array(&track.frames)?;
        }
        Ok(())
    }
}

/// Collision volume geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Box { min: [f32; 3], max: [f32; 3] },
    Plane { min: [f32; 3], max: [f32; 3] },
    Sphere { center: [f32; 3], radius: f32 },
    Cylinder { base: [f32; 3], top: [f32; 3], radius: f32 },
}

impl Default for Shape {
    fn default() -> Self {
        Self::Box { min: [0.0; 3], max: [0.0; 3] }
    }
}

impl Shape {
    pub fn type_id(&self) -> u32 {
        match self {
            Self::Box { .. } => 0,
            Self::Plane { .. } => 1,
            Self::Sphere { .. } => 2,
            Self::Cylinder { .. } => 3,
        }
    }

    /// Text-form keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Box { .. } => "Box",
            Self::Plane { .. } => "Plane",
            Self::Sphere { .. } => "Sphere",
            Self::Cylinder { .. } => "Cylinder",
        }
    }

    /// Stored vertices, in order.
    pub fn vertices(&self) -> Vec<[f32; 3]> {
        match *self {
            Self::Box { min, max } | Self::Plane { min, max } => vec![min, max],
            Self::Sphere { center, .. } => vec![center],
            Self::Cylinder { base, top, .. } => vec![base, top],
        }
    }

    pub fn radius(&self) -> Option<f32> {
        match *self {
            Self::Sphere { radius, .. } | Self::Cylinder { radius, .. } => Some(radius),
            _ => None,
        }
    }

    /// Build a shape from its type keyword, vertices and optional radius.
    pub fn from_parts(keyword: &str, vertices: &[[f32; 3]], radius: f32) -> Option<Self> {
        let v = |i: usize| vertices.get(i).copied().unwrap_or_default();
        Some(match keyword {
            "Box" => Self::Box { min: v(0), max: v(1) },
            "Plane" => Self::Plane { min: v(0), max: v(1) },
            "Sphere" => Self::Sphere { center: v(0), radius },
            "Cylinder" => Self::Cylinder { base: v(0), top: v(1), radius },
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionShape {
    pub node: Node,
    pub shape: Shape,
}

impl MdxRecord for CollisionShape {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let node = Node::read(r)?;
        let shape = match r.read_u32()? {
            0 => Shape::Box { min: r.read_vector()?, max: r.read_vector()? },
            1 => Shape::Plane { min: r.read_vector()?, max: r.read_vector()? },
            2 => Shape::Sphere { center: r.read_vector()?, radius: r.read_f32()? },
            3 => Shape::Cylinder { base: r.read_vector()?, top: r.read_vector()?, radius: r.read_f32()? },
            other => return Err(Error::invalid("collision shape type", other)),
        };
        Ok(Self { node, shape })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        self.node.write(w)?;
        w.write_u32(self.shape.type_id())?;
        for v in self.shape.vertices() {
            w.write_vector(&v)?;
        }
        if let Some(radius) = self.shape.radius() {
            w.write_f32(radius)?;
        }
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
        let m = M::read_record(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        m
    }

    #[test]
    fn test_bone_layout() {
        let mut bone = Bone::new("root", 0);
        bone.geoset_id = Some(1);
        let bytes = encode(&bone);
        // node (96) + geoset id + geoset animation id
        assert_eq!(bytes.len(), 96 + 8);
        assert_eq!(&bytes[bytes.len() - 4..], &(-1i32).to_le_bytes());
        assert_eq!(decode::<Bone>(bytes), bone);
    }

    #[test]
    fn test_light_tracks() {
        let mut light = Light { kind: LightKind::Ambient, intensity: 2.0, ..Default::default() };
        light.node = Node::new("Light01", 4, NodeFlags::LIGHT);
        light.visibility = FloatCurve::new(Interpolation::DontInterpolate);
        light.visibility.push(0, [1.0]).push(10, [0.0]);
        let bytes = encode(&light);
        assert_eq!(decode::<Light>(bytes), light);
    }

    #[test]
    fn test_event_object_with_and_without_track() {
        let mut ev = EventObject { node: Node::new("SNDxFOOT", 7, NodeFlags::EVENT_OBJECT), track: None };
        assert_eq!(decode::<EventObject>(encode(&ev)), ev);

        ev.track = Some(EventTrack { global_sequence_id: None, frames: vec![100, 250] });
        let bytes = encode(&ev);
        assert_eq!(bytes.len(), 96 + 12 + 8);
        assert_eq!(decode::<EventObject>(bytes), ev);
    }

    #[test]
    fn test_event_track_stays_inside_its_group() {
        use crate::mdx::{GroupBlock, EVTS};

        let ev = EventObject { node: Node::new("SNDxFOOT", 7, NodeFlags::EVENT_OBJECT), track: None };
        let mut bytes = encode(&ev);
        let budget = bytes.len() as u64;
        // A following chunk that happens to start with the track tag.
        bytes.extend_from_slice(b"KEVT");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&5u32.to_le_bytes());

        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        let block = GroupBlock::<EventObject>::read_size_delimited(&mut r, EVTS, budget).unwrap();
        assert_eq!(block.members(), &[ev]);
        assert_eq!(r.pos(), budget);
    }

    #[test]
    fn test_event_frame_count_overrunning_group_fails() {
        use crate::mdx::{GroupBlock, EVTS};

        let ev = EventObject {
            node: Node::new("SNDxFOOT", 7, NodeFlags::EVENT_OBJECT),
            track: Some(EventTrack { global_sequence_id: None, frames: vec![100, 250] }),
        };
        let mut bytes = encode(&ev);
        let budget = bytes.len() as u64;
        let count_at = bytes.len() - 16;
        bytes[count_at..count_at + 4].copy_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);

        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        let err = GroupBlock::<EventObject>::read_size_delimited(&mut r, EVTS, budget).unwrap_err();
        assert!(matches!(err, Error::OversizedMember { tag, .. } if tag == KEVT), "{:?}", err);
        assert!(err.is_structural());
    }

    #[test]
    fn test_collision_shapes() {
        let shapes = [
            Shape::Box { min: [-1.0; 3], max: [1.0; 3] },
            Shape::Sphere { center: [0.0, 0.0, 5.0], radius: 3.0 },
            Shape::Cylinder { base: [0.0; 3], top: [0.0, 0.0, 2.0], radius: 1.0 },
        ];
        let sizes = [96 + 4 + 24, 96 + 4 + 16, 96 + 4 + 28];
        for (shape, size) in shapes.into_iter().zip(sizes) {
            let c = CollisionShape { node: Node::new("Collision", 9, NodeFlags::COLLISION_SHAPE), shape };
            let bytes = encode(&c);
            assert_eq!(bytes.len(), size);
            assert_eq!(decode::<CollisionShape>(bytes), c);
            let rebuilt = Shape::from_parts(shape.keyword(), &shape.vertices(), shape.radius().unwrap_or(0.0));
            assert_eq!(rebuilt, Some(shape));
        }
    }

    #[test]
    fn test_attachment() {
        let a = Attachment {
            node: Node::new("Origin Ref", 2, NodeFlags::ATTACHMENT),
            path: String::new(),
            attachment_id: 0,
            visibility: FloatCurve::default(),
        };
        let bytes = encode(&a);
        assert_eq!(bytes.len(), 4 + 96 + 256 + 4);
        assert_eq!(decode::<Attachment>(bytes), a);
    }
}
