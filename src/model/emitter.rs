//! Particle and ribbon emitters.

use std::io::{Read, Seek, Write};

use crate::core::{FloatCurve, Node, UintCurve, Vec3Curve};
use crate::mdx::{
    MdxReader, MdxRecord, MdxWriter, SizeKind, KP2E, KP2G, KP2L, KP2N, KP2R, KP2S, KP2V, KP2W,
    KPEE, KPEG, KPEL, KPES, KPEV, KPLN, KPLT, KRAL, KRCO, KRHA, KRHB, KRTX, KRVS, OBJECT_PATH_LEN,
    PRE2, PREM, RIBB,
};
use crate::util::{Error, Result};

/// Emitter that spawns copies of another model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleEmitter {
    pub node: Node,
    pub emission_rate: f32,
    pub gravity: f32,
    pub longitude: f32,
    pub latitude: f32,
    pub path: String,
    pub lifespan: f32,
    pub speed: f32,

    pub emission_rate_track: FloatCurve,
    pub gravity_track: FloatCurve,
    pub longitude_track: FloatCurve,
    pub latitude_track: FloatCurve,
    pub lifespan_track: FloatCurve,
    pub speed_track: FloatCurve,
    pub visibility: FloatCurve,
}

impl MdxRecord for ParticleEmitter {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(PREM)?;
        let end = start + declared;
        let e = Self {
            node: Node::read(r)?,
            emission_rate: r.read_f32()?,
            gravity: r.read_f32()?,
            longitude: r.read_f32()?,
            latitude: r.read_f32()?,
            path: r.read_name(OBJECT_PATH_LEN)?,
            lifespan: r.read_f32()?,
            speed: r.read_f32()?,
            emission_rate_track: r.read_optional_chunk(KPEE, end, FloatCurve::default(), FloatCurve::read_body)?,
            gravity_track: r.read_optional_chunk(KPEG, end, FloatCurve::default(), FloatCurve::read_body)?,
            longitude_track: r.read_optional_chunk(KPLN, end, FloatCurve::default(), FloatCurve::read_body)?,
            latitude_track: r.read_optional_chunk(KPLT, end, FloatCurve::default(), FloatCurve::read_body)?,
            lifespan_track: r.read_optional_chunk(KPEL, end, FloatCurve::default(), FloatCurve::read_body)?,
            speed_track: r.read_optional_chunk(KPES, end, FloatCurve::default(), FloatCurve::read_body)?,
            visibility: r.read_optional_chunk(KPEV, end, FloatCurve::default(), FloatCurve::read_body)?,
        };
        r.skip_to_declared_end(PREM, start, declared)?;
        Ok(e)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            self.node.write(w)?;
            w.write_f32(self.emission_rate)?;
            w.write_f32(self.gravity)?;
            w.write_f32(self.longitude)?;
            w.write_f32(self.latitude)?;
            w.write_name(&self.path, OBJECT_PATH_LEN)?;
            w.write_f32(self.lifespan)?;
            w.write_f32(self.speed)?;
            self.emission_rate_track.write_optional(w, KPEE)?;
            self.gravity_track.write_optional(w, KPEG)?;
            self.longitude_track.write_optional(w, KPLN)?;
            self.latitude_track.write_optional(w, KPLT)?;
            self.lifespan_track.write_optional(w, KPEL)?;
            self.speed_track.write_optional(w, KPES)?;
            self.visibility.write_optional(w, KPEV)
        })?;
        Ok(())
    }
}

/// Blend mode of second-generation particles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParticleFilterMode {
    #[default]
    Blend,
    Additive,
    Modulate,
    Modulate2x,
    AlphaKey,
}

impl ParticleFilterMode {
    const ALL: [Self; 5] = [Self::Blend, Self::Additive, Self::Modulate, Self::Modulate2x, Self::AlphaKey];

    pub fn from_u32(v: u32) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Blend => "Blend",
            Self::Additive => "Additive",
            Self::Modulate => "Modulate",
            Self::Modulate2x => "Modulate2x",
            Self::AlphaKey => "AlphaKey",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.keyword() == s)
    }
}

/// Which part of the particle quad is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HeadOrTail {
    #[default]
    Head,
    Tail,
    Both,
}

impl HeadOrTail {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Head),
            1 => Some(Self::Tail),
            2 => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Tail => "Tail",
            Self::Both => "Both",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        [Self::Head, Self::Tail, Self::Both].into_iter().find(|k| k.keyword() == s)
    }
}

/// Sprite particle emitter with three-segment color ramps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleEmitter2 {
    pub node: Node,
    pub speed: f32,
    pub variation: f32,
    pub latitude: f32,
    pub gravity: f32,
    pub lifespan: f32,
    pub emission_rate: f32,
    pub width: f32,
    pub length: f32,
    pub filter_mode: ParticleFilterMode,
    pub rows: u32,
    pub columns: u32,
    pub head_or_tail: HeadOrTail,
    pub tail_length: f32,
    pub time: f32,
    pub segment_colors: [[f32; 3]; 3],
    pub segment_alphas: [u8; 3],
    pub segment_scaling: [f32; 3],
    pub head_intervals: [[u32; 3]; 2],
    pub tail_intervals: [[u32; 3]; 2],
    pub texture_id: Option<u32>,
    pub squirt: bool,
    pub priority_plane: i32,
    pub replaceable_id: u32,

    pub speed_track: FloatCurve,
    pub variation_track: FloatCurve,
    pub latitude_track: FloatCurve,
    pub gravity_track: FloatCurve,
    pub emission_rate_track: FloatCurve,
    pub length_track: FloatCurve,
    pub width_track: FloatCurve,
    pub visibility: FloatCurve,
}

impl MdxRecord for ParticleEmitter2 {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(PRE2)?;
        let end = start + declared;
        let node = Node::read(r)?;
        let [speed, variation, latitude, gravity, lifespan, emission_rate, width, length] = r.read_vector()?;
        let raw = r.read_u32()?;
        let filter_mode = ParticleFilterMode::from_u32(raw).ok_or_else(|| Error::invalid("particle filter mode", raw))?;
        let rows = r.read_u32()?;
        let columns = r.read_u32()?;
        let raw = r.read_u32()?;
        let head_or_tail = HeadOrTail::from_u32(raw).ok_or_else(|| Error::invalid("head or tail", raw))?;
        let tail_length = r.read_f32()?;
        let time = r.read_f32()?;
        let segment_colors = [r.read_vector()?, r.read_vector()?, r.read_vector()?];
        let segment_alphas = r.read_array()?;
        let segment_scaling = r.read_vector()?;
        let head_intervals = [r.read_array()?, r.read_array()?];
        let tail_intervals = [r.read_array()?, r.read_array()?];
        let texture_id = r.read_optional_id()?;
        let squirt = r.read_u32()? != 0;
        let priority_plane = r.read_i32()?;
        let replaceable_id = r.read_u32()?;

        let e = Self {
            node,
            speed,
            variation,
            latitude,
            gravity,
            lifespan,
            emission_rate,
            width,
            length,
            filter_mode,
            rows,
            columns,
            head_or_tail,
            tail_length,
            time,
            segment_colors,
            segment_alphas,
            segment_scaling,
            head_intervals,
            tail_intervals,
            texture_id,
            squirt,
            priority_plane,
            replaceable_id,
            speed_track: r.read_optional_chunk(KP2S, end, FloatCurve::default(), FloatCurve::read_body)?,
            variation_track: r.read_optional_chunk(KP2R, end, FloatCurve::default(), FloatCurve::read_body)?,
            latitude_track: r.read_optional_chunk(KP2L, end, FloatCurve::default(), FloatCurve::read_body)?,
            gravity_track: r.read_optional_chunk(KP2G, end, FloatCurve::default(), FloatCurve::read_body)?,
            emission_rate_track: r.read_optional_chunk(KP2E, end, FloatCurve::default(), FloatCurve::read_body)?,
            length_track: r.read_optional_chunk(KP2N, end, FloatCurve::default(), FloatCurve::read_body)?,
            width_track: r.read_optional_chunk(KP2W, end, FloatCurve::default(), FloatCurve::read_body)?,
            visibility: r.read_optional_chunk(KP2V, end, FloatCurve::default(), FloatCurve::read_body)?,
        };
        r.skip_to_declared_end(PRE2, start, declared)?;
        Ok(e)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            self.node.write(w)?;
            w.write_vector(&[
                self.speed,
                self.variation,
                self.latitude,
                self.gravity,
                self.lifespan,
                self.emission_rate,
                self.width,
                self.length,
            ])?;
            w.write_u32(self.filter_mode.as_u32())?;
            w.write_u32(self.rows)?;
            w.write_u32(self.columns)?;
            w.write_u32(self.head_or_tail.as_u32())?;
            w.write_f32(self.tail_length)?;
            w.write_f32(self.time)?;
            for c in &self.segment_colors {
                w.write_vector(c)?;
            }
            w.write_array(&self.segment_alphas)?;
            w.write_vector(&self.segment_scaling)?;
            for i in self.head_intervals.iter().chain(&self.tail_intervals) {
                w.write_array(i)?;
            }
            w.write_optional_id(self.texture_id)?;
            w.write_u32(self.squirt as u32)?;
            w.write_i32(self.priority_plane)?;
            w.write_u32(self.replaceable_id)?;
            self.speed_track.write_optional(w, KP2S)?;
            self.variation_track.write_optional(w, KP2R)?;
            self.latitude_track.write_optional(w, KP2L)?;
            self.gravity_track.write_optional(w, KP2G)?;
            self.emission_rate_track.write_optional(w, KP2E)?;
            self.length_track.write_optional(w, KP2N)?;
            self.width_track.write_optional(w, KP2W)?;
            self.visibility.write_optional(w, KP2V)
        })?;
        Ok(())
    }
}

/// Trail emitter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RibbonEmitter {
    pub node: Node,
    pub height_above: f32,
    pub height_below: f32,
    pub alpha: f32,
    pub color: [f32; 3],
    pub lifespan: f32,
    pub texture_slot: u32,
    pub emission_rate: u32,
    pub rows: u32,
    pub columns: u32,
    pub material_id: Option<u32>,
    pub gravity: f32,

    pub height_above_track: FloatCurve,
    pub height_below_track: FloatCurve,
    pub alpha_track: FloatCurve,
    pub color_track: Vec3Curve,
    pub texture_slot_track: UintCurve,
    pub visibility: FloatCurve,
}

impl MdxRecord for RibbonEmitter {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(RIBB)?;
        let end = start + declared;
        let e = Self {
            node: Node::read(r)?,
            height_above: r.read_f32()?,
            height_below: r.read_f32()?,
            alpha: r.read_f32()?,
            color: r.read_vector()?,
            lifespan: r.read_f32()?,
            texture_slot: r.read_u32()?,
            emission_rate: r.read_u32()?,
            rows: r.read_u32()?,
            columns: r.read_u32()?,
            material_id: r.read_optional_id()?,
            gravity: r.read_f32()?,
            height_above_track: r.read_optional_chunk(KRHA, end, FloatCurve::default(), FloatCurve::read_body)?,
            height_below_track: r.read_optional_chunk(KRHB, end, FloatCurve::default(), FloatCurve::read_body)?,
            alpha_track: r.read_optional_chunk(KRAL, end, FloatCurve::default(), FloatCurve::read_body)?,
            color_track: r.read_optional_chunk(KRCO, end, Vec3Curve::default(), Vec3Curve::read_body)?,
            texture_slot_track: r.read_optional_chunk(KRTX, end, UintCurve::default(), UintCurve::read_body)?,
            visibility: r.read_optional_chunk(KRVS, end, FloatCurve::default(), FloatCurve::read_body)?,
        };
        r.skip_to_declared_end(RIBB, start, declared)?;
        Ok(e)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            self.node.write(w)?;
            w.write_f32(self.height_above)?;
            w.write_f32(self.height_below)?;
            w.write_f32(self.alpha)?;
            w.write_vector(&self.color)?;
            w.write_f32(self.lifespan)?;
            w.write_u32(self.texture_slot)?;
            w.write_u32(self.emission_rate)?;
            w.write_u32(self.rows)?;
            w.write_u32(self.columns)?;
            w.write_optional_id(self.material_id)?;
            w.write_f32(self.gravity)?;
            self.height_above_track.write_optional(w, KRHA)?;
            self.height_below_track.write_optional(w, KRHB)?;
            self.alpha_track.write_optional(w, KRAL)?;
            self.color_track.write_optional(w, KRCO)?;
            self.texture_slot_track.write_optional(w, KRTX)?;
            self.visibility.write_optional(w, KRVS)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Interpolation, NodeFlags};
    use std::io::Cursor;

    fn roundtrip<M: MdxRecord + PartialEq + std::fmt::Debug>(m: &M) -> usize {
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        m.write_record(&mut w).unwrap();
        let bytes = w.into_inner().into_inner();
        let len = bytes.len();
        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(&M::read_record(&mut r).unwrap(), m);
        len
    }

    #[test]
    fn test_particle_emitter2_fixed_part() {
        let e = ParticleEmitter2 {
            node: Node::new("BlizParticle", 12, NodeFlags::PARTICLE_EMITTER),
            filter_mode: ParticleFilterMode::Additive,
            head_or_tail: HeadOrTail::Both,
            segment_alphas: [255, 128, 0],
            segment_scaling: [1.0, 2.0, 3.0],
            head_intervals: [[0, 3, 1], [4, 7, 1]],
            texture_id: Some(3),
            squirt: true,
            ..Default::default()
        };
        // size + node + 8 floats + 4 u32 + 2 floats + colors + alphas + scaling + intervals + 4 trailing
        assert_eq!(roundtrip(&e), 4 + 96 + 32 + 16 + 8 + 36 + 3 + 12 + 48 + 16);
    }

    #[test]
    fn test_ribbon_emitter_with_tracks() {
        let mut e = RibbonEmitter { node: Node::new("Ribbon", 3, NodeFlags::RIBBON_EMITTER), alpha: 1.0, ..Default::default() };
        e.texture_slot_track = UintCurve::new(Interpolation::DontInterpolate);
        e.texture_slot_track.push(0, [0]).push(33, [1]);
        e.color_track = Vec3Curve::new(Interpolation::Linear);
        e.color_track.push(0, [1.0, 0.5, 0.0]);
        roundtrip(&e);
    }

    #[test]
    fn test_particle_emitter() {
        let e = ParticleEmitter {
            node: Node::new("Spawn", 5, NodeFlags::PARTICLE_EMITTER | NodeFlags::EMITTER_USES_MDL),
            path: "Abilities\\Spells\\Orc\\Bolt.mdl".into(),
            lifespan: 1.5,
            ..Default::default()
        };
        assert_eq!(roundtrip(&e), 4 + 96 + 16 + 256 + 8);
    }

    #[test]
    fn test_particle_filter_mode_rejects_unknown() {
        assert_eq!(ParticleFilterMode::from_u32(5), None);
        assert_eq!(ParticleFilterMode::from_keyword("AlphaKey"), Some(ParticleFilterMode::AlphaKey));
    }
}
