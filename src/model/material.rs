//! Materials and their layers.

use std::io::{Read, Seek, Write};

use crate::core::{FloatCurve, UintCurve, Vec3Curve};
use crate::mdx::{
    read_counted_records, write_counted_records, MdxReader, MdxRecord, MdxWriter, SizeKind, KFC3,
    KFCA, KFTC, KMTA, KMTE, KMTF, LAYS, MTLS, NAME_LEN, VERSION_EMISSIVE, VERSION_FRESNEL,
};
use crate::util::{Error, Result};

/// How a layer is blended into the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    None,
    Transparent,
    Blend,
    Additive,
    AddAlpha,
    Modulate,
    Modulate2x,
}

impl FilterMode {
    const ALL: [FilterMode; 7] = [
        Self::None,
        Self::Transparent,
        Self::Blend,
        Self::Additive,
        Self::AddAlpha,
        Self::Modulate,
        Self::Modulate2x,
    ];

    pub fn from_u32(v: u32) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Text-form keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Transparent => "Transparent",
            Self::Blend => "Blend",
            Self::Additive => "Additive",
            Self::AddAlpha => "AddAlpha",
            Self::Modulate => "Modulate",
            Self::Modulate2x => "Modulate2x",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.keyword() == s)
    }
}

/// Layer shading flag bits.
pub mod layer_flags {
    pub const UNSHADED: u32 = 0x1;
    pub const SPHERE_ENV_MAP: u32 = 0x2;
    pub const TWO_SIDED: u32 = 0x10;
    pub const UNFOGGED: u32 = 0x20;
    pub const NO_DEPTH_TEST: u32 = 0x40;
    pub const NO_DEPTH_SET: u32 = 0x80;
    pub const UNLIT: u32 = 0x100;

    /// Flag bits paired with their text-form keyword.
    pub const KEYWORDS: [(u32, &str); 7] = [
        (UNSHADED, "Unshaded"),
        (SPHERE_ENV_MAP, "SphereEnvMap"),
        (TWO_SIDED, "TwoSided"),
        (UNFOGGED, "Unfogged"),
        (NO_DEPTH_TEST, "NoDepthTest"),
        (NO_DEPTH_SET, "NoDepthSet"),
        (UNLIT, "Unlit"),
    ];
}

/// Material flag bits.
pub mod material_flags {
    pub const CONSTANT_COLOR: u32 = 0x1;
    pub const SORT_PRIMS_FAR_Z: u32 = 0x10;
    pub const FULL_RESOLUTION: u32 = 0x20;

    pub const KEYWORDS: [(u32, &str); 3] = [
        (CONSTANT_COLOR, "ConstantColor"),
        (SORT_PRIMS_FAR_Z, "SortPrimsFarZ"),
        (FULL_RESOLUTION, "FullResolution"),
    ];
}

/// One texture pass of a material.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub filter_mode: FilterMode,
    pub flags: u32,
    pub texture_id: u32,
    pub texture_animation_id: Option<u32>,
    pub coord_id: u32,
    pub alpha: f32,
    /// Present from version 801 on.
    pub emissive_gain: f32,
    /// Present from version 901 on.
    pub fresnel_color: [f32; 3],
    pub fresnel_opacity: f32,
    pub fresnel_team_color: f32,

    pub texture_id_track: UintCurve,
    pub alpha_track: FloatCurve,
    pub emissive_gain_track: FloatCurve,
    pub fresnel_color_track: Vec3Curve,
    pub fresnel_alpha_track: FloatCurve,
    pub fresnel_team_color_track: FloatCurve,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::None,
            flags: 0,
            texture_id: 0,
            texture_animation_id: None,
            coord_id: 0,
            alpha: 1.0,
            emissive_gain: 1.0,
            fresnel_color: [1.0; 3],
            fresnel_opacity: 0.0,
            fresnel_team_color: 0.0,
            texture_id_track: UintCurve::default(),
            alpha_track: FloatCurve::default(),
            emissive_gain_track: FloatCurve::default(),
            fresnel_color_track: Vec3Curve::default(),
            fresnel_alpha_track: FloatCurve::default(),
            fresnel_team_color_track: FloatCurve::default(),
        }
    }
}

impl Layer {
    pub fn with_texture(texture_id: u32) -> Self {
        Self { texture_id, ..Default::default() }
    }
}

impl MdxRecord for Layer {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(LAYS)?;
        let end = start + declared;
        let raw = r.read_u32()?;
        let filter_mode = FilterMode::from_u32(raw).ok_or_else(|| Error::invalid("filter mode", raw))?;
        let mut layer = Layer {
            filter_mode,
            flags: r.read_u32()?,
            texture_id: r.read_u32()?,
            texture_animation_id: r.read_optional_id()?,
            coord_id: r.read_u32()?,
            alpha: r.read_f32()?,
            ..Default::default()
        };
        if r.version() > VERSION_EMISSIVE {
            layer.emissive_gain = r.read_f32()?;
        }
        if r.version() > VERSION_FRESNEL {
            layer.fresnel_color = r.read_vector()?;
            layer.fresnel_opacity = r.read_f32()?;
            layer.fresnel_team_color = r.read_f32()?;
        }

        layer.texture_id_track = r.read_optional_chunk(KMTF, end, UintCurve::default(), UintCurve::read_body)?;
        layer.alpha_track = r.read_optional_chunk(KMTA, end, FloatCurve::default(), FloatCurve::read_body)?;
        layer.emissive_gain_track = r.read_optional_chunk(KMTE, end, FloatCurve::default(), FloatCurve::read_body)?;
        layer.fresnel_color_track = r.read_optional_chunk(KFC3, end, Vec3Curve::default(), Vec3Curve::read_body)?;
        layer.fresnel_alpha_track = r.read_optional_chunk(KFCA, end, FloatCurve::default(), FloatCurve::read_body)?;
        layer.fresnel_team_color_track =
            r.read_optional_chunk(KFTC, end, FloatCurve::default(), FloatCurve::read_body)?;
        r.skip_to_declared_end(LAYS, start, declared)?;
        Ok(layer)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            w.write_u32(self.filter_mode.as_u32())?;
            w.write_u32(self.flags)?;
            w.write_u32(self.texture_id)?;
            w.write_optional_id(self.texture_animation_id)?;
            w.write_u32(self.coord_id)?;
            w.write_f32(self.alpha)?;
            if w.version() > VERSION_EMISSIVE {
                w.write_f32(self.emissive_gain)?;
            }
            if w.version() > VERSION_FRESNEL {
                w.write_vector(&self.fresnel_color)?;
                w.write_f32(self.fresnel_opacity)?;
                w.write_f32(self.fresnel_team_color)?;
            }
            self.texture_id_track.write_optional(w, KMTF)?;
            self.alpha_track.write_optional(w, KMTA)?;
            self.emissive_gain_track.write_optional(w, KMTE)?;
            self.fresnel_color_track.write_optional(w, KFC3)?;
            self.fresnel_alpha_track.write_optional(w, KFCA)?;
            self.fresnel_team_color_track.write_optional(w, KFTC)
        })?;
        Ok(())
    }
}

/// Ordered stack of layers with shared sorting options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    pub priority_plane: i32,
    pub flags: u32,
    /// Present from version 801 on.
    pub shader: String,
    pub layers: Vec<Layer>,
}

impl MdxRecord for Material {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(MTLS)?;
        let priority_plane = r.read_i32()?;
        let flags = r.read_u32()?;
        let shader = if r.version() > VERSION_EMISSIVE { r.read_name(NAME_LEN)? } else { String::new() };
        let layers = read_counted_records(r, LAYS)?;
        r.skip_to_declared_end(MTLS, start, declared)?;
        Ok(Self { priority_plane, flags, shader, layers })
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            w.write_i32(self.priority_plane)?;
            w.write_u32(self.flags)?;
            if w.version() > VERSION_EMISSIVE {
                w.write_name(&self.shader, NAME_LEN)?;
            }
            write_counted_records(w, LAYS, &self.layers)
        })?;
        Ok(())
    }
}
