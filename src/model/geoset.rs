//! Geosets and geoset animations.

use std::io::{Read, Seek, Write};

use tracing::warn;

use crate::core::{FloatCurve, Vec3Curve};
use crate::mdx::{
    read_counted_array, read_counted_vectors, write_counted_array, write_counted_vectors,
    GroupBlock, MdxReader, MdxRecord, MdxWriter, SizeKind, GEOA, GEOS, GNDX, KGAC, KGAO, MATS, MTGC, NAME_LEN,
    NRMS, PCNT, PTYP, PVTX, SKIN, TANG, UVAS, UVBS, Vector, VERSION_EMISSIVE, VRTX,
};
use crate::util::{Error, Extent, Result};

/// Face primitive kind. Only triangle lists are defined.
pub const PRIMITIVE_TRIANGLES: u32 = 4;

/// Selection flag marking a geoset as not selectable in editors.
pub const SELECTION_UNSELECTABLE: u32 = 0x4;

/// Triangle mesh with skinning groups and texture coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geoset {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Primitive type per face group.
    pub face_types: Vec<u32>,
    /// Index count per face group.
    pub face_groups: Vec<u32>,
    pub faces: Vec<u16>,
    /// Matrix group index per vertex.
    pub vertex_groups: Vec<u8>,
    /// Member count per matrix group.
    pub matrix_group_sizes: Vec<u32>,
    /// Bone object ids, concatenated over all matrix groups.
    pub matrix_indices: Vec<u32>,
    pub material_id: u32,
    pub selection_group: u32,
    pub selection_flags: u32,
    /// Present from version 801 on.
    pub lod: u32,
    pub lod_name: String,
    pub extent: Extent,
    /// One extent per sequence.
    pub sequence_extents: Vec<Extent>,
    /// Present from version 801 on; written only when non-empty.
    pub tangents: Vec<[f32; 4]>,
    pub skin: Vec<u8>,
    pub uv_sets: Vec<Vec<[f32; 2]>>,
}

impl Geoset {
    #[inline]
    pub fn is_unselectable(&self) -> bool {
        self.selection_flags & SELECTION_UNSELECTABLE != 0
    }

    /// Triangles as index triples; trailing indices that do not form a full
    /// triangle are ignored.
    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.faces.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Matrix groups as slices of bone object ids.
    pub fn matrix_groups(&self) -> Vec<&[u32]> {
        let mut out = Vec::with_capacity(self.matrix_group_sizes.len());
        let mut at = 0usize;
        for &n in &self.matrix_group_sizes {
            let end = (at + n as usize).min(self.matrix_indices.len());
            out.push(&self.matrix_indices[at..end]);
            at = end;
        }
        out
    }
}

impl MdxRecord for Geoset {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(GEOS)?;
        let end = start + declared;

        let mut g = Geoset {
            vertices: read_counted_vectors(r, VRTX)?,
            normals: read_counted_vectors(r, NRMS)?,
            face_types: read_counted_array(r, PTYP)?,
            face_groups: read_counted_array(r, PCNT)?,
            faces: read_counted_array(r, PVTX)?,
            vertex_groups: read_counted_array(r, GNDX)?,
            matrix_group_sizes: read_counted_array(r, MTGC)?,
            matrix_indices: read_counted_array(r, MATS)?,
            material_id: r.read_u32()?,
            selection_group: r.read_u32()?,
            selection_flags: r.read_u32()?,
            ..Default::default()
        };
        if let Some(&kind) = g.face_types.iter().find(|&&t| t != PRIMITIVE_TRIANGLES) {
            warn!(kind, "geoset uses a non-triangle primitive type");
        }
        if r.version() > VERSION_EMISSIVE {
            g.lod = r.read_u32()?;
            g.lod_name = r.read_name(NAME_LEN)?;
        }
        g.extent = r.read_extent()?;
        let count = r.read_u32()? as u64;
        r.ensure(count.saturating_mul(Extent::SIZE), "geoset extents")?;
        g.sequence_extents = (0..count).map(|_| r.read_extent()).collect::<Result<_>>()?;

        if r.version() > VERSION_EMISSIVE {
            g.tangents = r.read_optional_chunk(TANG, end, Vec::new(), |r| {
                let block = GroupBlock::<Vector<f32, 4>>::read_counted_body(r, TANG)?;
                Ok(block.into_members().into_iter().map(|v| v.0).collect())
            })?;
            g.skin = r.read_optional_chunk(SKIN, end, Vec::new(), |r| {
                GroupBlock::<u8>::read_counted_body(r, SKIN).map(GroupBlock::into_members)
            })?;
        }

        r.expect_tag(UVAS)?;
        let sets = r.read_u32()?;
        r.ensure(sets as u64 * 8, "texture coordinate sets")?;
        for _ in 0..sets {
            g.uv_sets.push(read_counted_vectors(r, UVBS)?);
        }
        r.skip_to_declared_end(GEOS, start, declared)?;
        Ok(g)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            write_counted_vectors(w, VRTX, &self.vertices)?;
            write_counted_vectors(w, NRMS, &self.normals)?;
            write_counted_array(w, PTYP, &self.face_types)?;
            write_counted_array(w, PCNT, &self.face_groups)?;
            write_counted_array(w, PVTX, &self.faces)?;
            write_counted_array(w, GNDX, &self.vertex_groups)?;
            write_counted_array(w, MTGC, &self.matrix_group_sizes)?;
            write_counted_array(w, MATS, &self.matrix_indices)?;
            w.write_u32(self.material_id)?;
            w.write_u32(self.selection_group)?;
            w.write_u32(self.selection_flags)?;
            if w.version() > VERSION_EMISSIVE {
                w.write_u32(self.lod)?;
                w.write_name(&self.lod_name, NAME_LEN)?;
            }
            w.write_extent(&self.extent)?;
            w.write_u32(self.sequence_extents.len() as u32)?;
            for e in &self.sequence_extents {
                w.write_extent(e)?;
            }
            if w.version() > VERSION_EMISSIVE {
                if !self.tangents.is_empty() {
                    write_counted_vectors(w, TANG, &self.tangents)?;
                }
                if !self.skin.is_empty() {
                    write_counted_array(w, SKIN, &self.skin)?;
                }
            }
            w.write_tag(UVAS)?;
            w.write_u32(self.uv_sets.len() as u32)?;
            for set in &self.uv_sets {
                write_counted_vectors(w, UVBS, set)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

/// Geoset animation flag bits.
pub mod geoset_animation_flags {
    pub const DROP_SHADOW: u32 = 0x1;
    pub const COLOR: u32 = 0x2;
}

/// Visibility and tint animation for one geoset.
#[derive(Clone, Debug, PartialEq)]
pub struct GeosetAnimation {
    pub alpha: f32,
    pub flags: u32,
    pub color: [f32; 3],
    pub geoset_id: Option<u32>,
    pub alpha_track: FloatCurve,
    pub color_track: Vec3Curve,
}

impl Default for GeosetAnimation {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            flags: 0,
            color: [1.0; 3],
            geoset_id: None,
            alpha_track: FloatCurve::default(),
            color_track: Vec3Curve::default(),
        }
    }
}

impl GeosetAnimation {
    #[inline]
    pub fn uses_color(&self) -> bool {
        self.flags & geoset_animation_flags::COLOR != 0
    }

    #[inline]
    pub fn drop_shadow(&self) -> bool {
        self.flags & geoset_animation_flags::DROP_SHADOW != 0
    }
}

impl MdxRecord for GeosetAnimation {
    const SIZE_PREFIXED: bool = true;

    fn read_record<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let (start, declared) = r.read_inclusive_size(GEOA)?;
        let end = start + declared;
        let anim = Self {
            alpha: r.read_f32()?,
            flags: r.read_u32()?,
            color: r.read_vector()?,
            geoset_id: r.read_optional_id()?,
            alpha_track: r.read_optional_chunk(KGAO, end, FloatCurve::default(), FloatCurve::read_body)?,
            color_track: r.read_optional_chunk(KGAC, end, Vec3Curve::default(), Vec3Curve::read_body)?,
        };
        r.skip_to_declared_end(GEOA, start, declared)?;
        Ok(anim)
    }

    fn write_record<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            w.write_f32(self.alpha)?;
            w.write_u32(self.flags)?;
            w.write_vector(&self.color)?;
            w.write_optional_id(self.geoset_id)?;
            self.alpha_track.write_optional(w, KGAO)?;
            self.color_track.write_optional(w, KGAC)
        })?;
        Ok(())
    }
}

/// Check that a geoset's face index count matches its face groups.
pub fn check_face_groups(g: &Geoset) -> Result<()> {
    let total: u64 = g.face_groups.iter().map(|&n| n as u64).sum();
    if total != g.faces.len() as u64 {
        return Err(Error::SizeMismatch { tag: PVTX, declared: total, consumed: g.faces.len() as u64 });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn triangle() -> Geoset {
        Geoset {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            face_types: vec![PRIMITIVE_TRIANGLES],
            face_groups: vec![3],
            faces: vec![0, 1, 2],
            vertex_groups: vec![0, 0, 0],
            matrix_group_sizes: vec![1],
            matrix_indices: vec![0],
            extent: Extent::new(1.0, [0.0; 3], [1.0, 1.0, 0.0]),
            sequence_extents: vec![Extent::default()],
            uv_sets: vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]],
            ..Default::default()
        }
    }

    fn roundtrip(g: &Geoset, version: u32) -> (usize, Geoset) {
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), version).unwrap();
        g.write_record(&mut w).unwrap();
        let bytes = w.into_inner().into_inner();
        let len = bytes.len();
        assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize, len);
        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        r.set_version(version);
        (len, Geoset::read_record(&mut r).unwrap())
    }

    #[test]
    fn test_geoset_roundtrip() {
        let g = triangle();
        let (_, back) = roundtrip(&g, 800);
        assert_eq!(back, g);
        assert_eq!(back.triangles().collect::<Vec<_>>(), vec![[0, 1, 2]]);
        assert_eq!(back.matrix_groups(), vec![&[0u32][..]]);
        check_face_groups(&back).unwrap();
    }

    #[test]
    fn test_geoset_reforged_fields() {
        let mut g = triangle();
        g.lod_name = "LOD0".into();
        g.tangents = vec![[1.0, 0.0, 0.0, 1.0]; 3];
        g.skin = vec![0; 24];
        let (len_1000, back) = roundtrip(&g, 1000);
        assert_eq!(back, g);

        let mut plain = triangle();
        plain.lod_name = "LOD0".into();
        let (len_plain, _) = roundtrip(&plain, 1000);
        assert_eq!(len_1000, len_plain + (8 + 48) + (8 + 24));
    }

    #[test]
    fn test_face_group_mismatch() {
        let mut g = triangle();
        g.face_groups = vec![6];
        assert!(matches!(check_face_groups(&g), Err(Error::SizeMismatch { declared: 6, consumed: 3, .. })));
    }

    #[test]
    fn test_geoset_animation_defaults() {
        let a = GeosetAnimation { geoset_id: Some(0), ..Default::default() };
        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        a.write_record(&mut w).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(bytes.len(), 28);
        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        let back = GeosetAnimation::read_record(&mut r).unwrap();
        assert_eq!(back, a);
        assert!(!back.uses_color());
    }
}
