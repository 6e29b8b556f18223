//! Node: identity, hierarchy and transform animation shared by every
//! placeable object (bones, helpers, lights, attachments, emitters, event
//! objects and collision shapes).

use std::io::{Read, Seek, Write};

use bitflags::bitflags;

use super::curve::{QuatCurve, Vec3Curve};
use crate::mdx::format::{KGRT, KGSC, KGTR, NAME_LEN};
use crate::mdx::{MdxReader, MdxWriter, SizeKind};
use crate::util::{Result, Tag};

bitflags! {
    /// Node flag bits.
    ///
    /// Bits without a name here are carried through unchanged; build from raw
    /// words with [`NodeFlags::from_bits_retain`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u32 {
        const DONT_INHERIT_TRANSLATION = 0x1;
        const DONT_INHERIT_ROTATION = 0x2;
        const DONT_INHERIT_SCALING = 0x4;
        const BILLBOARDED = 0x8;
        const BILLBOARDED_LOCK_X = 0x10;
        const BILLBOARDED_LOCK_Y = 0x20;
        const BILLBOARDED_LOCK_Z = 0x40;
        const CAMERA_ANCHORED = 0x80;

        // Object type bits.
        const BONE = 0x100;
        const LIGHT = 0x200;
        const EVENT_OBJECT = 0x400;
        const ATTACHMENT = 0x800;
        const PARTICLE_EMITTER = 0x1000;
        const COLLISION_SHAPE = 0x2000;
        const RIBBON_EMITTER = 0x4000;

        // Emitter behavior bits; their meaning depends on the emitter kind.
        const EMITTER_USES_MDL = 0x8000;
        const EMITTER_USES_TGA = 0x10000;
        const UNSHADED = 0x8000;
        const SORT_PRIMS_FAR_Z = 0x10000;
        const LINE_EMITTER = 0x20000;
        const UNFOGGED = 0x40000;
        const MODEL_SPACE = 0x80000;
        const XY_QUAD = 0x100000;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl NodeFlags {
    /// Text keywords for the billboard and anchoring bits.
    pub const KEYWORDS: [(u32, &'static str); 5] = [
        (Self::BILLBOARDED.bits(), "Billboarded"),
        (Self::BILLBOARDED_LOCK_X.bits(), "BillboardedLockX"),
        (Self::BILLBOARDED_LOCK_Y.bits(), "BillboardedLockY"),
        (Self::BILLBOARDED_LOCK_Z.bits(), "BillboardedLockZ"),
        (Self::CAMERA_ANCHORED.bits(), "CameraAnchored"),
    ];

    /// Entries of the text `DontInherit { ... }` block.
    pub const DONT_INHERIT_KEYWORDS: [(u32, &'static str); 3] = [
        (Self::DONT_INHERIT_TRANSLATION.bits(), "Translation"),
        (Self::DONT_INHERIT_ROTATION.bits(), "Rotation"),
        (Self::DONT_INHERIT_SCALING.bits(), "Scaling"),
    ];

    pub const EMITTER_KEYWORDS: [(u32, &'static str); 2] = [
        (Self::EMITTER_USES_MDL.bits(), "EmitterUsesMDL"),
        (Self::EMITTER_USES_TGA.bits(), "EmitterUsesTGA"),
    ];

    pub const EMITTER2_KEYWORDS: [(u32, &'static str); 6] = [
        (Self::UNSHADED.bits(), "Unshaded"),
        (Self::SORT_PRIMS_FAR_Z.bits(), "SortPrimsFarZ"),
        (Self::LINE_EMITTER.bits(), "LineEmitter"),
        (Self::UNFOGGED.bits(), "Unfogged"),
        (Self::MODEL_SPACE.bits(), "ModelSpace"),
        (Self::XY_QUAD.bits(), "XYQuad"),
    ];

    #[inline]
    pub const fn inherits_translation(self) -> bool {
        !self.contains(Self::DONT_INHERIT_TRANSLATION)
    }

    #[inline]
    pub const fn inherits_rotation(self) -> bool {
        !self.contains(Self::DONT_INHERIT_ROTATION)
    }

    #[inline]
    pub const fn inherits_scaling(self) -> bool {
        !self.contains(Self::DONT_INHERIT_SCALING)
    }
}

/// Common base of every placeable object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub name: String,
    pub object_id: u32,
    /// Parent object id; resolved by lookup in the owning model.
    pub parent_id: Option<u32>,
    pub flags: NodeFlags,
    pub translation: Vec3Curve,
    pub rotation: QuatCurve,
    pub scaling: Vec3Curve,
}

impl Node {
    /// Fixed part of the node block: size, name, ids and flags.
    const FIXED_SIZE: u64 = 4 + NAME_LEN as u64 + 12;

    /// Create a named node with the given type bit.
    pub fn new(name: impl Into<String>, object_id: u32, flags: NodeFlags) -> Self {
        Self { name: name.into(), object_id, flags, ..Default::default() }
    }

    #[inline]
    pub fn inherits_translation(&self) -> bool {
        self.flags.inherits_translation()
    }

    #[inline]
    pub fn inherits_rotation(&self) -> bool {
        self.flags.inherits_rotation()
    }

    #[inline]
    pub fn inherits_scaling(&self) -> bool {
        self.flags.inherits_scaling()
    }

    /// Serialized size of the node block.
    pub fn byte_size(&self) -> u64 {
        let curve = |empty: bool, size: u64| if empty { 0 } else { size };
        Self::FIXED_SIZE
            + curve(self.translation.is_empty(), self.translation.byte_size())
            + curve(self.rotation.is_empty(), self.rotation.byte_size())
            + curve(self.scaling.is_empty(), self.scaling.byte_size())
    }

    /// Read the node block.
    ///
    /// The three transform curves are each optional but always appear in
    /// translation, rotation, scaling order; the inherit flags never change
    /// which slots exist.
    pub fn read<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        const NODE: Tag = Tag::new(b"NODE");
        let (start, declared) = r.read_inclusive_size(NODE)?;
        let end = start + declared;
        let name = r.read_name(NAME_LEN)?;
        let object_id = r.read_u32()?;
        let parent_id = r.read_optional_id()?;
        let flags = NodeFlags::from_bits_retain(r.read_u32()?);

        let translation = r.read_optional_chunk(KGTR, end, Vec3Curve::default(), Vec3Curve::read_body)?;
        let rotation = r.read_optional_chunk(KGRT, end, QuatCurve::default(), QuatCurve::read_body)?;
        let scaling = r.read_optional_chunk(KGSC, end, Vec3Curve::default(), Vec3Curve::read_body)?;
        r.skip_to_declared_end(NODE, start, declared)?;

        Ok(Self { name, object_id, parent_id, flags, translation, rotation, scaling })
    }

    /// Write the node block with a backpatched inclusive size.
    pub fn write<W: Write + Seek>(&self, w: &mut MdxWriter<W>) -> Result<()> {
        w.sized(SizeKind::Inclusive, |w| {
            w.write_name(&self.name, NAME_LEN)?;
            w.write_u32(self.object_id)?;
            w.write_optional_id(self.parent_id)?;
            w.write_u32(self.flags.bits())?;
            self.translation.write_optional(w, KGTR)?;
            self.rotation.write_optional(w, KGRT)?;
            self.scaling.write_optional(w, KGSC)
        })?;
        Ok(())
    }
}
