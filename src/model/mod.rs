//! In-memory model tree shared by the binary and text forms.
//!
//! A [`Model`] owns every collection directly. Nodes refer to their parent by
//! object id only; [`Model::node`] and [`Model::parent_of`] resolve ids lazily,
//! so forward references and dangling ids never need special handling at
//! parse time.

mod camera;
mod emitter;
mod geoset;
mod info;
mod material;
mod objects;
mod texture;

pub use camera::Camera;
pub use emitter::{HeadOrTail, ParticleEmitter, ParticleEmitter2, ParticleFilterMode, RibbonEmitter};
pub use geoset::{
    check_face_groups, geoset_animation_flags, Geoset, GeosetAnimation, PRIMITIVE_TRIANGLES,
    SELECTION_UNSELECTABLE,
};
pub use info::{ModelInfo, Sequence};
pub use material::{layer_flags, material_flags, FilterMode, Layer, Material};
pub use objects::{
    Attachment, Bone, CollisionShape, EventObject, EventTrack, Helper, Light, LightKind, Shape,
};
pub use texture::{texture_flags, SoundTrack, Texture, TextureAnimation};

use crate::core::{Curve, Node, TrackValue};
use crate::mdx::{
    ATCH, BONE, CAMS, CLID, DEFAULT_VERSION, EVTS, GEOA, GEOS, GLBS, HELP, LITE, MTLS, PIVT,
    PRE2, PREM, RIBB, SEQS, SNDS, TEXS, TXAN,
};
use crate::util::{Frame, Quat, Result, Tag, Vec3};

/// Root of a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub version: u32,
    pub info: ModelInfo,
    pub sequences: Vec<Sequence>,
    /// Global sequence durations, indexed by global sequence id.
    pub global_sequences: Vec<u32>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub sound_tracks: Vec<SoundTrack>,
    pub texture_animations: Vec<TextureAnimation>,
    pub geosets: Vec<Geoset>,
    pub geoset_animations: Vec<GeosetAnimation>,
    pub bones: Vec<Bone>,
    pub lights: Vec<Light>,
    pub helpers: Vec<Helper>,
    pub attachments: Vec<Attachment>,
    /// Pivot point per object id.
    pub pivot_points: Vec<[f32; 3]>,
    pub particle_emitters: Vec<ParticleEmitter>,
    pub particle_emitters2: Vec<ParticleEmitter2>,
    pub ribbon_emitters: Vec<RibbonEmitter>,
    pub cameras: Vec<Camera>,
    pub event_objects: Vec<EventObject>,
    pub collision_shapes: Vec<CollisionShape>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION)
    }
}

/// Borrowed view of any node-carrying object.
#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    Bone(&'a Bone),
    Light(&'a Light),
    Helper(&'a Helper),
    Attachment(&'a Attachment),
    ParticleEmitter(&'a ParticleEmitter),
    ParticleEmitter2(&'a ParticleEmitter2),
    RibbonEmitter(&'a RibbonEmitter),
    EventObject(&'a EventObject),
    CollisionShape(&'a CollisionShape),
}

impl<'a> NodeRef<'a> {
    /// The shared node block.
    pub fn node(self) -> &'a Node {
        match self {
            Self::Bone(o) => &o.node,
            Self::Light(o) => &o.node,
            Self::Helper(o) => &o.node,
            Self::Attachment(o) => &o.node,
            Self::ParticleEmitter(o) => &o.node,
            Self::ParticleEmitter2(o) => &o.node,
            Self::RibbonEmitter(o) => &o.node,
            Self::EventObject(o) => &o.node,
            Self::CollisionShape(o) => &o.node,
        }
    }

    /// Text-form block keyword of the object kind.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Bone(_) => "Bone",
            Self::Light(_) => "Light",
            Self::Helper(_) => "Helper",
            Self::Attachment(_) => "Attachment",
            Self::ParticleEmitter(_) => "ParticleEmitter",
            Self::ParticleEmitter2(_) => "ParticleEmitter2",
            Self::RibbonEmitter(_) => "RibbonEmitter",
            Self::EventObject(_) => "EventObject",
            Self::CollisionShape(_) => "CollisionShape",
        }
    }
}

impl Model {
    /// Empty model of the given format version.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            info: ModelInfo::default(),
            sequences: Vec::new(),
            global_sequences: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            sound_tracks: Vec::new(),
            texture_animations: Vec::new(),
            geosets: Vec::new(),
            geoset_animations: Vec::new(),
            bones: Vec::new(),
            lights: Vec::new(),
            helpers: Vec::new(),
            attachments: Vec::new(),
            pivot_points: Vec::new(),
            particle_emitters: Vec::new(),
            particle_emitters2: Vec::new(),
            ribbon_emitters: Vec::new(),
            cameras: Vec::new(),
            event_objects: Vec::new(),
            collision_shapes: Vec::new(),
        }
    }

    /// Member count per optional top-level chunk, in write order.
    pub fn chunk_counts(&self) -> [(Tag, usize); 19] {
        [
            (SEQS, self.sequences.len()),
            (GLBS, self.global_sequences.len()),
            (MTLS, self.materials.len()),
            (TEXS, self.textures.len()),
            (SNDS, self.sound_tracks.len()),
            (TXAN, self.texture_animations.len()),
            (GEOS, self.geosets.len()),
            (GEOA, self.geoset_animations.len()),
            (BONE, self.bones.len()),
            (LITE, self.lights.len()),
            (HELP, self.helpers.len()),
            (ATCH, self.attachments.len()),
            (PIVT, self.pivot_points.len()),
            (PREM, self.particle_emitters.len()),
            (PRE2, self.particle_emitters2.len()),
            (RIBB, self.ribbon_emitters.len()),
            (CAMS, self.cameras.len()),
            (EVTS, self.event_objects.len()),
            (CLID, self.collision_shapes.len()),
        ]
    }

    // ------------------------------------------------------------------------
    // Node table
    // ------------------------------------------------------------------------

    /// Every node-carrying object, grouped by kind in chunk order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.bones
            .iter()
            .map(NodeRef::Bone)
            .chain(self.lights.iter().map(NodeRef::Light))
            .chain(self.helpers.iter().map(NodeRef::Helper))
            .chain(self.attachments.iter().map(NodeRef::Attachment))
            .chain(self.particle_emitters.iter().map(NodeRef::ParticleEmitter))
            .chain(self.particle_emitters2.iter().map(NodeRef::ParticleEmitter2))
            .chain(self.ribbon_emitters.iter().map(NodeRef::RibbonEmitter))
            .chain(self.event_objects.iter().map(NodeRef::EventObject))
            .chain(self.collision_shapes.iter().map(NodeRef::CollisionShape))
    }

    /// Number of node-carrying objects.
    pub fn node_count(&self) -> usize {
        self.bones.len()
            + self.lights.len()
            + self.helpers.len()
            + self.attachments.len()
            + self.particle_emitters.len()
            + self.particle_emitters2.len()
            + self.ribbon_emitters.len()
            + self.event_objects.len()
            + self.collision_shapes.len()
    }

    /// Look up an object by its object id.
    pub fn node(&self, object_id: u32) -> Option<NodeRef<'_>> {
        self.nodes().find(|n| n.node().object_id == object_id)
    }

    /// Resolve a node's parent. `None` for roots and for parent ids that
    /// match no object.
    pub fn parent_of(&self, object_id: u32) -> Option<NodeRef<'_>> {
        let parent = self.node(object_id)?.node().parent_id?;
        self.node(parent)
    }

    /// `(object_id, parent_id)` of every node whose parent id resolves to
    /// nothing. Such nodes behave as roots.
    pub fn dangling_parents(&self) -> Vec<(u32, u32)> {
        self.nodes()
            .filter_map(|n| {
                let node = n.node();
                let parent = node.parent_id?;
                self.node(parent).is_none().then_some((node.object_id, parent))
            })
            .collect()
    }

    /// Pivot point of an object, or the origin if none is stored.
    pub fn pivot_of(&self, object_id: u32) -> [f32; 3] {
        self.pivot_points.get(object_id as usize).copied().unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Sample a curve, mapping `frame` onto its global sequence if it has
    /// one.
    pub fn sample_curve<const N: usize, V: TrackValue>(
        &self,
        curve: &Curve<N, V>,
        frame: Frame,
    ) -> Result<Option<[V; N]>> {
        let frame = match curve.global_sequence_id.and_then(|id| self.global_sequences.get(id as usize)) {
            Some(&duration) if duration > 0 => frame.rem_euclid(duration as Frame),
            Some(_) => 0,
            None => frame,
        };
        curve.sample_at(frame)
    }

    /// Translation of a node at `frame`, inherited from the parent chain
    /// while the local curve is empty. Zero when nothing is animated.
    pub fn translation_at(&self, object_id: u32, frame: Frame) -> Result<Vec3> {
        let v = self.inherited(object_id, frame, |n| (&n.translation, n.inherits_translation()))?;
        Ok(v.map(Vec3::from).unwrap_or(Vec3::ZERO))
    }

    /// Rotation of a node at `frame`. Identity when nothing is animated.
    pub fn rotation_at(&self, object_id: u32, frame: Frame) -> Result<Quat> {
        let v = self.inherited(object_id, frame, |n| (&n.rotation, n.inherits_rotation()))?;
        Ok(v.map(|q| Quat::from_array(q).normalize()).unwrap_or(Quat::IDENTITY))
    }

    /// Scaling of a node at `frame`. One when nothing is animated.
    pub fn scaling_at(&self, object_id: u32, frame: Frame) -> Result<Vec3> {
        let v = self.inherited(object_id, frame, |n| (&n.scaling, n.inherits_scaling()))?;
        Ok(v.map(Vec3::from).unwrap_or(Vec3::ONE))
    }

    fn inherited<const N: usize>(
        &self,
        object_id: u32,
        frame: Frame,
        track: impl Fn(&Node) -> (&Curve<N, f32>, bool),
    ) -> Result<Option<[f32; N]>> {
        let mut current = self.node(object_id).map(NodeRef::node);
        // A parent cycle can visit at most every node once.
        let mut budget = self.node_count();
        while let Some(node) = current {
            let (curve, inherits) = track(node);
            if let Some(v) = self.sample_curve(curve, frame)? {
                return Ok(Some(v));
            }
            if !inherits || budget == 0 {
                break;
            }
            budget -= 1;
            current = node.parent_id.and_then(|p| self.node(p)).map(NodeRef::node);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Interpolation, NodeFlags, Vec3Curve};

    fn rig() -> Model {
        let mut root = Bone::new("root", 0);
        root.node.translation = Vec3Curve::new(Interpolation::Linear);
        root.node.translation.push(0, [0.0, 0.0, 0.0]).push(100, [10.0, 0.0, 0.0]);

        let mut child = Bone::new("child", 1);
        child.node.parent_id = Some(0);

        let mut orphan = Helper { node: Node::new("orphan", 2, NodeFlags::empty()) };
        orphan.node.parent_id = Some(42);

        let mut m = Model::default();
        m.bones = vec![root, child];
        m.helpers = vec![orphan];
        m.pivot_points = vec![[0.0; 3], [1.0, 2.0, 3.0], [0.0; 3]];
        m
    }

    #[test]
    fn test_bone_scenario() {
        let m = rig();
        assert_eq!(m.translation_at(0, 50).unwrap(), Vec3::new(5.0, 0.0, 0.0));
        let root = m.node(0).unwrap();
        assert_eq!(root.kind(), "Bone");
        assert!(root.node().parent_id.is_none());
    }

    #[test]
    fn test_node_lookup_and_parents() {
        let m = rig();
        assert_eq!(m.node_count(), 3);
        assert_eq!(m.parent_of(1).unwrap().node().name, "root");
        assert!(m.parent_of(0).is_none());
        assert!(m.parent_of(2).is_none());
        assert_eq!(m.dangling_parents(), vec![(2, 42)]);
        assert_eq!(m.pivot_of(1), [1.0, 2.0, 3.0]);
        assert_eq!(m.pivot_of(99), [0.0; 3]);
    }

    #[test]
    fn test_inherit_fallback() {
        let mut m = rig();
        assert_eq!(m.translation_at(1, 50).unwrap(), Vec3::new(5.0, 0.0, 0.0));
        m.bones[1].node.flags.set(NodeFlags::DONT_INHERIT_TRANSLATION, true);
        assert_eq!(m.translation_at(1, 50).unwrap(), Vec3::ZERO);
        assert_eq!(m.scaling_at(1, 50).unwrap(), Vec3::ONE);
        assert_eq!(m.rotation_at(1, 50).unwrap(), Quat::IDENTITY);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let mut m = rig();
        m.bones[0].node.translation = Vec3Curve::default();
        m.bones[0].node.parent_id = Some(1);
        assert_eq!(m.translation_at(1, 10).unwrap(), Vec3::ZERO);
    }

    #[test]
    fn test_global_sequence_wraps() {
        let mut m = Model::default();
        m.global_sequences = vec![100];
        let mut c = Vec3Curve::new(Interpolation::Linear);
        c.push(0, [0.0; 3]).push(100, [10.0, 0.0, 0.0]);
        c.global_sequence_id = Some(0);
        assert_eq!(m.sample_curve(&c, 250).unwrap(), Some([5.0, 0.0, 0.0]));
        c.global_sequence_id = None;
        assert_eq!(m.sample_curve(&c, 250).unwrap(), Some([10.0, 0.0, 0.0]));
    }

    #[test]
    fn test_chunk_counts() {
        let m = rig();
        let counts = m.chunk_counts();
        assert!(counts.contains(&(BONE, 2)));
        assert!(counts.contains(&(HELP, 1)));
        assert!(counts.contains(&(SEQS, 0)));
    }
}
