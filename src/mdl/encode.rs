//! Model to text.

use std::fmt::Display;

use super::render::{Renderer, TextOptions, Vector};
use crate::core::{Curve, Node, NodeFlags, TrackValue};
use crate::model::*;
use crate::util::{Extent, Result};

/// Keywords of face primitive types, indexed by type id.
pub(super) const PRIMITIVE_KEYWORDS: [&str; 10] = [
    "Points",
    "Lines",
    "LineLoop",
    "LineStrip",
    "Triangles",
    "TriangleStrip",
    "TriangleFan",
    "Quads",
    "QuadStrip",
    "Polygons",
];

pub fn render(model: &Model, options: &TextOptions) -> Result<String> {
    let mut r = Renderer::new(options);
    if options.header_comment {
        r.comment(&format!("Exported by mdlx {}", env!("CARGO_PKG_VERSION")));
    }

    r.open("Version");
    r.field("FormatVersion", model.version);
    r.close();
    header(&mut r, model);

    counted(&mut r, "Sequences", &model.sequences, sequence);
    counted(&mut r, "GlobalSequences", &model.global_sequences, |r, d| r.field("Duration", d));
    counted(&mut r, "Textures", &model.textures, texture);
    counted(&mut r, "SoundTracks", &model.sound_tracks, sound_track);
    counted(&mut r, "Materials", &model.materials, material);
    counted(&mut r, "TextureAnims", &model.texture_animations, |r, t| {
        r.open("TVertexAnim");
        track(r, "Translation", &t.translation);
        track(r, "Rotation", &t.rotation);
        track(r, "Scaling", &t.scaling);
        r.close();
    });

    model.geosets.iter().for_each(|g| geoset(&mut r, g));
    model.geoset_animations.iter().for_each(|a| geoset_animation(&mut r, a));
    model.bones.iter().for_each(|b| bone(&mut r, b));
    model.lights.iter().for_each(|l| light(&mut r, l));
    for h in &model.helpers {
        open_node(&mut r, "Helper", &h.node, &[]);
        node_tracks(&mut r, &h.node);
        r.close();
    }
    model.attachments.iter().for_each(|a| attachment(&mut r, a));
    counted(&mut r, "PivotPoints", &model.pivot_points, |r, p| r.vector(p));
    model.particle_emitters.iter().for_each(|e| particle_emitter(&mut r, e));
    model.particle_emitters2.iter().for_each(|e| particle_emitter2(&mut r, e));
    model.ribbon_emitters.iter().for_each(|e| ribbon_emitter(&mut r, e));
    model.cameras.iter().for_each(|c| camera(&mut r, c));
    model.event_objects.iter().for_each(|e| event_object(&mut r, e));
    model.collision_shapes.iter().for_each(|c| collision_shape(&mut r, c));
    r.finish()
}

/// `Keyword N { members }`, left out when empty.
fn counted<T>(r: &mut Renderer, keyword: &str, members: &[T], mut each: impl FnMut(&mut Renderer, &T)) {
    if members.is_empty() {
        return;
    }
    r.open(format_args!("{} {}", keyword, members.len()));
    for m in members {
        each(r, m);
    }
    r.close();
}

fn header(r: &mut Renderer, m: &Model) {
    let info = &m.info;
    r.open_named("Model", &info.name);
    let counters = [
        ("NumGeosets", m.geosets.len()),
        ("NumGeosetAnims", m.geoset_animations.len()),
        ("NumHelpers", m.helpers.len()),
        ("NumLights", m.lights.len()),
        ("NumBones", m.bones.len()),
        ("NumAttachments", m.attachments.len()),
        ("NumParticleEmitters", m.particle_emitters.len()),
        ("NumParticleEmitters2", m.particle_emitters2.len()),
        ("NumRibbonEmitters", m.ribbon_emitters.len()),
        ("NumEvents", m.event_objects.len()),
    ];
    for (key, n) in counters {
        r.field_or(key, n, 0);
    }
    r.field("BlendTime", info.blend_time);
    extent(r, &info.extent);
    r.string_or_empty("AnimationFile", &info.animation_file);
    r.close();
}

fn extent(r: &mut Renderer, e: &Extent) {
    let d = Extent::default();
    r.array_or("MinimumExtent", &e.min, &d.min);
    r.array_or("MaximumExtent", &e.max, &d.max);
    r.field_or("BoundsRadius", e.bounds_radius, d.bounds_radius);
}

/// Flag bits other than `NonLooping` go out as a plain `Flags` number.
fn sequence(r: &mut Renderer, s: &Sequence) {
    let d = Sequence::default();
    r.open_named("Anim", &s.name);
    r.array("Interval", &s.interval);
    r.flag("NonLooping", s.non_looping());
    r.field_or("Flags", s.flags & !Sequence::FLAG_NON_LOOPING, d.flags);
    r.field_or("MoveSpeed", s.move_speed, d.move_speed);
    r.field_or("Rarity", s.rarity, d.rarity);
    r.field_or("SyncPoint", s.sync_point, d.sync_point);
    extent(r, &s.extent);
    r.close();
}

fn texture(r: &mut Renderer, t: &Texture) {
    let d = Texture::default();
    r.open("Bitmap");
    r.string_or_empty("Image", &t.path);
    r.field_or("ReplaceableId", t.replaceable_id, d.replaceable_id);
    r.flags(t.flags, &texture_flags::KEYWORDS);
    r.close();
}

fn sound_track(r: &mut Renderer, s: &SoundTrack) {
    let d = SoundTrack::default();
    r.open_named("SoundTrack", &s.path);
    r.field_or("Volume", s.volume, d.volume);
    r.field_or("Pitch", s.pitch, d.pitch);
    r.field_or("Flags", s.flags, d.flags);
    r.close();
}

fn material(r: &mut Renderer, m: &Material) {
    let d = Material::default();
    r.open("Material");
    r.flags(m.flags, &material_flags::KEYWORDS);
    r.field_or("PriorityPlane", m.priority_plane, d.priority_plane);
    r.string_or_empty("Shader", &m.shader);
    m.layers.iter().for_each(|l| layer(r, l));
    r.close();
}

fn layer(r: &mut Renderer, l: &Layer) {
    let d = Layer::default();
    r.open("Layer");
    r.field("FilterMode", l.filter_mode.keyword());
    r.flags(l.flags, &layer_flags::KEYWORDS);
    r.line(format_args!("static TextureID {},", l.texture_id));
    track(r, "TextureID", &l.texture_id_track);
    r.optional_id("TVertexAnimId", l.texture_animation_id);
    r.field_or("CoordId", l.coord_id, d.coord_id);
    r.static_or("Alpha", l.alpha, d.alpha);
    track(r, "Alpha", &l.alpha_track);
    r.static_or("EmissiveGain", l.emissive_gain, d.emissive_gain);
    track(r, "EmissiveGain", &l.emissive_gain_track);
    r.static_array_or("FresnelColor", &l.fresnel_color, &d.fresnel_color);
    track(r, "FresnelColor", &l.fresnel_color_track);
    r.static_or("FresnelOpacity", l.fresnel_opacity, d.fresnel_opacity);
    track(r, "FresnelOpacity", &l.fresnel_alpha_track);
    r.static_or("FresnelTeamColor", l.fresnel_team_color, d.fresnel_team_color);
    track(r, "FresnelTeamColor", &l.fresnel_team_color_track);
    r.close();
}

/// `Name count { Interpolation, GlobalSeqId id, frame: value, ... }`
fn track<const N: usize, V: TrackValue>(r: &mut Renderer, key: &str, curve: &Curve<N, V>) {
    if curve.is_empty() {
        return;
    }
    r.open(format_args!("{} {}", key, curve.len()));
    r.flag(curve.interpolation.keyword(), true);
    r.optional_id("GlobalSeqId", curve.global_sequence_id);
    for k in &curve.keys {
        r.line(format_args!("{}: {},", k.frame, Literal(&k.value)));
        if curve.interpolation.has_tangents() {
            r.field("InTan", Literal(&k.in_tan));
            r.field("OutTan", Literal(&k.out_tan));
        }
    }
    r.close();
}

/// A track value: bare for scalars, a vector literal otherwise.
struct Literal<'a, V>(&'a [V]);

impl<V: Display> Display for Literal<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            [single] => write!(f, "{}", single),
            many => write!(f, "{}", Vector(many)),
        }
    }
}

fn geoset(r: &mut Renderer, g: &Geoset) {
    let d = Geoset::default();
    r.open("Geoset");
    vectors(r, "Vertices", &g.vertices);
    vectors(r, "Normals", &g.normals);
    for set in &g.uv_sets {
        r.open(format_args!("TVertices {}", set.len()));
        set.iter().for_each(|uv| r.vector(uv));
        r.close();
    }
    if !g.tangents.is_empty() {
        vectors(r, "Tangents", &g.tangents);
    }
    if !g.skin.is_empty() {
        r.field(&format!("SkinWeights {}", g.skin.len()), Vector(g.skin.as_slice()));
    }
    r.array("VertexGroup", &g.vertex_groups);

    r.open(format_args!("Faces {} {}", g.face_groups.len(), g.faces.len()));
    let mut at = 0usize;
    for (&kind, &count) in g.face_types.iter().zip(&g.face_groups) {
        let end = (at + count as usize).min(g.faces.len());
        match PRIMITIVE_KEYWORDS.get(kind as usize) {
            Some(keyword) => r.open(keyword),
            None => r.open(format_args!("Primitive {}", kind)),
        }
        r.vector(&g.faces[at..end]);
        r.close();
        at = end;
    }
    r.close();

    let groups = g.matrix_groups();
    r.open(format_args!("Groups {} {}", groups.len(), g.matrix_indices.len()));
    groups.iter().for_each(|m| r.array("Matrices", *m));
    r.close();

    extent(r, &g.extent);
    for e in &g.sequence_extents {
        r.open("Anim");
        extent(r, e);
        r.close();
    }
    r.field_or("MaterialID", g.material_id, d.material_id);
    r.field_or("SelectionGroup", g.selection_group, d.selection_group);
    r.flag("Unselectable", g.is_unselectable());
    r.field_or("SelectionFlags", g.selection_flags & !SELECTION_UNSELECTABLE, d.selection_flags);
    r.field_or("LevelOfDetail", g.lod, d.lod);
    r.string_or_empty("Name", &g.lod_name);
    r.close();
}

fn vectors<T: Display, const N: usize>(r: &mut Renderer, key: &str, items: &[[T; N]]) {
    r.open(format_args!("{} {}", key, items.len()));
    items.iter().for_each(|v| r.vector(v));
    r.close();
}

/// Color is written exactly when the color flag is set.
fn geoset_animation(r: &mut Renderer, a: &GeosetAnimation) {
    let d = GeosetAnimation::default();
    r.open("GeosetAnim");
    r.flag("DropShadow", a.drop_shadow());
    r.static_or("Alpha", a.alpha, d.alpha);
    track(r, "Alpha", &a.alpha_track);
    if a.uses_color() {
        r.line(format_args!("static Color {},", Vector(&a.color)));
        track(r, "Color", &a.color_track);
    }
    r.optional_id("GeosetId", a.geoset_id);
    r.close();
}

/// `Kind "name" {` plus ids and node flags.
fn open_node(r: &mut Renderer, kind: &str, node: &Node, extra: &[(u32, &str)]) {
    r.open_named(kind, &node.name);
    r.field("ObjectId", node.object_id);
    r.optional_id("Parent", node.parent_id);
    let bits = node.flags.bits();
    r.flags(bits, &NodeFlags::KEYWORDS);
    r.flags(bits, extra);
    let dont_inherit = NodeFlags::DONT_INHERIT_KEYWORDS.iter().filter(|(bit, _)| bits & bit == *bit);
    let names: Vec<&str> = dont_inherit.map(|(_, key)| *key).collect();
    if !names.is_empty() {
        r.line(format_args!("DontInherit {{ {} }},", names.join(", ")));
    }
}

fn node_tracks(r: &mut Renderer, node: &Node) {
    track(r, "Translation", &node.translation);
    track(r, "Rotation", &node.rotation);
    track(r, "Scaling", &node.scaling);
}

fn bone(r: &mut Renderer, b: &Bone) {
    open_node(r, "Bone", &b.node, &[]);
    r.optional_id_or("GeosetId", b.geoset_id, "Multiple");
    r.optional_id_or("GeosetAnimId", b.geoset_animation_id, "None");
    node_tracks(r, &b.node);
    r.close();
}

fn light(r: &mut Renderer, l: &Light) {
    let d = Light::default();
    open_node(r, "Light", &l.node, &[]);
    r.flag(l.kind.keyword(), true);
    r.static_or("AttenuationStart", l.attenuation[0], d.attenuation[0]);
    track(r, "AttenuationStart", &l.attenuation_start_track);
    r.static_or("AttenuationEnd", l.attenuation[1], d.attenuation[1]);
    track(r, "AttenuationEnd", &l.attenuation_end_track);
    r.static_or("Intensity", l.intensity, d.intensity);
    track(r, "Intensity", &l.intensity_track);
    r.static_array_or("Color", &l.color, &d.color);
    track(r, "Color", &l.color_track);
    r.static_or("AmbIntensity", l.ambient_intensity, d.ambient_intensity);
    track(r, "AmbIntensity", &l.ambient_intensity_track);
    r.static_array_or("AmbColor", &l.ambient_color, &d.ambient_color);
    track(r, "AmbColor", &l.ambient_color_track);
    track(r, "Visibility", &l.visibility);
    node_tracks(r, &l.node);
    r.close();
}

fn attachment(r: &mut Renderer, a: &Attachment) {
    let d = Attachment::default();
    open_node(r, "Attachment", &a.node, &[]);
    r.field_or("AttachmentID", a.attachment_id, d.attachment_id);
    r.string_or_empty("Path", &a.path);
    track(r, "Visibility", &a.visibility);
    node_tracks(r, &a.node);
    r.close();
}

fn particle_emitter(r: &mut Renderer, e: &ParticleEmitter) {
    let d = ParticleEmitter::default();
    open_node(r, "ParticleEmitter", &e.node, &NodeFlags::EMITTER_KEYWORDS);
    r.static_or("EmissionRate", e.emission_rate, d.emission_rate);
    track(r, "EmissionRate", &e.emission_rate_track);
    r.static_or("Gravity", e.gravity, d.gravity);
    track(r, "Gravity", &e.gravity_track);
    r.static_or("Longitude", e.longitude, d.longitude);
    track(r, "Longitude", &e.longitude_track);
    r.static_or("Latitude", e.latitude, d.latitude);
    track(r, "Latitude", &e.latitude_track);
    r.static_or("LifeSpan", e.lifespan, d.lifespan);
    track(r, "LifeSpan", &e.lifespan_track);
    r.static_or("InitVelocity", e.speed, d.speed);
    track(r, "InitVelocity", &e.speed_track);
    r.string_or_empty("Path", &e.path);
    track(r, "Visibility", &e.visibility);
    node_tracks(r, &e.node);
    r.close();
}

fn particle_emitter2(r: &mut Renderer, e: &ParticleEmitter2) {
    let d = ParticleEmitter2::default();
    open_node(r, "ParticleEmitter2", &e.node, &NodeFlags::EMITTER2_KEYWORDS);
    r.static_or("Speed", e.speed, d.speed);
    track(r, "Speed", &e.speed_track);
    r.static_or("Variation", e.variation, d.variation);
    track(r, "Variation", &e.variation_track);
    r.static_or("Latitude", e.latitude, d.latitude);
    track(r, "Latitude", &e.latitude_track);
    r.static_or("Gravity", e.gravity, d.gravity);
    track(r, "Gravity", &e.gravity_track);
    r.static_or("EmissionRate", e.emission_rate, d.emission_rate);
    track(r, "EmissionRate", &e.emission_rate_track);
    r.static_or("Width", e.width, d.width);
    track(r, "Width", &e.width_track);
    r.static_or("Length", e.length, d.length);
    track(r, "Length", &e.length_track);
    track(r, "Visibility", &e.visibility);

    r.flag(e.filter_mode.keyword(), true);
    r.field_or("LifeSpan", e.lifespan, d.lifespan);
    r.field_or("Rows", e.rows, d.rows);
    r.field_or("Columns", e.columns, d.columns);
    r.flag(e.head_or_tail.keyword(), true);
    r.field_or("TailLength", e.tail_length, d.tail_length);
    r.field_or("Time", e.time, d.time);
    r.open("SegmentColor");
    e.segment_colors.iter().for_each(|c| r.array("Color", c));
    r.close();
    r.array("Alpha", &e.segment_alphas);
    r.array("ParticleScaling", &e.segment_scaling);
    r.array("LifeSpanUVAnim", &e.head_intervals[0]);
    r.array("DecayUVAnim", &e.head_intervals[1]);
    r.array("TailUVAnim", &e.tail_intervals[0]);
    r.array("TailDecayUVAnim", &e.tail_intervals[1]);
    r.optional_id("TextureID", e.texture_id);
    r.flag("Squirt", e.squirt);
    r.field_or("PriorityPlane", e.priority_plane, d.priority_plane);
    r.field_or("ReplaceableId", e.replaceable_id, d.replaceable_id);
    node_tracks(r, &e.node);
    r.close();
}

fn ribbon_emitter(r: &mut Renderer, e: &RibbonEmitter) {
    let d = RibbonEmitter::default();
    open_node(r, "RibbonEmitter", &e.node, &[]);
    r.static_or("HeightAbove", e.height_above, d.height_above);
    track(r, "HeightAbove", &e.height_above_track);
    r.static_or("HeightBelow", e.height_below, d.height_below);
    track(r, "HeightBelow", &e.height_below_track);
    r.static_or("Alpha", e.alpha, d.alpha);
    track(r, "Alpha", &e.alpha_track);
    r.static_array_or("Color", &e.color, &d.color);
    track(r, "Color", &e.color_track);
    r.static_or("TextureSlot", e.texture_slot, d.texture_slot);
    track(r, "TextureSlot", &e.texture_slot_track);
    track(r, "Visibility", &e.visibility);
    r.field_or("LifeSpan", e.lifespan, d.lifespan);
    r.field_or("EmissionRate", e.emission_rate, d.emission_rate);
    r.field_or("Rows", e.rows, d.rows);
    r.field_or("Columns", e.columns, d.columns);
    r.optional_id("MaterialID", e.material_id);
    r.field_or("Gravity", e.gravity, d.gravity);
    node_tracks(r, &e.node);
    r.close();
}

fn camera(r: &mut Renderer, c: &Camera) {
    let d = Camera::default();
    r.open_named("Camera", &c.name);
    r.array_or("Position", &c.position, &d.position);
    track(r, "Translation", &c.translation);
    track(r, "Rotation", &c.rotation);
    r.field_or("FieldOfView", c.field_of_view, d.field_of_view);
    r.field_or("FarClip", c.far_clip, d.far_clip);
    r.field_or("NearClip", c.near_clip, d.near_clip);
    r.open("Target");
    r.array_or("Position", &c.target_position, &d.target_position);
    track(r, "Translation", &c.target_translation);
    r.close();
    r.close();
}

fn event_object(r: &mut Renderer, e: &EventObject) {
    open_node(r, "EventObject", &e.node, &[]);
    if let Some(t) = &e.track {
        r.field(&format!("EventTrack {}", t.frames.len()), Vector(t.frames.as_slice()));
        r.optional_id("GlobalSeqId", t.global_sequence_id);
    }
    node_tracks(r, &e.node);
    r.close();
}

fn collision_shape(r: &mut Renderer, c: &CollisionShape) {
    open_node(r, "CollisionShape", &c.node, &[]);
    r.flag(c.shape.keyword(), true);
    let vertices = c.shape.vertices();
    vectors(r, "Vertices", &vertices);
    if let Some(radius) = c.shape.radius() {
        r.field("BoundsRadius", radius);
    }
    node_tracks(r, &c.node);
    r.close();
}
