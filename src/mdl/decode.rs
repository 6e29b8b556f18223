//! Syntax tree to model.
//!
//! Every absent field takes the default the renderer omits it at. Unknown
//! keywords inside a known block are ignored; unknown top-level blocks are
//! skipped with a warning.

use tracing::{trace, warn};

use super::encode::PRIMITIVE_KEYWORDS;
use super::tree::{parse_number, Entry, Property};
use crate::core::{Curve, Interpolation, Keyframe, Node, NodeFlags, TrackValue};
use crate::mdx::DEFAULT_VERSION;
use crate::model::*;
use crate::util::{Extent, Frame, Result};

pub fn model(document: &[Property]) -> Result<Model> {
    let mut m = Model::new(DEFAULT_VERSION);
    for block in document {
        trace!(block = %block.key, line = block.pos.line, "text block");
        match block.key.as_str() {
            "Version" => m.version = block.get_or("FormatVersion", DEFAULT_VERSION)?,
            "Model" => m.info = header(block)?,
            "Sequences" => m.sequences = counted(block, "Anim", sequence)?,
            "GlobalSequences" => m.global_sequences = counted(block, "Duration", |p| p.number())?,
            "Textures" => m.textures = counted(block, "Bitmap", texture)?,
            "SoundTracks" => m.sound_tracks = counted(block, "SoundTrack", sound_track)?,
            "Materials" => m.materials = counted(block, "Material", material)?,
            "TextureAnims" => m.texture_animations = counted(block, "TVertexAnim", texture_animation)?,
            "Geoset" => m.geosets.push(geoset(block)?),
            "GeosetAnim" => m.geoset_animations.push(geoset_animation(block)?),
            "Bone" => m.bones.push(bone(block)?),
            "Light" => m.lights.push(light(block)?),
            "Helper" => m.helpers.push(Helper { node: node(block, NodeFlags::empty(), &[])? }),
            "Attachment" => m.attachments.push(attachment(block)?),
            "PivotPoints" => {
                let points = block.vectors()?;
                check_count(block, points.len());
                m.pivot_points = points;
            }
            "ParticleEmitter" => m.particle_emitters.push(particle_emitter(block)?),
            "ParticleEmitter2" => m.particle_emitters2.push(particle_emitter2(block)?),
            "RibbonEmitter" => m.ribbon_emitters.push(ribbon_emitter(block)?),
            "Camera" => m.cameras.push(camera(block)?),
            "EventObject" => m.event_objects.push(event_object(block)?),
            "CollisionShape" => m.collision_shapes.push(collision_shape(block)?),
            other => warn!(block = other, line = block.pos.line, "skipping unknown block"),
        }
    }
    Ok(m)
}

fn check_count(block: &Property, found: usize) {
    if let Some(declared) = block.count() {
        if declared != found {
            warn!(block = %block.key, line = block.pos.line, declared, found, "member count mismatch");
        }
    }
}

/// Members of a counted block, in order.
fn counted<T>(block: &Property, member: &str, each: impl Fn(&Property) -> Result<T>) -> Result<Vec<T>> {
    let members = block.all(member).map(each).collect::<Result<Vec<_>>>()?;
    check_count(block, members.len());
    Ok(members)
}

fn extent(p: &Property) -> Result<Extent> {
    let d = Extent::default();
    Ok(Extent {
        bounds_radius: p.get_or("BoundsRadius", d.bounds_radius)?,
        min: p.array_or("MinimumExtent", d.min)?,
        max: p.array_or("MaximumExtent", d.max)?,
    })
}

fn header(p: &Property) -> Result<ModelInfo> {
    let d = ModelInfo::default();
    Ok(ModelInfo {
        name: p.name()?.to_owned(),
        animation_file: p.string_or("AnimationFile")?,
        extent: extent(p)?,
        blend_time: p.get_or("BlendTime", d.blend_time)?,
    })
}

fn sequence(p: &Property) -> Result<Sequence> {
    let d = Sequence::default();
    let interval = p.child("Interval").ok_or_else(|| p.error("missing Interval"))?;
    let mut flags = p.get_or("Flags", d.flags)?;
    if p.has_flag("NonLooping") {
        flags |= Sequence::FLAG_NON_LOOPING;
    }
    Ok(Sequence {
        name: p.name()?.to_owned(),
        interval: interval.array()?,
        move_speed: p.get_or("MoveSpeed", d.move_speed)?,
        flags,
        rarity: p.get_or("Rarity", d.rarity)?,
        sync_point: p.get_or("SyncPoint", d.sync_point)?,
        extent: extent(p)?,
    })
}

fn texture(p: &Property) -> Result<Texture> {
    let d = Texture::default();
    Ok(Texture {
        replaceable_id: p.get_or("ReplaceableId", d.replaceable_id)?,
        path: p.string_or("Image")?,
        flags: p.flags(&texture_flags::KEYWORDS),
    })
}

fn sound_track(p: &Property) -> Result<SoundTrack> {
    let d = SoundTrack::default();
    Ok(SoundTrack {
        path: p.name()?.to_owned(),
        volume: p.get_or("Volume", d.volume)?,
        pitch: p.get_or("Pitch", d.pitch)?,
        flags: p.get_or("Flags", d.flags)?,
    })
}

fn material(p: &Property) -> Result<Material> {
    let d = Material::default();
    Ok(Material {
        priority_plane: p.get_or("PriorityPlane", d.priority_plane)?,
        flags: p.flags(&material_flags::KEYWORDS),
        shader: p.string_or("Shader")?,
        layers: p.all("Layer").map(layer).collect::<Result<_>>()?,
    })
}

fn layer(p: &Property) -> Result<Layer> {
    let d = Layer::default();
    let filter = p.child("FilterMode").map_or(Ok(d.filter_mode), |f| {
        let keyword = f.ident()?;
        FilterMode::from_keyword(keyword).ok_or_else(|| f.error(format!("unknown filter mode {}", keyword)))
    })?;
    Ok(Layer {
        filter_mode: filter,
        flags: p.flags(&layer_flags::KEYWORDS),
        texture_id: p.get_or("TextureID", d.texture_id)?,
        texture_animation_id: p.optional_id("TVertexAnimId")?,
        coord_id: p.get_or("CoordId", d.coord_id)?,
        alpha: p.get_or("Alpha", d.alpha)?,
        emissive_gain: p.get_or("EmissiveGain", d.emissive_gain)?,
        fresnel_color: p.array_or("FresnelColor", d.fresnel_color)?,
        fresnel_opacity: p.get_or("FresnelOpacity", d.fresnel_opacity)?,
        fresnel_team_color: p.get_or("FresnelTeamColor", d.fresnel_team_color)?,
        texture_id_track: track(p, "TextureID")?,
        alpha_track: track(p, "Alpha")?,
        emissive_gain_track: track(p, "EmissiveGain")?,
        fresnel_color_track: track(p, "FresnelColor")?,
        fresnel_alpha_track: track(p, "FresnelOpacity")?,
        fresnel_team_color_track: track(p, "FresnelTeamColor")?,
    })
}

fn texture_animation(p: &Property) -> Result<TextureAnimation> {
    Ok(TextureAnimation {
        translation: track(p, "Translation")?,
        rotation: track(p, "Rotation")?,
        scaling: track(p, "Scaling")?,
    })
}

/// The animated form of `key`, or an empty curve.
fn track<const N: usize, V: TrackValue>(p: &Property, key: &str) -> Result<Curve<N, V>> {
    match p.track_child(key) {
        Some(t) => curve(t),
        None => Ok(Curve::default()),
    }
}

fn curve<const N: usize, V: TrackValue>(p: &Property) -> Result<Curve<N, V>> {
    let mut curve = Curve::<N, V>::default();
    for entry in p.entries() {
        match entry {
            Entry::Key { frame, value, pos } => {
                let frame: Frame = parse_number(frame, *pos)?;
                curve.keys.push(Keyframe::new(frame, value.parse_array(*pos)?));
            }
            Entry::Property(c) if c.key == "GlobalSeqId" => curve.global_sequence_id = Some(c.number()?),
            Entry::Property(c) if c.key == "InTan" || c.key == "OutTan" => {
                let key = curve.keys.last_mut().ok_or_else(|| c.error("tangent before any keyframe"))?;
                let tangent = c.array()?;
                if c.key == "InTan" {
                    key.in_tan = tangent;
                } else {
                    key.out_tan = tangent;
                }
            }
            Entry::Property(c) => {
                curve.interpolation = Interpolation::from_keyword(&c.key)
                    .ok_or_else(|| c.error("unknown interpolation or track entry"))?;
            }
            Entry::Value(_, pos) => return Err(pos.error(format!("{}: expected a keyframe", p.key))),
        }
    }
    check_count(p, curve.len());
    Ok(curve)
}

fn geoset(p: &Property) -> Result<Geoset> {
    let d = Geoset::default();
    let list = |key: &str| p.child(key).ok_or_else(|| p.error(format!("missing {}", key)));
    let mut g = Geoset {
        vertices: list("Vertices")?.vectors()?,
        normals: list("Normals")?.vectors()?,
        ..Default::default()
    };
    for set in p.all("TVertices") {
        g.uv_sets.push(set.vectors()?);
    }
    if let Some(t) = p.child("Tangents") {
        g.tangents = t.vectors()?;
    }
    if let Some(s) = p.child("SkinWeights") {
        g.skin = s.numbers()?;
    }
    if let Some(v) = p.child("VertexGroup") {
        g.vertex_groups = v.numbers()?;
    }

    let faces = list("Faces")?;
    for group in faces.children() {
        let kind = match PRIMITIVE_KEYWORDS.iter().position(|k| *k == group.key) {
            Some(i) => i as u32,
            None if group.key == "Primitive" => group.number()?,
            None => return Err(group.error("unknown primitive type")),
        };
        let mut count = 0u32;
        for entry in group.entries() {
            if let Entry::Value(value, pos) = entry {
                let indices: Vec<u16> = value.numbers(*pos)?;
                count += indices.len() as u32;
                g.faces.extend(indices);
            }
        }
        g.face_types.push(kind);
        g.face_groups.push(count);
    }

    if let Some(groups) = p.child("Groups") {
        for matrices in groups.all("Matrices") {
            let indices: Vec<u32> = matrices.numbers()?;
            g.matrix_group_sizes.push(indices.len() as u32);
            g.matrix_indices.extend(indices);
        }
        check_count(groups, g.matrix_group_sizes.len());
    }

    g.extent = extent(p)?;
    g.sequence_extents = p.all("Anim").map(extent).collect::<Result<_>>()?;
    g.material_id = p.get_or("MaterialID", d.material_id)?;
    g.selection_group = p.get_or("SelectionGroup", d.selection_group)?;
    g.selection_flags = p.get_or("SelectionFlags", d.selection_flags)?;
    if p.has_flag("Unselectable") {
        g.selection_flags |= SELECTION_UNSELECTABLE;
    }
    g.lod = p.get_or("LevelOfDetail", d.lod)?;
    g.lod_name = p.string_or("Name")?;
    Ok(g)
}

fn geoset_animation(p: &Property) -> Result<GeosetAnimation> {
    let d = GeosetAnimation::default();
    let mut flags = 0;
    if p.has_flag("DropShadow") {
        flags |= geoset_animation_flags::DROP_SHADOW;
    }
    if p.has_flag("Color") {
        flags |= geoset_animation_flags::COLOR;
    }
    Ok(GeosetAnimation {
        alpha: p.get_or("Alpha", d.alpha)?,
        flags,
        color: p.array_or("Color", d.color)?,
        geoset_id: p.optional_id("GeosetId")?,
        alpha_track: track(p, "Alpha")?,
        color_track: track(p, "Color")?,
    })
}

/// Node fields of a `Kind "name" { ... }` block.
///
/// The object type bit comes from the block kind, not from the text.
fn node(p: &Property, kind: NodeFlags, extra: &[(u32, &str)]) -> Result<Node> {
    let mut flags = kind.bits() | p.flags(&NodeFlags::KEYWORDS) | p.flags(extra);
    if let Some(d) = p.child("DontInherit") {
        flags |= d.flags(&NodeFlags::DONT_INHERIT_KEYWORDS);
    }
    Ok(Node {
        name: p.name()?.to_owned(),
        object_id: p.field("ObjectId")?,
        parent_id: p.optional_id("Parent")?,
        flags: NodeFlags::from_bits_retain(flags),
        translation: track(p, "Translation")?,
        rotation: track(p, "Rotation")?,
        scaling: track(p, "Scaling")?,
    })
}

fn bone(p: &Property) -> Result<Bone> {
    Ok(Bone {
        node: node(p, NodeFlags::BONE, &[])?,
        geoset_id: p.optional_id("GeosetId")?,
        geoset_animation_id: p.optional_id("GeosetAnimId")?,
    })
}

fn light(p: &Property) -> Result<Light> {
    let d = Light::default();
    let kind = [LightKind::Omnidirectional, LightKind::Directional, LightKind::Ambient]
        .into_iter()
        .find(|k| p.has_flag(k.keyword()))
        .unwrap_or_default();
    Ok(Light {
        node: node(p, NodeFlags::LIGHT, &[])?,
        kind,
        attenuation: [
            p.get_or("AttenuationStart", d.attenuation[0])?,
            p.get_or("AttenuationEnd", d.attenuation[1])?,
        ],
        color: p.array_or("Color", d.color)?,
        intensity: p.get_or("Intensity", d.intensity)?,
        ambient_color: p.array_or("AmbColor", d.ambient_color)?,
        ambient_intensity: p.get_or("AmbIntensity", d.ambient_intensity)?,
        attenuation_start_track: track(p, "AttenuationStart")?,
        attenuation_end_track: track(p, "AttenuationEnd")?,
        color_track: track(p, "Color")?,
        intensity_track: track(p, "Intensity")?,
        ambient_intensity_track: track(p, "AmbIntensity")?,
        ambient_color_track: track(p, "AmbColor")?,
        visibility: track(p, "Visibility")?,
    })
}

fn attachment(p: &Property) -> Result<Attachment> {
    let d = Attachment::default();
    Ok(Attachment {
        node: node(p, NodeFlags::ATTACHMENT, &[])?,
        path: p.string_or("Path")?,
        attachment_id: p.get_or("AttachmentID", d.attachment_id)?,
        visibility: track(p, "Visibility")?,
    })
}

fn particle_emitter(p: &Property) -> Result<ParticleEmitter> {
    let d = ParticleEmitter::default();
    Ok(ParticleEmitter {
        node: node(p, NodeFlags::PARTICLE_EMITTER, &NodeFlags::EMITTER_KEYWORDS)?,
        emission_rate: p.get_or("EmissionRate", d.emission_rate)?,
        gravity: p.get_or("Gravity", d.gravity)?,
        longitude: p.get_or("Longitude", d.longitude)?,
        latitude: p.get_or("Latitude", d.latitude)?,
        path: p.string_or("Path")?,
        lifespan: p.get_or("LifeSpan", d.lifespan)?,
        speed: p.get_or("InitVelocity", d.speed)?,
        emission_rate_track: track(p, "EmissionRate")?,
        gravity_track: track(p, "Gravity")?,
        longitude_track: track(p, "Longitude")?,
        latitude_track: track(p, "Latitude")?,
        lifespan_track: track(p, "LifeSpan")?,
        speed_track: track(p, "InitVelocity")?,
        visibility: track(p, "Visibility")?,
    })
}

fn particle_emitter2(p: &Property) -> Result<ParticleEmitter2> {
    let d = ParticleEmitter2::default();
    let filter_mode = [
        ParticleFilterMode::Blend,
        ParticleFilterMode::Additive,
        ParticleFilterMode::Modulate,
        ParticleFilterMode::Modulate2x,
        ParticleFilterMode::AlphaKey,
    ]
    .into_iter()
    .find(|m| p.has_flag(m.keyword()))
    .unwrap_or_default();
    let head_or_tail = [HeadOrTail::Head, HeadOrTail::Tail, HeadOrTail::Both]
        .into_iter()
        .find(|h| p.has_flag(h.keyword()))
        .unwrap_or_default();

    let mut segment_colors = d.segment_colors;
    if let Some(segments) = p.child("SegmentColor") {
        let colors: Vec<[f32; 3]> = segments.all("Color").map(|c| c.array()).collect::<Result<_>>()?;
        if colors.len() != segment_colors.len() {
            return Err(segments.error(format!("expected 3 colors, found {}", colors.len())));
        }
        segment_colors.copy_from_slice(&colors);
    }

    Ok(ParticleEmitter2 {
        node: node(p, NodeFlags::PARTICLE_EMITTER, &NodeFlags::EMITTER2_KEYWORDS)?,
        speed: p.get_or("Speed", d.speed)?,
        variation: p.get_or("Variation", d.variation)?,
        latitude: p.get_or("Latitude", d.latitude)?,
        gravity: p.get_or("Gravity", d.gravity)?,
        lifespan: p.get_or("LifeSpan", d.lifespan)?,
        emission_rate: p.get_or("EmissionRate", d.emission_rate)?,
        width: p.get_or("Width", d.width)?,
        length: p.get_or("Length", d.length)?,
        filter_mode,
        rows: p.get_or("Rows", d.rows)?,
        columns: p.get_or("Columns", d.columns)?,
        head_or_tail,
        tail_length: p.get_or("TailLength", d.tail_length)?,
        time: p.get_or("Time", d.time)?,
        segment_colors,
        segment_alphas: p.array_or("Alpha", d.segment_alphas)?,
        segment_scaling: p.array_or("ParticleScaling", d.segment_scaling)?,
        head_intervals: [
            p.array_or("LifeSpanUVAnim", d.head_intervals[0])?,
            p.array_or("DecayUVAnim", d.head_intervals[1])?,
        ],
        tail_intervals: [
            p.array_or("TailUVAnim", d.tail_intervals[0])?,
            p.array_or("TailDecayUVAnim", d.tail_intervals[1])?,
        ],
        texture_id: p.optional_id("TextureID")?,
        squirt: p.has_flag("Squirt"),
        priority_plane: p.get_or("PriorityPlane", d.priority_plane)?,
        replaceable_id: p.get_or("ReplaceableId", d.replaceable_id)?,
        speed_track: track(p, "Speed")?,
        variation_track: track(p, "Variation")?,
        latitude_track: track(p, "Latitude")?,
        gravity_track: track(p, "Gravity")?,
        emission_rate_track: track(p, "EmissionRate")?,
        length_track: track(p, "Length")?,
        width_track: track(p, "Width")?,
        visibility: track(p, "Visibility")?,
    })
}

fn ribbon_emitter(p: &Property) -> Result<RibbonEmitter> {
    let d = RibbonEmitter::default();
    Ok(RibbonEmitter {
        node: node(p, NodeFlags::RIBBON_EMITTER, &[])?,
        height_above: p.get_or("HeightAbove", d.height_above)?,
        height_below: p.get_or("HeightBelow", d.height_below)?,
        alpha: p.get_or("Alpha", d.alpha)?,
        color: p.array_or("Color", d.color)?,
        lifespan: p.get_or("LifeSpan", d.lifespan)?,
        texture_slot: p.get_or("TextureSlot", d.texture_slot)?,
        emission_rate: p.get_or("EmissionRate", d.emission_rate)?,
        rows: p.get_or("Rows", d.rows)?,
        columns: p.get_or("Columns", d.columns)?,
        material_id: p.optional_id("MaterialID")?,
        gravity: p.get_or("Gravity", d.gravity)?,
        height_above_track: track(p, "HeightAbove")?,
        height_below_track: track(p, "HeightBelow")?,
        alpha_track: track(p, "Alpha")?,
        color_track: track(p, "Color")?,
        texture_slot_track: track(p, "TextureSlot")?,
        visibility: track(p, "Visibility")?,
    })
}

fn camera(p: &Property) -> Result<Camera> {
    let d = Camera::default();
    let target = p.child("Target");
    Ok(Camera {
        name: p.name()?.to_owned(),
        position: p.array_or("Position", d.position)?,
        field_of_view: p.get_or("FieldOfView", d.field_of_view)?,
        far_clip: p.get_or("FarClip", d.far_clip)?,
        near_clip: p.get_or("NearClip", d.near_clip)?,
        target_position: target.map_or(Ok(d.target_position), |t| t.array_or("Position", d.target_position))?,
        translation: track(p, "Translation")?,
        target_translation: target.map_or(Ok(Curve::default()), |t| track(t, "Translation"))?,
        rotation: track(p, "Rotation")?,
    })
}

fn event_object(p: &Property) -> Result<EventObject> {
    let track = match p.child("EventTrack") {
        Some(t) => Some(EventTrack { global_sequence_id: p.optional_id("GlobalSeqId")?, frames: t.numbers()? }),
        None => None,
    };
    Ok(EventObject { node: node(p, NodeFlags::EVENT_OBJECT, &[])?, track })
}

fn collision_shape(p: &Property) -> Result<CollisionShape> {
    let keyword = ["Box", "Plane", "Sphere", "Cylinder"]
        .into_iter()
        .find(|k| p.has_flag(k))
        .ok_or_else(|| p.error("missing shape type"))?;
    let vertices: Vec<[f32; 3]> = match p.child("Vertices") {
        Some(v) => v.vectors()?,
        None => Vec::new(),
    };
    let radius = p.get_or("BoundsRadius", 0.0)?;
    let shape = Shape::from_parts(keyword, &vertices, radius).ok_or_else(|| p.error("bad shape"))?;
    Ok(CollisionShape { node: node(p, NodeFlags::COLLISION_SHAPE, &[])?, shape })
}
