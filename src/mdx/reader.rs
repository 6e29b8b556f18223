//! Top-level MDX read loop.

use std::io::{Read, Seek};

use tracing::{debug, warn};

use super::format::*;
use super::group::{GroupBlock, MdxRecord, Vector};
use super::stream::MdxReader;
use crate::model::{Model, ModelInfo};
use crate::util::{Error, Result, Tag};

/// Options controlling how forgiving the reader is.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Skip unknown top-level chunks instead of failing with `UnknownChunk`.
    pub resynchronize: bool,
    /// Give up scanning for the next known tag after this many bytes.
    pub max_resync_scan: Option<u64>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { resynchronize: true, max_resync_scan: None }
    }
}

/// Read a model from a seekable byte stream with default options.
pub fn read_model<R: Read + Seek>(reader: R) -> Result<Model> {
    read_model_with(reader, &ReadOptions::default())
}

/// Read a model from a seekable byte stream.
///
/// Structural errors abort the read; there is no partially populated
/// result. Unknown chunks are skipped according to `options`.
pub fn read_model_with<R: Read + Seek>(reader: R, options: &ReadOptions) -> Result<Model> {
    let mut r = MdxReader::new(reader)?;
    let magic = r.read_tag()?;
    if magic != MDX_MAGIC {
        return Err(Error::InvalidMagic { found: magic });
    }

    let mut model = Model::new(DEFAULT_VERSION);
    let mut seen_version = false;
    while r.remaining() > 0 {
        let offset = r.pos();
        let (tag, size) = r.read_sized_header()?;
        let size = size as u64;
        if !is_known_chunk(tag) {
            skip_unknown_chunk(&mut r, tag, offset, size, options)?;
            continue;
        }
        r.ensure(size, "chunk payload")?;

        let start = r.pos();
        if tag == VERS {
            model.version = r.read_u32()?;
            r.set_version(model.version);
            seen_version = true;
        } else {
            read_chunk(&mut r, &mut model, tag, size)?;
        }
        // Groups already spend their budget exactly; this only lets fixed
        // chunks such as MODL carry trailing fields we do not know.
        r.skip_to_declared_end(tag, start, size)?;
        debug!(%tag, offset, size, "read chunk");
    }

    if !seen_version {
        warn!(version = model.version, "no VERS chunk, assuming default version");
    }
    for (object_id, parent_id) in model.dangling_parents() {
        warn!(object_id, parent_id, "parent id matches no object");
    }
    Ok(model)
}

fn read_chunk<R: Read + Seek>(r: &mut MdxReader<R>, model: &mut Model, tag: Tag, size: u64) -> Result<()> {
    match tag {
        MODL => model.info = ModelInfo::read(r)?,
        SEQS => model.sequences = members(r, tag, size)?,
        GLBS => model.global_sequences = members(r, tag, size)?,
        MTLS => model.materials = members(r, tag, size)?,
        TEXS => model.textures = members(r, tag, size)?,
        SNDS => model.sound_tracks = members(r, tag, size)?,
        TXAN => model.texture_animations = members(r, tag, size)?,
        GEOS => model.geosets = members(r, tag, size)?,
        GEOA => model.geoset_animations = members(r, tag, size)?,
        BONE => model.bones = members(r, tag, size)?,
        LITE => model.lights = members(r, tag, size)?,
        HELP => model.helpers = members(r, tag, size)?,
        ATCH => model.attachments = members(r, tag, size)?,
        PIVT => {
            let points: Vec<Vector<f32, 3>> = members(r, tag, size)?;
            model.pivot_points = points.into_iter().map(|v| v.0).collect();
        }
        PREM => model.particle_emitters = members(r, tag, size)?,
        PRE2 => model.particle_emitters2 = members(r, tag, size)?,
        RIBB => model.ribbon_emitters = members(r, tag, size)?,
        CAMS => model.cameras = members(r, tag, size)?,
        EVTS => model.event_objects = members(r, tag, size)?,
        CLID => model.collision_shapes = members(r, tag, size)?,
        _ => return Err(Error::UnknownChunk { tag, offset: r.pos() }),
    }
    Ok(())
}

#[inline]
fn members<M: MdxRecord, R: Read + Seek>(r: &mut MdxReader<R>, tag: Tag, size: u64) -> Result<Vec<M>> {
    GroupBlock::read_size_delimited(r, tag, size).map(GroupBlock::into_members)
}

/// Step over an unrecognized top-level chunk.
///
/// The declared size is trusted when it lands exactly on end-of-stream or on
/// a known tag; otherwise the stream is scanned one byte at a time from just
/// past the bad header's start.
fn skip_unknown_chunk<R: Read + Seek>(
    r: &mut MdxReader<R>,
    tag: Tag,
    offset: u64,
    size: u64,
    options: &ReadOptions,
) -> Result<()> {
    if !options.resynchronize {
        return Err(Error::UnknownChunk { tag, offset });
    }
    warn!(%tag, offset, size, "skipping unknown chunk");

    let declared_end = r.pos().saturating_add(size);
    if declared_end == r.len() {
        return r.seek(declared_end);
    }
    if declared_end < r.len() {
        r.seek(declared_end)?;
        if matches!(r.peek_tag()?, Some(next) if is_known_chunk(next)) {
            return Ok(());
        }
    }

    r.seek(offset + 1)?;
    if r.resync(options.max_resync_scan, is_known_chunk)? {
        warn!(from = offset, to = r.pos(), "resynchronized on next known chunk");
        return Ok(());
    }
    if r.remaining() > 0 {
        return Err(Error::UnknownChunk { tag, offset });
    }
    warn!(from = offset, "no known chunk after unknown data, stopping at end of stream");
    Ok(())
}
