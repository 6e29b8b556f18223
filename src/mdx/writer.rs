//! Top-level MDX write loop.
//!
//! Chunks go out in one fixed order. `VERS` and `MODL` are always written;
//! every other chunk is left out entirely when its collection is empty.

use std::io::{Cursor, Seek, Write};

use tracing::debug;

use super::format::*;
use super::group::{write_size_delimited, MdxRecord};
use super::stream::MdxWriter;
use crate::model::Model;
use crate::util::{Result, Tag};

/// How size fields are backpatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Seek back in the destination stream.
    #[default]
    Seekable,
    /// Serialize into memory first, then copy to the destination.
    Buffered,
}

/// Options for binary output.
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    pub strategy: WriteStrategy,
}

/// Write a model to a seekable stream, backpatching sizes in place.
///
/// Returns the number of bytes written. A failed write leaves whatever was
/// already written in the stream.
pub fn write_model<W: Write + Seek>(out: W, model: &Model) -> Result<u64> {
    let mut w = MdxWriter::new(out, model.version)?;
    let start = w.pos();
    write_chunks(&mut w, model)?;
    w.flush()?;
    let written = w.pos() - start;
    debug!(bytes = written, "wrote model");
    Ok(written)
}

/// Write a model to any byte sink by serializing it into memory first.
pub fn write_model_buffered<W: Write>(mut out: W, model: &Model) -> Result<u64> {
    let mut w = MdxWriter::new(Cursor::new(Vec::new()), model.version)?;
    write_chunks(&mut w, model)?;
    let bytes = w.into_inner().into_inner();
    out.write_all(&bytes)?;
    out.flush()?;
    debug!(bytes = bytes.len(), "wrote buffered model");
    Ok(bytes.len() as u64)
}

/// Write a model with the given strategy.
pub fn write_model_with<W: Write + Seek>(out: W, model: &Model, options: &WriteOptions) -> Result<u64> {
    match options.strategy {
        WriteStrategy::Seekable => write_model(out, model),
        WriteStrategy::Buffered => write_model_buffered(out, model),
    }
}

fn write_chunks<W: Write + Seek>(w: &mut MdxWriter<W>, m: &Model) -> Result<()> {
    w.write_tag(MDX_MAGIC)?;
    w.chunk(VERS, |w| w.write_u32(m.version))?;
    w.chunk(MODL, |w| m.info.write(w))?;
    optional(w, SEQS, &m.sequences)?;
    optional(w, GLBS, &m.global_sequences)?;
    optional(w, MTLS, &m.materials)?;
    optional(w, TEXS, &m.textures)?;
    optional(w, SNDS, &m.sound_tracks)?;
    optional(w, TXAN, &m.texture_animations)?;
    optional(w, GEOS, &m.geosets)?;
    optional(w, GEOA, &m.geoset_animations)?;
    optional(w, BONE, &m.bones)?;
    optional(w, LITE, &m.lights)?;
    optional(w, HELP, &m.helpers)?;
    optional(w, ATCH, &m.attachments)?;
    if !m.pivot_points.is_empty() {
        w.chunk(PIVT, |w| {
            for p in &m.pivot_points {
                w.write_vector(p)?;
            }
            Ok(())
        })?;
    }
    optional(w, PREM, &m.particle_emitters)?;
    optional(w, PRE2, &m.particle_emitters2)?;
    optional(w, RIBB, &m.ribbon_emitters)?;
    optional(w, CAMS, &m.cameras)?;
    optional(w, EVTS, &m.event_objects)?;
    optional(w, CLID, &m.collision_shapes)
}

#[inline]
fn optional<M: MdxRecord, W: Write + Seek>(w: &mut MdxWriter<W>, tag: Tag, members: &[M]) -> Result<()> {
    if members.is_empty() {
        return Ok(());
    }
    write_size_delimited(w, tag, members)
}
