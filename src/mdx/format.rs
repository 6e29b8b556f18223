//! MDX format constants: chunk tags, fixed record sizes and version gates.

use crate::util::Tag;

/// Magic tag at the start of an MDX file.
pub const MDX_MAGIC: Tag = Tag::new(b"MDLX");

/// Size of a top-level chunk header (tag + exclusive byte count).
pub const CHUNK_HEADER_SIZE: u64 = 8;

/// Versions above this carry emissive gain, material shaders, geoset LODs,
/// tangents and skin weights.
pub const VERSION_EMISSIVE: u32 = 800;

/// Versions above this carry the Fresnel layer block.
pub const VERSION_FRESNEL: u32 = 900;

/// Version written for freshly constructed models.
pub const DEFAULT_VERSION: u32 = 800;

/// Sentinel for "no parent" / "no global sequence" / "no texture animation".
pub const NONE_ID: i32 = -1;

/// Fixed name buffer length (model, sequence, node and camera names).
pub const NAME_LEN: usize = 80;

/// Fixed path buffer length for textures, sounds and the animation file.
pub const FILE_PATH_LEN: usize = 260;

/// Fixed path buffer length for attachments and particle emitters.
pub const OBJECT_PATH_LEN: usize = 256;

// ============================================================================
// Top-level chunk tags
// ============================================================================

pub const VERS: Tag = Tag::new(b"VERS");
pub const MODL: Tag = Tag::new(b"MODL");
pub const SEQS: Tag = Tag::new(b"SEQS");
pub const GLBS: Tag = Tag::new(b"GLBS");
pub const MTLS: Tag = Tag::new(b"MTLS");
pub const TEXS: Tag = Tag::new(b"TEXS");
pub const SNDS: Tag = Tag::new(b"SNDS");
pub const TXAN: Tag = Tag::new(b"TXAN");
pub const GEOS: Tag = Tag::new(b"GEOS");
pub const GEOA: Tag = Tag::new(b"GEOA");
pub const BONE: Tag = Tag::new(b"BONE");
pub const LITE: Tag = Tag::new(b"LITE");
pub const HELP: Tag = Tag::new(b"HELP");
pub const ATCH: Tag = Tag::new(b"ATCH");
pub const PIVT: Tag = Tag::new(b"PIVT");
pub const PREM: Tag = Tag::new(b"PREM");
pub const PRE2: Tag = Tag::new(b"PRE2");
pub const RIBB: Tag = Tag::new(b"RIBB");
pub const CAMS: Tag = Tag::new(b"CAMS");
pub const EVTS: Tag = Tag::new(b"EVTS");
pub const CLID: Tag = Tag::new(b"CLID");

/// Top-level chunks in the order they are written. The reader accepts them in
/// any order.
pub const CHUNK_ORDER: [Tag; 21] = [
    VERS, MODL, SEQS, GLBS, MTLS, TEXS, SNDS, TXAN, GEOS, GEOA, BONE, LITE, HELP, ATCH, PIVT,
    PREM, PRE2, RIBB, CAMS, EVTS, CLID,
];

/// Check whether a tag names a top-level chunk this codec understands.
#[inline]
pub fn is_known_chunk(tag: Tag) -> bool {
    CHUNK_ORDER.contains(&tag)
}

// ============================================================================
// Nested tags
// ============================================================================

pub const LAYS: Tag = Tag::new(b"LAYS");

pub const VRTX: Tag = Tag::new(b"VRTX");
pub const NRMS: Tag = Tag::new(b"NRMS");
pub const PTYP: Tag = Tag::new(b"PTYP");
pub const PCNT: Tag = Tag::new(b"PCNT");
pub const PVTX: Tag = Tag::new(b"PVTX");
pub const GNDX: Tag = Tag::new(b"GNDX");
pub const MTGC: Tag = Tag::new(b"MTGC");
pub const MATS: Tag = Tag::new(b"MATS");
pub const TANG: Tag = Tag::new(b"TANG");
pub const SKIN: Tag = Tag::new(b"SKIN");
pub const UVAS: Tag = Tag::new(b"UVAS");
pub const UVBS: Tag = Tag::new(b"UVBS");

pub const KEVT: Tag = Tag::new(b"KEVT");

// Node tracks
pub const KGTR: Tag = Tag::new(b"KGTR");
pub const KGRT: Tag = Tag::new(b"KGRT");
pub const KGSC: Tag = Tag::new(b"KGSC");

// Layer tracks
pub const KMTF: Tag = Tag::new(b"KMTF");
pub const KMTA: Tag = Tag::new(b"KMTA");
pub const KMTE: Tag = Tag::new(b"KMTE");
pub const KFC3: Tag = Tag::new(b"KFC3");
pub const KFCA: Tag = Tag::new(b"KFCA");
pub const KFTC: Tag = Tag::new(b"KFTC");

// Texture animation tracks
pub const KTAT: Tag = Tag::new(b"KTAT");
pub const KTAR: Tag = Tag::new(b"KTAR");
pub const KTAS: Tag = Tag::new(b"KTAS");

// Geoset animation tracks
pub const KGAO: Tag = Tag::new(b"KGAO");
pub const KGAC: Tag = Tag::new(b"KGAC");

// Light tracks
pub const KLAS: Tag = Tag::new(b"KLAS");
pub const KLAE: Tag = Tag::new(b"KLAE");
pub const KLAC: Tag = Tag::new(b"KLAC");
pub const KLAI: Tag = Tag::new(b"KLAI");
pub const KLBI: Tag = Tag::new(b"KLBI");
pub const KLBC: Tag = Tag::new(b"KLBC");
pub const KLAV: Tag = Tag::new(b"KLAV");

// Attachment tracks
pub const KATV: Tag = Tag::new(b"KATV");

// Particle emitter tracks
pub const KPEE: Tag = Tag::new(b"KPEE");
pub const KPEG: Tag = Tag::new(b"KPEG");
pub const KPLN: Tag = Tag::new(b"KPLN");
pub const KPLT: Tag = Tag::new(b"KPLT");
pub const KPEL: Tag = Tag::new(b"KPEL");
pub const KPES: Tag = Tag::new(b"KPES");
pub const KPEV: Tag = Tag::new(b"KPEV");

// Particle emitter 2 tracks
pub const KP2S: Tag = Tag::new(b"KP2S");
pub const KP2R: Tag = Tag::new(b"KP2R");
pub const KP2L: Tag = Tag::new(b"KP2L");
pub const KP2G: Tag = Tag::new(b"KP2G");
pub const KP2E: Tag = Tag::new(b"KP2E");
pub const KP2N: Tag = Tag::new(b"KP2N");
pub const KP2W: Tag = Tag::new(b"KP2W");
pub const KP2V: Tag = Tag::new(b"KP2V");

// Ribbon emitter tracks
pub const KRHA: Tag = Tag::new(b"KRHA");
pub const KRHB: Tag = Tag::new(b"KRHB");
pub const KRAL: Tag = Tag::new(b"KRAL");
pub const KRCO: Tag = Tag::new(b"KRCO");
pub const KRTX: Tag = Tag::new(b"KRTX");
pub const KRVS: Tag = Tag::new(b"KRVS");

// Camera tracks
pub const KCTR: Tag = Tag::new(b"KCTR");
pub const KTTR: Tag = Tag::new(b"KTTR");
pub const KCRL: Tag = Tag::new(b"KCRL");
