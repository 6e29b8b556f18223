//! Locating and opening model streams.
//!
//! The codec never opens files itself; it reads from whatever a
//! [`SourceResolver`] hands back. [`PrioritySources`] searches an ordered list
//! of directory roots and memory-maps the first hit.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::model::Model;
use crate::util::{Error, Result};

/// Which form a model is stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    /// Chunked binary (`.mdx`).
    Binary,
    /// Text (`.mdl`).
    Text,
}

impl ModelFormat {
    /// Guess from a file extension; anything other than `.mdl` is binary.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mdl") => Self::Text,
            _ => Self::Binary,
        }
    }
}

/// A ready-to-read seekable stream.
pub enum SourceStream {
    /// Memory-mapped file (preferred)
    Mapped(Cursor<Mmap>),
    /// Buffered file access (fallback)
    File(BufReader<File>),
    /// Bytes already in memory
    Memory(Cursor<Vec<u8>>),
}

impl Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Mapped(c) => c.read(buf),
            Self::File(f) => f.read(buf),
            Self::Memory(c) => c.read(buf),
        }
    }
}

impl Seek for SourceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Mapped(c) => c.seek(pos),
            Self::File(f) => f.seek(pos),
            Self::Memory(c) => c.seek(pos),
        }
    }
}

impl From<Vec<u8>> for SourceStream {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Memory(Cursor::new(bytes))
    }
}

/// Something that can produce model streams by name.
///
/// Implementations must be shareable across threads; every call returns an
/// independent stream.
pub trait SourceResolver: Send + Sync {
    fn open(&self, name: &str) -> Result<SourceStream>;
}

/// Open a file as a stream, memory-mapped when `use_mmap` is set.
pub fn open_path(path: impl AsRef<Path>, use_mmap: bool) -> Result<SourceStream> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    let size = file.metadata()?.len();

    if use_mmap && size > 0 {
        // Safety: the map is read-only; a file truncated underneath us is the
        // caller's problem, as with any mapped reader.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::StreamUnavailable(format!("{}: {}", path.display(), e)))?;
        Ok(SourceStream::Mapped(Cursor::new(mmap)))
    } else {
        Ok(SourceStream::File(BufReader::new(file)))
    }
}

/// Ordered list of directory roots; earlier roots win.
#[derive(Clone, Debug)]
pub struct PrioritySources {
    roots: Vec<PathBuf>,
    use_mmap: bool,
}

impl Default for PrioritySources {
    fn default() -> Self {
        Self { roots: Vec::new(), use_mmap: cfg!(feature = "mmap") }
    }
}

impl PrioritySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root searched after every existing one.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First existing file for `name`. Absolute names bypass the roots.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let wanted = Path::new(name);
        if wanted.is_absolute() {
            return wanted.is_file().then(|| wanted.to_path_buf());
        }
        self.roots.iter().map(|root| root.join(wanted)).find(|p| p.is_file())
    }
}

impl SourceResolver for PrioritySources {
    fn open(&self, name: &str) -> Result<SourceStream> {
        let path = self.locate(name).ok_or_else(|| {
            Error::StreamUnavailable(format!("{} not found under {} root(s)", name, self.roots.len()))
        })?;
        debug!(name, path = %path.display(), mmap = self.use_mmap, "resolved source");
        open_path(&path, self.use_mmap).map_err(|e| match e {
            Error::StreamUnavailable(_) => e,
            other => Error::StreamUnavailable(format!("{}: {}", path.display(), other)),
        })
    }
}

/// Resolve `name` and read it in the form its extension names.
pub fn load_model(resolver: &dyn SourceResolver, name: &str) -> Result<Model> {
    let stream = resolver.open(name)?;
    match ModelFormat::from_path(name) {
        ModelFormat::Binary => crate::mdx::read_model(stream),
        ModelFormat::Text => crate::mdl::parse_model_from_reader(stream),
    }
}
