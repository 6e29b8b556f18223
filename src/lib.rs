//! # mdlx
//!
//! Reader and writer for the MDX (chunked binary) and MDL (text) 3D model
//! formats used by Warcraft III era tools.
//!
//! Both forms decode into the same in-memory [`Model`] tree, so any model can
//! be read in one form and written in the other. The binary codec is
//! round-trip exact for every chunk it understands; the text codec keeps the
//! same data and leaves out fields that hold their default value.
//!
//! ## Modules
//!
//! - [`util`] - Errors, chunk tags, extents and math re-exports
//! - [`core`] - Animated curves and the node base shared by all objects
//! - [`mdx`] - Binary form: primitive codec, chunk framing, read/write driver
//! - [`mdl`] - Text form: lexer, block parser, renderer
//! - [`model`] - The model tree and node evaluation
//! - [`source`] - Locating and opening model streams
//!
//! ## Example
//!
//! ```ignore
//! use mdlx::prelude::*;
//!
//! let sources = PrioritySources::new().with_root("war3.mpq.extracted");
//! let model = load_model(&sources, "Units/Human/Footman/Footman.mdx")?;
//!
//! for seq in &model.sequences {
//!     println!("{} {:?}", seq.name, seq.interval);
//! }
//! std::fs::write("Footman.mdl", render_model(&model)?)?;
//! ```

pub mod util;
pub mod core;
pub mod mdx;
pub mod mdl;
pub mod model;
pub mod source;

// Re-export commonly used types
pub use util::{Error, Extent, Result, Tag};
pub use model::Model;
pub use mdx::{read_model, write_model};
pub use mdl::{parse_model, render_model};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Extent, Frame, Quat, Result, Tag, Vec3};
    pub use crate::core::{Curve, Interpolation, Node, NodeFlags};
    pub use crate::mdx::{read_model, read_model_with, write_model, write_model_buffered, ReadOptions, WriteOptions};
    pub use crate::mdl::{parse_model, render_model, render_model_with, TextOptions};
    pub use crate::model::*;
    pub use crate::source::{load_model, PrioritySources, SourceResolver};
}
