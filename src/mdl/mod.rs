//! Text (MDL) form of a model.
//!
//! Parsing runs in three stages: [`lexer`] turns characters into tokens,
//! [`parser`] builds an untyped [`tree`] of keyword blocks, and `decode` maps
//! that tree onto a [`Model`]. Rendering goes straight from the model to text
//! through `encode`.
//!
//! Fields the binary form always stores but the text form treats as optional
//! are left out when they hold their default, and restored to that default
//! when absent on read. Both halves of that rule live in one pair of helpers
//! (`Renderer::field_or` and [`tree::Property::get_or`]).
//!
//! # Example
//!
//! ```ignore
//! use mdlx::mdl::{parse_model, render_model};
//!
//! let text = std::fs::read_to_string("footman.mdl")?;
//! let model = parse_model(&text)?;
//! assert_eq!(parse_model(&render_model(&model)?)?, model);
//! ```

mod decode;
mod encode;
pub mod lexer;
pub mod parser;
mod render;
pub mod tree;


pub use render::TextOptions;

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::model::Model;
use crate::util::Result;

/// Parse a model from its text form.
pub fn parse_model(text: &str) -> Result<Model> {
    let tokens = lexer::tokenize(text)?;
    let document = parser::BlockParser::new(tokens).document()?;
    debug!(blocks = document.len(), "parsed text document");
    let model = decode::model(&document)?;
    for (object_id, parent_id) in model.dangling_parents() {
        warn!(object_id, parent_id, "parent id matches no object");
    }
    Ok(model)
}

/// Parse a model from a byte stream of text.
///
/// Input that is not valid UTF-8 is taken as Latin-1, which is how older
/// exporters wrote names and paths.
pub fn parse_model_from_reader<R: Read>(mut reader: R) -> Result<Model> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };
    parse_model(&text)
}

/// Render a model with default options.
///
/// Fails with [`Error::Unrepresentable`](crate::Error::Unrepresentable) when a
/// name or path contains a double quote.
pub fn render_model(model: &Model) -> Result<String> {
    render_model_with(model, &TextOptions::default())
}

pub fn render_model_with(model: &Model, options: &TextOptions) -> Result<String> {
    encode::render(model, options)
}

/// Render a model and write it out. Nothing is written if rendering fails.
pub fn write_text<W: Write>(mut out: W, model: &Model, options: &TextOptions) -> Result<()> {
    out.write_all(render_model_with(model, options)?.as_bytes())?;
    out.flush()?;
    Ok(())
}
