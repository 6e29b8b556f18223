//! Binary (MDX) form: chunked little-endian container.
//!
//! Layering, leaves first:
//! - `stream` - primitive codec, chunk headers, backpatching
//! - `group` - counted and size-delimited record lists
//! - `reader` / `writer` - top-level chunk dispatch and ordering

pub mod format;
mod group;
mod reader;
mod stream;
mod writer;

pub use format::*;
pub use group::{
    read_counted_array, read_counted_records, read_counted_vectors, write_counted_array,
    write_counted_records, write_counted_vectors, write_size_delimited,
    Counting, GroupBlock, MdxRecord, Vector,
};
pub use reader::{read_model, read_model_with, ReadOptions};
pub use stream::{MdxReader, MdxWriter, Primitive, SizeKind, SizeMark};
pub use writer::{write_model, write_model_buffered, write_model_with, WriteOptions, WriteStrategy};

#[cfg(test)]
mod tests;
