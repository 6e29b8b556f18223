//! Utility types and functions shared by both codecs.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] / [`Tag`] - Error handling
//! - [`Extent`] and math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
