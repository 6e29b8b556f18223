//! Core layer - animated curves and the node base.
//!
//! This module provides:
//! - [`Curve`] - Keyframed, interpolated property of any dimension
//! - [`Interpolation`] - Keyframe interpolation modes
//! - [`Node`] / [`NodeFlags`] - Identity, hierarchy and transform curves
//!   shared by every placeable object

mod curve;
mod node;

pub use curve::{
    bezier_basis, hermite_basis, Curve, FloatCurve, Interpolation, Keyframe, QuatCurve,
    TrackValue, UintCurve, Vec3Curve,
};
pub use node::{Node, NodeFlags};
