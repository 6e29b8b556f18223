//! Math type re-exports and model-specific bounding volumes.
//!
//! Model data keeps plain `[f32; N]` arrays so that values survive a binary
//! round trip bit for bit; `glam` types are used where math happens.

pub use glam::{Quat, Vec2, Vec3, Vec4};

use std::fmt;

/// Bounding volume shared by the model header, sequences and geosets.
///
/// Binary layout: `boundsRadius f32, min [f32; 3], max [f32; 3]` (28 bytes).
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub bounds_radius: f32,
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Extent {
    /// Serialized size in bytes.
    pub const SIZE: u64 = 28;

    /// Create an extent from explicit corners and radius.
    #[inline]
    pub const fn new(bounds_radius: f32, min: [f32; 3], max: [f32; 3]) -> Self {
        Self { bounds_radius, min, max }
    }

    /// Compute the tightest axis-aligned extent enclosing `points`.
    ///
    /// The radius is measured from the box center. An empty slice yields the
    /// all-zero default.
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let mut min = Vec3::from(*first);
        let mut max = min;
        for p in &points[1..] {
            let p = Vec3::from(*p);
            min = min.min(p);
            max = max.max(p);
        }
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| Vec3::from(*p).distance(center))
            .fold(0.0f32, f32::max);
        Self { bounds_radius: radius, min: min.to_array(), max: max.to_array() }
    }

    /// All fields zero; the text form omits such extents entirely.
    #[inline]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Minimum corner as a vector.
    #[inline]
    pub fn min_vec(&self) -> Vec3 {
        Vec3::from(self.min)
    }

    /// Maximum corner as a vector.
    #[inline]
    pub fn max_vec(&self) -> Vec3 {
        Vec3::from(self.max)
    }

    /// Center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min_vec() + self.max_vec()) * 0.5
    }

    /// Check whether a point lies inside the box (inclusive).
    pub fn contains(&self, p: Vec3) -> bool {
        let (min, max) = (self.min_vec(), self.max_vec());
        p.cmpge(min).all() && p.cmple(max).all()
    }
}

impl fmt::Debug for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extent(r={} {:?} - {:?})", self.bounds_radius, self.min, self.max)
    }
}

/// Frame number on a sequence or global-sequence timeline (milliseconds).
pub type Frame = i32;
