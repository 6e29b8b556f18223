//! Animated property curves.
//!
//! A [`Curve`] is a list of keyframes of an `N`-dimensional value together
//! with an interpolation mode and an optional global-sequence binding. One
//! generic type covers every animated property in the format: alpha
//! (`Curve<1>`), translation and scaling (`Curve<3>`), rotation (`Curve<4>`)
//! and texture ids (`Curve<1, u32>`).

use std::fmt;
use std::io::{Read, Seek, Write};

use crate::mdx::{MdxReader, MdxWriter, Primitive};
use crate::util::{Error, Frame, Result, Tag};

/// How values between two keyframes are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Hold the earlier keyframe's value until the next keyframe.
    #[default]
    DontInterpolate,
    Linear,
    Hermite,
    Bezier,
}

impl Interpolation {
    /// Decode the on-disk value.
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::DontInterpolate),
            1 => Some(Self::Linear),
            2 => Some(Self::Hermite),
            3 => Some(Self::Bezier),
            _ => None,
        }
    }

    /// On-disk value.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::DontInterpolate => 0,
            Self::Linear => 1,
            Self::Hermite => 2,
            Self::Bezier => 3,
        }
    }

    /// Keyframes carry in/out tangents only in the spline modes.
    #[inline]
    pub fn has_tangents(self) -> bool {
        matches!(self, Self::Hermite | Self::Bezier)
    }

    /// Keyword used by the text form.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::DontInterpolate => "DontInterp",
            Self::Linear => "Linear",
            Self::Hermite => "Hermite",
            Self::Bezier => "Bezier",
        }
    }

    /// Parse a text-form keyword.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "DontInterp" => Some(Self::DontInterpolate),
            "Linear" => Some(Self::Linear),
            "Hermite" => Some(Self::Hermite),
            "Bezier" => Some(Self::Bezier),
            _ => None,
        }
    }
}

/// Scalar type a curve is sampled in.
pub trait TrackValue: Primitive + Default + PartialEq + fmt::Debug + fmt::Display + std::str::FromStr {
    /// Whether spline interpolation makes sense for this type.
    const CONTINUOUS: bool;

    fn to_f32(self) -> f32;
    fn from_f32(v: f32) -> Self;
}

impl TrackValue for f32 {
    const CONTINUOUS: bool = true;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}

impl TrackValue for u32 {
    const CONTINUOUS: bool = false;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v.round().max(0.0) as u32
    }
}

/// One keyframe of a curve.
///
/// Tangents are kept in memory for every keyframe but are only serialized
/// when the owning curve's interpolation mode uses them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe<const N: usize, V = f32> {
    pub frame: Frame,
    pub value: [V; N],
    pub in_tan: [V; N],
    pub out_tan: [V; N],
}

impl<const N: usize, V: TrackValue> Keyframe<N, V> {
    /// Keyframe without tangents.
    pub fn new(frame: Frame, value: [V; N]) -> Self {
        Self { frame, value, in_tan: [V::default(); N], out_tan: [V::default(); N] }
    }

    /// Keyframe with spline tangents.
    pub fn with_tangents(frame: Frame, value: [V; N], in_tan: [V; N], out_tan: [V; N]) -> Self {
        Self { frame, value, in_tan, out_tan }
    }
}

/// Time-sampled animated property.
#[derive(Clone, Debug, PartialEq)]
pub struct Curve<const N: usize, V = f32> {
    pub interpolation: Interpolation,
    /// Shared looping timeline this curve runs on instead of the sequence.
    pub global_sequence_id: Option<u32>,
    /// Keyframes, ordered by frame.
    pub keys: Vec<Keyframe<N, V>>,
}

impl<const N: usize, V> Default for Curve<N, V> {
    fn default() -> Self {
        Self { interpolation: Interpolation::DontInterpolate, global_sequence_id: None, keys: Vec::new() }
    }
}

/// Scalar float curve (alpha, intensity, visibility, ...).
pub type FloatCurve = Curve<1, f32>;
/// Three-component curve (translation, scaling, colors).
pub type Vec3Curve = Curve<3, f32>;
/// Quaternion curve (rotation).
pub type QuatCurve = Curve<4, f32>;
/// Integer curve (texture ids, texture slots).
pub type UintCurve = Curve<1, u32>;

impl<const N: usize, V: TrackValue> Curve<N, V> {
    /// Empty curve with the given interpolation mode.
    pub fn new(interpolation: Interpolation) -> Self {
        Self { interpolation, global_sequence_id: None, keys: Vec::new() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Append a keyframe without tangents.
    pub fn push(&mut self, frame: Frame, value: [V; N]) -> &mut Self {
        self.keys.push(Keyframe::new(frame, value));
        self
    }

    /// Append a keyframe with tangents.
    pub fn push_with_tangents(&mut self, frame: Frame, value: [V; N], in_tan: [V; N], out_tan: [V; N]) -> &mut Self {
        self.keys.push(Keyframe::with_tangents(frame, value, in_tan, out_tan));
        self
    }

    /// Change the interpolation mode. Leaving a spline mode clears tangents
    /// so that the in-memory state matches what would be serialized.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
        if !interpolation.has_tangents() {
            for k in &mut self.keys {
                k.in_tan = [V::default(); N];
                k.out_tan = [V::default(); N];
            }
        }
    }

    /// First and last keyframe frames.
    pub fn frame_range(&self) -> Option<(Frame, Frame)> {
        Some((self.keys.first()?.frame, self.keys.last()?.frame))
    }

    /// Evaluate the curve at `frame`.
    ///
    /// Frames before the first keyframe or after the last clamp to that
    /// keyframe's value. Returns `None` for an empty curve.
    pub fn sample_at(&self, frame: Frame) -> Result<Option<[V; N]>> {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Ok(None),
        };
        if frame <= first.frame {
            return Ok(Some(first.value));
        }
        if frame >= last.frame {
            return Ok(Some(last.value));
        }

        let idx = self.keys.partition_point(|k| k.frame <= frame);
        let b1 = &self.keys[idx - 1];
        let b2 = &self.keys[idx];
        if b1.frame == frame || b2.frame == b1.frame {
            return Ok(Some(b1.value));
        }
        // Frames span the whole i32 range; widen before subtracting.
        let span = i64::from(b2.frame) - i64::from(b1.frame);
        let t = ((i64::from(frame) - i64::from(b1.frame)) as f64 / span as f64) as f32;

        if self.interpolation.has_tangents() && !V::CONTINUOUS {
            return Err(Error::UnsupportedInterpolation {
                interpolation: self.interpolation,
                context: "integer-valued curve",
            });
        }

        let value = match self.interpolation {
            Interpolation::DontInterpolate => b1.value,
            Interpolation::Linear => per_component(|i| {
                let (a, b) = (b1.value[i].to_f32(), b2.value[i].to_f32());
                a + (b - a) * t
            }),
            Interpolation::Hermite | Interpolation::Bezier => {
                let [f1, f2, f3, f4] = if self.interpolation == Interpolation::Hermite {
                    hermite_basis(t)
                } else {
                    bezier_basis(t)
                };
                per_component(|i| {
                    b1.value[i].to_f32() * f1
                        + b1.out_tan[i].to_f32() * f2
                        + b2.in_tan[i].to_f32() * f3
                        + b2.value[i].to_f32() * f4
                })
            }
        };
        Ok(Some(value))
    }

    // ------------------------------------------------------------------------
    // Binary form
    // ------------------------------------------------------------------------

    /// Serialized size including the 4-byte tag.
    pub fn byte_size(&self) -> u64 {
        let per_value = V::SIZE * N as u64;
        let per_key = 4 + per_value * if self.interpolation.has_tangents() { 3 } else { 1 };
        16 + per_key * self.keys.len() as u64
    }

    /// Read a curve whose tag has already been consumed.
    pub fn read_body<R: Read + Seek>(r: &mut MdxReader<R>) -> Result<Self> {
        let count = r.read_u32()? as u64;
        let raw = r.read_u32()?;
        let interpolation =
            Interpolation::from_u32(raw).ok_or_else(|| Error::invalid("interpolation", raw))?;
        let global_sequence_id = r.read_optional_id()?;

        let per_key = 4 + V::SIZE * N as u64 * if interpolation.has_tangents() { 3 } else { 1 };
        r.ensure(count.saturating_mul(per_key), "curve keyframes")?;

        let mut keys = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let frame = r.read_i32()?;
            let value = r.read_array::<V, N>()?;
            let key = if interpolation.has_tangents() {
                let in_tan = r.read_array::<V, N>()?;
                let out_tan = r.read_array::<V, N>()?;
                Keyframe::with_tangents(frame, value, in_tan, out_tan)
            } else {
                Keyframe::new(frame, value)
            };
            keys.push(key);
        }
        Ok(Self { interpolation, global_sequence_id, keys })
    }

    /// Write the curve under `tag`.
    pub fn write<W: Write + Seek>(&self, w: &mut MdxWriter<W>, tag: Tag) -> Result<()> {
        w.write_tag(tag)?;
        w.write_u32(self.keys.len() as u32)?;
        w.write_u32(self.interpolation.as_u32())?;
        w.write_optional_id(self.global_sequence_id)?;
        for k in &self.keys {
            w.write_i32(k.frame)?;
            w.write_array(&k.value)?;
            if self.interpolation.has_tangents() {
                w.write_array(&k.in_tan)?;
                w.write_array(&k.out_tan)?;
            }
        }
        Ok(())
    }

    /// Write the curve only when it has keyframes.
    pub fn write_optional<W: Write + Seek>(&self, w: &mut MdxWriter<W>, tag: Tag) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.write(w, tag)
    }
}

#[inline]
fn per_component<const N: usize, V: TrackValue>(f: impl Fn(usize) -> f32) -> [V; N] {
    std::array::from_fn(|i| V::from_f32(f(i)))
}

/// Cubic Hermite basis weights for `(p0, m0, m1, p1)`.
#[inline]
pub fn hermite_basis(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [2.0 * t3 - 3.0 * t2 + 1.0, t3 - 2.0 * t2 + t, t3 - t2, -2.0 * t3 + 3.0 * t2]
}

/// Cubic Bernstein weights for control points `(p0, c0, c1, p1)`.
#[inline]
pub fn bezier_basis(t: f32) -> [f32; 4] {
    let inv = 1.0 - t;
    [inv * inv * inv, 3.0 * t * inv * inv, 3.0 * t * t * inv, t * t * t]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn linear3(keys: &[(Frame, [f32; 3])]) -> Vec3Curve {
        let mut c = Vec3Curve::new(Interpolation::Linear);
        for (f, v) in keys {
            c.push(*f, *v);
        }
        c
    }

    #[test]
    fn test_empty_curve_samples_none() {
        assert_eq!(FloatCurve::default().sample_at(10).unwrap(), None);
    }

    #[test]
    fn test_boundary_clamping() {
        let c = linear3(&[(10, [1.0, 2.0, 3.0]), (20, [4.0, 5.0, 6.0])]);
        assert_eq!(c.sample_at(-100).unwrap(), Some([1.0, 2.0, 3.0]));
        assert_eq!(c.sample_at(10).unwrap(), Some([1.0, 2.0, 3.0]));
        assert_eq!(c.sample_at(20).unwrap(), Some([4.0, 5.0, 6.0]));
        assert_eq!(c.sample_at(1000).unwrap(), Some([4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_linear_midpoint() {
        let mut c = FloatCurve::new(Interpolation::Linear);
        c.push(0, [0.0]).push(10, [10.0]);
        let v = c.sample_at(5).unwrap().unwrap();
        assert!((v[0] - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_extreme_frames_do_not_overflow() {
        let mut c = FloatCurve::new(Interpolation::Linear);
        c.push(i32::MIN, [0.0]).push(i32::MAX, [1.0]);
        let v = c.sample_at(0).unwrap().unwrap();
        assert!((v[0] - 0.5).abs() < 1e-6);
        let v = c.sample_at(i32::MAX - 1).unwrap().unwrap();
        assert!(v[0] > 0.999 && v[0] <= 1.0);
    }

    #[test]
    fn test_bone_translation_scenario() {
        let c = linear3(&[(0, [0.0, 0.0, 0.0]), (100, [10.0, 0.0, 0.0])]);
        assert_eq!(c.sample_at(50).unwrap(), Some([5.0, 0.0, 0.0]));
    }

    #[test]
    fn test_dont_interpolate_steps_at_keyframes() {
        let mut c = FloatCurve::new(Interpolation::DontInterpolate);
        c.push(0, [1.0]).push(10, [2.0]).push(20, [3.0]);
        for f in 0..10 {
            assert_eq!(c.sample_at(f).unwrap(), Some([1.0]));
        }
        assert_eq!(c.sample_at(10).unwrap(), Some([2.0]));
        assert_eq!(c.sample_at(19).unwrap(), Some([2.0]));
        assert_eq!(c.sample_at(20).unwrap(), Some([3.0]));
    }

    #[test]
    fn test_hermite_with_flat_tangents_is_smoothstep() {
        let mut c = FloatCurve::new(Interpolation::Hermite);
        c.push_with_tangents(0, [0.0], [0.0], [0.0]);
        c.push_with_tangents(100, [1.0], [0.0], [0.0]);
        let mid = c.sample_at(50).unwrap().unwrap()[0];
        assert!((mid - 0.5).abs() < 1e-6);
        let quarter = c.sample_at(25).unwrap().unwrap()[0];
        // 3t^2 - 2t^3 at t = 0.25
        assert!((quarter - 0.15625).abs() < 1e-6);
    }

    #[test]
    fn test_bezier_control_points() {
        let mut c = FloatCurve::new(Interpolation::Bezier);
        c.push_with_tangents(0, [0.0], [0.0], [1.0]);
        c.push_with_tangents(10, [1.0], [1.0], [0.0]);
        // All inner control points at 1: B(0.5) = 0.375 + 0.375 + 0.125
        let v = c.sample_at(5).unwrap().unwrap()[0];
        assert!((v - 0.875).abs() < 1e-6);
    }

    #[test]
    fn test_integer_curve_rejects_splines() {
        let mut c = UintCurve::new(Interpolation::Hermite);
        c.push(0, [1]).push(10, [5]);
        assert!(matches!(
            c.sample_at(5),
            Err(Error::UnsupportedInterpolation { interpolation: Interpolation::Hermite, .. })
        ));
        // Keyframe hits never need interpolation.
        assert_eq!(c.sample_at(10).unwrap(), Some([5]));

        c.set_interpolation(Interpolation::Linear);
        assert_eq!(c.sample_at(5).unwrap(), Some([3]));
    }

    #[test]
    fn test_binary_layout_tangents_only_for_splines() {
        let mut c = FloatCurve::new(Interpolation::Linear);
        c.push(0, [1.0]).push(10, [2.0]);
        c.global_sequence_id = Some(2);
        assert_eq!(c.byte_size(), 16 + 2 * 8);

        let mut w = MdxWriter::new(Cursor::new(Vec::new()), 800).unwrap();
        c.write(&mut w, Tag::new(b"KMTA")).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(bytes.len() as u64, c.byte_size());

        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        r.expect_tag(Tag::new(b"KMTA")).unwrap();
        assert_eq!(FloatCurve::read_body(&mut r).unwrap(), c);

        let mut h = FloatCurve::new(Interpolation::Hermite);
        h.push_with_tangents(0, [1.0], [0.5], [0.25]);
        assert_eq!(h.byte_size(), 16 + 16);
    }

    #[test]
    fn test_invalid_interpolation_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        let mut r = MdxReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(FloatCurve::read_body(&mut r), Err(Error::InvalidValue { field: "interpolation", value: 7 })));
    }
}
