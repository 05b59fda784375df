//! 3-D hue/saturation/value correction tables.
//!
//! A [`HueSatMap`] stores per-cell correction deltas derived from
//! camera-profile calibration data, indexed by discretized hue,
//! saturation, and value. Each delta is a hue shift (degrees), a
//! saturation scale, and a value scale.
//!
//! # Layout
//!
//! The table is flat, ordered value-outer / hue-middle / sat-inner:
//!
//! ```text
//! index = val * val_step + hue * hue_step + sat
//! hue_step = sat_divisions
//! val_step = hue_divisions * hue_step
//! ```
//!
//! # Invariants
//!
//! - Out-of-range reads return the identity delta (0, 1, 1), never an
//!   error - a lookup past the table must leave the pixel alone.
//! - Entries at saturation index 0 always carry a value scale of
//!   exactly 1.0 (a fully desaturated pixel has no value to rescale).
//!   Writes self-heal this on the way in: a write at sat index 0 has
//!   its value scale forced to 1.0, and a write at sat index 1
//!   corrects the neighboring sat-0 entry if it drifted.

use crate::error::ColorError;
use std::sync::Arc;
use tracing::warn;

/// One correction cell: hue shift in degrees, saturation and value
/// scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueSatDelta {
    /// Hue shift in degrees.
    pub hue_shift: f32,
    /// Saturation scale factor.
    pub sat_scale: f32,
    /// Value scale factor.
    pub val_scale: f32,
}

impl HueSatDelta {
    /// The do-nothing delta.
    pub const IDENTITY: Self = Self {
        hue_shift: 0.0,
        sat_scale: 1.0,
        val_scale: 1.0,
    };

    /// All-zero delta (the state of a freshly allocated table).
    pub const ZERO: Self = Self {
        hue_shift: 0.0,
        sat_scale: 0.0,
        val_scale: 0.0,
    };

    /// Per-component linear interpolation: `t * self + (1 - t) * other`.
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let u = 1.0 - t;
        Self {
            hue_shift: t * self.hue_shift + u * other.hue_shift,
            sat_scale: t * self.sat_scale + u * other.sat_scale,
            val_scale: t * self.val_scale + u * other.val_scale,
        }
    }
}

/// Axis encoding declared by the profile the table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapEncoding {
    /// Axes are linear.
    #[default]
    Linear,
    /// Value axis is sRGB-encoded.
    Srgb,
}

/// A 3-D lookup table of hue/sat/value correction deltas.
///
/// # Example
///
/// ```rust
/// use rawflow_color::{HueSatDelta, HueSatMap};
///
/// let mut map = HueSatMap::new(6, 6, 1);
/// map.set_delta(2, 3, 0, HueSatDelta { hue_shift: 5.0, sat_scale: 1.1, val_scale: 0.9 });
///
/// assert_eq!(map.get_delta(2, 3, 0).hue_shift, 5.0);
/// // out of range -> identity
/// assert_eq!(map.get_delta(99, 0, 0), HueSatDelta::IDENTITY);
/// ```
#[derive(Debug, Clone)]
pub struct HueSatMap {
    hue_divisions: u32,
    sat_divisions: u32,
    val_divisions: u32,
    encoding: MapEncoding,
    deltas: Vec<HueSatDelta>,
}

impl HueSatMap {
    /// Allocates a zero-initialized table.
    ///
    /// `val_divisions` is clamped to a minimum of 1 (a 2.5-D table).
    pub fn new(hue_divisions: u32, sat_divisions: u32, val_divisions: u32) -> Self {
        let val_divisions = val_divisions.max(1);
        let len = hue_divisions as usize * sat_divisions as usize * val_divisions as usize;
        Self {
            hue_divisions,
            sat_divisions,
            val_divisions,
            encoding: MapEncoding::Linear,
            deltas: vec![HueSatDelta::ZERO; len],
        }
    }

    /// Builds a map from a flat profile table of (hue, sat, val)
    /// triples, ordered value-outer / hue-middle / sat-inner.
    ///
    /// Returns `None` (with a logged warning) when the table length
    /// does not match the declared divisions - a malformed profile
    /// must not abort the pipeline.
    pub fn from_profile_table(
        table: &[f32],
        hue_divisions: u32,
        sat_divisions: u32,
        val_divisions: u32,
        encoding: MapEncoding,
    ) -> Option<Arc<Self>> {
        let val_divisions = val_divisions.max(1);
        let expected =
            hue_divisions as usize * sat_divisions as usize * val_divisions as usize * 3;
        if table.len() != expected {
            let err = ColorError::TableSizeMismatch {
                hue: hue_divisions,
                sat: sat_divisions,
                val: val_divisions,
                expected,
                got: table.len(),
            };
            warn!(%err, "rejecting malformed profile hue/sat table");
            return None;
        }

        let mut map = Self::new(hue_divisions, sat_divisions, val_divisions);
        map.encoding = encoding;
        let mut i = 0;
        for val in 0..val_divisions {
            for hue in 0..hue_divisions {
                for sat in 0..sat_divisions {
                    map.set_delta(
                        hue,
                        sat,
                        val,
                        HueSatDelta {
                            hue_shift: table[i],
                            sat_scale: table[i + 1],
                            val_scale: table[i + 2],
                        },
                    );
                    i += 3;
                }
            }
        }
        Some(Arc::new(map))
    }

    /// Weighted interpolation of two maps: every delta becomes
    /// `weight1 * a + (1 - weight1) * b`.
    ///
    /// The maps must share identical division counts (`None`
    /// otherwise). A weight at or beyond either end short-circuits to
    /// a **shared** reference to the corresponding input - callers
    /// must not assume a fresh allocation.
    pub fn interpolated(a: &Arc<Self>, b: &Arc<Self>, weight1: f32) -> Option<Arc<Self>> {
        if a.hue_divisions != b.hue_divisions
            || a.sat_divisions != b.sat_divisions
            || a.val_divisions != b.val_divisions
        {
            let err = ColorError::DivisionMismatch {
                a_hue: a.hue_divisions,
                a_sat: a.sat_divisions,
                a_val: a.val_divisions,
                b_hue: b.hue_divisions,
                b_sat: b.sat_divisions,
                b_val: b.val_divisions,
            };
            warn!(%err, "cannot interpolate hue/sat maps");
            return None;
        }

        if weight1 >= 1.0 {
            return Some(Arc::clone(a));
        }
        if weight1 <= 0.0 {
            return Some(Arc::clone(b));
        }

        let mut out = Self::new(a.hue_divisions, a.sat_divisions, a.val_divisions);
        out.encoding = a.encoding;
        for (dst, (da, db)) in out
            .deltas
            .iter_mut()
            .zip(a.deltas.iter().zip(b.deltas.iter()))
        {
            *dst = da.lerp(*db, weight1);
        }
        Some(Arc::new(out))
    }

    /// Hue division count.
    #[inline]
    pub fn hue_divisions(&self) -> u32 {
        self.hue_divisions
    }

    /// Saturation division count.
    #[inline]
    pub fn sat_divisions(&self) -> u32 {
        self.sat_divisions
    }

    /// Value division count (always >= 1).
    #[inline]
    pub fn val_divisions(&self) -> u32 {
        self.val_divisions
    }

    /// Axis encoding from the source profile.
    #[inline]
    pub fn encoding(&self) -> MapEncoding {
        self.encoding
    }

    #[inline]
    fn hue_step(&self) -> usize {
        self.sat_divisions as usize
    }

    #[inline]
    fn val_step(&self) -> usize {
        self.hue_divisions as usize * self.hue_step()
    }

    #[inline]
    fn index(&self, hue: u32, sat: u32, val: u32) -> Option<usize> {
        if hue >= self.hue_divisions || sat >= self.sat_divisions || val >= self.val_divisions {
            return None;
        }
        Some(val as usize * self.val_step() + hue as usize * self.hue_step() + sat as usize)
    }

    /// Reads the delta at (hue, sat, val); identity for indices
    /// outside the table.
    #[inline]
    pub fn get_delta(&self, hue: u32, sat: u32, val: u32) -> HueSatDelta {
        match self.index(hue, sat, val) {
            Some(i) => self.deltas[i],
            None => HueSatDelta::IDENTITY,
        }
    }

    /// Writes the delta at (hue, sat, val).
    ///
    /// Out-of-range writes are dropped. Writes at saturation index 0
    /// have their value scale forced to 1.0 to keep the
    /// zero-saturation invariant; writes at saturation index 1 check
    /// the neighboring zero-saturation entry and correct its value
    /// scale the same way, so populating a fresh table one cell at a
    /// time never leaves a sat-0 cell able to rescale value.
    pub fn set_delta(&mut self, hue: u32, sat: u32, val: u32, mut delta: HueSatDelta) {
        let Some(i) = self.index(hue, sat, val) else {
            return;
        };
        if sat == 0 {
            delta.val_scale = 1.0;
        } else if sat == 1 {
            if let Some(z) = self.index(hue, 0, val) {
                if self.deltas[z].val_scale != 1.0 {
                    self.deltas[z].val_scale = 1.0;
                }
            }
        }
        self.deltas[i] = delta;
    }

    /// Trilinearly interpolated lookup in continuous coordinates.
    ///
    /// `hue` is in degrees and wraps around; `sat` and `val` are
    /// normalized [0, 1] and clamp at the table edges. An empty table
    /// returns identity.
    pub fn lookup(&self, hue: f32, sat: f32, val: f32) -> HueSatDelta {
        if self.deltas.is_empty() {
            return HueSatDelta::IDENTITY;
        }

        // hue axis wraps: division i covers [i, i+1) * 360/hue_div
        let h = (hue.rem_euclid(360.0) / 360.0) * self.hue_divisions as f32;
        let h0 = (h.floor() as u32).min(self.hue_divisions - 1);
        let h1 = (h0 + 1) % self.hue_divisions;
        let hf = h - h0 as f32;

        let (s0, s1, sf) = clamped_axis(sat, self.sat_divisions);
        let (v0, v1, vf) = clamped_axis(val, self.val_divisions);

        let sample = |hi: u32, si: u32, vi: u32| self.get_delta(hi, si, vi);

        let lerp_sv = |hi: u32| {
            let bottom = sample(hi, s0, v0).lerp(sample(hi, s1, v0), 1.0 - sf);
            let top = sample(hi, s0, v1).lerp(sample(hi, s1, v1), 1.0 - sf);
            bottom.lerp(top, 1.0 - vf)
        };

        lerp_sv(h0).lerp(lerp_sv(h1), 1.0 - hf)
    }
}

/// Maps a normalized [0, 1] coordinate onto a clamped axis with
/// `divisions` samples; returns (lower index, upper index, fraction).
fn clamped_axis(t: f32, divisions: u32) -> (u32, u32, f32) {
    if divisions <= 1 {
        return (0, 0, 0.0);
    }
    let scaled = t.clamp(0.0, 1.0) * (divisions - 1) as f32;
    let lo = (scaled.floor() as u32).min(divisions - 2);
    (lo, lo + 1, scaled - lo as f32)
}
