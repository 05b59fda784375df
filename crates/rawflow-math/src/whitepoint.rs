//! Standard illuminant white points and white-point anchoring.
//!
//! The profile connection space used by the color layer is XYZ with a
//! D50 white, matching ICC convention. Camera and working-space
//! matrices arrive referenced to arbitrary whites; [`scale_to_white`]
//! anchors them so RGB white (1, 1, 1) lands exactly on the PCS white.

use crate::{Mat3, Vec3};

/// CIE Standard Illuminant D50 (~5000K).
///
/// The ICC profile connection space white point; everything the color
/// layer stores as "to PCS" is referenced to this.
pub const D50: Vec3 = Vec3::new(0.96422, 1.0, 0.82521);

/// CIE Standard Illuminant D65 (daylight, ~6500K).
///
/// Reference white of sRGB and AdobeRGB primaries.
pub const D65: Vec3 = Vec3::new(0.95047, 1.0, 1.08883);

/// Pre-scales an RGB->XYZ matrix so that RGB white maps exactly onto
/// `target`.
///
/// Computes `w = m * (1,1,1)` and returns `diag(target/w) * m`. This
/// is the diagonal von-Kries-in-XYZ adaptation step applied once when
/// a color space's conversion matrix is installed; after it, the
/// stored matrix satisfies `m * ONE == target` to machine precision.
///
/// A degenerate matrix whose white has a zero component is returned
/// unchanged (there is nothing meaningful to anchor).
///
/// # Example
///
/// ```rust
/// use rawflow_math::{scale_to_white, Mat3, Vec3, D50};
///
/// let m = Mat3::from_rows([
///     [0.4124564, 0.3575761, 0.1804375],
///     [0.2126729, 0.7151522, 0.0721750],
///     [0.0193339, 0.1191920, 0.9503041],
/// ]);
/// let anchored = scale_to_white(&m, D50);
/// let white = anchored * Vec3::ONE;
/// assert!((white.x - D50.x).abs() < 1e-12);
/// assert!((white.y - D50.y).abs() < 1e-12);
/// assert!((white.z - D50.z).abs() < 1e-12);
/// ```
pub fn scale_to_white(m: &Mat3, target: Vec3) -> Mat3 {
    let w = *m * Vec3::ONE;
    if w.x.abs() < 1e-14 || w.y.abs() < 1e-14 || w.z.abs() < 1e-14 {
        return *m;
    }
    Mat3::diagonal(target.x / w.x, target.y / w.y, target.z / w.z) * *m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_anchored_white_is_exact() {
        let m = Mat3::from_rows([
            [0.5767309, 0.1855540, 0.1881852],
            [0.2973769, 0.6273491, 0.0752741],
            [0.0270343, 0.0706872, 0.9911085],
        ]);
        let anchored = scale_to_white(&m, D50);
        let white = anchored * Vec3::ONE;
        assert_relative_eq!(white.x, D50.x, epsilon = 1e-12);
        assert_relative_eq!(white.y, D50.y, epsilon = 1e-12);
        assert_relative_eq!(white.z, D50.z, epsilon = 1e-12);
    }

    #[test]
    fn test_already_anchored_is_unchanged() {
        let m = Mat3::diagonal(D50.x, D50.y, D50.z);
        let anchored = scale_to_white(&m, D50);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(anchored.m[i][j], m.m[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_degenerate_white_passes_through() {
        // second row sums to zero, so the white Y component vanishes
        let m = Mat3::from_rows([[1.0, 0.0, 0.0], [1.0, -2.0, 1.0], [0.0, 0.0, 1.0]]);
        let out = scale_to_white(&m, D50);
        assert_eq!(out, m);
    }
}
