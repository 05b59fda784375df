//! RGB chromaticity primaries and RGB->XYZ matrix derivation.
//!
//! A working space is defined by the CIE xy chromaticities of its
//! three primaries and its white point. From those, the RGB->XYZ
//! matrix follows by solving for the per-primary scale that maps RGB
//! white onto the white point.

use rawflow_math::{Mat3, Vec3};

/// Chromaticity description of an RGB space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticities {
    /// Red primary (x, y)
    pub r: (f64, f64),
    /// Green primary (x, y)
    pub g: (f64, f64),
    /// Blue primary (x, y)
    pub b: (f64, f64),
    /// White point (x, y)
    pub w: (f64, f64),
}

/// D65 white point chromaticity (daylight, ~6500K).
pub const D65_XY: (f64, f64) = (0.31270, 0.32900);

/// D50 white point chromaticity (~5000K).
pub const D50_XY: (f64, f64) = (0.34567, 0.35850);

/// sRGB primaries (D65 white point).
pub const SRGB: Chromaticities = Chromaticities {
    r: (0.6400, 0.3300),
    g: (0.3000, 0.6000),
    b: (0.1500, 0.0600),
    w: D65_XY,
};

/// Adobe RGB (1998) primaries (D65 white point).
pub const ADOBE_RGB: Chromaticities = Chromaticities {
    r: (0.6400, 0.3300),
    g: (0.2100, 0.7100),
    b: (0.1500, 0.0600),
    w: D65_XY,
};

/// ProPhoto RGB primaries (D50 white point).
pub const PROPHOTO_RGB: Chromaticities = Chromaticities {
    r: (0.7347, 0.2653),
    g: (0.1596, 0.8404),
    b: (0.0366, 0.0001),
    w: D50_XY,
};

/// Converts xy chromaticity to XYZ with Y = 1.
fn xy_to_xyz(x: f64, y: f64) -> Vec3 {
    if y.abs() < 1e-12 {
        Vec3::ZERO
    } else {
        Vec3::new(x / y, 1.0, (1.0 - x - y) / y)
    }
}

/// Computes the RGB->XYZ matrix for a set of primaries.
///
/// 1. Convert xy chromaticities to XYZ (Y = 1)
/// 2. Solve `M * s = W` for the per-primary scale factors
/// 3. Scale the primary columns by those factors
///
/// The resulting matrix maps RGB white (1, 1, 1) onto the space's own
/// white point. The D50 anchoring required by the PCS happens later,
/// in [`crate::PcsConversion::from_rgb_matrix`].
///
/// # Example
///
/// ```rust
/// use rawflow_color::primaries::{rgb_to_xyz_matrix, SRGB};
/// use rawflow_math::Vec3;
///
/// let m = rgb_to_xyz_matrix(&SRGB);
/// let white = m * Vec3::ONE;
/// assert!((white.y - 1.0).abs() < 1e-9);
/// ```
pub fn rgb_to_xyz_matrix(p: &Chromaticities) -> Mat3 {
    let r = xy_to_xyz(p.r.0, p.r.1);
    let g = xy_to_xyz(p.g.0, p.g.1);
    let b = xy_to_xyz(p.b.0, p.b.1);
    let w = xy_to_xyz(p.w.0, p.w.1);

    let m = Mat3::from_col_vecs(r, g, b);
    let s = match m.inverse() {
        Some(inv) => inv * w,
        None => Vec3::ONE,
    };

    Mat3::from_col_vecs(r * s.x, g * s.y, b * s.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_srgb_matrix_matches_reference() {
        let m = rgb_to_xyz_matrix(&SRGB);
        // IEC 61966-2-1 reference coefficients
        assert_relative_eq!(m.m[0][0], 0.4124564, epsilon = 1e-4);
        assert_relative_eq!(m.m[1][0], 0.2126729, epsilon = 1e-4);
        assert_relative_eq!(m.m[2][2], 0.9503041, epsilon = 1e-4);
    }

    #[test]
    fn test_white_maps_to_white_point() {
        for p in [SRGB, ADOBE_RGB, PROPHOTO_RGB] {
            let m = rgb_to_xyz_matrix(&p);
            let white = m * Vec3::ONE;
            let expected = xy_to_xyz(p.w.0, p.w.1);
            assert_relative_eq!(white.x, expected.x, epsilon = 1e-9);
            assert_relative_eq!(white.y, 1.0, epsilon = 1e-9);
            assert_relative_eq!(white.z, expected.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_matrices_are_invertible() {
        for p in [SRGB, ADOBE_RGB, PROPHOTO_RGB] {
            assert!(rgb_to_xyz_matrix(&p).inverse().is_some());
        }
    }
}
