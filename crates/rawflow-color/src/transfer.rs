//! Scalar transfer curves (gamma encode/decode).
//!
//! A transfer curve maps between linear light and an encoded value,
//! per channel. The pipeline uses these at the display boundary (8-bit
//! output) and when profile tables declare sRGB-encoded axes.
//!
//! # Range
//!
//! Encode and decode are exact inverses over [0, 1]; the pure power
//! law extends naturally beyond 1.0, the sRGB piecewise curve clamps
//! negatives to 0.

/// sRGB piecewise decode: encoded -> linear (IEC 61966-2-1).
///
/// ```text
/// if V <= 0.04045:  L = V / 12.92
/// else:             L = ((V + 0.055) / 1.055)^2.4
/// ```
#[inline]
pub fn srgb_decode(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB piecewise encode: linear -> encoded (IEC 61966-2-1).
///
/// ```text
/// if L <= 0.0031308:  V = L * 12.92
/// else:               V = 1.055 * L^(1/2.4) - 0.055
/// ```
#[inline]
pub fn srgb_encode(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Pure power-law decode: `v^gamma`.
#[inline]
pub fn gamma_decode(v: f32, gamma: f32) -> f32 {
    if v <= 0.0 { 0.0 } else { v.powf(gamma) }
}

/// Pure power-law encode: `l^(1/gamma)`.
#[inline]
pub fn gamma_encode(l: f32, gamma: f32) -> f32 {
    if l <= 0.0 { 0.0 } else { l.powf(1.0 / gamma) }
}

/// A 1-D transfer function: a (encode, decode) scalar pair.
///
/// `Linear` is the identity curve handed out when a color space
/// defines no transfer function of its own.
///
/// # Example
///
/// ```rust
/// use rawflow_color::TransferCurve;
///
/// let curve = TransferCurve::Srgb;
/// let encoded = curve.encode(0.214);
/// assert!((encoded - 0.5).abs() < 0.01);
/// assert!((curve.decode(encoded) - 0.214).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransferCurve {
    /// Identity (no encoding).
    #[default]
    Linear,
    /// sRGB piecewise curve.
    Srgb,
    /// Pure power law with the given gamma (e.g. 2.2 for AdobeRGB,
    /// 1.8 for ProPhoto).
    Power(f32),
}

impl TransferCurve {
    /// Encodes linear light for storage/display.
    #[inline]
    pub fn encode(self, l: f32) -> f32 {
        match self {
            Self::Linear => l,
            Self::Srgb => srgb_encode(l),
            Self::Power(g) => gamma_encode(l, g),
        }
    }

    /// Decodes an encoded value back to linear light.
    #[inline]
    pub fn decode(self, v: f32) -> f32 {
        match self {
            Self::Linear => v,
            Self::Srgb => srgb_decode(v),
            Self::Power(g) => gamma_decode(v, g),
        }
    }

    /// Returns true for the identity curve.
    #[inline]
    pub fn is_linear(self) -> bool {
        matches!(self, Self::Linear)
    }
}
