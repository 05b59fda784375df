//! Per-channel pixel component formats.
//!
//! The pipeline moves two precisions: 16-bit linear ("high precision",
//! what correction stages compute in) and 8-bit display. `f32` is
//! implemented as well for intermediate math that wants normalized
//! values.

/// Trait for pixel component types.
///
/// Implemented for the formats the pipeline produces:
/// - `u16` - high-precision linear channel (0-65535)
/// - `u8` - display channel (0-255)
/// - `f32` - normalized intermediate math
///
/// # Example
///
/// ```rust
/// use rawflow_core::PixelComponent;
///
/// let v: u16 = 32768;
/// assert!((v.to_f32() - 0.5).abs() < 0.001);
///
/// let back: u8 = PixelComponent::from_f32(0.5);
/// assert_eq!(back, 128);
/// ```
pub trait PixelComponent: Copy + Clone + Default + Send + Sync + PartialOrd + 'static {
    /// Additive identity for this format.
    const ZERO: Self;

    /// Maximum representable channel value (1.0 for floats).
    const MAX: Self;

    /// Whether this is a floating-point format.
    const IS_FLOAT: bool;

    /// Converts to normalized f32. Integer formats map their full
    /// range onto [0, 1]; floats pass through unchanged.
    fn to_f32(self) -> f32;

    /// Converts from normalized f32, clamping integer formats to
    /// their representable range.
    fn from_f32(v: f32) -> Self;
}

impl PixelComponent for u8 {
    const ZERO: Self = 0;
    const MAX: Self = u8::MAX;
    const IS_FLOAT: bool = false;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 255.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8
    }
}

impl PixelComponent for u16 {
    const ZERO: Self = 0;
    const MAX: Self = u16::MAX;
    const IS_FLOAT: bool = false;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 65535.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v * 65535.0 + 0.5).clamp(0.0, 65535.0) as u16
    }
}

impl PixelComponent for f32 {
    const ZERO: Self = 0.0;
    const MAX: Self = 1.0;
    const IS_FLOAT: bool = true;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}
