//! Color-space descriptions and the PCS matrix pair.
//!
//! A [`ColorSpace`] is immutable after construction: its conversion
//! matrices, transfer curve, and optional ICC payloads are fixed when
//! the concrete type is built, and the registry hands out shared
//! references for the rest of the process lifetime.

use crate::error::{ColorError, ColorResult};
use crate::primaries::{self, rgb_to_xyz_matrix};
use crate::transfer::TransferCurve;
use rawflow_math::{scale_to_white, Mat3, D50};
use std::sync::Arc;

/// Opaque ICC profile payload.
///
/// The bytes are produced and consumed by external collaborators
/// (loaders, encoders); this layer only carries them around.
#[derive(Debug, Clone)]
pub struct IccProfile {
    data: Arc<Vec<u8>>,
    description: String,
}

impl IccProfile {
    /// Wraps raw profile bytes.
    pub fn from_bytes(data: Vec<u8>, description: impl Into<String>) -> Self {
        Self {
            data: Arc::new(data),
            description: description.into(),
        }
    }

    /// The raw profile bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Human-readable profile description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// The to/from profile-connection-space matrix pair.
///
/// Invariant: `from_pcs` is always the exact matrix inverse of
/// `to_pcs`. The pair is only ever built through
/// [`from_rgb_matrix`](Self::from_rgb_matrix), which anchors the
/// incoming matrix to the D50 white and inverts it in one step, so the
/// pair cannot be mutated piecemeal into an inconsistent state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcsConversion {
    to_pcs: Mat3,
    from_pcs: Mat3,
}

impl Default for PcsConversion {
    /// Identity conversion (the PCS itself).
    fn default() -> Self {
        Self {
            to_pcs: Mat3::IDENTITY,
            from_pcs: Mat3::IDENTITY,
        }
    }
}

impl PcsConversion {
    /// Installs an RGB->PCS matrix.
    ///
    /// The matrix is pre-scaled so RGB white (1, 1, 1) maps exactly
    /// onto the D50 PCS white, then inverted to produce the from-PCS
    /// direction.
    ///
    /// # Errors
    ///
    /// [`ColorError::SingularMatrix`] if the anchored matrix cannot be
    /// inverted.
    pub fn from_rgb_matrix(m: &Mat3, space_name: &str) -> ColorResult<Self> {
        let to_pcs = scale_to_white(m, D50);
        let from_pcs = to_pcs.inverse().ok_or_else(|| ColorError::SingularMatrix {
            space: space_name.to_string(),
        })?;
        Ok(Self { to_pcs, from_pcs })
    }

    /// RGB -> PCS matrix (D50-anchored).
    #[inline]
    pub fn to_pcs(&self) -> &Mat3 {
        &self.to_pcs
    }

    /// PCS -> RGB matrix (exact inverse of [`to_pcs`](Self::to_pcs)).
    #[inline]
    pub fn from_pcs(&self) -> &Mat3 {
        &self.from_pcs
    }
}

/// An RGB working space.
///
/// Implementations are immutable after construction and shared through
/// the [`crate::registry`]. Downstream code treats them uniformly: get
/// the PCS pair for matrix math, the transfer curve for display
/// encoding, the ICC payload for embedding in output files.
pub trait ColorSpace: Send + Sync + std::fmt::Debug {
    /// Registry name (e.g. "sRGB").
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        self.name()
    }

    /// True for spaces that only exist inside the pipeline (never
    /// offered as an export target).
    fn is_internal(&self) -> bool {
        false
    }

    /// The to/from-PCS matrix pair.
    fn pcs(&self) -> &PcsConversion;

    /// The space's transfer curve; identity when the space defines
    /// none.
    fn transfer(&self) -> TransferCurve {
        TransferCurve::Linear
    }

    /// The ICC payload for this space, in the gamma-encoded or linear
    /// variant, or `None` when the space has no profile to embed.
    fn icc_profile(&self, linear: bool) -> Option<&IccProfile> {
        let _ = linear;
        None
    }
}

macro_rules! standard_space {
    ($(#[$doc:meta])* $name:ident, $reg_name:literal, $desc:literal, $prims:expr, $curve:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            pcs: PcsConversion,
        }

        impl $name {
            /// Builds the space from its standard primaries.
            pub fn new() -> Self {
                let m = rgb_to_xyz_matrix(&$prims);
                // standard primaries are never singular
                let pcs = PcsConversion::from_rgb_matrix(&m, $reg_name)
                    .unwrap_or_default();
                Self { pcs }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ColorSpace for $name {
            fn name(&self) -> &str {
                $reg_name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn pcs(&self) -> &PcsConversion {
                &self.pcs
            }

            fn transfer(&self) -> TransferCurve {
                $curve
            }
        }
    };
}

standard_space!(
    /// sRGB, the default display and export space.
    SrgbSpace,
    "sRGB",
    "sRGB (IEC 61966-2-1)",
    primaries::SRGB,
    TransferCurve::Srgb
);

standard_space!(
    /// Adobe RGB (1998).
    AdobeRgbSpace,
    "AdobeRGB",
    "Adobe RGB (1998)",
    primaries::ADOBE_RGB,
    TransferCurve::Power(563.0 / 256.0)
);

standard_space!(
    /// ProPhoto RGB, the wide-gamut editing space.
    ProPhotoSpace,
    "ProPhoto",
    "ProPhoto RGB (ROMM)",
    primaries::PROPHOTO_RGB,
    TransferCurve::Power(1.8)
);

/// A color space assembled at runtime, e.g. from camera metadata or a
/// parsed profile.
///
/// Used for spaces the static factory table does not know about; the
/// caller registers the built instance through
/// [`crate::registry::register`].
#[derive(Debug)]
pub struct CustomSpace {
    name: String,
    description: String,
    pcs: PcsConversion,
    transfer: TransferCurve,
    icc_gamma: Option<IccProfile>,
    icc_linear: Option<IccProfile>,
    internal: bool,
}

impl CustomSpace {
    /// Builds a space from an RGB->PCS matrix.
    ///
    /// # Errors
    ///
    /// [`ColorError::SingularMatrix`] if the matrix cannot be
    /// anchored and inverted.
    pub fn from_matrix(name: impl Into<String>, m: &Mat3) -> ColorResult<Self> {
        let name = name.into();
        let pcs = PcsConversion::from_rgb_matrix(m, &name)?;
        Ok(Self {
            description: name.clone(),
            name,
            pcs,
            transfer: TransferCurve::Linear,
            icc_gamma: None,
            icc_linear: None,
            internal: false,
        })
    }

    /// Sets the transfer curve.
    pub fn with_transfer(mut self, curve: TransferCurve) -> Self {
        self.transfer = curve;
        self
    }

    /// Attaches ICC payloads (gamma-encoded and/or linear variant).
    pub fn with_icc_profiles(
        mut self,
        gamma: Option<IccProfile>,
        linear: Option<IccProfile>,
    ) -> Self {
        self.icc_gamma = gamma;
        self.icc_linear = linear;
        self
    }

    /// Marks the space as pipeline-internal.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

impl ColorSpace for CustomSpace {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_internal(&self) -> bool {
        self.internal
    }

    fn pcs(&self) -> &PcsConversion {
        &self.pcs
    }

    fn transfer(&self) -> TransferCurve {
        self.transfer
    }

    fn icc_profile(&self, linear: bool) -> Option<&IccProfile> {
        if linear {
            self.icc_linear.as_ref()
        } else {
            self.icc_gamma.as_ref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rawflow_math::Vec3;

    fn assert_mat_eq(a: &Mat3, b: &Mat3, eps: f64) {
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(a.m[i][j], b.m[i][j], epsilon = eps);
            }
        }
    }

    #[test]
    fn test_pcs_pair_is_exact_inverse() {
        let m = rgb_to_xyz_matrix(&primaries::SRGB);
        let pcs = PcsConversion::from_rgb_matrix(&m, "sRGB").unwrap();

        let expected_inv = pcs.to_pcs().inverse().unwrap();
        assert_mat_eq(pcs.from_pcs(), &expected_inv, 1e-14);

        // round-trip law on an arbitrary vector
        let v = Vec3::new(0.2, 0.55, 0.83);
        let back = *pcs.from_pcs() * (*pcs.to_pcs() * v);
        assert_relative_eq!(back.x, v.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, v.z, epsilon = 1e-12);
    }

    #[test]
    fn test_pcs_white_is_d50() {
        let m = rgb_to_xyz_matrix(&primaries::ADOBE_RGB);
        let pcs = PcsConversion::from_rgb_matrix(&m, "AdobeRGB").unwrap();
        let white = *pcs.to_pcs() * Vec3::ONE;
        assert_relative_eq!(white.x, D50.x, epsilon = 1e-12);
        assert_relative_eq!(white.y, D50.y, epsilon = 1e-12);
        assert_relative_eq!(white.z, D50.z, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let m = Mat3::from_rows([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.5, 1.0, 1.5]]);
        let err = PcsConversion::from_rgb_matrix(&m, "broken");
        assert!(matches!(err, Err(ColorError::SingularMatrix { .. })));
    }

    #[test]
    fn test_standard_spaces() {
        let srgb = SrgbSpace::new();
        assert_eq!(srgb.name(), "sRGB");
        assert_eq!(srgb.transfer(), TransferCurve::Srgb);
        assert!(!srgb.is_internal());
        assert!(srgb.icc_profile(false).is_none());

        let adobe = AdobeRgbSpace::new();
        assert!(matches!(adobe.transfer(), TransferCurve::Power(_)));

        let pro = ProPhotoSpace::new();
        assert_eq!(pro.transfer(), TransferCurve::Power(1.8));
    }

    #[test]
    fn test_custom_space_icc_variants() {
        let m = rgb_to_xyz_matrix(&primaries::SRGB);
        let space = CustomSpace::from_matrix("CameraRGB", &m)
            .unwrap()
            .with_transfer(TransferCurve::Srgb)
            .with_icc_profiles(
                Some(IccProfile::from_bytes(vec![1, 2, 3], "gamma")),
                None,
            );
        assert_eq!(space.icc_profile(false).unwrap().description(), "gamma");
        assert!(space.icc_profile(true).is_none());
    }
}
