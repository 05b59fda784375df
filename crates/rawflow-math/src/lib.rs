//! # rawflow-math
//!
//! Color math for the rawflow pipeline: double-precision 3-vectors and
//! 3x3 matrices, standard illuminant white points, and the white-point
//! scaling step used when a camera RGB matrix is anchored to the
//! profile connection space.
//!
//! Everything here is `f64`. The PCS round-trip (`to_pcs` then
//! `from_pcs` must return the input) is a contract of the color layer,
//! and single precision leaves too little headroom once matrices are
//! products of several derivations.
//!
//! # Dependencies
//!
//! - [`glam`] - interop conversions ([`Mat3::to_glam`])
//!
//! # Used By
//!
//! - `rawflow-color` - PCS conversions, primaries
//! - `rawflow-filter` - fixed-point matrix derivation

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod mat3;
pub mod vec3;
pub mod whitepoint;

pub use mat3::Mat3;
pub use vec3::Vec3;
pub use whitepoint::{scale_to_white, D50, D65};
