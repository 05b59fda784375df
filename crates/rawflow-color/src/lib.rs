//! # rawflow-color
//!
//! Color management for the rawflow pipeline.
//!
//! This crate owns everything between "RGB numbers" and "colors":
//!
//! - [`ColorSpace`] - trait describing an RGB working space and its
//!   relationship to the profile connection space (XYZ at D50)
//! - [`registry`] - process-wide singleton lookup of spaces by name
//! - [`TransferCurve`] - scalar gamma encode/decode
//! - [`HueSatMap`] - 3-D hue/saturation/value correction table built
//!   from camera-profile calibration data
//!
//! # The PCS contract
//!
//! Every space stores a matrix pair: RGB to PCS and its exact inverse.
//! The pair is installed through one constructor
//! ([`PcsConversion::from_rgb_matrix`]) that anchors the matrix to the
//! D50 white and computes the inverse in one step, so the two can
//! never drift apart.
//!
//! # Error philosophy
//!
//! Configuration problems (unknown space name, malformed profile
//! table) log a warning and come back as `None`; the pipeline degrades
//! to the nearest valid result instead of aborting an edit session.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod huesat;
pub mod primaries;
pub mod registry;
pub mod space;
pub mod transfer;

pub use error::{ColorError, ColorResult};
pub use huesat::{HueSatDelta, HueSatMap, MapEncoding};
pub use registry::{lookup_or_create, register};
pub use space::{ColorSpace, IccProfile, PcsConversion};
pub use transfer::TransferCurve;
