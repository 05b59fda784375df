//! # rawflow-core
//!
//! Core types for the rawflow photo-development pipeline.
//!
//! This crate provides the foundational types used throughout the
//! rawflow workspace:
//!
//! - [`Image`] - Shared-ownership image buffer with copy-on-write
//! - [`ImageHp`], [`Image8`] - The two pixel precisions the pipeline moves
//! - [`Rect`] - Rectangles and region-of-interest math
//! - [`PixelComponent`] - Per-channel numeric formats
//!
//! ## Design Philosophy
//!
//! Image buffers are **immutable by default**. Cloning an [`Image`]
//! shares the underlying pixel data, which is what lets a cache and an
//! in-flight response hold the same pixels without copying. A stage
//! that needs to write pixels must first call [`Image::make_mut`],
//! which clones the buffer only when it is actually shared.
//!
//! ## Crate Structure
//!
//! This crate is the foundation of rawflow and has no internal
//! dependencies:
//!
//! ```text
//! rawflow-core (this crate)
//!    ^
//!    |
//!    +-- rawflow-color (color spaces, transfer curves, hue/sat maps)
//!    +-- rawflow-filter (the filter chain)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod image;
pub mod pixel;
pub mod rect;

pub use error::{Error, Result};
pub use image::{Image, Image8, ImageHp};
pub use pixel::PixelComponent;
pub use rect::Rect;
