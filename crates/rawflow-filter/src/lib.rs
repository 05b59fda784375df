//! # rawflow-filter
//!
//! The image-processing chain: a linked list of stages between the
//! decoded sensor data and whatever consumes the result (a display, an
//! exporter).
//!
//! Two flows run in opposite directions:
//!
//! - **Data pulls** toward the source: calling
//!   [`FilterStage::get_image`] (or `get_image8`) on the last stage
//!   recurses upstream, each stage transforming the response on the
//!   way back.
//! - **Invalidation pushes** toward the consumer: a stage whose
//!   settings changed announces it through [`FilterStage::changed`],
//!   and listeners forward the notification link by link.
//!
//! [`CacheStage`] breaks the pull recursion wherever recomputation is
//! too expensive, and debounces the push flow so rapid slider changes
//! coalesce into few redraws.
//!
//! # Example
//!
//! ```rust
//! use rawflow_core::ImageHp;
//! use rawflow_filter::stages::{ChannelMixStage, DisplayStage, SourceStage};
//! use rawflow_filter::{CacheStage, FilterRequest, FilterStage};
//!
//! let source = SourceStage::with_image(ImageHp::filled(64, 64, [1000, 2000, 3000]));
//! let mix = ChannelMixStage::new(source.clone());
//! let display = DisplayStage::new(mix);
//! let cache = CacheStage::new(display);
//!
//! let preview = cache.get_image8(&FilterRequest::new());
//! assert_eq!(preview.image8().unwrap().dimensions(), (64, 64));
//! ```

#![warn(missing_docs)]

mod cache;
mod response;
mod stage;
pub mod stages;

pub use cache::CacheStage;
pub use response::{
    FilterRequest, FilterResponse, ParamValue, PARAM_EMBEDDED_COLORSPACE, PARAM_FUJI_WIDTH,
    PARAM_IS_PREMULTIPLIED,
};
pub use stage::{forward_changes, ChangeListener, ChangedFlags, FilterStage, StageCore};
