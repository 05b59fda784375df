//! Concrete pipeline stages.

mod channel_mix;
mod display;
mod rotate;
mod source;

pub use channel_mix::{ChannelMixStage, FIXED_POINT_BITS};
pub use display::DisplayStage;
pub use rotate::RotateStage;
pub use source::SourceStage;
