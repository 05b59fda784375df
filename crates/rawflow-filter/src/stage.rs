//! The stage trait and chain plumbing.
//!
//! A chain is a linked list of stages: the source at one end, the
//! consumer pulling at the other. Data flows by *pull* — a consumer
//! calls [`FilterStage::get_image`] on the last stage and the call
//! recurses toward the source. Invalidation flows by *push* — a stage
//! whose settings changed calls [`FilterStage::changed`] and the
//! notification travels toward the consumer through registered
//! listeners.
//!
//! Listeners hold only weak references to their stage (see
//! [`forward_changes`]); a dropped stage silently stops receiving,
//! with no back-pointers keeping dead chain segments alive.

use crate::response::{FilterRequest, FilterResponse};
use std::ops::{BitOr, BitOrAssign};
use std::sync::{Arc, Mutex, Weak};

/// What aspects of a stage's output changed.
///
/// A bitmask: masks from several coalesced notifications combine with
/// `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangedFlags(u32);

impl ChangedFlags {
    /// Nothing changed.
    pub const NONE: Self = Self(0);
    /// Pixel values changed; cached output is stale.
    pub const PIXEL_DATA: Self = Self(1);
    /// Output geometry changed; layout and pixel data are both stale.
    pub const DIMENSIONS: Self = Self(1 << 1);

    /// True if every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bits are set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ChangedFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangedFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Callback invoked when a stage reports a change.
pub type ChangeListener = Box<dyn Fn(ChangedFlags) + Send + Sync>;

/// The per-stage chain state every implementation embeds: the upstream
/// link and the downstream listener list.
pub struct StageCore {
    previous: Option<Arc<dyn FilterStage>>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl StageCore {
    /// Core for a chain head (no upstream).
    pub fn source() -> Self {
        Self {
            previous: None,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Core for a stage pulling from `previous`.
    pub fn chained(previous: Arc<dyn FilterStage>) -> Self {
        Self {
            previous: Some(previous),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The upstream stage, if any.
    #[inline]
    pub fn previous(&self) -> Option<&Arc<dyn FilterStage>> {
        self.previous.as_ref()
    }

    /// Registers a downstream listener.
    pub fn add_listener(&self, listener: ChangeListener) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }

    /// Invokes every registered listener with `mask`.
    pub fn notify(&self, mask: ChangedFlags) {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(mask);
        }
    }
}

impl std::fmt::Debug for StageCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .listeners
            .lock()
            .map(|l| l.len())
            .unwrap_or(0);
        f.debug_struct("StageCore")
            .field("has_previous", &self.previous.is_some())
            .field("listeners", &count)
            .finish()
    }
}

/// One link in the chain.
///
/// Every `get_*`/`width`/`height` default delegates to the upstream
/// stage, so a stage only overrides what it transforms: a pixel
/// operation overrides [`get_image`](Self::get_image) and leaves
/// geometry alone, a geometry operation overrides all four, and a
/// stage that is a no-op under its current settings overrides nothing
/// at all for that call and passes the upstream response through
/// untouched.
pub trait FilterStage: Send + Sync {
    /// Stable stage name for diagnostics.
    fn name(&self) -> &'static str;

    /// The embedded chain state.
    fn core(&self) -> &StageCore;

    /// Pulls a high-precision render.
    ///
    /// Stages degrade rather than fail: a stage that cannot do its
    /// work (missing input, unusable parameters) returns the upstream
    /// response unmodified.
    fn get_image(&self, request: &FilterRequest) -> FilterResponse {
        match self.core().previous() {
            Some(prev) => prev.get_image(request),
            None => FilterResponse::new(),
        }
    }

    /// Pulls a display-precision render.
    fn get_image8(&self, request: &FilterRequest) -> FilterResponse {
        match self.core().previous() {
            Some(prev) => prev.get_image8(request),
            None => FilterResponse::new(),
        }
    }

    /// Output width under current settings, without rendering.
    fn width(&self) -> u32 {
        self.core().previous().map_or(0, |p| p.width())
    }

    /// Output height under current settings, without rendering.
    fn height(&self) -> u32 {
        self.core().previous().map_or(0, |p| p.height())
    }

    /// Announces that this stage's output changed. Called by the stage
    /// itself after a settings change, and by the default
    /// [`previous_changed`](Self::previous_changed) to re-broadcast
    /// upstream changes.
    fn changed(&self, mask: ChangedFlags) {
        self.core().notify(mask);
    }

    /// Receives an upstream change notification. The default forwards
    /// it downstream unmodified; stages holding derived state (caches)
    /// override this to invalidate first.
    fn previous_changed(&self, mask: ChangedFlags) {
        self.changed(mask);
    }
}

/// Subscribes `stage` to its upstream's change notifications.
///
/// The subscription holds a [`Weak`], so dropping the downstream stage
/// severs it; the upstream listener list never extends a stage's
/// lifetime.
pub fn forward_changes<S>(stage: &Weak<S>, previous: &Arc<dyn FilterStage>)
where
    S: FilterStage + 'static,
{
    let weak = Weak::clone(stage);
    previous.core().add_listener(Box::new(move |mask| {
        if let Some(stage) = weak.upgrade() {
            stage.previous_changed(mask);
        }
    }));
}
