//! The caching stage.
//!
//! [`CacheStage`] sits anywhere in the chain and memoizes the upstream
//! response so repeated pulls (redraws, scrolls inside the same view)
//! cost one buffer clone instead of a full re-render. Two cached
//! responses are kept independently, one per precision, because a GUI
//! typically pulls 8-bit for display while an exporter pulls
//! high-precision from the same chain.
//!
//! # ROI policy
//!
//! The cache remembers the region its stored render covered. A new
//! request is served from the cache only if its region is contained in
//! the stored one; otherwise the whole cache is flushed and the new
//! request's region becomes the stored region. Regions are never grown
//! by union: a stored union would promise pixels the cached render
//! never produced.
//!
//! # Debounce
//!
//! Upstream changes flush immediately but are forwarded downstream
//! after a configurable latency, coalesced into a single notification
//! carrying the union of the masks. The window opens at the first
//! change and is not extended by later ones, so a continuous slider
//! drag still yields a redraw per window rather than one at the very
//! end.

use crate::response::{FilterRequest, FilterResponse};
use crate::stage::{forward_changes, ChangedFlags, FilterStage, StageCore};
use rawflow_core::Rect;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Default)]
struct CacheState {
    response: Option<FilterResponse>,
    response8: Option<FilterResponse>,
    roi: Option<Rect>,
}

impl CacheState {
    fn clear(&mut self) {
        self.response = None;
        self.response8 = None;
        self.roi = None;
    }
}

struct PendingNotify {
    /// A latency window is open; further changes only widen the mask.
    armed: bool,
    mask: ChangedFlags,
}

/// Memoizes the upstream response; see the module docs for the ROI and
/// debounce contracts.
pub struct CacheStage {
    core: StageCore,
    latency: Duration,
    state: Mutex<CacheState>,
    pending: Mutex<PendingNotify>,
    weak_self: Weak<CacheStage>,
}

impl CacheStage {
    /// A cache that forwards upstream changes synchronously.
    pub fn new(previous: Arc<dyn FilterStage>) -> Arc<Self> {
        Self::with_latency(previous, Duration::ZERO)
    }

    /// A cache that coalesces upstream changes over `latency` before
    /// forwarding one combined notification.
    pub fn with_latency(previous: Arc<dyn FilterStage>, latency: Duration) -> Arc<Self> {
        let stage = Arc::new_cyclic(|weak| Self {
            core: StageCore::chained(Arc::clone(&previous)),
            latency,
            state: Mutex::new(CacheState::default()),
            pending: Mutex::new(PendingNotify {
                armed: false,
                mask: ChangedFlags::NONE,
            }),
            weak_self: Weak::clone(weak),
        });
        forward_changes(&Arc::downgrade(&stage), &previous);
        stage
    }

    /// Drops both cached responses and the stored region. Idempotent.
    pub fn flush(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.response.is_some() || state.response8.is_some() {
            trace!("cache flushed");
        }
        state.clear();
    }

    /// True if a high-precision response is currently cached.
    pub fn is_populated(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.response.is_some()
    }

    /// Applies the containment-or-flush policy for an incoming
    /// request.
    fn reconcile_roi(&self, state: &mut CacheState, request: &FilterRequest) {
        match (request.roi, state.roi) {
            (Some(wanted), Some(stored)) => {
                if !stored.contains_rect(&wanted) {
                    debug!(
                        stored = ?stored,
                        wanted = ?wanted,
                        "request escapes cached region, flushing"
                    );
                    state.clear();
                    state.roi = Some(wanted);
                }
            }
            (Some(wanted), None) => {
                state.roi = Some(wanted);
            }
            // A full-frame request is only served by a full-frame
            // render; a bounded stored region cannot cover it.
            (None, Some(_)) => {
                debug!("full-frame request against bounded cache, flushing");
                state.clear();
            }
            (None, None) => {}
        }
    }

    fn drain_pending(&self) -> ChangedFlags {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if !pending.armed {
            return ChangedFlags::NONE;
        }
        pending.armed = false;
        std::mem::replace(&mut pending.mask, ChangedFlags::NONE)
    }

    fn fire_pending(&self) {
        let mask = self.drain_pending();
        if !mask.is_empty() {
            self.changed(mask);
        }
    }
}

impl FilterStage for CacheStage {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn core(&self) -> &StageCore {
        &self.core
    }

    fn get_image(&self, request: &FilterRequest) -> FilterResponse {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.reconcile_roi(&mut state, request);
        if state.response.is_none() {
            let resp = match self.core.previous() {
                Some(prev) => prev.get_image(request),
                None => FilterResponse::new(),
            };
            // only a response that actually carries pixels is worth
            // memoizing; empty upstream output passes through
            if resp.image().is_none() {
                return resp;
            }
            state.response = Some(resp);
        }
        state.response.clone().unwrap_or_default()
    }

    fn get_image8(&self, request: &FilterRequest) -> FilterResponse {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.reconcile_roi(&mut state, request);
        if state.response8.is_none() {
            let resp = match self.core.previous() {
                Some(prev) => prev.get_image8(request),
                None => FilterResponse::new(),
            };
            if resp.image8().is_none() {
                return resp;
            }
            state.response8 = Some(resp);
        }
        state.response8.clone().unwrap_or_default()
    }

    fn previous_changed(&self, mask: ChangedFlags) {
        if mask.contains(ChangedFlags::PIXEL_DATA) || mask.contains(ChangedFlags::DIMENSIONS) {
            self.flush();
        }

        let spawn_timer = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.mask |= mask;
            if pending.armed {
                // window already open; the deadline stands
                false
            } else {
                pending.armed = true;
                true
            }
        };
        if !spawn_timer {
            return;
        }

        if self.latency.is_zero() {
            self.fire_pending();
            return;
        }

        let weak = Weak::clone(&self.weak_self);
        let latency = self.latency;
        std::thread::spawn(move || {
            std::thread::sleep(latency);
            if let Some(stage) = weak.upgrade() {
                stage.fire_pending();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawflow_core::ImageHp;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Upstream stub that counts how many times it is pulled.
    struct CountingSource {
        core: StageCore,
        image: ImageHp,
        pulls: AtomicU32,
        pulls8: AtomicU32,
    }

    impl CountingSource {
        fn new(w: u32, h: u32) -> Arc<Self> {
            Arc::new(Self {
                core: StageCore::source(),
                image: ImageHp::filled(w, h, [100, 200, 300]),
                pulls: AtomicU32::new(0),
                pulls8: AtomicU32::new(0),
            })
        }

        fn pulls(&self) -> u32 {
            self.pulls.load(Ordering::SeqCst)
        }
    }

    impl FilterStage for CountingSource {
        fn name(&self) -> &'static str {
            "counting-source"
        }

        fn core(&self) -> &StageCore {
            &self.core
        }

        fn get_image(&self, request: &FilterRequest) -> FilterResponse {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            let mut resp = FilterResponse::new();
            match request.roi {
                Some(roi) => {
                    let clipped = roi.clamped_to(&self.image.bounds());
                    if let Ok(sub) = self.image.crop(clipped) {
                        resp.set_image(sub);
                    }
                }
                None => resp.set_image(self.image.clone()),
            }
            resp
        }

        fn get_image8(&self, _request: &FilterRequest) -> FilterResponse {
            self.pulls8.fetch_add(1, Ordering::SeqCst);
            let mut resp = FilterResponse::new();
            resp.set_image8(rawflow_core::Image8::filled(
                self.image.width(),
                self.image.height(),
                [10, 20, 30],
            ));
            resp
        }

        fn width(&self) -> u32 {
            self.image.width()
        }

        fn height(&self) -> u32 {
            self.image.height()
        }
    }

    #[test]
    fn test_second_pull_is_served_from_cache() {
        let src = CountingSource::new(16, 16);
        let cache = CacheStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);

        let a = cache.get_image(&FilterRequest::new());
        let b = cache.get_image(&FilterRequest::new());
        assert_eq!(src.pulls(), 1);
        assert!(a.image().unwrap().shares_buffer(b.image().unwrap()));
    }

    #[test]
    fn test_contained_roi_hits_escaping_roi_flushes() {
        let src = CountingSource::new(100, 100);
        let cache = CacheStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);

        cache.get_image(&FilterRequest::with_roi(Rect::new(0, 0, 80, 80)));
        assert_eq!(src.pulls(), 1);

        // contained: no upstream pull
        cache.get_image(&FilterRequest::with_roi(Rect::new(10, 10, 40, 40)));
        assert_eq!(src.pulls(), 1);

        // escapes by one pixel: flush, one new pull
        cache.get_image(&FilterRequest::with_roi(Rect::new(10, 10, 80, 10)));
        assert_eq!(src.pulls(), 2);

        // the new stored region is the last request, not a union
        cache.get_image(&FilterRequest::with_roi(Rect::new(0, 0, 40, 40)));
        assert_eq!(src.pulls(), 3);
    }

    #[test]
    fn test_full_frame_request_after_roi_render() {
        let src = CountingSource::new(50, 50);
        let cache = CacheStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);

        cache.get_image(&FilterRequest::with_roi(Rect::new(0, 0, 10, 10)));
        let full = cache.get_image(&FilterRequest::new());
        // a 10x10 render must not be served for the whole frame
        assert_eq!(full.image().unwrap().dimensions(), (50, 50));
        assert_eq!(src.pulls(), 2);
    }

    #[test]
    fn test_precisions_cache_independently() {
        let src = CountingSource::new(8, 8);
        let cache = CacheStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);

        cache.get_image(&FilterRequest::new());
        cache.get_image8(&FilterRequest::new());
        cache.get_image8(&FilterRequest::new());
        assert_eq!(src.pulls(), 1);
        assert_eq!(src.pulls8.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_upstream_change_flushes() {
        let src = CountingSource::new(8, 8);
        let cache = CacheStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);

        cache.get_image(&FilterRequest::new());
        assert!(cache.is_populated());

        src.changed(ChangedFlags::PIXEL_DATA);
        assert!(!cache.is_populated());

        cache.get_image(&FilterRequest::new());
        assert_eq!(src.pulls(), 2);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let src = CountingSource::new(8, 8);
        let cache = CacheStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);
        cache.flush();
        cache.get_image(&FilterRequest::new());
        cache.flush();
        cache.flush();
        assert!(!cache.is_populated());
    }

    #[test]
    fn test_zero_latency_forwards_synchronously() {
        let src = CountingSource::new(8, 8);
        let cache = CacheStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);

        let hits = Arc::new(AtomicU32::new(0));
        let hits2 = Arc::clone(&hits);
        cache.core().add_listener(Box::new(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        }));

        src.changed(ChangedFlags::PIXEL_DATA);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        src.changed(ChangedFlags::PIXEL_DATA);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_latency_coalesces_into_one_notification() {
        let src = CountingSource::new(8, 8);
        let cache = CacheStage::with_latency(
            Arc::clone(&src) as Arc<dyn FilterStage>,
            Duration::from_millis(50),
        );

        let hits = Arc::new(AtomicU32::new(0));
        let seen = Arc::new(Mutex::new(ChangedFlags::NONE));
        let hits2 = Arc::clone(&hits);
        let seen2 = Arc::clone(&seen);
        cache.core().add_listener(Box::new(move |mask| {
            hits2.fetch_add(1, Ordering::SeqCst);
            let mut seen = seen2.lock().unwrap();
            *seen |= mask;
        }));

        for _ in 0..5 {
            src.changed(ChangedFlags::PIXEL_DATA);
        }
        src.changed(ChangedFlags::DIMENSIONS);
        // nothing forwarded inside the window
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        // but the cache itself is already flushed
        assert!(!cache.is_populated());

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let mask = *seen.lock().unwrap();
        assert!(mask.contains(ChangedFlags::PIXEL_DATA | ChangedFlags::DIMENSIONS));
    }

    #[test]
    fn test_window_reopens_after_firing() {
        let src = CountingSource::new(8, 8);
        let cache = CacheStage::with_latency(
            Arc::clone(&src) as Arc<dyn FilterStage>,
            Duration::from_millis(30),
        );

        let hits = Arc::new(AtomicU32::new(0));
        let hits2 = Arc::clone(&hits);
        cache.core().add_listener(Box::new(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        }));

        src.changed(ChangedFlags::PIXEL_DATA);
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        src.changed(ChangedFlags::PIXEL_DATA);
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
