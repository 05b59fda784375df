//! Process-wide color-space registry.
//!
//! Spaces are singletons keyed by name: metadata may reference a space
//! long before any stage needs its math, and every consumer must end
//! up with the same instance. The registry is a single mutex-guarded
//! map living for the life of the process; instantiation happens
//! inside the lock, which is acceptable because it is one-time and
//! rare.
//!
//! Built-in names are backed by a static factory table (the original's
//! lookup of dynamic types by name, redone as a compile-time match).
//! Spaces built at runtime - camera profiles, embedded matrices - go
//! in through [`register`].

use crate::space::{AdobeRgbSpace, ColorSpace, ProPhotoSpace, SrgbSpace};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

type SpaceMap = HashMap<String, Arc<dyn ColorSpace>>;

static REGISTRY: OnceLock<Mutex<SpaceMap>> = OnceLock::new();

fn registry() -> &'static Mutex<SpaceMap> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Instantiates a built-in space by name.
fn instantiate(name: &str) -> Option<Arc<dyn ColorSpace>> {
    match name {
        "sRGB" => Some(Arc::new(SrgbSpace::new())),
        "AdobeRGB" => Some(Arc::new(AdobeRgbSpace::new())),
        "ProPhoto" => Some(Arc::new(ProPhotoSpace::new())),
        _ => None,
    }
}

/// Returns the singleton instance for `name`, creating it on first
/// use.
///
/// Unknown names log a warning and return `None`; a missing color
/// space degrades the affected stage, it never aborts the pipeline.
///
/// # Example
///
/// ```rust
/// use rawflow_color::lookup_or_create;
///
/// let a = lookup_or_create("sRGB").unwrap();
/// let b = lookup_or_create("sRGB").unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
///
/// assert!(lookup_or_create("NoSuchSpace").is_none());
/// ```
pub fn lookup_or_create(name: &str) -> Option<Arc<dyn ColorSpace>> {
    let mut map = registry().lock().unwrap_or_else(|e| e.into_inner());
    if let Some(space) = map.get(name) {
        return Some(Arc::clone(space));
    }
    match instantiate(name) {
        Some(space) => {
            map.insert(name.to_string(), Arc::clone(&space));
            Some(space)
        }
        None => {
            warn!(space = name, "unknown color space requested");
            None
        }
    }
}

/// Registers a runtime-built space under its own name.
///
/// If the name is already taken, the existing instance wins (the
/// singleton-per-name property holds) and is returned; otherwise the
/// given instance is stored and returned.
pub fn register(space: Arc<dyn ColorSpace>) -> Arc<dyn ColorSpace> {
    let mut map = registry().lock().unwrap_or_else(|e| e.into_inner());
    let name = space.name().to_string();
    if let Some(existing) = map.get(&name) {
        return Arc::clone(existing);
    }
    map.insert(name, Arc::clone(&space));
    space
}

/// Clears the registry.
///
/// Test-only escape hatch; production code never tears the registry
/// down.
#[doc(hidden)]
pub fn reset_for_tests() {
    let mut map = registry().lock().unwrap_or_else(|e| e.into_inner());
    map.clear();
}
