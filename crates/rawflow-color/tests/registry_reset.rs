//! Registry teardown behavior.
//!
//! Lives in its own integration binary because resetting the
//! process-wide registry would race the unit tests, which share one
//! process and rely on singletons staying put.

use rawflow_color::primaries::{rgb_to_xyz_matrix, SRGB};
use rawflow_color::space::CustomSpace;
use rawflow_color::{lookup_or_create, register, registry};
use std::sync::Arc;

#[test]
fn reset_clears_registered_and_builtin_instances() {
    let m = rgb_to_xyz_matrix(&SRGB);
    let custom = Arc::new(CustomSpace::from_matrix("SessionRGB", &m).unwrap());
    register(custom);

    let builtin_before = lookup_or_create("sRGB").unwrap();
    assert!(lookup_or_create("SessionRGB").is_some());

    registry::reset_for_tests();

    // runtime-registered spaces are gone for good
    assert!(lookup_or_create("SessionRGB").is_none());

    // built-ins come back through the factory table as new instances
    let builtin_after = lookup_or_create("sRGB").unwrap();
    assert!(!Arc::ptr_eq(&builtin_before, &builtin_after));
    assert_eq!(builtin_after.name(), "sRGB");
}
