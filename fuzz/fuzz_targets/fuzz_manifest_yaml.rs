//! Fuzz target for MLmodel manifest parsing.
//!
//! Tests that arbitrary manifest text cannot cause panics when parsed and
//! when the python_function entry is extracted.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pyfunc_core::models::manifest::Model;
use pyfunc_core::models::{PyfuncFlavor, FLAVOR_NAME};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(model) = Model::from_yaml(text) {
            let _ = model.flavor::<PyfuncFlavor>(FLAVOR_NAME);
            let _ = model.to_yaml();
        }
    }
});
