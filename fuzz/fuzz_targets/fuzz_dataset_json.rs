//! Fuzz target for dataset JSON parsing and validation.
//!
//! Datasets are user files; parsing and validation must reject bad input
//! with an error and never panic.

#![no_main]

use dpl_core::dataset::Dataset;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(dataset) = Dataset::from_json_str(text) {
        let _ = dataset.validate();
    }
});
