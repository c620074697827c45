//! Fuzz target for analysis config parsing (JSON and TOML).
//!
//! Whatever parses must also survive validation and grid construction.

#![no_main]

use dpl_config::{validate_analysis, AnalysisConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for parsed in [
        AnalysisConfig::from_json_str(text),
        AnalysisConfig::from_toml_str(text),
    ] {
        if let Ok(config) = parsed {
            if validate_analysis(&config).is_ok() && config.grid.points <= 100_000 {
                let _ = config.threshold_grid();
            }
        }
    }
});
