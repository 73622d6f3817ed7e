#![no_main]

use libfuzzer_sys::fuzz_target;
use runtime_guard::{
    parse_property_file, parse_tracer_pid, scan_loaded_modules, EMULATOR_PROPERTIES,
    HOOK_MODULE_MARKERS,
};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let _ = parse_tracer_pid(&text);

    if let Some((path, marker)) = scan_loaded_modules(&text, HOOK_MODULE_MARKERS) {
        assert!(path.to_ascii_lowercase().contains(marker));
    }

    let selector = data.first().copied().unwrap_or(0) as usize;
    let name = EMULATOR_PROPERTIES[selector % EMULATOR_PROPERTIES.len()];
    if let Some(value) = parse_property_file(&text, name) {
        assert!(!value.is_empty());
    }
});
