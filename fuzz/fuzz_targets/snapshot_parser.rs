#![no_main]

use exdrift::snapshot::RelevanceSnapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed snapshots must surface as errors, never as panics
        if let Ok(snapshot) = RelevanceSnapshot::from_json(input) {
            let _ = snapshot.still_active();
            let _ = snapshot.merge(&snapshot);
            let _ = snapshot.to_json();
        }
    }
});
