#![no_main]

use libfuzzer_sys::fuzz_target;
use procstate_ledger::reader::parse_uid_time_in_state;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must never panic; every accepted row has one value per frequency
        if let Ok(parsed) = parse_uid_time_in_state(input) {
            for times in parsed.times.values() {
                assert_eq!(times.len(), parsed.freqs.len());
            }
        }
    }
});
