#![no_main]
use libfuzzer_sys::fuzz_target;
use texpick_log::LogClassifier;

fuzz_target!(|data: &[u8]| {
    // Logs are read lossily, so fuzz the same way.
    let s = String::from_utf8_lossy(data);
    let _ = LogClassifier::new().skip_auxiliary_missing(true).classify(&s);
});
