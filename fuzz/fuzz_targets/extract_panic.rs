#![no_main]
use libfuzzer_sys::fuzz_target;
use texpick_syntax::extract_components;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);
    let components = extract_components(&s);
    for c in &components {
        // Spans must slice cleanly on char boundaries.
        assert!(c.span.end <= s.len());
        assert_eq!(&s[c.span.start..c.span.end], c.body);
    }
});
