#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Path/MIME validation over arbitrary UTF-8 must not panic, and no
    // accepted path may smuggle traversal.
    if let Ok(s) = std::str::from_utf8(data) {
        if betanet::core::rules::check_path(s).is_ok() {
            assert!(!s.starts_with('/'));
            assert!(!s.split('/').any(|seg| seg == ".."));
        }
        let _ = betanet::core::rules::check_mime(s);
    }
});
