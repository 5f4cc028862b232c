// Copyright (c) 2026 Betanet
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use betanet::core::wallet::{decrypt_content, decrypt_wallet};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing an arbitrary wallet file or content envelope must fail
    // cleanly, never panic. The KDF only runs once the format parses, so a
    // cheap short-circuit passphrase keeps iterations fast.
    if data.len() < 512 {
        let _ = decrypt_wallet(data, "nope");
        let _ = decrypt_content("nope", data);
    }
});
