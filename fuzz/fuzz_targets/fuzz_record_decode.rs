// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![no_main]
#![forbid(unsafe_code)]

use betanet::core::codec::{decode_canonical_limited, encode_canonical};
use betanet::core::rules::MAX_RECORD_BYTES;
use betanet::core::types::{DeleteRecord, FileRecord, UpdateRecord, WebsiteManifest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Record decoders must never panic, and anything they accept must
    // round-trip byte-identically.
    if let Ok(r) = decode_canonical_limited::<UpdateRecord>(data, MAX_RECORD_BYTES) {
        let re = encode_canonical(&r).expect("re-encode");
        assert_eq!(re, data);
    }
    let _ = decode_canonical_limited::<FileRecord>(data, MAX_RECORD_BYTES);
    let _ = decode_canonical_limited::<WebsiteManifest>(data, MAX_RECORD_BYTES);
    let _ = decode_canonical_limited::<DeleteRecord>(data, MAX_RECORD_BYTES);
});
