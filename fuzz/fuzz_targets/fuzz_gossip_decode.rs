// Copyright (c) 2026 Betanet
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use betanet::core::codec::decode_canonical_limited;
use betanet::core::rules::MAX_RECORD_BYTES;
use betanet::core::types::{BrowseRequest, BrowseResponse, GossipMsg};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Wire-facing decoders must never panic on attacker-controlled bytes.
    let _ = decode_canonical_limited::<GossipMsg>(data, MAX_RECORD_BYTES);
    let _ = decode_canonical_limited::<BrowseRequest>(data, MAX_RECORD_BYTES);
    let _ = decode_canonical_limited::<BrowseResponse>(data, MAX_RECORD_BYTES);
});
