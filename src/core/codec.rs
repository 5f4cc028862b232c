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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Canonical binary codec and SHA-256 content IDs.
//!
//! Encoding is positional bincode with fixed-width big-endian integers and
//! trailing-byte rejection, so `encode` is bit-stable across runs and
//! platforms. Struct field declaration order is the wire tag order; any
//! change to a record struct is a wire-format change.

use bincode::Options;
use ring::digest;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    /// Malformed input or trailing bytes.
    #[error("malformed encoding")]
    MalformedEncoding,
    #[error("message too large")]
    MessageTooLarge,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint + big-endian gives a stable, platform-independent integer
    // representation. Trailing bytes are a decode error.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules. Requires deterministic container ordering
/// (use BTreeMap/BTreeSet in record types).
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    // Fast-path cap on the raw wire payload.
    if bytes.len() > max {
        return Err(CodecError::MessageTooLarge);
    }
    // Defensive cap inside the deserializer to prevent memory/CPU bombs via
    // large container lengths. `with_limit` is in bytes; keep it aligned to
    // the external `max`.
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::MalformedEncoding)
}

/// SHA-256 digest of `bytes` (32 bytes).
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let d = digest::digest(&digest::SHA256, bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(d.as_ref());
    out
}

/// Content ID: 64-character lowercase hex of SHA-256(`bytes`).
pub fn content_id(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}
