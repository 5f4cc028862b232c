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

//! Validation rules shared by all record kinds: size, path, MIME,
//! timestamp-skew, and hex-format checks.

use thiserror::Error;

/// Maximum canonical record size in bytes.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;
/// Maximum content blob size in bytes.
pub const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;
/// Maximum number of files in a website manifest.
pub const MAX_MANIFEST_FILES: usize = 1000;
/// Maximum path length in characters.
pub const MAX_PATH_LEN: usize = 255;
/// Maximum MIME type length in characters.
pub const MAX_MIME_LEN: usize = 127;
/// Maximum sequence number (2^63 - 1).
pub const MAX_SEQ: u64 = i64::MAX as u64;
/// Maximum accepted future timestamp skew in seconds.
pub const MAX_TS_SKEW_SECS: i64 = 3600;
/// Maximum site label length in characters.
pub const MAX_LABEL_LEN: usize = 100;

const MIME_ALLOWLIST: &[&str] = &[
    "text/html",
    "text/css",
    "application/javascript",
    "application/json",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/svg+xml",
    "image/x-icon",
    "image/webp",
    "image/avif",
    "text/plain",
    "text/markdown",
    "application/xml",
    "font/woff",
    "font/woff2",
    "font/ttf",
    "font/eot",
];

const EXTENSION_ALLOWLIST: &[&str] = &[
    "html", "htm", "css", "js", "png", "jpg", "jpeg", "gif", "svg", "ico", "json", "xml", "txt",
    "md", "woff", "woff2", "ttf", "eot", "webp", "avif",
];

const RESERVED_BASENAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Rule violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("invalid hex")]
    InvalidHex,
    #[error("invalid mime")]
    InvalidMime,
    #[error("invalid path")]
    InvalidPath,
    #[error("content too large")]
    ContentTooLarge,
    #[error("record too large")]
    RecordTooLarge,
    #[error("too many files")]
    TooManyFiles,
    #[error("invalid sequence number")]
    InvalidSeq,
    #[error("bad timestamp")]
    BadTimestamp,
}

/// Hex string: non-empty, even length, `[0-9a-fA-F]` only.
pub fn check_hex(s: &str) -> Result<(), RuleError> {
    if s.is_empty() || s.len() % 2 != 0 {
        return Err(RuleError::InvalidHex);
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RuleError::InvalidHex);
    }
    Ok(())
}

/// Full content ID: exactly 64 lowercase hex characters.
pub fn check_cid(s: &str) -> Result<(), RuleError> {
    if s.len() != 64 {
        return Err(RuleError::InvalidHex);
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(RuleError::InvalidHex);
    }
    Ok(())
}

/// MIME type: allowlisted, or a custom `type/subtype` value up to 127 chars.
pub fn check_mime(mime: &str) -> Result<(), RuleError> {
    if MIME_ALLOWLIST.contains(&mime) {
        return Ok(());
    }
    if mime.is_empty() || mime.len() > MAX_MIME_LEN {
        return Err(RuleError::InvalidMime);
    }
    let mut parts = mime.splitn(2, '/');
    let (ty, sub) = match (parts.next(), parts.next()) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(RuleError::InvalidMime),
    };
    let token_ok = |s: &str| {
        !s.is_empty()
            && s.bytes().all(|b| {
                b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'.' | b'_')
            })
    };
    if !token_ok(ty) || !token_ok(sub) {
        return Err(RuleError::InvalidMime);
    }
    Ok(())
}

/// Site-relative path: non-empty, bounded, no traversal, allowlisted
/// extension, base name not a reserved OS device name.
pub fn check_path(path: &str) -> Result<(), RuleError> {
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return Err(RuleError::InvalidPath);
    }
    if path.starts_with('/') || path.starts_with('\\') || path.contains('\\') {
        return Err(RuleError::InvalidPath);
    }
    if path.contains("//") {
        return Err(RuleError::InvalidPath);
    }
    if path.split('/').any(|seg| seg == "..") {
        return Err(RuleError::InvalidPath);
    }

    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() && !e.is_empty() => (s, e),
        _ => return Err(RuleError::InvalidPath),
    };
    let ext = ext.to_ascii_lowercase();
    if !EXTENSION_ALLOWLIST.contains(&ext.as_str()) {
        return Err(RuleError::InvalidPath);
    }
    let stem = stem.to_ascii_lowercase();
    if RESERVED_BASENAMES.contains(&stem.as_str()) {
        return Err(RuleError::InvalidPath);
    }
    Ok(())
}

/// Content blob size: 0 < n <= 10 MiB.
pub fn check_content_size(n: usize) -> Result<(), RuleError> {
    if n == 0 || n > MAX_CONTENT_BYTES {
        return Err(RuleError::ContentTooLarge);
    }
    Ok(())
}

/// Canonical record size: n <= 1 MiB.
pub fn check_record_size(n: usize) -> Result<(), RuleError> {
    if n > MAX_RECORD_BYTES {
        return Err(RuleError::RecordTooLarge);
    }
    Ok(())
}

/// Manifest file count: n <= 1000.
pub fn check_manifest_files(n: usize) -> Result<(), RuleError> {
    if n > MAX_MANIFEST_FILES {
        return Err(RuleError::TooManyFiles);
    }
    Ok(())
}

/// Sequence number: in [1, 2^63 - 1].
pub fn check_seq(seq: u64) -> Result<(), RuleError> {
    if seq == 0 || seq > MAX_SEQ {
        return Err(RuleError::InvalidSeq);
    }
    Ok(())
}

/// Timestamp: 0 < ts <= now + 3600s.
pub fn check_timestamp(ts: i64, now: i64) -> Result<(), RuleError> {
    if ts <= 0 || ts > now + MAX_TS_SKEW_SECS {
        return Err(RuleError::BadTimestamp);
    }
    Ok(())
}
