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

use betanet::core::rules::{
    check_cid, check_content_size, check_hex, check_manifest_files, check_mime, check_path,
    check_record_size, check_seq, check_timestamp, RuleError, MAX_CONTENT_BYTES,
    MAX_RECORD_BYTES, MAX_SEQ,
};

#[test]
fn hex_rules() {
    assert!(check_hex("deadBEEF").is_ok());
    assert_eq!(check_hex("").unwrap_err(), RuleError::InvalidHex);
    assert_eq!(check_hex("abc").unwrap_err(), RuleError::InvalidHex);
    assert_eq!(check_hex("zz").unwrap_err(), RuleError::InvalidHex);

    let cid = "a".repeat(64);
    assert!(check_cid(&cid).is_ok());
    assert_eq!(check_cid(&cid[..62]).unwrap_err(), RuleError::InvalidHex);
    // CIDs are lowercase only.
    assert_eq!(
        check_cid(&"A".repeat(64)).unwrap_err(),
        RuleError::InvalidHex
    );
}

#[test]
fn mime_rules() {
    for ok in [
        "text/html",
        "image/png",
        "font/woff2",
        "application/x-custom+json",
        "video/mp4",
    ] {
        assert!(check_mime(ok).is_ok(), "mime {ok:?}");
    }
    for bad in ["", "noslash", "/sub", "type/", "sp ace/html", "text/ht ml"] {
        assert_eq!(check_mime(bad).unwrap_err(), RuleError::InvalidMime, "mime {bad:?}");
    }
    // Custom values are capped at 127 chars.
    let long = format!("application/{}", "x".repeat(130));
    assert_eq!(check_mime(&long).unwrap_err(), RuleError::InvalidMime);
}

#[test]
fn path_rules() {
    for ok in ["index.html", "css/style.css", "a/b/c/icon.ico", "notes.md"] {
        assert!(check_path(ok).is_ok(), "path {ok:?}");
    }
    let too_long = format!("{}.html", "a".repeat(255));
    for bad in [
        "",
        "/abs.html",
        "..",
        "../escape.html",
        "a/../b.html",
        "a//b.html",
        "no_extension",
        "script.exe",
        "con.html",
        "com7.css",
        "back\\slash.html",
        too_long.as_str(),
    ] {
        assert_eq!(check_path(bad).unwrap_err(), RuleError::InvalidPath, "path {bad:?}");
    }
    // Reserved names only match the base name, not directories.
    assert!(check_path("con/readme.md").is_ok());
}

#[test]
fn size_boundaries() {
    assert!(check_content_size(1).is_ok());
    assert!(check_content_size(MAX_CONTENT_BYTES).is_ok());
    assert_eq!(
        check_content_size(0).unwrap_err(),
        RuleError::ContentTooLarge
    );
    assert_eq!(
        check_content_size(MAX_CONTENT_BYTES + 1).unwrap_err(),
        RuleError::ContentTooLarge
    );

    assert!(check_record_size(MAX_RECORD_BYTES).is_ok());
    assert_eq!(
        check_record_size(MAX_RECORD_BYTES + 1).unwrap_err(),
        RuleError::RecordTooLarge
    );

    assert!(check_manifest_files(1000).is_ok());
    assert_eq!(
        check_manifest_files(1001).unwrap_err(),
        RuleError::TooManyFiles
    );
}

#[test]
fn seq_bounds() {
    assert!(check_seq(1).is_ok());
    assert!(check_seq(MAX_SEQ).is_ok());
    assert_eq!(check_seq(0).unwrap_err(), RuleError::InvalidSeq);
    assert_eq!(check_seq(MAX_SEQ + 1).unwrap_err(), RuleError::InvalidSeq);
}

#[test]
fn timestamp_bounds() {
    let now = 1_700_000_000i64;
    assert!(check_timestamp(1, now).is_ok());
    assert!(check_timestamp(now + 3600, now).is_ok());
    assert_eq!(
        check_timestamp(now + 3601, now).unwrap_err(),
        RuleError::BadTimestamp
    );
    assert_eq!(check_timestamp(0, now).unwrap_err(), RuleError::BadTimestamp);
    assert_eq!(
        check_timestamp(-5, now).unwrap_err(),
        RuleError::BadTimestamp
    );
}
