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

use betanet::core::codec::content_id;
use betanet::core::store::{content_key, record_key, KvOp, Store, StoreError};

fn fresh_store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().to_str().unwrap()).expect("open");
    (store, dir)
}

#[test]
fn record_and_content_roundtrip() {
    let (store, _dir) = fresh_store();
    let bytes = b"record bytes".to_vec();
    let cid = content_id(&bytes);

    store.put_record(&cid, &bytes).expect("put record");
    assert_eq!(store.get_record(&cid).expect("get"), Some(bytes.clone()));
    store.delete_record(&cid).expect("delete");
    assert_eq!(store.get_record(&cid).expect("get"), None);

    store.put_content(&cid, &bytes).expect("put content");
    assert_eq!(store.get_content(&cid).expect("get"), Some(bytes));
    store.delete_content(&cid).expect("delete");
    assert_eq!(store.get_content(&cid).expect("get"), None);
}

#[test]
fn prefix_resolution() {
    let (store, _dir) = fresh_store();

    let a = content_id(b"a");
    let b = content_id(b"b");
    store.put_record(&a, b"a").expect("put a");
    store.put_record(&b, b"b").expect("put b");

    // Unique full CID resolves from a short prefix.
    assert_eq!(store.resolve_record_cid(&a[..8]).expect("resolve"), a);
    assert_eq!(store.resolve_record_cid(&a).expect("resolve full"), a);

    // Empty prefix matches everything.
    assert_eq!(
        store.resolve_record_cid("").unwrap_err(),
        StoreError::AmbiguousPrefix
    );
    assert_eq!(
        store.resolve_record_cid("ffff").unwrap_err(),
        StoreError::NotFound
    );

    // Content keyspace is independent.
    assert_eq!(
        store.resolve_content_cid(&a[..8]).unwrap_err(),
        StoreError::NotFound
    );
}

#[test]
fn head_tracking_returns_largest_seq() {
    let (store, _dir) = fresh_store();
    let site = "s".repeat(64);

    assert!(!store.has_head(&site).expect("has_head"));
    store.set_head(&site, 1, "cid-1").expect("set 1");
    store.set_head(&site, 2, "cid-2").expect("set 2");
    // Idempotent re-set.
    store.set_head(&site, 2, "cid-2").expect("set 2 again");
    // Double-digit seq must sort above single-digit.
    for seq in 3..=10 {
        store.set_head(&site, seq, &format!("cid-{seq}")).expect("set");
    }

    assert!(store.has_head(&site).expect("has_head"));
    let (seq, cid) = store.get_head(&site).expect("get").expect("some");
    assert_eq!(seq, 10);
    assert_eq!(cid, "cid-10");
}

#[test]
fn domains_are_write_once() {
    let (store, _dir) = fresh_store();

    store.put_domain("example.bn", "site-a").expect("bind");
    // Same binding is a no-op.
    store.put_domain("example.bn", "site-a").expect("rebind same");
    // A different site is rejected.
    assert_eq!(
        store.put_domain("example.bn", "site-b").unwrap_err(),
        StoreError::DomainTaken
    );

    assert_eq!(store.resolve_domain("example.bn").expect("resolve"), "site-a");
    assert_eq!(
        store.resolve_domain("missing.bn").unwrap_err(),
        StoreError::NotFound
    );

    store.put_domain("other.bn", "site-b").expect("bind other");
    let mut domains = store.list_domains().expect("list");
    domains.sort();
    assert_eq!(
        domains,
        vec![
            ("example.bn".to_string(), "site-a".to_string()),
            ("other.bn".to_string(), "site-b".to_string()),
        ]
    );
}

#[test]
fn invalid_domains_rejected() {
    let (store, _dir) = fresh_store();
    for bad in ["", "nodot", ".tld", "label.", "a.b.c", "sp ace.bn", "x-!.bn"] {
        assert_eq!(
            store.put_domain(bad, "site").unwrap_err(),
            StoreError::InvalidDomain,
            "domain {bad:?}"
        );
    }
}

#[test]
fn website_manifest_pointer_and_files() {
    let (store, _dir) = fresh_store();
    let site = content_id(b"site-pub");

    let manifest_bytes = b"manifest-bytes".to_vec();
    let manifest_cid = content_id(&manifest_bytes);
    store
        .put_website_manifest(&site, &manifest_cid, &manifest_bytes)
        .expect("put manifest");

    let (cid, bytes) = store
        .get_current_website_manifest(&site)
        .expect("get")
        .expect("some");
    assert_eq!(cid, manifest_cid);
    assert_eq!(bytes, manifest_bytes);

    let rec = b"file-record".to_vec();
    let rec_cid = content_id(&rec);
    store
        .put_file_record(&site, "css/style.css", &rec_cid, &rec)
        .expect("put file record");
    store
        .put_file_record(&site, "index.html", &rec_cid, &rec)
        .expect("put file record 2");

    assert_eq!(store.get_file_record(&rec_cid).expect("get"), Some(rec));

    let mut files = store.list_website_files(&site).expect("list");
    files.sort();
    assert_eq!(
        files,
        vec![
            ("css/style.css".to_string(), rec_cid.clone()),
            ("index.html".to_string(), rec_cid.clone()),
        ]
    );
}

#[test]
fn commit_atomic_spans_keyspaces() {
    let (store, _dir) = fresh_store();
    let rec_cid = content_id(b"rec");
    let cont_cid = content_id(b"cont");

    store
        .commit_atomic(vec![
            KvOp::Put {
                key: record_key(&rec_cid),
                value: b"rec".to_vec(),
            },
            KvOp::Put {
                key: content_key(&cont_cid),
                value: b"cont".to_vec(),
            },
            KvOp::Del {
                key: record_key(&rec_cid),
            },
        ])
        .expect("commit");

    // The record was inserted then deleted inside one transaction; the
    // content write survived.
    assert_eq!(store.get_record(&rec_cid).expect("get"), None);
    assert_eq!(
        store.get_content(&cont_cid).expect("get"),
        Some(b"cont".to_vec())
    );
}
