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

//! Delete records: prefix targets, non-head deletes, and tampered
//! signatures.

use betanet::core::codec::encode_canonical;
use betanet::core::engine::{unix_now, Engine, EngineError};
use betanet::core::store::{Store, StoreError};
use betanet::core::wallet::{master_from_mnemonic, Wallet};
use bip39::{Language, Mnemonic};

fn fixture_site() -> betanet::core::wallet::SiteKey {
    let entropy: Vec<u8> = (0u8..32).collect();
    let phrase = Mnemonic::from_entropy_in(Language::English, &entropy)
        .unwrap()
        .to_string();
    let master = master_from_mnemonic(&phrase).expect("master");
    let mut wallet = Wallet::new(unix_now());
    wallet.ensure_site(&master, "mysite", unix_now()).expect("site")
}

fn fresh_engine() -> (Engine, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().to_str().unwrap()).expect("store open");
    (Engine::new(store), dir)
}

#[test]
fn delete_by_record_prefix() {
    let (engine, _dir) = fresh_engine();
    let site = fixture_site();

    let (e1, c1) = Engine::build_update(&site.keypair, b"one", 1, "").expect("build");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply");

    let (del, _) = Engine::build_delete(&site.keypair, Some(&c1[..10]), None).expect("build del");
    engine.apply_delete(&del).expect("apply del");
    assert!(engine.store().get_record(&c1).expect("get").is_none());
    // Genesis was the head; the site is now empty.
    assert!(engine.store().get_head(&site.site_id).expect("head").is_none());
}

#[test]
fn delete_of_non_head_keeps_head() {
    let (engine, _dir) = fresh_engine();
    let site = fixture_site();

    let (e1, c1) = Engine::build_update(&site.keypair, b"one", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");
    let (e2, c2) = Engine::build_update(&site.keypair, b"two", 2, &c1).expect("build 2");
    engine.apply_record_bytes(&e2.record, &e2.content).expect("apply 2");
    let (e3, c3) = Engine::build_update(&site.keypair, b"three", 3, &c2).expect("build 3");
    engine.apply_record_bytes(&e3.record, &e3.content).expect("apply 3");

    // Tombstone the interior record. The chain is opaque to the store
    // afterwards: the head is untouched and future appends still validate
    // against it.
    let (del, _) = Engine::build_delete(&site.keypair, Some(&c2), None).expect("build del");
    engine.apply_delete(&del).expect("apply del");

    assert!(engine.store().get_record(&c2).expect("get").is_none());
    let head = engine.store().get_head(&site.site_id).expect("head").expect("some");
    assert_eq!(head, (3, c3.clone()));

    let (e4, c4) = Engine::build_update(&site.keypair, b"four", 4, &c3).expect("build 4");
    engine.apply_record_bytes(&e4.record, &e4.content).expect("apply 4");
    let head = engine.store().get_head(&site.site_id).expect("head").expect("some");
    assert_eq!(head, (4, c4));
}

#[test]
fn delete_with_unknown_target_fails() {
    let (engine, _dir) = fresh_engine();
    let site = fixture_site();

    let (del, _) =
        Engine::build_delete(&site.keypair, Some(&"a".repeat(64)), None).expect("build del");
    let err = engine.apply_delete(&del).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::NotFound)));
}

#[test]
fn tampered_delete_rejected() {
    let (engine, _dir) = fresh_engine();
    let site = fixture_site();

    let (e1, c1) = Engine::build_update(&site.keypair, b"one", 1, "").expect("build");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply");

    let (mut del, _) = Engine::build_delete(&site.keypair, Some(&c1), None).expect("build del");
    // Retarget after signing.
    del.target_cont = Some("ab".repeat(32));
    let err = engine.apply_delete(&del).unwrap_err();
    assert!(matches!(err, EngineError::BadDeleteSig));

    // The record survived.
    assert!(engine.store().get_record(&c1).expect("get").is_some());

    // A delete round-trips the canonical codec unchanged.
    let (del2, bytes) = Engine::build_delete(&site.keypair, None, None).expect("build del2");
    let back: betanet::core::types::DeleteRecord =
        betanet::core::codec::decode_canonical_limited(
            &bytes,
            betanet::core::rules::MAX_RECORD_BYTES,
        )
        .expect("decode");
    assert_eq!(back, del2);
    assert_eq!(encode_canonical(&back).expect("encode"), bytes);
}
