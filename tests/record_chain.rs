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

//! End-to-end chain behavior: genesis publish, append, out-of-order and fork
//! rejection, delete-head rewind.

use betanet::core::codec::{content_id, encode_canonical};
use betanet::core::engine::{unix_now, Engine, EngineError};
use betanet::core::signing;
use betanet::core::store::Store;
use betanet::core::types::{Signature, UpdateRecord, PROTOCOL_VERSION};
use betanet::core::wallet::{master_from_mnemonic, Wallet};
use bip39::{Language, Mnemonic};

fn fixture_mnemonic() -> String {
    let entropy: Vec<u8> = (0u8..32).collect();
    Mnemonic::from_entropy_in(Language::English, &entropy)
        .expect("fixture entropy")
        .to_string()
}

fn fresh_engine() -> (Engine, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().to_str().unwrap()).expect("store open");
    (Engine::new(store), dir)
}

fn site_keypair() -> (ring::signature::Ed25519KeyPair, String) {
    let master = master_from_mnemonic(&fixture_mnemonic()).expect("master");
    let mut wallet = Wallet::new(unix_now());
    let site = wallet
        .ensure_site(&master, "mysite", unix_now())
        .expect("site");
    (site.keypair, site.site_id)
}

#[test]
fn genesis_publish_and_self_read() {
    let (engine, _dir) = fresh_engine();
    let (kp, site_id) = site_keypair();

    let content = b"hello world";
    assert_eq!(
        content_id(content),
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );

    let (env, rec_cid) = Engine::build_update(&kp, content, 1, "").expect("build");
    let applied = engine.apply_record_bytes(&env.record, &env.content).expect("apply");
    assert_eq!(applied.site_id, site_id);
    assert_eq!(applied.rec_cid, rec_cid);

    let head = engine.store().get_head(&site_id).expect("head").expect("some");
    assert_eq!(head, (1, rec_cid.clone()));

    let blob = engine
        .store()
        .get_content(&content_id(content))
        .expect("get content")
        .expect("stored");
    assert_eq!(blob, content);
}

#[test]
fn append_advances_head() {
    let (engine, _dir) = fresh_engine();
    let (kp, site_id) = site_keypair();

    let (e1, c1) = Engine::build_update(&kp, b"hello world", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");

    let (e2, c2) = Engine::build_update(&kp, b"v2", 2, &c1).expect("build 2");
    engine.apply_record_bytes(&e2.record, &e2.content).expect("apply 2");

    let head = engine.store().get_head(&site_id).expect("head").expect("some");
    assert_eq!(head, (2, c2));
}

#[test]
fn out_of_order_sequence_rejected() {
    let (engine, _dir) = fresh_engine();
    let (kp, _site_id) = site_keypair();

    let (e1, c1) = Engine::build_update(&kp, b"hello world", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");
    let (e2, c2) = Engine::build_update(&kp, b"v2", 2, &c1).expect("build 2");
    engine.apply_record_bytes(&e2.record, &e2.content).expect("apply 2");

    // seq must be 3; 4 is a gap.
    let (e4, _) = Engine::build_update(&kp, b"v4", 4, &c2).expect("build 4");
    let err = engine.apply_record_bytes(&e4.record, &e4.content).unwrap_err();
    assert!(matches!(err, EngineError::SeqMismatch));
}

#[test]
fn fork_rejected() {
    let (engine, _dir) = fresh_engine();
    let (kp, _site_id) = site_keypair();

    let (e1, c1) = Engine::build_update(&kp, b"hello world", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");
    let (e2, _c2) = Engine::build_update(&kp, b"v2", 2, &c1).expect("build 2");
    engine.apply_record_bytes(&e2.record, &e2.content).expect("apply 2");

    // A second seq-2 record forking off the genesis.
    let (fork, _) = Engine::build_update(&kp, b"fork", 2, &c1).expect("build fork");
    let err = engine.apply_record_bytes(&fork.record, &fork.content).unwrap_err();
    assert!(matches!(
        err,
        EngineError::SeqMismatch | EngineError::PrevMismatch
    ));
}

#[test]
fn second_genesis_rejected() {
    let (engine, _dir) = fresh_engine();
    let (kp, _site_id) = site_keypair();

    let (e1, _c1) = Engine::build_update(&kp, b"one", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");

    let (e1b, _) = Engine::build_update(&kp, b"other", 1, "").expect("build 1b");
    let err = engine.apply_record_bytes(&e1b.record, &e1b.content).unwrap_err();
    assert!(matches!(err, EngineError::SeqMismatch));
}

#[test]
fn duplicate_apply_is_idempotent() {
    let (engine, _dir) = fresh_engine();
    let (kp, site_id) = site_keypair();

    let (e1, c1) = Engine::build_update(&kp, b"hello world", 1, "").expect("build");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("first apply");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("second apply");

    let head = engine.store().get_head(&site_id).expect("head").expect("some");
    assert_eq!(head, (1, c1));
}

#[test]
fn delete_head_rewinds() {
    let (engine, _dir) = fresh_engine();
    let (kp, site_id) = site_keypair();

    let (e1, c1) = Engine::build_update(&kp, b"hello world", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");
    let (e2, c2) = Engine::build_update(&kp, b"v2", 2, &c1).expect("build 2");
    engine.apply_record_bytes(&e2.record, &e2.content).expect("apply 2");

    let (del, _bytes) = Engine::build_delete(&kp, Some(&c2), None).expect("build delete");
    engine.apply_delete(&del).expect("apply delete");

    assert!(engine.store().get_record(&c2).expect("get").is_none());
    let head = engine.store().get_head(&site_id).expect("head").expect("some");
    assert_eq!(head, (1, c1));
}

#[test]
fn delete_requires_owner_signature() {
    let (engine, _dir) = fresh_engine();
    let (kp, _site_id) = site_keypair();

    let (e1, c1) = Engine::build_update(&kp, b"hello world", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");

    // A different site key attempts the tombstone.
    let master = master_from_mnemonic(&fixture_mnemonic()).expect("master");
    let mut wallet = Wallet::new(unix_now());
    let other = wallet
        .ensure_site(&master, "othersite", unix_now())
        .expect("other site");
    let (del, _) = Engine::build_delete(&other.keypair, Some(&c1), None).expect("build delete");
    let err = engine.apply_delete(&del).unwrap_err();
    assert!(matches!(err, EngineError::OwnershipMismatch));
}

#[test]
fn delete_content_only() {
    let (engine, _dir) = fresh_engine();
    let (kp, _site_id) = site_keypair();

    let (e1, _c1) = Engine::build_update(&kp, b"hello world", 1, "").expect("build 1");
    engine.apply_record_bytes(&e1.record, &e1.content).expect("apply 1");
    let ccid = content_id(b"hello world");

    let (del, _) = Engine::build_delete(&kp, None, Some(&ccid[..12])).expect("build delete");
    engine.apply_delete(&del).expect("apply delete");
    assert!(engine.store().get_content(&ccid).expect("get").is_none());
}

// Manual record construction mirroring the builder, so invalid timestamps
// can be signed correctly and rejected for the right reason.
fn signed_record_with_ts(
    kp: &ring::signature::Ed25519KeyPair,
    content: &[u8],
    seq: u64,
    prev_cid: &str,
    ts: i64,
) -> Vec<u8> {
    let site_pub = signing::public_key(kp);
    let update_kp = signing::generate_ephemeral().expect("ephemeral");
    let update_pub = signing::public_key(&update_kp);
    let ccid = content_id(content);

    let mut record = UpdateRecord {
        version: PROTOCOL_VERSION.to_string(),
        site_pub: site_pub.clone(),
        seq,
        prev_cid: prev_cid.to_string(),
        content_cid: ccid.clone(),
        ts,
        update_pub: update_pub.clone(),
        link_sig: Signature::empty(),
        update_sig: Signature::empty(),
    };
    let link = signing::link_preimage(&site_pub, &update_pub, seq, prev_cid, &ccid, ts);
    record.link_sig = signing::sign_digest(kp, &link);
    let unsigned = record.encode_without_update_sig().expect("encode");
    record.update_sig = signing::sign_digest(&update_kp, &signing::update_preimage(&unsigned));
    encode_canonical(&record).expect("encode full")
}

#[test]
fn timestamp_bounds_enforced() {
    let (engine, _dir) = fresh_engine();
    let (kp, _site_id) = site_keypair();

    let now = unix_now();

    // At the skew limit: accepted.
    let ok = signed_record_with_ts(&kp, b"hello world", 1, "", now + 3600);
    engine.apply_record_bytes(&ok, b"hello world").expect("apply at limit");

    // Past the limit (with margin for clock advance) and non-positive: rejected.
    for bad_ts in [now + 3700, 0] {
        let (engine2, _dir2) = fresh_engine();
        let bad = signed_record_with_ts(&kp, b"hello world", 1, "", bad_ts);
        let err = engine2.apply_record_bytes(&bad, b"hello world").unwrap_err();
        assert!(matches!(err, EngineError::BadTimestamp), "ts {bad_ts}");
    }
}

#[test]
fn mutated_record_rejected() {
    let (engine, _dir) = fresh_engine();
    let (kp, _site_id) = site_keypair();

    let (env, _cid) = Engine::build_update(&kp, b"hello world", 1, "").expect("build");

    // Flip one byte somewhere in the middle of the canonical encoding.
    let mut tampered = env.record.clone();
    let idx = tampered.len() / 2;
    tampered[idx] ^= 0x01;
    let err = engine.apply_record_bytes(&tampered, &env.content).unwrap_err();
    assert!(matches!(
        err,
        EngineError::BadLinkSig
            | EngineError::BadUpdateSig
            | EngineError::ContentCidMismatch
            | EngineError::MalformedEncoding
            | EngineError::BadVersion
            | EngineError::Rule(_)
    ));

    // Content that does not match the pinned CID.
    let err = engine.apply_record_bytes(&env.record, b"not the content").unwrap_err();
    assert!(matches!(err, EngineError::ContentCidMismatch));
}
