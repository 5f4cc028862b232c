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

//! Multi-file site publishing: file records, manifests, and the manifest
//! head chain.

use std::collections::BTreeMap;

use betanet::core::codec::{content_id, decode_canonical_limited};
use betanet::core::engine::{unix_now, Engine, EngineError};
use betanet::core::rules::MAX_RECORD_BYTES;
use betanet::core::store::Store;
use betanet::core::types::FileRecord;
use betanet::core::wallet::{derive_update_key, master_from_mnemonic, MasterKey, Wallet};
use bip39::{Language, Mnemonic};

fn fixture_master() -> MasterKey {
    let entropy: Vec<u8> = (0u8..32).collect();
    let phrase = Mnemonic::from_entropy_in(Language::English, &entropy)
        .expect("fixture entropy")
        .to_string();
    master_from_mnemonic(&phrase).expect("master")
}

fn fresh_engine() -> (Engine, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().to_str().unwrap()).expect("store open");
    (Engine::new(store), dir)
}

#[test]
fn publish_two_file_site() {
    let (engine, _dir) = fresh_engine();
    let master = fixture_master();
    let mut wallet = Wallet::new(unix_now());
    let site = wallet
        .ensure_site(&master, "blog", unix_now())
        .expect("site");
    let update_kp = derive_update_key(&master, "blog", "rev1").expect("update key");

    let index = b"<html>home</html>".to_vec();
    let style = b"body { color: teal }".to_vec();

    let (f1, f1_cid) = Engine::build_file_record(
        &site.keypair,
        &update_kp,
        "index.html",
        &index,
        "text/html",
    )
    .expect("build index");
    let (f2, f2_cid) = Engine::build_file_record(
        &site.keypair,
        &update_kp,
        "css/style.css",
        &style,
        "text/css",
    )
    .expect("build style");

    let a1 = engine.apply_record_bytes(&f1.record, &f1.content).expect("apply f1");
    assert_eq!(a1.rec_cid, f1_cid);
    engine.apply_record_bytes(&f2.record, &f2.content).expect("apply f2");

    let mut files = BTreeMap::new();
    files.insert("index.html".to_string(), content_id(&index));
    files.insert("css/style.css".to_string(), content_id(&style));

    let (manifest_bytes, manifest_cid) = Engine::build_manifest(
        &site.keypair,
        &update_kp,
        1,
        "",
        "index.html",
        files.clone(),
    )
    .expect("build manifest");

    let applied = engine
        .apply_record_bytes(&manifest_bytes, &[])
        .expect("apply manifest");
    assert_eq!(applied.seq, 1);
    assert_eq!(applied.rec_cid, manifest_cid);

    // The manifest is the site head and the pointer target.
    let head = engine
        .store()
        .get_head(&site.site_id)
        .expect("head")
        .expect("some");
    assert_eq!(head, (1, manifest_cid.clone()));

    let info = engine
        .get_website_info(&site.site_id)
        .expect("info")
        .expect("some");
    assert_eq!(info.manifest_cid, manifest_cid);
    assert_eq!(info.main_file, "index.html");
    assert_eq!(info.files, files);

    // Path mappings point at decodable file records.
    let listed = engine
        .store()
        .list_website_files(&site.site_id)
        .expect("list");
    assert_eq!(listed.len(), 2);
    let (_, rec_cid) = listed
        .iter()
        .find(|(p, _)| p == "index.html")
        .expect("index listed");
    assert_eq!(rec_cid, &f1_cid);
    let rec_bytes = engine
        .store()
        .get_file_record(rec_cid)
        .expect("get")
        .expect("stored");
    let rec: FileRecord = decode_canonical_limited(&rec_bytes, MAX_RECORD_BYTES).expect("decode");
    assert_eq!(rec.path, "index.html");
    assert_eq!(rec.mime_type, "text/html");
    assert_eq!(rec.content_cid, content_id(&index));

    // File contents are retrievable by CID.
    assert_eq!(
        engine
            .store()
            .get_content(&content_id(&style))
            .expect("get")
            .expect("stored"),
        style
    );

    // Second revision chains off the first manifest.
    let update_kp2 = derive_update_key(&master, "blog", "rev2").expect("update key 2");
    let (m2, m2_cid) = Engine::build_manifest(
        &site.keypair,
        &update_kp2,
        2,
        &manifest_cid,
        "index.html",
        files,
    )
    .expect("build manifest 2");
    engine.apply_record_bytes(&m2, &[]).expect("apply manifest 2");
    let head = engine
        .store()
        .get_head(&site.site_id)
        .expect("head")
        .expect("some");
    assert_eq!(head, (2, m2_cid));
}

#[test]
fn manifest_rejects_bad_inputs() {
    let (engine, _dir) = fresh_engine();
    let master = fixture_master();
    let mut wallet = Wallet::new(unix_now());
    let site = wallet
        .ensure_site(&master, "blog", unix_now())
        .expect("site");
    let update_kp = derive_update_key(&master, "blog", "rev1").expect("update key");

    // Traversal path in the file map.
    let mut files = BTreeMap::new();
    files.insert("../evil.html".to_string(), "a".repeat(64));
    assert!(Engine::build_manifest(&site.keypair, &update_kp, 1, "", "index.html", files).is_err());

    // Bad file record mime.
    assert!(matches!(
        Engine::build_file_record(&site.keypair, &update_kp, "index.html", b"x", "nonsense"),
        Err(EngineError::Rule(_))
    ));

    // Manifest with a non-genesis seq against an empty site.
    let (m, _cid) = Engine::build_manifest(
        &site.keypair,
        &update_kp,
        2,
        &"b".repeat(64),
        "index.html",
        BTreeMap::new(),
    )
    .expect("build");
    assert!(matches!(
        engine.apply_record_bytes(&m, &[]).unwrap_err(),
        EngineError::InvalidGenesis
    ));
}

#[test]
fn domain_binding_resolves_site() {
    let (engine, _dir) = fresh_engine();
    let master = fixture_master();
    let mut wallet = Wallet::new(unix_now());
    let site = wallet
        .ensure_site(&master, "blog", unix_now())
        .expect("site");

    engine
        .store()
        .put_domain("blog.bn", &site.site_id)
        .expect("bind");
    assert_eq!(
        engine.store().resolve_domain("blog.bn").expect("resolve"),
        site.site_id
    );
}
