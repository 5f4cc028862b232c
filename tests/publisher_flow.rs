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

//! Publisher flow: wallet-driven publishing against the local engine.

use betanet::core::codec::content_id;
use betanet::core::engine::{unix_now, Engine};
use betanet::core::publisher::{Publisher, SiteFile};
use betanet::core::store::Store;
use betanet::core::wallet::{master_from_mnemonic, Wallet};
use bip39::{Language, Mnemonic};

fn fixture_mnemonic() -> String {
    let entropy: Vec<u8> = (0u8..32).collect();
    Mnemonic::from_entropy_in(Language::English, &entropy)
        .expect("fixture entropy")
        .to_string()
}

fn fresh_publisher() -> (Publisher, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path().to_str().unwrap()).expect("store open");
    let engine = Engine::new(store);
    let master = master_from_mnemonic(&fixture_mnemonic()).expect("master");
    let wallet = Wallet::new(unix_now());
    (Publisher::new(engine, master, wallet), dir)
}

#[test]
fn consecutive_updates_chain_automatically() {
    let (mut publisher, _dir) = fresh_publisher();

    let (env1, a1) = publisher.publish_update("mysite", b"rev one").expect("publish 1");
    assert_eq!(a1.seq, 1);
    assert!(!env1.record.is_empty());
    assert_eq!(env1.content, b"rev one");

    let (_env2, a2) = publisher.publish_update("mysite", b"rev two").expect("publish 2");
    assert_eq!(a2.seq, 2);

    let (_env3, a3) = publisher.publish_update("mysite", b"rev three").expect("publish 3");
    assert_eq!(a3.seq, 3);

    // Wallet bookkeeping follows the head.
    let meta = &publisher.wallet().sites["mysite"];
    assert_eq!(meta.seq, 3);
    assert_eq!(meta.head_record_cid, a3.rec_cid);
    assert_eq!(meta.content_cid, content_id(b"rev three"));

    // Independent sites have independent logs.
    let (_env, b1) = publisher.publish_update("othersite", b"hello").expect("publish other");
    assert_eq!(b1.seq, 1);
    assert_ne!(b1.site_id, a1.site_id);
}

#[test]
fn website_publish_produces_broadcastable_set() {
    let (mut publisher, _dir) = fresh_publisher();

    let files = vec![
        SiteFile {
            path: "index.html".to_string(),
            content: b"<html>hi</html>".to_vec(),
            mime_type: "text/html".to_string(),
        },
        SiteFile {
            path: "css/style.css".to_string(),
            content: b"body{}".to_vec(),
            mime_type: "text/css".to_string(),
        },
    ];
    let publish = publisher
        .publish_website("blog", "index.html", files)
        .expect("publish website");

    assert_eq!(publish.file_envelopes.len(), 2);
    assert_eq!(publish.applied.seq, 1);
    assert_eq!(publish.applied.rec_cid, publish.manifest_cid);

    // A second revision chains to seq 2 without the caller tracking heads.
    let publish2 = publisher
        .publish_website(
            "blog",
            "index.html",
            vec![SiteFile {
                path: "index.html".to_string(),
                content: b"<html>v2</html>".to_vec(),
                mime_type: "text/html".to_string(),
            }],
        )
        .expect("publish website 2");
    assert_eq!(publish2.applied.seq, 2);
}

#[test]
fn publish_delete_tombstones_head() {
    let (mut publisher, _dir) = fresh_publisher();

    let (_e1, a1) = publisher.publish_update("mysite", b"one").expect("publish 1");
    let (_e2, a2) = publisher.publish_update("mysite", b"two").expect("publish 2");

    let (_del, _gossip) = publisher
        .publish_delete("mysite", Some(&a2.rec_cid), None)
        .expect("delete");

    // The local engine rewound before anything was broadcast, so the next
    // publish reuses the freed sequence number.
    let (_e3, a3) = publisher.publish_update("mysite", b"two again").expect("republish");
    assert_eq!(a3.seq, 2);
    assert_eq!(a1.seq, 1);
}
