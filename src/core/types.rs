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

//! Record types and wire messages.
//!
//! Field declaration order is the canonical wire order; see `core::codec`.

use crate::core::codec::{content_id, encode_canonical, CodecError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Protocol version carried by every record.
pub const PROTOCOL_VERSION: &str = "v1";

/// Gossipsub topic carrying updates, deletes, and liveness.
pub const UPDATES_TOPIC: &str = "betanet/updates/v1";

/// Stream protocol for head/content lookup.
pub const BROWSE_PROTOCOL: &str = "/betanet/browse/1.0.0";

/// Liveness heartbeat payload, published every 30s and ignored on receipt.
pub const ALIVE_PAYLOAD: &[u8] = b"bn-alive";

/// Ed25519 signature bytes (expected 64).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Empty placeholder used when clearing a signature field for encoding.
    pub fn empty() -> Self {
        Self(Vec::new())
    }
}

/// Ed25519 public key bytes (expected 32).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    /// Interpret as Ed25519 public key bytes if length is 32.
    pub fn as_bytes32(&self) -> Option<[u8; 32]> {
        if self.0.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0);
        Some(out)
    }

    /// Site ID: hex SHA-256 of the public key bytes.
    pub fn site_id(&self) -> String {
        content_id(&self.0)
    }
}

/// Canonical map type alias.
pub type CanonicalMap<K, V> = BTreeMap<K, V>;

/// Head record of a single-file site (append-only log entry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Protocol version ("v1").
    pub version: String,
    /// Long-term site public key.
    pub site_pub: PublicKey,
    /// Sequence number, starting at 1.
    pub seq: u64,
    /// CID of the previous record; empty for genesis.
    pub prev_cid: String,
    /// CID of the associated content blob.
    pub content_cid: String,
    /// Unix seconds.
    pub ts: i64,
    /// Ephemeral per-record public key.
    pub update_pub: PublicKey,
    /// Site-key signature binding `update_pub` to (seq, prev, content, ts).
    pub link_sig: Signature,
    /// Update-key signature over the canonical encoding sans itself.
    pub update_sig: Signature,
}

impl UpdateRecord {
    /// Canonical encoding with `update_sig` cleared to the empty byte string.
    pub fn encode_without_update_sig(&self) -> Result<Vec<u8>, CodecError> {
        let mut r = self.clone();
        r.update_sig = Signature::empty();
        encode_canonical(&r)
    }
}

/// A single file inside a multi-file site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Protocol version ("v1").
    pub version: String,
    /// Long-term site public key.
    pub site_pub: PublicKey,
    /// Relative path inside the site.
    pub path: String,
    /// CID of the file content blob.
    pub content_cid: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Unix seconds.
    pub ts: i64,
    /// Ephemeral per-record public key.
    pub update_pub: PublicKey,
    /// Site-key signature binding `update_pub` to this file's content.
    pub link_sig: Signature,
    /// Update-key signature over the canonical encoding sans itself.
    pub update_sig: Signature,
}

impl FileRecord {
    /// Canonical encoding with `update_sig` cleared to the empty byte string.
    pub fn encode_without_update_sig(&self) -> Result<Vec<u8>, CodecError> {
        let mut r = self.clone();
        r.update_sig = Signature::empty();
        encode_canonical(&r)
    }
}

/// Signed mapping path -> content CID describing a multi-file site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteManifest {
    /// Protocol version ("v1").
    pub version: String,
    /// Long-term site public key.
    pub site_pub: PublicKey,
    /// Sequence number in the site's head chain.
    pub seq: u64,
    /// CID of the previous head record; empty for genesis.
    pub prev_cid: String,
    /// Unix seconds.
    pub ts: i64,
    /// Entry-point path (e.g. "index.html").
    pub main_file: String,
    /// Path -> content CID (canonical ordering).
    pub files: CanonicalMap<String, String>,
    /// Ephemeral per-record public key.
    pub update_pub: PublicKey,
    /// Site-key signature binding `update_pub` to (seq, prev, ts).
    pub link_sig: Signature,
    /// Update-key signature over the canonical encoding sans itself.
    pub update_sig: Signature,
}

impl WebsiteManifest {
    /// Canonical encoding with `update_sig` cleared to the empty byte string.
    pub fn encode_without_update_sig(&self) -> Result<Vec<u8>, CodecError> {
        let mut r = self.clone();
        r.update_sig = Signature::empty();
        encode_canonical(&r)
    }
}

/// Signed authorization to remove a record and/or a content blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRecord {
    /// Protocol version ("v1").
    pub version: String,
    /// Long-term site public key.
    pub site_pub: PublicKey,
    /// CID (or unique prefix) of a record to tombstone, if any.
    pub target_rec: Option<String>,
    /// CID (or unique prefix) of a content blob to tombstone, if any.
    pub target_cont: Option<String>,
    /// Unix seconds.
    pub ts: i64,
    /// Site-key signature over the delete pre-image.
    pub sig: Signature,
}

/// Gossip wire messages on `betanet/updates/v1`.
///
/// The outer enum discriminant replaces trial decoding; the `bn-alive`
/// liveness payload is matched byte-for-byte before decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipMsg {
    /// A new record with optionally inlined content (empty when the publisher
    /// expects receivers to already hold the blob).
    Update {
        /// Canonical record bytes (update record or manifest).
        record: Vec<u8>,
        /// Raw content bytes, possibly empty.
        content: Vec<u8>,
    },
    /// A delete authorization.
    Delete {
        /// Canonical `DeleteRecord` bytes.
        delete: Vec<u8>,
    },
}

/// Browse protocol request (one per stream).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowseRequest {
    /// Look up the current head of a site.
    GetHead {
        /// Site ID (hex SHA-256 of the site public key).
        site_id: String,
    },
    /// Fetch a content blob by CID.
    GetContent {
        /// Content CID.
        content_cid: String,
    },
}

/// Node configuration root (TOML).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node settings.
    pub node: NodeSettings,
    /// P2P settings.
    pub p2p: NodeP2pConfig,
}

/// Node settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Human-readable name.
    pub name: String,
    /// Data directory (db + host identity + wallets).
    pub data_dir: String,
}

/// P2P config embedded in node config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeP2pConfig {
    /// Listen multiaddr.
    pub listen_addr: String,
    /// Gossipsub updates topic.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Bootstrap peers to dial at startup.
    #[serde(default)]
    pub bootstrap: Vec<String>,
    /// Advertise/query mDNS on the local network.
    #[serde(default = "default_true")]
    pub enable_mdns: bool,
}

fn default_topic() -> String {
    UPDATES_TOPIC.to_string()
}

fn default_true() -> bool {
    true
}

/// Browse protocol response (one per stream).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowseResponse {
    /// Head lookup result. `ok = false` means the site is unknown locally.
    Head {
        /// Whether the head was found.
        ok: bool,
        /// Head sequence number.
        seq: u64,
        /// CID of the head record.
        head_cid: String,
        /// Content CID carried by the head record.
        content_cid: String,
    },
    /// Content fetch result. `ok = false` means the blob is absent locally.
    Content {
        /// Whether the blob was found.
        ok: bool,
        /// Raw blob bytes (possibly an encrypted envelope).
        content: Vec<u8>,
    },
}
