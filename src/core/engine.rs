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

//! Record engine: builds, validates, and applies update/delete/file/manifest
//! records against store invariants.
//!
//! Application is serialized per site: only one record for a given site ID is
//! applied at a time. Ordering across sites is unconstrained.

use crate::core::{
    codec::{content_id, decode_canonical_limited, encode_canonical, CodecError},
    rules::{
        self, RuleError, MAX_RECORD_BYTES,
    },
    signing::{self, SigningError},
    store::{self, KvOp, Store, StoreError},
    types::{
        DeleteRecord, FileRecord, Signature, UpdateRecord, WebsiteManifest, PROTOCOL_VERSION,
    },
};
use ring::signature::Ed25519KeyPair;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

const TX_RETRIES: usize = 3;

/// Engine errors (validation pipeline outcomes and build failures).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed encoding")]
    MalformedEncoding,
    #[error("message too large")]
    MessageTooLarge,
    #[error("bad record version")]
    BadVersion,
    #[error("content cid mismatch")]
    ContentCidMismatch,
    #[error("bad link signature")]
    BadLinkSig,
    #[error("bad update signature")]
    BadUpdateSig,
    #[error("bad delete signature")]
    BadDeleteSig,
    #[error("sequence mismatch")]
    SeqMismatch,
    #[error("prev link mismatch")]
    PrevMismatch,
    #[error("invalid genesis")]
    InvalidGenesis,
    #[error("bad timestamp")]
    BadTimestamp,
    #[error("ownership mismatch")]
    OwnershipMismatch,
    /// Shared validation rule violation.
    #[error("rule: {0}")]
    Rule(RuleError),
    /// Storage failure.
    #[error("store: {0}")]
    Store(StoreError),
    #[error("signing")]
    Signing,
}

impl From<RuleError> for EngineError {
    fn from(e: RuleError) -> Self {
        EngineError::Rule(e)
    }
}
impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
impl From<SigningError> for EngineError {
    fn from(_: SigningError) -> Self {
        EngineError::Signing
    }
}
impl From<CodecError> for EngineError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::MessageTooLarge => EngineError::MessageTooLarge,
            _ => EngineError::MalformedEncoding,
        }
    }
}

/// A built record ready for persistence and broadcast.
#[derive(Clone, Debug)]
pub struct Envelope {
    /// Canonical record bytes.
    pub record: Vec<u8>,
    /// Content bytes (may be empty when the blob is already replicated).
    pub content: Vec<u8>,
}

/// Result of a successful application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    /// Site the record belongs to.
    pub site_id: String,
    /// Accepted sequence number (0 for file records).
    pub seq: u64,
    /// CID of the accepted record.
    pub rec_cid: String,
    /// Content CID carried by the record (empty for manifests).
    pub content_cid: String,
}

/// Decoded website information derived from the current manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebsiteInfo {
    /// CID of the current manifest.
    pub manifest_cid: String,
    /// Entry-point path.
    pub main_file: String,
    /// Path -> content CID.
    pub files: BTreeMap<String, String>,
}

/// Unix seconds now.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Record engine over a shared store.
#[derive(Clone)]
pub struct Engine {
    store: Store,
    site_locks: Arc<Mutex<BTreeMap<String, Arc<Mutex<()>>>>>,
}

impl Engine {
    /// Create an engine over the store.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            site_locks: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn site_lock(&self, site_id: &str) -> Result<Arc<Mutex<()>>, EngineError> {
        let mut map = self
            .site_locks
            .lock()
            .map_err(|_| EngineError::Store(StoreError::TxConflict))?;
        Ok(map
            .entry(site_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn commit_with_retry(&self, ops: Vec<KvOp>) -> Result<(), EngineError> {
        for _ in 0..TX_RETRIES {
            match self.store.commit_atomic(ops.clone()) {
                Ok(()) => return Ok(()),
                Err(StoreError::TxConflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Store(StoreError::TxConflict))
    }

    // ---------------------------------------------------------------------
    // Build
    // ---------------------------------------------------------------------

    /// Build a signed update record for a single-file site.
    ///
    /// The ephemeral update key is generated here, used once, and dropped;
    /// its seed is zeroized by the signing layer.
    pub fn build_update(
        site_kp: &Ed25519KeyPair,
        content: &[u8],
        seq: u64,
        prev_cid: &str,
    ) -> Result<(Envelope, String), EngineError> {
        rules::check_content_size(content.len())?;
        rules::check_seq(seq)?;

        let site_pub = signing::public_key(site_kp);
        let update_kp = signing::generate_ephemeral()?;
        let update_pub = signing::public_key(&update_kp);
        let ts = unix_now();
        let content_cid = content_id(content);

        let mut record = UpdateRecord {
            version: PROTOCOL_VERSION.to_string(),
            site_pub: site_pub.clone(),
            seq,
            prev_cid: prev_cid.to_string(),
            content_cid: content_cid.clone(),
            ts,
            update_pub: update_pub.clone(),
            link_sig: Signature::empty(),
            update_sig: Signature::empty(),
        };

        let link = signing::link_preimage(&site_pub, &update_pub, seq, prev_cid, &content_cid, ts);
        record.link_sig = signing::sign_digest(site_kp, &link);

        let unsigned = record.encode_without_update_sig()?;
        record.update_sig = signing::sign_digest(&update_kp, &signing::update_preimage(&unsigned));

        let bytes = encode_canonical(&record)?;
        rules::check_record_size(bytes.len())?;
        let rec_cid = content_id(&bytes);

        Ok((
            Envelope {
                record: bytes,
                content: content.to_vec(),
            },
            rec_cid,
        ))
    }

    /// Build a signed file record for one path of a multi-file site.
    ///
    /// `update_kp` is the deterministic per-update key derived by the wallet
    /// for this write.
    pub fn build_file_record(
        site_kp: &Ed25519KeyPair,
        update_kp: &Ed25519KeyPair,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<(Envelope, String), EngineError> {
        rules::check_path(path)?;
        rules::check_mime(mime_type)?;
        rules::check_content_size(content.len())?;

        let site_pub = signing::public_key(site_kp);
        let update_pub = signing::public_key(update_kp);
        let ts = unix_now();
        let content_cid = content_id(content);

        let mut record = FileRecord {
            version: PROTOCOL_VERSION.to_string(),
            site_pub: site_pub.clone(),
            path: path.to_string(),
            content_cid: content_cid.clone(),
            mime_type: mime_type.to_string(),
            ts,
            update_pub: update_pub.clone(),
            link_sig: Signature::empty(),
            update_sig: Signature::empty(),
        };

        // File records sit outside the head chain: seq 0, empty prev.
        let link = signing::link_preimage(&site_pub, &update_pub, 0, "", &content_cid, ts);
        record.link_sig = signing::sign_digest(site_kp, &link);

        let unsigned = record.encode_without_update_sig()?;
        record.update_sig = signing::sign_digest(update_kp, &signing::update_preimage(&unsigned));

        let bytes = encode_canonical(&record)?;
        rules::check_record_size(bytes.len())?;
        let rec_cid = content_id(&bytes);

        Ok((
            Envelope {
                record: bytes,
                content: content.to_vec(),
            },
            rec_cid,
        ))
    }

    /// Build a signed website manifest.
    pub fn build_manifest(
        site_kp: &Ed25519KeyPair,
        update_kp: &Ed25519KeyPair,
        seq: u64,
        prev_cid: &str,
        main_file: &str,
        files: BTreeMap<String, String>,
    ) -> Result<(Vec<u8>, String), EngineError> {
        rules::check_seq(seq)?;
        rules::check_manifest_files(files.len())?;
        rules::check_path(main_file)?;
        for (path, cid) in files.iter() {
            rules::check_path(path)?;
            rules::check_cid(cid)?;
        }

        let site_pub = signing::public_key(site_kp);
        let update_pub = signing::public_key(update_kp);
        let ts = unix_now();

        let mut manifest = WebsiteManifest {
            version: PROTOCOL_VERSION.to_string(),
            site_pub: site_pub.clone(),
            seq,
            prev_cid: prev_cid.to_string(),
            ts,
            main_file: main_file.to_string(),
            files,
            update_pub: update_pub.clone(),
            link_sig: Signature::empty(),
            update_sig: Signature::empty(),
        };

        // Manifests carry no single content blob; the link binds chain
        // position only.
        let link = signing::link_preimage(&site_pub, &update_pub, seq, prev_cid, "", ts);
        manifest.link_sig = signing::sign_digest(site_kp, &link);

        let unsigned = manifest.encode_without_update_sig()?;
        manifest.update_sig = signing::sign_digest(update_kp, &signing::update_preimage(&unsigned));

        let bytes = encode_canonical(&manifest)?;
        rules::check_record_size(bytes.len())?;
        let cid = content_id(&bytes);
        Ok((bytes, cid))
    }

    /// Build a signed delete record for a record and/or content CID.
    pub fn build_delete(
        site_kp: &Ed25519KeyPair,
        target_rec: Option<&str>,
        target_cont: Option<&str>,
    ) -> Result<(DeleteRecord, Vec<u8>), EngineError> {
        let site_pub = signing::public_key(site_kp);
        let ts = unix_now();
        let digest = signing::delete_preimage(&site_pub, target_rec, target_cont, ts);
        let del = DeleteRecord {
            version: PROTOCOL_VERSION.to_string(),
            site_pub,
            target_rec: target_rec.map(str::to_string),
            target_cont: target_cont.map(str::to_string),
            ts,
            sig: signing::sign_digest(site_kp, &digest),
        };
        let bytes = encode_canonical(&del)?;
        Ok((del, bytes))
    }

    // ---------------------------------------------------------------------
    // Validate-and-apply
    // ---------------------------------------------------------------------

    /// Trial-decode canonical record bytes (update record, manifest, or file
    /// record) and apply. Signature checks are authoritative, so a mis-typed
    /// decode can never be accepted.
    pub fn apply_record_bytes(
        &self,
        record: &[u8],
        content: &[u8],
    ) -> Result<Applied, EngineError> {
        if let Ok(r) = decode_canonical_limited::<UpdateRecord>(record, MAX_RECORD_BYTES) {
            return self.apply_update(&r, content);
        }
        if let Ok(m) = decode_canonical_limited::<WebsiteManifest>(record, MAX_RECORD_BYTES) {
            return self.apply_manifest(&m);
        }
        if let Ok(f) = decode_canonical_limited::<FileRecord>(record, MAX_RECORD_BYTES) {
            return self.apply_file_record(&f, content);
        }
        Err(EngineError::MalformedEncoding)
    }

    /// Validate an update record against store invariants and persist it.
    pub fn apply_update(
        &self,
        record: &UpdateRecord,
        content: &[u8],
    ) -> Result<Applied, EngineError> {
        if record.version != PROTOCOL_VERSION {
            return Err(EngineError::BadVersion);
        }
        let site_id = record.site_pub.site_id();

        rules::check_seq(record.seq)?;
        rules::check_cid(&record.content_cid)?;
        if !record.prev_cid.is_empty() {
            rules::check_cid(&record.prev_cid)?;
        }

        if !content.is_empty() {
            rules::check_content_size(content.len())?;
            if content_id(content) != record.content_cid {
                return Err(EngineError::ContentCidMismatch);
            }
        }

        let link = signing::link_preimage(
            &record.site_pub,
            &record.update_pub,
            record.seq,
            &record.prev_cid,
            &record.content_cid,
            record.ts,
        );
        signing::verify_digest(&record.site_pub, &link, &record.link_sig)
            .map_err(|_| EngineError::BadLinkSig)?;

        let unsigned = record.encode_without_update_sig()?;
        signing::verify_digest(
            &record.update_pub,
            &signing::update_preimage(&unsigned),
            &record.update_sig,
        )
        .map_err(|_| EngineError::BadUpdateSig)?;

        let bytes = encode_canonical(record)?;
        rules::check_record_size(bytes.len())?;
        let rec_cid = content_id(&bytes);

        let lock = self.site_lock(&site_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| EngineError::Store(StoreError::TxConflict))?;

        match self.store.get_head(&site_id)? {
            Some((head_seq, head_cid)) => {
                // Duplicate receipt of the accepted head is a no-op.
                if record.seq == head_seq && rec_cid == head_cid {
                    return Ok(Applied {
                        site_id,
                        seq: record.seq,
                        rec_cid,
                        content_cid: record.content_cid.clone(),
                    });
                }
                if record.seq != head_seq + 1 {
                    return Err(EngineError::SeqMismatch);
                }
                if record.prev_cid != head_cid {
                    return Err(EngineError::PrevMismatch);
                }
            }
            None => {
                if record.seq != 1 || !record.prev_cid.is_empty() {
                    return Err(EngineError::InvalidGenesis);
                }
            }
        }

        rules::check_timestamp(record.ts, unix_now())
            .map_err(|_| EngineError::BadTimestamp)?;

        let mut ops = vec![
            KvOp::Put {
                key: store::record_key(&rec_cid),
                value: bytes,
            },
            KvOp::Put {
                key: store::site_head_key(&site_id, record.seq),
                value: rec_cid.as_bytes().to_vec(),
            },
        ];
        if !content.is_empty() {
            ops.push(KvOp::Put {
                key: store::content_key(&record.content_cid),
                value: content.to_vec(),
            });
        }
        self.commit_with_retry(ops)?;

        Ok(Applied {
            site_id,
            seq: record.seq,
            rec_cid,
            content_cid: record.content_cid.clone(),
        })
    }

    /// Validate a file record and persist it with its path mapping.
    pub fn apply_file_record(
        &self,
        record: &FileRecord,
        content: &[u8],
    ) -> Result<Applied, EngineError> {
        if record.version != PROTOCOL_VERSION {
            return Err(EngineError::BadVersion);
        }
        let site_id = record.site_pub.site_id();

        rules::check_path(&record.path)?;
        rules::check_mime(&record.mime_type)?;
        rules::check_cid(&record.content_cid)?;

        if !content.is_empty() {
            rules::check_content_size(content.len())?;
            if content_id(content) != record.content_cid {
                return Err(EngineError::ContentCidMismatch);
            }
        }

        let link = signing::link_preimage(
            &record.site_pub,
            &record.update_pub,
            0,
            "",
            &record.content_cid,
            record.ts,
        );
        signing::verify_digest(&record.site_pub, &link, &record.link_sig)
            .map_err(|_| EngineError::BadLinkSig)?;

        let unsigned = record.encode_without_update_sig()?;
        signing::verify_digest(
            &record.update_pub,
            &signing::update_preimage(&unsigned),
            &record.update_sig,
        )
        .map_err(|_| EngineError::BadUpdateSig)?;

        rules::check_timestamp(record.ts, unix_now())
            .map_err(|_| EngineError::BadTimestamp)?;

        let bytes = encode_canonical(record)?;
        rules::check_record_size(bytes.len())?;
        let rec_cid = content_id(&bytes);

        let mut ops = vec![
            KvOp::Put {
                key: store::file_record_key(&rec_cid),
                value: bytes,
            },
            KvOp::Put {
                key: store::site_file_key(&site_id, &record.path),
                value: rec_cid.as_bytes().to_vec(),
            },
        ];
        if !content.is_empty() {
            ops.push(KvOp::Put {
                key: store::content_key(&record.content_cid),
                value: content.to_vec(),
            });
        }
        self.commit_with_retry(ops)?;

        Ok(Applied {
            site_id,
            seq: 0,
            rec_cid,
            content_cid: record.content_cid.clone(),
        })
    }

    /// Validate a website manifest against the site head chain and persist.
    pub fn apply_manifest(&self, manifest: &WebsiteManifest) -> Result<Applied, EngineError> {
        if manifest.version != PROTOCOL_VERSION {
            return Err(EngineError::BadVersion);
        }
        let site_id = manifest.site_pub.site_id();

        rules::check_seq(manifest.seq)?;
        rules::check_manifest_files(manifest.files.len())?;
        rules::check_path(&manifest.main_file)?;
        for (path, cid) in manifest.files.iter() {
            rules::check_path(path)?;
            rules::check_cid(cid)?;
        }
        if !manifest.prev_cid.is_empty() {
            rules::check_cid(&manifest.prev_cid)?;
        }

        let link = signing::link_preimage(
            &manifest.site_pub,
            &manifest.update_pub,
            manifest.seq,
            &manifest.prev_cid,
            "",
            manifest.ts,
        );
        signing::verify_digest(&manifest.site_pub, &link, &manifest.link_sig)
            .map_err(|_| EngineError::BadLinkSig)?;

        let unsigned = manifest.encode_without_update_sig()?;
        signing::verify_digest(
            &manifest.update_pub,
            &signing::update_preimage(&unsigned),
            &manifest.update_sig,
        )
        .map_err(|_| EngineError::BadUpdateSig)?;

        let bytes = encode_canonical(manifest)?;
        rules::check_record_size(bytes.len())?;
        let cid = content_id(&bytes);

        let lock = self.site_lock(&site_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| EngineError::Store(StoreError::TxConflict))?;

        match self.store.get_head(&site_id)? {
            Some((head_seq, head_cid)) => {
                if manifest.seq == head_seq && cid == head_cid {
                    return Ok(Applied {
                        site_id,
                        seq: manifest.seq,
                        rec_cid: cid,
                        content_cid: String::new(),
                    });
                }
                if manifest.seq != head_seq + 1 {
                    return Err(EngineError::SeqMismatch);
                }
                if manifest.prev_cid != head_cid {
                    return Err(EngineError::PrevMismatch);
                }
            }
            None => {
                if manifest.seq != 1 || !manifest.prev_cid.is_empty() {
                    return Err(EngineError::InvalidGenesis);
                }
            }
        }

        rules::check_timestamp(manifest.ts, unix_now())
            .map_err(|_| EngineError::BadTimestamp)?;

        self.commit_with_retry(vec![
            KvOp::Put {
                key: store::manifest_key(&cid),
                value: bytes,
            },
            KvOp::Put {
                key: store::site_manifest_key(&site_id),
                value: cid.as_bytes().to_vec(),
            },
            KvOp::Put {
                key: store::site_head_key(&site_id, manifest.seq),
                value: cid.as_bytes().to_vec(),
            },
        ])?;

        Ok(Applied {
            site_id,
            seq: manifest.seq,
            rec_cid: cid,
            content_cid: String::new(),
        })
    }

    /// Validate and apply a delete record: tombstone the targeted record
    /// and/or content blob, rewinding the site head when it is the target.
    pub fn apply_delete(&self, del: &DeleteRecord) -> Result<(), EngineError> {
        if del.version != PROTOCOL_VERSION {
            return Err(EngineError::BadVersion);
        }
        let digest = signing::delete_preimage(
            &del.site_pub,
            del.target_rec.as_deref(),
            del.target_cont.as_deref(),
            del.ts,
        );
        signing::verify_digest(&del.site_pub, &digest, &del.sig)
            .map_err(|_| EngineError::BadDeleteSig)?;

        rules::check_timestamp(del.ts, unix_now()).map_err(|_| EngineError::BadTimestamp)?;

        let site_id = del.site_pub.site_id();
        let lock = self.site_lock(&site_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| EngineError::Store(StoreError::TxConflict))?;

        let mut ops: Vec<KvOp> = Vec::new();

        if let Some(prefix) = del.target_rec.as_deref() {
            rules::check_hex(prefix)?;
            let cid = self.store.resolve_record_cid(prefix)?;
            let bytes = self
                .store
                .get_record(&cid)?
                .ok_or(EngineError::Store(StoreError::NotFound))?;
            let record: UpdateRecord = decode_canonical_limited(&bytes, MAX_RECORD_BYTES)?;
            // Only the owning site key may tombstone its records.
            if record.site_pub != del.site_pub {
                return Err(EngineError::OwnershipMismatch);
            }

            if let Some((head_seq, head_cid)) = self.store.get_head(&site_id)? {
                if head_cid == cid {
                    // Rewind: drop the head index entry; the predecessor
                    // entry (if any) becomes the head again.
                    ops.push(KvOp::Del {
                        key: store::site_head_key(&site_id, head_seq),
                    });
                    if record.seq > 1 {
                        ops.push(KvOp::Put {
                            key: store::site_head_key(&site_id, record.seq - 1),
                            value: record.prev_cid.as_bytes().to_vec(),
                        });
                    }
                }
            }
            ops.push(KvOp::Del {
                key: store::record_key(&cid),
            });
        }

        if let Some(prefix) = del.target_cont.as_deref() {
            rules::check_hex(prefix)?;
            let cid = self.store.resolve_content_cid(prefix)?;
            ops.push(KvOp::Del {
                key: store::content_key(&cid),
            });
        }

        if ops.is_empty() {
            return Ok(());
        }
        self.commit_with_retry(ops)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Decode the head record of a site, if present.
    pub fn get_head_record(
        &self,
        site_id: &str,
    ) -> Result<Option<(u64, String, UpdateRecord)>, EngineError> {
        let Some((seq, cid)) = self.store.get_head(site_id)? else {
            return Ok(None);
        };
        let Some(bytes) = self.store.get_record(&cid)? else {
            return Ok(None);
        };
        let record: UpdateRecord = decode_canonical_limited(&bytes, MAX_RECORD_BYTES)?;
        Ok(Some((seq, cid, record)))
    }

    /// Decode the current manifest of a site into summary form.
    pub fn get_website_info(&self, site_id: &str) -> Result<Option<WebsiteInfo>, EngineError> {
        let Some((cid, bytes)) = self.store.get_current_website_manifest(site_id)? else {
            return Ok(None);
        };
        let manifest: WebsiteManifest = decode_canonical_limited(&bytes, MAX_RECORD_BYTES)?;
        Ok(Some(WebsiteInfo {
            manifest_cid: cid,
            main_file: manifest.main_file,
            files: manifest.files,
        }))
    }
}
