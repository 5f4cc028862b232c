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

//! Persistent content-addressed storage using sled.
//!
//! Keyspace (ASCII prefixes):
//!
//! ```text
//! record:{recCID}              canonical record bytes
//! content:{contentCID}         raw or encrypted blob
//! filerecord:{recCID}          canonical FileRecord bytes
//! manifest:{manifestCID}       canonical WebsiteManifest bytes
//! site:{siteID}:manifest       current manifestCID
//! site:{siteID}:file:{path}    fileRecordCID
//! site:{siteID}:head:{seq}     recCID (seq zero-padded so order is numeric)
//! domain:{domain}              siteID
//! ```
//!
//! Multi-key writes go through `commit_atomic`, one sled transaction.

use sled::transaction::ConflictableTransactionError;
use thiserror::Error;

const RECORD_PREFIX: &str = "record:";
const CONTENT_PREFIX: &str = "content:";
const FILERECORD_PREFIX: &str = "filerecord:";
const MANIFEST_PREFIX: &str = "manifest:";
const DOMAIN_PREFIX: &str = "domain:";


/// Store errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("db open")]
    DbOpen,
    #[error("db io")]
    DbIo,
    #[error("tx conflict")]
    TxConflict,
    #[error("not found")]
    NotFound,
    #[error("ambiguous prefix")]
    AmbiguousPrefix,
    /// Domain already bound to a different site (bindings are write-once).
    #[error("domain taken")]
    DomainTaken,
    #[error("invalid domain")]
    InvalidDomain,
}

/// Store write operation.
#[derive(Clone, Debug)]
pub enum KvOp {
    /// Put key/value.
    Put {
        /// Full store key.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Delete key.
    Del {
        /// Full store key.
        key: Vec<u8>,
    },
}

/// Record key: `record:{cid}`.
pub fn record_key(cid: &str) -> Vec<u8> {
    format!("{RECORD_PREFIX}{cid}").into_bytes()
}

/// Content key: `content:{cid}`.
pub fn content_key(cid: &str) -> Vec<u8> {
    format!("{CONTENT_PREFIX}{cid}").into_bytes()
}

/// File record key: `filerecord:{cid}`.
pub fn file_record_key(cid: &str) -> Vec<u8> {
    format!("{FILERECORD_PREFIX}{cid}").into_bytes()
}

/// Manifest key: `manifest:{cid}`.
pub fn manifest_key(cid: &str) -> Vec<u8> {
    format!("{MANIFEST_PREFIX}{cid}").into_bytes()
}

/// Site manifest pointer key: `site:{siteID}:manifest`.
pub fn site_manifest_key(site_id: &str) -> Vec<u8> {
    format!("site:{site_id}:manifest").into_bytes()
}

/// Site file mapping key: `site:{siteID}:file:{path}`.
pub fn site_file_key(site_id: &str, path: &str) -> Vec<u8> {
    format!("site:{site_id}:file:{path}").into_bytes()
}

/// Site head key: `site:{siteID}:head:{seq}`. Seq is zero-padded to 20
/// digits so lexicographic key order is numeric order.
pub fn site_head_key(site_id: &str, seq: u64) -> Vec<u8> {
    format!("site:{site_id}:head:{seq:020}").into_bytes()
}

/// Domain key: `domain:{domain}`.
pub fn domain_key(domain: &str) -> Vec<u8> {
    format!("{DOMAIN_PREFIX}{domain}").into_bytes()
}

/// Domain name: `label.tld`, both parts non-empty alphanumeric.
pub fn check_domain(domain: &str) -> Result<(), StoreError> {
    let mut parts = domain.splitn(2, '.');
    let (label, tld) = match (parts.next(), parts.next()) {
        (Some(l), Some(t)) => (l, t),
        _ => return Err(StoreError::InvalidDomain),
    };
    let alnum = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric());
    if !alnum(label) || !alnum(tld) || tld.contains('.') {
        return Err(StoreError::InvalidDomain);
    }
    Ok(())
}

/// Persistent store wrapper.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
}

impl Store {
    /// Open sled DB at path (directory).
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|_| StoreError::DbOpen)?;
        Ok(Self { db })
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let v = self.db.get(key).map_err(|_| StoreError::DbIo)?;
        Ok(v.map(|iv| iv.to_vec()))
    }

    /// Atomic commit using sled transactions.
    pub fn commit_atomic(&self, ops: Vec<KvOp>) -> Result<(), StoreError> {
        let tree = &self.db;
        let res: Result<(), ConflictableTransactionError<StoreError>> = (|| {
            tree.transaction(|t| {
                for op in ops.iter() {
                    match op {
                        KvOp::Put { key, value } => {
                            t.insert(key.as_slice(), value.as_slice()).map_err(|_| {
                                ConflictableTransactionError::Abort(StoreError::DbIo)
                            })?;
                        }
                        KvOp::Del { key } => {
                            t.remove(key.as_slice()).map_err(|_| {
                                ConflictableTransactionError::Abort(StoreError::DbIo)
                            })?;
                        }
                    }
                }
                Ok(())
            })
            .map_err(|e| match e {
                sled::transaction::TransactionError::Abort(se) => {
                    ConflictableTransactionError::Abort(se)
                }
                sled::transaction::TransactionError::Storage(_) => {
                    ConflictableTransactionError::Abort(StoreError::DbIo)
                }
            })
        })();

        match res {
            Ok(()) => Ok(()),
            Err(ConflictableTransactionError::Abort(StoreError::TxConflict)) => {
                Err(StoreError::TxConflict)
            }
            Err(ConflictableTransactionError::Abort(e)) => Err(e),
            Err(ConflictableTransactionError::Conflict) => Err(StoreError::TxConflict),
            Err(ConflictableTransactionError::Storage(_)) => Err(StoreError::DbIo),
        }
    }

    // ---------------------------------------------------------------------
    // Records and content
    // ---------------------------------------------------------------------

    /// Store canonical record bytes under its CID.
    pub fn put_record(&self, cid: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.commit_atomic(vec![KvOp::Put {
            key: record_key(cid),
            value: bytes.to_vec(),
        }])
    }

    /// Fetch canonical record bytes by CID.
    pub fn get_record(&self, cid: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.get(&record_key(cid))
    }

    /// Delete a record by CID.
    pub fn delete_record(&self, cid: &str) -> Result<(), StoreError> {
        self.commit_atomic(vec![KvOp::Del {
            key: record_key(cid),
        }])
    }

    /// Store a content blob under its CID.
    pub fn put_content(&self, cid: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.commit_atomic(vec![KvOp::Put {
            key: content_key(cid),
            value: bytes.to_vec(),
        }])
    }

    /// Fetch a content blob by CID.
    pub fn get_content(&self, cid: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.get(&content_key(cid))
    }

    /// Delete a content blob by CID.
    pub fn delete_content(&self, cid: &str) -> Result<(), StoreError> {
        self.commit_atomic(vec![KvOp::Del {
            key: content_key(cid),
        }])
    }

    // ---------------------------------------------------------------------
    // Multi-file sites
    // ---------------------------------------------------------------------

    /// Store a file record and its path mapping atomically.
    pub fn put_file_record(
        &self,
        site_id: &str,
        path: &str,
        rec_cid: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        self.commit_atomic(vec![
            KvOp::Put {
                key: file_record_key(rec_cid),
                value: bytes.to_vec(),
            },
            KvOp::Put {
                key: site_file_key(site_id, path),
                value: rec_cid.as_bytes().to_vec(),
            },
        ])
    }

    /// Fetch canonical file record bytes by CID.
    pub fn get_file_record(&self, cid: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.get(&file_record_key(cid))
    }

    /// Store a website manifest and repoint the site to it atomically.
    pub fn put_website_manifest(
        &self,
        site_id: &str,
        manifest_cid: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        self.commit_atomic(vec![
            KvOp::Put {
                key: manifest_key(manifest_cid),
                value: bytes.to_vec(),
            },
            KvOp::Put {
                key: site_manifest_key(site_id),
                value: manifest_cid.as_bytes().to_vec(),
            },
        ])
    }

    /// Current manifest (CID, canonical bytes) for a site, if any.
    pub fn get_current_website_manifest(
        &self,
        site_id: &str,
    ) -> Result<Option<(String, Vec<u8>)>, StoreError> {
        let Some(ptr) = self.get(&site_manifest_key(site_id))? else {
            return Ok(None);
        };
        let cid = String::from_utf8(ptr).map_err(|_| StoreError::DbIo)?;
        let Some(bytes) = self.get(&manifest_key(&cid))? else {
            return Ok(None);
        };
        Ok(Some((cid, bytes)))
    }

    /// List (path, fileRecordCID) pairs for a site.
    pub fn list_website_files(&self, site_id: &str) -> Result<Vec<(String, String)>, StoreError> {
        let prefix = format!("site:{site_id}:file:");
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (k, v) = item.map_err(|_| StoreError::DbIo)?;
            let key = String::from_utf8(k.to_vec()).map_err(|_| StoreError::DbIo)?;
            let path = key[prefix.len()..].to_string();
            let cid = String::from_utf8(v.to_vec()).map_err(|_| StoreError::DbIo)?;
            out.push((path, cid));
        }
        Ok(out)
    }

    // ---------------------------------------------------------------------
    // Heads
    // ---------------------------------------------------------------------

    /// Whether the site has any head.
    pub fn has_head(&self, site_id: &str) -> Result<bool, StoreError> {
        Ok(self.get_head(site_id)?.is_some())
    }

    /// Largest (seq, recCID) indexed under the site, if any.
    pub fn get_head(&self, site_id: &str) -> Result<Option<(u64, String)>, StoreError> {
        let prefix = format!("site:{site_id}:head:");
        let mut best: Option<(u64, String)> = None;
        // Keys are zero-padded, so the last key under the prefix is the max.
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (k, v) = item.map_err(|_| StoreError::DbIo)?;
            let key = String::from_utf8(k.to_vec()).map_err(|_| StoreError::DbIo)?;
            let seq: u64 = key[prefix.len()..].parse().map_err(|_| StoreError::DbIo)?;
            let cid = String::from_utf8(v.to_vec()).map_err(|_| StoreError::DbIo)?;
            best = Some((seq, cid));
        }
        Ok(best)
    }

    /// Index (seq, recCID) as a head entry for the site. Idempotent.
    pub fn set_head(&self, site_id: &str, seq: u64, rec_cid: &str) -> Result<(), StoreError> {
        self.commit_atomic(vec![KvOp::Put {
            key: site_head_key(site_id, seq),
            value: rec_cid.as_bytes().to_vec(),
        }])
    }

    // ---------------------------------------------------------------------
    // Prefix resolution
    // ---------------------------------------------------------------------

    fn resolve_prefix(&self, keyspace: &str, prefix: &str) -> Result<String, StoreError> {
        let scan = format!("{keyspace}{prefix}");
        let mut found: Option<String> = None;
        for item in self.db.scan_prefix(scan.as_bytes()) {
            let (k, _v) = item.map_err(|_| StoreError::DbIo)?;
            let key = String::from_utf8(k.to_vec()).map_err(|_| StoreError::DbIo)?;
            let cid = key[keyspace.len()..].to_string();
            if found.is_some() {
                return Err(StoreError::AmbiguousPrefix);
            }
            found = Some(cid);
        }
        found.ok_or(StoreError::NotFound)
    }

    /// Resolve a record CID prefix to the unique full CID.
    pub fn resolve_record_cid(&self, prefix: &str) -> Result<String, StoreError> {
        self.resolve_prefix(RECORD_PREFIX, prefix)
    }

    /// Resolve a content CID prefix to the unique full CID.
    pub fn resolve_content_cid(&self, prefix: &str) -> Result<String, StoreError> {
        self.resolve_prefix(CONTENT_PREFIX, prefix)
    }

    // ---------------------------------------------------------------------
    // Domains
    // ---------------------------------------------------------------------

    /// Bind a domain to a site. Bindings are write-once: rebinding the same
    /// site is a no-op, a different site is rejected.
    pub fn put_domain(&self, domain: &str, site_id: &str) -> Result<(), StoreError> {
        check_domain(domain)?;
        match self.get(&domain_key(domain))? {
            Some(existing) if existing == site_id.as_bytes() => Ok(()),
            Some(_) => Err(StoreError::DomainTaken),
            None => self.commit_atomic(vec![KvOp::Put {
                key: domain_key(domain),
                value: site_id.as_bytes().to_vec(),
            }]),
        }
    }

    /// Resolve a domain to its site ID.
    pub fn resolve_domain(&self, domain: &str) -> Result<String, StoreError> {
        let Some(v) = self.get(&domain_key(domain))? else {
            return Err(StoreError::NotFound);
        };
        String::from_utf8(v).map_err(|_| StoreError::DbIo)
    }

    /// List all (domain, siteID) bindings.
    pub fn list_domains(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(DOMAIN_PREFIX.as_bytes()) {
            let (k, v) = item.map_err(|_| StoreError::DbIo)?;
            let key = String::from_utf8(k.to_vec()).map_err(|_| StoreError::DbIo)?;
            let domain = key[DOMAIN_PREFIX.len()..].to_string();
            let site = String::from_utf8(v.to_vec()).map_err(|_| StoreError::DbIo)?;
            out.push((domain, site));
        }
        Ok(out)
    }
}
