// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Publisher wiring: wallet keys in, signed envelopes out.
//!
//! A publisher derives the site key from the wallet, builds the next record
//! against the store head, applies it locally, and returns the envelope for
//! the replication node to broadcast. Network failures never leave the local
//! log half-written: everything here commits through the engine's atomic
//! pipeline before anything is handed to the gossip layer.

use crate::core::{
    codec::content_id,
    engine::{unix_now, Applied, Engine, EngineError, Envelope},
    types::{DeleteRecord, GossipMsg},
    wallet::{self, MasterKey, Wallet, WalletError},
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Publisher errors.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("wallet: {0}")]
    Wallet(WalletError),
    #[error("engine: {0}")]
    Engine(EngineError),
}

impl From<WalletError> for PublishError {
    fn from(e: WalletError) -> Self {
        PublishError::Wallet(e)
    }
}
impl From<EngineError> for PublishError {
    fn from(e: EngineError) -> Self {
        PublishError::Engine(e)
    }
}

/// One file of a multi-file site publish.
#[derive(Clone, Debug)]
pub struct SiteFile {
    /// Site-relative path.
    pub path: String,
    /// File contents.
    pub content: Vec<u8>,
    /// MIME type.
    pub mime_type: String,
}

/// Result of a website publish: everything the node needs to broadcast.
#[derive(Clone, Debug)]
pub struct WebsitePublish {
    /// Envelopes for the individual file records.
    pub file_envelopes: Vec<Envelope>,
    /// Canonical manifest bytes (broadcast with empty content).
    pub manifest: Vec<u8>,
    /// CID of the manifest.
    pub manifest_cid: String,
    /// Local application result.
    pub applied: Applied,
}

/// Publisher over a wallet and the local engine.
pub struct Publisher {
    engine: Engine,
    master: MasterKey,
    wallet: Wallet,
}

impl Publisher {
    /// Create a publisher for an unlocked wallet.
    pub fn new(engine: Engine, master: MasterKey, wallet: Wallet) -> Self {
        Self {
            engine,
            master,
            wallet,
        }
    }

    /// Borrow the wallet (bookkeeping state for persistence by the caller).
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Publish a single-file update for `label`: derive keys, chain off the
    /// current head, apply locally, and return the gossip envelope.
    pub fn publish_update(
        &mut self,
        label: &str,
        content: &[u8],
    ) -> Result<(Envelope, Applied), PublishError> {
        let now = unix_now();
        let site = self.wallet.ensure_site(&self.master, label, now)?;

        let (seq, prev_cid) = match self.engine.store().get_head(&site.site_id) {
            Ok(Some((head_seq, head_cid))) => (head_seq + 1, head_cid),
            Ok(None) => (1, String::new()),
            Err(e) => return Err(PublishError::Engine(EngineError::Store(e))),
        };

        let (envelope, _rec_cid) = Engine::build_update(&site.keypair, content, seq, &prev_cid)?;
        let applied = self
            .engine
            .apply_record_bytes(&envelope.record, &envelope.content)?;

        self.wallet.record_publish(
            label,
            applied.seq,
            &applied.rec_cid,
            &applied.content_cid,
            now,
        );
        Ok((envelope, applied))
    }

    /// Publish a multi-file site for `label`: one file record per path, then
    /// a manifest chaining off the current head.
    pub fn publish_website(
        &mut self,
        label: &str,
        main_file: &str,
        files: Vec<SiteFile>,
    ) -> Result<WebsitePublish, PublishError> {
        let now = unix_now();
        let site = self.wallet.ensure_site(&self.master, label, now)?;

        let (seq, prev_cid) = match self.engine.store().get_head(&site.site_id) {
            Ok(Some((head_seq, head_cid))) => (head_seq + 1, head_cid),
            Ok(None) => (1, String::new()),
            Err(e) => return Err(PublishError::Engine(EngineError::Store(e))),
        };

        // One deterministic update key per revision binds every file record
        // and the manifest of this write.
        let update_kp = wallet::derive_update_key(&self.master, label, &format!("rev{seq}"))?;

        let mut file_envelopes = Vec::with_capacity(files.len());
        let mut manifest_files: BTreeMap<String, String> = BTreeMap::new();
        for f in files.iter() {
            let (env, _rec_cid) = Engine::build_file_record(
                &site.keypair,
                &update_kp,
                &f.path,
                &f.content,
                &f.mime_type,
            )?;
            self.engine.apply_record_bytes(&env.record, &env.content)?;
            manifest_files.insert(f.path.clone(), content_id(&f.content));
            file_envelopes.push(env);
        }

        let (manifest, manifest_cid) = Engine::build_manifest(
            &site.keypair,
            &update_kp,
            seq,
            &prev_cid,
            main_file,
            manifest_files,
        )?;
        let applied = self.engine.apply_record_bytes(&manifest, &[])?;

        self.wallet
            .record_publish(label, applied.seq, &applied.rec_cid, "", now);
        Ok(WebsitePublish {
            file_envelopes,
            manifest,
            manifest_cid,
            applied,
        })
    }

    /// Build, apply, and return a delete authorization for `label`.
    pub fn publish_delete(
        &mut self,
        label: &str,
        target_rec: Option<&str>,
        target_cont: Option<&str>,
    ) -> Result<(DeleteRecord, GossipMsg), PublishError> {
        let now = unix_now();
        let site = self.wallet.ensure_site(&self.master, label, now)?;
        let (del, bytes) = Engine::build_delete(&site.keypair, target_rec, target_cont)?;
        self.engine.apply_delete(&del)?;
        Ok((del, GossipMsg::Delete { delete: bytes }))
    }
}
