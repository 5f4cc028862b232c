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

//! Ed25519 signing plus domain-tagged pre-images for records.
//!
//! Each pre-image is the SHA-256 of a domain tag followed by fixed-order
//! fields (integers big-endian). Domain separation prevents cross-protocol
//! signature reuse; the link pre-image binds an ephemeral update key to the
//! site so update signatures verify without the long-term site key online.

use crate::core::codec::sha256;
use crate::core::types::{PublicKey, Signature};
use ring::{
    rand::{SecureRandom, SystemRandom},
    signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519},
};
use thiserror::Error;
use zeroize::Zeroize;

const LINK_DOMAIN: &[u8] = b"bn-link-v1";
const UPDATE_DOMAIN: &[u8] = b"bn-update-v1";
const DELETE_DOMAIN: &[u8] = b"bn-del-v1";

/// Signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid key")]
    InvalidKey,
    #[error("bad signature")]
    BadSignature,
    #[error("rng")]
    Rng,
}

/// Build an Ed25519 keypair from a 32-byte private seed.
pub fn keypair_from_seed(seed: &[u8; 32]) -> Result<Ed25519KeyPair, SigningError> {
    Ed25519KeyPair::from_seed_unchecked(seed).map_err(|_| SigningError::InvalidKey)
}

/// Generate a fresh ephemeral Ed25519 keypair; the seed is zeroized before
/// returning so only the `Ed25519KeyPair` holds private material.
pub fn generate_ephemeral() -> Result<Ed25519KeyPair, SigningError> {
    let rng = SystemRandom::new();
    let mut seed = [0u8; 32];
    rng.fill(&mut seed).map_err(|_| SigningError::Rng)?;
    let kp = keypair_from_seed(&seed);
    seed.zeroize();
    kp
}

/// Public key bytes of a keypair.
pub fn public_key(kp: &Ed25519KeyPair) -> PublicKey {
    PublicKey(kp.public_key().as_ref().to_vec())
}

/// Sign a 32-byte pre-image digest.
pub fn sign_digest(kp: &Ed25519KeyPair, digest: &[u8; 32]) -> Signature {
    Signature(kp.sign(digest).as_ref().to_vec())
}

/// Verify a signature over a 32-byte pre-image digest.
pub fn verify_digest(
    pk: &PublicKey,
    digest: &[u8; 32],
    sig: &Signature,
) -> Result<(), SigningError> {
    let pk_bytes = pk.as_bytes32().ok_or(SigningError::BadSignature)?;
    if sig.0.len() != 64 {
        return Err(SigningError::BadSignature);
    }
    let key = UnparsedPublicKey::new(&ED25519, pk_bytes);
    key.verify(digest, &sig.0)
        .map_err(|_| SigningError::BadSignature)
}

/// Link pre-image: binds an ephemeral update key to the site chain position.
pub fn link_preimage(
    site_pub: &PublicKey,
    update_pub: &PublicKey,
    seq: u64,
    prev_cid: &str,
    content_cid: &str,
    ts: i64,
) -> [u8; 32] {
    let mut buf = Vec::with_capacity(
        LINK_DOMAIN.len()
            + site_pub.0.len()
            + update_pub.0.len()
            + 8
            + prev_cid.len()
            + content_cid.len()
            + 8,
    );
    buf.extend_from_slice(LINK_DOMAIN);
    buf.extend_from_slice(&site_pub.0);
    buf.extend_from_slice(&update_pub.0);
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(prev_cid.as_bytes());
    buf.extend_from_slice(content_cid.as_bytes());
    buf.extend_from_slice(&ts.to_be_bytes());
    sha256(&buf)
}

/// Update pre-image: over the canonical record bytes with `update_sig` cleared.
pub fn update_preimage(record_bytes_without_sig: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(UPDATE_DOMAIN.len() + record_bytes_without_sig.len());
    buf.extend_from_slice(UPDATE_DOMAIN);
    buf.extend_from_slice(record_bytes_without_sig);
    sha256(&buf)
}

/// Delete pre-image: over the delete targets and timestamp.
pub fn delete_preimage(
    site_pub: &PublicKey,
    target_rec: Option<&str>,
    target_cont: Option<&str>,
    ts: i64,
) -> [u8; 32] {
    let rec = target_rec.unwrap_or("");
    let cont = target_cont.unwrap_or("");
    let mut buf =
        Vec::with_capacity(DELETE_DOMAIN.len() + site_pub.0.len() + rec.len() + cont.len() + 8);
    buf.extend_from_slice(DELETE_DOMAIN);
    buf.extend_from_slice(&site_pub.0);
    buf.extend_from_slice(rec.as_bytes());
    buf.extend_from_slice(cont.as_bytes());
    buf.extend_from_slice(&ts.to_be_bytes());
    sha256(&buf)
}
