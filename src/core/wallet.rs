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

//! Wallet and key hierarchy: BIP-39 mnemonic -> HKDF master key -> per-site
//! and per-update Ed25519 keys, with authenticated at-rest encryption.
//!
//! ## Production hardening
//! - **Atomic writes** for wallet files (tmp + rename, mode 0o600).
//! - **Argon2id + XChaCha20-Poly1305** for the wallet file and for optional
//!   content envelopes; the mnemonic (resp. passphrase) is the KDF input.
//! - **Best-effort zeroization** of seeds and derived keys.
//! - **Unlock rate limiting** per identifier (5/min, 15-minute lockout).
//!
//! ### Wallet file format
//! UTF-8 JSON: `{version, kdf, salt, t, mMiB, p, nonce, ciphertext}` with
//! byte fields base64-encoded. The ciphertext is XChaCha20-Poly1305 over the
//! JSON-serialized wallet body with associated data `bn-wallet-v1`.
//!
//! ### Content envelope format
//! `"BNE1" || salt(16) || nonce(24) || ciphertext`, associated data
//! `bn-content-v1`. The envelope bytes are what is hashed into the content
//! CID; decryption is an out-of-band concern of the consumer.

use crate::core::rules::MAX_LABEL_LEN;
use crate::core::signing::{self, SigningError};
use crate::core::types::PublicKey;
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bip39::{Language, Mnemonic};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use ring::{
    hkdf,
    rand::{SecureRandom, SystemRandom},
    signature::Ed25519KeyPair,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const WALLET_AAD: &[u8] = b"bn-wallet-v1";
const CONTENT_AAD: &[u8] = b"bn-content-v1";
const CONTENT_MAGIC: &[u8] = b"BNE1";

const MASTER_SALT: &[u8] = b"bn-wallet-v1";
const MASTER_INFO: &[u8] = b"master";
const SITE_SALT: &[u8] = b"bn-site";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

const ARGON_T_COST: u32 = 2;
const ARGON_M_MIB: u32 = 64;
const ARGON_P_COST: u32 = 4;

const UNLOCK_MAX_ATTEMPTS: u32 = 5;
const UNLOCK_WINDOW: Duration = Duration::from_secs(60);
const UNLOCK_LOCKOUT: Duration = Duration::from_secs(15 * 60);

/// Wallet file extension.
pub const WALLET_EXT: &str = "wallet";
/// Subdirectory of the data dir holding wallet files.
pub const WALLET_DIR: &str = "wallets";

/// Wallet errors.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid mnemonic")]
    InvalidMnemonic,
    #[error("weak mnemonic rejected")]
    WeakMnemonic,
    #[error("bad wallet format")]
    BadWalletFormat,
    #[error("decrypt auth failed")]
    DecryptAuthFailed,
    #[error("label required")]
    LabelRequired,
    #[error("label too long")]
    LabelTooLong,
    #[error("weak passphrase")]
    WeakPassphrase,
    #[error("rate limited")]
    RateLimited,
    #[error("io")]
    Io,
    #[error("crypto")]
    Crypto,
}

impl From<SigningError> for WalletError {
    fn from(_: SigningError) -> Self {
        WalletError::Crypto
    }
}

/// 32-byte master key derived from the mnemonic seed; zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

/// Per-site signing material: the long-term keypair plus derived identifiers.
pub struct SiteKey {
    /// Ed25519 keypair derived from (master, label).
    pub keypair: Ed25519KeyPair,
    /// Site public key bytes.
    pub public: PublicKey,
    /// Hex SHA-256 of the public key.
    pub site_id: String,
}

/// Per-site wallet bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMeta {
    /// Site label (lowercased).
    pub label: String,
    /// Hex SHA-256 of the site public key.
    pub site_id: String,
    /// Site public key, hex.
    pub site_pub_hex: String,
    /// Latest published sequence number (0 before genesis).
    pub seq: u64,
    /// CID of the current head record, empty before genesis.
    pub head_record_cid: String,
    /// CID of the current head content, empty before genesis.
    pub content_cid: String,
    /// Unix seconds of creation.
    pub created_at: i64,
    /// Unix seconds of last update.
    pub updated_at: i64,
}

/// Wallet body: site bookkeeping keyed by label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet format version.
    pub version: u32,
    /// Unix seconds of creation.
    pub created_at: i64,
    /// Unix seconds of last access.
    pub last_access: i64,
    /// Label -> site metadata.
    pub sites: BTreeMap<String, SiteMeta>,
}

impl Wallet {
    /// New empty wallet.
    pub fn new(now: i64) -> Self {
        Self {
            version: 1,
            created_at: now,
            last_access: now,
            sites: BTreeMap::new(),
        }
    }

    /// Derive (or re-derive) the site key for `label`, recording metadata on
    /// first use. Labels are lowercased; the keypair is deterministic in
    /// (master, label).
    pub fn ensure_site(
        &mut self,
        master: &MasterKey,
        label: &str,
        now: i64,
    ) -> Result<SiteKey, WalletError> {
        let label = normalize_label(label)?;
        let key = derive_site_key(master, &label)?;
        self.sites.entry(label.clone()).or_insert_with(|| SiteMeta {
            label: label.clone(),
            site_id: key.site_id.clone(),
            site_pub_hex: hex::encode(&key.public.0),
            seq: 0,
            head_record_cid: String::new(),
            content_cid: String::new(),
            created_at: now,
            updated_at: now,
        });
        self.last_access = now;
        Ok(key)
    }

    /// Record a successful publish for `label`.
    pub fn record_publish(
        &mut self,
        label: &str,
        seq: u64,
        head_record_cid: &str,
        content_cid: &str,
        now: i64,
    ) {
        if let Some(meta) = self.sites.get_mut(&label.to_lowercase()) {
            meta.seq = seq;
            meta.head_record_cid = head_record_cid.to_string();
            meta.content_cid = content_cid.to_string();
            meta.updated_at = now;
        }
        self.last_access = now;
    }
}

fn normalize_label(label: &str) -> Result<String, WalletError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(WalletError::LabelRequired);
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(WalletError::LabelTooLong);
    }
    Ok(label.to_lowercase())
}

// -------------------------------------------------------------------------
// Mnemonic validation and key derivation
// -------------------------------------------------------------------------

fn is_weak_phrase(words: &[&str]) -> bool {
    let n = words.len();
    // Canonical zero-entropy phrases.
    if words[..n - 1].iter().all(|w| *w == "abandon") && words[n - 1] == "about" {
        return true;
    }
    if words[..n - 1].iter().all(|w| *w == "zoo") && words[n - 1] == "wrong" {
        return true;
    }
    if n == 12 && words[..11].iter().all(|w| *w == "test") && words[11] == "junk" {
        return true;
    }
    // Heuristic: any word repeated more than 3 times.
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for w in words {
        let c = counts.entry(*w).or_insert(0);
        *c += 1;
        if *c > 3 {
            return true;
        }
    }
    false
}

/// Validate a BIP-39 mnemonic: 12-24 words, checksum passes, and none of the
/// known weak patterns.
pub fn validate_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if !(12..=24).contains(&words.len()) {
        return Err(WalletError::InvalidMnemonic);
    }
    if is_weak_phrase(&words) {
        return Err(WalletError::WeakMnemonic);
    }
    let normalized = words.join(" ").to_lowercase();
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|_| WalletError::InvalidMnemonic)
}

struct HkdfOut(usize);

impl hkdf::KeyType for HkdfOut {
    fn len(&self) -> usize {
        self.0
    }
}

fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN], WalletError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(ikm);
    let info_slice = [info];
    let okm = prk
        .expand(&info_slice, HkdfOut(KEY_LEN))
        .map_err(|_| WalletError::Crypto)?;
    let mut out = [0u8; KEY_LEN];
    okm.fill(&mut out).map_err(|_| WalletError::Crypto)?;
    Ok(out)
}

/// Derive the 32-byte master key from a validated mnemonic (empty BIP-39
/// passphrase). The intermediate 64-byte seed is zeroized.
pub fn master_from_mnemonic(phrase: &str) -> Result<MasterKey, WalletError> {
    let mnemonic = validate_mnemonic(phrase)?;
    let mut seed = mnemonic.to_seed("");
    let master = hkdf_sha256(&seed, MASTER_SALT, MASTER_INFO);
    seed.zeroize();
    Ok(MasterKey(master?))
}

/// Derive the long-term site key for a (master, label) pair.
pub fn derive_site_key(master: &MasterKey, label: &str) -> Result<SiteKey, WalletError> {
    let label = normalize_label(label)?;
    let mut seed = hkdf_sha256(&master.0, SITE_SALT, label.as_bytes())?;
    let keypair = signing::keypair_from_seed(&seed);
    seed.zeroize();
    let keypair = keypair?;
    let public = signing::public_key(&keypair);
    let site_id = public.site_id();
    Ok(SiteKey {
        keypair,
        public,
        site_id,
    })
}

/// Derive a deterministic per-update keypair for multi-file writes:
/// info = `lowercase(label) + "-" + context_tag`.
pub fn derive_update_key(
    master: &MasterKey,
    label: &str,
    context_tag: &str,
) -> Result<Ed25519KeyPair, WalletError> {
    let label = normalize_label(label)?;
    let info = format!("{}-{}", label, context_tag);
    let mut seed = hkdf_sha256(&master.0, SITE_SALT, info.as_bytes())?;
    let keypair = signing::keypair_from_seed(&seed);
    seed.zeroize();
    Ok(keypair?)
}

// -------------------------------------------------------------------------
// Passphrase policy and unlock limiting
// -------------------------------------------------------------------------

/// Strong-mode passphrase policy: >= 12 chars with upper, lower, digit, and
/// printable-ASCII punctuation.
pub fn validate_passphrase_strong(pass: &str) -> Result<(), WalletError> {
    if pass.chars().count() < 12 {
        return Err(WalletError::WeakPassphrase);
    }
    let has_upper = pass.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = pass.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = pass.chars().any(|c| c.is_ascii_digit());
    let has_punct = pass.chars().any(|c| c.is_ascii_punctuation());
    if has_upper && has_lower && has_digit && has_punct {
        Ok(())
    } else {
        Err(WalletError::WeakPassphrase)
    }
}

#[derive(Debug)]
struct UnlockState {
    window_start: Instant,
    count: u32,
    locked_until: Option<Instant>,
}

/// Per-identifier unlock rate limiter: 5 attempts/minute, 15-minute lockout.
#[derive(Debug, Default)]
pub struct UnlockLimiter {
    states: Mutex<BTreeMap<String, UnlockState>>,
}

impl UnlockLimiter {
    /// New limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unlock attempt for `id`; errors when over budget.
    pub fn allow(&self, id: &str) -> Result<(), WalletError> {
        let now = Instant::now();
        let mut states = self.states.lock().map_err(|_| WalletError::RateLimited)?;
        let st = states.entry(id.to_string()).or_insert(UnlockState {
            window_start: now,
            count: 0,
            locked_until: None,
        });

        if let Some(until) = st.locked_until {
            if now < until {
                return Err(WalletError::RateLimited);
            }
            st.locked_until = None;
            st.window_start = now;
            st.count = 0;
        }

        if now.duration_since(st.window_start) >= UNLOCK_WINDOW {
            st.window_start = now;
            st.count = 0;
        }
        if st.count >= UNLOCK_MAX_ATTEMPTS {
            st.locked_until = Some(now + UNLOCK_LOCKOUT);
            return Err(WalletError::RateLimited);
        }
        st.count = st.count.saturating_add(1);
        Ok(())
    }
}

// -------------------------------------------------------------------------
// At-rest encryption
// -------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct WalletFile {
    version: u32,
    kdf: String,
    salt: String,
    t: u32,
    #[serde(rename = "mMiB")]
    m_mib: u32,
    p: u32,
    nonce: String,
    ciphertext: String,
}

fn argon2id(params_m_mib: u32, t: u32, p: u32) -> Result<Argon2<'static>, WalletError> {
    let params = Params::new(params_m_mib * 1024, t, p, Some(KEY_LEN))
        .map_err(|_| WalletError::Crypto)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn derive_aead_key(
    passphrase: &[u8],
    salt: &[u8],
    m_mib: u32,
    t: u32,
    p: u32,
) -> Result<[u8; KEY_LEN], WalletError> {
    let mut out = [0u8; KEY_LEN];
    argon2id(m_mib, t, p)?
        .hash_password_into(passphrase, salt, &mut out)
        .map_err(|_| WalletError::Crypto)?;
    Ok(out)
}

fn random_bytes<const N: usize>() -> Result<[u8; N], WalletError> {
    let rng = SystemRandom::new();
    let mut out = [0u8; N];
    rng.fill(&mut out).map_err(|_| WalletError::Crypto)?;
    Ok(out)
}

/// Encrypt a wallet under its mnemonic, producing the UTF-8 JSON file bytes.
pub fn encrypt_wallet(wallet: &Wallet, mnemonic: &str) -> Result<Vec<u8>, WalletError> {
    let body = serde_json::to_vec(wallet).map_err(|_| WalletError::BadWalletFormat)?;
    let salt = random_bytes::<SALT_LEN>()?;
    let nonce = random_bytes::<NONCE_LEN>()?;

    let mut key = derive_aead_key(
        mnemonic.as_bytes(),
        &salt,
        ARGON_M_MIB,
        ARGON_T_COST,
        ARGON_P_COST,
    )?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: &body,
                aad: WALLET_AAD,
            },
        )
        .map_err(|_| WalletError::Crypto)?;
    key.zeroize();

    let file = WalletFile {
        version: 1,
        kdf: "argon2id".to_string(),
        salt: BASE64.encode(salt),
        t: ARGON_T_COST,
        m_mib: ARGON_M_MIB,
        p: ARGON_P_COST,
        nonce: BASE64.encode(nonce),
        ciphertext: BASE64.encode(ciphertext),
    };
    serde_json::to_vec_pretty(&file).map_err(|_| WalletError::BadWalletFormat)
}

/// Decrypt wallet file bytes under the mnemonic.
pub fn decrypt_wallet(bytes: &[u8], mnemonic: &str) -> Result<Wallet, WalletError> {
    let file: WalletFile =
        serde_json::from_slice(bytes).map_err(|_| WalletError::BadWalletFormat)?;
    if file.version != 1 || file.kdf != "argon2id" {
        return Err(WalletError::BadWalletFormat);
    }
    let salt = BASE64
        .decode(&file.salt)
        .map_err(|_| WalletError::BadWalletFormat)?;
    let nonce = BASE64
        .decode(&file.nonce)
        .map_err(|_| WalletError::BadWalletFormat)?;
    let ciphertext = BASE64
        .decode(&file.ciphertext)
        .map_err(|_| WalletError::BadWalletFormat)?;
    if salt.len() != SALT_LEN || nonce.len() != NONCE_LEN {
        return Err(WalletError::BadWalletFormat);
    }

    let mut key = derive_aead_key(mnemonic.as_bytes(), &salt, file.m_mib, file.t, file.p)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
    let body = cipher
        .decrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: &ciphertext,
                aad: WALLET_AAD,
            },
        )
        .map_err(|_| WalletError::DecryptAuthFailed);
    key.zeroize();

    serde_json::from_slice(&body?).map_err(|_| WalletError::BadWalletFormat)
}

/// Encrypt an arbitrary content blob under a passphrase:
/// `"BNE1" || salt(16) || nonce(24) || ciphertext`.
pub fn encrypt_content(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>, WalletError> {
    let salt = random_bytes::<SALT_LEN>()?;
    let nonce = random_bytes::<NONCE_LEN>()?;

    let mut key = derive_aead_key(
        passphrase.as_bytes(),
        &salt,
        ARGON_M_MIB,
        ARGON_T_COST,
        ARGON_P_COST,
    )?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: CONTENT_AAD,
            },
        )
        .map_err(|_| WalletError::Crypto)?;
    key.zeroize();

    let mut out =
        Vec::with_capacity(CONTENT_MAGIC.len() + SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(CONTENT_MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a `BNE1` content envelope under a passphrase.
pub fn decrypt_content(passphrase: &str, envelope: &[u8]) -> Result<Vec<u8>, WalletError> {
    let header = CONTENT_MAGIC.len() + SALT_LEN + NONCE_LEN;
    // 16-byte Poly1305 tag follows the (possibly empty) ciphertext.
    if envelope.len() < header + 16 || &envelope[..CONTENT_MAGIC.len()] != CONTENT_MAGIC {
        return Err(WalletError::BadWalletFormat);
    }
    let salt = &envelope[CONTENT_MAGIC.len()..CONTENT_MAGIC.len() + SALT_LEN];
    let nonce = &envelope[CONTENT_MAGIC.len() + SALT_LEN..header];
    let ciphertext = &envelope[header..];

    let mut key = derive_aead_key(
        passphrase.as_bytes(),
        salt,
        ARGON_M_MIB,
        ARGON_T_COST,
        ARGON_P_COST,
    )?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
    let plain = cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: CONTENT_AAD,
            },
        )
        .map_err(|_| WalletError::DecryptAuthFailed);
    key.zeroize();
    plain
}

// -------------------------------------------------------------------------
// Wallet files on disk
// -------------------------------------------------------------------------

fn set_private_perms_best_effort(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
}

/// Atomic write to disk (best-effort fsync, then rename).
fn atomic_write_private(path: &Path, bytes: &[u8]) -> Result<(), WalletError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|_| WalletError::Io)?;
    }

    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");

    {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .map_err(|_| WalletError::Io)?;
        f.write_all(bytes).map_err(|_| WalletError::Io)?;
        let _ = f.sync_all();
    }

    set_private_perms_best_effort(&tmp);
    fs::rename(&tmp, path).map_err(|_| WalletError::Io)?;
    set_private_perms_best_effort(path);
    Ok(())
}

/// Path of a named wallet under `data_dir/wallets/`.
pub fn wallet_path(data_dir: &str, name: &str) -> PathBuf {
    let mut path = PathBuf::from(data_dir);
    path.push(WALLET_DIR);
    path.push(format!("{}.{}", name, WALLET_EXT));
    path
}

/// Encrypt and persist a wallet to `data_dir/wallets/<name>.wallet`.
pub fn save_wallet(
    data_dir: &str,
    name: &str,
    wallet: &Wallet,
    mnemonic: &str,
) -> Result<PathBuf, WalletError> {
    let path = wallet_path(data_dir, name);
    let bytes = encrypt_wallet(wallet, mnemonic)?;
    atomic_write_private(&path, &bytes)?;
    Ok(path)
}

/// Load and decrypt a wallet from `data_dir/wallets/<name>.wallet`.
pub fn load_wallet(data_dir: &str, name: &str, mnemonic: &str) -> Result<Wallet, WalletError> {
    let path = wallet_path(data_dir, name);
    let bytes = fs::read(&path).map_err(|_| WalletError::Io)?;
    decrypt_wallet(&bytes, mnemonic)
}
