#![forbid(unsafe_code)]

//! Persistent host identity for the P2P layer.
//!
//! The host keypair is distinct from any site key: it authenticates the
//! transport (Noise) and derives the peer ID, nothing else.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use libp2p::{identity, PeerId};
use thiserror::Error;

const HOST_KEY_FILE: &str = "host_identity.key";

/// Identity persistence errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("io")]
    Io,
    #[error("decode")]
    Decode,
}

impl From<io::Error> for IdentityError {
    fn from(_: io::Error) -> Self {
        IdentityError::Io
    }
}

/// Load an existing Ed25519 host keypair from `data_dir/host_identity.key`,
/// or create a new one and persist it.
///
/// Returns (PeerId, Keypair).
pub fn load_or_create_identity(
    data_dir: impl AsRef<Path>,
) -> Result<(PeerId, identity::Keypair), IdentityError> {
    let dir = data_dir.as_ref();
    fs::create_dir_all(dir)?;

    let path: PathBuf = dir.join(HOST_KEY_FILE);

    if path.exists() {
        let bytes = fs::read(&path)?;
        let kp = identity::Keypair::from_protobuf_encoding(&bytes)
            .map_err(|_| IdentityError::Decode)?;
        let pid = PeerId::from(kp.public());
        return Ok((pid, kp));
    }

    let kp = identity::Keypair::generate_ed25519();
    let bytes = kp
        .to_protobuf_encoding()
        .map_err(|_| IdentityError::Decode)?;

    // Atomic-ish write: write to tmp then rename.
    let tmp = dir.join(format!("{HOST_KEY_FILE}.tmp"));
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&bytes)?;
        f.sync_all()?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600));
    }
    fs::rename(&tmp, &path)?;

    let pid = PeerId::from(kp.public());
    Ok((pid, kp))
}
