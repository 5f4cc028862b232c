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

//! Bootstrap a new encrypted wallet: generates a 24-word mnemonic, derives
//! the first site key, and writes `<data_dir>/wallets/default.wallet`.
//!
//! Usage: `walletgen [data_dir] [site_label]`
//!
//! The mnemonic is printed once; it is the only way to unlock the wallet.

use anyhow::{anyhow, Result};
use betanet::core::engine::unix_now;
use betanet::core::wallet::{master_from_mnemonic, save_wallet, validate_mnemonic, Wallet};
use bip39::{Language, Mnemonic};
use ring::rand::{SecureRandom, SystemRandom};

fn main() -> Result<()> {
    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let label = std::env::args().nth(2).unwrap_or_else(|| "mysite".to_string());

    let rng = SystemRandom::new();
    let mut entropy = [0u8; 32];
    rng.fill(&mut entropy)
        .map_err(|_| anyhow!("entropy unavailable"))?;
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| anyhow!("mnemonic generation failed: {e}"))?;
    let phrase = mnemonic.to_string();
    validate_mnemonic(&phrase).map_err(|e| anyhow!("generated mnemonic rejected: {e}"))?;

    let master = master_from_mnemonic(&phrase)?;
    let now = unix_now();
    let mut wallet = Wallet::new(now);
    let site = wallet.ensure_site(&master, &label, now)?;

    let path = save_wallet(&data_dir, "default", &wallet, &phrase)?;

    println!("wallet:   {}", path.display());
    println!("site:     {} ({})", label.to_lowercase(), site.site_id);
    println!("site_pub: {}", hex::encode(&site.public.0));
    println!();
    println!("mnemonic (write this down, it will not be shown again):");
    println!("{phrase}");
    Ok(())
}
