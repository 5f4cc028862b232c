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

//! Betanet - peer-to-peer publishing substrate for signed, versioned sites.
//!
//! This repository provides:
//! - Deterministic record types & canonical encoding with SHA-256 content IDs
//! - Ed25519 site/update key hierarchy rooted in a BIP-39 mnemonic wallet
//! - An append-only per-site record log with signature and sequence validation
//! - Encrypted P2P replication (libp2p Noise + Yamux) over gossipsub, plus a
//!   request/response browse protocol for head and content lookup
//! - Persistent content-addressed storage (sled) with prefix resolution
//! - Monitoring via Prometheus metrics and structured logging

/// Core protocol primitives (codec, records, signing, wallet, store, engine).
pub mod core;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;
/// P2P networking stack (libp2p transport, browse protocol, anti-abuse).
pub mod networking;
