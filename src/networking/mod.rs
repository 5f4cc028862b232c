#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Networking: libp2p transport, browse protocol, and anti-abuse.

pub mod browse;
pub mod content_cache;
pub mod p2p;
pub mod p2p_identity;
pub mod peer_guard;
