// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0

//! Peer admission control: rolling rate limits, reputation, and bans.
//! This implementation is deterministic, integer-only, and borrow-safe.

#![forbid(unsafe_code)]

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

/// Admission parameters.
#[derive(Clone, Debug)]
pub struct GuardParams {
    /// Max requests per peer per rolling window.
    pub max_requests_per_window: u32,
    /// Rolling window length.
    pub window: Duration,
    /// Reputation floor at which a peer is banned.
    pub ban_threshold: i32,
    /// Reputation ceiling.
    pub max_reputation: i32,
    /// Hard cap on concurrently connected peers.
    pub max_peers: usize,
    /// Peers unseen for this long are forgotten.
    pub stale_after: Duration,
}

impl Default for GuardParams {
    fn default() -> Self {
        Self {
            max_requests_per_window: 100,
            window: Duration::from_secs(60),
            ban_threshold: -100,
            max_reputation: 100,
            max_peers: 100,
            stale_after: Duration::from_secs(10 * 60),
        }
    }
}

/// Admission decision for a connection or request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admit {
    Allow,
    RateLimited,
    Banned,
    PoolFull,
}

#[derive(Clone, Debug)]
struct PeerState {
    reputation: i32,
    window_start: Instant,
    window_count: u32,
    last_seen: Instant,
    connected: bool,
}

impl PeerState {
    fn new(now: Instant) -> Self {
        Self {
            reputation: 0,
            window_start: now,
            window_count: 0,
            last_seen: now,
            connected: false,
        }
    }
}

/// Ban expiry. `None` means banned until manually reset.
type BanEntry = Option<Instant>;

/// Peer admission table. Owned by the node task (single-actor access
/// satisfies the shared-state policy without extra locking).
pub struct PeerGuard {
    params: GuardParams,
    peers: BTreeMap<Vec<u8>, PeerState>,
    bans: BTreeMap<Vec<u8>, BanEntry>,
}

impl PeerGuard {
    /// New guard with parameters.
    pub fn new(params: GuardParams) -> Self {
        Self {
            params,
            peers: BTreeMap::new(),
            bans: BTreeMap::new(),
        }
    }

    /// Current reputation of a peer (0 when unknown).
    pub fn reputation_of(&self, peer: &[u8]) -> i32 {
        self.peers.get(peer).map(|p| p.reputation).unwrap_or(0)
    }

    /// Number of connected peers.
    pub fn connected_count(&self) -> usize {
        self.peers.values().filter(|p| p.connected).count()
    }

    /// Whether a peer is currently banned.
    pub fn is_banned(&self, peer: &[u8], now: Instant) -> bool {
        match self.bans.get(peer) {
            None => false,
            Some(None) => true,
            Some(Some(expiry)) => now < *expiry,
        }
    }

    /// Admit or refuse an inbound connection.
    pub fn on_connect(&mut self, peer: Vec<u8>, now: Instant) -> Admit {
        if self.is_banned(&peer, now) {
            return Admit::Banned;
        }
        if self.connected_count() >= self.params.max_peers {
            return Admit::PoolFull;
        }
        let st = self
            .peers
            .entry(peer)
            .or_insert_with(|| PeerState::new(now));
        st.connected = true;
        st.last_seen = now;
        Admit::Allow
    }

    /// Record a disconnect.
    pub fn on_disconnect(&mut self, peer: &[u8]) {
        if let Some(st) = self.peers.get_mut(peer) {
            st.connected = false;
        }
    }

    /// Admit or refuse one request/message from a peer (ban check plus
    /// rolling-window rate limit).
    pub fn admit_request(&mut self, peer: Vec<u8>, now: Instant) -> Admit {
        if self.is_banned(&peer, now) {
            return Admit::Banned;
        }
        let window = self.params.window;
        let limit = self.params.max_requests_per_window;
        let st = self
            .peers
            .entry(peer)
            .or_insert_with(|| PeerState::new(now));
        st.last_seen = now;
        if now.duration_since(st.window_start) >= window {
            st.window_start = now;
            st.window_count = 0;
        }
        if st.window_count >= limit {
            return Admit::RateLimited;
        }
        st.window_count = st.window_count.saturating_add(1);
        Admit::Allow
    }

    /// Credit a successful operation.
    pub fn observe_good(&mut self, peer: Vec<u8>, now: Instant) {
        let max = self.params.max_reputation;
        let st = self
            .peers
            .entry(peer)
            .or_insert_with(|| PeerState::new(now));
        st.last_seen = now;
        st.reputation = st.reputation.saturating_add(1).min(max);
    }

    /// Penalize a protocol violation; returns true when the peer crossed the
    /// ban threshold (banned until reset).
    pub fn observe_bad(&mut self, peer: Vec<u8>, now: Instant, weight: i32) -> bool {
        let threshold = self.params.ban_threshold;
        let st = self
            .peers
            .entry(peer.clone())
            .or_insert_with(|| PeerState::new(now));
        st.last_seen = now;
        st.reputation = st
            .reputation
            .saturating_sub(weight.max(1))
            .max(threshold);
        if st.reputation <= threshold {
            self.bans.insert(peer, None);
            return true;
        }
        false
    }

    /// Ban a peer for a fixed duration.
    pub fn ban_for(&mut self, peer: Vec<u8>, now: Instant, duration: Duration) {
        self.bans.insert(peer, Some(now + duration));
    }

    /// Clear a peer's ban and reputation.
    pub fn reset(&mut self, peer: &[u8]) {
        self.bans.remove(peer);
        if let Some(st) = self.peers.get_mut(peer) {
            st.reputation = 0;
            st.window_count = 0;
        }
    }

    /// Drop expired timed bans. Runs hourly.
    pub fn sweep_bans(&mut self, now: Instant) {
        self.bans
            .retain(|_, entry| match entry {
                None => true,
                Some(expiry) => now < *expiry,
            });
    }

    /// Forget disconnected peers unseen for the staleness window. Runs every
    /// minute.
    pub fn cleanup_stale(&mut self, now: Instant) {
        let stale_after = self.params.stale_after;
        self.peers
            .retain(|_, st| st.connected || now.duration_since(st.last_seen) < stale_after);
    }
}
