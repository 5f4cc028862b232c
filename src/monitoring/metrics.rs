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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Connected peers gauge.
    pub p2p_peers: IntGauge,
    /// Records accepted through the validation pipeline.
    pub records_applied_total: IntCounter,
    /// Delete records accepted.
    pub deletes_applied_total: IntCounter,

    /// Invalid decoded messages.
    pub p2p_invalid_msg_total: IntCounter,
    /// Rate-limited messages.
    pub p2p_rate_limited_total: IntCounter,
    /// Banned peer events.
    pub p2p_banned_total: IntCounter,

    /// Browse requests received.
    pub browse_requests_total: IntCounter,
    /// Browse requests served with a payload.
    pub browse_served_total: IntCounter,

    /// Bytes held by the in-memory content cache.
    pub content_cache_bytes: IntGauge,
    /// Content blobs evicted from the cache.
    pub content_cache_evicted_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let p2p_peers = IntGauge::new("betanet_p2p_peers", "Connected peers")
            .map_err(|_| MetricsError::Prom)?;
        let records_applied_total =
            IntCounter::new("betanet_records_applied_total", "Records accepted")
                .map_err(|_| MetricsError::Prom)?;
        let deletes_applied_total =
            IntCounter::new("betanet_deletes_applied_total", "Delete records accepted")
                .map_err(|_| MetricsError::Prom)?;

        let p2p_invalid_msg_total = IntCounter::new(
            "betanet_p2p_invalid_msg_total",
            "Invalid decoded messages",
        )
        .map_err(|_| MetricsError::Prom)?;
        let p2p_rate_limited_total =
            IntCounter::new("betanet_p2p_rate_limited_total", "Rate-limited messages")
                .map_err(|_| MetricsError::Prom)?;
        let p2p_banned_total = IntCounter::new("betanet_p2p_banned_total", "Banned peer events")
            .map_err(|_| MetricsError::Prom)?;

        let browse_requests_total =
            IntCounter::new("betanet_browse_requests_total", "Browse requests received")
                .map_err(|_| MetricsError::Prom)?;
        let browse_served_total =
            IntCounter::new("betanet_browse_served_total", "Browse requests served")
                .map_err(|_| MetricsError::Prom)?;

        let content_cache_bytes =
            IntGauge::new("betanet_content_cache_bytes", "Cached content bytes")
                .map_err(|_| MetricsError::Prom)?;
        let content_cache_evicted_total = IntCounter::new(
            "betanet_content_cache_evicted_total",
            "Content blobs evicted from cache",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(p2p_peers.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(records_applied_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(deletes_applied_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(p2p_invalid_msg_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(p2p_rate_limited_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(p2p_banned_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(browse_requests_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(browse_served_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(content_cache_bytes.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(content_cache_evicted_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            p2p_peers,
            records_applied_total,
            deletes_applied_total,
            p2p_invalid_msg_total,
            p2p_rate_limited_total,
            p2p_banned_total,
            browse_requests_total,
            browse_served_total,
            content_cache_bytes,
            content_cache_evicted_total,
        })
    }
}
