#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Betanet node entrypoint (systemd-friendly).
//! Starts the store, record engine, and replication node, then keeps the
//! process alive.

use std::path::PathBuf;
use std::sync::Arc;

use betanet::core::types::NodeConfig;
use betanet::core::{engine::Engine, store::Store};
use betanet::monitoring::metrics::Metrics;
use betanet::networking::p2p::{spawn_p2p, P2pConfig};
use tracing::{info, warn};

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Optional TOML config file; env vars take precedence over it.
fn load_config() -> Option<NodeConfig> {
    let path = std::env::var("BETANET_CONFIG").ok()?;
    match std::fs::read_to_string(&path) {
        Ok(raw) => match toml::from_str::<NodeConfig>(&raw) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                eprintln!("bad config {path}: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("cannot read config {path}: {e}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let file_cfg = load_config();

    let data_dir = std::env::var("BETANET_DATA_DIR")
        .ok()
        .or_else(|| file_cfg.as_ref().map(|c| c.node.data_dir.clone()))
        .unwrap_or_else(|| "./data".to_string());
    let listen_addr = std::env::var("BETANET_LISTEN_ADDR")
        .ok()
        .or_else(|| file_cfg.as_ref().map(|c| c.p2p.listen_addr.clone()))
        .unwrap_or_else(|| "/ip4/0.0.0.0/tcp/4040".to_string());

    // Comma-separated bootstrap multiaddrs, e.g.
    // "/ip4/10.0.0.2/tcp/4040/p2p/12D3KooW...,/ip4/10.0.0.3/tcp/4040"
    let mut bootstrap: Vec<String> = env("BETANET_BOOTSTRAP", "")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if bootstrap.is_empty() {
        if let Some(cfg) = file_cfg.as_ref() {
            bootstrap = cfg.p2p.bootstrap.clone();
        }
    }

    let mut db_path = PathBuf::from(&data_dir);
    db_path.push("db");
    let store = match Store::open(&db_path.to_string_lossy()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("store open failed: {e}");
            std::process::exit(1);
        }
    };
    let engine = Engine::new(store);

    let metrics: Arc<Metrics> = Arc::new(Metrics::new().expect("metrics init failed"));

    let mut cfg = P2pConfig::new(&data_dir, &listen_addr);
    cfg.bootstrap = bootstrap;
    if let Some(file_cfg) = file_cfg.as_ref() {
        cfg.updates_topic = file_cfg.p2p.topic.clone();
        cfg.enable_mdns = file_cfg.p2p.enable_mdns;
    }

    info!(data_dir = %data_dir, listen = %listen_addr, "betanet node starting");

    let (node, mut ev_rx, p2p_handle) = match spawn_p2p(cfg, engine, metrics) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("P2P start failed: {e}");
            std::process::exit(1);
        }
    };
    info!(peer_id = %node.local_peer_id(), "host identity loaded");

    // keep alive + log events
    let ev_task = tokio::spawn(async move {
        while let Some(ev) = ev_rx.recv().await {
            info!(?ev, "p2p event");
        }
        warn!("p2p event channel closed");
    });

    // Wait forever (or until crash)
    let _ = p2p_handle.await;
    let _ = ev_task.await;
}
