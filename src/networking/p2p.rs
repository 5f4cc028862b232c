
#[allow(missing_docs)]
// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0

// Replication node (libp2p): persistent host identity + gossipsub updates
// topic + request/response browse protocol + mDNS LAN discovery.

// - Outbound: GossipMsg -> gossipsub publish (canonical encoding)
// - Inbound: gossipsub message -> peer guard -> record engine -> store
// - Browse: /betanet/browse/1.0.0 served from the store and content cache
// - Liveness: `bn-alive` heartbeat every 30s, ignored on receipt
// - Hygiene: stale-peer cleanup (1m), ban sweep (1h), cache eviction (5m)

use crate::{
    core::{
        codec::decode_canonical_limited,
        engine::{Applied, Engine, Envelope},
        rules::MAX_RECORD_BYTES,
        types::{
            BrowseRequest, BrowseResponse, DeleteRecord, GossipMsg, ALIVE_PAYLOAD,
            BROWSE_PROTOCOL, UPDATES_TOPIC,
        },
    },
    monitoring::metrics::Metrics,
    networking::{
        browse::BrowseCodec,
        content_cache::ContentCache,
        peer_guard::{Admit, GuardParams, PeerGuard},
    },
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use libp2p::{
    core::upgrade,
    gossipsub::{self, IdentTopic, MessageAuthenticity},
    identify, mdns, noise, ping,
    request_response::{self, OutboundRequestId, ProtocolSupport},
    swarm::{behaviour::toggle::Toggle, NetworkBehaviour, Swarm, SwarmEvent},
    tcp, yamux, Multiaddr, PeerId, StreamProtocol, Transport,
};

use libp2p::futures::StreamExt;
use libp2p::swarm::Config as SwarmConfig;

/// LAN service-broadcast tag advertised to discovery helpers.
pub const MDNS_SERVICE: &str = "betanet-mdns";

// Pre-decode gate on incoming gossip payloads. Larger blobs replicate via
// the browse protocol, not inline gossip.
const GOSSIP_MAX_BYTES: usize = MAX_RECORD_BYTES;

const LIVENESS_INTERVAL: Duration = Duration::from_secs(30);
const STALE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const BAN_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

const BROWSE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DIAL_UPGRADE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events emitted by the replication node.
#[derive(Clone, Debug)]
pub enum P2pEvent {
    /// A listen address is active.
    Listening(String),
    /// Peer connected.
    PeerConnected(Vec<u8>),
    /// Peer disconnected.
    PeerDisconnected(Vec<u8>),
    /// Peer discovered on the LAN.
    PeerDiscovered(Vec<u8>),
    /// A record was accepted from gossip.
    RecordApplied {
        /// Site the record belongs to.
        site_id: String,
        /// Accepted sequence number.
        seq: u64,
        /// CID of the accepted record.
        rec_cid: String,
    },
    /// A delete record was accepted from gossip.
    DeleteApplied {
        /// Site the delete belongs to.
        site_id: String,
    },
}

/// Receiver of P2P events.
pub type EventRx = mpsc::Receiver<P2pEvent>;

#[derive(Debug, Error)]
pub enum P2pError {
    #[error("io")]
    Io,
    #[error("config")]
    Config,
    #[error("node shut down")]
    ChannelClosed,
    #[error("peer unavailable")]
    PeerUnavailable,
    #[error("timeout")]
    Timeout,
    #[error("not found")]
    NotFound,
    #[error("malformed response")]
    MalformedResponse,
}

/// Runtime configuration for the replication node.
#[derive(Clone, Debug)]
pub struct P2pConfig {
    /// Listen address as string (e.g. "/ip4/0.0.0.0/tcp/4001").
    pub listen_addr: String,
    /// Gossipsub topic for update/delete messages.
    pub updates_topic: String,
    /// Data directory used for persistent identity.
    pub data_dir: String,
    /// Bootstrap peers to dial at startup.
    pub bootstrap: Vec<String>,
    /// Advertise/query mDNS on the local network.
    pub enable_mdns: bool,
}

impl P2pConfig {
    /// Config with protocol defaults for a data directory and listen address.
    pub fn new(data_dir: &str, listen_addr: &str) -> Self {
        Self {
            listen_addr: listen_addr.to_string(),
            updates_topic: UPDATES_TOPIC.to_string(),
            data_dir: data_dir.to_string(),
            bootstrap: Vec::new(),
            enable_mdns: true,
        }
    }
}

/// Head lookup result from a remote peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadInfo {
    /// Head sequence number.
    pub seq: u64,
    /// CID of the head record.
    pub head_cid: String,
    /// Content CID carried by the head record.
    pub content_cid: String,
}

enum Command {
    Broadcast(GossipMsg),
    Dial(Multiaddr),
    RequestHead {
        peer: PeerId,
        site_id: String,
        reply: oneshot::Sender<Result<HeadInfo, P2pError>>,
    },
    RequestContent {
        peer: PeerId,
        content_cid: String,
        reply: oneshot::Sender<Result<Vec<u8>, P2pError>>,
    },
}

enum Pending {
    Head(oneshot::Sender<Result<HeadInfo, P2pError>>),
    Content(oneshot::Sender<Result<Vec<u8>, P2pError>>),
}

/// Handle to interact with the replication node.
#[derive(Clone)]
pub struct P2pNode {
    cmd_tx: mpsc::Sender<Command>,
    local_peer_id: PeerId,
}

impl P2pNode {
    /// Local peer ID.
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id.clone()
    }

    async fn send(&self, cmd: Command) -> Result<(), P2pError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| P2pError::ChannelClosed)
    }

    /// Publish an update envelope on the updates topic.
    pub async fn broadcast_update(&self, env: Envelope) -> Result<(), P2pError> {
        self.send(Command::Broadcast(GossipMsg::Update {
            record: env.record,
            content: env.content,
        }))
        .await
    }

    /// Publish a delete record on the updates topic.
    pub async fn broadcast_delete(&self, delete_bytes: Vec<u8>) -> Result<(), P2pError> {
        self.send(Command::Broadcast(GossipMsg::Delete {
            delete: delete_bytes,
        }))
        .await
    }

    /// Dial a peer address.
    pub async fn dial(&self, addr: Multiaddr) -> Result<(), P2pError> {
        self.send(Command::Dial(addr)).await
    }

    /// Ask a peer for the current head of a site.
    pub async fn request_head(
        &self,
        peer: PeerId,
        site_id: &str,
    ) -> Result<HeadInfo, P2pError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::RequestHead {
            peer,
            site_id: site_id.to_string(),
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| P2pError::ChannelClosed)?
    }

    /// Fetch a content blob from a peer.
    pub async fn request_content(
        &self,
        peer: PeerId,
        content_cid: &str,
    ) -> Result<Vec<u8>, P2pError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::RequestContent {
            peer,
            content_cid: content_cid.to_string(),
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| P2pError::ChannelClosed)?
    }
}

#[derive(Debug)]
enum BehaviourEvent {
    Gossipsub(gossipsub::Event),
    Browse(request_response::Event<BrowseRequest, BrowseResponse>),
    Mdns(mdns::Event),
    Identify(()),
    Ping(()),
}
impl From<gossipsub::Event> for BehaviourEvent {
    fn from(e: gossipsub::Event) -> Self {
        Self::Gossipsub(e)
    }
}
impl From<request_response::Event<BrowseRequest, BrowseResponse>> for BehaviourEvent {
    fn from(e: request_response::Event<BrowseRequest, BrowseResponse>) -> Self {
        Self::Browse(e)
    }
}
impl From<mdns::Event> for BehaviourEvent {
    fn from(e: mdns::Event) -> Self {
        Self::Mdns(e)
    }
}
impl From<identify::Event> for BehaviourEvent {
    fn from(_e: identify::Event) -> Self {
        Self::Identify(())
    }
}
impl From<ping::Event> for BehaviourEvent {
    fn from(_e: ping::Event) -> Self {
        Self::Ping(())
    }
}

#[derive(NetworkBehaviour)]
#[behaviour(to_swarm = "BehaviourEvent")]
struct Behaviour {
    gossipsub: gossipsub::Behaviour,
    browse: request_response::Behaviour<BrowseCodec>,
    mdns: Toggle<mdns::tokio::Behaviour>,
    identify: identify::Behaviour,
    ping: ping::Behaviour,
}

fn ensure_dir(path: &str) -> Result<(), P2pError> {
    let p = std::path::Path::new(path);
    if !p.exists() {
        std::fs::create_dir_all(p).map_err(|_| P2pError::Io)?;
    }
    Ok(())
}

fn serve_head(engine: &Engine, site_id: &str) -> BrowseResponse {
    let not_found = BrowseResponse::Head {
        ok: false,
        seq: 0,
        head_cid: String::new(),
        content_cid: String::new(),
    };
    match engine.get_head_record(site_id) {
        Ok(Some((seq, cid, record))) => BrowseResponse::Head {
            ok: true,
            seq,
            head_cid: cid,
            content_cid: record.content_cid,
        },
        Ok(None) => {
            // Manifest heads live in the manifest keyspace and carry no
            // single content CID.
            match engine.store().get_head(site_id) {
                Ok(Some((seq, cid))) => BrowseResponse::Head {
                    ok: true,
                    seq,
                    head_cid: cid,
                    content_cid: String::new(),
                },
                _ => not_found,
            }
        }
        Err(_) => not_found,
    }
}

fn serve_content(engine: &Engine, cache: &mut ContentCache, cid: &str) -> BrowseResponse {
    if let Some(bytes) = cache.get(cid) {
        return BrowseResponse::Content {
            ok: true,
            content: bytes,
        };
    }
    match engine.store().get_content(cid) {
        Ok(Some(bytes)) => {
            cache.put(cid, bytes.clone());
            BrowseResponse::Content {
                ok: true,
                content: bytes,
            }
        }
        _ => BrowseResponse::Content {
            ok: false,
            content: Vec::new(),
        },
    }
}

/// Spawn the replication node task.
pub fn spawn_p2p(
    cfg: P2pConfig,
    engine: Engine,
    metrics: Arc<Metrics>,
) -> Result<(P2pNode, EventRx, tokio::task::JoinHandle<()>), P2pError> {
    ensure_dir(&cfg.data_dir)?;

    let (local_peer_id, id_keys) =
        crate::networking::p2p_identity::load_or_create_identity(&cfg.data_dir)
            .map_err(|_| P2pError::Io)?;

    // Channels
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(1024);
    let (ev_tx, ev_rx) = mpsc::channel::<P2pEvent>(128);

    let listen_addr = cfg.listen_addr.clone();
    let topic_name = cfg.updates_topic.clone();
    let bootstrap = cfg.bootstrap.clone();
    let enable_mdns = cfg.enable_mdns;

    // Spawn swarm loop
    let join = tokio::spawn(async move {
        // --- Transport (TCP + Noise + Yamux) ---
        let noise_keys = match noise::Config::new(&id_keys) {
            Ok(v) => v,
            Err(_) => {
                warn!("failed to build noise config");
                return;
            }
        };

        let transport = tcp::tokio::Transport::new(tcp::Config::default().nodelay(true))
            .upgrade(upgrade::Version::V1)
            .authenticate(noise_keys)
            .multiplex(yamux::Config::default())
            .timeout(DIAL_UPGRADE_TIMEOUT)
            .boxed();

        // --- Gossipsub ---
        let gcfg = gossipsub::ConfigBuilder::default()
            .validation_mode(gossipsub::ValidationMode::Permissive)
            .heartbeat_interval(Duration::from_secs(1))
            .max_transmit_size(GOSSIP_MAX_BYTES)
            .build()
            .unwrap_or_else(|_| gossipsub::Config::default());

        let mut gossipsub = match gossipsub::Behaviour::new(
            MessageAuthenticity::Signed(id_keys.clone()),
            gcfg,
        ) {
            Ok(v) => v,
            Err(_) => {
                warn!("failed to create gossipsub behaviour");
                return;
            }
        };

        let topic = IdentTopic::new(topic_name.clone());
        if let Err(e) = gossipsub.subscribe(&topic) {
            warn!(err = ?e, "failed to subscribe topic");
        }

        // Browse request/response
        let browse = request_response::Behaviour::with_codec(
            BrowseCodec,
            std::iter::once((
                StreamProtocol::new(BROWSE_PROTOCOL),
                ProtocolSupport::Full,
            )),
            request_response::Config::default().with_request_timeout(BROWSE_REQUEST_TIMEOUT),
        );

        // mDNS LAN discovery (best-effort)
        let mdns_behaviour = if enable_mdns {
            match mdns::tokio::Behaviour::new(mdns::Config::default(), local_peer_id) {
                Ok(b) => {
                    info!(service = MDNS_SERVICE, "mdns discovery enabled");
                    Some(b)
                }
                Err(e) => {
                    warn!(err = ?e, "mdns init failed; continuing without");
                    None
                }
            }
        } else {
            None
        };

        // Identify + Ping
        let identify = identify::Behaviour::new(identify::Config::new(
            "betanet/1.0.0".to_string(),
            id_keys.public(),
        ));

        let ping = ping::Behaviour::new(
            ping::Config::new()
                .with_interval(Duration::from_secs(10))
                .with_timeout(Duration::from_secs(20)),
        );

        let behaviour = Behaviour {
            gossipsub,
            browse,
            mdns: Toggle::from(mdns_behaviour),
            identify,
            ping,
        };

        let mut swarm = Swarm::new(
            transport,
            behaviour,
            local_peer_id,
            SwarmConfig::with_tokio_executor(),
        );

        // Listen
        let listen: Multiaddr = match listen_addr.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(addr = %listen_addr, "bad listen_addr");
                return;
            }
        };

        if let Err(e) = swarm.listen_on(listen) {
            warn!(err = ?e, "listen_on failed");
            return;
        }

        // Bootstrap
        for b in bootstrap.iter().map(|x| x.trim()).filter(|x| !x.is_empty()) {
            match b.parse::<Multiaddr>() {
                Ok(ma) => {
                    if let Err(e) = swarm.dial(ma.clone()) {
                        warn!(boot = %b, err = ?e, "dial bootstrap failed");
                    } else {
                        info!(boot = %b, "dialing bootstrap");
                    }
                }
                Err(_) => warn!(boot = %b, "bad bootstrap addr; skipping"),
            }
        }

        info!(%local_peer_id, topic = %topic_name, "replication node started");

        let mut guard = PeerGuard::new(GuardParams::default());
        let mut cache = ContentCache::default();
        let mut pending: HashMap<OutboundRequestId, Pending> = HashMap::new();

        let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);
        let mut stale_sweep = tokio::time::interval(STALE_SWEEP_INTERVAL);
        let mut ban_sweep = tokio::time::interval(BAN_SWEEP_INTERVAL);
        let mut cache_sweep = tokio::time::interval(CACHE_SWEEP_INTERVAL);

        // Ensure gauge starts at 0
        metrics.p2p_peers.set(0);

        loop {
            tokio::select! {
                maybe_cmd = cmd_rx.recv() => {
                    let Some(cmd) = maybe_cmd else {
                        warn!("command channel closed; stopping node task");
                        break;
                    };
                    match cmd {
                        Command::Broadcast(msg) => {
                            match crate::core::codec::encode_canonical(&msg) {
                                Ok(bytes) => {
                                    if let Err(e) = swarm.behaviour_mut().gossipsub.publish(topic.clone(), bytes) {
                                        warn!(err = ?e, "gossipsub publish failed");
                                    }
                                }
                                Err(_) => {
                                    warn!("failed to encode gossip message");
                                    metrics.p2p_invalid_msg_total.inc();
                                }
                            }
                        }
                        Command::Dial(addr) => {
                            if let Err(e) = swarm.dial(addr.clone()) {
                                warn!(%addr, err = ?e, "dial failed");
                            }
                        }
                        Command::RequestHead { peer, site_id, reply } => {
                            let rid = swarm.behaviour_mut().browse.send_request(
                                &peer,
                                BrowseRequest::GetHead { site_id },
                            );
                            pending.insert(rid, Pending::Head(reply));
                        }
                        Command::RequestContent { peer, content_cid, reply } => {
                            let rid = swarm.behaviour_mut().browse.send_request(
                                &peer,
                                BrowseRequest::GetContent { content_cid },
                            );
                            pending.insert(rid, Pending::Content(reply));
                        }
                    }
                }

                _ = liveness.tick() => {
                    // Fails with no subscribed peers; harmless.
                    if let Err(e) = swarm.behaviour_mut().gossipsub.publish(topic.clone(), ALIVE_PAYLOAD.to_vec()) {
                        debug!(err = ?e, "liveness publish skipped");
                    }
                }

                _ = stale_sweep.tick() => {
                    guard.cleanup_stale(Instant::now());
                }

                _ = ban_sweep.tick() => {
                    guard.sweep_bans(Instant::now());
                }

                _ = cache_sweep.tick() => {
                    let evicted = cache.evict_to_limit();
                    if evicted > 0 {
                        metrics.content_cache_evicted_total.inc_by(evicted as u64);
                    }
                    metrics.content_cache_bytes.set(cache.usage() as i64);
                }

                ev = swarm.select_next_some() => {
                    match ev {
                        SwarmEvent::NewListenAddr { address, .. } => {
                            info!(addr = %address, "listening");
                            let _ = ev_tx.send(P2pEvent::Listening(address.to_string())).await;
                        }

                        SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                            match guard.on_connect(peer_id.to_bytes(), Instant::now()) {
                                Admit::Allow => {
                                    metrics.p2p_peers.inc();
                                    let _ = ev_tx.send(P2pEvent::PeerConnected(peer_id.to_bytes())).await;
                                    info!(%peer_id, "peer connected");
                                }
                                Admit::Banned => {
                                    warn!(%peer_id, "banned peer; disconnecting");
                                    metrics.p2p_banned_total.inc();
                                    let _ = swarm.disconnect_peer_id(peer_id);
                                }
                                Admit::PoolFull => {
                                    warn!(%peer_id, "peer pool full; disconnecting");
                                    let _ = swarm.disconnect_peer_id(peer_id);
                                }
                                Admit::RateLimited => {}
                            }
                        }

                        SwarmEvent::ConnectionClosed { peer_id, .. } => {
                            guard.on_disconnect(&peer_id.to_bytes());
                            metrics.p2p_peers.dec();
                            let _ = ev_tx.send(P2pEvent::PeerDisconnected(peer_id.to_bytes())).await;
                            info!(%peer_id, "peer disconnected");
                        }

                        SwarmEvent::Behaviour(BehaviourEvent::Gossipsub(gossipsub::Event::Message { propagation_source, message, .. })) => {
                            if message.data.len() > GOSSIP_MAX_BYTES {
                                metrics.p2p_invalid_msg_total.inc();
                                guard.observe_bad(propagation_source.to_bytes(), Instant::now(), 5);
                                continue;
                            }
                            if message.data == ALIVE_PAYLOAD {
                                continue;
                            }
                            match guard.admit_request(propagation_source.to_bytes(), Instant::now()) {
                                Admit::Allow => {}
                                Admit::RateLimited => {
                                    metrics.p2p_rate_limited_total.inc();
                                    warn!(%propagation_source, "gossip rate limited");
                                    continue;
                                }
                                Admit::Banned | Admit::PoolFull => {
                                    metrics.p2p_banned_total.inc();
                                    continue;
                                }
                            }

                            match decode_canonical_limited::<GossipMsg>(&message.data, GOSSIP_MAX_BYTES) {
                                Ok(GossipMsg::Update { record, content }) => {
                                    match engine.apply_record_bytes(&record, &content) {
                                        Ok(Applied { site_id, seq, rec_cid, content_cid }) => {
                                            guard.observe_good(propagation_source.to_bytes(), Instant::now());
                                            metrics.records_applied_total.inc();
                                            if !content.is_empty() {
                                                cache.put(&content_cid, content);
                                                metrics.content_cache_bytes.set(cache.usage() as i64);
                                            }
                                            debug!(%site_id, seq, %rec_cid, "record applied from gossip");
                                            let _ = ev_tx.send(P2pEvent::RecordApplied { site_id, seq, rec_cid }).await;
                                        }
                                        Err(e) => {
                                            debug!(%propagation_source, err = %e, "gossip record rejected");
                                            metrics.p2p_invalid_msg_total.inc();
                                            guard.observe_bad(propagation_source.to_bytes(), Instant::now(), 1);
                                        }
                                    }
                                }
                                Ok(GossipMsg::Delete { delete }) => {
                                    match decode_canonical_limited::<DeleteRecord>(&delete, GOSSIP_MAX_BYTES) {
                                        Ok(del) => match engine.apply_delete(&del) {
                                            Ok(()) => {
                                                guard.observe_good(propagation_source.to_bytes(), Instant::now());
                                                metrics.deletes_applied_total.inc();
                                                if let Some(cid) = del.target_cont.as_deref() {
                                                    cache.remove(cid);
                                                }
                                                let _ = ev_tx.send(P2pEvent::DeleteApplied { site_id: del.site_pub.site_id() }).await;
                                            }
                                            Err(e) => {
                                                debug!(%propagation_source, err = %e, "gossip delete rejected");
                                                metrics.p2p_invalid_msg_total.inc();
                                                guard.observe_bad(propagation_source.to_bytes(), Instant::now(), 1);
                                            }
                                        },
                                        Err(_) => {
                                            metrics.p2p_invalid_msg_total.inc();
                                            guard.observe_bad(propagation_source.to_bytes(), Instant::now(), 5);
                                        }
                                    }
                                }
                                Err(_) => {
                                    warn!(%propagation_source, "invalid gossip decode");
                                    metrics.p2p_invalid_msg_total.inc();
                                    guard.observe_bad(propagation_source.to_bytes(), Instant::now(), 5);
                                }
                            }
                        }

                        SwarmEvent::Behaviour(BehaviourEvent::Browse(request_response::Event::Message { peer, message })) => {
                            match message {
                                request_response::Message::Request { request, channel, .. } => {
                                    metrics.browse_requests_total.inc();
                                    match guard.admit_request(peer.to_bytes(), Instant::now()) {
                                        Admit::Allow => {}
                                        Admit::RateLimited => {
                                            metrics.p2p_rate_limited_total.inc();
                                            warn!(%peer, "browse rate limited");
                                            let refused = match request {
                                                BrowseRequest::GetHead { .. } => BrowseResponse::Head {
                                                    ok: false,
                                                    seq: 0,
                                                    head_cid: String::new(),
                                                    content_cid: String::new(),
                                                },
                                                BrowseRequest::GetContent { .. } => BrowseResponse::Content {
                                                    ok: false,
                                                    content: Vec::new(),
                                                },
                                            };
                                            let _ = swarm.behaviour_mut().browse.send_response(channel, refused);
                                            continue;
                                        }
                                        Admit::Banned | Admit::PoolFull => {
                                            metrics.p2p_banned_total.inc();
                                            continue;
                                        }
                                    }
                                    let resp = match request {
                                        BrowseRequest::GetHead { site_id } => serve_head(&engine, &site_id),
                                        BrowseRequest::GetContent { content_cid } => {
                                            serve_content(&engine, &mut cache, &content_cid)
                                        }
                                    };
                                    let served = matches!(
                                        resp,
                                        BrowseResponse::Head { ok: true, .. } | BrowseResponse::Content { ok: true, .. }
                                    );
                                    if served {
                                        metrics.browse_served_total.inc();
                                    }
                                    if swarm.behaviour_mut().browse.send_response(channel, resp).is_err() {
                                        debug!(%peer, "browse response send failed (stream closed)");
                                    }
                                }
                                request_response::Message::Response { request_id, response } => {
                                    match (pending.remove(&request_id), response) {
                                        (Some(Pending::Head(reply)), BrowseResponse::Head { ok, seq, head_cid, content_cid }) => {
                                            let result = if ok {
                                                Ok(HeadInfo { seq, head_cid, content_cid })
                                            } else {
                                                Err(P2pError::NotFound)
                                            };
                                            let _ = reply.send(result);
                                        }
                                        (Some(Pending::Content(reply)), BrowseResponse::Content { ok, content }) => {
                                            let result = if ok { Ok(content) } else { Err(P2pError::NotFound) };
                                            let _ = reply.send(result);
                                        }
                                        (Some(Pending::Head(reply)), _) => {
                                            let _ = reply.send(Err(P2pError::MalformedResponse));
                                        }
                                        (Some(Pending::Content(reply)), _) => {
                                            let _ = reply.send(Err(P2pError::MalformedResponse));
                                        }
                                        (None, _) => {}
                                    }
                                }
                            }
                        }

                        SwarmEvent::Behaviour(BehaviourEvent::Browse(request_response::Event::OutboundFailure { peer, request_id, error })) => {
                            debug!(%peer, err = %error, "browse outbound failure");
                            let failure = match error {
                                request_response::OutboundFailure::Timeout => P2pError::Timeout,
                                _ => P2pError::PeerUnavailable,
                            };
                            match pending.remove(&request_id) {
                                Some(Pending::Head(reply)) => {
                                    let _ = reply.send(Err(failure));
                                }
                                Some(Pending::Content(reply)) => {
                                    let _ = reply.send(Err(failure));
                                }
                                None => {}
                            }
                        }

                        SwarmEvent::Behaviour(BehaviourEvent::Mdns(mdns::Event::Discovered(peers))) => {
                            for (peer_id, addr) in peers {
                                debug!(%peer_id, %addr, "mdns discovered peer");
                                let _ = ev_tx.send(P2pEvent::PeerDiscovered(peer_id.to_bytes())).await;
                                if let Err(e) = swarm.dial(addr) {
                                    debug!(%peer_id, err = ?e, "mdns dial failed");
                                }
                            }
                        }
                        SwarmEvent::Behaviour(BehaviourEvent::Mdns(mdns::Event::Expired(_))) => {}

                        SwarmEvent::Behaviour(BehaviourEvent::Browse(_)) => {}
                        SwarmEvent::Behaviour(BehaviourEvent::Identify(_)) => {}
                        SwarmEvent::Behaviour(BehaviourEvent::Ping(_)) => {}

                        _ => {}
                    }
                }
            }
        }
    });

    Ok((
        P2pNode {
            cmd_tx,
            local_peer_id,
        },
        ev_rx,
        join,
    ))
}
