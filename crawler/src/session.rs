//! Internal session coordination for crawling operations.
//!
//! This module contains the [`CrawlSession`] which orchestrates the crawling process
//! by dispatching probes for discovered peers and detecting when no work is left.

use crate::crawler::{CrawlError, CrawlerMessage};
use crate::prober::Prober;
use crate::registry::{IdentityConflict, Registry};
use crate::report::{CrawlReport, ProbeKind, ProbeOutcome};
use crate::statesync;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tendermint_peers_client::{ClientError, PeerDescriptor};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Configuration for a crawl session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chain ID peers must report, `None` to adopt the first one seen.
    pub chain_id: Option<String>,
    pub state_sync: bool,
    pub core_api: bool,
    pub progress_interval: Duration,
}

/// Completion of a probe task, sent to the coordinator exactly once per task.
#[derive(Debug)]
enum TaskEvent {
    /// RPC probe finished, carrying the peers it admitted.
    Rpc {
        address: String,
        result: Result<Vec<PeerDescriptor>, ClientError>,
    },
    Link {
        address: String,
        result: Result<(), ClientError>,
    },
    CoreApi {
        address: String,
        result: Result<u64, ClientError>,
    },
    /// RPC probe found a peer on another chain.
    Conflict(IdentityConflict),
}

/// The part of a session handed to each spawned probe task.
#[derive(Clone)]
struct ProbeTask<P> {
    prober: P,
    registry: Arc<Registry>,
}

impl<P: Prober> ProbeTask<P> {
    /// Asks a node for its peers and admits the ones not seen before.
    async fn rpc(self, address: String) -> TaskEvent {
        let peers = match self.prober.net_info(&address).await {
            Ok(peers) => peers,
            Err(e) => return TaskEvent::Rpc { address, result: Err(e) },
        };

        let mut admitted = Vec::new();
        for peer in peers {
            match self.registry.admit(&peer).await {
                Ok(true) => admitted.push(peer),
                // Already checked or checking.
                Ok(false) => {}
                Err(conflict) => return TaskEvent::Conflict(conflict),
            }
        }

        TaskEvent::Rpc {
            address,
            result: Ok(admitted),
        }
    }

    async fn link(self, peer: PeerDescriptor) -> TaskEvent {
        TaskEvent::Link {
            address: peer.persistent_peer(),
            result: self.prober.dial(&peer).await,
        }
    }

    async fn core_api(self, peer: PeerDescriptor) -> TaskEvent {
        TaskEvent::CoreApi {
            address: peer.core_api_address(),
            result: self.prober.last_block_height(&peer).await,
        }
    }
}

/// Internal coordinator for a crawling session.
///
/// `CrawlSession` owns every tally of the crawl. Probe tasks never touch
/// them, each reports back with a single [`TaskEvent`] and the coordinator
/// does all the bookkeeping.
///
/// # Quiescence
///
/// A probe counts as running from the moment the coordinator spawns it
/// until its event is handled. An RPC probe's event carries the peers it
/// admitted, and the probes for those peers are spawned while handling that
/// same event, before the RPC probe itself is marked finished. The in-flight
/// total therefore only reaches zero once nothing is running and nothing
/// can be spawned anymore.
pub struct CrawlSession<P> {
    config: SessionConfig,
    task: ProbeTask<P>,
    /// Channel for sending discovery results back to the caller.
    crawl_tx: mpsc::Sender<CrawlerMessage>,
}

impl<P: Prober> CrawlSession<P> {
    /// Create a new crawl session with a fresh registry.
    pub fn new(config: SessionConfig, prober: P, crawl_tx: mpsc::Sender<CrawlerMessage>) -> Self {
        let registry = Arc::new(Registry::new(config.chain_id.clone()));
        Self {
            config,
            task: ProbeTask { prober, registry },
            crawl_tx,
        }
    }

    /// Coordinates the crawl from the seed RPCs until no probe is left running.
    ///
    /// # Termination Conditions
    ///
    /// 1. **Quiescence** - Every probe finished, the report (and state-sync
    ///    config if requested) is sent.
    /// 2. **Identity conflict** - Two chain IDs seen, the crawl is aborted.
    /// 3. **Channel Closure** - Receiver dropped, indicating caller no longer interested.
    pub async fn coordinate(&self, seeds: Vec<String>) {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut report = CrawlReport::new(self.config.core_api);

        for seed in seeds {
            info!("RPC Address: {seed}");
            self.spawn_rpc(seed, &mut report, &event_tx);
        }

        let period = self.config.progress_interval;
        let mut progress = tokio::time::interval_at(Instant::now() + period, period);
        progress.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while report.in_flight() > 0 {
            // Check if caller hung up before continuing.
            if self.crawl_tx.is_closed() {
                debug!("Receiver disconnected, stopping crawler");
                return;
            }

            tokio::select! {
                // The coordinator holds a sender, so the channel never closes here.
                Some(event) = event_rx.recv() => {
                    let outcome = match self.handle(event, &mut report, &event_tx) {
                        Ok(outcome) => outcome,
                        Err(conflict) => {
                            error!("{conflict}");
                            let _ = self
                                .crawl_tx
                                .send(CrawlerMessage::Aborted(CrawlError::IdentityConflict(conflict)))
                                .await;
                            return;
                        }
                    };
                    debug!("{outcome}");
                    if self.crawl_tx.send(CrawlerMessage::Probed(outcome)).await.is_err() {
                        return;
                    }
                }
                _ = progress.tick() => {
                    let progress = report.progress();
                    for kind in &progress {
                        debug!("{kind}");
                    }
                    if self.crawl_tx.send(CrawlerMessage::Progress(progress)).await.is_err() {
                        return;
                    }
                }
            }
        }

        report.chain_id = self.task.registry.chain_id().await;
        info!(
            "All IPs tested, {} peers discovered",
            self.task.registry.len().await
        );
        if self
            .crawl_tx
            .send(CrawlerMessage::Complete(report.clone()))
            .await
            .is_err()
        {
            return;
        }

        if self.config.state_sync {
            let result = statesync::generate(&self.task.prober, &report.rpc.successes).await;
            if let Err(e) = &result {
                error!("{e}");
            }
            let _ = self.crawl_tx.send(CrawlerMessage::StateSync(result)).await;
        }
    }

    /// Records a finished probe and dispatches any peers it discovered.
    fn handle(
        &self,
        event: TaskEvent,
        report: &mut CrawlReport,
        events: &mpsc::UnboundedSender<TaskEvent>,
    ) -> Result<ProbeOutcome, IdentityConflict> {
        let (kind, address, success) = match event {
            TaskEvent::Conflict(conflict) => return Err(conflict),
            TaskEvent::Rpc { address, result } => {
                let success = match result {
                    Ok(peers) => {
                        // Spawned before this probe is marked finished, see quiescence above.
                        for peer in peers {
                            self.dispatch(peer, report, events);
                        }
                        true
                    }
                    Err(e) => {
                        debug!("Failed to get response from {address}: {e}");
                        false
                    }
                };
                (ProbeKind::Rpc, address, success)
            }
            TaskEvent::Link { address, result } => {
                if let Err(e) = &result {
                    debug!("Couldn't connect to peer at {address}: {e}");
                }
                (ProbeKind::Link, address, result.is_ok())
            }
            TaskEvent::CoreApi { address, result } => {
                match &result {
                    Ok(height) => debug!("Core API at {address} reports height {height}"),
                    Err(e) => debug!("Could not get last block height from {address}: {e}"),
                }
                (ProbeKind::CoreApi, address, result.is_ok())
            }
        };

        if let Some(tally) = report.tally_mut(kind) {
            tally.finish(address.clone(), success);
        }
        Ok(ProbeOutcome {
            kind,
            address,
            success,
        })
    }

    /// Fans a newly admitted peer out to every enabled probe kind.
    fn dispatch(
        &self,
        peer: PeerDescriptor,
        report: &mut CrawlReport,
        events: &mpsc::UnboundedSender<TaskEvent>,
    ) {
        debug!("Discovered {peer}");
        self.spawn_rpc(peer.rpc_url(), report, events);

        report.link.start();
        let task = self.task.clone();
        let link_peer = peer.clone();
        spawn_reporting(events, async move { task.link(link_peer).await });

        // Only present when core API probing is enabled.
        if let Some(tally) = report.core_api.as_mut() {
            tally.start();
            let task = self.task.clone();
            spawn_reporting(events, async move { task.core_api(peer).await });
        }
    }

    fn spawn_rpc(
        &self,
        address: String,
        report: &mut CrawlReport,
        events: &mpsc::UnboundedSender<TaskEvent>,
    ) {
        report.rpc.start();
        let task = self.task.clone();
        spawn_reporting(events, async move { task.rpc(address).await });
    }
}

/// Spawns a probe task that reports its completion to the coordinator.
fn spawn_reporting<F>(events: &mpsc::UnboundedSender<TaskEvent>, probe: F)
where
    F: std::future::Future<Output = TaskEvent> + Send + 'static,
{
    let events = events.clone();
    tokio::spawn(async move {
        let event = probe.await;
        // Only fails once the coordinator has given up on the crawl.
        let _ = events.send(event);
    });
}
