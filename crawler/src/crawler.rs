use crate::prober::{NetworkProber, Prober};
use crate::registry::IdentityConflict;
use crate::report::{CrawlReport, KindProgress, ProbeOutcome};
use crate::session::{CrawlSession, SessionConfig};
use crate::statesync::{StateSyncConfig, StateSyncError};
use log::debug;
use std::error::Error;
use std::fmt;
use tokio::sync::mpsc::{self, Receiver};

/// Errors that end a crawl without a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    /// No initial RPC address was configured.
    NoSeeds,
    /// Two peers reported different chain IDs.
    IdentityConflict(IdentityConflict),
    /// The crawl stopped before reaching quiescence.
    Interrupted,
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlError::NoSeeds => write!(f, "No initial RPC addresses to crawl from"),
            CrawlError::IdentityConflict(conflict) => write!(f, "{conflict}"),
            CrawlError::Interrupted => write!(f, "Crawl ended before all peers were tested"),
        }
    }
}

impl Error for CrawlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CrawlError::IdentityConflict(conflict) => Some(conflict),
            CrawlError::NoSeeds => None,
            CrawlError::Interrupted => None,
        }
    }
}

/// Messages sent from the [`Crawler`] to the caller about peer discovery.
#[derive(Debug)]
pub enum CrawlerMessage {
    /// A probe finished.
    Probed(ProbeOutcome),
    /// Periodic snapshot of every probe kind.
    Progress(Vec<KindProgress>),
    /// No probe is left running, the crawl is complete.
    Complete(CrawlReport),
    /// Result of state-sync config generation, only sent when it was requested.
    StateSync(Result<StateSyncConfig, StateSyncError>),
    /// The crawl was aborted, no report follows.
    Aborted(CrawlError),
}

impl fmt::Display for CrawlerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerMessage::Probed(outcome) => write!(f, "{outcome}"),
            CrawlerMessage::Progress(progress) => {
                let lines: Vec<String> = progress.iter().map(ToString::to_string).collect();
                write!(f, "{}", lines.join("\n"))
            }
            CrawlerMessage::Complete(report) => write!(f, "All IPs tested.\n\n{report}"),
            CrawlerMessage::StateSync(Ok(config)) => write!(f, "Statesync config:\n\n{config}"),
            CrawlerMessage::StateSync(Err(e)) => write!(f, "Statesync config failed: {e}"),
            CrawlerMessage::Aborted(e) => write!(f, "Crawl aborted: {e}"),
        }
    }
}

/// Final result of a crawl that reached quiescence.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub report: CrawlReport,
    /// `None` unless state-sync generation was requested.
    pub state_sync: Option<Result<StateSyncConfig, StateSyncError>>,
}

/// A crawler for a tendermint peer-to-peer network.
///
/// This crawler asks nodes for their peers over RPC, checks every peer over
/// each enabled protocol, and asks the peers for more peers in turn.
#[derive(Debug, Clone)]
pub struct Crawler<P = NetworkProber> {
    config: SessionConfig,
    /// RPC base URLs the crawl starts from.
    seeds: Vec<String>,
    prober: P,
}

impl<P: Prober> Crawler<P> {
    pub(crate) fn new(config: SessionConfig, seeds: Vec<String>, prober: P) -> Self {
        Crawler {
            config,
            seeds,
            prober,
        }
    }

    /// Crawl the network starting from the configured seed RPCs.
    ///
    /// This method returns a channel that will receive messages as probes finish.
    /// The channel will be closed when the crawl is complete or aborted.
    ///
    /// # Termination
    ///
    /// * **Natural completion** - No probe is running and none can be started,
    ///   [`CrawlerMessage::Complete`] is sent, followed by
    ///   [`CrawlerMessage::StateSync`] if requested.
    /// * **Identity conflict** - [`CrawlerMessage::Aborted`] is sent.
    /// * **Early termination** - When the returned receiver is dropped, the crawler will detect this and stop gracefully.
    ///
    /// # Returns
    ///
    /// * `Ok(Receiver<CrawlerMessage>)` - A channel that will receive crawl messages.
    /// * `Err(CrawlError)` - If there are no seeds to start from.
    pub async fn crawl(&self) -> Result<Receiver<CrawlerMessage>, CrawlError> {
        if self.seeds.is_empty() {
            return Err(CrawlError::NoSeeds);
        }

        let (crawl_tx, crawl_rx) = mpsc::channel(1000);
        let session = CrawlSession::new(self.config.clone(), self.prober.clone(), crawl_tx);
        let seeds = self.seeds.clone();

        tokio::spawn(async move {
            session.coordinate(seeds).await;
        });

        Ok(crawl_rx)
    }

    /// Crawl to completion, discarding intermediate messages.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - The report, and the state-sync result if requested.
    /// * `Err(CrawlError)` - If the crawl could not start or was aborted.
    pub async fn run(&self) -> Result<CrawlOutcome, CrawlError> {
        let mut crawl_rx = self.crawl().await?;
        let mut report = None;
        let mut state_sync = None;

        while let Some(message) = crawl_rx.recv().await {
            match message {
                CrawlerMessage::Complete(complete) => report = Some(complete),
                CrawlerMessage::StateSync(result) => state_sync = Some(result),
                CrawlerMessage::Aborted(e) => return Err(e),
                other => debug!("{other}"),
            }
        }

        match report {
            Some(report) => Ok(CrawlOutcome { report, state_sync }),
            None => Err(CrawlError::Interrupted),
        }
    }
}
