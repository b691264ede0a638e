//! Probe outcomes and the tallies they are accumulated into.

use std::fmt;

/// The protocols each discovered peer is probed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// HTTP `net_info` request against the node's RPC server.
    Rpc,
    /// TCP connection to the node's p2p listener.
    Link,
    /// gRPC `LastBlockHeight` call against the node's core API.
    CoreApi,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Rpc => write!(f, "RPC"),
            ProbeKind::Link => write!(f, "Peer"),
            ProbeKind::CoreApi => write!(f, "Core API"),
        }
    }
}

/// Result of a single finished probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub kind: ProbeKind,
    /// The probed address, an RPC base URL, a `persistent_peers` entry or a core API socket.
    pub address: String,
    pub success: bool,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.success { "reachable" } else { "unreachable" };
        write!(f, "{} {}: {verdict}", self.kind, self.address)
    }
}

/// Running and finished counts for one probe kind, plus the finished addresses.
///
/// Addresses are kept in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeTally {
    pub running: usize,
    pub finished: usize,
    pub successes: Vec<String>,
    pub failures: Vec<String>,
}

impl ProbeTally {
    pub(crate) fn start(&mut self) {
        self.running += 1;
    }

    pub(crate) fn finish(&mut self, address: String, success: bool) {
        debug_assert!(self.running > 0, "finished a probe that never started");
        self.running = self.running.saturating_sub(1);
        self.finished += 1;
        if success {
            self.successes.push(address);
        } else {
            self.failures.push(address);
        }
    }
}

/// Progress of one probe kind, as reported periodically during a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindProgress {
    pub kind: ProbeKind,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl fmt::Display for KindProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Testing {}s... {} running and {} found",
            self.kind, self.running, self.succeeded
        )
    }
}

/// Everything a crawl learned, per probe kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// The chain ID every discovered peer agreed on, `None` if no peer was found.
    pub chain_id: Option<String>,
    pub rpc: ProbeTally,
    pub link: ProbeTally,
    /// `None` when core API probing is disabled.
    pub core_api: Option<ProbeTally>,
}

impl CrawlReport {
    pub(crate) fn new(core_api: bool) -> Self {
        CrawlReport {
            chain_id: None,
            rpc: ProbeTally::default(),
            link: ProbeTally::default(),
            core_api: core_api.then(ProbeTally::default),
        }
    }

    /// Tally of a probe kind, `None` if that kind is disabled.
    pub fn tally(&self, kind: ProbeKind) -> Option<&ProbeTally> {
        match kind {
            ProbeKind::Rpc => Some(&self.rpc),
            ProbeKind::Link => Some(&self.link),
            ProbeKind::CoreApi => self.core_api.as_ref(),
        }
    }

    pub(crate) fn tally_mut(&mut self, kind: ProbeKind) -> Option<&mut ProbeTally> {
        match kind {
            ProbeKind::Rpc => Some(&mut self.rpc),
            ProbeKind::Link => Some(&mut self.link),
            ProbeKind::CoreApi => self.core_api.as_mut(),
        }
    }

    /// Probes in flight across all kinds.
    pub fn in_flight(&self) -> usize {
        self.tallies().map(|(_, tally)| tally.running).sum()
    }

    /// Enabled kinds with their tallies, in reporting order.
    pub fn tallies(&self) -> impl Iterator<Item = (ProbeKind, &ProbeTally)> {
        [ProbeKind::Rpc, ProbeKind::Link, ProbeKind::CoreApi]
            .into_iter()
            .filter_map(move |kind| self.tally(kind).map(|tally| (kind, tally)))
    }

    pub fn progress(&self) -> Vec<KindProgress> {
        self.tallies()
            .map(|(kind, tally)| KindProgress {
                kind,
                running: tally.running,
                succeeded: tally.successes.len(),
                failed: tally.failures.len(),
            })
            .collect()
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(chain_id) = &self.chain_id {
            writeln!(f, "Chain ID: {chain_id}")?;
        }
        for (kind, tally) in self.tallies() {
            writeln!(f, "Successful {kind}s: \"{}\"", tally.successes.join(","))?;
            writeln!(f, "Failed {kind}s: \"{}\"", tally.failures.join(","))?;
        }
        Ok(())
    }
}
