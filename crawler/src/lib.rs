mod builder;
mod config;
mod crawler;
mod prober;
mod registry;
mod report;
mod session;
mod statesync;

pub use builder::{CrawlerBuilder, CrawlerBuilderError};
pub use config::{parse_initial_rpcs, DiscoveryConfig};
pub use crawler::{CrawlError, CrawlOutcome, Crawler, CrawlerMessage};
pub use prober::{NetworkProber, Prober};
pub use registry::{IdentityConflict, Registry};
pub use report::{CrawlReport, KindProgress, ProbeKind, ProbeOutcome, ProbeTally};
pub use statesync::{select_rpc_servers, StateSyncConfig, StateSyncError};

// Re-exports.
pub use tendermint_peers_client::{ClientError, PeerDescriptor, TrustAnchor};
