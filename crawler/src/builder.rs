//! Builder pattern for configuring and creating crawler instances.

use crate::config::DiscoveryConfig;
use crate::crawler::Crawler;
use crate::prober::{NetworkProber, Prober};
use crate::session::SessionConfig;
use std::fmt;
use std::time::Duration;
use tendermint_peers_client::ClientError;

/// Default timeout of an RPC request.
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout of a p2p listener dial.
const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(3);
/// Default deadline of a core API call.
const DEFAULT_CORE_API_TIMEOUT: Duration = Duration::from_secs(5);
/// Default interval between progress reports.
const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(3);

/// Errors that can occur during crawler configuration.
#[derive(Debug)]
pub enum CrawlerBuilderError {
    /// The HTTP client for RPC probes could not be created.
    HttpClient(ClientError),
    /// Progress cannot be reported every zero seconds.
    ZeroProgressInterval,
}

impl fmt::Display for CrawlerBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerBuilderError::HttpClient(err) => {
                write!(f, "Failed to create RPC client: {err}")
            }
            CrawlerBuilderError::ZeroProgressInterval => {
                write!(f, "Progress interval must be non-zero")
            }
        }
    }
}

impl std::error::Error for CrawlerBuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlerBuilderError::HttpClient(err) => Some(err),
            CrawlerBuilderError::ZeroProgressInterval => None,
        }
    }
}

/// Builder for creating a customized [`Crawler`] instance.
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), tendermint_peers_crawler::CrawlerBuilderError> {
/// use std::time::Duration;
/// use tendermint_peers_crawler::CrawlerBuilder;
///
/// // Create a crawler that adopts the chain ID of the first peer it finds
/// let basic_crawler = CrawlerBuilder::new(["http://127.0.0.1:26657"]).build()?;
///
/// // Create a crawler pinned to a chain, with custom settings
/// let custom_crawler = CrawlerBuilder::new(["http://127.0.0.1:26657"])
///     .with_chain_id("vega-mainnet-0011")
///     .with_state_sync(true)
///     .with_core_api(false)
///     .with_rpc_timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CrawlerBuilder {
    /// RPC base URLs the crawl starts from.
    initial_rpcs: Vec<String>,
    /// Chain ID peers must report, `None` to infer it.
    chain_id: Option<String>,
    /// Generate a state-sync config once the crawl completes.
    state_sync: bool,
    /// Probe each peer's core API.
    core_api: bool,
    rpc_timeout: Duration,
    link_timeout: Duration,
    core_api_timeout: Duration,
    progress_interval: Duration,
}

impl CrawlerBuilder {
    /// Create a new crawler builder for the given seed RPCs.
    ///
    /// # Arguments
    ///
    /// * `initial_rpcs` - RPC base URLs to start from, e.g. `http://1.2.3.4:26657`.
    ///
    /// # Returns
    ///
    /// A new `CrawlerBuilder` instance, inferring the chain ID.
    pub fn new<I, S>(initial_rpcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CrawlerBuilder {
            initial_rpcs: initial_rpcs.into_iter().map(Into::into).collect(),
            chain_id: None,
            state_sync: false,
            core_api: cfg!(feature = "core-api"),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            link_timeout: DEFAULT_LINK_TIMEOUT,
            core_api_timeout: DEFAULT_CORE_API_TIMEOUT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Create a builder from resolved configuration.
    pub fn from_config(config: DiscoveryConfig) -> Self {
        let chain_id = config.expected_chain_id();
        let mut builder = CrawlerBuilder::new(config.initial_rpcs)
            .with_state_sync(config.state_sync)
            .with_core_api(config.core_api);
        builder.chain_id = chain_id;
        builder
    }

    /// Require every peer to report `chain_id`.
    ///
    /// An empty chain ID is the same as [`CrawlerBuilder::infer_chain_id`].
    pub fn with_chain_id<S: Into<String>>(mut self, chain_id: S) -> Self {
        let chain_id = chain_id.into();
        self.chain_id = (!chain_id.is_empty()).then_some(chain_id);
        self
    }

    /// Adopt the chain ID of the first peer found.
    pub fn infer_chain_id(mut self) -> Self {
        self.chain_id = None;
        self
    }

    /// Generate a state-sync config once the crawl completes.
    pub fn with_state_sync(mut self, enabled: bool) -> Self {
        self.state_sync = enabled;
        self
    }

    /// Probe each peer's core API.
    ///
    /// Has no effect when built without the `core-api` feature.
    pub fn with_core_api(mut self, enabled: bool) -> Self {
        self.core_api = enabled && cfg!(feature = "core-api");
        self
    }

    /// Set the timeout of RPC requests (defaults to 5 seconds).
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Set the timeout of p2p listener dials (defaults to 3 seconds).
    pub fn with_link_timeout(mut self, timeout: Duration) -> Self {
        self.link_timeout = timeout;
        self
    }

    /// Set the deadline of core API calls (defaults to 5 seconds).
    pub fn with_core_api_timeout(mut self, timeout: Duration) -> Self {
        self.core_api_timeout = timeout;
        self
    }

    /// Set how often progress is reported while crawling (defaults to 3 seconds).
    ///
    /// Must be non-zero, building fails otherwise.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Build the crawler with the configured options.
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - A crawler probing real nodes.
    /// * `Err(CrawlerBuilderError)` - If the RPC client could not be created
    ///   or the progress interval is zero.
    pub fn build(self) -> Result<Crawler, CrawlerBuilderError> {
        if self.progress_interval.is_zero() {
            return Err(CrawlerBuilderError::ZeroProgressInterval);
        }
        let prober = NetworkProber::new(self.rpc_timeout, self.link_timeout, self.core_api_timeout)
            .map_err(CrawlerBuilderError::HttpClient)?;
        self.build_with_prober(prober)
    }

    /// Build the crawler around a custom [`Prober`].
    ///
    /// The timeouts configured on the builder are not applied, the prober
    /// is expected to bound its own calls.
    pub fn build_with_prober<P: Prober>(self, prober: P) -> Result<Crawler<P>, CrawlerBuilderError> {
        if self.progress_interval.is_zero() {
            return Err(CrawlerBuilderError::ZeroProgressInterval);
        }
        let config = SessionConfig {
            chain_id: self.chain_id,
            state_sync: self.state_sync,
            core_api: self.core_api,
            progress_interval: self.progress_interval,
        };
        Ok(Crawler::new(config, self.initial_rpcs, prober))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prober::test_utils::MockProber;

    #[test]
    fn test_from_config() {
        let config = DiscoveryConfig::new("net-x", "http://a:26657,http://b:26657", false, true);
        let builder = CrawlerBuilder::from_config(config);

        assert_eq!(builder.initial_rpcs, vec!["http://a:26657", "http://b:26657"]);
        assert_eq!(builder.chain_id.as_deref(), Some("net-x"));
        assert!(builder.state_sync);

        let config = DiscoveryConfig::new("net-x", "http://a:26657", true, false);
        let builder = CrawlerBuilder::from_config(config);
        assert_eq!(builder.chain_id, None);
    }

    #[test]
    fn test_chain_id_options() {
        let builder = CrawlerBuilder::new(["http://a:26657"]).with_chain_id("net-x");
        assert_eq!(builder.chain_id.as_deref(), Some("net-x"));

        let builder = builder.infer_chain_id();
        assert_eq!(builder.chain_id, None);

        let builder = CrawlerBuilder::new(["http://a:26657"]).with_chain_id("");
        assert_eq!(builder.chain_id, None);
    }

    #[test]
    fn test_core_api_toggle() {
        let builder = CrawlerBuilder::new(["http://a:26657"]);
        assert_eq!(builder.core_api, cfg!(feature = "core-api"));

        let builder = builder.with_core_api(false);
        assert!(!builder.core_api);
    }

    #[test]
    fn test_zero_progress_interval_rejected() {
        let result = CrawlerBuilder::new(["http://a:26657"])
            .with_progress_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(CrawlerBuilderError::ZeroProgressInterval)));

        let result = CrawlerBuilder::new(["http://a:26657"])
            .with_progress_interval(Duration::ZERO)
            .build_with_prober(MockProber::new());
        assert!(matches!(result, Err(CrawlerBuilderError::ZeroProgressInterval)));

        let result = CrawlerBuilder::new(["http://a:26657"])
            .with_progress_interval(Duration::from_millis(1))
            .build_with_prober(MockProber::new());
        assert!(result.is_ok());
    }
}
