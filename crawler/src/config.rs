//! Plain configuration handed to the crawler by whatever resolves flags.

/// Settings of a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Chain ID every discovered peer must report, ignored when `infer_chain_id` is set.
    pub chain_id: String,
    /// RPC base URLs the crawl starts from.
    pub initial_rpcs: Vec<String>,
    /// Adopt the chain ID of the first peer found instead of `chain_id`.
    pub infer_chain_id: bool,
    /// Generate a state-sync config once the crawl completes.
    pub state_sync: bool,
    /// Probe each peer's core API as well.
    pub core_api: bool,
}

impl DiscoveryConfig {
    /// Create a config from a comma separated list of RPC base URLs.
    ///
    /// Core API probing defaults to whether the crate was built with support for it.
    pub fn new<S: Into<String>>(
        chain_id: S,
        initial_rpcs: &str,
        infer_chain_id: bool,
        state_sync: bool,
    ) -> Self {
        DiscoveryConfig {
            chain_id: chain_id.into(),
            initial_rpcs: parse_initial_rpcs(initial_rpcs),
            infer_chain_id,
            state_sync,
            core_api: cfg!(feature = "core-api"),
        }
    }

    /// The chain ID the crawl starts pinned to, if any.
    pub fn expected_chain_id(&self) -> Option<String> {
        if self.infer_chain_id || self.chain_id.is_empty() {
            None
        } else {
            Some(self.chain_id.clone())
        }
    }
}

/// Split a comma separated list of RPC base URLs, dropping blank entries.
pub fn parse_initial_rpcs(initial_rpcs: &str) -> Vec<String> {
    initial_rpcs
        .split(',')
        .map(str::trim)
        .filter(|rpc| !rpc.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_initial_rpcs() {
        assert_eq!(
            parse_initial_rpcs("http://a:26657, http://b:26657,,http://c:26657 ,"),
            vec!["http://a:26657", "http://b:26657", "http://c:26657"]
        );
        assert!(parse_initial_rpcs("").is_empty());
        assert!(parse_initial_rpcs(" , ").is_empty());
    }

    #[test]
    fn test_expected_chain_id() {
        let config = DiscoveryConfig::new("vega-mainnet-0011", "http://a:26657", false, false);
        assert_eq!(config.expected_chain_id().as_deref(), Some("vega-mainnet-0011"));

        let config = DiscoveryConfig::new("vega-mainnet-0011", "http://a:26657", true, false);
        assert_eq!(config.expected_chain_id(), None);

        let config = DiscoveryConfig::new("", "http://a:26657", false, false);
        assert_eq!(config.expected_chain_id(), None);
    }
}
