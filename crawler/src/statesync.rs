//! State-sync configuration from the RPC servers found by a crawl.
//!
//! A node joining the network can skip replaying history by trusting a
//! recent block served by two RPC servers. The generated snippet is the
//! `[statesync]` section of a tendermint `config.toml`.

use crate::prober::Prober;
use log::{debug, info};
use rand::Rng;
use std::error::Error;
use std::fmt;
use tendermint_peers_client::ClientError;

/// Trust parameters for tendermint state sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSyncConfig {
    /// Two RPC servers the light client verifies headers against.
    pub rpc_servers: [String; 2],
    pub trust_height: u64,
    pub trust_hash: String,
}

impl fmt::Display for StateSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rpc_servers = \"{}\"", self.rpc_servers.join(","))?;
        writeln!(f, "trust_height = {}", self.trust_height)?;
        writeln!(f, "trust_hash = \"{}\"", self.trust_hash)
    }
}

/// Errors that can occur while generating a state-sync config.
#[derive(Debug)]
pub enum StateSyncError {
    /// Fewer than two distinct RPC servers answered during the crawl.
    InsufficientRpcs { found: usize },
    /// The trusted block could not be fetched or decoded.
    BlockFetch { server: String, source: ClientError },
}

impl fmt::Display for StateSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSyncError::InsufficientRpcs { found } => write!(
                f,
                "State sync needs two successful RPC servers, the crawl found {found}"
            ),
            StateSyncError::BlockFetch { server, source } => {
                write!(f, "Failed to get recent block from {server}: {source}")
            }
        }
    }
}

impl Error for StateSyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StateSyncError::InsufficientRpcs { .. } => None,
            StateSyncError::BlockFetch { source, .. } => Some(source),
        }
    }
}

/// Pick two distinct RPC servers, a random one and the one after it.
///
/// Duplicates are dropped first, keeping the first occurrence, so the pair
/// never names the same server twice.
pub fn select_rpc_servers<R: Rng>(
    successful_rpcs: &[String],
    rng: &mut R,
) -> Result<[String; 2], StateSyncError> {
    let mut distinct: Vec<&String> = Vec::with_capacity(successful_rpcs.len());
    for rpc in successful_rpcs {
        if !distinct.contains(&rpc) {
            distinct.push(rpc);
        }
    }

    if distinct.len() < 2 {
        return Err(StateSyncError::InsufficientRpcs {
            found: distinct.len(),
        });
    }

    let pivot = rng.gen_range(0..distinct.len() - 1);
    Ok([distinct[pivot].clone(), distinct[pivot + 1].clone()])
}

/// Generate a state-sync config from the RPC servers a crawl found.
///
/// The trust anchor is the latest block of the first selected server.
///
/// # Arguments
///
/// * `prober` - Used to fetch the latest block.
/// * `successful_rpcs` - RPC base URLs that answered during the crawl.
///
/// # Returns
///
/// * `Ok(StateSyncConfig)` - The generated config.
/// * `Err(StateSyncError)` - Too few servers, or the block fetch failed.
pub async fn generate<P: Prober>(
    prober: &P,
    successful_rpcs: &[String],
) -> Result<StateSyncConfig, StateSyncError> {
    // ThreadRng is not Send, it must be gone before the first await.
    let rpc_servers = {
        let mut rng = rand::thread_rng();
        select_rpc_servers(successful_rpcs, &mut rng)?
    };
    debug!("Selected {} and {} for state sync", rpc_servers[0], rpc_servers[1]);

    let anchor = prober
        .latest_block(&rpc_servers[0])
        .await
        .map_err(|source| StateSyncError::BlockFetch {
            server: rpc_servers[0].clone(),
            source,
        })?;
    info!(
        "Trusting block {} at height {}",
        anchor.hash, anchor.height
    );

    Ok(StateSyncConfig {
        rpc_servers,
        trust_height: anchor.height,
        trust_hash: anchor.hash,
    })
}
