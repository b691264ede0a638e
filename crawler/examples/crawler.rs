//! Example of using the tendermint-peers crawler.
//!
//! Every flag can also be set through its `TMD_*` environment variable.

use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;
use tendermint_peers_crawler::{CrawlerBuilder, CrawlerMessage, DiscoveryConfig};

const DEFAULT_CHAIN_ID: &str = "vega-mainnet-0011";
const DEFAULT_INITIAL_RPCS: &str = "http://165.232.126.207:26657,http://164.92.138.136:26657,http://185.246.86.71:26657,http://134.122.64.6:26657,http://39.59.237.19:26657";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The chain ID of the network for discovery.
    #[arg(long, env = "TMD_CHAIN_ID")]
    chain_id: Option<String>,

    /// A comma separated list of initial tendermint RPC addresses.
    #[arg(long, env = "TMD_INITIAL_RPCS")]
    initial_rpcs: Option<String>,

    /// Infer the chain ID from the peers of the initial RPCs.
    #[arg(long, env = "TMD_INFER_CHAIN_ID")]
    infer_chain_id: bool,

    /// Generate tendermint configuration for state sync.
    #[arg(long, env = "TMD_STATE_SYNC")]
    state_sync: bool,

    /// Skip probing the core API of each peer.
    #[arg(long)]
    no_core_api: bool,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn or_default(value: Option<String>, flag: &str, default: &str) -> String {
    match value.filter(|value| !value.is_empty()) {
        Some(value) => value,
        None => {
            log::info!("{flag} flag not set, using default {default}");
            default.to_string()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    // Configure fern logger
    if let Err(e) = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} - {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()
    {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    let config = DiscoveryConfig {
        core_api: !args.no_core_api,
        ..DiscoveryConfig::new(
            or_default(args.chain_id, "chain-id", DEFAULT_CHAIN_ID),
            &or_default(args.initial_rpcs, "initial-rpcs", DEFAULT_INITIAL_RPCS),
            args.infer_chain_id,
            args.state_sync,
        )
    };
    log::debug!("Resolved configuration: {config:?}");

    let crawler = match CrawlerBuilder::from_config(config).build() {
        Ok(crawler) => crawler,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut crawl_rx = match crawler.crawl().await {
        Ok(crawl_rx) => crawl_rx,
        Err(e) => {
            log::error!("Crawler error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut exit = ExitCode::SUCCESS;
    loop {
        tokio::select! {
            message = crawl_rx.recv() => match message {
                Some(message @ CrawlerMessage::Probed(_)) => log::debug!("{message}"),
                Some(message @ CrawlerMessage::Progress(_)) => println!("{message}"),
                Some(message @ CrawlerMessage::Complete(_)) => println!("{message}"),
                Some(CrawlerMessage::StateSync(Ok(config))) => {
                    println!("Statesync config:\n\n{config}");
                }
                Some(CrawlerMessage::StateSync(Err(e))) => {
                    log::error!("{e}");
                    exit = ExitCode::from(2);
                }
                Some(CrawlerMessage::Aborted(e)) => {
                    log::error!("{e}. Exiting.");
                    exit = ExitCode::FAILURE;
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                log::info!("Interrupted, exiting");
                break;
            }
        }
    }

    exit
}
