use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

/// Environment-backed runtime configuration.
///
/// Infrastructure and secrets come from the environment (env for anything operators
/// rotate or that differs per deployment); business/chain configuration comes from a
/// TOML file given on the command line.
#[derive(Debug, Parser)]
#[command(name = "xquery2", about = "Indexer and post-processor for Uniswap-v2-style exchanges")]
pub struct Arguments {
    /// JSON-RPC endpoint of the Ethereum-compatible node.
    #[arg(long, env = "API_URL")]
    pub api_url: url::Url,

    #[arg(long, env = "DB_DRIVER", default_value = "postgresql")]
    pub db_driver: String,
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,
    #[arg(long, env = "DB_USERNAME")]
    pub db_username: String,
    #[arg(long, env = "DB_PASSWORD")]
    pub db_password: String,
    #[arg(long, env = "DB_DATABASE")]
    pub db_database: String,
    #[arg(long, env = "DB_SCHEMA", default_value = "public")]
    pub db_schema: String,
    #[arg(long, env = "DB_DEBUG", default_value_t = false)]
    pub db_debug: bool,

    #[arg(long, env = "REDIS_HOST")]
    pub redis_host: Option<String>,
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,
    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,
    #[arg(long, env = "REDIS_DATABASE", default_value_t = 0)]
    pub redis_database: u32,

    /// Number of indexer/processor worker tasks. Defaults to the number of available cores.
    #[arg(long, env = "XQ_NUM_WORKERS")]
    pub num_workers: Option<usize>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Path to the exchange-specific TOML configuration (factory/router addresses, etc.)
    #[arg(long)]
    pub config: PathBuf,
}

impl Arguments {
    pub fn db_url(&self) -> String {
        crate::db::build_url(
            &self.db_driver,
            &self.db_host,
            self.db_port,
            &self.db_username,
            &self.db_password,
            &self.db_database,
        )
    }
}

/// Per-exchange business configuration, loaded from the `--config` TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub factory_address: String,
    pub router_address: String,
    pub start_block: u64,
    /// Number of blocks the scanner trails behind the chain tip.
    #[serde(default = "default_safety_blocks")]
    pub safety_blocks: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
    /// Seconds between successive scan+compute cycles.
    #[serde(default = "default_target_sleep")]
    pub target_sleep_seconds: u64,
    /// Deadline for `load_pair` polling before giving up on a pair becoming visible.
    #[serde(default = "default_pair_visibility_timeout")]
    pub pair_visibility_timeout_seconds: u64,
    /// Pairs the Bundle stage tracks for the weighted native price, and which
    /// side of their reserves is native-denominated.
    #[serde(default)]
    pub tracked_pairs: Vec<TrackedPairConfig>,
    /// Fallback native price used while every tracked pair still carries zero weight
    /// (e.g. before any of them has ever synced).
    #[serde(default = "default_native_price")]
    pub default_native_price: String,
    /// Chain-specific blocks at which the Bundle stage's tracked-pair set changes,
    /// each with the pair set active from that block onward.
    #[serde(default)]
    pub bundle_migrations: Vec<BundleMigrationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackedPairConfig {
    pub address: String,
    /// `true` if token1 is the native-denominated side of the pair's reserves.
    pub native_is_token1: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleMigrationConfig {
    pub at_block: i64,
    pub tracked_pairs: Vec<TrackedPairConfig>,
}

const fn default_safety_blocks() -> u64 {
    20
}

const fn default_chunk_size() -> u64 {
    512
}

const fn default_max_chunk_size() -> u64 {
    2048
}

const fn default_target_sleep() -> u64 {
    15
}

const fn default_pair_visibility_timeout() -> u64 {
    600
}

fn default_native_price() -> String {
    "0".to_string()
}

impl ChainConfig {
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
