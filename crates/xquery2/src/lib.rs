//! Indexer and post-processor for Uniswap-v2-style decentralized exchanges.
//!
//! Events are scanned off-chain, correlated into Mint/Burn/Swap/Transfer/Sync rows by
//! a pool of indexer workers, committed to Postgres in block order by a single
//! coordinator, and then rolled up by a second pool of post-processing workers into
//! hourly/daily aggregates and a weighted native-currency price series.

pub mod abi;
pub mod cache;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod db;
pub mod decimal;
pub mod error;
pub mod filter;
pub mod indexer;
pub mod metrics;
pub mod processor;
pub mod queue;
pub mod rpc;
pub mod types;
pub mod util;
pub mod worker;
