//! Event filter: builds `eth_getLogs` queries and decodes the results into
//! [`ExtendedLogReceipt`]s.
//!
//! `get_logs` returns a lazy, ordered, finite sequence of [`ExtendedLogReceipt`]s: it
//! issues `eth_getLogs` for newly created pairs first (growing the tracked-pair set),
//! then for all tracked pairs' configured events, unions and dedups the two result
//! sets, sorts by `(blockNumber, logIndex)` and attaches the decoded args + name.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde_json::Value;

use crate::abi::{decode, kind_by_topic0, EventKind};
use crate::error::RpcError;
use crate::rpc::RpcClient;
use crate::types::ExtendedLogReceipt;

#[async_trait]
pub trait EventFilter: Send + Sync {
    async fn get_logs(&self, from_block: u64, chunk_size: u64) -> Result<Vec<ExtendedLogReceipt>, RpcError>;

    /// Pair addresses discovered so far via `PairCreated` (used to seed
    /// `setup`/restart and exposed for diagnostics).
    fn tracked_pairs(&self) -> Vec<Address>;
}

fn decode_log(raw: &Value, kind: EventKind) -> Option<ExtendedLogReceipt> {
    let address: Address = raw["address"].as_str()?.parse().ok()?;
    let block_hash = raw["blockHash"].as_str()?.parse().ok()?;
    let block_number = u64::from_str_radix(raw["blockNumber"].as_str()?.trim_start_matches("0x"), 16).ok()?;
    let log_index = u64::from_str_radix(raw["logIndex"].as_str()?.trim_start_matches("0x"), 16).ok()?;
    let removed = raw["removed"].as_bool().unwrap_or(false);
    let transaction_hash = raw["transactionHash"].as_str()?.parse().ok()?;
    let transaction_index =
        u64::from_str_radix(raw["transactionIndex"].as_str()?.trim_start_matches("0x"), 16).ok()?;
    let topics: Vec<_> = raw["topics"].as_array()?.iter().filter_map(|t| t.as_str()?.parse().ok()).collect();
    let data_hex = raw["data"].as_str()?.trim_start_matches("0x");
    let data = hex::decode(data_hex).ok()?;

    let data_decoded = decode(kind, &topics, &data);

    Some(ExtendedLogReceipt {
        address,
        block_hash,
        block_number,
        log_index,
        removed,
        transaction_hash,
        transaction_index,
        topics,
        data,
        data_decoded,
        name: kind.name().to_string(),
    })
}

/// Sort by `(blockNumber, logIndex)` and drop exact duplicates.
fn sort_and_dedup(mut logs: Vec<ExtendedLogReceipt>) -> Vec<ExtendedLogReceipt> {
    logs.sort_by_key(|l| (l.block_number, l.log_index));
    logs.dedup_by_key(|l| (l.block_number, l.log_index, l.address));
    logs
}

/// Primary exchange filter: a factory contract plus the events emitted by every pair
/// it has created so far.
pub struct ExchangeFilter {
    rpc: RpcClient,
    factory_address: Address,
    pair_events: Vec<EventKind>,
    tracked_pairs: RwLock<HashSet<Address>>,
}

impl ExchangeFilter {
    pub fn new(rpc: RpcClient, factory_address: Address, pair_events: Vec<EventKind>, seed_pairs: Vec<Address>) -> Self {
        Self { rpc, factory_address, pair_events, tracked_pairs: RwLock::new(seed_pairs.into_iter().collect()) }
    }
}

#[async_trait]
impl EventFilter for ExchangeFilter {
    async fn get_logs(&self, from_block: u64, chunk_size: u64) -> Result<Vec<ExtendedLogReceipt>, RpcError> {
        assert!(chunk_size > 0);
        let to_block = from_block + chunk_size - 1;

        let mut logs = Vec::new();

        let pair_created_topic = EventKind::PairCreated.topic0();
        let raw_created =
            self.rpc.get_logs(from_block, to_block, Some(&[self.factory_address]), &[pair_created_topic]).await?;
        for raw in &raw_created {
            if let Some(entry) = decode_log(raw, EventKind::PairCreated) {
                if let Some(pair) = entry.data_decoded.get("pair").and_then(|v| v.as_str()).and_then(|s| s.parse::<Address>().ok()) {
                    self.tracked_pairs.write().unwrap().insert(pair);
                }
                logs.push(entry);
            }
        }

        let tracked: Vec<Address> = self.tracked_pairs.read().unwrap().iter().copied().collect();
        if !tracked.is_empty() {
            let topics: Vec<_> = self.pair_events.iter().map(|k| k.topic0()).collect();
            let raw_pair = self.rpc.get_logs(from_block, to_block, Some(&tracked), &topics).await?;
            for raw in &raw_pair {
                let topic0 = raw["topics"].as_array().and_then(|t| t.first()).and_then(|t| t.as_str()).and_then(|s| s.parse().ok());
                if let Some(kind) = topic0.and_then(kind_by_topic0) {
                    if let Some(entry) = decode_log(raw, kind) {
                        logs.push(entry);
                    }
                }
            }
        }

        Ok(sort_and_dedup(logs))
    }

    fn tracked_pairs(&self) -> Vec<Address> {
        self.tracked_pairs.read().unwrap().iter().copied().collect()
    }
}

/// Legacy router-style filter: captures events by router address appearing in either
/// `topics[1]` or `topics[2]`, unioning both queries.
pub struct RouterFilter {
    rpc: RpcClient,
    router_address: Address,
    events: Vec<EventKind>,
}

impl RouterFilter {
    pub fn new(rpc: RpcClient, router_address: Address, events: Vec<EventKind>) -> Self {
        Self { rpc, router_address, events }
    }

    fn router_topic(&self) -> alloy_primitives::B256 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(self.router_address.as_slice());
        alloy_primitives::B256::from(word)
    }
}

#[async_trait]
impl EventFilter for RouterFilter {
    async fn get_logs(&self, from_block: u64, chunk_size: u64) -> Result<Vec<ExtendedLogReceipt>, RpcError> {
        assert!(chunk_size > 0);
        let to_block = from_block + chunk_size - 1;
        let event_topics: Vec<_> = self.events.iter().map(|k| k.topic0()).collect();
        let router_topic = self.router_topic();

        let mut by_key: BTreeMap<(u64, u64), ExtendedLogReceipt> = BTreeMap::new();

        for raw in self.raw_logs_with_router_at(from_block, to_block, &event_topics, &router_topic, true).await? {
            let topic0 = raw["topics"].as_array().and_then(|t| t.first()).and_then(|t| t.as_str()).and_then(|s| s.parse().ok());
            if let Some(kind) = topic0.and_then(kind_by_topic0) {
                if let Some(entry) = decode_log(&raw, kind) {
                    by_key.insert((entry.block_number, entry.log_index), entry);
                }
            }
        }
        for raw in self.raw_logs_with_router_at(from_block, to_block, &event_topics, &router_topic, false).await? {
            let topic0 = raw["topics"].as_array().and_then(|t| t.first()).and_then(|t| t.as_str()).and_then(|s| s.parse().ok());
            if let Some(kind) = topic0.and_then(kind_by_topic0) {
                if let Some(entry) = decode_log(&raw, kind) {
                    by_key.insert((entry.block_number, entry.log_index), entry);
                }
            }
        }

        Ok(sort_and_dedup(by_key.into_values().collect()))
    }

    fn tracked_pairs(&self) -> Vec<Address> {
        Vec::new()
    }
}

impl RouterFilter {
    /// Fetch logs whose topic list places the router address at `topics[1]` (from-side,
    /// `at_topic1=true`) or `topics[2]` (to-side).
    async fn raw_logs_with_router_at(
        &self,
        from_block: u64,
        to_block: u64,
        event_topics: &[alloy_primitives::B256],
        router_topic: &alloy_primitives::B256,
        at_topic1: bool,
    ) -> Result<Vec<Value>, RpcError> {
        // The underlying RPC client's `get_logs` only supports a flat topic list
        // (position 0), so the positional router match is expressed as a raw call.
        let mut params = serde_json::Map::new();
        params.insert("fromBlock".into(), serde_json::json!(format!("0x{from_block:x}")));
        params.insert("toBlock".into(), serde_json::json!(format!("0x{to_block:x}")));

        let event_topic_values: Vec<Value> = event_topics.iter().map(|t| serde_json::json!(t.to_string())).collect();
        let topics = if at_topic1 {
            serde_json::json!([event_topic_values, router_topic.to_string()])
        } else {
            serde_json::json!([event_topic_values, Value::Null, router_topic.to_string()])
        };
        params.insert("topics".into(), topics);

        let result = self.rpc.call("eth_getLogs", serde_json::json!([Value::Object(params)])).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }
}
