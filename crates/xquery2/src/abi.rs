//! Event topic-0 hashes and hand-rolled ABI decoding for the handful of event shapes
//! a Uniswap-v2-style pair and factory contract emit.
//!
//! Values are decoded directly from the 32-byte-word layout instead of going through
//! a codegen macro: every event here has a fixed, small, well-known shape, and the raw
//! layout is exactly what `filter::EventFilter` needs to tag `ExtendedLogReceipt`
//! entries with a `name` and a `data_decoded` map before indexing even starts.

use std::collections::HashMap;

use alloy_primitives::{keccak256, Address, B256, U256};
use serde_json::{json, Value};

/// keccak256 of an event's canonical Solidity signature, used as `topics[0]`.
pub fn topic0(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// The event shapes this crate decodes, plus their canonical signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PairCreated,
    Transfer,
    Mint,
    Burn,
    Swap,
    Sync,
}

impl EventKind {
    pub const ALL: [EventKind; 6] =
        [Self::PairCreated, Self::Transfer, Self::Mint, Self::Burn, Self::Swap, Self::Sync];

    pub fn name(self) -> &'static str {
        match self {
            Self::PairCreated => "PairCreated",
            Self::Transfer => "Transfer",
            Self::Mint => "Mint",
            Self::Burn => "Burn",
            Self::Swap => "Swap",
            Self::Sync => "Sync",
        }
    }

    /// Canonical signature as it appears on the factory/pair contract, used to derive
    /// `topic0`.
    pub fn signature(self) -> &'static str {
        match self {
            Self::PairCreated => "PairCreated(address,address,address,uint256)",
            Self::Transfer => "Transfer(address,address,uint256)",
            Self::Mint => "Mint(address,uint256,uint256)",
            Self::Burn => "Burn(address,uint256,uint256,address)",
            Self::Swap => "Swap(address,uint256,uint256,uint256,uint256,address)",
            Self::Sync => "Sync(uint112,uint112)",
        }
    }

    pub fn topic0(self) -> B256 {
        topic0(self.signature())
    }
}

/// Split ABI-encoded `data` into 32-byte words.
fn words(data: &[u8]) -> Vec<[u8; 32]> {
    data.chunks(32)
        .filter(|c| c.len() == 32)
        .map(|c| {
            let mut w = [0u8; 32];
            w.copy_from_slice(c);
            w
        })
        .collect()
}

fn word_address(word: &[u8; 32]) -> Address {
    Address::from_slice(&word[12..32])
}

fn word_u256(word: &[u8; 32]) -> U256 {
    U256::from_be_bytes(*word)
}

fn topic_address(topic: &B256) -> Address {
    Address::from_slice(&topic.0[12..32])
}

/// Decode `data`/`topics` for `kind` into a name→value map keyed by event parameter
/// name, ready for `ExtendedLogReceipt::arg`.
pub fn decode(kind: EventKind, topics: &[B256], data: &[u8]) -> HashMap<String, Value> {
    let w = words(data);
    let mut out = HashMap::new();

    match kind {
        EventKind::PairCreated => {
            if topics.len() >= 3 {
                out.insert("token0".into(), json!(topic_address(&topics[1]).to_string()));
                out.insert("token1".into(), json!(topic_address(&topics[2]).to_string()));
            }
            if let Some(word) = w.first() {
                out.insert("pair".into(), json!(word_address(word).to_string()));
            }
        }
        EventKind::Transfer => {
            if topics.len() >= 3 {
                out.insert("from".into(), json!(topic_address(&topics[1]).to_string()));
                out.insert("to".into(), json!(topic_address(&topics[2]).to_string()));
            }
            if let Some(word) = w.first() {
                out.insert("value".into(), json!(word_u256(word).to_string()));
            }
        }
        EventKind::Mint => {
            if topics.len() >= 2 {
                out.insert("sender".into(), json!(topic_address(&topics[1]).to_string()));
            }
            if let [amount0, amount1, ..] = w.as_slice() {
                out.insert("amount0".into(), json!(word_u256(amount0).to_string()));
                out.insert("amount1".into(), json!(word_u256(amount1).to_string()));
            }
        }
        EventKind::Burn => {
            if topics.len() >= 3 {
                out.insert("sender".into(), json!(topic_address(&topics[1]).to_string()));
                out.insert("to".into(), json!(topic_address(&topics[2]).to_string()));
            }
            if let [amount0, amount1, ..] = w.as_slice() {
                out.insert("amount0".into(), json!(word_u256(amount0).to_string()));
                out.insert("amount1".into(), json!(word_u256(amount1).to_string()));
            }
        }
        EventKind::Swap => {
            if topics.len() >= 3 {
                out.insert("sender".into(), json!(topic_address(&topics[1]).to_string()));
                out.insert("to".into(), json!(topic_address(&topics[2]).to_string()));
            }
            if let [a0in, a1in, a0out, a1out, ..] = w.as_slice() {
                out.insert("amount0In".into(), json!(word_u256(a0in).to_string()));
                out.insert("amount1In".into(), json!(word_u256(a1in).to_string()));
                out.insert("amount0Out".into(), json!(word_u256(a0out).to_string()));
                out.insert("amount1Out".into(), json!(word_u256(a1out).to_string()));
            }
        }
        EventKind::Sync => {
            if let [reserve0, reserve1, ..] = w.as_slice() {
                out.insert("reserve0".into(), json!(word_u256(reserve0).to_string()));
                out.insert("reserve1".into(), json!(word_u256(reserve1).to_string()));
            }
        }
    }

    out
}

/// Look up an `EventKind` by its `topic0`, the table `EventFilter` builds once at
/// construction.
pub fn kind_by_topic0(topic: B256) -> Option<EventKind> {
    EventKind::ALL.into_iter().find(|k| k.topic0() == topic)
}

/// ERC20 function selectors used for token metadata, `keccak256(sig)[..4]`.
pub mod rc20 {
    use super::keccak256;

    pub fn selector(signature: &str) -> [u8; 4] {
        let hash = keccak256(signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn symbol_string() -> [u8; 4] {
        selector("symbol()")
    }
    pub fn name_string() -> [u8; 4] {
        selector("name()")
    }
    pub fn decimals() -> [u8; 4] {
        selector("decimals()")
    }
    pub fn total_supply() -> [u8; 4] {
        selector("totalSupply()")
    }
}
