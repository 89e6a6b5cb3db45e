//! Pipeline transport types: decoded log entries, jobs, job results.

use std::collections::HashMap;

use alloy_primitives::{Address, B256};
use serde_json::Value;

use crate::db::schema::DomainObject;

/// A raw event log entry after [`crate::filter`] has decoded its ABI-typed arguments and
/// tagged it with the matching event name: a plain log plus a decoded-argument map and
/// a `name` string.
#[derive(Debug, Clone)]
pub struct ExtendedLogReceipt {
    pub address: Address,
    pub block_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
    pub removed: bool,
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
    /// ABI-decoded event arguments, keyed by parameter name.
    pub data_decoded: HashMap<String, Value>,
    pub name: String,
}

impl ExtendedLogReceipt {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.data_decoded.get(name)
    }
}

/// Metadata carried alongside a [`DataBundle`] for commit anchoring.
#[derive(Debug, Clone)]
pub struct BundleMeta {
    pub state_name: String,
    pub block_number: u64,
    pub block_hash: String,
}

/// The unit exchanged between scan/compute, workers, and the coordinator.
///
/// For index jobs, `objects` holds one `ExtendedLogReceipt` per log entry of a single
/// block; for process jobs it instead holds the `(a, b)` range for a stage invocation.
/// After a worker processes a bundle, the same structure carries back the produced
/// domain objects (one inner `Vec<DomainObject>` per input log/invocation), keeping
/// `meta` unchanged so the coordinator can anchor the commit.
#[derive(Debug, Clone)]
pub struct DataBundle<T> {
    pub objects: Vec<T>,
    pub meta: BundleMeta,
}

/// A bundle's worth of input entries for an indexer worker: all logs of one block.
pub type IndexBundleIn = DataBundle<ExtendedLogReceipt>;
/// A bundle's worth of output: one `Vec<DomainObject>` per input log entry.
pub type IndexBundleOut = DataBundle<Vec<DomainObject>>;

/// A single `(a, b)` block-range invocation of a named processor stage.
#[derive(Debug, Clone)]
pub struct ProcessRange {
    pub stage: String,
    pub a: i64,
    pub b: i64,
}

pub type ProcessBundleIn = DataBundle<ProcessRange>;
pub type ProcessBundleOut = DataBundle<Vec<DomainObject>>;

/// Submitted to the index-job queue; the unique, ascending `id` is used by the
/// coordinator to restore commit order.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub id: u64,
    pub data: Vec<DataBundle<T>>,
}

/// Returned from a worker; `id` always matches the originating `Job`.
#[derive(Debug, Clone)]
pub struct JobResult<T> {
    pub id: u64,
    pub data: Vec<DataBundle<Vec<T>>>,
}

pub type IndexJob = Job<ExtendedLogReceipt>;
pub type IndexJobResult = JobResult<DomainObject>;
pub type ProcessJob = Job<ProcessRange>;
pub type ProcessJobResult = JobResult<DomainObject>;
