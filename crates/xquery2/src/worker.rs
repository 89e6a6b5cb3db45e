//! Worker pool: indexer workers and processor-stage workers.
//!
//! Workers are modeled as long-lived `tokio` tasks rather than OS processes: each
//! owns its own RPC client, DB-backed repository/cache handles and indexer/stage
//! instance, giving each worker its own DB/cache/RPC handles without needing real
//! process isolation, since `sqlx`/`reqwest` handles are already `Clone` and safely
//! shared.

use std::sync::Arc;

use tracing::{error, warn};

use crate::db::schema::DomainObject;
use crate::indexer::ExchangeIndexer;
use crate::processor::Stage;
use crate::queue::{Queue, Terminate};
use crate::types::{DataBundle, ExtendedLogReceipt, IndexJob, IndexJobResult, ProcessJob, ProcessJobResult};

/// Executes `indexer.process(log)` for every log entry of every `DataBundle` in a
/// `Job`, in input order, preserving the job's `id` and each bundle's metadata so
/// the commit coordinator can anchor its output the same way as the input.
pub struct IndexerWorker {
    pub id: usize,
    pub indexer: ExchangeIndexer,
    pub jobs: Arc<Queue<IndexJob>>,
    pub results: Arc<Queue<IndexJobResult>>,
    pub terminate: Terminate,
}

impl IndexerWorker {
    /// Runs until the job queue closes or `terminate` fires. Any error from a single
    /// log entry sets the shared terminate flag and ends this worker's loop instead
    /// of unwinding across the task boundary.
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.get(&self.terminate).await {
            match self.process_job(job).await {
                Ok(result) => {
                    if !self.results.put(result, &self.terminate).await {
                        break;
                    }
                }
                Err(err) => {
                    error!(worker = self.id, ?err, "indexer worker failed, terminating");
                    self.terminate.set();
                    break;
                }
            }
        }
    }

    async fn process_job(&mut self, job: IndexJob) -> Result<IndexJobResult, crate::error::IndexerError> {
        self.indexer.reset();

        let mut out_bundles = Vec::with_capacity(job.data.len());
        for bundle in job.data {
            let DataBundle { objects: entries, meta } = bundle;
            let mut per_entry = Vec::with_capacity(entries.len());
            for entry in &entries {
                per_entry.push(self.process_entry(entry).await?);
            }
            out_bundles.push(DataBundle { objects: per_entry, meta });
        }

        self.indexer.reset();
        Ok(IndexJobResult { id: job.id, data: out_bundles })
    }

    async fn process_entry(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, crate::error::IndexerError> {
        match self.indexer.process(entry).await {
            Ok(objects) => Ok(objects),
            Err(crate::error::IndexerError::LogRemoved) => {
                // A removed=true log is a fatal assertion, not a recoverable
                // condition — surface it so the worker terminates.
                warn!(tx_hash = %entry.transaction_hash, "log.removed=true observed, aborting");
                Err(crate::error::IndexerError::LogRemoved)
            }
            Err(err) => Err(err),
        }
    }
}

/// Executes a single named [`Stage`] over the `(a, b)` ranges handed to it by the
/// controller's `compute` loop.
pub struct ProcessorWorker {
    pub id: usize,
    pub stage: Box<dyn Stage>,
    pub jobs: Arc<Queue<ProcessJob>>,
    pub results: Arc<Queue<ProcessJobResult>>,
    pub terminate: Terminate,
}

impl ProcessorWorker {
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.get(&self.terminate).await {
            match self.process_job(job).await {
                Ok(result) => {
                    if !self.results.put(result, &self.terminate).await {
                        break;
                    }
                }
                Err(err) => {
                    error!(worker = self.id, stage = self.stage.name(), ?err, "processor worker failed, terminating");
                    self.terminate.set();
                    break;
                }
            }
        }
    }

    async fn process_job(&mut self, job: ProcessJob) -> Result<ProcessJobResult, crate::error::ProcessorError> {
        let mut out_bundles = Vec::with_capacity(job.data.len());
        for bundle in job.data {
            let DataBundle { objects: ranges, meta } = bundle;
            let mut per_range = Vec::with_capacity(ranges.len());
            for range in &ranges {
                per_range.push(self.stage.process(range.a, range.b).await?);
            }
            out_bundles.push(DataBundle { objects: per_range, meta });
        }
        Ok(ProcessJobResult { id: job.id, data: out_bundles })
    }
}
