//! Scan/compute orchestration loop.
//!
//! The controller is the only long-lived orchestrator: it owns the bounded queues,
//! spawns the indexer worker pool once for the process's lifetime, and drives
//! `scan`/`compute` in a loop, each call synchronously submitting a batch of jobs and
//! then waiting for the commit coordinator to drain them before returning: first
//! `index_jobs` drains, then `results`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::coordinator::CommitCoordinator;
use crate::db::schema::DomainObject;
use crate::db::state::StateStore;
use crate::db::Database;
use crate::error::RpcError;
use crate::filter::EventFilter;
use crate::indexer::ExchangeIndexer;
use crate::processor::Stage;
use crate::queue::{Queue, Terminate, QUEUE_CAPACITY};
use crate::rpc::RpcClient;
use crate::types::{BundleMeta, DataBundle, IndexJob, IndexJobResult, ProcessJob, ProcessJobResult, ProcessRange};
use crate::util::{batched, bundled, split_interval};

/// How many `DataBundle`s (one per block) are grouped into a single `Job`.
const INDEX_BUNDLES_PER_JOB: usize = 16;
/// Consecutive `eth_getLogs` retries before giving up on a chunk, halving the chunk
/// size each time.
const MAX_CHUNK_RETRIES: u32 = 5;
const CHUNK_RETRY_SLEEP: Duration = Duration::from_secs(3);

/// Factory for a fresh, independently-owned [`Stage`] instance, invoked once per
/// `compute()` pass for that stage (each processor worker needs its own mutable
/// `Stage`, matching "Processor worker instantiates a stage").
pub type StageFactory = Box<dyn Fn() -> Box<dyn Stage> + Send + Sync>;

pub struct StageSlot {
    pub name: String,
    /// `None` means the whole interval becomes a single job.
    pub batch_size: Option<i64>,
    pub factory: StageFactory,
}

/// Everything the controller needs to spin up an [`ExchangeIndexer`] per worker.
pub struct IndexerConfig {
    pub factory_address: alloy_primitives::Address,
    pub router_address: Option<alloy_primitives::Address>,
    pub pair_visibility_timeout: Duration,
}

pub struct Controller {
    db: Database,
    state: Arc<StateStore>,
    rpc: RpcClient,
    filter: Arc<dyn EventFilter>,
    indexer_config: IndexerConfig,
    terminate: Terminate,

    index_jobs: Arc<Queue<IndexJob>>,
    index_results: Arc<Queue<IndexJobResult>>,
    submitted_index: Arc<AtomicU64>,
    committed_index: Arc<AtomicU64>,
    index_coordinator: Mutex<CommitCoordinator>,
    worker_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,

    stages: Vec<StageSlot>,

    safety_blocks: i64,
    chunk_size: u64,
    max_chunk_size: u64,
}

impl Controller {
    /// Spawns `num_workers` long-lived [`crate::worker::IndexerWorker`] tasks and one
    /// commit coordinator for the `"indexer"` cursor. Both survive for the whole
    /// process lifetime; only `process_jobs`/`process_results` are recreated per
    /// stage invocation (see [`Self::compute`]).
    pub fn new(
        db: Database,
        state: Arc<StateStore>,
        rpc: RpcClient,
        filter: Arc<dyn EventFilter>,
        indexer_config: IndexerConfig,
        stages: Vec<StageSlot>,
        num_workers: usize,
        safety_blocks: i64,
        chunk_size: u64,
        max_chunk_size: u64,
        terminate: Terminate,
    ) -> Self {
        let index_jobs = Queue::new(QUEUE_CAPACITY);
        let index_results = Queue::new(QUEUE_CAPACITY);
        let submitted_index = Arc::new(AtomicU64::new(0));
        let committed_index = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(num_workers);
        for id in 0..num_workers.max(1) {
            let repo = Arc::new(crate::db::repository::Repository::new(db.pool.clone(), rpc.clone()));
            let indexer = ExchangeIndexer::new(repo, indexer_config.factory_address, indexer_config.router_address, indexer_config.pair_visibility_timeout);
            let worker = crate::worker::IndexerWorker {
                id,
                indexer,
                jobs: index_jobs.clone(),
                results: index_results.clone(),
                terminate: terminate.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        let index_coordinator =
            CommitCoordinator::new(db.clone(), state.clone(), index_results.clone(), terminate.clone(), 0);

        Self {
            db,
            state,
            rpc,
            filter,
            indexer_config,
            terminate,
            index_jobs,
            index_results,
            submitted_index,
            committed_index,
            index_coordinator: Mutex::new(index_coordinator),
            worker_handles: Mutex::new(handles),
            stages,
            safety_blocks,
            chunk_size,
            max_chunk_size,
        }
    }

    pub fn terminate_flag(&self) -> Terminate {
        self.terminate.clone()
    }

    async fn control_repo(&self) -> crate::db::repository::Repository {
        crate::db::repository::Repository::new(self.db.pool.clone(), self.rpc.clone())
    }

    /// Restart-safety rewind: truncates event rows newer than
    /// `state.block_number - safety_blocks` and rewinds the `indexer` cursor by the
    /// same amount, guarded by `State.discarded` so a second restart within the same
    /// process doesn't repeat it.
    pub async fn rewind_on_restart(&self) -> anyhow::Result<()> {
        let mut conn = self.db.pool.acquire().await?;
        let state = self.state.get_or_create(&mut conn, "indexer").await?;

        if state.discarded || state.block_number.is_none() {
            return Ok(());
        }

        let rewind_to = (state.block_number.unwrap() - self.safety_blocks).max(0);
        info!(from = state.block_number.unwrap(), to = rewind_to, "rewinding indexer cursor on restart");

        let mut tx = self.db.pool.begin().await?;
        for table in ["mint", "burn", "swap", "transfer", "sync", "pair"] {
            let sql = format!(
                "DELETE FROM {table} t USING transaction tx, block b
                 WHERE t.transaction_id = tx.id AND tx.block_id = b.id AND b.number > $1"
            );
            sqlx::query(&sql).bind(rewind_to).execute(&mut *tx).await?;
        }

        let anchor: Option<(i64, String)> =
            sqlx::query_as("SELECT number, hash FROM block WHERE number = $1").bind(rewind_to).fetch_optional(&mut *tx).await?;
        if let Some((number, hash)) = anchor {
            self.state.advance(&mut tx, "indexer", number, &hash).await?;
        }
        self.state.mark_discarded(&mut tx, "indexer").await?;
        tx.commit().await?;
        Ok(())
    }

    async fn wait_until_committed(&self, queue_kind: &str, committed: &AtomicU64, target: u64) -> anyhow::Result<()> {
        loop {
            if committed.load(Ordering::SeqCst) >= target {
                return Ok(());
            }
            if self.terminate.is_set() {
                anyhow::bail!("terminated while draining {queue_kind}");
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Default chunk-adaptation heuristic: empty ranges grow the chunk (up to
    /// `max_chunk_size`), dense ranges shrink it, anything in between is left
    /// unchanged.
    fn estimate_next_chunk_size(&self, current_chunk: u64, logs_in_range: usize, window: u64) -> u64 {
        if logs_in_range == 0 {
            return (current_chunk.saturating_mul(2)).min(self.max_chunk_size);
        }
        // "Dense": more than ~50 logs per block on average is unusually busy for a
        // single exchange's pair set; back off to avoid a string of 429s.
        if (logs_in_range as u64) > window.saturating_mul(50) {
            return (current_chunk / 2).max(1);
        }
        current_chunk
    }

    async fn fetch_logs_with_retry(&self, from: u64, chunk: &mut u64) -> anyhow::Result<Vec<crate::types::ExtendedLogReceipt>> {
        let mut attempt = 0u32;
        loop {
            match self.filter.get_logs(from, *chunk).await {
                Ok(logs) => return Ok(logs),
                Err(err) if attempt < MAX_CHUNK_RETRIES && err.is_transient() => {
                    attempt += 1;
                    *chunk = (*chunk / 2).max(1);
                    warn!(?err, attempt, new_chunk = *chunk, "eth_getLogs throttled, retrying with smaller chunk");
                    tokio::time::sleep(CHUNK_RETRY_SLEEP).await;
                }
                Err(err) => return Err(anyhow::Error::from(err)),
            }
        }
    }

    async fn submit_index_job(&self, data: Vec<DataBundle<crate::types::ExtendedLogReceipt>>) -> anyhow::Result<()> {
        let id = self.submitted_index.fetch_add(1, Ordering::SeqCst);
        let job = IndexJob { id, data };
        if !self.index_jobs.put(job, &self.terminate).await {
            anyhow::bail!("terminated while submitting index job");
        }
        crate::metrics::Metrics::get().index_jobs_submitted.inc();
        Ok(())
    }

    /// Scans `[start, end]` (end defaulting to the chain tip minus `safety_blocks`)
    /// and submits its logs as index jobs.
    pub async fn scan(&self, start: i64, end_param: Option<i64>) -> anyhow::Result<()> {
        let latest = self.rpc.block_number().await? as i64;
        let end = end_param.unwrap_or(latest).min(latest - self.safety_blocks);

        let mut conn = self.db.pool.acquire().await?;
        let state = self.state.get_or_create(&mut conn, "indexer").await?;
        drop(conn);

        if state.block_number.is_none() {
            self.setup_indexer_anchor(start).await?;
        }

        let mut conn = self.db.pool.acquire().await?;
        let state = self.state.refresh(&mut conn, "indexer").await?.expect("just created above");
        drop(conn);

        let mut current = start.max(state.block_number.map(|n| n + 1).unwrap_or(start));
        if current > end {
            info!(current, end, "scan range empty");
            return Ok(());
        }

        info!(current, end, "scan starting");

        let mut chunk = self.chunk_size;
        let mut pending: Vec<DataBundle<crate::types::ExtendedLogReceipt>> = Vec::new();
        let start_id = self.submitted_index.load(Ordering::SeqCst);

        while current <= end && !self.terminate.is_set() {
            let to = (current as u64 + chunk - 1).min(end as u64);
            let window = to - current as u64 + 1;

            let logs = self.fetch_logs_with_retry(current as u64, &mut chunk).await?;
            let logs_len = logs.len();
            for group in bundled(logs, |l| l.block_number) {
                let block_number = group[0].block_number;
                let block_hash = format!("{:#x}", group[0].block_hash);
                pending.push(DataBundle { objects: group, meta: BundleMeta { state_name: "indexer".into(), block_number, block_hash } });

                if pending.len() >= INDEX_BUNDLES_PER_JOB {
                    let batch = std::mem::take(&mut pending);
                    for chunked in batched(batch, INDEX_BUNDLES_PER_JOB) {
                        self.submit_index_job(chunked).await?;
                    }
                }
            }

            current = to as i64 + 1;
            chunk = self.estimate_next_chunk_size(chunk, logs_len, window);
            crate::metrics::Metrics::get().scan_chunk_size.set(chunk as i64);
        }

        if !pending.is_empty() {
            self.submit_index_job(pending).await?;
        }

        let submitted_total = self.submitted_index.load(Ordering::SeqCst);
        self.wait_until_committed("index_jobs", &self.committed_index, submitted_total).await?;

        let mut coordinator = self.index_coordinator.lock().await;
        coordinator.drain_until(submitted_total, &self.committed_index).await?;
        debug_assert!(submitted_total >= start_id);

        info!(committed = self.committed_index.load(Ordering::SeqCst), "scan drained");
        Ok(())
    }

    /// Materializes the anchor block just before `start` directly (an idempotent
    /// entity upsert, not a coordinator-owned write), then submits a pseudo job whose
    /// sole purpose is advancing the cursor to that anchor so
    /// `current = max(start, cursor+1)` resolves correctly on the first real scan.
    async fn setup_indexer_anchor(&self, start: i64) -> anyhow::Result<()> {
        let anchor_number = start.saturating_sub(1).max(0) as u64;
        let info = self
            .rpc
            .get_block_by_number(anchor_number)
            .await?
            .ok_or_else(|| RpcError::BlockNotFound(anchor_number.to_string()))?;

        let repo = self.control_repo().await;
        repo.get_or_create_block(info.hash).await?;

        let id = self.submitted_index.fetch_add(1, Ordering::SeqCst);
        let pseudo = IndexJobResult {
            id,
            data: vec![DataBundle {
                objects: vec![],
                meta: BundleMeta { state_name: "indexer".into(), block_number: info.number, block_hash: info.hash.to_string() },
            }],
        };
        if !self.index_results.put(pseudo, &self.terminate).await {
            anyhow::bail!("terminated while seeding indexer anchor");
        }

        self.wait_until_committed("indexer anchor", &self.committed_index, id + 1).await?;
        let mut coordinator = self.index_coordinator.lock().await;
        coordinator.drain_until(id + 1, &self.committed_index).await
    }

    /// Runs every configured post-processing stage over `[start, end]` in order,
    /// each stage's jobs fully drained before the next stage starts.
    pub async fn compute(&self, start: i64, end: i64) -> anyhow::Result<()> {
        for slot in &self.stages {
            if self.terminate.is_set() {
                return Ok(());
            }
            self.compute_stage(slot, start, end).await?;
        }
        Ok(())
    }

    async fn compute_stage(&self, slot: &StageSlot, start: i64, end: i64) -> anyhow::Result<()> {
        let cursor_name = format!("processor_{}", slot.name);
        let mut conn = self.db.pool.acquire().await?;
        let state = self.state.get_or_create(&mut conn, &cursor_name).await?;
        drop(conn);

        let local_terminate = Terminate::new();
        let jobs: Arc<Queue<ProcessJob>> = Queue::new(QUEUE_CAPACITY);
        let results: Arc<Queue<ProcessJobResult>> = Queue::new(QUEUE_CAPACITY);
        let mut stage = (slot.factory)();

        if state.block_number.is_none() {
            stage.setup(start).await?;
            let id = 0u64;
            let pseudo = ProcessJobResult {
                id,
                data: vec![DataBundle {
                    objects: vec![],
                    meta: BundleMeta { state_name: cursor_name.clone(), block_number: start - 1, block_hash: String::new() },
                }],
            };
            results.put(pseudo, &local_terminate).await;
            let committed = Arc::new(AtomicU64::new(0));
            let mut coordinator = CommitCoordinator::new(self.db.clone(), self.state.clone(), results.clone(), local_terminate.clone(), 0);
            coordinator.drain_until(1, &committed).await?;
        } else {
            stage.setup(start).await?;
        }

        let mut conn = self.db.pool.acquire().await?;
        let state = self.state.refresh(&mut conn, &cursor_name).await?.expect("just created above");
        drop(conn);

        let adjust_start = start.max(state.block_number.map(|n| n + 1).unwrap_or(start));
        if adjust_start > end {
            return Ok(());
        }

        let ranges: Vec<(i64, i64)> = match slot.batch_size {
            Some(bs) if bs > 0 => split_interval(adjust_start, end, &step_boundaries(adjust_start, end, bs)),
            _ => vec![(adjust_start, end)],
        };

        let worker = crate::worker::ProcessorWorker { id: 0, stage, jobs: jobs.clone(), results: results.clone(), terminate: local_terminate.clone() };
        let handle = tokio::spawn(worker.run());

        for (i, (a, b)) in ranges.iter().enumerate() {
            let job = ProcessJob {
                id: i as u64,
                data: vec![DataBundle {
                    objects: vec![ProcessRange { stage: slot.name.clone(), a: *a, b: *b }],
                    meta: BundleMeta { state_name: cursor_name.clone(), block_number: *b, block_hash: String::new() },
                }],
            };
            if !jobs.put(job, &self.terminate).await {
                local_terminate.set();
                let _ = handle.await;
                anyhow::bail!("terminated while submitting process job for stage {}", slot.name);
            }
            crate::metrics::Metrics::get().process_jobs_submitted.with_label_values(&[&slot.name]).inc();
        }

        let committed = Arc::new(AtomicU64::new(0));
        let mut coordinator = CommitCoordinator::new(self.db.clone(), self.state.clone(), results.clone(), local_terminate.clone(), 0);
        let drain_result = coordinator.drain_until(ranges.len() as u64, &committed).await;

        local_terminate.set();
        let _ = handle.await;

        drain_result.map_err(anyhow::Error::from)
    }

    /// Repeats `scan`+`compute`, sleeping the remainder of `target_sleep` with early
    /// wake on terminate.
    pub async fn run(&self, start: i64, target_sleep: Duration) -> anyhow::Result<()> {
        loop {
            if self.terminate.is_set() {
                return Ok(());
            }

            let cycle_start = tokio::time::Instant::now();
            self.scan(start, None).await?;

            let mut conn = self.db.pool.acquire().await?;
            let indexer_state = self.state.get(&mut conn, "indexer").await?;
            drop(conn);

            if let Some(indexer_state) = indexer_state {
                if let Some(block_number) = indexer_state.block_number {
                    self.compute(start, block_number).await?;
                }
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < target_sleep {
                let remaining = target_sleep - elapsed;
                tokio::select! {
                    _ = tokio::time::sleep(remaining) => {},
                    _ = Self::wait_for_terminate(&self.terminate) => {},
                }
            }
        }
    }

    async fn wait_for_terminate(terminate: &Terminate) {
        while !terminate.is_set() {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    /// Drains and joins the long-lived indexer worker pool; called on graceful
    /// shutdown after the terminate flag has been set. Workers finish their current
    /// job, then exit.
    pub async fn shutdown(&self) {
        self.terminate.set();
        let mut handles = self.worker_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
    }
}

/// Boundary values for `split_interval` that fall every `batch_size` blocks inside
/// `[a, b]`, used to realize evenly sized sub-intervals of `stage.batch_size`.
fn step_boundaries(a: i64, b: i64, batch_size: i64) -> Vec<i64> {
    let mut boundaries = Vec::new();
    let mut v = a + batch_size - 1;
    while v < b {
        boundaries.push(v);
        v += batch_size;
    }
    boundaries
}
