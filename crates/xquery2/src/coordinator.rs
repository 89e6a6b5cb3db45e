//! Single-consumer commit coordinator.
//!
//! The only component that writes to event tables or `state`. Its entire job is
//! restoring total order over results that may arrive out of order from a pool of
//! concurrent workers, then committing each in one transaction per block so a crash
//! mid-stream leaves a clean prefix.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::db::schema::DomainObject;
use crate::db::state::StateStore;
use crate::db::Database;
use crate::error::CoordinatorError;
use crate::queue::{Queue, Terminate};
use crate::types::{DataBundle, JobResult};

/// Upper bound on the number of not-yet-committable results held in memory at once.
/// Exceeding it means some worker never produced the job the coordinator is still
/// waiting on — a lost job, always fatal.
pub const MAX_RESULT_STORAGE_SIZE: usize = 1000;

/// How many consecutive 1-second polls of the results queue the coordinator makes
/// before re-checking its overall termination condition.
const POLL_ROUNDS: u32 = 20;
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

pub struct CommitCoordinator {
    db: Database,
    state: Arc<StateStore>,
    queue: Arc<Queue<JobResult<DomainObject>>>,
    terminate: Terminate,
    next_id: u64,
    buffer: BTreeMap<u64, JobResult<DomainObject>>,
}

impl CommitCoordinator {
    pub fn new(db: Database, state: Arc<StateStore>, queue: Arc<Queue<JobResult<DomainObject>>>, terminate: Terminate, start_id: u64) -> Self {
        Self { db, state, queue, terminate, next_id: start_id, buffer: BTreeMap::new() }
    }

    /// The id of the next job this coordinator expects to commit; callers use this to
    /// number the jobs they submit.
    pub fn next_job_id(&self) -> u64 {
        self.next_id
    }

    /// Commit results until `self.next_id` reaches `expected_next_id`, or until
    /// `terminate` fires. Mirrors the controller's "wait for results to drain" step
    /// after a batch of jobs has been submitted.
    pub async fn drain_until(&mut self, expected_next_id: u64, committed: &AtomicU64) -> Result<(), CoordinatorError> {
        loop {
            self.drain_contiguous_prefix(committed).await?;

            if self.next_id >= expected_next_id {
                return Ok(());
            }

            if self.terminate.is_set() {
                return self.finish_on_terminate();
            }

            let mut received_any = false;
            for _ in 0..POLL_ROUNDS {
                if self.terminate.is_set() {
                    break;
                }
                let Some(result) = self.queue.get_timeout(POLL_TIMEOUT).await else { continue };
                received_any = true;
                self.accept(result)?;
                if self.next_id >= expected_next_id || self.buffer.contains_key(&self.next_id) {
                    break;
                }
            }

            if !received_any && self.terminate.is_set() {
                return self.finish_on_terminate();
            }
        }
    }

    /// Insert a freshly received result into the reorder buffer, committing it
    /// immediately if it happens to be exactly the next expected id.
    fn accept(&mut self, result: JobResult<DomainObject>) -> Result<(), CoordinatorError> {
        if self.buffer.len() >= MAX_RESULT_STORAGE_SIZE && !self.buffer.contains_key(&result.id) {
            self.terminate.set();
            return Err(CoordinatorError::ReorderBufferOverflow(MAX_RESULT_STORAGE_SIZE));
        }
        self.buffer.insert(result.id, result);
        Ok(())
    }

    async fn drain_contiguous_prefix(&mut self, committed: &AtomicU64) -> Result<(), CoordinatorError> {
        while let Some(result) = self.buffer.remove(&self.next_id) {
            self.commit(result).await?;
            self.next_id += 1;
            committed.fetch_add(1, Ordering::SeqCst);
            crate::metrics::Metrics::get().reorder_buffer_size.set(self.buffer.len() as i64);
        }
        Ok(())
    }

    /// Sanity-check required at shutdown: an empty buffer means every submitted job
    /// that will ever arrive has been committed; a non-empty one means a worker
    /// crashed mid-job and its result is gone for good.
    fn finish_on_terminate(&self) -> Result<(), CoordinatorError> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(CoordinatorError::ReorderBufferOverflow(self.buffer.len()))
        }
    }

    /// One transaction per `DataBundle`; the last bundle's transaction also advances
    /// the named cursor, so a crash between bundles leaves the cursor pointing at the
    /// highest fully committed block.
    async fn commit(&mut self, result: JobResult<DomainObject>) -> Result<(), CoordinatorError> {
        let total = result.data.len();
        for (i, bundle) in result.data.into_iter().enumerate() {
            self.commit_bundle(bundle, i + 1 == total).await?;
        }
        debug!(job_id = result.id, bundles = total, "committed job");
        Ok(())
    }

    async fn commit_bundle(&mut self, bundle: DataBundle<Vec<DomainObject>>, is_last: bool) -> Result<(), CoordinatorError> {
        let mut tx = self.db.pool.begin().await?;

        let objects: Vec<DomainObject> = bundle.objects.into_iter().flatten().collect();
        crate::db::merge::merge(&mut tx, &objects).await?;

        if is_last {
            self.state
                .advance(&mut tx, &bundle.meta.state_name, bundle.meta.block_number as i64, &bundle.meta.block_hash)
                .await?;
            info!(
                cursor = %bundle.meta.state_name,
                block_number = bundle.meta.block_number,
                "advanced cursor"
            );
            if bundle.meta.state_name == "indexer" {
                crate::metrics::Metrics::get().index_jobs_committed.inc();
            } else {
                crate::metrics::Metrics::get()
                    .process_jobs_committed
                    .with_label_values(&[&bundle.meta.state_name])
                    .inc();
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Background task entry point: runs [`CommitCoordinator::drain_until`] forever in
/// lock-step with the controller's submitted-job counter, exiting once terminated
/// and every submitted job has been committed.
pub async fn run(mut coordinator: CommitCoordinator, submitted: Arc<AtomicU64>, committed: Arc<AtomicU64>, terminate: Terminate) -> Result<(), CoordinatorError> {
    loop {
        let target = submitted.load(Ordering::SeqCst);
        if let Err(err) = coordinator.drain_until(target, &committed).await {
            warn!(?err, "commit coordinator terminating");
            terminate.set();
            return Err(err);
        }

        if terminate.is_set() && committed.load(Ordering::SeqCst) >= submitted.load(Ordering::SeqCst) {
            return Ok(());
        }
        if terminate.is_set() {
            continue;
        }
        // Nothing left to do until the controller submits more jobs; yield briefly.
        tokio::task::yield_now().await;
        if committed.load(Ordering::SeqCst) >= submitted.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
