//! Block-range processor stages: post-indexing aggregation over already-committed rows.
//!
//! Unlike [`crate::indexer`], a stage never sees individual log entries: it is handed
//! a committed `[a, b]` block range and computes or aggregates directly over rows
//! already persisted by earlier stages, returning the rows it wants upserted.

pub mod bundle;
pub mod count;
pub mod rollup;

use async_trait::async_trait;

use crate::db::schema::DomainObject;
use crate::error::ProcessorError;

/// A named, resumable unit of post-indexing computation.
///
/// `setup` runs once before the first range a worker processes (loading whatever
/// state the stage needs to resume correctly, e.g. [`bundle::BundleStage`]'s initial
/// prices); `process` runs once per `[a, b]` range handed down by the controller.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn setup(&mut self, _start_block: i64) -> Result<(), ProcessorError> {
        Ok(())
    }

    async fn process(&mut self, a: i64, b: i64) -> Result<Vec<DomainObject>, ProcessorError>;
}
