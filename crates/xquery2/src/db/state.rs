//! State store holding each named cursor's commit position.

use std::collections::HashMap;
use std::sync::RwLock;

use sqlx::PgConnection;

use super::schema::State;

/// Operations on the `state` table, fronted by a small process-local cache keyed by
/// cursor name so the coordinator doesn't round-trip to the database on every block.
pub struct StateStore {
    cache: RwLock<HashMap<String, State>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self { cache: RwLock::new(HashMap::new()) }
    }

    /// Read-through cache lookup. Callers that need a fresh row (e.g. after another
    /// process committed) should call [`Self::refresh`] first.
    pub async fn get(&self, conn: &mut PgConnection, name: &str) -> Result<Option<State>, sqlx::Error> {
        if let Some(state) = self.cache.read().unwrap().get(name) {
            return Ok(Some(state.clone()));
        }
        self.refresh(conn, name).await
    }

    /// Force a database read and repopulate the cache entry.
    pub async fn refresh(&self, conn: &mut PgConnection, name: &str) -> Result<Option<State>, sqlx::Error> {
        let row: Option<State> = sqlx::query_as("SELECT * FROM state WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(state) = &row {
            self.cache.write().unwrap().insert(name.to_string(), state.clone());
        }
        Ok(row)
    }

    /// Insert the cursor if absent, matching get-or-create semantics used at `setup()`.
    pub async fn get_or_create(&self, conn: &mut PgConnection, name: &str) -> Result<State, sqlx::Error> {
        if let Some(state) = self.get(conn, name).await? {
            return Ok(state);
        }

        let state: State = sqlx::query_as(
            "INSERT INTO state (name, block_number, block_hash, finalized, discarded)
             VALUES ($1, NULL, NULL, NULL, false)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING *",
        )
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

        self.cache.write().unwrap().insert(name.to_string(), state.clone());
        Ok(state)
    }

    /// Advance a cursor to `(block_number, block_hash)`. Must run inside the same
    /// transaction as the last `DataBundle`'s merges of the committing result.
    pub async fn advance(
        &self,
        conn: &mut PgConnection,
        name: &str,
        block_number: i64,
        block_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE state SET block_number = $2, block_hash = $3 WHERE name = $1",
        )
        .bind(name)
        .bind(block_number)
        .bind(block_hash)
        .execute(&mut *conn)
        .await?;

        if let Some(state) = self.cache.write().unwrap().get_mut(name) {
            state.block_number = Some(block_number);
            state.block_hash = Some(block_hash.to_string());
        }
        Ok(())
    }

    /// Mark the cursor as having undergone the restart-time rewind+discard so a
    /// second restart in the same process doesn't re-truncate.
    pub async fn mark_discarded(&self, conn: &mut PgConnection, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE state SET discarded = true WHERE name = $1")
            .bind(name)
            .execute(&mut *conn)
            .await?;

        if let Some(state) = self.cache.write().unwrap().get_mut(name) {
            state.discarded = true;
        }
        Ok(())
    }
}
