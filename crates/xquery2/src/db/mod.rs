pub mod merge;
pub mod repository;
pub mod schema;
pub mod state;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use schema::DomainObject;

/// Format the database connection string.
pub fn build_url(driver: &str, host: &str, port: u16, username: &str, password: &str, database: &str) -> String {
    format!("{driver}://{username}:{password}@{host}:{port}/{database}")
}

/// Thin wrapper around a `sqlx` pool; every worker and the coordinator hold one of
/// these.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    /// Acquires a Postgres advisory lock as the single-instance guard, replacing a
    /// filesystem PID-file lock with something that works the same way across
    /// multiple hosts.
    pub async fn try_acquire_instance_lock(&self, chain_id: u64) -> Result<bool, sqlx::Error> {
        let lock_key = chain_id as i64;
        let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .bind(lock_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(acquired)
    }
}
