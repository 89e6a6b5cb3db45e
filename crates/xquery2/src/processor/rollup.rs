//! Time-bucketed rollup stages: `PairHourData`/`PairDayData`, `TokenHourData`/
//! `TokenDayData`, `ExchangeDayData`.
//!
//! Each bucket is additive for volume/tx_count (summed across every Swap the range
//! touches) and a snapshot for reserves (the pair's current reserve at upsert time,
//! since a `Sync` always carries the latest reserve regardless of how old the bucket
//! it lands in is).

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num::Zero;
use sqlx::PgPool;

use super::Stage;
use crate::db::schema::{DomainObject, ExchangeDayData, Pair, PairDayData, PairHourData, TokenDayData, TokenHourData};
use crate::error::ProcessorError;

const HOUR_SECONDS: i64 = 3_600;
const DAY_SECONDS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Hour,
    Day,
}

impl Period {
    fn bucket_seconds(self) -> i64 {
        match self {
            Period::Hour => HOUR_SECONDS,
            Period::Day => DAY_SECONDS,
        }
    }

    fn index_of(self, timestamp: i64) -> i64 {
        timestamp / self.bucket_seconds()
    }

    fn start_of(self, index: i64) -> i64 {
        index * self.bucket_seconds()
    }
}

/// One pair's accumulated swap volume within a single bucket.
#[derive(Debug, Default, Clone)]
struct PairDelta {
    volume_token0: BigDecimal,
    volume_token1: BigDecimal,
    tx_count: i64,
}

/// Rolls `Swap` volume for every pair into `PairHourData`/`PairDayData` buckets.
pub struct PairRollupStage {
    pool: PgPool,
    period: Period,
}

impl PairRollupStage {
    pub fn new(pool: PgPool, period: Period) -> Self {
        Self { pool, period }
    }
}

#[async_trait]
impl Stage for PairRollupStage {
    fn name(&self) -> &str {
        match self.period {
            Period::Hour => "pair_hour_data",
            Period::Day => "pair_day_data",
        }
    }

    async fn process(&mut self, a: i64, b: i64) -> Result<Vec<DomainObject>, ProcessorError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            pair_address: String,
            amount0_in: BigDecimal,
            amount1_in: BigDecimal,
            amount0_out: BigDecimal,
            amount1_out: BigDecimal,
            timestamp: i64,
        }

        let rows = sqlx::query_as::<_, Row>(
            "SELECT s.pair_address, s.amount0_in, s.amount1_in, s.amount0_out, s.amount1_out, s.timestamp
             FROM swap s JOIN transaction t ON t.id = s.transaction_id JOIN block bl ON bl.id = t.block_id
             WHERE bl.number BETWEEN $1 AND $2",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;

        let mut deltas: std::collections::HashMap<(String, i64), PairDelta> = std::collections::HashMap::new();
        for row in rows {
            let index = self.period.index_of(row.timestamp);
            let delta = deltas.entry((row.pair_address, index)).or_default();
            delta.volume_token0 += &row.amount0_in + &row.amount0_out;
            delta.volume_token1 += &row.amount1_in + &row.amount1_out;
            delta.tx_count += 1;
        }

        let mut out = Vec::new();
        for ((pair_address, index), delta) in deltas {
            let pair = sqlx::query_as::<_, Pair>("SELECT * FROM pair WHERE address = $1")
                .bind(&pair_address)
                .fetch_one(&self.pool)
                .await?;

            let table = self.name();
            let existing_tx_count: Option<i64> = sqlx::query_scalar(&format!(
                "SELECT tx_count FROM {table} WHERE pair_address = $1 AND {col} = $2",
                col = if self.period == Period::Hour { "hour_index" } else { "day_index" }
            ))
            .bind(&pair_address)
            .bind(index)
            .fetch_optional(&self.pool)
            .await?;

            let base_tx_count = existing_tx_count.unwrap_or(0);

            match self.period {
                Period::Hour => out.push(DomainObject::PairHourData(PairHourData {
                    id: 0,
                    hour_index: index,
                    hour_start_unix: self.period.start_of(index),
                    pair_address: pair_address.clone(),
                    reserve0: pair.reserve0.clone(),
                    reserve1: pair.reserve1.clone(),
                    reserve_usd: pair.reserve_usd.clone(),
                    volume_token0: delta.volume_token0,
                    volume_token1: delta.volume_token1,
                    volume_usd: BigDecimal::zero(),
                    tx_count: base_tx_count + delta.tx_count,
                })),
                Period::Day => out.push(DomainObject::PairDayData(PairDayData {
                    id: 0,
                    day_index: index,
                    day_start_unix: self.period.start_of(index),
                    pair_address: pair_address.clone(),
                    reserve0: pair.reserve0.clone(),
                    reserve1: pair.reserve1.clone(),
                    reserve_usd: pair.reserve_usd.clone(),
                    volume_token0: delta.volume_token0,
                    volume_token1: delta.volume_token1,
                    volume_usd: BigDecimal::zero(),
                    tx_count: base_tx_count + delta.tx_count,
                })),
            }
        }

        Ok(out)
    }
}

/// Rolls `Swap` volume for every token into `TokenHourData`/`TokenDayData` buckets.
pub struct TokenRollupStage {
    pool: PgPool,
    period: Period,
}

impl TokenRollupStage {
    pub fn new(pool: PgPool, period: Period) -> Self {
        Self { pool, period }
    }
}

#[async_trait]
impl Stage for TokenRollupStage {
    fn name(&self) -> &str {
        match self.period {
            Period::Hour => "token_hour_data",
            Period::Day => "token_day_data",
        }
    }

    async fn process(&mut self, a: i64, b: i64) -> Result<Vec<DomainObject>, ProcessorError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            token_address: String,
            volume: BigDecimal,
            timestamp: i64,
        }

        let rows = sqlx::query_as::<_, Row>(
            "SELECT p.token0_address AS token_address, s.amount0_in + s.amount0_out AS volume, s.timestamp
             FROM swap s JOIN pair p ON p.address = s.pair_address
             JOIN transaction t ON t.id = s.transaction_id JOIN block bl ON bl.id = t.block_id
             WHERE bl.number BETWEEN $1 AND $2
             UNION ALL
             SELECT p.token1_address AS token_address, s.amount1_in + s.amount1_out AS volume, s.timestamp
             FROM swap s JOIN pair p ON p.address = s.pair_address
             JOIN transaction t ON t.id = s.transaction_id JOIN block bl ON bl.id = t.block_id
             WHERE bl.number BETWEEN $1 AND $2",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;

        let mut deltas: std::collections::HashMap<(String, i64), (BigDecimal, i64)> = std::collections::HashMap::new();
        for row in rows {
            let index = self.period.index_of(row.timestamp);
            let entry = deltas.entry((row.token_address, index)).or_insert_with(|| (BigDecimal::zero(), 0));
            entry.0 += row.volume;
            entry.1 += 1;
        }

        let mut out = Vec::new();
        for ((token_address, index), (volume, tx_count)) in deltas {
            match self.period {
                Period::Hour => out.push(DomainObject::TokenHourData(TokenHourData {
                    id: 0,
                    hour_index: index,
                    hour_start_unix: self.period.start_of(index),
                    token_address,
                    volume,
                    volume_usd: BigDecimal::zero(),
                    tx_count,
                })),
                Period::Day => out.push(DomainObject::TokenDayData(TokenDayData {
                    id: 0,
                    day_index: index,
                    day_start_unix: self.period.start_of(index),
                    token_address,
                    volume,
                    volume_usd: BigDecimal::zero(),
                    tx_count,
                })),
            }
        }

        Ok(out)
    }
}

/// Rolls the whole exchange's `Swap` volume and `Factory` liquidity into daily
/// `ExchangeDayData` buckets (day granularity only, matching the original's single
/// `ExchangeDayData` export).
pub struct ExchangeRollupStage {
    pool: PgPool,
    factory_address: String,
}

impl ExchangeRollupStage {
    pub fn new(pool: PgPool, factory_address: String) -> Self {
        Self { pool, factory_address }
    }
}

#[async_trait]
impl Stage for ExchangeRollupStage {
    fn name(&self) -> &str {
        "exchange_day_data"
    }

    async fn process(&mut self, a: i64, b: i64) -> Result<Vec<DomainObject>, ProcessorError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            timestamp: i64,
        }

        let rows = sqlx::query_as::<_, Row>(
            "SELECT s.timestamp FROM swap s JOIN transaction t ON t.id = s.transaction_id JOIN block bl ON bl.id = t.block_id
             WHERE bl.number BETWEEN $1 AND $2",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;

        let mut tx_counts: std::collections::HashMap<i64, i64> = std::collections::HashMap::new();
        for row in rows {
            let index = Period::Day.index_of(row.timestamp);
            *tx_counts.entry(index).or_insert(0) += 1;
        }

        let factory = sqlx::query_as::<_, crate::db::schema::Factory>("SELECT * FROM factory WHERE address = $1")
            .bind(&self.factory_address)
            .fetch_one(&self.pool)
            .await?;

        let mut out = Vec::new();
        for (index, tx_count) in tx_counts {
            out.push(DomainObject::ExchangeDayData(ExchangeDayData {
                id: 0,
                day_index: index,
                day_start_unix: Period::Day.start_of(index),
                volume_usd: BigDecimal::zero(),
                volume_native: BigDecimal::zero(),
                liquidity_usd: factory.total_liquidity_usd.clone(),
                tx_count,
            }));
        }

        Ok(out)
    }
}
