//! Tx-count/volume aggregation stage.
//!
//! Runs as a single invocation over the whole `[a, b]` range handed to it (the
//! original never sub-batches this stage, since every aggregate query already scans
//! the full range in one pass): one `COUNT`/`SUM` pass per entity kind (Factory,
//! Pair, Token), each producing an updated row with its running totals.

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num::Zero;
use sqlx::PgPool;

use super::Stage;
use crate::db::schema::{DomainObject, Factory, LiquidityPosition, Pair, Token};
use crate::error::ProcessorError;

pub struct CountStage {
    pool: PgPool,
    factory_address: String,
}

impl CountStage {
    pub fn new(pool: PgPool, factory_address: String) -> Self {
        Self { pool, factory_address }
    }

    async fn aggregate_factory(&self, a: i64, b: i64) -> Result<Factory, ProcessorError> {
        let mut factory = sqlx::query_as::<_, Factory>("SELECT * FROM factory WHERE address = $1")
            .bind(&self.factory_address)
            .fetch_one(&self.pool)
            .await?;

        let pair_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pair p JOIN block bl ON bl.id = p.block_id WHERE bl.number BETWEEN $1 AND $2",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        let mint_count: i64 = count_in_range(&self.pool, "mint", a, b).await?;
        let burn_count: i64 = count_in_range(&self.pool, "burn", a, b).await?;
        let swap_count: i64 = count_in_range(&self.pool, "swap", a, b).await?;

        factory.pair_count += pair_count;
        factory.tx_count += mint_count + burn_count + swap_count;
        Ok(factory)
    }

    async fn aggregate_pairs(&self, a: i64, b: i64) -> Result<Vec<Pair>, ProcessorError> {
        let pairs = sqlx::query_as::<_, Pair>("SELECT * FROM pair").fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(pairs.len());

        for mut pair in pairs {
            let (mint_count, mint_liquidity, mint_fee_liquidity): (i64, Option<BigDecimal>, Option<BigDecimal>) = sqlx::query_as(
                "SELECT COUNT(*), SUM(m.liquidity), SUM(m.fee_liquidity)
                 FROM mint m JOIN transaction t ON t.id = m.transaction_id JOIN block bl ON bl.id = t.block_id
                 WHERE m.pair_address = $1 AND bl.number BETWEEN $2 AND $3",
            )
            .bind(&pair.address)
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await?;

            let (burn_count, burn_liquidity, burn_fee_liquidity): (i64, Option<BigDecimal>, Option<BigDecimal>) = sqlx::query_as(
                "SELECT COUNT(*), SUM(b.liquidity), SUM(b.fee_liquidity)
                 FROM burn b JOIN transaction t ON t.id = b.transaction_id JOIN block bl ON bl.id = t.block_id
                 WHERE b.pair_address = $1 AND bl.number BETWEEN $2 AND $3",
            )
            .bind(&pair.address)
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await?;

            let (swap_count, swap_vol0, swap_vol1): (i64, Option<BigDecimal>, Option<BigDecimal>) = sqlx::query_as(
                "SELECT COUNT(*), SUM(s.amount0_in + s.amount0_out), SUM(s.amount1_in + s.amount1_out)
                 FROM swap s JOIN transaction t ON t.id = s.transaction_id JOIN block bl ON bl.id = t.block_id
                 WHERE s.pair_address = $1 AND bl.number BETWEEN $2 AND $3",
            )
            .bind(&pair.address)
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await?;

            pair.tx_count += mint_count + burn_count + swap_count;
            pair.total_supply = &pair.total_supply + &mint_liquidity.unwrap_or_else(BigDecimal::zero)
                + &mint_fee_liquidity.unwrap_or_else(BigDecimal::zero)
                - &burn_liquidity.unwrap_or_else(BigDecimal::zero)
                + &burn_fee_liquidity.unwrap_or_else(BigDecimal::zero);
            pair.volume_token0 = &pair.volume_token0 + &swap_vol0.unwrap_or_else(BigDecimal::zero);
            pair.volume_token1 = &pair.volume_token1 + &swap_vol1.unwrap_or_else(BigDecimal::zero);

            if pair.total_supply < BigDecimal::zero() {
                return Err(ProcessorError::NegativeAggregate(format!("pair {} total_supply", pair.address)));
            }

            out.push(pair);
        }

        Ok(out)
    }

    /// Liquidity-provider balance deltas over `[a, b]`: `Transfer` moves LP tokens
    /// between two users directly; `Mint`/`Burn` move them between the zero address
    /// and a user (plus any protocol-fee leg), which the indexer already resolved
    /// into `to_address`/`sender`/`fee_to`.
    async fn aggregate_liquidity_positions(&self, a: i64, b: i64) -> Result<Vec<LiquidityPosition>, ProcessorError> {
        let mut deltas: HashMap<(String, String), BigDecimal> = HashMap::new();
        let bump = |deltas: &mut HashMap<(String, String), BigDecimal>, user: &str, pair: &str, amount: &BigDecimal| {
            *deltas.entry((user.to_string(), pair.to_string())).or_insert_with(BigDecimal::zero) += amount;
        };

        let transfers: Vec<(String, String, String, BigDecimal)> = sqlx::query_as(
            "SELECT tr.from_address, tr.to_address, tr.pair_address, tr.value
             FROM transfer tr JOIN transaction t ON t.id = tr.transaction_id JOIN block bl ON bl.id = t.block_id
             WHERE bl.number BETWEEN $1 AND $2",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;
        for (from, to, pair, value) in transfers {
            bump(&mut deltas, &from, &pair, &(-&value));
            bump(&mut deltas, &to, &pair, &value);
        }

        let mints: Vec<(String, String, BigDecimal, Option<String>, Option<BigDecimal>)> = sqlx::query_as(
            "SELECT m.to_address, m.pair_address, m.liquidity, m.fee_to, m.fee_liquidity
             FROM mint m JOIN transaction t ON t.id = m.transaction_id JOIN block bl ON bl.id = t.block_id
             WHERE bl.number BETWEEN $1 AND $2",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;
        for (to, pair, liquidity, fee_to, fee_liquidity) in mints {
            bump(&mut deltas, &to, &pair, &liquidity);
            if let (Some(fee_to), Some(fee_liquidity)) = (fee_to, fee_liquidity) {
                bump(&mut deltas, &fee_to, &pair, &fee_liquidity);
            }
        }

        let burns: Vec<(Option<String>, String, BigDecimal, Option<String>, Option<BigDecimal>)> = sqlx::query_as(
            "SELECT b.sender, b.pair_address, b.liquidity, b.fee_to, b.fee_liquidity
             FROM burn b JOIN transaction t ON t.id = b.transaction_id JOIN block bl ON bl.id = t.block_id
             WHERE bl.number BETWEEN $1 AND $2",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;
        for (sender, pair, liquidity, fee_to, fee_liquidity) in burns {
            if let Some(sender) = sender {
                bump(&mut deltas, &sender, &pair, &(-&liquidity));
            }
            if let (Some(fee_to), Some(fee_liquidity)) = (fee_to, fee_liquidity) {
                bump(&mut deltas, &fee_to, &pair, &(-&fee_liquidity));
            }
        }

        let mut out = Vec::with_capacity(deltas.len());
        for ((user_address, pair_address), delta) in deltas {
            let existing: Option<BigDecimal> = sqlx::query_scalar(
                "SELECT liquidity_token_balance FROM liquidity_position WHERE user_address = $1 AND pair_address = $2",
            )
            .bind(&user_address)
            .bind(&pair_address)
            .fetch_optional(&self.pool)
            .await?;

            let liquidity_token_balance = existing.unwrap_or_else(BigDecimal::zero) + delta;
            out.push(LiquidityPosition { id: 0, user_address, pair_address, liquidity_token_balance });
        }

        Ok(out)
    }

    async fn aggregate_tokens(&self, a: i64, b: i64) -> Result<Vec<Token>, ProcessorError> {
        let tokens = sqlx::query_as::<_, Token>("SELECT * FROM token").fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(tokens.len());

        for mut token in tokens {
            let (tx_count, volume): (i64, Option<BigDecimal>) = sqlx::query_as(
                "SELECT COUNT(*), SUM(CASE WHEN p.token0_address = $1 THEN s.amount0_in + s.amount0_out
                                           ELSE s.amount1_in + s.amount1_out END)
                 FROM swap s
                 JOIN pair p ON p.address = s.pair_address
                 JOIN transaction t ON t.id = s.transaction_id
                 JOIN block bl ON bl.id = t.block_id
                 WHERE (p.token0_address = $1 OR p.token1_address = $1) AND bl.number BETWEEN $2 AND $3",
            )
            .bind(&token.address)
            .bind(a)
            .bind(b)
            .fetch_one(&self.pool)
            .await?;

            token.tx_count += tx_count;
            token.trade_volume = &token.trade_volume + &volume.unwrap_or_else(BigDecimal::zero);
            out.push(token);
        }

        Ok(out)
    }
}

async fn count_in_range(pool: &PgPool, table: &str, a: i64, b: i64) -> Result<i64, ProcessorError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} x JOIN transaction t ON t.id = x.transaction_id JOIN block bl ON bl.id = t.block_id
         WHERE bl.number BETWEEN $1 AND $2"
    );
    Ok(sqlx::query_scalar(&sql).bind(a).bind(b).fetch_one(pool).await?)
}

#[async_trait]
impl Stage for CountStage {
    fn name(&self) -> &str {
        "count"
    }

    async fn process(&mut self, a: i64, b: i64) -> Result<Vec<DomainObject>, ProcessorError> {
        let mut out = Vec::new();
        out.push(DomainObject::Factory(self.aggregate_factory(a, b).await?));
        out.extend(self.aggregate_pairs(a, b).await?.into_iter().map(DomainObject::Pair));
        out.extend(self.aggregate_tokens(a, b).await?.into_iter().map(DomainObject::Token));
        out.extend(self.aggregate_liquidity_positions(a, b).await?.into_iter().map(DomainObject::LiquidityPosition));
        Ok(out)
    }
}
