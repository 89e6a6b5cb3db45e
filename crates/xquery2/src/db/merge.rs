//! Row-level UPSERT of every [`DomainObject`] kind, implemented as idempotent
//! `INSERT ... ON CONFLICT ... DO UPDATE` since Postgres has no native `MERGE`.
//!
//! Only the commit coordinator calls this: it exclusively owns writes to the state
//! and event tables. Immutable fact rows
//! (Mint/Burn/Swap/Transfer/Sync/Bundle/rollups) use `DO NOTHING` on conflict: they
//! are produced exactly once by a single job and never revised in place. Mutable
//! aggregate rows (Pair/Token/Factory) use `DO UPDATE`, since both the indexer
//! (reserves, running volumes) and the processor stages (counts, totals) revise them
//! across many jobs.

use sqlx::{Postgres, Transaction};

use super::schema::DomainObject;
use crate::error::CoordinatorError;

/// Apply every produced row to the database, in the order the worker emitted them.
/// Order matters for objects that reference each other only by address string
/// (Pair before its Mint/Burn/Swap in the same bundle, for instance), which is why
/// this isn't a set union keyed by type.
pub async fn merge(tx: &mut Transaction<'_, Postgres>, objects: &[DomainObject]) -> Result<(), CoordinatorError> {
    for object in objects {
        merge_one(tx, object).await?;
    }
    Ok(())
}

async fn merge_one(tx: &mut Transaction<'_, Postgres>, object: &DomainObject) -> Result<(), CoordinatorError> {
    match object {
        DomainObject::Block(b) => {
            sqlx::query(
                "INSERT INTO block (hash, number, timestamp) VALUES ($1, $2, $3)
                 ON CONFLICT (hash) DO NOTHING",
            )
            .bind(&b.hash)
            .bind(b.number)
            .bind(b.timestamp)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Transaction(t) => {
            sqlx::query(
                "INSERT INTO transaction (hash, from_address, block_id, timestamp) VALUES ($1, $2, $3, $4)
                 ON CONFLICT (hash) DO NOTHING",
            )
            .bind(&t.hash)
            .bind(&t.from_address)
            .bind(t.block_id)
            .bind(t.timestamp)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Token(t) => {
            sqlx::query(
                "INSERT INTO token (address, symbol, name, decimals, total_supply, trade_volume,
                                     trade_volume_usd, untracked_volume_usd, tx_count, total_liquidity, derived_native)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (address) DO UPDATE SET
                    total_supply = EXCLUDED.total_supply,
                    trade_volume = EXCLUDED.trade_volume,
                    trade_volume_usd = EXCLUDED.trade_volume_usd,
                    untracked_volume_usd = EXCLUDED.untracked_volume_usd,
                    tx_count = EXCLUDED.tx_count,
                    total_liquidity = EXCLUDED.total_liquidity,
                    derived_native = EXCLUDED.derived_native",
            )
            .bind(&t.address)
            .bind(&t.symbol)
            .bind(&t.name)
            .bind(t.decimals)
            .bind(&t.total_supply)
            .bind(&t.trade_volume)
            .bind(&t.trade_volume_usd)
            .bind(&t.untracked_volume_usd)
            .bind(t.tx_count)
            .bind(&t.total_liquidity)
            .bind(&t.derived_native)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Factory(f) => {
            sqlx::query(
                "INSERT INTO factory (address, pair_count, total_volume_usd, total_volume_native,
                                       untracked_volume_usd, total_liquidity_usd, total_liquidity_native, tx_count)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (address) DO UPDATE SET
                    pair_count = EXCLUDED.pair_count,
                    total_volume_usd = EXCLUDED.total_volume_usd,
                    total_volume_native = EXCLUDED.total_volume_native,
                    untracked_volume_usd = EXCLUDED.untracked_volume_usd,
                    total_liquidity_usd = EXCLUDED.total_liquidity_usd,
                    total_liquidity_native = EXCLUDED.total_liquidity_native,
                    tx_count = EXCLUDED.tx_count",
            )
            .bind(&f.address)
            .bind(f.pair_count)
            .bind(&f.total_volume_usd)
            .bind(&f.total_volume_native)
            .bind(&f.untracked_volume_usd)
            .bind(&f.total_liquidity_usd)
            .bind(&f.total_liquidity_native)
            .bind(f.tx_count)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Pair(p) => {
            if p.token0_address == p.token1_address {
                return Err(CoordinatorError::Database(sqlx::Error::Protocol(format!(
                    "pair {} has token0 == token1",
                    p.address
                ))));
            }
            sqlx::query(
                "INSERT INTO pair (address, token0_address, token1_address, reserve0, reserve1, total_supply,
                                    reserve_native, reserve_usd, tracked_reserve_native, token0_price, token1_price,
                                    volume_token0, volume_token1, volume_usd, untracked_volume_usd, tx_count,
                                    created_at_timestamp, created_at_block_number, block_id, liquidity_provider_count)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                 ON CONFLICT (address) DO UPDATE SET
                    reserve0 = EXCLUDED.reserve0,
                    reserve1 = EXCLUDED.reserve1,
                    total_supply = EXCLUDED.total_supply,
                    reserve_native = EXCLUDED.reserve_native,
                    reserve_usd = EXCLUDED.reserve_usd,
                    tracked_reserve_native = EXCLUDED.tracked_reserve_native,
                    token0_price = EXCLUDED.token0_price,
                    token1_price = EXCLUDED.token1_price,
                    volume_token0 = EXCLUDED.volume_token0,
                    volume_token1 = EXCLUDED.volume_token1,
                    volume_usd = EXCLUDED.volume_usd,
                    untracked_volume_usd = EXCLUDED.untracked_volume_usd,
                    tx_count = EXCLUDED.tx_count,
                    liquidity_provider_count = EXCLUDED.liquidity_provider_count",
            )
            .bind(&p.address)
            .bind(&p.token0_address)
            .bind(&p.token1_address)
            .bind(&p.reserve0)
            .bind(&p.reserve1)
            .bind(&p.total_supply)
            .bind(&p.reserve_native)
            .bind(&p.reserve_usd)
            .bind(&p.tracked_reserve_native)
            .bind(&p.token0_price)
            .bind(&p.token1_price)
            .bind(&p.volume_token0)
            .bind(&p.volume_token1)
            .bind(&p.volume_usd)
            .bind(&p.untracked_volume_usd)
            .bind(p.tx_count)
            .bind(p.created_at_timestamp)
            .bind(p.created_at_block_number)
            .bind(p.block_id)
            .bind(p.liquidity_provider_count)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::User(u) => {
            sqlx::query(
                "INSERT INTO \"user\" (address, usd_swapped) VALUES ($1, $2)
                 ON CONFLICT (address) DO UPDATE SET usd_swapped = EXCLUDED.usd_swapped",
            )
            .bind(&u.address)
            .bind(&u.usd_swapped)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::LiquidityPosition(lp) => {
            sqlx::query(
                "INSERT INTO liquidity_position (user_address, pair_address, liquidity_token_balance)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (user_address, pair_address) DO UPDATE SET
                    liquidity_token_balance = EXCLUDED.liquidity_token_balance",
            )
            .bind(&lp.user_address)
            .bind(&lp.pair_address)
            .bind(&lp.liquidity_token_balance)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::LiquidityPositionSnapshot(s) => {
            sqlx::query(
                "INSERT INTO liquidity_position_snapshot (user_address, pair_address, block_id, liquidity_token_balance)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT DO NOTHING",
            )
            .bind(&s.user_address)
            .bind(&s.pair_address)
            .bind(s.block_id)
            .bind(&s.liquidity_token_balance)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Mint(m) => {
            sqlx::query(
                "INSERT INTO mint (transaction_id, pair_address, timestamp, sender, amount0, amount1, to_address,
                                    liquidity, log_index, amount_usd, fee_to, fee_liquidity)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                 ON CONFLICT (transaction_id, log_index) DO NOTHING",
            )
            .bind(m.transaction_id)
            .bind(&m.pair_address)
            .bind(m.timestamp)
            .bind(&m.sender)
            .bind(&m.amount0)
            .bind(&m.amount1)
            .bind(&m.to_address)
            .bind(&m.liquidity)
            .bind(m.log_index)
            .bind(&m.amount_usd)
            .bind(&m.fee_to)
            .bind(&m.fee_liquidity)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Burn(b) => {
            sqlx::query(
                "INSERT INTO burn (transaction_id, pair_address, timestamp, sender, amount0, amount1, to_address,
                                    liquidity, log_index, amount_usd, needs_complete, fee_to, fee_liquidity)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 ON CONFLICT (transaction_id, log_index) DO UPDATE SET
                    needs_complete = EXCLUDED.needs_complete,
                    to_address = EXCLUDED.to_address,
                    sender = EXCLUDED.sender,
                    amount0 = EXCLUDED.amount0,
                    amount1 = EXCLUDED.amount1",
            )
            .bind(b.transaction_id)
            .bind(&b.pair_address)
            .bind(b.timestamp)
            .bind(&b.sender)
            .bind(&b.amount0)
            .bind(&b.amount1)
            .bind(&b.to_address)
            .bind(&b.liquidity)
            .bind(b.log_index)
            .bind(&b.amount_usd)
            .bind(b.needs_complete)
            .bind(&b.fee_to)
            .bind(&b.fee_liquidity)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Swap(s) => {
            sqlx::query(
                "INSERT INTO swap (transaction_id, pair_address, timestamp, sender, from_address, amount0_in,
                                    amount1_in, amount0_out, amount1_out, to_address, log_index, amount_usd)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                 ON CONFLICT (transaction_id, log_index) DO NOTHING",
            )
            .bind(s.transaction_id)
            .bind(&s.pair_address)
            .bind(s.timestamp)
            .bind(&s.sender)
            .bind(&s.from_address)
            .bind(&s.amount0_in)
            .bind(&s.amount1_in)
            .bind(&s.amount0_out)
            .bind(&s.amount1_out)
            .bind(&s.to_address)
            .bind(s.log_index)
            .bind(&s.amount_usd)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Transfer(t) => {
            sqlx::query(
                "INSERT INTO transfer (transaction_id, pair_address, from_address, to_address, value, log_index)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (transaction_id, log_index) DO NOTHING",
            )
            .bind(t.transaction_id)
            .bind(&t.pair_address)
            .bind(&t.from_address)
            .bind(&t.to_address)
            .bind(&t.value)
            .bind(t.log_index)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Sync(s) => {
            sqlx::query(
                "INSERT INTO sync (transaction_id, pair_address, reserve0, reserve1, log_index)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (transaction_id, log_index) DO NOTHING",
            )
            .bind(s.transaction_id)
            .bind(&s.pair_address)
            .bind(&s.reserve0)
            .bind(&s.reserve1)
            .bind(s.log_index)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::Bundle(b) => {
            sqlx::query(
                "INSERT INTO bundle (native_price, block_id, log_index) VALUES ($1, $2, $3)
                 ON CONFLICT (block_id, log_index) DO NOTHING",
            )
            .bind(&b.native_price)
            .bind(b.block_id)
            .bind(b.log_index)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::PairHourData(r) => {
            sqlx::query(
                "INSERT INTO pair_hour_data (hour_index, hour_start_unix, pair_address, reserve0, reserve1,
                                              reserve_usd, volume_token0, volume_token1, volume_usd, tx_count)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (pair_address, hour_index) DO UPDATE SET
                    reserve0 = EXCLUDED.reserve0, reserve1 = EXCLUDED.reserve1, reserve_usd = EXCLUDED.reserve_usd,
                    volume_token0 = EXCLUDED.volume_token0, volume_token1 = EXCLUDED.volume_token1,
                    volume_usd = EXCLUDED.volume_usd, tx_count = EXCLUDED.tx_count",
            )
            .bind(r.hour_index)
            .bind(r.hour_start_unix)
            .bind(&r.pair_address)
            .bind(&r.reserve0)
            .bind(&r.reserve1)
            .bind(&r.reserve_usd)
            .bind(&r.volume_token0)
            .bind(&r.volume_token1)
            .bind(&r.volume_usd)
            .bind(r.tx_count)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::PairDayData(r) => {
            sqlx::query(
                "INSERT INTO pair_day_data (day_index, day_start_unix, pair_address, reserve0, reserve1,
                                             reserve_usd, volume_token0, volume_token1, volume_usd, tx_count)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (pair_address, day_index) DO UPDATE SET
                    reserve0 = EXCLUDED.reserve0, reserve1 = EXCLUDED.reserve1, reserve_usd = EXCLUDED.reserve_usd,
                    volume_token0 = EXCLUDED.volume_token0, volume_token1 = EXCLUDED.volume_token1,
                    volume_usd = EXCLUDED.volume_usd, tx_count = EXCLUDED.tx_count",
            )
            .bind(r.day_index)
            .bind(r.day_start_unix)
            .bind(&r.pair_address)
            .bind(&r.reserve0)
            .bind(&r.reserve1)
            .bind(&r.reserve_usd)
            .bind(&r.volume_token0)
            .bind(&r.volume_token1)
            .bind(&r.volume_usd)
            .bind(r.tx_count)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::TokenHourData(r) => {
            sqlx::query(
                "INSERT INTO token_hour_data (hour_index, hour_start_unix, token_address, volume, volume_usd, tx_count)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (token_address, hour_index) DO UPDATE SET
                    volume = EXCLUDED.volume, volume_usd = EXCLUDED.volume_usd, tx_count = EXCLUDED.tx_count",
            )
            .bind(r.hour_index)
            .bind(r.hour_start_unix)
            .bind(&r.token_address)
            .bind(&r.volume)
            .bind(&r.volume_usd)
            .bind(r.tx_count)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::TokenDayData(r) => {
            sqlx::query(
                "INSERT INTO token_day_data (day_index, day_start_unix, token_address, volume, volume_usd, tx_count)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (token_address, day_index) DO UPDATE SET
                    volume = EXCLUDED.volume, volume_usd = EXCLUDED.volume_usd, tx_count = EXCLUDED.tx_count",
            )
            .bind(r.day_index)
            .bind(r.day_start_unix)
            .bind(&r.token_address)
            .bind(&r.volume)
            .bind(&r.volume_usd)
            .bind(r.tx_count)
            .execute(&mut **tx)
            .await?;
        }
        DomainObject::ExchangeDayData(r) => {
            sqlx::query(
                "INSERT INTO exchange_day_data (day_index, day_start_unix, volume_usd, volume_native, liquidity_usd, tx_count)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (day_index) DO UPDATE SET
                    volume_usd = EXCLUDED.volume_usd, volume_native = EXCLUDED.volume_native,
                    liquidity_usd = EXCLUDED.liquidity_usd, tx_count = EXCLUDED.tx_count",
            )
            .bind(r.day_index)
            .bind(r.day_start_unix)
            .bind(&r.volume_usd)
            .bind(&r.volume_native)
            .bind(&r.liquidity_usd)
            .bind(r.tx_count)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}
