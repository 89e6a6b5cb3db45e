//! Weighted-average native-currency price stage.
//!
//! Every `Sync` in `[a, b]` updates one tracked pair's price/weight pair; after each
//! update the stage emits a new `Bundle` row holding the weighted average across all
//! tracked pairs. A synthetic "transition" bundle anchored at
//! `logIndex = BUNDLE_TRANSITION_LOG_INDEX` on the block just before the configured
//! start block seeds the average for chains that don't start indexing at genesis.

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num::Zero;
use sqlx::{FromRow, PgPool};

use super::Stage;
use crate::db::schema::{Bundle, DomainObject, BUNDLE_TRANSITION_LOG_INDEX};
use crate::decimal::quantize;
use crate::error::ProcessorError;

/// A tracked pair and which side of its reserve pair is native-denominated.
/// `order = true` means token1 is the native side (`price = reserve1/reserve0`, no—
/// see [`calc_price`] for the exact convention).
#[derive(Debug, Clone)]
pub struct PairInfo {
    pub address: String,
    pub order: bool,
}

#[derive(Debug, Clone)]
struct PriceInfo {
    price: BigDecimal,
    weight: BigDecimal,
}

impl Default for PriceInfo {
    fn default() -> Self {
        Self { price: BigDecimal::zero(), weight: BigDecimal::zero() }
    }
}

/// `order=true`: `price = b/a`, weighted by `a`. `order=false`: `price = a/b`,
/// weighted by `b`. A zero reserve on either side yields a zero-weighted price so it
/// never perturbs the average.
fn calc_price(a: &BigDecimal, b: &BigDecimal, order: bool) -> PriceInfo {
    if a.is_zero() || b.is_zero() {
        return PriceInfo::default();
    }
    let (price, weight) = if order { (b / a, a.clone()) } else { (a / b, b.clone()) };
    PriceInfo { price: quantize(&price), weight }
}

/// Weighted average over every tracked pair's current `PriceInfo`; zero if every
/// pair currently carries zero weight.
fn calc_weighted_average(infos: &HashMap<String, PriceInfo>) -> BigDecimal {
    let mut total_weight = BigDecimal::zero();
    let mut weighted_sum = BigDecimal::zero();
    for info in infos.values() {
        weighted_sum += &info.price * &info.weight;
        total_weight += &info.weight;
    }
    if total_weight.is_zero() {
        return BigDecimal::zero();
    }
    quantize(&(weighted_sum / total_weight))
}

#[derive(Debug, FromRow)]
struct SyncRow {
    pair_address: String,
    reserve0: BigDecimal,
    reserve1: BigDecimal,
    log_index: i64,
    block_number: i64,
    block_id: i64,
}

/// Per-worker price-bundling stage. `migrations` supports chains that change their
/// tracked-pair set partway through history: each entry swaps in a different
/// tracked-pair set starting at its block, re-seeding prices for the new set at that
/// boundary.
pub struct BundleStage {
    pool: PgPool,
    default_price: BigDecimal,
    tracked_pairs: Vec<PairInfo>,
    migrations: Vec<(i64, Vec<PairInfo>)>,
    price_infos: HashMap<String, PriceInfo>,
}

impl BundleStage {
    pub fn new(pool: PgPool, tracked_pairs: Vec<PairInfo>, migrations: Vec<(i64, Vec<PairInfo>)>, default_price: BigDecimal) -> Self {
        Self { pool, default_price, tracked_pairs, migrations, price_infos: HashMap::new() }
    }

    fn active_pairs(&self, block_number: i64) -> &[PairInfo] {
        self.migrations
            .iter()
            .rev()
            .find(|(at, _)| block_number >= *at)
            .map(|(_, pairs)| pairs.as_slice())
            .unwrap_or(&self.tracked_pairs)
    }

    /// Seed `price_infos` from the most recent `Sync` strictly before `start_block`
    /// for each tracked pair, defaulting to a zero price/weight, then materialize (or
    /// verify) the transition `Bundle` anchored just before `start_block`.
    async fn init_prices(&mut self, pairs: &[PairInfo], start_block: i64) -> Result<(), ProcessorError> {
        self.price_infos.clear();
        for pair in pairs {
            let row = sqlx::query_as::<_, SyncRow>(
                "SELECT s.pair_address, s.reserve0, s.reserve1, s.log_index, b.number AS block_number, b.id AS block_id
                 FROM sync s
                 JOIN transaction t ON t.id = s.transaction_id
                 JOIN block b ON b.id = t.block_id
                 WHERE s.pair_address = $1 AND b.number < $2
                 ORDER BY b.number DESC, s.log_index DESC
                 LIMIT 1",
            )
            .bind(&pair.address)
            .bind(start_block)
            .fetch_optional(&self.pool)
            .await?;

            let info = match row {
                Some(row) => calc_price(&row.reserve0, &row.reserve1, pair.order),
                None => PriceInfo::default(),
            };
            self.price_infos.insert(pair.address.clone(), info);
        }

        let native_price = if self.price_infos.values().all(|p| p.weight.is_zero()) {
            self.default_price.clone()
        } else {
            calc_weighted_average(&self.price_infos)
        };

        let anchor_block: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM block WHERE number < $1 ORDER BY number DESC LIMIT 1",
        )
        .bind(start_block)
        .fetch_optional(&self.pool)
        .await?;

        let Some(block_id) = anchor_block else {
            return Ok(());
        };

        let existing = sqlx::query_as::<_, Bundle>(
            "SELECT * FROM bundle WHERE block_id = $1 AND log_index = $2",
        )
        .bind(block_id)
        .bind(BUNDLE_TRANSITION_LOG_INDEX)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(existing) if existing.native_price != native_price => {
                Err(ProcessorError::TransitionBundleMismatch(format!("block_id={block_id}")))
            }
            Some(_) => Ok(()),
            None => {
                sqlx::query(
                    "INSERT INTO bundle (native_price, block_id, log_index) VALUES ($1, $2, $3)
                     ON CONFLICT DO NOTHING",
                )
                .bind(&native_price)
                .bind(block_id)
                .bind(BUNDLE_TRANSITION_LOG_INDEX)
                .execute(&self.pool)
                .await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Stage for BundleStage {
    fn name(&self) -> &str {
        "bundle"
    }

    async fn setup(&mut self, start_block: i64) -> Result<(), ProcessorError> {
        let pairs = self.active_pairs(start_block).to_vec();
        self.init_prices(&pairs, start_block).await
    }

    async fn process(&mut self, a: i64, b: i64) -> Result<Vec<DomainObject>, ProcessorError> {
        let mut out = Vec::new();

        // A migration boundary inside [a, b] re-seeds prices for the newly active
        // pair set before continuing, matching the Pangolin variant's per-sub-range
        // `_init_prices` call.
        let mut boundaries = vec![a];
        boundaries.extend(self.migrations.iter().map(|(at, _)| *at).filter(|at| *at > a && *at <= b));
        boundaries.push(b + 1);
        boundaries.sort_unstable();
        boundaries.dedup();

        for window in boundaries.windows(2) {
            let (sub_a, sub_b) = (window[0], window[1] - 1);
            if self.migrations.iter().any(|(at, _)| *at == sub_a) {
                let pairs = self.active_pairs(sub_a).to_vec();
                self.init_prices(&pairs, sub_a).await?;
            }

            let pairs = self.active_pairs(sub_a).to_vec();
            let addresses: Vec<&str> = pairs.iter().map(|p| p.address.as_str()).collect();

            let rows = sqlx::query_as::<_, SyncRow>(
                "SELECT s.pair_address, s.reserve0, s.reserve1, s.log_index, b.number AS block_number, b.id AS block_id
                 FROM sync s
                 JOIN transaction t ON t.id = s.transaction_id
                 JOIN block b ON b.id = t.block_id
                 WHERE b.number BETWEEN $1 AND $2 AND s.pair_address = ANY($3)
                 ORDER BY b.number, s.log_index",
            )
            .bind(sub_a)
            .bind(sub_b)
            .bind(&addresses as &[&str])
            .fetch_all(&self.pool)
            .await?;

            for row in rows {
                if let Some(pair) = pairs.iter().find(|p| p.address == row.pair_address) {
                    let info = calc_price(&row.reserve0, &row.reserve1, pair.order);
                    self.price_infos.insert(pair.address.clone(), info);
                }

                let native_price = calc_weighted_average(&self.price_infos);
                out.push(DomainObject::Bundle(Bundle {
                    id: 0,
                    native_price,
                    block_id: row.block_id,
                    log_index: row.log_index,
                }));
            }
        }

        Ok(out)
    }
}
