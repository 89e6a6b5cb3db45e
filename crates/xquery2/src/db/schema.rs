//! Row types for every table backing the exchange schema.
//!
//! Addresses and hashes are stored checksum-cased/lower-hex `String`s rather than
//! `alloy_primitives::Address`/`B256` directly: the schema keys on the string
//! representation (unique constraints, joins by string equality), and round-tripping
//! through `sqlx::FromRow` is simplest with the same representation the table uses.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Block {
    pub id: i64,
    pub hash: String,
    pub number: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub hash: String,
    pub from_address: String,
    pub block_id: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Token {
    pub id: i64,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i32,
    pub total_supply: BigDecimal,
    pub trade_volume: BigDecimal,
    pub trade_volume_usd: BigDecimal,
    pub untracked_volume_usd: BigDecimal,
    pub tx_count: i64,
    pub total_liquidity: BigDecimal,
    pub derived_native: BigDecimal,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Factory {
    pub id: i64,
    pub address: String,
    pub pair_count: i64,
    pub total_volume_usd: BigDecimal,
    pub total_volume_native: BigDecimal,
    pub untracked_volume_usd: BigDecimal,
    pub total_liquidity_usd: BigDecimal,
    pub total_liquidity_native: BigDecimal,
    pub tx_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Pair {
    pub id: i64,
    pub address: String,
    pub token0_address: String,
    pub token1_address: String,
    pub reserve0: BigDecimal,
    pub reserve1: BigDecimal,
    pub total_supply: BigDecimal,
    pub reserve_native: BigDecimal,
    pub reserve_usd: BigDecimal,
    pub tracked_reserve_native: BigDecimal,
    pub token0_price: BigDecimal,
    pub token1_price: BigDecimal,
    pub volume_token0: BigDecimal,
    pub volume_token1: BigDecimal,
    pub volume_usd: BigDecimal,
    pub untracked_volume_usd: BigDecimal,
    pub tx_count: i64,
    pub created_at_timestamp: i64,
    pub created_at_block_number: i64,
    pub block_id: i64,
    pub liquidity_provider_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub address: String,
    pub usd_swapped: BigDecimal,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub id: i64,
    pub user_address: String,
    pub pair_address: String,
    pub liquidity_token_balance: BigDecimal,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LiquidityPositionSnapshot {
    pub id: i64,
    pub user_address: String,
    pub pair_address: String,
    pub block_id: i64,
    pub liquidity_token_balance: BigDecimal,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Mint {
    pub id: i64,
    pub transaction_id: i64,
    pub pair_address: String,
    pub timestamp: i64,
    pub sender: Option<String>,
    pub amount0: BigDecimal,
    pub amount1: BigDecimal,
    pub to_address: String,
    pub liquidity: BigDecimal,
    pub log_index: Option<i64>,
    pub amount_usd: BigDecimal,
    pub fee_to: Option<String>,
    pub fee_liquidity: Option<BigDecimal>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Burn {
    pub id: i64,
    pub transaction_id: i64,
    pub pair_address: String,
    pub timestamp: i64,
    pub sender: Option<String>,
    pub amount0: BigDecimal,
    pub amount1: BigDecimal,
    pub to_address: Option<String>,
    pub liquidity: BigDecimal,
    pub log_index: Option<i64>,
    pub amount_usd: BigDecimal,
    pub needs_complete: bool,
    pub fee_to: Option<String>,
    pub fee_liquidity: Option<BigDecimal>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Swap {
    pub id: i64,
    pub transaction_id: i64,
    pub pair_address: String,
    pub timestamp: i64,
    pub sender: String,
    pub from_address: String,
    pub amount0_in: BigDecimal,
    pub amount1_in: BigDecimal,
    pub amount0_out: BigDecimal,
    pub amount1_out: BigDecimal,
    pub to_address: String,
    pub log_index: i64,
    pub amount_usd: BigDecimal,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub transaction_id: i64,
    pub pair_address: String,
    pub from_address: String,
    pub to_address: String,
    pub value: BigDecimal,
    pub log_index: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Sync {
    pub id: i64,
    pub transaction_id: i64,
    pub pair_address: String,
    pub reserve0: BigDecimal,
    pub reserve1: BigDecimal,
    pub log_index: i64,
}

/// `logIndex = 2^31 - 1` marks the synthetic "transition" bundle recorded when a
/// stage's tracked pair set changes.
pub const BUNDLE_TRANSITION_LOG_INDEX: i64 = (1i64 << 31) - 1;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Bundle {
    pub id: i64,
    pub native_price: BigDecimal,
    pub block_id: i64,
    pub log_index: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PairHourData {
    pub id: i64,
    pub hour_index: i64,
    pub hour_start_unix: i64,
    pub pair_address: String,
    pub reserve0: BigDecimal,
    pub reserve1: BigDecimal,
    pub reserve_usd: BigDecimal,
    pub volume_token0: BigDecimal,
    pub volume_token1: BigDecimal,
    pub volume_usd: BigDecimal,
    pub tx_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PairDayData {
    pub id: i64,
    pub day_index: i64,
    pub day_start_unix: i64,
    pub pair_address: String,
    pub reserve0: BigDecimal,
    pub reserve1: BigDecimal,
    pub reserve_usd: BigDecimal,
    pub volume_token0: BigDecimal,
    pub volume_token1: BigDecimal,
    pub volume_usd: BigDecimal,
    pub tx_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TokenHourData {
    pub id: i64,
    pub hour_index: i64,
    pub hour_start_unix: i64,
    pub token_address: String,
    pub volume: BigDecimal,
    pub volume_usd: BigDecimal,
    pub tx_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TokenDayData {
    pub id: i64,
    pub day_index: i64,
    pub day_start_unix: i64,
    pub token_address: String,
    pub volume: BigDecimal,
    pub volume_usd: BigDecimal,
    pub tx_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExchangeDayData {
    pub id: i64,
    pub day_index: i64,
    pub day_start_unix: i64,
    pub volume_usd: BigDecimal,
    pub volume_native: BigDecimal,
    pub liquidity_usd: BigDecimal,
    pub tx_count: i64,
}

/// A named, durable cursor tracking commit position.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct State {
    pub id: i64,
    pub name: String,
    pub block_number: Option<i64>,
    pub block_hash: Option<String>,
    pub finalized: Option<i64>,
    pub discarded: bool,
}

/// Every row kind a worker can emit, used as the element type of a `JobResult`
/// (the Rust analogue of the Python `List[orm.BaseModel]` transport: the original is
/// dynamically typed, Rust needs a closed sum type at the pipeline boundary).
#[derive(Debug, Clone)]
pub enum DomainObject {
    Block(Block),
    Transaction(Transaction),
    Token(Token),
    Factory(Factory),
    Pair(Pair),
    User(User),
    LiquidityPosition(LiquidityPosition),
    LiquidityPositionSnapshot(LiquidityPositionSnapshot),
    Mint(Mint),
    Burn(Burn),
    Swap(Swap),
    Transfer(Transfer),
    Sync(Sync),
    Bundle(Bundle),
    PairHourData(PairHourData),
    PairDayData(PairDayData),
    TokenHourData(TokenHourData),
    TokenDayData(TokenDayData),
    ExchangeDayData(ExchangeDayData),
}
