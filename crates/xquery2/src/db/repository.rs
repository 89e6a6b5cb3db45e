//! Entity repository: idempotent get-or-create for Block, Transaction, Token, User
//! and Factory, fronted by a process-local memoized cache.
//!
//! Ordering per entity: check the local cache, `SELECT`, and only `INSERT` on a miss;
//! a unique-constraint race from a sibling worker is caught and resolved by
//! re-`SELECT`ing rather than retried blindly.

use alloy_primitives::{Address, B256};
use bigdecimal::BigDecimal;
use moka::sync::Cache as MokaCache;
use num::BigInt;
use sqlx::postgres::PgDatabaseError;
use sqlx::PgPool;

use std::time::Duration;

use crate::abi::rc20;
use crate::decimal::MAX_DECIMAL_PLACES;
use crate::error::{IndexerError, RepositoryError, RpcError};
use crate::rpc::RpcClient;

use super::schema::{Block, Factory, Pair, Token, Transaction, User};

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.downcast_ref::<PgDatabaseError>().code() == UNIQUE_VIOLATION)
}

/// Per-worker entity repository. Each indexer worker owns one, sharing the `db` pool
/// and `rpc` client handed to it at startup.
pub struct Repository {
    pool: PgPool,
    rpc: RpcClient,
    blocks: MokaCache<B256, Block>,
    transactions: MokaCache<B256, Transaction>,
    tokens: MokaCache<Address, Token>,
    users: MokaCache<Address, User>,
    factories: MokaCache<Address, Factory>,
    pairs: MokaCache<Address, Pair>,
}

impl Repository {
    pub fn new(pool: PgPool, rpc: RpcClient) -> Self {
        Self {
            pool,
            rpc,
            blocks: MokaCache::builder().max_capacity(10_000).build(),
            transactions: MokaCache::builder().max_capacity(10_000).build(),
            tokens: MokaCache::builder().max_capacity(10_000).build(),
            users: MokaCache::builder().max_capacity(10_000).build(),
            factories: MokaCache::builder().max_capacity(16).build(),
            pairs: MokaCache::builder().max_capacity(10_000).build(),
        }
    }

    /// Stash a just-created (not yet committed) pair so later events in the same
    /// worker, possibly the same block, can see it immediately, ahead of the
    /// coordinator's commit.
    pub fn cache_pair(&self, pair: Pair) {
        let address = pair.address.parse().unwrap_or(Address::ZERO);
        self.pairs.insert(address, pair);
    }

    /// Local-cache-only lookup, no DB roundtrip (used by stages that must not block).
    pub fn get_cached_pair(&self, address: Address) -> Option<Pair> {
        self.pairs.get(&address)
    }

    /// Poll the local cache, then the database, until `address` becomes visible or
    /// `timeout` elapses. A sibling worker may have created the pair in a row this
    /// worker's own event stream never saw (e.g. a PairCreated log routed to a
    /// different worker).
    pub async fn load_pair(&self, address: Address, timeout: Duration) -> Result<Pair, IndexerError> {
        if let Some(pair) = self.pairs.get(&address) {
            return Ok(pair);
        }

        let address_str = address.to_checksum(None);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(pair) = sqlx::query_as::<_, Pair>("SELECT * FROM pair WHERE address = $1")
                .bind(&address_str)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::from)?
            {
                self.pairs.insert(address, pair.clone());
                return Ok(pair);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(IndexerError::PairVisibilityTimeout(address_str));
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    pub async fn get_or_create_block(&self, hash: B256) -> Result<Block, RepositoryError> {
        if let Some(block) = self.blocks.get(&hash) {
            return Ok(block);
        }

        let hash_str = hash.to_string();
        if let Some(block) = sqlx::query_as::<_, Block>("SELECT * FROM block WHERE hash = $1")
            .bind(&hash_str)
            .fetch_optional(&self.pool)
            .await?
        {
            self.blocks.insert(hash, block.clone());
            return Ok(block);
        }

        let info = self.rpc.get_block_by_hash(hash).await?.ok_or_else(|| RpcError::BlockNotFound(hash_str.clone()))?;

        let inserted = sqlx::query_as::<_, Block>(
            "INSERT INTO block (hash, number, timestamp) VALUES ($1, $2, $3)
             ON CONFLICT (hash) DO NOTHING RETURNING *",
        )
        .bind(&hash_str)
        .bind(info.number as i64)
        .bind(info.timestamp as i64)
        .fetch_optional(&self.pool)
        .await?;

        let block = match inserted {
            Some(block) => block,
            None => sqlx::query_as::<_, Block>("SELECT * FROM block WHERE hash = $1")
                .bind(&hash_str)
                .fetch_one(&self.pool)
                .await?,
        };

        self.blocks.insert(hash, block.clone());
        Ok(block)
    }

    pub async fn get_or_create_transaction(&self, hash: B256) -> Result<Transaction, RepositoryError> {
        if let Some(tx) = self.transactions.get(&hash) {
            return Ok(tx);
        }

        let hash_str = hash.to_string();
        if let Some(tx) = sqlx::query_as::<_, Transaction>("SELECT * FROM transaction WHERE hash = $1")
            .bind(&hash_str)
            .fetch_optional(&self.pool)
            .await?
        {
            self.transactions.insert(hash, tx.clone());
            return Ok(tx);
        }

        let info = self.rpc.get_transaction_by_hash(hash).await?.ok_or_else(|| RpcError::TransactionNotFound(hash_str.clone()))?;
        let block = self.get_or_create_block(info.block_hash).await?;

        let result = sqlx::query_as::<_, Transaction>(
            "INSERT INTO transaction (hash, from_address, block_id, timestamp) VALUES ($1, $2, $3, $4)
             ON CONFLICT (hash) DO NOTHING RETURNING *",
        )
        .bind(&hash_str)
        .bind(info.from.to_string())
        .bind(block.id)
        .bind(block.timestamp)
        .fetch_optional(&self.pool)
        .await?;

        let tx = match result {
            Some(tx) => tx,
            None => sqlx::query_as::<_, Transaction>("SELECT * FROM transaction WHERE hash = $1")
                .bind(&hash_str)
                .fetch_one(&self.pool)
                .await?,
        };

        self.transactions.insert(hash, tx.clone());
        Ok(tx)
    }

    pub async fn get_or_create_user(&self, address: Address) -> Result<User, RepositoryError> {
        if let Some(user) = self.users.get(&address) {
            return Ok(user);
        }

        let address_str = address.to_checksum(None);
        if let Some(user) = sqlx::query_as::<_, User>("SELECT * FROM \"user\" WHERE address = $1")
            .bind(&address_str)
            .fetch_optional(&self.pool)
            .await?
        {
            self.users.insert(address, user.clone());
            return Ok(user);
        }

        let result = sqlx::query_as::<_, User>(
            "INSERT INTO \"user\" (address, usd_swapped) VALUES ($1, 0)
             ON CONFLICT (address) DO NOTHING RETURNING *",
        )
        .bind(&address_str)
        .fetch_optional(&self.pool)
        .await?;

        let user = match result {
            Some(user) => user,
            None => sqlx::query_as::<_, User>("SELECT * FROM \"user\" WHERE address = $1")
                .bind(&address_str)
                .fetch_one(&self.pool)
                .await?,
        };

        self.users.insert(address, user.clone());
        Ok(user)
    }

    pub async fn get_or_create_factory(&self, address: Address) -> Result<Factory, RepositoryError> {
        if let Some(factory) = self.factories.get(&address) {
            return Ok(factory);
        }

        let address_str = address.to_checksum(None);
        if let Some(factory) = sqlx::query_as::<_, Factory>("SELECT * FROM factory WHERE address = $1")
            .bind(&address_str)
            .fetch_optional(&self.pool)
            .await?
        {
            self.factories.insert(address, factory.clone());
            return Ok(factory);
        }

        let result = sqlx::query_as::<_, Factory>(
            "INSERT INTO factory (address, pair_count, total_volume_usd, total_volume_native,
                                   untracked_volume_usd, total_liquidity_usd, total_liquidity_native, tx_count)
             VALUES ($1, 0, 0, 0, 0, 0, 0, 0)
             ON CONFLICT (address) DO NOTHING RETURNING *",
        )
        .bind(&address_str)
        .fetch_optional(&self.pool)
        .await?;

        let factory = match result {
            Some(factory) => factory,
            None => sqlx::query_as::<_, Factory>("SELECT * FROM factory WHERE address = $1")
                .bind(&address_str)
                .fetch_one(&self.pool)
                .await?,
        };

        self.factories.insert(address, factory.clone());
        Ok(factory)
    }

    pub async fn get_or_create_token(&self, address: Address) -> Result<Token, RepositoryError> {
        if let Some(token) = self.tokens.get(&address) {
            return Ok(token);
        }

        let address_str = address.to_checksum(None);
        if let Some(token) = sqlx::query_as::<_, Token>("SELECT * FROM token WHERE address = $1")
            .bind(&address_str)
            .fetch_optional(&self.pool)
            .await?
        {
            self.tokens.insert(address, token.clone());
            return Ok(token);
        }

        let info = self.fetch_token_info(address).await;
        if info.decimals > MAX_DECIMAL_PLACES {
            return Err(RepositoryError::DecimalsOutOfRange(info.decimals));
        }

        let result = sqlx::query_as::<_, Token>(
            "INSERT INTO token (address, symbol, name, decimals, total_supply, trade_volume, trade_volume_usd,
                                 untracked_volume_usd, tx_count, total_liquidity, derived_native)
             VALUES ($1, $2, $3, $4, $5, 0, 0, 0, 0, 0, 0)
             ON CONFLICT (address) DO NOTHING RETURNING *",
        )
        .bind(&address_str)
        .bind(&info.symbol)
        .bind(&info.name)
        .bind(info.decimals as i32)
        .bind(BigDecimal::new(BigInt::from(info.total_supply), 0))
        .fetch_optional(&self.pool)
        .await?;

        let token = match result {
            Some(token) => token,
            None => sqlx::query_as::<_, Token>("SELECT * FROM token WHERE address = $1")
                .bind(&address_str)
                .fetch_one(&self.pool)
                .await?,
        };

        self.tokens.insert(address, token.clone());
        Ok(token)
    }

    /// Fetch `symbol`/`name`/`decimals`/`totalSupply` from the RC20 contract, falling
    /// back to a bytes32-typed ABI for `symbol`/`name` when the standard string-typed
    /// call reverts, and finally to `"unknown"`/`0`.
    async fn fetch_token_info(&self, address: Address) -> TokenInfo {
        let symbol = match self.call_string(address, &rc20::symbol_string()).await {
            Ok(s) => s,
            Err(_) => match self.call_bytes32_string(address, &rc20::symbol_string()).await {
                Ok(s) => s,
                Err(_) => "unknown".to_string(),
            },
        };

        let name = match self.call_string(address, &rc20::name_string()).await {
            Ok(s) => s,
            Err(_) => match self.call_bytes32_string(address, &rc20::name_string()).await {
                Ok(s) => s,
                Err(_) => "unknown".to_string(),
            },
        };

        let decimals = match self.rpc.eth_call(address, &rc20::decimals()).await {
            Ok(bytes) => decode_u256(&bytes).map(|v| v.try_into().unwrap_or(u32::MAX)).unwrap_or(0),
            Err(_) => 0,
        };

        let total_supply = match self.rpc.eth_call(address, &rc20::total_supply()).await {
            Ok(bytes) => decode_u256(&bytes).unwrap_or_default(),
            Err(_) => 0u128,
        };

        TokenInfo { symbol: symbol.chars().take(16).collect(), name: name.chars().take(64).collect(), decimals, total_supply }
    }

    async fn call_string(&self, address: Address, selector: &[u8; 4]) -> Result<String, RpcError> {
        let bytes = self.rpc.eth_call(address, selector).await?;
        decode_abi_string(&bytes).ok_or_else(|| RpcError::Other(anyhow::anyhow!("malformed string ABI return")))
    }

    async fn call_bytes32_string(&self, address: Address, selector: &[u8; 4]) -> Result<String, RpcError> {
        let bytes = self.rpc.eth_call(address, selector).await?;
        decode_bytes32_string(&bytes).ok_or_else(|| RpcError::Other(anyhow::anyhow!("malformed bytes32 ABI return")))
    }
}

struct TokenInfo {
    symbol: String,
    name: String,
    decimals: u32,
    total_supply: u128,
}

/// Decode a dynamic ABI `string` return: 32-byte offset word (ignored, always 0x20
/// for a single-value return), 32-byte length word, then the UTF-8 payload.
fn decode_abi_string(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 64 {
        return None;
    }
    let len_word = &bytes[32..64];
    let len = u64::from_be_bytes(len_word[24..32].try_into().ok()?) as usize;
    let data = bytes.get(64..64 + len)?;
    String::from_utf8(data.to_vec()).ok()
}

/// Decode a `bytes32`-typed return used by non-conformant RC20 tokens for `symbol`/
/// `name`, trimming trailing NUL padding.
fn decode_bytes32_string(bytes: &[u8]) -> Option<String> {
    let word = bytes.get(0..32)?;
    let trimmed: Vec<u8> = word.iter().copied().take_while(|&b| b != 0).collect();
    String::from_utf8(trimmed).ok()
}

fn decode_u256(bytes: &[u8]) -> Option<u128> {
    let word = bytes.get(0..32)?;
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..32]);
    Some(u128::from_be_bytes(buf))
}
