//! Stateful per-worker indexing strategy for Uniswap-v2-style AMM events.
//!
//! A `Transfer` carries no amount0/amount1 split of its own; a worker correlates it
//! against the `Mint`/`Burn` event that completes it within the same transaction,
//! using a per-transaction queue of pending entries. Dimension rows (Block,
//! Transaction, Token, User, Factory) are created eagerly and idempotently by
//! [`crate::db::repository::Repository`] as a side effect of processing; `Pair` and
//! the fact rows (Mint/Burn/Swap/Transfer/Sync) are returned as [`DomainObject`]s for
//! the commit coordinator to persist in block order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use bigdecimal::BigDecimal;
use num::Zero;

use crate::db::repository::Repository;
use crate::db::schema::{Burn, DomainObject, Mint, Pair, Swap, Sync, Transfer};
use crate::decimal::token_to_decimal;
use crate::error::IndexerError;
use crate::types::ExtendedLogReceipt;

/// Locked forever to the zero address on a pool's first mint; both the amount and
/// the dust Transfer that carries it are excluded from indexed Mint rows.
const MINIMUM_LIQUIDITY: i64 = 1000;

fn arg_address(entry: &ExtendedLogReceipt, name: &str) -> Option<Address> {
    entry.arg(name)?.as_str()?.parse().ok()
}

fn arg_u128(entry: &ExtendedLogReceipt, name: &str) -> Option<u128> {
    entry.arg(name)?.as_str()?.parse().ok()
}

#[derive(Debug, Clone)]
struct PendingMint {
    to: Address,
    liquidity: BigDecimal,
    /// Set once a `Mint` log has supplied amount0/amount1/sender; a dangling
    /// incomplete entry left at tx end is a protocol fee mint folded into the
    /// next real mint.
    fee_to: Option<Address>,
    fee_liquidity: Option<BigDecimal>,
}

#[derive(Debug, Clone)]
struct PendingBurn {
    sender: Option<Address>,
    to: Option<Address>,
    liquidity: BigDecimal,
    needs_complete: bool,
    fee_to: Option<Address>,
    fee_liquidity: Option<BigDecimal>,
}

/// Per-worker stateful event handler. Correlation state never spans a block boundary
/// in practice; [`ExchangeIndexer::reset`] is called by the worker between blocks so
/// a restart never replays a half-finished transaction's pending entries.
pub struct ExchangeIndexer {
    repo: Arc<Repository>,
    factory_address: Address,
    router_address: Option<Address>,
    pair_visibility_timeout: Duration,
    pending_mints: HashMap<B256, Vec<PendingMint>>,
    pending_burns: HashMap<B256, Vec<PendingBurn>>,
}

impl ExchangeIndexer {
    pub fn new(
        repo: Arc<Repository>,
        factory_address: Address,
        router_address: Option<Address>,
        pair_visibility_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            factory_address,
            router_address,
            pair_visibility_timeout,
            pending_mints: HashMap::new(),
            pending_burns: HashMap::new(),
        }
    }

    /// Materializes the anchor block so the first indexed event has a `block_id` to
    /// reference even if it isn't itself a Mint/Burn/Swap.
    pub async fn setup(&mut self, start_block_hash: B256) -> Result<(), IndexerError> {
        self.repo.get_or_create_block(start_block_hash).await?;
        Ok(())
    }

    /// Drop all per-transaction correlation state, logging a diagnostic for any
    /// Mint/Burn that never completed. This is a warning rather than a fatal
    /// condition; it's called by the worker between Jobs, and a transaction's
    /// events never span two Jobs, so nothing legitimate should still be pending
    /// here.
    pub fn reset(&mut self) {
        for (tx_hash, entries) in &self.pending_mints {
            if !entries.is_empty() {
                tracing::warn!(tx_hash = %tx_hash, count = entries.len(), "incomplete mint(s) at reset");
            }
        }
        for (tx_hash, entries) in &self.pending_burns {
            if entries.iter().any(|b| b.needs_complete) {
                tracing::warn!(tx_hash = %tx_hash, "incomplete burn at reset");
            }
        }
        self.pending_mints.clear();
        self.pending_burns.clear();
    }

    pub async fn process(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, IndexerError> {
        if entry.removed {
            return Err(IndexerError::LogRemoved);
        }

        match entry.name.as_str() {
            "PairCreated" => self.handle_pair_created(entry).await,
            "Transfer" => self.handle_transfer(entry).await,
            "Mint" => self.handle_mint(entry).await,
            "Burn" => self.handle_burn(entry).await,
            "Swap" => self.handle_swap(entry).await,
            "Sync" => self.handle_sync(entry).await,
            other => Err(IndexerError::UnknownEvent(other.to_string())),
        }
    }

    async fn handle_pair_created(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, IndexerError> {
        let token0_addr = arg_address(entry, "token0").ok_or(IndexerError::UnknownEvent("PairCreated.token0".into()))?;
        let token1_addr = arg_address(entry, "token1").ok_or(IndexerError::UnknownEvent("PairCreated.token1".into()))?;
        let pair_addr = arg_address(entry, "pair").ok_or(IndexerError::UnknownEvent("PairCreated.pair".into()))?;

        self.repo.get_or_create_factory(self.factory_address).await?;
        let block = self.repo.get_or_create_block(entry.block_hash).await?;
        self.repo.get_or_create_token(token0_addr).await?;
        self.repo.get_or_create_token(token1_addr).await?;

        let pair = Pair {
            id: 0,
            address: pair_addr.to_checksum(None),
            token0_address: token0_addr.to_checksum(None),
            token1_address: token1_addr.to_checksum(None),
            reserve0: BigDecimal::zero(),
            reserve1: BigDecimal::zero(),
            total_supply: BigDecimal::zero(),
            reserve_native: BigDecimal::zero(),
            reserve_usd: BigDecimal::zero(),
            tracked_reserve_native: BigDecimal::zero(),
            token0_price: BigDecimal::zero(),
            token1_price: BigDecimal::zero(),
            volume_token0: BigDecimal::zero(),
            volume_token1: BigDecimal::zero(),
            volume_usd: BigDecimal::zero(),
            untracked_volume_usd: BigDecimal::zero(),
            tx_count: 0,
            created_at_timestamp: block.timestamp,
            created_at_block_number: block.number,
            block_id: block.id,
            liquidity_provider_count: 0,
        };

        self.repo.cache_pair(pair.clone());
        Ok(vec![DomainObject::Pair(pair)])
    }

    async fn current_pair(&self, address: Address) -> Result<Pair, IndexerError> {
        self.repo.load_pair(address, self.pair_visibility_timeout).await
    }

    /// Implements the mint/burn folding the Uniswap v2 subgraph family is known for:
    /// a `Transfer` from the zero address begins (or extends, for the protocol-fee
    /// case) a `Mint`; a `Transfer` to the pair begins a `Burn`; a `Transfer` to the
    /// zero address completes it. The dust transfer that permanently locks the
    /// minimum liquidity to the zero address on a pool's first mint is dropped
    /// outright rather than tracked as a pending mint.
    async fn handle_transfer(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, IndexerError> {
        let from = arg_address(entry, "from").ok_or(IndexerError::UnknownEvent("Transfer.from".into()))?;
        let to = arg_address(entry, "to").ok_or(IndexerError::UnknownEvent("Transfer.to".into()))?;
        let value = arg_u128(entry, "value").ok_or(IndexerError::UnknownEvent("Transfer.value".into()))?;

        if to == Address::ZERO && value == MINIMUM_LIQUIDITY as u128 {
            return Ok(Vec::new());
        }

        let pair_address = entry.address;
        let mut pair = self.current_pair(pair_address).await?;
        let value_dec = token_to_decimal(value, 18);

        let tx = self.repo.get_or_create_transaction(entry.transaction_hash).await?;
        self.repo.get_or_create_user(from).await?;
        self.repo.get_or_create_user(to).await?;

        let mut out = Vec::new();

        if from == Address::ZERO {
            pair.total_supply = &pair.total_supply + &value_dec;

            if to != pair_address {
                let entries = self.pending_mints.entry(entry.transaction_hash).or_default();
                match entries.last_mut() {
                    // A mint already in flight for this tx that hasn't been completed
                    // by a `Mint` log yet is a protocol fee mint; fold it into this
                    // Transfer rather than tracking two separate mints.
                    Some(last) => {
                        let fee_to = last.to;
                        let fee_liquidity = last.liquidity.clone();
                        last.fee_to = Some(fee_to);
                        last.fee_liquidity = Some(fee_liquidity);
                        last.to = to;
                        last.liquidity = value_dec.clone();
                    }
                    None => entries.push(PendingMint { to, liquidity: value_dec.clone(), fee_to: None, fee_liquidity: None }),
                }
            }
        }

        if to == pair_address {
            let entries = self.pending_burns.entry(entry.transaction_hash).or_default();
            entries.push(PendingBurn {
                sender: Some(from),
                to: None,
                liquidity: value_dec.clone(),
                needs_complete: true,
                fee_to: None,
                fee_liquidity: None,
            });
        }

        if to == Address::ZERO && from == pair_address {
            pair.total_supply = &pair.total_supply - &value_dec;

            // A mint still in flight for this tx at the moment supply is burned is a
            // protocol fee mint that never gets its own `Mint` log; attribute it to the
            // burn as a fee instead and drop it.
            let fee = match self.pending_mints.get_mut(&entry.transaction_hash).and_then(|m| m.pop()) {
                Some(pending_mint) => Some((pending_mint.to, pending_mint.liquidity)),
                None => None,
            };

            let entries = self.pending_burns.entry(entry.transaction_hash).or_default();
            match entries.iter_mut().rev().find(|b| b.needs_complete) {
                Some(last) => {
                    last.needs_complete = false;
                    if let Some((fee_to, fee_liquidity)) = fee {
                        last.fee_to = Some(fee_to);
                        last.fee_liquidity = Some(fee_liquidity);
                    }
                }
                None => entries.push(PendingBurn {
                    sender: None,
                    to: None,
                    liquidity: value_dec.clone(),
                    needs_complete: false,
                    fee_to: fee.as_ref().map(|(to, _)| *to),
                    fee_liquidity: fee.map(|(_, liq)| liq),
                }),
            }
        }

        // A Transfer with both endpoints in {zero address, pair address} only ever
        // carries mint/burn bookkeeping already captured above; anything else is a
        // genuine balance movement between two holders and gets its own row.
        let from_internal = from == Address::ZERO || from == pair_address;
        let to_internal = to == Address::ZERO || to == pair_address;
        if !(from_internal && to_internal) {
            out.push(DomainObject::Transfer(Transfer {
                id: 0,
                transaction_id: tx.id,
                pair_address: pair.address.clone(),
                from_address: from.to_checksum(None),
                to_address: to.to_checksum(None),
                value: value_dec.clone(),
                log_index: entry.log_index as i64,
            }));
        }

        self.repo.cache_pair(pair.clone());
        out.push(DomainObject::Pair(pair));
        Ok(out)
    }

    async fn handle_mint(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, IndexerError> {
        let sender = arg_address(entry, "sender").ok_or(IndexerError::UnknownEvent("Mint.sender".into()))?;
        let amount0 = arg_u128(entry, "amount0").ok_or(IndexerError::UnknownEvent("Mint.amount0".into()))?;
        let amount1 = arg_u128(entry, "amount1").ok_or(IndexerError::UnknownEvent("Mint.amount1".into()))?;

        let pair = self.current_pair(entry.address).await?;
        let token0: Address = pair.token0_address.parse().unwrap_or(Address::ZERO);
        let token1: Address = pair.token1_address.parse().unwrap_or(Address::ZERO);
        let token0_row = self.repo.get_or_create_token(token0).await?;
        let token1_row = self.repo.get_or_create_token(token1).await?;

        let tx = self.repo.get_or_create_transaction(entry.transaction_hash).await?;

        let entries = self.pending_mints.entry(entry.transaction_hash).or_default();
        let pending = match entries.pop() {
            Some(p) => p,
            None => return Ok(Vec::new()),
        };

        let amount0_dec = token_to_decimal(amount0, token0_row.decimals as u32);
        let amount1_dec = token_to_decimal(amount1, token1_row.decimals as u32);

        let mint = Mint {
            id: 0,
            transaction_id: tx.id,
            pair_address: pair.address.clone(),
            timestamp: tx.timestamp,
            sender: Some(sender.to_checksum(None)),
            amount0: amount0_dec,
            amount1: amount1_dec,
            to_address: pending.to.to_checksum(None),
            liquidity: pending.liquidity,
            log_index: Some(entry.log_index as i64),
            amount_usd: BigDecimal::zero(),
            fee_to: pending.fee_to.map(|a| a.to_checksum(None)),
            fee_liquidity: pending.fee_liquidity,
        };

        Ok(vec![DomainObject::Mint(mint)])
    }

    async fn handle_burn(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, IndexerError> {
        let amount0 = arg_u128(entry, "amount0").ok_or(IndexerError::UnknownEvent("Burn.amount0".into()))?;
        let amount1 = arg_u128(entry, "amount1").ok_or(IndexerError::UnknownEvent("Burn.amount1".into()))?;
        let to = arg_address(entry, "to").ok_or(IndexerError::UnknownEvent("Burn.to".into()))?;

        let pair = self.current_pair(entry.address).await?;
        let token0: Address = pair.token0_address.parse().unwrap_or(Address::ZERO);
        let token1: Address = pair.token1_address.parse().unwrap_or(Address::ZERO);
        let token0_row = self.repo.get_or_create_token(token0).await?;
        let token1_row = self.repo.get_or_create_token(token1).await?;

        let tx = self.repo.get_or_create_transaction(entry.transaction_hash).await?;

        let entries = self.pending_burns.entry(entry.transaction_hash).or_default();
        // The completed placeholder is whichever entry most recently had
        // `needs_complete` cleared by its closing Transfer, not necessarily the last
        // one pushed if several burns overlap within the same transaction.
        let pending = match entries.iter().rposition(|b| !b.needs_complete) {
            Some(idx) => entries.remove(idx),
            None => return Ok(Vec::new()),
        };

        let amount0_dec = token_to_decimal(amount0, token0_row.decimals as u32);
        let amount1_dec = token_to_decimal(amount1, token1_row.decimals as u32);

        let burn = Burn {
            id: 0,
            transaction_id: tx.id,
            pair_address: pair.address.clone(),
            timestamp: tx.timestamp,
            sender: pending.sender.map(|a| a.to_checksum(None)),
            amount0: amount0_dec,
            amount1: amount1_dec,
            to_address: Some(to.to_checksum(None)),
            liquidity: pending.liquidity,
            log_index: Some(entry.log_index as i64),
            amount_usd: BigDecimal::zero(),
            needs_complete: pending.needs_complete,
            fee_to: pending.fee_to.map(|a| a.to_checksum(None)),
            fee_liquidity: pending.fee_liquidity,
        };

        Ok(vec![DomainObject::Burn(burn)])
    }

    /// Rewrites `to` back to the originating EOA when both `sender` and `to` are the
    /// router, the classic two-hop "router calls itself" pattern that otherwise
    /// attributes a swap's proceeds to the router contract instead of the trader.
    async fn handle_swap(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, IndexerError> {
        let sender = arg_address(entry, "sender").ok_or(IndexerError::UnknownEvent("Swap.sender".into()))?;
        let mut to = arg_address(entry, "to").ok_or(IndexerError::UnknownEvent("Swap.to".into()))?;
        let amount0_in = arg_u128(entry, "amount0In").unwrap_or(0);
        let amount1_in = arg_u128(entry, "amount1In").unwrap_or(0);
        let amount0_out = arg_u128(entry, "amount0Out").unwrap_or(0);
        let amount1_out = arg_u128(entry, "amount1Out").unwrap_or(0);

        let mut pair = self.current_pair(entry.address).await?;
        let token0: Address = pair.token0_address.parse().unwrap_or(Address::ZERO);
        let token1: Address = pair.token1_address.parse().unwrap_or(Address::ZERO);
        let token0_row = self.repo.get_or_create_token(token0).await?;
        let token1_row = self.repo.get_or_create_token(token1).await?;

        let tx = self.repo.get_or_create_transaction(entry.transaction_hash).await?;

        if let Some(router) = self.router_address {
            if sender == router && to == router {
                to = tx.from_address.parse().unwrap_or(to);
            }
        }

        let amount0_in_dec = token_to_decimal(amount0_in, token0_row.decimals as u32);
        let amount1_in_dec = token_to_decimal(amount1_in, token1_row.decimals as u32);
        let amount0_out_dec = token_to_decimal(amount0_out, token0_row.decimals as u32);
        let amount1_out_dec = token_to_decimal(amount1_out, token1_row.decimals as u32);

        pair.volume_token0 = &pair.volume_token0 + (&amount0_in_dec + &amount0_out_dec);
        pair.volume_token1 = &pair.volume_token1 + (&amount1_in_dec + &amount1_out_dec);
        pair.tx_count += 1;

        let swap = Swap {
            id: 0,
            transaction_id: tx.id,
            pair_address: pair.address.clone(),
            timestamp: tx.timestamp,
            sender: sender.to_checksum(None),
            from_address: tx.from_address.clone(),
            amount0_in: amount0_in_dec,
            amount1_in: amount1_in_dec,
            amount0_out: amount0_out_dec,
            amount1_out: amount1_out_dec,
            to_address: to.to_checksum(None),
            log_index: entry.log_index as i64,
            amount_usd: BigDecimal::zero(),
        };

        self.repo.cache_pair(pair.clone());
        Ok(vec![DomainObject::Pair(pair), DomainObject::Swap(swap)])
    }

    /// Rescales `pair.reserve0`/`reserve1` to the synced values; the primary trigger
    /// for a new `Bundle` in the downstream price stage.
    async fn handle_sync(&mut self, entry: &ExtendedLogReceipt) -> Result<Vec<DomainObject>, IndexerError> {
        let reserve0 = arg_u128(entry, "reserve0").ok_or(IndexerError::UnknownEvent("Sync.reserve0".into()))?;
        let reserve1 = arg_u128(entry, "reserve1").ok_or(IndexerError::UnknownEvent("Sync.reserve1".into()))?;

        let mut pair = self.current_pair(entry.address).await?;
        let token0: Address = pair.token0_address.parse().unwrap_or(Address::ZERO);
        let token1: Address = pair.token1_address.parse().unwrap_or(Address::ZERO);
        let token0_row = self.repo.get_or_create_token(token0).await?;
        let token1_row = self.repo.get_or_create_token(token1).await?;

        let tx = self.repo.get_or_create_transaction(entry.transaction_hash).await?;

        pair.reserve0 = token_to_decimal(reserve0, token0_row.decimals as u32);
        pair.reserve1 = token_to_decimal(reserve1, token1_row.decimals as u32);

        let sync = Sync {
            id: 0,
            transaction_id: tx.id,
            pair_address: pair.address.clone(),
            reserve0: pair.reserve0.clone(),
            reserve1: pair.reserve1.clone(),
            log_index: entry.log_index as i64,
        };

        self.repo.cache_pair(pair.clone());
        Ok(vec![DomainObject::Pair(pair), DomainObject::Sync(sync)])
    }
}
