//! This module defines Solution as originated from a mined transaction
//! calldata.

use {
    self::trade::Trade,
    crate::domain::{
        auction::{self},
        competition,
        eth,
        fee,
        OrderUid,
    },
    std::collections::HashMap,
};

mod tokenized;
mod trade;
pub use error::Error;

/// A solution that was executed on-chain.
///
/// Contains only data observable on-chain. No off-chain data is used to create
/// this struct.
///
/// Referenced as [`settlement::Solution`] in the codebase.
#[derive(Debug)]
pub struct Solution {
    trades: Vec<Trade>,
    /// Data that was appended to the regular call data of the `settle()` call
    /// as a form of on-chain meta data. This is used to associate a
    /// solution with an auction for which this solution was picked as a winner.
    auction_id: auction::Id,
}

impl Solution {
    pub fn auction_id(&self) -> auction::Id {
        self.auction_id
    }

    pub fn score(
        &self,
        prices: &auction::Prices,
        policies: &HashMap<OrderUid, Vec<fee::Policy>>,
    ) -> Result<competition::Score, error::Score> {
        let score = self
            .trades
            .iter()
            .map(|trade| {
                trade.score(
                    prices,
                    policies
                        .get(trade.order_uid())
                        .map(|value| value.as_slice())
                        .unwrap_or_default(),
                )
            })
            .sum::<Result<eth::Ether, trade::Error>>()?;
        Ok(competition::Score::new(score)?)
    }

    pub fn native_surplus(&self, prices: &auction::Prices) -> Result<eth::Ether, trade::Error> {
        self.trades
            .iter()
            .map(|trade| trade.native_surplus(prices))
            .sum()
    }

    pub fn native_fee(&self, prices: &auction::Prices) -> Result<eth::Ether, trade::Error> {
        self.trades
            .iter()
            .map(|trade| trade.native_fee(prices))
            .sum()
    }

    pub fn new(
        calldata: &eth::Calldata,
        domain_separator: &eth::DomainSeparator,
    ) -> Result<Self, Error> {
        let tokenized::Tokenized {
            tokens,
            clearing_prices,
            trades: decoded_trades,
            interactions: _interactions,
            auction_id,
        } = tokenized::Tokenized::new(calldata)?;

        let mut trades = Vec::with_capacity(decoded_trades.len());
        for trade in decoded_trades {
            let flags = tokenized::TradeFlags(trade.8);
            let sell_token_index = trade.0.as_usize();
            let buy_token_index = trade.1.as_usize();
            let sell_token = tokens[sell_token_index];
            let buy_token = tokens[buy_token_index];
            let uniform_sell_token_index = tokens
                .iter()
                .position(|token| token == &sell_token)
                .unwrap();
            let uniform_buy_token_index =
                tokens.iter().position(|token| token == &buy_token).unwrap();
            trades.push(trade::Trade::new(
                tokenized::order_uid(&trade, &tokens, domain_separator)
                    .map_err(|err| Error::OrderUidRecover(err, auction_id))?,
                eth::Asset {
                    token: sell_token.into(),
                    amount: trade.3.into(),
                },
                eth::Asset {
                    token: buy_token.into(),
                    amount: trade.4.into(),
                },
                flags.side(),
                trade.9.into(),
                trade::Prices {
                    uniform: trade::ClearingPrices {
                        sell: clearing_prices[uniform_sell_token_index],
                        buy: clearing_prices[uniform_buy_token_index],
                    },
                    custom: trade::ClearingPrices {
                        sell: clearing_prices[sell_token_index],
                        buy: clearing_prices[buy_token_index],
                    },
                },
            ));
        }

        Ok(Self { trades, auction_id })
    }
}

pub mod error {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error(transparent)]
        Decoding(#[from] tokenized::error::Decoding),
        #[error("failed to recover order uid {0} for auction {1}")]
        OrderUidRecover(tokenized::error::Uid, auction::Id),
    }

    #[derive(Debug, thiserror::Error)]
    pub enum Score {
        /// Per CIP38, zero score solutions are rejected.
        #[error(transparent)]
        Zero(#[from] competition::ZeroScore),
        /// Score calculation requires native prices for all tokens in the
        /// solution, so that the surplus can be normalized to native currency.
        #[error("missing native price for token {0:?}")]
        MissingPrice(eth::TokenAddress),
        #[error(transparent)]
        Math(trade::error::Math),
    }

    impl From<trade::Error> for Score {
        fn from(err: trade::Error) -> Self {
            match err {
                trade::Error::MissingPrice(token) => Self::MissingPrice(token),
                trade::Error::Math(err) => Self::Math(err),
            }
        }
    }
}
