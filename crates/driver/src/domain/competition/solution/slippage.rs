use {
    crate::domain::{
        competition::auction::Prices,
        eth,
        liquidity::{ExactOutput, MaxInput},
    },
    ethcontract::U256,
    num::{BigRational, CheckedDiv, CheckedMul},
    number::conversions::big_rational_to_u256,
    shared::conversions::U256Ext,
};

#[derive(Clone)]
pub struct Parameters {
    /// The maximum relative slippage factor.
    pub relative: BigRational,
    /// The maximum absolute slippage in native tokens.
    pub max: Option<eth::U256>,
    /// The minimum absolute slippage in native tokens.
    pub min: Option<eth::U256>,
    pub prices: Prices,
}

#[derive(Debug)]
pub struct Interaction {
    pub input: eth::Asset,
    pub output: eth::Asset,
}

impl Parameters {
    /// Apply the slippage parameters to the given liquidity increasing the in
    /// amount by the appropriate slippage while keeping the out amount the
    /// same.
    pub fn apply_to(
        &self,
        interaction: &Interaction,
    ) -> Result<(MaxInput, ExactOutput), super::error::Math> {
        // It is possible for liquidity to use tokens that don't have prices. In order
        // to handle these cases, we do in order:
        // 1. Compute the capped slippage using the sell token amount
        // 2. If no sell token price is available, compute the capped slippage using the
        //    buy token amount
        // 3. Fall back to using the default relative slippage without capping
        let slippage = if let Some(price) = self.prices.get(&interaction.input.token) {
            let amount = price.in_eth(interaction.input.amount);
            let relative = amount.0.to_big_rational() * &self.relative;
            let relative =
                big_rational_to_u256(&relative).map_err(|_| super::error::Math::DivisionByZero)?;

            // Final slippage considers min/max caps
            let slippage = num::clamp(
                relative,
                self.min.unwrap_or_default(),
                self.max.unwrap_or(U256::max_value()),
            );

            tracing::debug!(
                input_token = ?interaction.input.token,
                ?relative,
                ?slippage,
                "using liquidity input token for capped surplus",
            );

            // Convert back to input token amount
            price.from_eth(eth::Ether(slippage))
        } else if let Some(price) = self.prices.get(&interaction.output.token) {
            let amount = price.in_eth(interaction.output.amount);
            let relative = amount.0.to_big_rational() * &self.relative;
            let relative =
                big_rational_to_u256(&relative).map_err(|_| super::error::Math::DivisionByZero)?;

            // Final slippage considers min/max caps
            let slippage = num::clamp(
                relative,
                self.min.unwrap_or_default(),
                self.max.unwrap_or(U256::max_value()),
            );

            tracing::debug!(
                input_token = ?interaction.input.token,
                ?relative,
                ?slippage,
                "using liquidity output token for capped surplus",
            );

            // Convert back to input token amount
            price
                .from_eth(eth::Ether(slippage))
                .checked_mul(&interaction.input.amount)
                .ok_or(super::error::Math::Overflow)?
                .checked_div(&interaction.output.amount)
                .ok_or(super::error::Math::DivisionByZero)?
        } else {
            tracing::warn!(
                input_token = ?interaction.input.token,
                output_token = ?interaction.output.token,
                "unable to compute capped slippage; falling back to relative slippage",
            );
            let relative = interaction.input.amount.0.to_big_rational() * &self.relative;
            big_rational_to_u256(&relative)
                .map_err(|_| super::error::Math::DivisionByZero)?
                .into()
        };

        tracing::debug!(?interaction, ?slippage, "applying slippage to liquidity",);
        Ok((
            MaxInput(eth::Asset {
                amount: interaction.input.amount + slippage,
                ..interaction.input
            }),
            ExactOutput(interaction.output),
        ))
    }
}
