//! Market snapshot and value types.
//!
//! The engine is a pure transformation over these values: a caller reads an
//! [`Amm`] snapshot from persistent market state, passes it in by value, and
//! receives a new snapshot back. Nothing here is shared or mutated in place.

use serde::{Deserialize, Serialize};

use crate::constants::{PEG_PRECISION, PRICE_PRECISION_I64};
use crate::error::EngineResult;
use crate::math::mul_u128;
use crate::quote;

/// Side of a perp position or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionDirection {
    Long,
    Short,
}

impl PositionDirection {
    pub fn opposite(self) -> Self {
        match self {
            PositionDirection::Long => PositionDirection::Short,
            PositionDirection::Short => PositionDirection::Long,
        }
    }
}

/// Whether a swap adds to or removes from the input reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    Add,
    Remove,
}

/// Which reserve a swap amount is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
    Base,
    Quote,
}

/// Result of the constant-product swap primitive.
///
/// Kept as a named struct: the input/output roles flip between swap-by-base
/// and swap-by-quote call sites and a positional tuple invites transposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutput {
    pub new_input_reserve: u128,
    pub new_output_reserve: u128,
}

/// A hypothetical reserve pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmReserves {
    pub base_asset_reserve: u128,
    pub quote_asset_reserve: u128,
}

/// Long/short spread pair, bid-ask spread precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spread {
    pub long: u32,
    pub short: u32,
}

/// Top-of-book prices, price precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidAsk {
    pub bid: u64,
    pub ask: u64,
}

/// Largest base amount tradable before crossing a limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeToLimit {
    pub base_asset_amount: u128,
    /// Defaults to `Long` when the amount is zero; in that case the trade is
    /// a no-op and the direction carries no signal.
    pub direction: PositionDirection,
}

/// External oracle price datum. The engine never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OraclePriceData {
    /// Oracle price, price precision, signed.
    pub price: i64,
    /// Confidence interval around the price, price precision.
    pub confidence: u64,
    /// Slots since the oracle was last updated.
    pub delay: i64,
    /// Whether the oracle aggregation had enough publishers.
    pub has_sufficient_data_points: bool,
}

impl Default for OraclePriceData {
    fn default() -> Self {
        OraclePriceData {
            price: PRICE_PRECISION_I64,
            confidence: 0,
            delay: 0,
            has_sufficient_data_points: true,
        }
    }
}

/// Immutable snapshot of the virtual AMM backing one perp market.
///
/// Reserves, sqrt_k and exposures are in reserve precision (1e9); the peg is
/// in peg precision (1e6); fee/revenue accumulators are in quote precision
/// (1e6); spreads are in bid-ask spread precision (1e6 = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amm {
    /// `x` reserve of the constant-product formula.
    pub base_asset_reserve: u128,
    /// `y` reserve of the constant-product formula.
    pub quote_asset_reserve: u128,
    /// `sqrt(k)`; stored instead of `k` to limit rounding-error buildup.
    pub sqrt_k: u128,
    /// Scales quote reserves into real-world quote price units.
    pub peg_multiplier: u128,
    /// Quote reserve the curve would hold if the AMM closed its own position.
    pub terminal_quote_asset_reserve: u128,
    /// Net base exposure held by the AMM itself, signed.
    pub base_asset_amount_with_amm: i128,
    /// Soft lower reserve bound used for open-interest estimation.
    pub min_base_asset_reserve: u128,
    /// Soft upper reserve bound used for open-interest estimation.
    pub max_base_asset_reserve: u128,
    /// Minimum quoted spread; also seeds the spread pipeline.
    pub base_spread: u32,
    /// Maximum quoted spread.
    pub max_spread: u32,
    /// Fraction of reserves a single fill may consume (as a divisor).
    pub max_fill_reserve_fraction: u16,
    /// Base order increment.
    pub order_step_size: u64,
    /// 0 disables curve updates entirely.
    pub curve_update_intensity: u8,
    /// Cumulative fee collected by the market.
    pub total_fee: i128,
    /// Cumulative fee collected through the exchange fee schedule.
    pub total_exchange_fee: u128,
    /// Fees net of recognized pnl and pool withdrawals; funds curve updates.
    pub total_fee_minus_distributions: i128,
    /// Fee-pool change since the last funding settlement.
    pub net_revenue_since_last_funding: i64,
    /// Estimated standard deviation of fill prices.
    pub mark_std: u64,
    /// Estimated standard deviation of oracle prices.
    pub oracle_std: u64,
    /// Quote volume of long fills against the AMM (rolling).
    pub long_intensity_volume: u64,
    /// Quote volume of short fills against the AMM (rolling).
    pub short_intensity_volume: u64,
    /// Rolling 24h quote volume.
    pub volume_24h: u64,
    /// Timestamp of the last recorded fill.
    pub last_trade_ts: i64,
    /// Confidence interval pct observed at the last oracle update.
    pub last_oracle_conf_pct: u64,
    /// Stored oracle price twap over the funding period.
    pub last_oracle_price_twap: i64,
    /// Timestamp of the stored oracle twap.
    pub last_oracle_price_twap_ts: i64,
    /// Periodicity of funding settlement, seconds.
    pub funding_period: i64,
}

impl Default for Amm {
    fn default() -> Self {
        Amm {
            base_asset_reserve: 0,
            quote_asset_reserve: 0,
            sqrt_k: 0,
            peg_multiplier: PEG_PRECISION,
            terminal_quote_asset_reserve: 0,
            base_asset_amount_with_amm: 0,
            min_base_asset_reserve: 0,
            max_base_asset_reserve: u128::MAX,
            base_spread: 0,
            max_spread: 0,
            max_fill_reserve_fraction: 1,
            order_step_size: 1,
            curve_update_intensity: 0,
            total_fee: 0,
            total_exchange_fee: 0,
            total_fee_minus_distributions: 0,
            net_revenue_since_last_funding: 0,
            mark_std: 0,
            oracle_std: 0,
            long_intensity_volume: 0,
            short_intensity_volume: 0,
            volume_24h: 0,
            last_trade_ts: 0,
            last_oracle_conf_pct: 0,
            last_oracle_price_twap: PRICE_PRECISION_I64,
            last_oracle_price_twap_ts: 0,
            funding_period: 3600,
        }
    }
}

impl Amm {
    /// The constant-product invariant `sqrt_k²`.
    pub fn invariant(&self) -> EngineResult<u128> {
        mul_u128(self.sqrt_k, self.sqrt_k)
    }

    /// Price implied by the current reserves and peg.
    pub fn reserve_price(&self) -> EngineResult<u64> {
        quote::calculate_price(
            self.quote_asset_reserve,
            self.base_asset_reserve,
            self.peg_multiplier,
        )
    }
}
