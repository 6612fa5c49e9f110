//! Dynamic long/short spread pipeline.
//!
//! The pipeline seeds both sides from volatility, then widens the side that
//! would push the mark away from the oracle, scales the exposed side by
//! inventory skew and effective leverage, adds the revenue retreat, and
//! finally caps the pair so it sums to at most the target spread.
//!
//! All reserve/price inputs stay in scaled integers; floating point is
//! confined to the dimensionless leverage factor and floored back into
//! integer spread units.

use std::cmp::Ordering;

use crate::constants::{
    AMM_TO_QUOTE_PRECISION_RATIO_I128, BID_ASK_SPREAD_PRECISION_I128,
    BID_ASK_SPREAD_PRECISION_U128, DEFAULT_LARGE_SPREAD_FACTOR,
    DEFAULT_REVENUE_SINCE_LAST_FUNDING_SPREAD_RETREAT, MAX_BID_ASK_INVENTORY_SKEW_FACTOR,
    PEG_PRECISION_I128, PERCENTAGE_PRECISION, PRICE_PRECISION_I128,
};
use crate::error::{EngineError, EngineResult};
use crate::math::{cast_u32, cast_u64, div_ceil_u128, div_i128, div_u128, mul_i128, mul_u128};
use crate::oracle;
use crate::quote;
use crate::state::{Amm, AmmReserves, OraclePriceData, Spread};

/// Volatility component of the spread for each side, spread precision.
///
/// Blends mark and oracle standard deviation into a pct of the reserve
/// price, floors it at the oracle confidence interval, then scales each side
/// by its trade-intensity share of 24h volume clamped to [1%, 160%].
pub fn calculate_vol_spread(
    last_oracle_conf_pct: u64,
    reserve_price: u64,
    mark_std: u64,
    oracle_std: u64,
    long_intensity_volume: u64,
    short_intensity_volume: u64,
    volume_24h: u64,
) -> EngineResult<(u64, u64)> {
    if reserve_price == 0 {
        return Err(EngineError::DivisionByZero);
    }

    let market_avg_std_pct = (u128::from(mark_std) + u128::from(oracle_std))
        * PERCENTAGE_PRECISION
        / u128::from(reserve_price)
        / 2;
    let vol_spread = u128::from(last_oracle_conf_pct).max(market_avg_std_pct / 2);

    let factor_clamp_min = PERCENTAGE_PRECISION / 100; // 1%
    let factor_clamp_max = PERCENTAGE_PRECISION * 16 / 10; // 160%

    let long_vol_spread_factor = (u128::from(long_intensity_volume) * PERCENTAGE_PRECISION
        / u128::from(volume_24h.max(1)))
    .clamp(factor_clamp_min, factor_clamp_max);
    let short_vol_spread_factor = (u128::from(short_intensity_volume) * PERCENTAGE_PRECISION
        / u128::from(volume_24h.max(1)))
    .clamp(factor_clamp_min, factor_clamp_max);

    let long_vol_spread = u128::from(last_oracle_conf_pct)
        .max(vol_spread * long_vol_spread_factor / PERCENTAGE_PRECISION);
    let short_vol_spread = u128::from(last_oracle_conf_pct)
        .max(vol_spread * short_vol_spread_factor / PERCENTAGE_PRECISION);

    Ok((cast_u64(long_vol_spread)?, cast_u64(short_vol_spread)?))
}

/// Net AMM exposure as a share of the thinner side's open-interest capacity,
/// percentage precision, capped at 100%.
///
/// The exposure is weighted by its own magnitude relative to one reserve
/// unit, so inventories beyond a unit count super-linearly.
pub fn calculate_inventory_liquidity_ratio(
    base_asset_amount_with_amm: i128,
    base_asset_reserve: u128,
    min_base_asset_reserve: u128,
    max_base_asset_reserve: u128,
) -> EngineResult<u128> {
    let (open_bids, open_asks) = quote::calculate_market_open_bids_asks(
        base_asset_reserve,
        min_base_asset_reserve,
        max_base_asset_reserve,
    )?;
    let min_side_liquidity = open_bids
        .unsigned_abs()
        .min(open_asks.unsigned_abs())
        .max(1);

    let exposure = base_asset_amount_with_amm.unsigned_abs();
    let base_unit = crate::constants::AMM_RESERVE_PRECISION;
    let weighted_exposure = div_u128(mul_u128(exposure, exposure.max(base_unit))?, base_unit)?;

    Ok(div_u128(
        mul_u128(weighted_exposure, PERCENTAGE_PRECISION)?,
        min_side_liquidity,
    )?
    .min(PERCENTAGE_PRECISION))
}

/// Spread multiplier for inventory skew, spread precision (1e6 = neutral).
///
/// Zero exposure returns exactly the neutral factor. Otherwise the factor
/// grows with the liquidity ratio and is capped at the larger of 10x and
/// `(max_spread / 2) / directional_spread`.
pub fn calculate_inventory_scale(
    base_asset_amount_with_amm: i128,
    base_asset_reserve: u128,
    min_base_asset_reserve: u128,
    max_base_asset_reserve: u128,
    directional_spread: u128,
    max_spread: u128,
) -> EngineResult<u128> {
    if base_asset_amount_with_amm == 0 {
        return Ok(BID_ASK_SPREAD_PRECISION_U128);
    }

    let liquidity_ratio = calculate_inventory_liquidity_ratio(
        base_asset_amount_with_amm,
        base_asset_reserve,
        min_base_asset_reserve,
        max_base_asset_reserve,
    )?;

    let scale_cap = u128::from(MAX_BID_ASK_INVENTORY_SKEW_FACTOR).max(div_u128(
        mul_u128(max_spread / 2, BID_ASK_SPREAD_PRECISION_U128)?,
        directional_spread.max(1),
    )?);

    let scale = scale_cap.min(
        BID_ASK_SPREAD_PRECISION_U128
            + div_u128(mul_u128(scale_cap, liquidity_ratio)?, PERCENTAGE_PRECISION)?,
    );

    Ok(scale)
}

/// How exposed the fee buffer is relative to the AMM's net position value.
///
/// Compares the terminal-vs-current net curve value against the local value
/// of the AMM's own exposure, normalized by the available fee buffer. The
/// result is a dimensionless factor and the one place floating point is
/// allowed.
pub fn calculate_effective_leverage(
    quote_asset_reserve: u128,
    terminal_quote_asset_reserve: u128,
    peg_multiplier: u128,
    base_asset_amount_with_amm: i128,
    reserve_price: u64,
    total_fee_minus_distributions: i128,
) -> EngineResult<f64> {
    let quote = i128::try_from(quote_asset_reserve).map_err(|_| EngineError::MathOverflow)?;
    let terminal =
        i128::try_from(terminal_quote_asset_reserve).map_err(|_| EngineError::MathOverflow)?;
    let peg = i128::try_from(peg_multiplier).map_err(|_| EngineError::MathOverflow)?;

    let net_base_asset_value = div_i128(
        mul_i128(quote - terminal, peg)?,
        AMM_TO_QUOTE_PRECISION_RATIO_I128 * PEG_PRECISION_I128,
    )?;

    let local_base_asset_value = div_i128(
        mul_i128(base_asset_amount_with_amm, i128::from(reserve_price))?,
        AMM_TO_QUOTE_PRECISION_RATIO_I128 * PRICE_PRECISION_I128,
    )?;

    let effective_gap = (local_base_asset_value - net_base_asset_value).max(0);

    Ok(effective_gap as f64 / (total_fee_minus_distributions.max(0) as f64 + 1.0))
}

fn cap_to_max_spread(
    mut long_spread: u128,
    mut short_spread: u128,
    max_target_spread: u128,
) -> EngineResult<(u128, u128)> {
    let total_spread = long_spread + short_spread;

    if total_spread > max_target_spread {
        // shrink the larger side with ceiling division so the pair sums to
        // the cap exactly
        if long_spread > short_spread {
            long_spread = div_ceil_u128(mul_u128(long_spread, max_target_spread)?, total_spread)?;
            short_spread = max_target_spread - long_spread;
        } else {
            short_spread = div_ceil_u128(mul_u128(short_spread, max_target_spread)?, total_spread)?;
            long_spread = max_target_spread - short_spread;
        }
    }

    Ok((long_spread, short_spread))
}

/// Full spread pipeline over explicit inputs. See the module docs for the
/// step order; [`calculate_live_spread`] derives the inputs from a snapshot.
#[allow(clippy::too_many_arguments)]
pub fn calculate_spread(
    base_spread: u32,
    last_oracle_reserve_price_spread_pct: i64,
    last_oracle_conf_pct: u64,
    max_spread: u32,
    quote_asset_reserve: u128,
    terminal_quote_asset_reserve: u128,
    peg_multiplier: u128,
    base_asset_amount_with_amm: i128,
    reserve_price: u64,
    total_fee_minus_distributions: i128,
    net_revenue_since_last_funding: i64,
    base_asset_reserve: u128,
    min_base_asset_reserve: u128,
    max_base_asset_reserve: u128,
    mark_std: u64,
    oracle_std: u64,
    long_intensity_volume: u64,
    short_intensity_volume: u64,
    volume_24h: u64,
) -> EngineResult<Spread> {
    let (long_vol_spread, short_vol_spread) = calculate_vol_spread(
        last_oracle_conf_pct,
        reserve_price,
        mark_std,
        oracle_std,
        long_intensity_volume,
        short_intensity_volume,
        volume_24h,
    )?;

    let mut long_spread = u128::from(base_spread / 2).max(u128::from(long_vol_spread));
    let mut short_spread = u128::from(base_spread / 2).max(u128::from(short_vol_spread));

    let max_target_spread = u128::from(max_spread)
        .max(u128::from(last_oracle_reserve_price_spread_pct.unsigned_abs()));

    // oracle retreat: widen the side that moves the mark away from the oracle
    match last_oracle_reserve_price_spread_pct.cmp(&0) {
        Ordering::Greater => {
            short_spread = short_spread.max(
                u128::from(last_oracle_reserve_price_spread_pct.unsigned_abs())
                    + u128::from(short_vol_spread),
            );
        }
        Ordering::Less => {
            long_spread = long_spread.max(
                u128::from(last_oracle_reserve_price_spread_pct.unsigned_abs())
                    + u128::from(long_vol_spread),
            );
        }
        Ordering::Equal => {}
    }

    // inventory skew on the exposed side
    let directional_spread = if base_asset_amount_with_amm >= 0 {
        long_spread
    } else {
        short_spread
    };
    let inventory_scale = calculate_inventory_scale(
        base_asset_amount_with_amm,
        base_asset_reserve,
        min_base_asset_reserve,
        max_base_asset_reserve,
        directional_spread,
        max_target_spread,
    )?;

    match base_asset_amount_with_amm.cmp(&0) {
        Ordering::Greater => {
            long_spread = div_u128(
                mul_u128(long_spread, inventory_scale)?,
                BID_ASK_SPREAD_PRECISION_U128,
            )?;
        }
        Ordering::Less => {
            short_spread = div_u128(
                mul_u128(short_spread, inventory_scale)?,
                BID_ASK_SPREAD_PRECISION_U128,
            )?;
        }
        Ordering::Equal => {}
    }

    if total_fee_minus_distributions > 0 {
        let effective_leverage = calculate_effective_leverage(
            quote_asset_reserve,
            terminal_quote_asset_reserve,
            peg_multiplier,
            base_asset_amount_with_amm,
            reserve_price,
            total_fee_minus_distributions,
        )?;
        let leverage_scale = (1.0 + effective_leverage).min(DEFAULT_LARGE_SPREAD_FACTOR as f64);

        match base_asset_amount_with_amm.cmp(&0) {
            Ordering::Greater => {
                long_spread = (long_spread as f64 * leverage_scale) as u128;
            }
            Ordering::Less => {
                short_spread = (short_spread as f64 * leverage_scale) as u128;
            }
            Ordering::Equal => {}
        }
    } else {
        // fee buffer depleted: protective widening on both sides
        long_spread = mul_u128(long_spread, u128::from(DEFAULT_LARGE_SPREAD_FACTOR))?;
        short_spread = mul_u128(short_spread, u128::from(DEFAULT_LARGE_SPREAD_FACTOR))?;
    }

    // revenue retreat
    if net_revenue_since_last_funding < DEFAULT_REVENUE_SINCE_LAST_FUNDING_SPREAD_RETREAT {
        let max_retreat = max_target_spread / 10;
        let revenue_retreat = if net_revenue_since_last_funding
            >= DEFAULT_REVENUE_SINCE_LAST_FUNDING_SPREAD_RETREAT.saturating_mul(1000)
        {
            max_retreat.min(div_u128(
                mul_u128(
                    u128::from(base_spread),
                    u128::from(net_revenue_since_last_funding.unsigned_abs()),
                )?,
                u128::from(DEFAULT_REVENUE_SINCE_LAST_FUNDING_SPREAD_RETREAT.unsigned_abs()),
            )?)
        } else {
            max_retreat
        };

        match base_asset_amount_with_amm.cmp(&0) {
            Ordering::Greater => {
                long_spread += revenue_retreat;
                short_spread += revenue_retreat / 2;
            }
            Ordering::Less => {
                long_spread += revenue_retreat / 2;
                short_spread += revenue_retreat;
            }
            Ordering::Equal => {
                long_spread += revenue_retreat / 2;
                short_spread += revenue_retreat / 2;
            }
        }
    }

    let (long_spread, short_spread) =
        cap_to_max_spread(long_spread, short_spread, max_target_spread)?;

    Ok(Spread {
        long: cast_u32(u64::try_from(long_spread).map_err(|_| EngineError::MathOverflow)?)?,
        short: cast_u32(u64::try_from(short_spread).map_err(|_| EngineError::MathOverflow)?)?,
    })
}

/// Spread for a snapshot against a live oracle update.
///
/// A zero base spread or disabled curve updates short-circuit to a flat
/// half-base-spread on both sides.
pub fn calculate_live_spread(
    amm: &Amm,
    oracle: &OraclePriceData,
    now: i64,
) -> EngineResult<Spread> {
    if amm.base_spread == 0 || amm.curve_update_intensity == 0 {
        return Ok(Spread {
            long: amm.base_spread / 2,
            short: amm.base_spread / 2,
        });
    }

    let reserve_price = amm.reserve_price()?;
    let oracle_reserve_price_spread_pct =
        oracle::calculate_oracle_reserve_price_spread_pct(reserve_price, oracle.price)?;
    let live_oracle_std = oracle::calculate_live_oracle_std(amm, oracle, now)?;
    let conf_pct = oracle::calculate_new_oracle_conf_pct(amm, oracle, reserve_price, now)?;

    calculate_spread(
        amm.base_spread,
        oracle_reserve_price_spread_pct,
        conf_pct,
        amm.max_spread,
        amm.quote_asset_reserve,
        amm.terminal_quote_asset_reserve,
        amm.peg_multiplier,
        amm.base_asset_amount_with_amm,
        reserve_price,
        amm.total_fee_minus_distributions,
        amm.net_revenue_since_last_funding,
        amm.base_asset_reserve,
        amm.min_base_asset_reserve,
        amm.max_base_asset_reserve,
        amm.mark_std,
        live_oracle_std,
        amm.long_intensity_volume,
        amm.short_intensity_volume,
        amm.volume_24h,
    )
}

/// Hypothetical top-of-book reserve pairs `(bid, ask)` for a snapshot.
///
/// Each side shifts the quote reserve by `quote / (SPREAD_PRECISION /
/// (spread / 2))` (added on the ask side, subtracted on the bid side) and
/// rederives the base reserve from the invariant, so `sqrt_k²` holds on the
/// synthetic pair. Never persisted.
pub fn calculate_spread_reserves(
    amm: &Amm,
    oracle: &OraclePriceData,
    now: i64,
) -> EngineResult<(AmmReserves, AmmReserves)> {
    fn spread_reserve(amm: &Amm, spread: i64) -> EngineResult<AmmReserves> {
        if spread == 0 {
            return Ok(AmmReserves {
                base_asset_reserve: amm.base_asset_reserve,
                quote_asset_reserve: amm.quote_asset_reserve,
            });
        }

        let mut half_spread = spread / 2;
        if half_spread == 0 {
            half_spread = if spread >= 0 { 1 } else { -1 };
        }

        let divisor = BID_ASK_SPREAD_PRECISION_I128 / i128::from(half_spread);
        if divisor == 0 {
            return Err(EngineError::DivisionByZero);
        }
        let quote_asset_reserve_delta =
            i128::try_from(amm.quote_asset_reserve).map_err(|_| EngineError::MathOverflow)?
                / divisor;

        let quote_asset_reserve = if quote_asset_reserve_delta >= 0 {
            amm.quote_asset_reserve
                .checked_add(quote_asset_reserve_delta.unsigned_abs())
                .ok_or(EngineError::MathOverflow)?
        } else {
            amm.quote_asset_reserve
                .checked_sub(quote_asset_reserve_delta.unsigned_abs())
                .ok_or(EngineError::MathOverflow)?
        };

        let base_asset_reserve = div_u128(amm.invariant()?, quote_asset_reserve)?;

        Ok(AmmReserves {
            base_asset_reserve,
            quote_asset_reserve,
        })
    }

    let spread = calculate_live_spread(amm, oracle, now)?;
    let ask_reserves = spread_reserve(amm, i64::from(spread.long))?;
    let bid_reserves = spread_reserve(amm, -i64::from(spread.short))?;

    Ok((bid_reserves, ask_reserves))
}
