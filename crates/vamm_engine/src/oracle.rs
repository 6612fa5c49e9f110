//! Oracle-derived inputs: live twap/std estimates, confidence decay, and the
//! validity gate callers use before trusting a price update.

use std::cmp::{max, min};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{BID_ASK_SPREAD_PRECISION, PERCENTAGE_PRECISION_I128};
use crate::error::{EngineError, EngineResult};
use crate::math::cast_u64;
use crate::state::{Amm, OraclePriceData};

/// Staleness / confidence / volatility bounds for accepting an oracle update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityGuardRails {
    /// Max slots since the last oracle update.
    pub slots_before_stale: i64,
    /// Max confidence interval as a pct of price, spread precision.
    pub confidence_interval_max_size: u64,
    /// Max ratio between the oracle price and its stored twap.
    pub too_volatile_ratio: i64,
}

impl Default for ValidityGuardRails {
    fn default() -> Self {
        ValidityGuardRails {
            slots_before_stale: 10,
            confidence_interval_max_size: 20_000, // 2%
            too_volatile_ratio: 5,
        }
    }
}

/// Divergence bound between the oracle and the reserve price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDivergenceGuardRails {
    /// Max |oracle - reserve| as a pct of reserve price, percentage precision.
    pub mark_oracle_divergence_pct: i64,
}

impl Default for PriceDivergenceGuardRails {
    fn default() -> Self {
        PriceDivergenceGuardRails {
            mark_oracle_divergence_pct: (PERCENTAGE_PRECISION_I128 / 10) as i64, // 10%
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OracleGuardRails {
    pub price_divergence: PriceDivergenceGuardRails,
    pub validity: ValidityGuardRails,
}

/// Assessment of one oracle update against a market snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleStatus {
    pub price_data: OraclePriceData,
    pub oracle_reserve_price_spread_pct: i64,
    pub is_valid: bool,
    pub mark_too_divergent: bool,
}

/// Oracle twap blended forward to `now`, clamping the live price to one third
/// of the stored twap to bound single-update jumps.
pub fn calculate_live_oracle_twap(
    amm: &Amm,
    oracle: &OraclePriceData,
    now: i64,
    period: i64,
) -> EngineResult<i64> {
    let twap = amm.last_oracle_price_twap;
    let since_last = max(1, now - amm.last_oracle_price_twap_ts);
    let since_start = max(0, period - since_last);

    let clamp_range = twap / 3;
    let clamped_price = min(twap + clamp_range, max(oracle.price, twap - clamp_range));

    let blended = (i128::from(twap) * i128::from(since_start)
        + i128::from(clamped_price) * i128::from(since_last))
        / i128::from(since_start + since_last);

    i64::try_from(blended).map_err(|_| EngineError::MathOverflow)
}

/// Decayed running estimate of oracle price volatility: the live deviation
/// from the forward twap plus the stored std decayed by elapsed time over the
/// funding period.
pub fn calculate_live_oracle_std(
    amm: &Amm,
    oracle: &OraclePriceData,
    now: i64,
) -> EngineResult<u64> {
    let since_last = max(1, now - amm.last_oracle_price_twap_ts);
    let since_start = max(0, amm.funding_period - since_last);

    let live_twap = calculate_live_oracle_twap(amm, oracle, now, amm.funding_period)?;
    let price_delta = oracle
        .price
        .checked_sub(live_twap)
        .ok_or(EngineError::MathOverflow)?
        .unsigned_abs();

    let decayed = u128::from(amm.oracle_std) * u128::from(since_start as u64)
        / u128::from((since_start + since_last) as u64);

    price_delta
        .checked_add(decayed as u64)
        .ok_or(EngineError::MathOverflow)
}

/// Confidence interval as a pct of the reserve price, floored by the previous
/// observation decayed toward zero (faster with staleness) so the spread does
/// not collapse on a single tight print.
pub fn calculate_new_oracle_conf_pct(
    amm: &Amm,
    oracle: &OraclePriceData,
    reserve_price: u64,
    now: i64,
) -> EngineResult<u64> {
    let upper_bound_divisor = 21_u64;
    let lower_bound_divisor = 5_u64;

    let since_last = max(0, now - amm.last_oracle_price_twap_ts) as u64;

    let confidence_lower_bound = if since_last > 0 {
        let divisor = upper_bound_divisor
            .saturating_sub(since_last)
            .max(lower_bound_divisor);
        amm.last_oracle_conf_pct - amm.last_oracle_conf_pct / divisor
    } else {
        amm.last_oracle_conf_pct
    };

    if reserve_price == 0 {
        return Err(EngineError::DivisionByZero);
    }
    let conf_pct = cast_u64(
        u128::from(oracle.confidence) * u128::from(BID_ASK_SPREAD_PRECISION)
            / u128::from(reserve_price),
    )?;

    Ok(conf_pct.max(confidence_lower_bound))
}

/// `(oracle - reserve)` as a signed pct of the reserve price.
pub fn calculate_oracle_reserve_price_spread_pct(
    reserve_price: u64,
    oracle_price: i64,
) -> EngineResult<i64> {
    if reserve_price == 0 {
        return Err(EngineError::DivisionByZero);
    }
    let delta = i128::from(oracle_price) - i128::from(reserve_price);
    let pct = delta * PERCENTAGE_PRECISION_I128 / i128::from(reserve_price);
    i64::try_from(pct).map_err(|_| EngineError::MathOverflow)
}

pub fn is_oracle_mark_too_divergent(
    oracle_reserve_price_spread_pct: i64,
    rails: &PriceDivergenceGuardRails,
) -> bool {
    oracle_reserve_price_spread_pct.unsigned_abs()
        > rails.mark_oracle_divergence_pct.unsigned_abs()
}

/// Whether an oracle update is usable for pricing at all.
pub fn is_oracle_valid(
    amm: &Amm,
    oracle: &OraclePriceData,
    rails: &ValidityGuardRails,
) -> EngineResult<bool> {
    if oracle.price <= 0 {
        warn!("oracle rejected: non-positive price {}", oracle.price);
        return Ok(false);
    }

    let twap = amm.last_oracle_price_twap;
    let is_too_volatile =
        oracle.price.max(twap) / oracle.price.min(twap).max(1) > rails.too_volatile_ratio;

    let conf_pct_of_price = cast_u64(
        u128::from(oracle.confidence.max(1)) * u128::from(BID_ASK_SPREAD_PRECISION)
            / u128::from(oracle.price.unsigned_abs()),
    )?;
    let is_conf_too_large = conf_pct_of_price > rails.confidence_interval_max_size;

    let is_stale = oracle.delay > rails.slots_before_stale;

    let valid = !(is_stale
        || !oracle.has_sufficient_data_points
        || is_too_volatile
        || is_conf_too_large);
    if !valid {
        warn!(
            "oracle rejected: stale={} sufficient={} volatile={} conf_pct={}",
            is_stale, oracle.has_sufficient_data_points, is_too_volatile, conf_pct_of_price
        );
    }
    Ok(valid)
}

/// Full gate used by callers before a fill or curve update.
pub fn get_oracle_status(
    amm: &Amm,
    oracle: &OraclePriceData,
    rails: &OracleGuardRails,
    reserve_price: u64,
) -> EngineResult<OracleStatus> {
    let spread_pct = calculate_oracle_reserve_price_spread_pct(reserve_price, oracle.price)?;
    Ok(OracleStatus {
        price_data: *oracle,
        oracle_reserve_price_spread_pct: spread_pct,
        is_valid: is_oracle_valid(amm, oracle, &rails.validity)?,
        mark_too_divergent: is_oracle_mark_too_divergent(spread_pct, &rails.price_divergence),
    })
}

/// True when fills/curve updates should be blocked on this oracle update.
pub fn block_amm_operation(status: &OracleStatus) -> bool {
    !status.is_valid || status.mark_too_divergent
}
