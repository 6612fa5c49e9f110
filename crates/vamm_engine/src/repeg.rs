//! Re-peg cost math: the numeric collaborators behind the curve-update
//! engine.
//!
//! Sign convention throughout: positive cost debits the fee pool, negative
//! cost is a windfall.

use log::debug;
use num_bigint::BigInt;
use num_traits::Zero;

use crate::constants::{
    AMM_TO_QUOTE_PRECISION_RATIO, AMM_TO_QUOTE_PRECISION_RATIO_I128,
    BID_ASK_SPREAD_PRECISION_I128, PEG_PRECISION, PEG_PRECISION_I128, PERCENTAGE_PRECISION,
    PRICE_PRECISION, PRICE_TO_PEG_PRECISION_RATIO,
};
use crate::error::{EngineError, EngineResult};
use crate::math::{div_u128, mul_i128, mul_u128};
use crate::state::{Amm, OraclePriceData};

/// Peg solve plus the fee budget available to fund it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimalPegAndBudget {
    /// Price the curve update steers toward, price precision.
    pub target_price: u64,
    /// Peg that prices the current reserves at the target.
    pub peg_multiplier: u128,
    /// Quote budget available for the move.
    pub budget: i128,
    /// False once the target was clamped to the affordable band; the caller
    /// then skips the k-rescale fallback.
    pub check_lower_bound: bool,
}

/// Peg that makes the reserve-implied price equal `target_price`, rounded to
/// nearest and floored at one peg unit.
pub fn calculate_peg_from_target_price(
    target_price: u64,
    base_asset_reserve: u128,
    quote_asset_reserve: u128,
) -> EngineResult<u128> {
    let peg = div_u128(
        div_u128(
            mul_u128(u128::from(target_price), base_asset_reserve)?,
            quote_asset_reserve,
        )?
        .checked_add(PRICE_TO_PEG_PRECISION_RATIO / 2)
        .ok_or(EngineError::MathOverflow)?,
        PRICE_TO_PEG_PRECISION_RATIO,
    )?;
    Ok(peg.max(1))
}

/// Cost of moving the peg to `new_peg` holding reserves fixed.
pub fn calculate_repeg_cost(amm: &Amm, new_peg: u128) -> EngineResult<i128> {
    let dqar = i128::try_from(amm.quote_asset_reserve)
        .map_err(|_| EngineError::MathOverflow)?
        - i128::try_from(amm.terminal_quote_asset_reserve)
            .map_err(|_| EngineError::MathOverflow)?;
    let dpeg = i128::try_from(new_peg).map_err(|_| EngineError::MathOverflow)?
        - i128::try_from(amm.peg_multiplier).map_err(|_| EngineError::MathOverflow)?;

    let cost = mul_i128(dqar, dpeg)? / AMM_TO_QUOTE_PRECISION_RATIO_I128 / PEG_PRECISION_I128;
    Ok(cost)
}

/// Cost of rescaling the reserves and sqrt_k by `numerator / denominator`.
///
/// Evaluated over big integers with a single terminal truncation: flooring
/// the two value terms separately could report a spurious +1 on a shrink,
/// and callers assert the shrink windfall is never positive.
pub fn calculate_adjust_k_cost(
    amm: &Amm,
    numerator: u128,
    denominator: u128,
) -> EngineResult<i128> {
    if numerator == 0 || denominator == 0 {
        return Err(EngineError::DivisionByZero);
    }

    let x = BigInt::from(amm.base_asset_reserve);
    let y = BigInt::from(amm.quote_asset_reserve);
    let d = BigInt::from(amm.base_asset_amount_with_amm);
    let peg = BigInt::from(amm.peg_multiplier);

    let price_precision = BigInt::from(PRICE_PRECISION);
    let pct = BigInt::from(PERCENTAGE_PRECISION);

    // p = numerator / denominator in price precision
    let p = BigInt::from(numerator) * &price_precision / BigInt::from(denominator);

    let current_divisor = &x + &d;
    let scaled_divisor = &x * &p / &price_precision + &d;
    if current_divisor.is_zero() || scaled_divisor.is_zero() {
        return Err(EngineError::DivisionByZero);
    }

    let quote_scale = &y * &d * &peg;

    let current_term = &quote_scale * &pct * &pct / current_divisor;
    let scaled_term = &quote_scale * &p * &pct * &pct / &price_precision / scaled_divisor;

    let cost = (current_term - scaled_term)
        / &pct
        / &pct
        / BigInt::from(AMM_TO_QUOTE_PRECISION_RATIO)
        / BigInt::from(PEG_PRECISION);

    i128::try_from(-cost).map_err(|_| EngineError::MathOverflow)
}

/// Largest peg move toward `target_price` affordable within `budget`.
///
/// When moving toward the target is free or a windfall the target peg is
/// used outright; otherwise the budget buys `budget / per_peg_cost` peg
/// units, floored at one and clamped to never overshoot the target.
pub fn calculate_budgeted_peg(
    amm: &Amm,
    budget: i128,
    target_price: u64,
) -> EngineResult<u128> {
    let dqar = i128::try_from(amm.quote_asset_reserve)
        .map_err(|_| EngineError::MathOverflow)?
        - i128::try_from(amm.terminal_quote_asset_reserve)
            .map_err(|_| EngineError::MathOverflow)?;

    let mut per_peg_cost = dqar / (AMM_TO_QUOTE_PRECISION_RATIO_I128 * PEG_PRECISION_I128);
    // round one unit away from zero so the budget division cannot overshoot
    if per_peg_cost > 0 {
        per_peg_cost += 1;
    } else if per_peg_cost < 0 {
        per_peg_cost -= 1;
    }

    let target_peg = div_u128(
        mul_u128(
            div_u128(
                mul_u128(u128::from(target_price), amm.base_asset_reserve)?,
                amm.quote_asset_reserve,
            )?,
            PEG_PRECISION,
        )?,
        PRICE_PRECISION,
    )?;

    let current_peg =
        i128::try_from(amm.peg_multiplier).map_err(|_| EngineError::MathOverflow)?;
    let target_peg_i =
        i128::try_from(target_peg).map_err(|_| EngineError::MathOverflow)?;
    let peg_change_direction = target_peg_i - current_peg;

    let use_target_peg = (per_peg_cost < 0 && peg_change_direction > 0)
        || (per_peg_cost > 0 && peg_change_direction < 0);

    if per_peg_cost == 0 || use_target_peg {
        return Ok(target_peg.max(1));
    }

    let budget_delta_peg = budget / per_peg_cost;
    let candidate = (current_peg + budget_delta_peg).max(1);

    // never move past the target
    let new_peg = if current_peg > target_peg_i {
        candidate.max(target_peg_i)
    } else {
        candidate.min(target_peg_i)
    };

    u128::try_from(new_peg.max(1)).map_err(|_| EngineError::MathOverflow)
}

/// Optimal peg toward the oracle plus the affordable budget.
///
/// With an underfunded fee pool the target price itself is pulled back to
/// within half the max spread of the reserve price, and the cost of that
/// clamped move becomes the budget (`check_lower_bound = false`).
pub fn calculate_optimal_peg_and_budget(
    amm: &Amm,
    oracle: &OraclePriceData,
) -> EngineResult<OptimalPegAndBudget> {
    let reserve_price_before = amm.reserve_price()?;

    let mut target_price =
        u64::try_from(oracle.price).map_err(|_| EngineError::MathOverflow)?;
    let mut new_peg = calculate_peg_from_target_price(
        target_price,
        amm.base_asset_reserve,
        amm.quote_asset_reserve,
    )?;
    let optimal_peg_cost = calculate_repeg_cost(amm, new_peg)?;

    let fee_lower_bound = i128::try_from(amm.total_exchange_fee / 2)
        .map_err(|_| EngineError::MathOverflow)?;
    let mut budget = (amm.total_fee_minus_distributions - fee_lower_bound).max(0);

    let mut check_lower_bound = true;
    if budget < optimal_peg_cost {
        let half_max_price_spread = i128::from(amm.max_spread / 2)
            * i128::from(target_price)
            / BID_ASK_SPREAD_PRECISION_I128;
        let target_price_gap =
            i128::from(reserve_price_before) - i128::from(target_price);

        if target_price_gap.abs() > half_max_price_spread {
            // pull the target back to the edge of the affordable band
            let mark_adjustment = target_price_gap.abs() - half_max_price_spread;
            let new_target_price = if target_price_gap < 0 {
                i128::from(reserve_price_before) + mark_adjustment
            } else {
                i128::from(reserve_price_before) - mark_adjustment
            };

            target_price =
                u64::try_from(new_target_price).map_err(|_| EngineError::MathOverflow)?;
            new_peg = calculate_peg_from_target_price(
                target_price,
                amm.base_asset_reserve,
                amm.quote_asset_reserve,
            )?;
            budget = calculate_repeg_cost(amm, new_peg)?;
            check_lower_bound = false;

            debug!(
                "repeg target clamped to {} (reserve price {})",
                target_price, reserve_price_before
            );
        }
    }

    Ok(OptimalPegAndBudget {
        target_price,
        peg_multiplier: new_peg,
        budget,
        check_lower_bound,
    })
}
