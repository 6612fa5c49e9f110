//! Curve update engine: re-peg toward the oracle under a fee budget, with a
//! k-rescale fallback when the budget falls short.
//!
//! `Stable -> OptimalPegSolve -> BudgetCheck -> {DirectRepeg |
//! RescaleThenRepeg} -> Committed`. There is no partial-failure state: a
//! transition either fully resolves into a new snapshot or asserts on an
//! internal consistency violation.

use log::debug;

use crate::constants::{K_SHRINK_DENOMINATOR, K_SHRINK_NUMERATOR};
use crate::error::{EngineError, EngineResult};
use crate::math::{div_u128, mul_u128};
use crate::repeg;
use crate::state::{Amm, AssetType, OraclePriceData, PositionDirection};
use crate::swap::{calculate_reserves_after_swap, calculate_swap_direction};

/// Planned curve transition: bookkeeping cost, k scaling, and the new peg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePlan {
    pub cost: i128,
    pub k_numerator: u128,
    pub k_denominator: u128,
    pub peg_multiplier: u128,
}

/// Quote reserve left after the AMM closes its own net exposure.
pub fn calculate_terminal_quote_reserve(amm: &Amm) -> EngineResult<u128> {
    let direction_to_close = if amm.base_asset_amount_with_amm > 0 {
        PositionDirection::Short
    } else {
        PositionDirection::Long
    };

    let reserves = calculate_reserves_after_swap(
        amm,
        AssetType::Base,
        amm.base_asset_amount_with_amm.unsigned_abs(),
        calculate_swap_direction(AssetType::Base, direction_to_close),
    )?;

    Ok(reserves.quote_asset_reserve)
}

/// Scale base reserve and sqrt_k by `numerator / denominator`, rederiving the
/// quote reserve from the invariant and refreshing the terminal reserve.
pub fn scale_curve(amm: &Amm, numerator: u128, denominator: u128) -> EngineResult<Amm> {
    let mut scaled = *amm;
    scaled.base_asset_reserve =
        div_u128(mul_u128(amm.base_asset_reserve, numerator)?, denominator)?;
    scaled.sqrt_k = div_u128(mul_u128(amm.sqrt_k, numerator)?, denominator)?;
    scaled.quote_asset_reserve = div_u128(scaled.invariant()?, scaled.base_asset_reserve)?;
    scaled.terminal_quote_asset_reserve = calculate_terminal_quote_reserve(&scaled)?;
    Ok(scaled)
}

/// Move sqrt_k to an exact target, scaling the base reserve by the same
/// ratio. Used for liquidity adds/removes: a matching remove restores sqrt_k
/// exactly because the target is set, not rederived.
pub fn update_k(amm: &Amm, new_sqrt_k: u128) -> EngineResult<Amm> {
    let mut updated = *amm;
    updated.base_asset_reserve =
        div_u128(mul_u128(amm.base_asset_reserve, new_sqrt_k)?, amm.sqrt_k)?;
    updated.sqrt_k = new_sqrt_k;
    updated.quote_asset_reserve = div_u128(updated.invariant()?, updated.base_asset_reserve)?;
    updated.terminal_quote_asset_reserve = calculate_terminal_quote_reserve(&updated)?;
    Ok(updated)
}

/// Solve the curve transition without applying it.
pub fn calculate_curve_plan(amm: &Amm, oracle: &OraclePriceData) -> EngineResult<CurvePlan> {
    let solve = repeg::calculate_optimal_peg_and_budget(amm, oracle)?;

    let mut cost = repeg::calculate_repeg_cost(amm, solve.peg_multiplier)?;
    let mut peg_multiplier = solve.peg_multiplier;
    let (mut k_numerator, mut k_denominator) = (1_u128, 1_u128);

    if cost >= solve.budget && solve.check_lower_bound {
        // budget falls short of the full move: shrink the curve and fold the
        // windfall into the budget
        (k_numerator, k_denominator) = (K_SHRINK_NUMERATOR, K_SHRINK_DENOMINATOR);

        let deficit_made_up =
            repeg::calculate_adjust_k_cost(amm, k_numerator, k_denominator)?;
        assert!(
            deficit_made_up <= 0,
            "curve shrink must be a windfall, got {}",
            deficit_made_up
        );

        cost = solve
            .budget
            .checked_add(
                i128::try_from(deficit_made_up.unsigned_abs())
                    .map_err(|_| EngineError::MathOverflow)?,
            )
            .ok_or(EngineError::MathOverflow)?;

        let scaled = scale_curve(amm, k_numerator, k_denominator)?;
        peg_multiplier = repeg::calculate_budgeted_peg(&scaled, cost, solve.target_price)?;
        cost = repeg::calculate_repeg_cost(&scaled, peg_multiplier)?;

        debug!(
            "curve rescaled {}/{}: budgeted peg {}, cost {}",
            k_numerator, k_denominator, peg_multiplier, cost
        );
    }

    Ok(CurvePlan {
        cost,
        k_numerator,
        k_denominator,
        peg_multiplier,
    })
}

/// Run the curve-update state machine and return the committed snapshot.
///
/// `curve_update_intensity == 0` is the `Stable` state: the input snapshot is
/// returned unchanged.
pub fn calculate_updated_amm(amm: &Amm, oracle: &OraclePriceData) -> EngineResult<Amm> {
    if amm.curve_update_intensity == 0 {
        return Ok(*amm);
    }

    let plan = calculate_curve_plan(amm, oracle)?;

    let mut updated = scale_curve(amm, plan.k_numerator, plan.k_denominator)?;
    updated.peg_multiplier = plan.peg_multiplier;

    updated.total_fee_minus_distributions = updated
        .total_fee_minus_distributions
        .checked_sub(plan.cost)
        .ok_or(EngineError::MathOverflow)?;
    updated.net_revenue_since_last_funding = updated
        .net_revenue_since_last_funding
        .checked_sub(i64::try_from(plan.cost).map_err(|_| EngineError::MathOverflow)?)
        .ok_or(EngineError::MathOverflow)?;

    if plan.cost != 0 || plan.k_numerator != plan.k_denominator {
        debug!(
            "curve update committed: peg {} cost {} k {}/{}",
            updated.peg_multiplier, plan.cost, plan.k_numerator, plan.k_denominator
        );
    }

    Ok(updated)
}
