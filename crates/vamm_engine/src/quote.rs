//! Reserve and price queries.

use num_bigint::BigUint;

use crate::constants::{PEG_PRECISION, PRICE_PRECISION};
use crate::curve;
use crate::error::{EngineError, EngineResult};
use crate::math::{cast_u64, div_u128, mul_u128};
use crate::spread;
use crate::state::{
    Amm, BidAsk, OraclePriceData, PositionDirection, TradeToLimit,
};
use crate::swap::{calculate_swap_output, swap_direction_to_close};

/// Price implied by a reserve pair and peg, price precision.
///
/// A zero base reserve prices at 0 rather than faulting; callers treat it as
/// an empty market.
pub fn calculate_price(
    quote_asset_reserve: u128,
    base_asset_reserve: u128,
    peg_multiplier: u128,
) -> EngineResult<u64> {
    if base_asset_reserve == 0 {
        return Ok(0);
    }

    let scaled_quote = mul_u128(
        mul_u128(quote_asset_reserve, PRICE_PRECISION)?,
        peg_multiplier,
    )?;
    let price = scaled_quote / PEG_PRECISION / base_asset_reserve;

    cast_u64(price)
}

/// Price the AMM would see after closing its own net position.
pub fn calculate_terminal_price(amm: &Amm) -> EngineResult<u64> {
    let direction = swap_direction_to_close(amm.base_asset_amount_with_amm);
    let output = calculate_swap_output(
        amm.base_asset_reserve,
        amm.base_asset_amount_with_amm.unsigned_abs(),
        direction,
        amm.invariant()?,
    )?;

    calculate_price(
        output.new_output_reserve,
        output.new_input_reserve,
        amm.peg_multiplier,
    )
}

/// Largest base amount tradable before the mark price crosses `limit_price`.
///
/// Inverts the price formula for the base reserve at which the curve prices
/// exactly at the limit and measures the distance from the spread-adjusted
/// starting reserve on the requested side. Equal reserves signal a trade too
/// small to move the curve: a zero amount with the `Long` default direction
/// (a no-op marker, not a meaningful direction).
pub fn calculate_max_base_asset_amount_to_trade(
    amm: &Amm,
    limit_price: u64,
    direction: PositionDirection,
    oracle: &OraclePriceData,
    now: i64,
) -> EngineResult<TradeToLimit> {
    if limit_price == 0 {
        return Err(EngineError::InvalidLimitPrice);
    }

    // The intermediate product overflows 128 bits for large markets, so the
    // inversion runs over big integers with an exact integer sqrt.
    let invariant = BigUint::from(amm.sqrt_k) * BigUint::from(amm.sqrt_k);
    let new_base_squared = invariant * BigUint::from(PRICE_PRECISION)
        * BigUint::from(amm.peg_multiplier)
        / BigUint::from(limit_price)
        / BigUint::from(PEG_PRECISION);
    let new_base_asset_reserve =
        u128::try_from(new_base_squared.sqrt()).map_err(|_| EngineError::MathOverflow)?;

    let (bid_reserves, ask_reserves) = spread::calculate_spread_reserves(amm, oracle, now)?;
    let base_asset_reserve_before = match direction {
        PositionDirection::Long => ask_reserves.base_asset_reserve,
        PositionDirection::Short => bid_reserves.base_asset_reserve,
    };

    if new_base_asset_reserve > base_asset_reserve_before {
        Ok(TradeToLimit {
            base_asset_amount: new_base_asset_reserve - base_asset_reserve_before,
            direction: PositionDirection::Short,
        })
    } else if new_base_asset_reserve < base_asset_reserve_before {
        Ok(TradeToLimit {
            base_asset_amount: base_asset_reserve_before - new_base_asset_reserve,
            direction: PositionDirection::Long,
        })
    } else {
        Ok(TradeToLimit {
            base_asset_amount: 0,
            direction: PositionDirection::Long,
        })
    }
}

/// Cap on the base size a single fill may take from the AMM.
pub fn calculate_max_base_asset_amount_fillable(
    amm: &Amm,
    direction: PositionDirection,
) -> EngineResult<u64> {
    let max_fill_size = div_u128(
        amm.base_asset_reserve,
        u128::from(amm.max_fill_reserve_fraction),
    )?;

    let max_on_side = match direction {
        PositionDirection::Long => amm
            .base_asset_reserve
            .saturating_sub(amm.min_base_asset_reserve),
        PositionDirection::Short => amm
            .max_base_asset_reserve
            .saturating_sub(amm.base_asset_reserve),
    };

    standardize_base_asset_amount(
        cast_u64(max_fill_size.min(max_on_side))?,
        amm.order_step_size,
    )
}

/// Round a base amount down to the nearest order step.
pub fn standardize_base_asset_amount(amount: u64, step_size: u64) -> EngineResult<u64> {
    if step_size == 0 {
        return Err(EngineError::InvalidOrderStep);
    }
    Ok(amount - amount % step_size)
}

/// Worst-case open interest on each side of the book.
///
/// Bids are the distance to the minimum reserve (positive), asks the distance
/// to the maximum reserve (negative); both floor at zero magnitude when the
/// reserve sits outside its soft bound.
pub fn calculate_market_open_bids_asks(
    base_asset_reserve: u128,
    min_base_asset_reserve: u128,
    max_base_asset_reserve: u128,
) -> EngineResult<(i128, i128)> {
    let max_bids = if base_asset_reserve > min_base_asset_reserve {
        i128::try_from(base_asset_reserve - min_base_asset_reserve)
            .map_err(|_| EngineError::MathOverflow)?
    } else {
        0
    };

    let max_asks = if base_asset_reserve < max_base_asset_reserve {
        -i128::try_from(max_base_asset_reserve - base_asset_reserve)
            .map_err(|_| EngineError::MathOverflow)?
    } else {
        0
    };

    Ok((max_bids, max_asks))
}

/// Top-of-book bid/ask prices from the spread-adjusted reserves, optionally
/// running the curve-update engine first.
pub fn calculate_bid_ask_price(
    amm: &Amm,
    oracle: &OraclePriceData,
    now: i64,
    with_update: bool,
) -> EngineResult<BidAsk> {
    let updated;
    let amm = if with_update {
        updated = curve::calculate_updated_amm(amm, oracle)?;
        &updated
    } else {
        amm
    };

    let (bid_reserves, ask_reserves) = spread::calculate_spread_reserves(amm, oracle, now)?;

    let bid = calculate_price(
        bid_reserves.quote_asset_reserve,
        bid_reserves.base_asset_reserve,
        amm.peg_multiplier,
    )?;
    let ask = calculate_price(
        ask_reserves.quote_asset_reserve,
        ask_reserves.base_asset_reserve,
        amm.peg_multiplier,
    )?;

    Ok(BidAsk { bid, ask })
}
