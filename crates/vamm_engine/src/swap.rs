//! Constant-product swap primitive.

use crate::constants::QUOTE_TO_RESERVE_PEG_RATIO;
use crate::error::{EngineError, EngineResult};
use crate::math::{div_u128, mul_u128};
use crate::state::{Amm, AmmReserves, AssetType, PositionDirection, SwapDirection, SwapOutput};

/// Apply a swap of `swap_amount` to `input_asset_reserve` and derive the
/// output reserve from the invariant.
///
/// The output reserve is `invariant / new_input_reserve` with integer
/// division truncating toward zero. The truncation biases rounding in favor
/// of the protocol and must not be replaced with rounding-to-nearest.
pub fn calculate_swap_output(
    input_asset_reserve: u128,
    swap_amount: u128,
    direction: SwapDirection,
    invariant: u128,
) -> EngineResult<SwapOutput> {
    if direction == SwapDirection::Remove && swap_amount > input_asset_reserve {
        return Err(EngineError::InvalidSwapAmount);
    }

    let new_input_reserve = match direction {
        SwapDirection::Add => input_asset_reserve
            .checked_add(swap_amount)
            .ok_or(EngineError::MathOverflow)?,
        SwapDirection::Remove => input_asset_reserve - swap_amount,
    };

    let new_output_reserve = div_u128(invariant, new_input_reserve)?;

    Ok(SwapOutput {
        new_input_reserve,
        new_output_reserve,
    })
}

/// Map an order onto the swap primitive.
///
/// Going long consumes base from the curve; going short consumes quote. The
/// table is exhaustive on purpose: a new direction or asset type must be
/// handled here explicitly.
pub fn calculate_swap_direction(
    asset_type: AssetType,
    position_direction: PositionDirection,
) -> SwapDirection {
    match (asset_type, position_direction) {
        (AssetType::Base, PositionDirection::Long) => SwapDirection::Remove,
        (AssetType::Quote, PositionDirection::Short) => SwapDirection::Remove,
        (AssetType::Base, PositionDirection::Short) => SwapDirection::Add,
        (AssetType::Quote, PositionDirection::Long) => SwapDirection::Add,
    }
}

/// Swap direction that unwinds a signed base exposure.
pub fn swap_direction_to_close(base_asset_amount: i128) -> SwapDirection {
    if base_asset_amount > 0 {
        SwapDirection::Add
    } else {
        SwapDirection::Remove
    }
}

/// Reserves after swapping `swap_amount` of the given asset type.
///
/// Quote amounts arrive in quote precision and are rescaled into peg-adjusted
/// reserve units before touching the curve; base amounts are already in
/// reserve precision.
pub fn calculate_reserves_after_swap(
    amm: &Amm,
    input_asset_type: AssetType,
    swap_amount: u128,
    direction: SwapDirection,
) -> EngineResult<AmmReserves> {
    let invariant = amm.invariant()?;

    match input_asset_type {
        AssetType::Quote => {
            let reserve_amount = div_u128(
                mul_u128(swap_amount, QUOTE_TO_RESERVE_PEG_RATIO)?,
                amm.peg_multiplier,
            )?;
            let output = calculate_swap_output(
                amm.quote_asset_reserve,
                reserve_amount,
                direction,
                invariant,
            )?;
            Ok(AmmReserves {
                base_asset_reserve: output.new_output_reserve,
                quote_asset_reserve: output.new_input_reserve,
            })
        }
        AssetType::Base => {
            let output = calculate_swap_output(
                amm.base_asset_reserve,
                swap_amount,
                direction,
                invariant,
            )?;
            Ok(AmmReserves {
                base_asset_reserve: output.new_input_reserve,
                quote_asset_reserve: output.new_output_reserve,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AMM_RESERVE_PRECISION, PEG_PRECISION};

    fn balanced_amm() -> Amm {
        Amm {
            base_asset_reserve: 100 * AMM_RESERVE_PRECISION,
            quote_asset_reserve: 100 * AMM_RESERVE_PRECISION,
            sqrt_k: 100 * AMM_RESERVE_PRECISION,
            peg_multiplier: PEG_PRECISION,
            ..Amm::default()
        }
    }

    #[test]
    fn test_direction_table() {
        use AssetType::*;
        use PositionDirection::*;
        assert_eq!(calculate_swap_direction(Base, Long), SwapDirection::Remove);
        assert_eq!(calculate_swap_direction(Quote, Short), SwapDirection::Remove);
        assert_eq!(calculate_swap_direction(Base, Short), SwapDirection::Add);
        assert_eq!(calculate_swap_direction(Quote, Long), SwapDirection::Add);
    }

    #[test]
    fn test_swap_output_add_truncates() {
        let invariant = 10_000_000_000_000_000_000_000_u128; // (100e9)^2
        let out = calculate_swap_output(
            100 * AMM_RESERVE_PRECISION,
            AMM_RESERVE_PRECISION,
            SwapDirection::Add,
            invariant,
        )
        .unwrap();

        assert_eq!(out.new_input_reserve, 101 * AMM_RESERVE_PRECISION);
        // 1e22 / 101e9 = 99_009_900_990.099.. truncated toward zero
        assert_eq!(out.new_output_reserve, 99_009_900_990);
    }

    #[test]
    fn test_swap_output_remove_round_trip() {
        let invariant = 10_000_000_000_000_000_000_000_u128;
        let opened = calculate_swap_output(
            100 * AMM_RESERVE_PRECISION,
            AMM_RESERVE_PRECISION,
            SwapDirection::Remove,
            invariant,
        )
        .unwrap();
        assert_eq!(opened.new_input_reserve, 99 * AMM_RESERVE_PRECISION);

        let closed = calculate_swap_output(
            opened.new_input_reserve,
            AMM_RESERVE_PRECISION,
            SwapDirection::Add,
            invariant,
        )
        .unwrap();
        assert_eq!(closed.new_input_reserve, 100 * AMM_RESERVE_PRECISION);
        assert_eq!(closed.new_output_reserve, 100 * AMM_RESERVE_PRECISION);
    }

    #[test]
    fn test_swap_output_rejects_draining_remove() {
        let result = calculate_swap_output(
            100 * AMM_RESERVE_PRECISION,
            101 * AMM_RESERVE_PRECISION,
            SwapDirection::Remove,
            10_000_000_000_000_000_000_000_u128,
        );
        assert_eq!(result, Err(EngineError::InvalidSwapAmount));
    }

    #[test]
    fn test_reserves_after_swap_by_base() {
        let amm = balanced_amm();
        let reserves = calculate_reserves_after_swap(
            &amm,
            AssetType::Base,
            AMM_RESERVE_PRECISION,
            SwapDirection::Remove,
        )
        .unwrap();

        assert_eq!(reserves.base_asset_reserve, 99 * AMM_RESERVE_PRECISION);
        // 1e22 / 99e9
        assert_eq!(reserves.quote_asset_reserve, 101_010_101_010);
    }

    #[test]
    fn test_reserves_after_swap_by_quote_rescales_by_peg() {
        let amm = Amm {
            peg_multiplier: 2 * PEG_PRECISION,
            ..balanced_amm()
        };
        // 1 quote unit at a $2 peg is half a reserve unit of quote.
        let reserves = calculate_reserves_after_swap(
            &amm,
            AssetType::Quote,
            1_000_000,
            SwapDirection::Add,
        )
        .unwrap();

        assert_eq!(
            reserves.quote_asset_reserve,
            100 * AMM_RESERVE_PRECISION + AMM_RESERVE_PRECISION / 2
        );
        assert_eq!(
            reserves.base_asset_reserve,
            10_000_000_000_000_000_000_000_u128 / reserves.quote_asset_reserve
        );
    }
}
