//! End-to-end scenarios over the public engine API.

mod common;

use common::{balanced_market, oracle_at, PEG_UNIT, RESERVE_UNIT};
use vamm_engine::curve::calculate_terminal_quote_reserve;
use vamm_engine::{
    calculate_bid_ask_price, calculate_reserves_after_swap, calculate_swap_direction,
    calculate_updated_amm, update_k, Amm, AssetType, PositionDirection,
};

/// Apply a base-denominated fill to the snapshot the way the execution layer
/// would: shift the reserves and track the user-side net position.
fn apply_base_fill(amm: &mut Amm, amount: u128, direction: PositionDirection) {
    let reserves = calculate_reserves_after_swap(
        amm,
        AssetType::Base,
        amount,
        calculate_swap_direction(AssetType::Base, direction),
    )
    .unwrap();

    amm.base_asset_reserve = reserves.base_asset_reserve;
    amm.quote_asset_reserve = reserves.quote_asset_reserve;
    amm.base_asset_amount_with_amm += match direction {
        PositionDirection::Long => amount as i128,
        PositionDirection::Short => -(amount as i128),
    };
}

#[test]
fn round_reduce_only_order_flattens_position() {
    let mut amm = balanced_market(100);
    let initial = amm;

    // open a long of exactly one reserve unit
    let open_size = RESERVE_UNIT;
    apply_base_fill(&mut amm, open_size, PositionDirection::Long);
    assert_eq!(amm.base_asset_amount_with_amm, open_size as i128);
    assert_eq!(amm.base_asset_reserve, initial.base_asset_reserve - open_size);

    // close with a short one unit larger, reduce-only: the execution layer
    // clamps the fill to the open position
    let requested = open_size + 1;
    let close_size = requested.min(amm.base_asset_amount_with_amm.unsigned_abs());
    apply_base_fill(&mut amm, close_size, PositionDirection::Short);

    assert_eq!(amm.base_asset_amount_with_amm, 0);
    assert_eq!(amm.base_asset_reserve, initial.base_asset_reserve);
    assert!(amm.quote_asset_reserve.abs_diff(initial.quote_asset_reserve) <= 1);
}

#[test]
fn add_then_remove_liquidity_restores_curve() {
    // uneven reserves at 1e15 scale
    let amm = Amm {
        base_asset_reserve: 1_000_000_000_000_000,
        quote_asset_reserve: 2_000_000_000_000_000,
        sqrt_k: 1_414_213_562_373_095,
        terminal_quote_asset_reserve: 2_000_000_000_000_000,
        ..balanced_market(1)
    };

    let target_sqrt_k = amm.sqrt_k * 1050 / 1000;
    let grown = update_k(&amm, target_sqrt_k).unwrap();

    assert!(grown.sqrt_k > amm.sqrt_k);
    assert!(grown.base_asset_reserve > amm.base_asset_reserve);
    assert!(grown.quote_asset_reserve > amm.quote_asset_reserve);

    let restored = update_k(&grown, amm.sqrt_k).unwrap();

    assert_eq!(restored.sqrt_k, amm.sqrt_k);
    assert!(restored.base_asset_reserve.abs_diff(amm.base_asset_reserve) < 500_000);
    assert!(restored.quote_asset_reserve.abs_diff(amm.quote_asset_reserve) < 500_000);
}

#[test]
fn funded_curve_update_repegs_to_oracle() {
    let amm = Amm {
        curve_update_intensity: 100,
        total_fee_minus_distributions: 1_000_000_000,
        max_spread: 100_000,
        ..balanced_market(100)
    };
    let oracle = oracle_at(1_020_000);

    let updated = calculate_updated_amm(&amm, &oracle).unwrap();

    assert_eq!(updated.peg_multiplier, 1_020_000);
    assert_eq!(updated.sqrt_k, amm.sqrt_k);
    assert_eq!(updated.reserve_price().unwrap() as i64, oracle.price);
    assert_eq!(
        updated.invariant().unwrap(),
        updated.base_asset_reserve * updated.quote_asset_reserve
    );
}

#[test]
fn underfunded_curve_update_shrinks_k_and_partially_repegs() {
    let mut amm = Amm {
        curve_update_intensity: 100,
        base_asset_amount_with_amm: (1_000 * RESERVE_UNIT) as i128,
        max_spread: 200_000,
        total_fee_minus_distributions: 10_000_000,
        ..balanced_market(100_000)
    };
    amm.terminal_quote_asset_reserve = calculate_terminal_quote_reserve(&amm).unwrap();

    let updated = calculate_updated_amm(&amm, &oracle_at(1_050_000)).unwrap();

    assert_eq!(updated.sqrt_k, amm.sqrt_k * 999 / 1000);
    assert!(updated.peg_multiplier > PEG_UNIT);
    assert!(updated.peg_multiplier < 1_050_000);
    assert!(updated.total_fee_minus_distributions < amm.total_fee_minus_distributions);

    // invariant restored on the rescaled curve
    let k = updated.invariant().unwrap();
    let product = updated.base_asset_reserve * updated.quote_asset_reserve;
    assert!(product <= k);
    assert!(k - product < updated.base_asset_reserve);
}

#[test]
fn disabled_curve_updates_leave_snapshot_alone() {
    let amm = balanced_market(100);
    let updated = calculate_updated_amm(&amm, &oracle_at(5_000_000)).unwrap();
    assert_eq!(updated, amm);
}

#[test]
fn bid_ask_straddles_mark_and_follows_curve_updates() {
    let amm = Amm {
        base_spread: 1_000,
        max_spread: 100_000,
        curve_update_intensity: 100,
        total_fee_minus_distributions: 1_000_000_000,
        ..balanced_market(100)
    };
    let oracle = oracle_at(1_020_000);

    let quoted = calculate_bid_ask_price(&amm, &oracle, 0, false).unwrap();
    assert!(quoted.bid < quoted.ask);
    // oracle above mark widens the short (bid) side
    assert!(quoted.bid < 1_000_000);

    let repegged = calculate_bid_ask_price(&amm, &oracle, 0, true).unwrap();
    assert!(repegged.bid < repegged.ask);
    // after the update both sides quote around the oracle price
    assert!(repegged.bid > quoted.bid);
    assert!(repegged.ask > 1_010_000);
    assert!(repegged.bid <= oracle.price as u64);
}

#[test]
fn snapshot_serde_round_trip() {
    let amm = Amm {
        curve_update_intensity: 100,
        base_asset_amount_with_amm: -(5 * RESERVE_UNIT as i128),
        total_fee_minus_distributions: 123_456_789,
        ..balanced_market(1_000)
    };

    let encoded = serde_json::to_string(&amm).unwrap();
    let decoded: Amm = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, amm);
}
