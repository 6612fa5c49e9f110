//! Shared fixtures for the scenario and property tests.

use vamm_engine::{Amm, OraclePriceData};

pub const RESERVE_UNIT: u128 = 1_000_000_000;
pub const PEG_UNIT: u128 = 1_000_000;
pub const PRICE_UNIT: i64 = 1_000_000;

/// Balanced curve of `units` base units priced at $1.
pub fn balanced_market(units: u128) -> Amm {
    let reserve = units * RESERVE_UNIT;
    Amm {
        base_asset_reserve: reserve,
        quote_asset_reserve: reserve,
        sqrt_k: reserve,
        terminal_quote_asset_reserve: reserve,
        peg_multiplier: PEG_UNIT,
        min_base_asset_reserve: reserve / 2,
        max_base_asset_reserve: reserve * 2,
        last_oracle_price_twap: PRICE_UNIT,
        ..Amm::default()
    }
}

pub fn oracle_at(price: i64) -> OraclePriceData {
    OraclePriceData {
        price,
        confidence: 0,
        delay: 0,
        has_sufficient_data_points: true,
    }
}
