//! Fixed-point precision scales and curve policy constants.
//!
//! These are part of the wire contract with the settlement layer: every
//! value crossing the engine boundary is already scaled by the matching
//! constant, and any divergence from the authoritative on-chain values
//! changes economic outcomes.

/// Price precision (6 decimals).
pub const PRICE_PRECISION: u128 = 1_000_000;
pub const PRICE_PRECISION_U64: u64 = 1_000_000;
pub const PRICE_PRECISION_I64: i64 = 1_000_000;
pub const PRICE_PRECISION_I128: i128 = 1_000_000;

/// Peg multiplier precision (6 decimals).
pub const PEG_PRECISION: u128 = 1_000_000;
pub const PEG_PRECISION_I128: i128 = 1_000_000;

/// Ratio between price and peg precision (1 while both are 1e6).
pub const PRICE_TO_PEG_PRECISION_RATIO: u128 = PRICE_PRECISION / PEG_PRECISION;

/// Reserve precision for base/quote synthetic reserves and sqrt_k (9 decimals).
pub const AMM_RESERVE_PRECISION: u128 = 1_000_000_000;
pub const AMM_RESERVE_PRECISION_I128: i128 = 1_000_000_000;

/// Quote asset precision for fee/revenue accumulators and costs (6 decimals).
pub const QUOTE_PRECISION: u128 = 1_000_000;

/// Converts reserve-precision quote deltas into quote-precision amounts.
pub const AMM_TO_QUOTE_PRECISION_RATIO: u128 = AMM_RESERVE_PRECISION / QUOTE_PRECISION;
pub const AMM_TO_QUOTE_PRECISION_RATIO_I128: i128 =
    AMM_RESERVE_PRECISION_I128 / QUOTE_PRECISION as i128;

/// Rescales a quote-precision amount into peg-adjusted quote reserve units.
pub const QUOTE_TO_RESERVE_PEG_RATIO: u128 =
    AMM_RESERVE_PRECISION * PEG_PRECISION / QUOTE_PRECISION;

/// Bid/ask spread precision (1e6 = 100%).
pub const BID_ASK_SPREAD_PRECISION: u64 = 1_000_000;
pub const BID_ASK_SPREAD_PRECISION_U128: u128 = 1_000_000;
pub const BID_ASK_SPREAD_PRECISION_I128: i128 = 1_000_000;

/// General percentage precision (1e6 = 100%).
pub const PERCENTAGE_PRECISION: u128 = 1_000_000;
pub const PERCENTAGE_PRECISION_U64: u64 = 1_000_000;
pub const PERCENTAGE_PRECISION_I128: i128 = 1_000_000;

/// Margin ratio precision (1e4).
pub const MARGIN_PRECISION: u32 = 10_000;

/// Upper bound on inventory-skew spread scaling (10x, spread precision).
pub const MAX_BID_ASK_INVENTORY_SKEW_FACTOR: u64 = 10 * BID_ASK_SPREAD_PRECISION;

/// Flat spread widening applied to both sides when the fee buffer is depleted.
pub const DEFAULT_LARGE_SPREAD_FACTOR: u64 = 10;

/// Net revenue since last funding below which the spread retreat engages.
pub const DEFAULT_REVENUE_SINCE_LAST_FUNDING_SPREAD_RETREAT: i64 =
    -25 * QUOTE_PRECISION as i64;

/// Fixed curve shrink ratio used when the repeg budget falls short.
pub const K_SHRINK_NUMERATOR: u128 = 999;
pub const K_SHRINK_DENOMINATOR: u128 = 1000;

pub const TWENTY_FOUR_HOUR: i64 = 86_400;
