//! Deterministic pricing engine for a virtual constant-product market maker
//! backing a perpetual-futures market.
//!
//! Given a market snapshot, running fee/revenue accumulators, and an external
//! oracle price, the engine computes mark/bid/ask prices, the dynamic
//! long/short spread, the cost and reserve state of re-pegging or rescaling
//! the curve toward the oracle, and the reserves resulting from hypothetical
//! swaps.
//!
//! Every function is pure and synchronous: snapshots go in by value and new
//! snapshots come out. The caller owns persistence and serializes
//! read-compute-commit against concurrent executions. All arithmetic is
//! checked fixed-point integer math mirroring the authoritative on-chain
//! computation; results must stay within one unit of it.

#![forbid(unsafe_code)]

pub mod constants;
pub mod curve;
pub mod error;
pub mod math;
pub mod oracle;
pub mod quote;
pub mod repeg;
pub mod spread;
pub mod state;
pub mod stats;
pub mod swap;

pub use curve::{calculate_updated_amm, scale_curve, update_k, CurvePlan};
pub use error::{EngineError, EngineResult};
pub use oracle::{get_oracle_status, is_oracle_valid, OracleGuardRails, OracleStatus};
pub use stats::record_trade;
pub use quote::{
    calculate_bid_ask_price, calculate_max_base_asset_amount_fillable,
    calculate_max_base_asset_amount_to_trade, calculate_price, calculate_terminal_price,
};
pub use spread::{calculate_live_spread, calculate_spread, calculate_spread_reserves};
pub use state::{
    Amm, AmmReserves, AssetType, BidAsk, OraclePriceData, PositionDirection, Spread,
    SwapDirection, SwapOutput, TradeToLimit,
};
pub use swap::{calculate_reserves_after_swap, calculate_swap_direction, calculate_swap_output};
