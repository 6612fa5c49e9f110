//! Rolling trade statistics feeding the spread engine.
//!
//! Pure counterparts of the market's volume bookkeeping: each recorded fill
//! produces a new snapshot with the 24h volume and per-side intensity
//! volumes decayed and topped up.

use crate::constants::TWENTY_FOUR_HOUR;
use crate::error::{EngineError, EngineResult};
use crate::state::{Amm, PositionDirection};

/// Decay `previous` linearly by the elapsed share of `period` and add the
/// incoming amount. Missing time is treated as zero flow.
pub fn calculate_rolling_sum(
    previous: u64,
    incoming: u64,
    since_last: i64,
    period: i64,
) -> EngineResult<u64> {
    if period <= 0 {
        return Err(EngineError::DivisionByZero);
    }

    let remaining_weight = (period - since_last).max(0) as u128;
    let decayed = u128::from(previous) * remaining_weight / period as u128;

    (decayed as u64)
        .checked_add(incoming)
        .ok_or(EngineError::MathOverflow)
}

/// Roll a fill into the snapshot's volume and intensity accumulators.
pub fn record_trade(
    amm: &Amm,
    quote_asset_amount: u64,
    direction: PositionDirection,
    now: i64,
) -> EngineResult<Amm> {
    let since_last = (now - amm.last_trade_ts).max(1);

    let (long_quote_amount, short_quote_amount) = match direction {
        PositionDirection::Long => (quote_asset_amount, 0),
        PositionDirection::Short => (0, quote_asset_amount),
    };

    let mut updated = *amm;
    updated.long_intensity_volume = calculate_rolling_sum(
        amm.long_intensity_volume,
        long_quote_amount,
        since_last,
        TWENTY_FOUR_HOUR,
    )?;
    updated.short_intensity_volume = calculate_rolling_sum(
        amm.short_intensity_volume,
        short_quote_amount,
        since_last,
        TWENTY_FOUR_HOUR,
    )?;
    updated.volume_24h = calculate_rolling_sum(
        amm.volume_24h,
        quote_asset_amount,
        since_last,
        TWENTY_FOUR_HOUR,
    )?;
    updated.last_trade_ts = now;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_sum_decays_linearly() {
        assert_eq!(calculate_rolling_sum(86_400, 0, 43_200, 86_400).unwrap(), 43_200);
        assert_eq!(calculate_rolling_sum(86_400, 100, 86_400, 86_400).unwrap(), 100);
        // missing time beyond the period floors at zero weight
        assert_eq!(calculate_rolling_sum(86_400, 0, 200_000, 86_400).unwrap(), 0);
    }

    #[test]
    fn test_rolling_sum_keeps_fresh_data() {
        // back-to-back updates barely decay
        let rolled = calculate_rolling_sum(86_400, 1_000, 1, 86_400).unwrap();
        assert_eq!(rolled, 86_399 + 1_000);
    }

    #[test]
    fn test_record_trade_splits_by_direction() {
        let amm = Amm {
            last_trade_ts: 1_000,
            ..Amm::default()
        };

        let after_long = record_trade(&amm, 5_000_000, PositionDirection::Long, 1_001).unwrap();
        assert_eq!(after_long.long_intensity_volume, 5_000_000);
        assert_eq!(after_long.short_intensity_volume, 0);
        assert_eq!(after_long.volume_24h, 5_000_000);
        assert_eq!(after_long.last_trade_ts, 1_001);

        let after_short =
            record_trade(&after_long, 3_000_000, PositionDirection::Short, 1_002).unwrap();
        assert_eq!(after_short.short_intensity_volume, 3_000_000);
        assert!(after_short.long_intensity_volume < after_long.long_intensity_volume);
        assert!(after_short.volume_24h > 7_900_000);
    }
}
