//! Checked fixed-point math helpers.

use crate::error::{EngineError, EngineResult};

/// Multiply two u128 values, erroring on overflow.
#[inline]
pub fn mul_u128(a: u128, b: u128) -> EngineResult<u128> {
    a.checked_mul(b).ok_or(EngineError::MathOverflow)
}

/// Divide u128 values, rounding down, erroring on a zero denominator.
#[inline]
pub fn div_u128(numerator: u128, denominator: u128) -> EngineResult<u128> {
    numerator
        .checked_div(denominator)
        .ok_or(EngineError::DivisionByZero)
}

/// Divide u128 values, rounding up, erroring on a zero denominator.
#[inline]
pub fn div_ceil_u128(numerator: u128, denominator: u128) -> EngineResult<u128> {
    if denominator == 0 {
        return Err(EngineError::DivisionByZero);
    }
    Ok(numerator.div_ceil(denominator))
}

/// Multiply two i128 values, erroring on overflow.
#[inline]
pub fn mul_i128(a: i128, b: i128) -> EngineResult<i128> {
    a.checked_mul(b).ok_or(EngineError::MathOverflow)
}

/// Divide i128 values, truncating toward zero, erroring on a zero denominator.
#[inline]
pub fn div_i128(numerator: i128, denominator: i128) -> EngineResult<i128> {
    numerator
        .checked_div(denominator)
        .ok_or(EngineError::DivisionByZero)
}

/// Narrow u128 to u64, erroring on overflow.
#[inline]
pub fn cast_u64(value: u128) -> EngineResult<u64> {
    u64::try_from(value).map_err(|_| EngineError::MathOverflow)
}

/// Narrow u64 math back into a u32 spread field, erroring on overflow.
#[inline]
pub fn cast_u32(value: u64) -> EngineResult<u32> {
    u32::try_from(value).map_err(|_| EngineError::MathOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_rounding_modes() {
        assert_eq!(div_u128(7, 2).unwrap(), 3);
        assert_eq!(div_ceil_u128(7, 2).unwrap(), 4);
        assert_eq!(div_u128(8, 2).unwrap(), 4);
        assert_eq!(div_ceil_u128(8, 2).unwrap(), 4);
        assert_eq!(div_u128(1, 0), Err(EngineError::DivisionByZero));
        assert_eq!(div_ceil_u128(1, 0), Err(EngineError::DivisionByZero));
    }

    #[test]
    fn test_signed_div_truncates_toward_zero() {
        assert_eq!(div_i128(-7, 2).unwrap(), -3);
        assert_eq!(div_i128(7, -2).unwrap(), -3);
        assert_eq!(div_i128(-7, -2).unwrap(), 3);
    }

    #[test]
    fn test_overflow_is_detected() {
        assert_eq!(mul_u128(u128::MAX, 2), Err(EngineError::MathOverflow));
        assert_eq!(mul_i128(i128::MAX, 2), Err(EngineError::MathOverflow));
        assert_eq!(cast_u64(u128::from(u64::MAX) + 1), Err(EngineError::MathOverflow));
    }
}

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Ceiling and floor division differ by at most one and agree on exact
    /// divisions.
    #[kani::proof]
    #[kani::unwind(3)]
    fn rounding_modes_bracket() {
        let numerator: u128 = kani::any();
        let denominator: u128 = kani::any();

        kani::assume(denominator > 0);
        kani::assume(numerator < u128::MAX - denominator);

        let floor = div_u128(numerator, denominator).unwrap();
        let ceil = div_ceil_u128(numerator, denominator).unwrap();

        assert!(ceil >= floor);
        assert!(ceil - floor <= 1);
        if numerator % denominator == 0 {
            assert!(ceil == floor);
        }
    }

    /// Truncating signed division never increases magnitude.
    #[kani::proof]
    #[kani::unwind(3)]
    fn signed_div_magnitude() {
        let numerator: i128 = kani::any();
        let denominator: i128 = kani::any();

        kani::assume(denominator != 0);
        kani::assume(numerator > i128::MIN);

        let quotient = div_i128(numerator, denominator).unwrap();
        assert!(quotient.unsigned_abs() <= numerator.unsigned_abs());
    }
}
