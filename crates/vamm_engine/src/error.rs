//! Engine error types.
//!
//! Precondition violations surface as recoverable error values; internal
//! curve-consistency violations are fatal asserts at the call site, since
//! continuing past one would produce mispriced state.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Arithmetic overflowed the widest intermediate type.
    #[error("math operation overflowed")]
    MathOverflow,

    /// Division by a zero denominator.
    #[error("division by zero")]
    DivisionByZero,

    /// Swap amount out of range for the requested direction.
    #[error("invalid swap amount")]
    InvalidSwapAmount,

    /// Order limit price must be non-zero.
    #[error("invalid order limit price")]
    InvalidLimitPrice,

    /// Order step size must be non-zero.
    #[error("invalid order step size")]
    InvalidOrderStep,
}

pub type EngineResult<T> = Result<T, EngineError>;
