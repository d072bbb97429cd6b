//! Error types for the Bulwark core crate.

use thiserror::Error;

/// Errors raised by fixed-point and share/asset arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MathError {
    /// An intermediate product did not fit in 256 bits.
    #[error("arithmetic overflow")]
    Overflow,
    /// Division by a zero denominator.
    #[error("division by zero")]
    DivisionByZero,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MathError::Overflow.to_string(), "arithmetic overflow");
        assert!(MathError::DivisionByZero.to_string().contains("zero"));
    }
}
